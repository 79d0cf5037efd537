use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OutputFormat {
    #[default]
    Table,
    Json,
}

impl OutputFormat {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Table => "table",
            Self::Json => "json",
        }
    }

    pub fn is_structured(self) -> bool {
        matches!(self, Self::Json)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HostSource {
    CliOverride,
    Environment,
    ConfigFile,
    Default,
}

impl HostSource {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::CliOverride => "cli",
            Self::Environment => "env",
            Self::ConfigFile => "config",
            Self::Default => "default",
        }
    }
}
