use crate::errors::RecorderctlError;
use serde::{Deserialize, Serialize};

/// One recorder as reported by the daemon's `/v1/recorder` endpoint.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct Recorder {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub spec: Option<RecorderSpec>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub status: Option<RecorderStatus>,
}

#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct RecorderStatus {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub realized: Option<RecorderSpec>,
}

#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct RecorderSpec {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub capture_length: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub filters: Option<Vec<RecorderFilter>>,
}

#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct RecorderFilter {
    #[serde(default)]
    pub src_prefix: String,
    #[serde(default)]
    pub src_port: String,
    #[serde(default)]
    pub dst_prefix: String,
    #[serde(default)]
    pub dst_port: String,
    #[serde(default)]
    pub protocol: String,
}

impl RecorderFilter {
    pub fn source(&self) -> String {
        format!("{}:{}", self.src_prefix, self.src_port)
    }

    pub fn destination(&self) -> String {
        format!("{}:{}", self.dst_prefix, self.dst_port)
    }
}

/// A recorder whose realized state is complete enough to display.
///
/// `first` and `rest` encode the at-least-one-filter guarantee in the type.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RealizedRecorder<'a> {
    pub id: u64,
    pub capture_length: u64,
    pub first: &'a RecorderFilter,
    pub rest: &'a [RecorderFilter],
}

impl<'a> RealizedRecorder<'a> {
    pub fn filters(&self) -> impl Iterator<Item = &'a RecorderFilter> {
        std::iter::once(self.first).chain(self.rest.iter())
    }

    pub fn filter_count(&self) -> usize {
        1 + self.rest.len()
    }
}

impl Recorder {
    pub fn realized(&self) -> Result<RealizedRecorder<'_>, RecorderctlError> {
        let spec = self
            .status
            .as_ref()
            .and_then(|status| status.realized.as_ref())
            .ok_or_else(|| RecorderctlError::MalformedRecord("empty state".to_string()))?;
        let id = spec
            .id
            .ok_or_else(|| RecorderctlError::MalformedRecord("missing id".to_string()))?;
        let filters = spec.filters.as_deref().unwrap_or_default();
        let (first, rest) = filters.split_first().ok_or_else(|| {
            RecorderctlError::MalformedRecord(format!("recorder {id} has no filters"))
        })?;
        Ok(RealizedRecorder {
            id,
            capture_length: spec.capture_length.unwrap_or(0),
            first,
            rest,
        })
    }
}

/// Realized recorders in ascending id order, plus one error per skipped record.
#[derive(Debug, Default)]
pub struct Partitioned<'a> {
    pub realized: Vec<RealizedRecorder<'a>>,
    pub malformed: Vec<RecorderctlError>,
}

pub fn partition_realized(records: &[Recorder]) -> Partitioned<'_> {
    let mut out = Partitioned::default();
    for record in records {
        match record.realized() {
            Ok(realized) => out.realized.push(realized),
            Err(err) => out.malformed.push(err),
        }
    }
    out.realized.sort_by_key(|rec| rec.id);
    out
}
