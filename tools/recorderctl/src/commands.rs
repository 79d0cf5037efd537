use crate::daemon::RecorderSource;
use crate::errors::RecorderctlError;
use crate::logging::append_run_log;
use crate::recorder::Recorder;
use crate::render::render_recorder_list;
use crate::runtime::Terminal;
use crate::types::OutputFormat;
use serde::Serialize;
use serde_json::json;

/// `recorder list`: one fetch, then either JSON or the table.
pub fn list_recorders(
    source: &dyn RecorderSource,
    format: OutputFormat,
    terminal: &dyn Terminal,
) -> Result<(), RecorderctlError> {
    append_run_log(
        "info",
        "recorder.list.started",
        json!({ "format": format.as_str() }),
    );
    let records = source.list_recorders().map_err(|err| match err {
        RecorderctlError::Transport(msg) => {
            RecorderctlError::Transport(format!("cannot get recorder list: {msg}"))
        }
        other => other,
    })?;
    emit_records(&records, format, terminal)?;
    append_run_log(
        "info",
        "recorder.list.completed",
        json!({ "format": format.as_str(), "records": records.len() }),
    );
    Ok(())
}

/// `recorder get <id>`: same output modes as `list`, for a single recorder.
pub fn get_recorder(
    source: &dyn RecorderSource,
    id: u64,
    format: OutputFormat,
    terminal: &dyn Terminal,
) -> Result<(), RecorderctlError> {
    append_run_log(
        "info",
        "recorder.get.started",
        json!({ "id": id, "format": format.as_str() }),
    );
    let record = source.get_recorder(id)?;
    match format {
        OutputFormat::Json => print_structured(&record, terminal),
        OutputFormat::Table => print_table(std::slice::from_ref(&record), terminal),
    }
}

pub fn emit_records(
    records: &[Recorder],
    format: OutputFormat,
    terminal: &dyn Terminal,
) -> Result<(), RecorderctlError> {
    if format.is_structured() {
        return print_structured(records, terminal);
    }
    print_table(records, terminal)
}

/// Pretty JSON with two-space indentation; records are passed through unfiltered.
pub fn print_structured<T: Serialize + ?Sized>(
    value: &T,
    terminal: &dyn Terminal,
) -> Result<(), RecorderctlError> {
    let text = serde_json::to_string_pretty(value)
        .map_err(|e| RecorderctlError::Serialization(e.to_string()))?;
    terminal.write_line(&text)
}

fn print_table(records: &[Recorder], terminal: &dyn Terminal) -> Result<(), RecorderctlError> {
    let mut out = Vec::new();
    let mut diagnostics = Vec::new();
    let summary = render_recorder_list(records, &mut out, &mut diagnostics)
        .map_err(|e| RecorderctlError::Io(e.to_string()))?;

    if summary.skipped > 0 {
        append_run_log(
            "warn",
            "recorder.render.skipped",
            json!({ "skipped": summary.skipped }),
        );
        terminal.write_stderr(&String::from_utf8_lossy(&diagnostics))?;
    }
    append_run_log(
        "debug",
        "recorder.render.completed",
        json!({ "recorders": summary.recorders, "rows": summary.rows }),
    );
    terminal.write_stdout(&String::from_utf8_lossy(&out))
}

#[cfg(test)]
mod tests {
    use super::{get_recorder, list_recorders};
    use crate::daemon::RecorderSource;
    use crate::errors::RecorderctlError;
    use crate::recorder::{Recorder, RecorderFilter, RecorderSpec, RecorderStatus};
    use crate::runtime::FakeTerminal;
    use crate::types::OutputFormat;
    use std::cell::Cell;

    struct StaticSource {
        records: Vec<Recorder>,
        calls: Cell<usize>,
    }

    impl StaticSource {
        fn new(records: Vec<Recorder>) -> Self {
            Self {
                records,
                calls: Cell::new(0),
            }
        }
    }

    impl RecorderSource for StaticSource {
        fn list_recorders(&self) -> Result<Vec<Recorder>, RecorderctlError> {
            self.calls.set(self.calls.get() + 1);
            Ok(self.records.clone())
        }

        fn get_recorder(&self, id: u64) -> Result<Recorder, RecorderctlError> {
            self.records
                .iter()
                .find(|rec| rec.realized().map(|r| r.id == id).unwrap_or(false))
                .cloned()
                .ok_or_else(|| RecorderctlError::Transport(format!("recorder {id} not found")))
        }
    }

    struct DownSource;

    impl RecorderSource for DownSource {
        fn list_recorders(&self) -> Result<Vec<Recorder>, RecorderctlError> {
            Err(RecorderctlError::Transport("connection refused".to_string()))
        }

        fn get_recorder(&self, _id: u64) -> Result<Recorder, RecorderctlError> {
            Err(RecorderctlError::Transport("connection refused".to_string()))
        }
    }

    fn realized(id: u64) -> Recorder {
        Recorder {
            spec: None,
            status: Some(RecorderStatus {
                realized: Some(RecorderSpec {
                    id: Some(id),
                    capture_length: Some(100),
                    filters: Some(vec![RecorderFilter {
                        src_prefix: "10.0.0.1".to_string(),
                        src_port: "*".to_string(),
                        dst_prefix: "10.0.0.2".to_string(),
                        dst_port: "80".to_string(),
                        protocol: "TCP".to_string(),
                    }]),
                }),
            }),
        }
    }

    #[test]
    fn table_mode_writes_rows_to_stdout_and_diagnostics_to_stderr() {
        let source = StaticSource::new(vec![Recorder::default(), realized(5)]);
        let terminal = FakeTerminal::default();
        list_recorders(&source, OutputFormat::Table, &terminal).expect("listed");

        let stdout = terminal.stdout();
        assert_eq!(stdout.lines().count(), 2);
        assert!(stdout.contains("<= 100"));
        assert_eq!(terminal.stderr(), "error parsing recorder: empty state\n");
        assert_eq!(source.calls.get(), 1);
    }

    #[test]
    fn json_mode_passes_malformed_records_through_untouched() {
        let source = StaticSource::new(vec![Recorder::default(), realized(5)]);
        let terminal = FakeTerminal::default();
        list_recorders(&source, OutputFormat::Json, &terminal).expect("listed");

        let parsed: Vec<Recorder> = serde_json::from_str(&terminal.stdout()).expect("json");
        assert_eq!(parsed, source.records);
        assert!(terminal.stderr().is_empty());
        assert!(!terminal.stdout().contains("Capture Length"));
    }

    #[test]
    fn fetch_failure_produces_no_output() {
        let terminal = FakeTerminal::default();
        let err = list_recorders(&DownSource, OutputFormat::Table, &terminal)
            .expect_err("fatal");
        assert_eq!(
            err.to_string(),
            "transport error: cannot get recorder list: connection refused"
        );
        assert!(terminal.stdout().is_empty());
    }

    #[test]
    fn get_renders_single_recorder_in_both_modes() {
        let source = StaticSource::new(vec![realized(3), realized(8)]);
        let terminal = FakeTerminal::default();
        get_recorder(&source, 8, OutputFormat::Table, &terminal).expect("table");
        let lines = terminal.stdout().lines().map(str::to_string).collect::<Vec<_>>();
        assert_eq!(lines.len(), 2);
        assert!(lines[1].trim_start().starts_with('8'));

        let terminal = FakeTerminal::default();
        get_recorder(&source, 3, OutputFormat::Json, &terminal).expect("json");
        let parsed: Recorder = serde_json::from_str(&terminal.stdout()).expect("json");
        assert_eq!(parsed, realized(3));
    }
}
