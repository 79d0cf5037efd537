use crate::config::DaemonConfig;
use crate::errors::RecorderctlError;
use crate::logging::append_run_log;
use crate::recorder::Recorder;
use crate::runtime::{HttpRequest, Transport};
use serde::de::DeserializeOwned;
use serde_json::json;
use std::time::Duration;

pub const RECORDER_PATH: &str = "/v1/recorder";

/// Where recorder records come from. Each call is a fresh snapshot.
pub trait RecorderSource {
    fn list_recorders(&self) -> Result<Vec<Recorder>, RecorderctlError>;
    fn get_recorder(&self, id: u64) -> Result<Recorder, RecorderctlError>;
}

pub struct DaemonClient<'a> {
    transport: &'a dyn Transport,
    host: String,
    timeout: Duration,
}

impl<'a> DaemonClient<'a> {
    pub fn new(transport: &'a dyn Transport, cfg: &DaemonConfig) -> Self {
        Self {
            transport,
            host: cfg.host.trim_end_matches('/').to_string(),
            timeout: cfg.timeout(),
        }
    }

    pub fn url(&self, path: &str) -> String {
        format!("{}{path}", self.host)
    }

    fn get_json<T: DeserializeOwned>(&self, path: &str) -> Result<Option<T>, RecorderctlError> {
        let url = self.url(path);
        append_run_log(
            "debug",
            "daemon.request.started",
            json!({ "url": url, "timeout_ms": self.timeout.as_millis() as u64 }),
        );
        let response = self
            .transport
            .get(HttpRequest {
                url: url.clone(),
                timeout: self.timeout,
            })
            .inspect_err(|err| {
                append_run_log(
                    "error",
                    "daemon.request.failed",
                    json!({ "url": url, "error": err.to_string() }),
                );
            })?;

        if response.status == 404 {
            append_run_log("info", "daemon.request.not_found", json!({ "url": url }));
            return Ok(None);
        }
        if !response.is_success() {
            append_run_log(
                "error",
                "daemon.request.failed",
                json!({ "url": url, "status": response.status, "body": response.body }),
            );
            return Err(RecorderctlError::Transport(format!(
                "GET {url} returned {}: {}",
                response.status,
                response.body.trim()
            )));
        }

        let decoded = serde_json::from_str(&response.body).map_err(|e| {
            append_run_log(
                "error",
                "daemon.response.invalid",
                json!({ "url": url, "error": e.to_string() }),
            );
            RecorderctlError::Transport(format!("GET {url}: invalid response body: {e}"))
        })?;
        append_run_log(
            "debug",
            "daemon.request.fetched",
            json!({ "url": url, "status": response.status, "bytes": response.body.len() }),
        );
        Ok(Some(decoded))
    }
}

impl RecorderSource for DaemonClient<'_> {
    fn list_recorders(&self) -> Result<Vec<Recorder>, RecorderctlError> {
        // A daemon without recorder support answers 404; that is an error here,
        // not an empty list.
        let records: Option<Vec<Recorder>> = self.get_json(RECORDER_PATH)?;
        let records = records.ok_or_else(|| {
            RecorderctlError::Transport(format!(
                "GET {} returned 404: recorder API not available",
                self.url(RECORDER_PATH)
            ))
        })?;
        append_run_log(
            "info",
            "daemon.recorders.listed",
            json!({ "count": records.len() }),
        );
        Ok(records)
    }

    fn get_recorder(&self, id: u64) -> Result<Recorder, RecorderctlError> {
        let path = format!("{RECORDER_PATH}/{id}");
        self.get_json(&path)?
            .ok_or_else(|| RecorderctlError::Transport(format!("recorder {id} not found")))
    }
}

#[cfg(test)]
mod tests {
    use super::{DaemonClient, RecorderSource};
    use crate::config::DaemonConfig;
    use crate::errors::RecorderctlError;
    use crate::runtime::FakeTransport;
    use std::time::Duration;

    fn cfg() -> DaemonConfig {
        DaemonConfig {
            host: "http://127.0.0.1:9234/".to_string(),
            timeout_seconds: 7,
        }
    }

    #[test]
    fn list_requests_recorder_collection_with_configured_timeout() {
        let transport = FakeTransport::default();
        transport.push_json(
            200,
            r#"[{"status":{"realized":{"id":1,"capture-length":0,"filters":[]}}},{}]"#,
        );
        let client = DaemonClient::new(&transport, &cfg());
        let records = client.list_recorders().expect("listed");
        assert_eq!(records.len(), 2);
        assert!(records[1].status.is_none());

        let requests = transport.requests();
        assert_eq!(requests.len(), 1);
        assert_eq!(requests[0].url, "http://127.0.0.1:9234/v1/recorder");
        assert_eq!(requests[0].timeout, Duration::from_secs(7));
    }

    #[test]
    fn non_success_status_and_bad_json_are_transport_errors() {
        let transport = FakeTransport::default();
        transport.push_json(500, "boom");
        transport.push_json(200, "{not json");
        transport.push_json(404, "");
        let client = DaemonClient::new(&transport, &cfg());

        for _ in 0..3 {
            let err = client.list_recorders().expect_err("must fail");
            assert!(matches!(err, RecorderctlError::Transport(_)), "{err}");
        }
    }

    #[test]
    fn transport_failure_is_not_retried() {
        let transport = FakeTransport::default();
        transport.push_response(Err(RecorderctlError::Transport(
            "connection refused".to_string(),
        )));
        transport.push_json(200, "[]");
        let client = DaemonClient::new(&transport, &cfg());
        assert!(client.list_recorders().is_err());
        assert_eq!(transport.requests().len(), 1);
    }

    #[test]
    fn get_by_id_hits_item_path_and_maps_404() {
        let transport = FakeTransport::default();
        transport.push_json(
            200,
            r#"{"status":{"realized":{"id":42,"capture-length":128,"filters":[]}}}"#,
        );
        transport.push_json(404, "");
        let client = DaemonClient::new(&transport, &cfg());

        let rec = client.get_recorder(42).expect("found");
        let realized = rec
            .status
            .and_then(|s| s.realized)
            .expect("realized state");
        assert_eq!(realized.capture_length, Some(128));

        let err = client.get_recorder(7).expect_err("missing");
        assert_eq!(err.to_string(), "transport error: recorder 7 not found");
        assert_eq!(
            transport.requests()[1].url,
            "http://127.0.0.1:9234/v1/recorder/7"
        );
    }
}
