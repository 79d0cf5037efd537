use crate::errors::RecorderctlError;
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};
use std::time::Duration;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HttpRequest {
    pub url: String,
    pub timeout: Duration,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HttpResponse {
    pub status: u16,
    pub body: String,
}

impl HttpResponse {
    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }
}

pub trait Transport: Send + Sync {
    fn get(&self, request: HttpRequest) -> Result<HttpResponse, RecorderctlError>;
}

pub trait FileSystem: Send + Sync {
    fn read_to_string(&self, path: &Path) -> Result<String, RecorderctlError>;
}

pub trait Terminal: Send + Sync {
    fn write_stdout(&self, text: &str) -> Result<(), RecorderctlError>;
    fn write_stderr(&self, text: &str) -> Result<(), RecorderctlError>;

    fn write_line(&self, line: &str) -> Result<(), RecorderctlError> {
        self.write_stdout(&format!("{line}\n"))
    }
}

pub struct ProductionTransport;

impl Transport for ProductionTransport {
    fn get(&self, request: HttpRequest) -> Result<HttpResponse, RecorderctlError> {
        let client = reqwest::blocking::Client::builder()
            .timeout(request.timeout)
            .build()
            .map_err(|e| RecorderctlError::Transport(e.to_string()))?;
        let response = client
            .get(&request.url)
            .header(reqwest::header::ACCEPT, "application/json")
            .send()
            .map_err(|e| RecorderctlError::Transport(format!("GET {}: {e}", request.url)))?;
        let status = response.status().as_u16();
        let body = response
            .text()
            .map_err(|e| RecorderctlError::Transport(format!("GET {}: {e}", request.url)))?;
        Ok(HttpResponse { status, body })
    }
}

pub struct ProductionFileSystem;

impl FileSystem for ProductionFileSystem {
    fn read_to_string(&self, path: &Path) -> Result<String, RecorderctlError> {
        std::fs::read_to_string(path)
            .map_err(|e| RecorderctlError::Io(format!("{}: {e}", path.display())))
    }
}

pub struct ProductionTerminal;

impl Terminal for ProductionTerminal {
    fn write_stdout(&self, text: &str) -> Result<(), RecorderctlError> {
        use std::io::Write;
        let mut out = std::io::stdout().lock();
        out.write_all(text.as_bytes())
            .and_then(|_| out.flush())
            .map_err(|e| RecorderctlError::Io(e.to_string()))
    }

    fn write_stderr(&self, text: &str) -> Result<(), RecorderctlError> {
        use std::io::Write;
        let mut err = std::io::stderr().lock();
        err.write_all(text.as_bytes())
            .and_then(|_| err.flush())
            .map_err(|e| RecorderctlError::Io(e.to_string()))
    }
}

pub struct ProductionRuntime {
    pub file_system: Arc<dyn FileSystem>,
    pub transport: Arc<dyn Transport>,
    pub terminal: Arc<dyn Terminal>,
}

impl ProductionRuntime {
    pub fn new() -> Self {
        Self {
            file_system: Arc::new(ProductionFileSystem),
            transport: Arc::new(ProductionTransport),
            terminal: Arc::new(ProductionTerminal),
        }
    }
}

impl Default for ProductionRuntime {
    fn default() -> Self {
        Self::new()
    }
}

#[derive(Default, Clone)]
pub struct FakeFileSystem {
    files: Arc<Mutex<HashMap<PathBuf, String>>>,
}

impl FakeFileSystem {
    pub fn with_file(path: impl Into<PathBuf>, contents: impl Into<String>) -> Self {
        let fs = Self::default();
        fs.insert(path, contents);
        fs
    }

    pub fn insert(&self, path: impl Into<PathBuf>, contents: impl Into<String>) {
        self.files
            .lock()
            .expect("files lock")
            .insert(path.into(), contents.into());
    }
}

impl FileSystem for FakeFileSystem {
    fn read_to_string(&self, path: &Path) -> Result<String, RecorderctlError> {
        self.files
            .lock()
            .expect("files lock")
            .get(path)
            .cloned()
            .ok_or_else(|| RecorderctlError::Io(format!("missing file {}", path.display())))
    }
}

#[derive(Default, Clone)]
pub struct FakeTerminal {
    stdout: Arc<Mutex<String>>,
    stderr: Arc<Mutex<String>>,
}

impl FakeTerminal {
    pub fn stdout(&self) -> String {
        self.stdout.lock().expect("stdout lock").clone()
    }

    pub fn stderr(&self) -> String {
        self.stderr.lock().expect("stderr lock").clone()
    }
}

impl Terminal for FakeTerminal {
    fn write_stdout(&self, text: &str) -> Result<(), RecorderctlError> {
        self.stdout.lock().expect("stdout lock").push_str(text);
        Ok(())
    }

    fn write_stderr(&self, text: &str) -> Result<(), RecorderctlError> {
        self.stderr.lock().expect("stderr lock").push_str(text);
        Ok(())
    }
}

#[derive(Default, Clone)]
pub struct FakeTransport {
    responses: Arc<Mutex<Vec<Result<HttpResponse, RecorderctlError>>>>,
    requests: Arc<Mutex<Vec<HttpRequest>>>,
}

impl FakeTransport {
    pub fn push_response(&self, response: Result<HttpResponse, RecorderctlError>) {
        self.responses.lock().expect("responses lock").push(response);
    }

    pub fn push_json(&self, status: u16, body: impl Into<String>) {
        self.push_response(Ok(HttpResponse {
            status,
            body: body.into(),
        }));
    }

    pub fn requests(&self) -> Vec<HttpRequest> {
        self.requests.lock().expect("requests lock").clone()
    }
}

impl Transport for FakeTransport {
    fn get(&self, request: HttpRequest) -> Result<HttpResponse, RecorderctlError> {
        self.requests.lock().expect("requests lock").push(request);
        let mut responses = self.responses.lock().expect("responses lock");
        if responses.is_empty() {
            return Err(RecorderctlError::Transport(
                "no fake response queued".to_string(),
            ));
        }
        responses.remove(0)
    }
}
