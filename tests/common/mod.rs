use assert_cmd::Command;
use serde_json::Value;
use std::collections::HashMap;
use std::fs;
use std::io::{BufRead, BufReader, Read, Write};
use std::net::{TcpListener, TcpStream};
use std::path::PathBuf;
use std::sync::{Arc, Mutex};
use tempfile::TempDir;

#[derive(Clone, Debug)]
pub struct RecordedRequest {
    pub method: String,
    pub path: String,
    pub body: String,
}

#[derive(Clone)]
struct StubResponse {
    status: u16,
    body: Value,
}

/// Minimal loopback HTTP stub standing in for the CivicConnect backend.
/// Routes are keyed by (method, path without query); every request is
/// recorded so tests can assert exact call counts.
pub struct StubServer {
    base_url: String,
    routes: Arc<Mutex<HashMap<(String, String), StubResponse>>>,
    requests: Arc<Mutex<Vec<RecordedRequest>>>,
}

impl StubServer {
    pub fn start() -> Self {
        let listener = TcpListener::bind("127.0.0.1:0").expect("bind stub server");
        let base_url = format!("http://{}", listener.local_addr().expect("stub addr"));
        let routes: Arc<Mutex<HashMap<(String, String), StubResponse>>> = Arc::default();
        let requests: Arc<Mutex<Vec<RecordedRequest>>> = Arc::default();

        let accept_routes = Arc::clone(&routes);
        let accept_requests = Arc::clone(&requests);
        std::thread::spawn(move || {
            for stream in listener.incoming() {
                let Ok(stream) = stream else { continue };
                let routes = Arc::clone(&accept_routes);
                let requests = Arc::clone(&accept_requests);
                std::thread::spawn(move || {
                    let _ = serve_connection(stream, routes, requests);
                });
            }
        });

        Self {
            base_url,
            routes,
            requests,
        }
    }

    pub fn url(&self) -> String {
        self.base_url.clone()
    }

    pub fn route(&self, method: &str, path: &str, status: u16, body: Value) {
        self.routes
            .lock()
            .expect("routes lock")
            .insert((method.to_string(), path.to_string()), StubResponse { status, body });
    }

    pub fn hits(&self, method: &str, path: &str) -> usize {
        self.requests
            .lock()
            .expect("requests lock")
            .iter()
            .filter(|r| r.method == method && r.path == path)
            .count()
    }

    pub fn total_hits(&self) -> usize {
        self.requests.lock().expect("requests lock").len()
    }

    pub fn last_body(&self, method: &str, path: &str) -> Option<String> {
        self.requests
            .lock()
            .expect("requests lock")
            .iter()
            .rev()
            .find(|r| r.method == method && r.path == path)
            .map(|r| r.body.clone())
    }
}

fn serve_connection(
    mut stream: TcpStream,
    routes: Arc<Mutex<HashMap<(String, String), StubResponse>>>,
    requests: Arc<Mutex<Vec<RecordedRequest>>>,
) -> std::io::Result<()> {
    let mut reader = BufReader::new(stream.try_clone()?);
    let mut request_line = String::new();
    reader.read_line(&mut request_line)?;
    let mut parts = request_line.split_whitespace();
    let method = parts.next().unwrap_or("").to_string();
    let target = parts.next().unwrap_or("").to_string();
    let path = target.split('?').next().unwrap_or("").to_string();

    let mut content_length = 0usize;
    loop {
        let mut line = String::new();
        if reader.read_line(&mut line)? == 0 {
            break;
        }
        let trimmed = line.trim_end();
        if trimmed.is_empty() {
            break;
        }
        if let Some(v) = trimmed.to_ascii_lowercase().strip_prefix("content-length:") {
            content_length = v.trim().parse().unwrap_or(0);
        }
    }
    let mut body = vec![0u8; content_length];
    if content_length > 0 {
        reader.read_exact(&mut body)?;
    }

    requests.lock().expect("requests lock").push(RecordedRequest {
        method: method.clone(),
        path: path.clone(),
        body: String::from_utf8_lossy(&body).to_string(),
    });

    let response = routes
        .lock()
        .expect("routes lock")
        .get(&(method, path))
        .cloned();
    let (status, payload) = match response {
        Some(r) => (r.status, r.body.to_string()),
        None => (404, serde_json::json!({ "message": "not found" }).to_string()),
    };
    let reason = if status < 400 { "OK" } else { "ERROR" };
    let out = format!(
        "HTTP/1.1 {} {}\r\nContent-Type: application/json\r\nContent-Length: {}\r\nConnection: close\r\n\r\n{}",
        status,
        reason,
        payload.len(),
        payload
    );
    stream.write_all(out.as_bytes())?;
    stream.flush()?;
    Ok(())
}

pub struct TestEnv {
    _tmp: TempDir,
    pub home: PathBuf,
    pub server: StubServer,
}

impl TestEnv {
    pub fn new() -> Self {
        let tmp = TempDir::new().expect("create temp dir");
        let home = tmp.path().join("home");
        fs::create_dir_all(&home).expect("create isolated home");
        let server = StubServer::start();
        Self {
            _tmp: tmp,
            home,
            server,
        }
    }

    pub fn cmd(&self) -> Command {
        let mut cmd = Command::cargo_bin("civic").expect("civic binary");
        cmd.env("HOME", &self.home)
            .arg("--server")
            .arg(self.server.url());
        cmd
    }

    pub fn run_json(&self, args: &[&str]) -> Value {
        let out = self
            .cmd()
            .arg("--json")
            .args(args)
            .assert()
            .success()
            .get_output()
            .stdout
            .clone();
        serde_json::from_slice(&out).expect("valid json output")
    }

    pub fn run_json_fail(&self, args: &[&str]) -> Value {
        let out = self
            .cmd()
            .arg("--json")
            .args(args)
            .assert()
            .failure()
            .get_output()
            .stdout
            .clone();
        serde_json::from_slice(&out).expect("error json output")
    }

    /// Write a citizen session as `civic account login` would.
    pub fn seed_session(&self, name: &str, email: &str) {
        let dir = self.home.join(".config/civic");
        fs::create_dir_all(&dir).expect("create config dir");
        let session = serde_json::json!({
            "token": "test-token",
            "user": { "_id": "u1", "name": name, "email": email }
        });
        fs::write(
            dir.join("session.json"),
            serde_json::to_string_pretty(&session).expect("serialize session"),
        )
        .expect("write session");
    }

    /// Write an admin session as `civic admin login` would.
    pub fn seed_admin(&self, permissions: &[&str]) {
        let dir = self.home.join(".config/civic");
        fs::create_dir_all(&dir).expect("create config dir");
        let session = serde_json::json!({
            "token": "admin-token",
            "permissions": permissions,
            "email": "admin@example.com"
        });
        fs::write(
            dir.join("admin.json"),
            serde_json::to_string_pretty(&session).expect("serialize admin session"),
        )
        .expect("write admin session");
    }
}

pub fn issue_json(id: &str) -> Value {
    serde_json::json!({
        "_id": id,
        "title": "Pothole on Main St",
        "description": "Large pothole",
        "category": "roads",
        "priority": "medium",
        "urgency": "normal",
        "status": "reported",
        "location": { "address": "Main St" },
        "upvotes": 0,
        "downvotes": 0
    })
}
