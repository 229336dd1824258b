#![allow(dead_code)]

use std::io::{BufRead, BufReader, Read, Write};
use std::net::{TcpListener, TcpStream};
use std::path::Path;
use std::sync::{Arc, Mutex};
use std::thread;

use reqwest::Url;
use serde_json::Value;

use arcyd::config::ConduitConfig;
use arcyd::instance::InstanceConfig;
use arcyd::registration::RegistrationRequest;

/// One recorded HTTP request: request line plus body.
#[derive(Debug, Clone)]
pub struct Recorded {
    pub request_line: String,
    pub body: String,
}

impl Recorded {
    /// Path of the request line, e.g. `/api/conduit.ping`.
    pub fn path(&self) -> &str {
        self.request_line.split(' ').nth(1).unwrap_or("")
    }

    /// The decoded `params` form field, parsed as JSON.
    pub fn params(&self) -> Value {
        let url = Url::parse(&format!("http://stub/?{}", self.body)).expect("form body");
        let raw = url
            .query_pairs()
            .find(|(k, _)| k == "params")
            .map(|(_, v)| v.into_owned())
            .expect("params field");
        serde_json::from_str(&raw).expect("params json")
    }

    pub fn field(&self, name: &str) -> Option<String> {
        let url = Url::parse(&format!("http://stub/?{}", self.body)).ok()?;
        url.query_pairs().find(|(k, _)| k == name).map(|(_, v)| v.into_owned())
    }
}

pub const SESSION_REPLY: &str =
    r#"{"result":{"connectionID":42,"sessionKey":"stub-session","userPHID":"PHID-USER-bot"},"error_code":null,"error_info":null}"#;
pub const PONG_REPLY: &str = r#"{"result":"phab.example","error_code":null,"error_info":null}"#;

type Reply = (u16, &'static str);

/// Minimal HTTP/1.1 server standing in for a Conduit api.
///
/// `conduit.connect` and every other method get their own fixed reply.
pub struct StubConduit {
    pub api_uri: String,
    requests: Arc<Mutex<Vec<Recorded>>>,
}

impl StubConduit {
    /// Same reply for every method.
    pub fn start(status: u16, body: &'static str) -> Self {
        Self::routed((status, body), (status, body))
    }

    /// Handshake succeeds; the ping gets `ping`.
    pub fn after_connect(status: u16, body: &'static str) -> Self {
        Self::routed((200, SESSION_REPLY), (status, body))
    }

    /// Handshake and ping both succeed.
    pub fn pong() -> Self {
        Self::after_connect(200, PONG_REPLY)
    }

    fn routed(connect: Reply, other: Reply) -> Self {
        let listener = TcpListener::bind("127.0.0.1:0").expect("bind stub conduit");
        let port = listener.local_addr().expect("stub addr").port();
        let requests = Arc::new(Mutex::new(Vec::new()));

        let seen = Arc::clone(&requests);
        thread::spawn(move || {
            for stream in listener.incoming() {
                let Ok(mut stream) = stream else { break };
                let Some(recorded) = read_request(&mut stream) else { continue };
                let (status, body) = if recorded.path().ends_with("/conduit.connect") {
                    connect
                } else {
                    other
                };
                seen.lock().unwrap().push(recorded);

                let reason = if status == 200 { "OK" } else { "Error" };
                let response = format!(
                    "HTTP/1.1 {status} {reason}\r\nContent-Type: application/json\r\nContent-Length: {}\r\nConnection: close\r\n\r\n{body}",
                    body.len()
                );
                let _ = stream.write_all(response.as_bytes());
                let _ = stream.flush();
            }
        });

        Self {
            api_uri: format!("http://127.0.0.1:{port}/api/"),
            requests,
        }
    }

    pub fn hits(&self) -> usize {
        self.requests.lock().unwrap().len()
    }

    pub fn requests(&self) -> Vec<Recorded> {
        self.requests.lock().unwrap().clone()
    }
}

fn read_request(stream: &mut TcpStream) -> Option<Recorded> {
    let mut reader = BufReader::new(stream.try_clone().ok()?);

    let mut request_line = String::new();
    reader.read_line(&mut request_line).ok()?;

    let mut content_length = 0usize;
    loop {
        let mut line = String::new();
        if reader.read_line(&mut line).ok()? == 0 {
            break;
        }
        let line = line.trim_end();
        if line.is_empty() {
            break;
        }
        if let Some((name, value)) = line.split_once(':') {
            if name.eq_ignore_ascii_case("content-length") {
                content_length = value.trim().parse().unwrap_or(0);
            }
        }
    }

    let mut body = vec![0u8; content_length];
    reader.read_exact(&mut body).ok()?;

    Some(Recorded {
        request_line: request_line.trim_end().to_string(),
        body: String::from_utf8_lossy(&body).to_string(),
    })
}

/// A `http://127.0.0.1:<port>/api/` uri where nothing is listening.
pub fn unreachable_uri() -> String {
    let listener = TcpListener::bind("127.0.0.1:0").expect("bind free port");
    let port = listener.local_addr().expect("free port addr").port();
    drop(listener);
    format!("http://127.0.0.1:{port}/api/")
}

pub fn http_backend() -> ConduitConfig {
    ConduitConfig { backend: "http".into(), timeout_seconds: Some(10) }
}

pub fn request(name: &str, uri: &str, proxy: Option<&str>) -> RegistrationRequest {
    RegistrationRequest::new(
        name,
        InstanceConfig::new(uri, "bot", "XYZ", proxy.map(str::to_string)),
    )
}

pub fn file_count(dir: &Path) -> usize {
    std::fs::read_dir(dir).expect("read dir").count()
}
