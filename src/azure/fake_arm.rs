//! A small HTTP/1.1 server standing in for Resource Manager in tests.
//!
//! Routes match on method and a substring of the request target. Each
//! route serves its queued responses in order and repeats the last one.
//! Unrouted requests get a 404 with an ARM error body.

use crate::azure::client::{ArmClient, ArmClientConfig};
use std::sync::{Arc, Mutex};
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::{TcpListener, TcpStream};

struct Route {
    method: &'static str,
    target: String,
    responses: Vec<(u16, String)>,
    served: usize,
}

#[derive(Default)]
struct State {
    routes: Vec<Route>,
    requests: Vec<String>,
}

pub struct FakeArm {
    base: String,
    state: Arc<Mutex<State>>,
}

impl FakeArm {
    pub async fn start() -> Self {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let base = format!("http://{}", listener.local_addr().unwrap());
        let state = Arc::new(Mutex::new(State::default()));

        let shared = Arc::clone(&state);
        tokio::spawn(async move {
            while let Ok((stream, _)) = listener.accept().await {
                let state = Arc::clone(&shared);
                tokio::spawn(async move {
                    let _ = handle(stream, state).await;
                });
            }
        });

        Self { base, state }
    }

    /// Queue a response for `method` requests whose target contains `target`.
    pub fn route(&self, method: &'static str, target: &str, status: u16, body: &str) -> &Self {
        let mut state = self.state.lock().unwrap();
        let response = (status, body.to_string());
        match state
            .routes
            .iter_mut()
            .find(|r| r.method == method && r.target == target)
        {
            Some(route) => route.responses.push(response),
            None => state.routes.push(Route {
                method,
                target: target.to_string(),
                responses: vec![response],
                served: 0,
            }),
        }
        self
    }

    /// Client pointed at this server.
    pub fn client(&self, retries: usize) -> ArmClient {
        ArmClient::new(
            ArmClientConfig {
                endpoint: self.base.clone(),
                timeout_seconds: 5,
                retries,
            },
            "test-token".to_string(),
        )
        .unwrap()
    }

    pub fn base(&self) -> &str {
        &self.base
    }

    /// Every request seen so far as `METHOD target`.
    pub fn requests(&self) -> Vec<String> {
        self.state.lock().unwrap().requests.clone()
    }

    /// Requests whose line contains `needle`.
    pub fn count(&self, needle: &str) -> usize {
        self.requests().iter().filter(|r| r.contains(needle)).count()
    }
}

async fn handle(mut stream: TcpStream, state: Arc<Mutex<State>>) -> std::io::Result<()> {
    let mut buf = Vec::new();
    let mut chunk = [0u8; 4096];

    let header_end = loop {
        let n = stream.read(&mut chunk).await?;
        if n == 0 {
            return Ok(());
        }
        buf.extend_from_slice(&chunk[..n]);
        if let Some(pos) = buf.windows(4).position(|w| w == b"\r\n\r\n") {
            break pos + 4;
        }
    };

    let head = String::from_utf8_lossy(&buf[..header_end]).to_string();
    let content_length = head
        .lines()
        .filter_map(|l| l.split_once(':'))
        .find(|(k, _)| k.trim().eq_ignore_ascii_case("content-length"))
        .and_then(|(_, v)| v.trim().parse::<usize>().ok())
        .unwrap_or(0);
    while buf.len() < header_end + content_length {
        let n = stream.read(&mut chunk).await?;
        if n == 0 {
            break;
        }
        buf.extend_from_slice(&chunk[..n]);
    }

    let mut request_line = head.lines().next().unwrap_or_default().split_whitespace();
    let method = request_line.next().unwrap_or_default().to_string();
    let target = request_line.next().unwrap_or_default().to_string();

    let (status, body) = {
        let mut state = state.lock().unwrap();
        state.requests.push(format!("{} {}", method, target));
        match state
            .routes
            .iter_mut()
            .find(|r| r.method == method && target.contains(&r.target))
        {
            Some(route) => {
                let idx = route.served.min(route.responses.len() - 1);
                route.served += 1;
                route.responses[idx].clone()
            }
            None => (
                404,
                r#"{"error": {"code": "NotFound", "message": "no route"}}"#.to_string(),
            ),
        }
    };

    let response = format!(
        "HTTP/1.1 {} Fake\r\nContent-Type: application/json\r\nContent-Length: {}\r\nRetry-After: 0\r\nConnection: close\r\n\r\n{}",
        status,
        body.len(),
        body
    );
    stream.write_all(response.as_bytes()).await?;
    stream.shutdown().await
}
