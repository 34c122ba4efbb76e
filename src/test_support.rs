//! # Scripted HTTP Server for Testing
//!
//! `TestServer` answers plain HTTP/1.1 requests from a route table. Routes can
//! delay their answer or drop the first connections without answering, which
//! mockito cannot express. Every response closes the connection.

use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::{TcpListener, TcpStream};
use tokio::task::JoinHandle;

#[derive(Debug, Clone)]
pub struct Route {
    status: u16,
    body: String,
    delay: Duration,
    drop_first: usize,
}

impl Route {
    pub fn ok(body: impl Into<String>) -> Self {
        Self::status(200, body)
    }

    pub fn status(status: u16, body: impl Into<String>) -> Self {
        Self {
            status,
            body: body.into(),
            delay: Duration::ZERO,
            drop_first: 0,
        }
    }

    /// Wait before answering
    pub fn delay(mut self, delay: Duration) -> Self {
        self.delay = delay;
        self
    }

    /// Close the first `n` connections after reading the request
    pub fn drop_first(mut self, n: usize) -> Self {
        self.drop_first = n;
        self
    }
}

#[derive(Default)]
struct State {
    hits: HashMap<String, usize>,
    served: Vec<String>,
}

pub struct TestServer {
    url: String,
    state: Arc<Mutex<State>>,
    task: JoinHandle<()>,
}

impl TestServer {
    /// Serve `routes` on a local port. Unknown paths get a 404.
    pub async fn start(routes: Vec<(&str, Route)>) -> Self {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let url = format!("http://{}", listener.local_addr().unwrap());
        let routes: Arc<HashMap<String, Route>> = Arc::new(
            routes
                .into_iter()
                .map(|(path, route)| (path.to_string(), route))
                .collect(),
        );
        let state = Arc::new(Mutex::new(State::default()));

        let task = {
            let state = state.clone();
            tokio::spawn(async move {
                while let Ok((stream, _)) = listener.accept().await {
                    tokio::spawn(handle(stream, routes.clone(), state.clone()));
                }
            })
        };

        Self { url, state, task }
    }

    /// Base URL without a trailing slash
    pub fn url(&self) -> String {
        self.url.clone()
    }

    /// Requests received for `path`
    pub fn hits(&self, path: &str) -> usize {
        self.state.lock().unwrap().hits.get(path).copied().unwrap_or(0)
    }

    /// Paths in the order their responses were written
    pub fn served(&self) -> Vec<String> {
        self.state.lock().unwrap().served.clone()
    }
}

impl Drop for TestServer {
    fn drop(&mut self) {
        self.task.abort();
    }
}

async fn handle(
    mut stream: TcpStream,
    routes: Arc<HashMap<String, Route>>,
    state: Arc<Mutex<State>>,
) {
    let mut request = Vec::new();
    let mut buf = [0u8; 1024];
    while !request.windows(4).any(|w| w == b"\r\n\r\n") {
        match stream.read(&mut buf).await {
            Ok(0) | Err(_) => return,
            Ok(n) => request.extend_from_slice(&buf[..n]),
        }
    }

    let request = String::from_utf8_lossy(&request);
    let path = request
        .lines()
        .next()
        .and_then(|line| line.split_whitespace().nth(1))
        .unwrap_or("/")
        .to_string();

    let hit = {
        let mut state = state.lock().unwrap();
        let hits = state.hits.entry(path.clone()).or_default();
        *hits += 1;
        *hits
    };

    let route = routes
        .get(&path)
        .cloned()
        .unwrap_or_else(|| Route::status(404, "not found"));
    if hit <= route.drop_first {
        return;
    }
    tokio::time::sleep(route.delay).await;

    let response = format!(
        "HTTP/1.1 {} Scripted\r\nContent-Type: text/html\r\nContent-Length: {}\r\nConnection: close\r\n\r\n{}",
        route.status,
        route.body.len(),
        route.body
    );
    if stream.write_all(response.as_bytes()).await.is_ok() {
        let _ = stream.shutdown().await;
        state.lock().unwrap().served.push(path);
    }
}
