#![allow(dead_code)]

use async_trait::async_trait;
use serde_json::json;
use std::sync::Mutex;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::TcpListener;
use tokio::sync::oneshot;
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

use gorag::config::Config;
use gorag::error::GatewayError;
use gorag::index::VectorIndex;
use gorag::models::{Namespace, RetrievalCandidate};

/// Config pointing at the given mock servers, with short timeouts.
pub fn test_config(embed_url: &str, generation_url: &str) -> Config {
    let mut cfg = Config::default();
    cfg.embedding.url = embed_url.to_string();
    cfg.embedding.timeout_secs = 5;
    cfg.generation.url = generation_url.to_string();
    cfg.generation.connect_timeout_secs = 5;
    cfg.generation.idle_timeout_secs = 5;
    cfg
}

pub fn candidate(id: &str, score: f32, source: &str) -> RetrievalCandidate {
    RetrievalCandidate {
        id: id.to_string(),
        score,
        payload: json!({ "source": source }).as_object().cloned().unwrap(),
    }
}

/// Mount an embeddings endpoint returning `model` and `vectors`.
pub async fn mount_embeddings(server: &MockServer, model: &str, vectors: Vec<Vec<f32>>) {
    let data: Vec<_> = vectors
        .into_iter()
        .enumerate()
        .map(|(i, v)| json!({ "embedding": v, "index": i, "object": "embedding" }))
        .collect();
    Mock::given(method("POST"))
        .and(path("/v1/embeddings"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "model": model,
            "object": "list",
            "data": data,
        })))
        .mount(server)
        .await;
}

/// `n` SSE lines shaped like llama.cpp streaming deltas.
pub fn sse_lines(n: usize) -> Vec<String> {
    (0..n)
        .map(|i| {
            format!(
                "data: {{\"choices\":[{{\"index\":0,\"delta\":{{\"content\":\"tok{}\"}}}}]}}\n",
                i
            )
        })
        .collect()
}

pub fn sse_response(lines: &[String]) -> ResponseTemplate {
    ResponseTemplate::new(200)
        .set_body_string(lines.concat())
        .insert_header("content-type", "text/event-stream")
}

/// Index returning canned candidates and recording every search.
pub struct FixedIndex {
    results: Result<Vec<RetrievalCandidate>, &'static str>,
    pub calls: Mutex<Vec<(String, Vec<f32>, usize)>>,
}

impl FixedIndex {
    pub fn returning(results: Vec<RetrievalCandidate>) -> Self {
        Self {
            results: Ok(results),
            calls: Mutex::new(Vec::new()),
        }
    }

    pub fn failing(message: &'static str) -> Self {
        Self {
            results: Err(message),
            calls: Mutex::new(Vec::new()),
        }
    }

    pub fn calls(&self) -> Vec<(String, Vec<f32>, usize)> {
        self.calls.lock().unwrap().clone()
    }
}

#[async_trait]
impl VectorIndex for FixedIndex {
    async fn search(
        &self,
        namespace: &Namespace,
        vector: &[f32],
        limit: usize,
    ) -> Result<Vec<RetrievalCandidate>, GatewayError> {
        self.calls
            .lock()
            .unwrap()
            .push((namespace.to_string(), vector.to_vec(), limit));
        match &self.results {
            Ok(results) => Ok(results.iter().take(limit).cloned().collect()),
            Err(message) => Err(GatewayError::IndexUnavailable(message.to_string())),
        }
    }
}

/// Serve exactly one HTTP request: reply with a chunked body made of
/// `chunks`, then close the socket without the terminating zero-length
/// chunk. Returns the base URL.
pub async fn spawn_truncating_server(chunks: Vec<String>) -> String {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();

    tokio::spawn(async move {
        let (mut socket, _) = listener.accept().await.unwrap();
        read_request(&mut socket).await;

        socket
            .write_all(
                b"HTTP/1.1 200 OK\r\n\
                  content-type: text/event-stream\r\n\
                  transfer-encoding: chunked\r\n\r\n",
            )
            .await
            .unwrap();
        for chunk in chunks {
            let frame = format!("{:x}\r\n{}\r\n", chunk.len(), chunk);
            socket.write_all(frame.as_bytes()).await.unwrap();
            socket.flush().await.unwrap();
        }
        // Drop mid-stream.
        let _ = socket.shutdown().await;
    });

    format!("http://{}", addr)
}

/// Serve exactly one HTTP request: send `line` as the first chunk of a
/// chunked body, then keep the socket open. The receiver fires once the
/// client closes the connection. Returns the base URL and that receiver.
pub async fn spawn_stalled_server(line: &str) -> (String, oneshot::Receiver<()>) {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    let line = line.to_string();
    let (closed_tx, closed_rx) = oneshot::channel();

    tokio::spawn(async move {
        let (mut socket, _) = listener.accept().await.unwrap();
        read_request(&mut socket).await;

        socket
            .write_all(
                b"HTTP/1.1 200 OK\r\n\
                  content-type: text/event-stream\r\n\
                  transfer-encoding: chunked\r\n\r\n",
            )
            .await
            .unwrap();
        let frame = format!("{:x}\r\n{}\r\n", line.len(), line);
        socket.write_all(frame.as_bytes()).await.unwrap();
        socket.flush().await.unwrap();

        let mut buf = [0u8; 1024];
        loop {
            match socket.read(&mut buf).await {
                Ok(0) | Err(_) => break,
                Ok(_) => continue,
            }
        }
        let _ = closed_tx.send(());
    });

    (format!("http://{}", addr), closed_rx)
}

/// Read request headers and the `content-length` body.
async fn read_request(socket: &mut tokio::net::TcpStream) {
    let mut buf = Vec::new();
    let mut tmp = [0u8; 4096];
    let header_end = loop {
        let n = socket.read(&mut tmp).await.unwrap();
        if n == 0 {
            return;
        }
        buf.extend_from_slice(&tmp[..n]);
        if let Some(pos) = buf.windows(4).position(|w| w == b"\r\n\r\n") {
            break pos + 4;
        }
    };

    let headers = String::from_utf8_lossy(&buf[..header_end]).to_lowercase();
    let content_length = headers
        .lines()
        .find_map(|l| l.strip_prefix("content-length:"))
        .and_then(|v| v.trim().parse::<usize>().ok())
        .unwrap_or(0);

    while buf.len() < header_end + content_length {
        let n = socket.read(&mut tmp).await.unwrap();
        if n == 0 {
            break;
        }
        buf.extend_from_slice(&tmp[..n]);
    }
}
