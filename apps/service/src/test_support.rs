//! Fixtures shared by unit tests: temp databases and tiny HTTP endpoints.

use std::net::SocketAddr;
use std::sync::{Arc, Mutex};

use tempfile::TempDir;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::{TcpListener, TcpStream};

use crate::database::{DatabaseImpl, initialize_database};
use crate::pool::open_pool;

/// Fresh on-disk database; keep the `TempDir` alive for the test's duration
pub async fn create_test_database() -> anyhow::Result<(Arc<DatabaseImpl>, TempDir)> {
    let temp_dir = tempfile::tempdir()?;
    let db_path = temp_dir.path().join("test.db");

    let pool = open_pool(&db_path.to_string_lossy()).await?;
    let conn = pool.get().await?;
    initialize_database(&conn).await?;
    drop(conn);

    Ok((Arc::new(DatabaseImpl::new_from_pool(pool)), temp_dir))
}

/// Requests captured by a [`StubServer`], raw head plus body
pub type Captured = Arc<Mutex<Vec<String>>>;

/// HTTP/1.1 endpoint answering every request with the same canned response
pub struct StubServer {
    pub addr: SocketAddr,
    pub requests: Captured,
}

impl StubServer {
    pub async fn start(status: u16, body: &str) -> Self {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        let requests: Captured = Arc::default();
        let body = body.to_string();

        let captured = requests.clone();
        tokio::spawn(async move {
            while let Ok((stream, _)) = listener.accept().await {
                let captured = captured.clone();
                let body = body.clone();
                tokio::spawn(async move {
                    respond(stream, status, &body, &captured).await;
                });
            }
        });

        Self { addr, requests }
    }

    pub fn url(&self, path: &str) -> String {
        format!("http://{}{}", self.addr, path)
    }

    pub fn request_count(&self) -> usize {
        self.requests.lock().unwrap().len()
    }
}

async fn respond(mut stream: TcpStream, status: u16, body: &str, captured: &Captured) -> Option<()> {
    let mut buffer = Vec::new();
    let mut chunk = [0u8; 4096];

    let head_end = loop {
        let read = stream.read(&mut chunk).await.ok()?;
        if read == 0 {
            return None;
        }
        buffer.extend_from_slice(&chunk[..read]);
        if let Some(pos) = buffer.windows(4).position(|w| w == b"\r\n\r\n") {
            break pos + 4;
        }
    };

    let head = String::from_utf8_lossy(&buffer[..head_end]).to_string();
    let content_length = head
        .lines()
        .filter_map(|line| line.split_once(':'))
        .find(|(name, _)| name.eq_ignore_ascii_case("content-length"))
        .and_then(|(_, value)| value.trim().parse::<usize>().ok())
        .unwrap_or(0);

    while buffer.len() < head_end + content_length {
        let read = stream.read(&mut chunk).await.ok()?;
        if read == 0 {
            break;
        }
        buffer.extend_from_slice(&chunk[..read]);
    }

    // Record before answering so the client never observes a response first
    captured.lock().unwrap().push(String::from_utf8_lossy(&buffer).to_string());

    let response = format!(
        "HTTP/1.1 {status} Stub\r\ncontent-type: text/html\r\ncontent-length: {}\r\nconnection: close\r\n\r\n{body}",
        body.len()
    );
    stream.write_all(response.as_bytes()).await.ok()?;
    stream.shutdown().await.ok();
    Some(())
}

/// A local port with nothing listening on it
pub async fn closed_port() -> u16 {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    listener.local_addr().unwrap().port()
}
