//! Minimal HTTP/1.1 stub for exercising the collector end to end.

#![allow(dead_code)]

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::{TcpListener, TcpStream};

#[derive(Debug, Clone)]
pub enum Reply {
    /// Respond immediately with this status and body.
    Body(u16, String),
    /// Respond with this status and body after a delay.
    Delayed(Duration, u16, String),
    /// Accept the request and never answer.
    Hang,
}

pub struct Stub {
    pub url: String,
    pub port: u16,
    hits: Arc<AtomicUsize>,
}

impl Stub {
    pub fn hits(&self) -> usize {
        self.hits.load(Ordering::SeqCst)
    }
}

pub async fn spawn_stub(reply: Reply) -> Stub {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let port = listener.local_addr().unwrap().port();
    let hits = Arc::new(AtomicUsize::new(0));

    let counter = hits.clone();
    tokio::spawn(async move {
        loop {
            let Ok((stream, _)) = listener.accept().await else {
                return;
            };
            let reply = reply.clone();
            let counter = counter.clone();
            tokio::spawn(async move {
                serve(stream, reply, counter).await;
            });
        }
    });

    Stub {
        url: format!("http://127.0.0.1:{port}"),
        port,
        hits,
    }
}

pub fn json(body: &str) -> Reply {
    Reply::Body(200, body.to_string())
}

async fn serve(mut stream: TcpStream, reply: Reply, hits: Arc<AtomicUsize>) {
    let mut buf = Vec::new();
    let mut chunk = [0u8; 1024];
    while !buf.windows(4).any(|w| w == b"\r\n\r\n") {
        match stream.read(&mut chunk).await {
            Ok(0) | Err(_) => return,
            Ok(n) => buf.extend_from_slice(&chunk[..n]),
        }
    }
    let request = String::from_utf8_lossy(&buf);
    if !request.starts_with("GET /metrics/snapshot ") {
        let _ = write_response(&mut stream, 404, "").await;
        return;
    }
    hits.fetch_add(1, Ordering::SeqCst);

    match reply {
        Reply::Body(status, body) => {
            let _ = write_response(&mut stream, status, &body).await;
        }
        Reply::Delayed(delay, status, body) => {
            tokio::time::sleep(delay).await;
            let _ = write_response(&mut stream, status, &body).await;
        }
        Reply::Hang => {
            tokio::time::sleep(Duration::from_secs(3600)).await;
        }
    }
}

async fn write_response(stream: &mut TcpStream, status: u16, body: &str) -> std::io::Result<()> {
    let head = format!(
        "HTTP/1.1 {status} Stub\r\ncontent-type: application/json\r\ncontent-length: {}\r\nconnection: close\r\n\r\n",
        body.len()
    );
    stream.write_all(head.as_bytes()).await?;
    stream.write_all(body.as_bytes()).await?;
    stream.flush().await
}
