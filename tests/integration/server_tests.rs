//! WebSocket endpoint over a real socket.
//!
//! Performs the upgrade handshake by hand and decodes the (unmasked)
//! server frames, so no websocket client crate is needed.

use std::sync::Arc;
use std::time::Duration;

use changeomatic::app::events::DisplayEvent;
use changeomatic::fsm::Screen;
use changeomatic::hub::BroadcastHub;
use changeomatic::server;
use serde_json::Value;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::{TcpListener, TcpStream};
use tokio::time::{sleep, timeout};

struct RawClient {
    stream: TcpStream,
    buf: Vec<u8>,
}

impl RawClient {
    async fn connect(addr: std::net::SocketAddr) -> Self {
        let mut stream = TcpStream::connect(addr).await.unwrap();
        let request = format!(
            "GET / HTTP/1.1\r\n\
             Host: {addr}\r\n\
             Upgrade: websocket\r\n\
             Connection: Upgrade\r\n\
             Sec-WebSocket-Key: dGhlIHNhbXBsZSBub25jZQ==\r\n\
             Sec-WebSocket-Version: 13\r\n\r\n"
        );
        stream.write_all(request.as_bytes()).await.unwrap();

        let mut client = Self { stream, buf: Vec::new() };
        let head_end = loop {
            if let Some(pos) = client.buf.windows(4).position(|w| w == b"\r\n\r\n") {
                break pos + 4;
            }
            client.fill().await;
        };
        let head = String::from_utf8_lossy(&client.buf[..head_end]).to_string();
        assert!(head.starts_with("HTTP/1.1 101"), "{head}");
        client.buf.drain(..head_end);
        client
    }

    async fn fill(&mut self) {
        let mut chunk = [0u8; 1024];
        let n = self.stream.read(&mut chunk).await.unwrap();
        assert!(n > 0, "server closed the connection");
        self.buf.extend_from_slice(&chunk[..n]);
    }

    /// Next text frame as JSON.  Payloads here are always under 126 bytes
    /// or use the 16-bit length form.
    async fn next_json(&mut self) -> Value {
        let read = async {
            loop {
                if self.buf.len() >= 2 {
                    assert_eq!(self.buf[0], 0x81, "expected a final text frame");
                    let (len, header) = match self.buf[1] & 0x7F {
                        126 if self.buf.len() >= 4 => {
                            (u16::from_be_bytes([self.buf[2], self.buf[3]]) as usize, 4)
                        }
                        126 => (usize::MAX, 0),
                        n => (n as usize, 2),
                    };
                    if len != usize::MAX && self.buf.len() >= header + len {
                        let payload: Vec<u8> = self.buf.drain(..header + len).skip(header).collect();
                        return serde_json::from_slice(&payload).unwrap();
                    }
                }
                self.fill().await;
            }
        };
        timeout(Duration::from_secs(5), read).await.expect("no frame within 5s")
    }
}

async fn start_server() -> (std::net::SocketAddr, Arc<BroadcastHub>) {
    let hub = Arc::new(BroadcastHub::new());
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(server::serve_on(listener, Arc::clone(&hub)));
    (addr, hub)
}

async fn wait_for_clients(hub: &BroadcastHub, n: usize) {
    for _ in 0..200 {
        if hub.client_count() == n {
            return;
        }
        sleep(Duration::from_millis(10)).await;
    }
    panic!("expected {n} clients, have {}", hub.client_count());
}

#[tokio::test]
async fn client_receives_current_screen_then_broadcasts() {
    let (addr, hub) = start_server().await;
    hub.broadcast(&DisplayEvent::screen(Screen::InsertCoin));

    let mut client = RawClient::connect(addr).await;
    let first = client.next_json().await;
    assert_eq!(first["event"], "screen-change");
    assert_eq!(first["data"]["screen"], "insert-coin");

    wait_for_clients(&hub, 1).await;
    hub.broadcast(&DisplayEvent::CoinUpdate { amount: 2.0, total_collected: 3.0 });
    let update = client.next_json().await;
    assert_eq!(update["event"], "coin-update");
    assert_eq!(update["data"]["total_collected"], 3.0);
}

#[tokio::test]
async fn disconnect_unregisters_client() {
    let (addr, hub) = start_server().await;

    let mut a = RawClient::connect(addr).await;
    let mut b = RawClient::connect(addr).await;
    a.next_json().await;
    b.next_json().await;
    wait_for_clients(&hub, 2).await;

    drop(a);
    wait_for_clients(&hub, 1).await;

    hub.broadcast(&DisplayEvent::SubmitOutcome { result: false });
    assert_eq!(b.next_json().await["data"]["result"], false);
}
