//! STRAND Loopback Demo
//!
//! Two protocol engines stream a payload to each other over localhost UDP.
//! The sender streams a generated payload and half-closes; the receiver
//! collects the bytes and closes in turn. The demo exits once both engines
//! have drained through the full teardown sequence, then verifies that the
//! received bytes are exactly the sent bytes.
//!
//! Environment variables:
//! - STRAND_LOG: tracing filter (default "info")
//! - STRAND_PAYLOAD_BYTES: bytes to stream (default 65536)

use std::cell::{Cell, RefCell};
use std::rc::Rc;
use std::time::Duration;

use tokio::net::UdpSocket;
use tokio::time::interval;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

use strand_protocol::core::constants::{MAX_SEGMENT_DATA_SIZE, MAX_SEGMENT_SIZE};
use strand_protocol::prelude::*;

/// Byte-stream endpoints shared between an engine and the demo loop.
#[derive(Clone, Default)]
struct SharedStream(Rc<RefCell<StreamInner>>);

#[derive(Default)]
struct StreamInner {
    outbound: Vec<u8>,
    cursor: usize,
    close_after_send: bool,
    received: Vec<u8>,
    eof: bool,
}

impl SharedStream {
    fn sender(payload: Vec<u8>) -> Self {
        Self(Rc::new(RefCell::new(StreamInner {
            outbound: payload,
            close_after_send: true,
            ..StreamInner::default()
        })))
    }

    fn receiver() -> Self {
        Self::default()
    }

    fn received(&self) -> Vec<u8> {
        self.0.borrow().received.clone()
    }

    fn eof(&self) -> bool {
        self.0.borrow().eof
    }
}

impl Application for SharedStream {
    fn pull(&mut self, buf: &mut [u8]) -> Pull {
        let mut inner = self.0.borrow_mut();
        let remaining = inner.outbound.len() - inner.cursor;
        if remaining == 0 {
            return if inner.close_after_send {
                Pull::End
            } else {
                Pull::Data(0)
            };
        }
        let n = remaining.min(buf.len());
        let start = inner.cursor;
        buf[..n].copy_from_slice(&inner.outbound[start..start + n]);
        inner.cursor += n;
        Pull::Data(n)
    }

    fn deliver(&mut self, bytes: &[u8]) -> Result<(), DeliverError> {
        self.0.borrow_mut().received.extend_from_slice(bytes);
        Ok(())
    }

    fn capacity(&self) -> usize {
        usize::MAX
    }

    fn deliver_eof(&mut self) {
        self.0.borrow_mut().eof = true;
    }
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> std::io::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_env("STRAND_LOG").unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let payload_bytes: usize = std::env::var("STRAND_PAYLOAD_BYTES")
        .ok()
        .and_then(|v| v.parse().ok())
        .unwrap_or(65536);
    let payload: Vec<u8> = (0..payload_bytes).map(|i| (i % 251) as u8).collect();

    // Two connected sockets on localhost.
    let sock_a = UdpSocket::bind("127.0.0.1:0").await?;
    let sock_b = UdpSocket::bind("127.0.0.1:0").await?;
    sock_a.connect(sock_b.local_addr()?).await?;
    sock_b.connect(sock_a.local_addr()?).await?;
    let chan_a = UdpChannel::from_socket(sock_a);
    let chan_b = UdpChannel::from_socket(sock_b);

    let config = ConnectionConfig {
        tick_interval: Duration::from_millis(20),
        retransmission_timeout: Duration::from_millis(100),
        send_window: 4 * MAX_SEGMENT_DATA_SIZE,
        recv_window: 4 * MAX_SEGMENT_DATA_SIZE,
    };

    let app_a = SharedStream::sender(payload.clone());
    let app_b = SharedStream::receiver();

    let mut engine_a = Engine::new();
    let a = engine_a.establish(chan_a.clone(), app_a.clone(), config.clone());
    let mut engine_b = Engine::new();
    let b = engine_b.establish(chan_b.clone(), app_b.clone(), config.clone());

    let drained_a = Rc::new(Cell::new(false));
    let drained_b = Rc::new(Cell::new(false));
    engine_a.on_drained({
        let flag = drained_a.clone();
        move || flag.set(true)
    });
    engine_b.on_drained({
        let flag = drained_b.clone();
        move || flag.set(true)
    });

    info!(bytes = payload.len(), "streaming through the loopback pair");

    // One serial event loop drives both engines: every handler runs to
    // completion before the next event is dispatched.
    let mut ticker = interval(config.tick_interval);
    let mut buf_a = [0u8; MAX_SEGMENT_SIZE];
    let mut buf_b = [0u8; MAX_SEGMENT_SIZE];

    while !(drained_a.get() && drained_b.get()) {
        tokio::select! {
            _ = ticker.tick() => {
                engine_a.on_app_ready(a);
                engine_b.on_app_ready(b);
                engine_a.tick();
                engine_b.tick();
            }
            Ok(n) = chan_a.recv(&mut buf_a) => {
                engine_a.on_segment(a, &buf_a[..n]);
                // An acknowledgment may have freed send-window credit.
                engine_a.on_app_ready(a);
            }
            Ok(n) = chan_b.recv(&mut buf_b) => {
                engine_b.on_segment(b, &buf_b[..n]);
                engine_b.on_app_ready(b);
            }
        }
    }

    let received = app_b.received();
    if received == payload && app_b.eof() {
        info!(bytes = received.len(), "transfer complete and byte-exact");
        Ok(())
    } else {
        warn!(
            sent = payload.len(),
            received = received.len(),
            eof = app_b.eof(),
            "transfer mismatch"
        );
        Err(std::io::Error::other("loopback transfer mismatch"))
    }
}
