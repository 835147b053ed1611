//! WebSocket listener built on `tokio-tungstenite`.
//!
//! The client encodes its room and name in the request path, so the
//! handshake callback captures the URI before the upgrade completes.

use std::net::SocketAddr;

use tokio::net::{TcpListener, TcpStream};
use tokio_tungstenite::tungstenite::handshake::server::{Request, Response};
use tokio_tungstenite::WebSocketStream;
use tracing::{debug, info};

use crate::error::ServerError;

pub type WsStream = WebSocketStream<TcpStream>;

/// An accepted, upgraded connection plus the path it arrived on.
pub struct Incoming {
    pub ws: WsStream,
    pub path: String,
    pub peer: SocketAddr,
}

/// Listens for WebSocket connections.
pub struct WsListener {
    listener: TcpListener,
}

impl WsListener {
    /// Binds to the given address.
    pub async fn bind(addr: &str) -> Result<Self, ServerError> {
        let listener = TcpListener::bind(addr).await?;
        info!(addr, "WebSocket listener bound");
        Ok(Self { listener })
    }

    /// Returns the local address the listener is bound to.
    pub fn local_addr(&self) -> std::io::Result<SocketAddr> {
        self.listener.local_addr()
    }

    /// Accepts one connection and completes the WebSocket upgrade.
    pub async fn accept(&self) -> Result<Incoming, ServerError> {
        let (stream, peer) = self.listener.accept().await?;

        let mut path = String::new();
        let ws = tokio_tungstenite::accept_hdr_async(stream, |req: &Request, resp: Response| {
            path = req.uri().path().to_string();
            Ok(resp)
        })
        .await?;

        debug!(%peer, path, "accepted WebSocket connection");
        Ok(Incoming { ws, path, peer })
    }
}
