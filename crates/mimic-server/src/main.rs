//! Mimic game server.
//!
//! Accepts WebSocket connections at `/ws/{room_code}/{player_name}`,
//! spawning a room actor per code and a handler task per player.

mod error;
mod handler;
mod transport;
mod words;

use std::path::Path;

use mimic_room::{GameConfig, Timers};
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

use crate::error::ServerError;
use crate::handler::{handle_connection, ServerState};
use crate::transport::WsListener;

const DEFAULT_ADDR: &str = "127.0.0.1:8000";
const WORDS_FILE: &str = "words.txt";

#[tokio::main]
async fn main() -> Result<(), ServerError> {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt().with_env_filter(filter).init();

    let addr = std::env::args()
        .nth(1)
        .unwrap_or_else(|| DEFAULT_ADDR.to_string());

    let word_list = words::load(Path::new(WORDS_FILE));
    let config = GameConfig::new(Timers::default(), word_list);
    let state = ServerState::new(config);

    let listener = WsListener::bind(&addr).await?;
    info!(%addr, "mimic server running");

    loop {
        match listener.accept().await {
            Ok(incoming) => {
                let state = state.clone();
                tokio::spawn(async move {
                    if let Err(e) = handle_connection(incoming, state).await {
                        tracing::debug!(error = %e, "connection ended with error");
                    }
                });
            }
            Err(e) => {
                error!(error = %e, "accept failed");
            }
        }
    }
}
