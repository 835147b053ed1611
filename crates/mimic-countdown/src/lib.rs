//! Cancellable broadcast countdown for Mimic room actors.
//!
//! A room owns exactly one [`Countdown`]. Starting it replaces whatever
//! was running before, so the single-timer invariant holds by
//! construction: there is no handle to leak and no stale task that can
//! fire after a replacement. When idle, [`Countdown::tick`] pends
//! forever, which is the correct behavior inside a `tokio::select!`
//! loop — the other branches keep running.
//!
//! # Integration
//!
//! The countdown is designed to sit inside a room actor's
//! `tokio::select!` loop:
//!
//! ```ignore
//! loop {
//!     tokio::select! {
//!         Some(cmd) = cmd_rx.recv() => { /* handle commands */ }
//!         event = countdown.tick() => match event {
//!             CountdownEvent::Tick { remaining } => broadcast_timer(remaining),
//!             CountdownEvent::Expired(tag) => run_continuation(tag),
//!         }
//!     }
//! }
//! ```
//!
//! A countdown started with `N` seconds yields `Tick { remaining: N }`
//! immediately, then `N-1` … `1` at one-second intervals, and finally
//! `Expired(tag)` one second after the last tick. The caller broadcasts
//! the zero itself alongside the continuation.

use std::fmt::Debug;
use std::time::Duration;

use tokio::time::{self, Instant};
use tracing::{debug, trace};

/// What [`Countdown::tick`] resolved to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CountdownEvent<C> {
    /// One second elapsed; `remaining` seconds are left (never zero).
    Tick { remaining: u32 },
    /// The countdown reached zero. Carries the continuation tag it was
    /// started with; the countdown is idle again when this is returned.
    Expired(C),
}

struct Active<C> {
    tag: C,
    remaining: u32,
    next: Instant,
}

/// A single cancellable countdown with a continuation tag.
///
/// `C` is a small copyable tag naming what should happen on expiry
/// (start the round, force-end a phase, …). The owner matches on it
/// when `Expired` comes back.
pub struct Countdown<C> {
    active: Option<Active<C>>,
    /// Bumped on every start, for log correlation.
    generation: u64,
}

impl<C: Copy + Debug> Countdown<C> {
    /// Creates an idle countdown.
    pub fn new() -> Self {
        Self {
            active: None,
            generation: 0,
        }
    }

    /// Starts a countdown of `secs` seconds, replacing any countdown
    /// already running. The previous continuation is discarded and will
    /// never fire.
    pub fn start(&mut self, secs: u32, tag: C) {
        self.generation += 1;
        let replaced = self.active.is_some();
        self.active = Some(Active {
            tag,
            remaining: secs,
            next: Instant::now(),
        });
        debug!(secs, ?tag, replaced, generation = self.generation, "countdown started");
    }

    /// Cancels the running countdown, if any. Safe to call when idle.
    ///
    /// Returns `true` if a countdown was actually cancelled.
    pub fn cancel(&mut self) -> bool {
        match self.active.take() {
            Some(active) => {
                debug!(
                    remaining = active.remaining,
                    tag = ?active.tag,
                    generation = self.generation,
                    "countdown cancelled"
                );
                true
            }
            None => false,
        }
    }

    /// Whether a countdown is currently running.
    pub fn is_running(&self) -> bool {
        self.active.is_some()
    }

    /// Seconds left on the running countdown, or `None` when idle.
    pub fn remaining(&self) -> Option<u32> {
        self.active.as_ref().map(|a| a.remaining)
    }

    /// Waits for the next countdown event. Pends forever while idle.
    ///
    /// Cancel-safe: state is only mutated after the underlying sleep
    /// completes, so a `select!` that drops this future mid-wait leaves
    /// the countdown exactly where it was.
    pub async fn tick(&mut self) -> CountdownEvent<C> {
        let (next, remaining, tag) = match &self.active {
            Some(a) => (a.next, a.remaining, a.tag),
            None => {
                // Idle: this future never completes. select! keeps
                // servicing its other branches.
                std::future::pending::<()>().await;
                unreachable!()
            }
        };

        time::sleep_until(next).await;

        if remaining == 0 {
            self.active = None;
            trace!(?tag, "countdown expired");
            return CountdownEvent::Expired(tag);
        }

        if let Some(a) = &mut self.active {
            a.remaining -= 1;
            a.next += Duration::from_secs(1);
        }
        trace!(remaining, "countdown tick");
        CountdownEvent::Tick { remaining }
    }
}

impl<C: Copy + Debug> Default for Countdown<C> {
    fn default() -> Self {
        Self::new()
    }
}
