//! # Lane Siege Mirror Server
//!
//! Runs an authoritative match without rendering and mirrors a reduced
//! view of it to remote observers.
//!
//! Observers connect over TCP and receive one JSON [`MirrorSnapshot`] per
//! line. They cannot send input; nothing they do reaches the simulation.

#![forbid(unsafe_code)]
#![warn(missing_docs)]
#![warn(clippy::all, clippy::pedantic)]

use std::net::SocketAddr;
use std::path::Path;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use thiserror::Error;
use tokio::io::{AsyncWrite, AsyncWriteExt};
use tokio::net::{TcpListener, TcpStream};
use tokio::sync::watch;
use tokio::time::MissedTickBehavior;

use siege_core::results::MatchResult;
use siege_core::simulation::{Match, MatchPhase};
use siege_core::snapshot::MirrorSnapshot;

/// Errors raised by the mirror.
#[derive(Error, Debug)]
pub enum ServerError {
    /// Socket failure.
    #[error("Network error: {0}")]
    Io(#[from] std::io::Error),
    /// Snapshot could not be encoded.
    #[error("Failed to encode snapshot: {0}")]
    Encode(#[from] serde_json::Error),
    /// Configuration file could not be parsed.
    #[error("Failed to parse server config: {0}")]
    Config(#[from] ron::error::SpannedError),
}

/// Server configuration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    /// Address observers connect to.
    pub bind: SocketAddr,
    /// Simulation ticks per wall-clock second.
    pub tick_rate: u32,
    /// Match time advanced per tick; `0` means real time (`1000 / tick_rate`).
    pub frame_ms: u32,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind: SocketAddr::from(([127, 0, 0, 1], 7777)),
            tick_rate: 30,
            frame_ms: 0,
        }
    }
}

impl ServerConfig {
    /// Load a configuration from a RON file.
    pub fn load(path: impl AsRef<Path>) -> Result<Self, ServerError> {
        let source = std::fs::read_to_string(path)?;
        Ok(ron::from_str(&source)?)
    }

    /// Wall-clock time between ticks.
    #[must_use]
    pub fn tick_interval(&self) -> Duration {
        Duration::from_micros(1_000_000 / u64::from(self.tick_rate.max(1)))
    }

    /// Match time advanced per tick.
    #[must_use]
    pub fn frame_ms(&self) -> u32 {
        if self.frame_ms > 0 {
            self.frame_ms
        } else {
            (1000 / self.tick_rate.max(1)).max(1)
        }
    }
}

/// Encode a snapshot as one JSON line.
pub fn encode_snapshot(snapshot: &MirrorSnapshot) -> Result<String, serde_json::Error> {
    let mut line = serde_json::to_string(snapshot)?;
    line.push('\n');
    Ok(line)
}

/// Tick `game` on a fixed interval, publishing a snapshot after every
/// tick, until the match ends.
pub async fn simulate(
    mut game: Match,
    config: &ServerConfig,
    snapshots: &watch::Sender<MirrorSnapshot>,
) -> Option<MatchResult> {
    let frame_ms = config.frame_ms();
    let mut interval = tokio::time::interval(config.tick_interval());
    interval.set_missed_tick_behavior(MissedTickBehavior::Delay);

    while game.phase() == MatchPhase::Running {
        interval.tick().await;
        game.step(frame_ms);
        snapshots.send_replace(game.mirror_snapshot());
    }

    let result = game.result().copied();
    if let Some(result) = &result {
        tracing::info!(
            victory = result.victory,
            elapsed_secs = result.elapsed_secs,
            observers = snapshots.receiver_count().saturating_sub(1),
            "Mirrored match finished"
        );
    }
    result
}

/// Stream every published snapshot to `writer` until the match ends or
/// the publisher goes away.
pub async fn stream_snapshots<W>(
    mut writer: W,
    mut snapshots: watch::Receiver<MirrorSnapshot>,
) -> Result<(), ServerError>
where
    W: AsyncWrite + Unpin,
{
    loop {
        let (line, ended) = {
            let snapshot = snapshots.borrow_and_update();
            (encode_snapshot(&snapshot)?, snapshot.ended)
        };
        writer.write_all(line.as_bytes()).await?;
        writer.flush().await?;

        if ended || snapshots.changed().await.is_err() {
            return Ok(());
        }
    }
}

/// Accept observers forever, streaming snapshots to each one.
pub async fn serve_observers(
    listener: TcpListener,
    snapshots: watch::Receiver<MirrorSnapshot>,
) -> Result<(), ServerError> {
    loop {
        let (socket, peer) = listener.accept().await?;
        tracing::info!(%peer, "Observer connected");
        let receiver = snapshots.clone();
        tokio::spawn(observe(socket, peer, receiver));
    }
}

async fn observe(socket: TcpStream, peer: SocketAddr, snapshots: watch::Receiver<MirrorSnapshot>) {
    // Observers only read; a write failure means they went away.
    match stream_snapshots(socket, snapshots).await {
        Ok(()) => tracing::debug!(%peer, "Observer stream finished"),
        Err(e) => tracing::debug!(%peer, error = %e, "Observer dropped"),
    }
}

/// A bound mirror, ready to run a match.
pub struct MirrorServer {
    config: ServerConfig,
    listener: TcpListener,
}

impl MirrorServer {
    /// Bind the observer socket.
    pub async fn bind(config: ServerConfig) -> Result<Self, ServerError> {
        let listener = TcpListener::bind(config.bind).await?;
        Ok(Self { config, listener })
    }

    /// Address actually bound (useful with port 0).
    pub fn local_addr(&self) -> Result<SocketAddr, ServerError> {
        Ok(self.listener.local_addr()?)
    }

    /// Mirror `game` until it ends.
    pub async fn run(self, game: Match) -> Option<MatchResult> {
        let (sender, receiver) = watch::channel(game.mirror_snapshot());
        tracing::info!(
            addr = ?self.listener.local_addr().ok(),
            tick_rate = self.config.tick_rate,
            frame_ms = self.config.frame_ms(),
            "Mirror server running"
        );

        let acceptor = tokio::spawn(serve_observers(self.listener, receiver));
        let result = simulate(game, &self.config, &sender).await;

        // Observer tasks outlive the acceptor and stop on the final snapshot.
        drop(sender);
        acceptor.abort();
        result
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use siege_core::prelude::*;

    fn snapshot(tick: u64, ended: bool) -> MirrorSnapshot {
        MirrorSnapshot {
            tick,
            elapsed_ms: tick * 100,
            units: Vec::new(),
            left_base_hp: 500,
            right_base_hp: 500,
            ended,
        }
    }

    #[test]
    fn test_frame_defaults_to_real_time() {
        let config = ServerConfig::default();
        assert_eq!(config.frame_ms(), 33);
        assert_eq!(config.tick_interval(), Duration::from_micros(33_333));

        let fast = ServerConfig {
            tick_rate: 1000,
            frame_ms: 100,
            ..ServerConfig::default()
        };
        assert_eq!(fast.frame_ms(), 100);
        assert_eq!(fast.tick_interval(), Duration::from_millis(1));
    }

    #[test]
    fn test_config_from_ron() {
        let config: ServerConfig = ron::from_str("(tick_rate: 60)").unwrap();
        assert_eq!(config.tick_rate, 60);
        assert_eq!(config.bind, ServerConfig::default().bind);
    }

    #[test]
    fn test_snapshot_is_one_line() {
        let line = encode_snapshot(&snapshot(3, false)).unwrap();
        assert!(line.ends_with('\n'));
        assert_eq!(line.matches('\n').count(), 1);
        let decoded: MirrorSnapshot = serde_json::from_str(line.trim_end()).unwrap();
        assert_eq!(decoded, snapshot(3, false));
    }

    #[tokio::test]
    async fn test_stream_stops_after_final_snapshot() {
        let (_sender, receiver) = watch::channel(snapshot(9, true));
        let mut out = Vec::new();
        stream_snapshots(&mut out, receiver).await.unwrap();

        let text = String::from_utf8(out).unwrap();
        assert_eq!(text.lines().count(), 1);
    }

    #[tokio::test]
    async fn test_stream_stops_when_publisher_leaves() {
        let (sender, receiver) = watch::channel(snapshot(1, false));
        drop(sender);
        let mut out = Vec::new();
        stream_snapshots(&mut out, receiver).await.unwrap();
        assert_eq!(String::from_utf8(out).unwrap().lines().count(), 1);
    }

    #[tokio::test]
    async fn test_simulate_publishes_until_the_end() {
        let config = MatchConfig {
            time_limit_secs: 1,
            ..MatchConfig::with_seed(4)
        };
        let game = Match::new(config, UnitRoster::standard(), PlayerStats::default());
        let (sender, receiver) = watch::channel(game.mirror_snapshot());
        let server_config = ServerConfig {
            tick_rate: 1000,
            frame_ms: 100,
            ..ServerConfig::default()
        };

        let result = simulate(game, &server_config, &sender).await.unwrap();
        assert!(!result.victory);
        let last = receiver.borrow().clone();
        assert!(last.ended);
        assert_eq!(last.tick, 10);
    }
}
