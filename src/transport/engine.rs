//! Multi-connection engine and timer driver.
//!
//! The engine owns every active connection, routes the three entry points
//! to the right one, and sweeps each active connection on every timer tick.
//! A connection that reports [`Disposition::Destroyed`](super::Disposition)
//! is removed and dropped immediately; when the last one goes, the drained
//! hook fires so the embedding process can shut down.

use std::collections::HashMap;

use tracing::debug;

use crate::core::{Application, Channel};

use super::config::ConnectionConfig;
use super::connection::Connection;

/// Opaque identifier of a connection within an [`Engine`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ConnectionId(u64);

/// Connection table plus the timer driver.
///
/// Entry points mirror the per-connection handlers and must be invoked
/// serially by the external driver. Events addressed to an unknown (already
/// destroyed) connection are ignored.
pub struct Engine<C: Channel, A: Application> {
    connections: HashMap<ConnectionId, Connection<C, A>>,
    next_id: u64,
    on_drained: Option<Box<dyn FnMut()>>,
}

impl<C: Channel, A: Application> Default for Engine<C, A> {
    fn default() -> Self {
        Self::new()
    }
}

impl<C: Channel, A: Application> Engine<C, A> {
    /// Create an engine with no connections.
    pub fn new() -> Self {
        Self {
            connections: HashMap::new(),
            next_id: 0,
            on_drained: None,
        }
    }

    /// Register a hook invoked when the last connection is destroyed.
    pub fn on_drained(&mut self, hook: impl FnMut() + 'static) {
        self.on_drained = Some(Box::new(hook));
    }

    /// Establish a connection over an already-set-up channel.
    pub fn establish(&mut self, channel: C, app: A, config: ConnectionConfig) -> ConnectionId {
        let id = ConnectionId(self.next_id);
        self.next_id += 1;
        self.connections
            .insert(id, Connection::new(channel, app, config));
        debug!(?id, "connection established");
        id
    }

    /// Number of active connections.
    pub fn active(&self) -> usize {
        self.connections.len()
    }

    /// Inspect an active connection.
    pub fn connection(&self, id: ConnectionId) -> Option<&Connection<C, A>> {
        self.connections.get(&id)
    }

    /// The application has outbound bytes ready on `id`.
    pub fn on_app_ready(&mut self, id: ConnectionId) {
        let Some(conn) = self.connections.get_mut(&id) else {
            return;
        };
        if conn.on_app_ready().is_destroyed() {
            self.remove(id);
        }
    }

    /// A raw datagram arrived for `id`.
    pub fn on_segment(&mut self, id: ConnectionId, raw: &[u8]) {
        let Some(conn) = self.connections.get_mut(&id) else {
            return;
        };
        if conn.on_segment(raw).is_destroyed() {
            self.remove(id);
        }
    }

    /// Periodic timer tick: sweep every active connection.
    pub fn tick(&mut self) {
        let expired: Vec<ConnectionId> = self
            .connections
            .iter_mut()
            .filter_map(|(&id, conn)| conn.on_tick().is_destroyed().then_some(id))
            .collect();
        for id in expired {
            self.remove(id);
        }
    }

    /// Tear a connection down immediately, bypassing the close sequence.
    pub fn teardown(&mut self, id: ConnectionId) {
        if let Some(mut conn) = self.connections.remove(&id) {
            let _ = conn.teardown();
            debug!(?id, "connection destroyed");
            self.notify_if_drained();
        }
    }

    fn remove(&mut self, id: ConnectionId) {
        self.connections.remove(&id);
        debug!(?id, "connection destroyed");
        self.notify_if_drained();
    }

    fn notify_if_drained(&mut self) {
        if self.connections.is_empty() {
            if let Some(hook) = self.on_drained.as_mut() {
                hook();
            }
        }
    }
}
