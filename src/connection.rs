//! Connection state machine.
//!
//! The two mutable flags of the naive design (handle present, connected)
//! collapse into one tagged state, so "connected without a handle" is
//! unrepresentable. A generation counter increments on every successful
//! dial; a retry attempt that captured an older generation can tell that a
//! concurrent caller already repaired the connection and skip its own
//! reconnect.

use crate::transport::Session;
use std::sync::Arc;

/// Where the connection lifecycle currently stands.
///
/// `Configured → Connected ⇄ Disconnected` with `Upgrading` as the
/// transitional state while a broken session is being replaced. `Closed`
/// is terminal and sticky.
pub(crate) enum ConnectionState {
    /// Configuration validated, no physical connection yet.
    Configured,
    /// A live session exists.
    Connected(Arc<dyn Session>),
    /// The old session has been torn out and its replacement is being
    /// dialed. Readers arriving here wait on the exclusive lock.
    Upgrading,
    /// Torn down on request; a later operation reconnects transparently.
    Disconnected,
    /// Terminal. Operations fail with a not-connected classification.
    Closed,
}

impl std::fmt::Debug for ConnectionState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(match self {
            Self::Configured => "Configured",
            Self::Connected(_) => "Connected",
            Self::Upgrading => "Upgrading",
            Self::Disconnected => "Disconnected",
            Self::Closed => "Closed",
        })
    }
}

/// All mutable client state, guarded by one reader/writer lock.
#[derive(Debug)]
pub(crate) struct SharedState {
    pub(crate) conn: ConnectionState,
    /// Bumped on every successful dial.
    pub(crate) generation: u64,
    /// Cache of the last successful Capabilities exchange.
    pub(crate) capabilities: Vec<String>,
}

impl SharedState {
    pub(crate) fn new() -> Self {
        Self {
            conn: ConnectionState::Configured,
            generation: 0,
            capabilities: Vec::new(),
        }
    }

    /// The live session and the generation it belongs to.
    pub(crate) fn session(&self) -> Option<(Arc<dyn Session>, u64)> {
        match &self.conn {
            ConnectionState::Connected(session) => Some((Arc::clone(session), self.generation)),
            _ => None,
        }
    }

    pub(crate) fn is_connected(&self) -> bool {
        matches!(self.conn, ConnectionState::Connected(_))
    }

    pub(crate) fn is_closed(&self) -> bool {
        matches!(self.conn, ConnectionState::Closed)
    }

    /// Install a freshly dialed session and bump the generation.
    pub(crate) fn install(&mut self, session: Arc<dyn Session>) {
        self.conn = ConnectionState::Connected(session);
        self.generation += 1;
    }

    /// Take the session out, leaving the given state behind. Returns the
    /// session exactly once, so it can never be closed twice.
    pub(crate) fn take_session(&mut self, leave: ConnectionState) -> Option<Arc<dyn Session>> {
        let previous = std::mem::replace(&mut self.conn, leave);
        match previous {
            ConnectionState::Connected(session) => Some(session),
            ConnectionState::Closed => {
                // Closed is sticky regardless of the requested state.
                self.conn = ConnectionState::Closed;
                None
            }
            _ => None,
        }
    }
}
