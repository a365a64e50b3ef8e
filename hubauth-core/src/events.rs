use tokio::sync::mpsc;

use crate::session::CredentialSession;

/// Change to the set of stored sessions
///
/// Delivered to hooks after the session map has been updated, so a hook
/// that reads the store sees the new state.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SessionChangeEvent {
    /// Sessions were inserted (or replaced an entry with the same id)
    Added {
        /// The inserted sessions
        sessions: Vec<CredentialSession>,
    },

    /// Sessions were removed
    Removed {
        /// The removed sessions, as they were stored
        sessions: Vec<CredentialSession>,
    },
}

impl SessionChangeEvent {
    /// Sessions added by this event (empty for removals)
    pub fn added(&self) -> &[CredentialSession] {
        match self {
            Self::Added { sessions } => sessions,
            Self::Removed { .. } => &[],
        }
    }

    /// Sessions removed by this event (empty for additions)
    pub fn removed(&self) -> &[CredentialSession] {
        match self {
            Self::Added { .. } => &[],
            Self::Removed { sessions } => sessions,
        }
    }
}

/// Hook for observing session changes
///
/// Hooks run synchronously on the task that changed the store, while
/// mutations are serialized. A hook may call
/// [`crate::SessionStore::remove_session`]; the resulting event is delivered
/// after the current one has reached every hook. For async reactions such as
/// signing in again, use [`crate::SessionStore::subscribe_channel`].
///
/// # Example
/// ```
/// use hubauth_core::events::{SessionChangeEvent, SessionHook};
///
/// struct Logger;
///
/// impl SessionHook for Logger {
///     fn on_change(&self, event: &SessionChangeEvent) {
///         for session in event.added() {
///             println!("signed in: {}", session.account.label);
///         }
///         for session in event.removed() {
///             println!("signed out: {}", session.account.label);
///         }
///     }
/// }
/// ```
pub trait SessionHook: Send + Sync {
    /// Called after each change
    fn on_change(&self, event: &SessionChangeEvent);

    /// Whether this hook can no longer receive events
    ///
    /// Closed hooks are dropped by the store after the next delivery.
    fn is_closed(&self) -> bool {
        false
    }
}

/// Blanket implementation for closures
impl<F> SessionHook for F
where
    F: Fn(&SessionChangeEvent) + Send + Sync,
{
    fn on_change(&self, event: &SessionChangeEvent) {
        self(event)
    }
}

/// Unique identifier for a registered hook.
///
/// Used to remove hooks via [`crate::SessionStore::unsubscribe`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct HookId(pub(crate) u64);

/// Forwards events into an unbounded channel.
pub(crate) struct ChannelHook {
    tx: mpsc::UnboundedSender<SessionChangeEvent>,
}

impl ChannelHook {
    pub(crate) fn new(tx: mpsc::UnboundedSender<SessionChangeEvent>) -> Self {
        Self { tx }
    }
}

impl SessionHook for ChannelHook {
    fn on_change(&self, event: &SessionChangeEvent) {
        let _ = self.tx.send(event.clone());
    }

    fn is_closed(&self) -> bool {
        self.tx.is_closed()
    }
}
