//! In-memory session store.

use std::cell::RefCell;
use std::collections::{HashMap, VecDeque};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use log::{debug, info, warn};
use parking_lot::{ReentrantMutex, RwLock};
use tokio::sync::mpsc;

use crate::account::AccountChooser;
use crate::acquirer::TokenAcquirer;
use crate::error::{AuthError, Result};
use crate::events::{ChannelHook, HookId, SessionChangeEvent, SessionHook};
use crate::scope::PermissionScope;
use crate::session::CredentialSession;
use crate::token::HubToken;

/// Holds the credential sessions of one process.
///
/// Sessions are only added through [`SessionStore::create_session`], which
/// logs in and checks that the issued token grants the requested scopes.
/// Reads never block on a login in progress: the collaborators are awaited
/// without any lock held, and only the final insert is serialized.
///
/// # Example
///
/// ```
/// use hubauth_core::{SessionStore, StaticAccountChooser, TokenAcquirer, AcquireError};
/// use async_trait::async_trait;
///
/// struct Fixed;
///
/// #[async_trait]
/// impl TokenAcquirer for Fixed {
///     async fn acquire(&self, username: &str, _secret: &str) -> Result<String, AcquireError> {
///         Ok(format!(
///             r#"{{"session_id":"s1","username":"{}","user_id":"u1","scope":"repo:write"}}"#,
///             username
///         ))
///     }
/// }
///
/// # tokio_test::block_on(async {
/// let store = SessionStore::new(StaticAccountChooser::new("alice", "pw"), Fixed);
/// let session = store.create_session(&["repo:read"]).await.unwrap();
/// assert_eq!(session.account.label, "alice");
/// assert_eq!(store.get_sessions(&["repo:write"]).unwrap().len(), 1);
/// # });
/// ```
pub struct SessionStore {
    chooser: Arc<dyn AccountChooser>,
    acquirer: Arc<dyn TokenAcquirer>,
    sessions: RwLock<HashMap<String, CredentialSession>>,
    hooks: RwLock<HashMap<HookId, Arc<dyn SessionHook>>>,
    next_hook_id: AtomicU64,
    /// Serializes insert/remove together with their event delivery.
    /// Reentrant so a hook may remove sessions from the delivering thread.
    mutation: ReentrantMutex<RefCell<Dispatch>>,
}

/// Event delivery state, only touched with `mutation` held.
#[derive(Default)]
struct Dispatch {
    delivering: bool,
    pending: VecDeque<SessionChangeEvent>,
}

/// Clears the delivery flag even if a hook panics.
struct DeliveryGuard<'a>(&'a RefCell<Dispatch>);

impl Drop for DeliveryGuard<'_> {
    fn drop(&mut self) {
        let mut dispatch = self.0.borrow_mut();
        dispatch.delivering = false;
        dispatch.pending.clear();
    }
}

impl SessionStore {
    /// Create an empty store with the given collaborators.
    pub fn new(
        chooser: impl AccountChooser + 'static,
        acquirer: impl TokenAcquirer + 'static,
    ) -> Self {
        Self::from_arcs(Arc::new(chooser), Arc::new(acquirer))
    }

    /// Create an empty store from shared collaborators.
    pub fn from_arcs(chooser: Arc<dyn AccountChooser>, acquirer: Arc<dyn TokenAcquirer>) -> Self {
        Self {
            chooser,
            acquirer,
            sessions: RwLock::new(HashMap::new()),
            hooks: RwLock::new(HashMap::new()),
            next_hook_id: AtomicU64::new(0),
            mutation: ReentrantMutex::new(RefCell::new(Dispatch::default())),
        }
    }

    /// Return the sessions that satisfy `desired`.
    ///
    /// An empty `desired` returns every session. Any value outside the
    /// permission set fails the whole call with [`AuthError::InvalidScope`].
    pub fn get_sessions<S: AsRef<str>>(&self, desired: &[S]) -> Result<Vec<CredentialSession>> {
        let desired = PermissionScope::parse_all(desired)?;
        Ok(self.matching(&desired))
    }

    /// Return the sessions that satisfy already-parsed scopes.
    pub fn matching(&self, desired: &[PermissionScope]) -> Vec<CredentialSession> {
        self.sessions
            .read()
            .values()
            .filter(|session| session.satisfies(desired))
            .cloned()
            .collect()
    }

    /// All sessions currently held.
    pub fn sessions(&self) -> Vec<CredentialSession> {
        self.sessions.read().values().cloned().collect()
    }

    /// Look up a session by id.
    pub fn get(&self, id: &str) -> Option<CredentialSession> {
        self.sessions.read().get(id).cloned()
    }

    /// Number of sessions held.
    pub fn len(&self) -> usize {
        self.sessions.read().len()
    }

    /// Returns true if no sessions are held.
    pub fn is_empty(&self) -> bool {
        self.sessions.read().is_empty()
    }

    /// Log in and store a session granting at least `desired`.
    ///
    /// The desired scopes are validated before the account chooser is
    /// consulted. On any failure the store is left unchanged and no event is
    /// emitted; the same holds if the returned future is dropped before it
    /// completes. A session whose id is already stored replaces the old one.
    pub async fn create_session<S>(&self, desired: &[S]) -> Result<CredentialSession>
    where
        S: AsRef<str> + Sync,
    {
        let desired = PermissionScope::parse_all(desired)?;

        let identity = self.chooser.choose().await?;
        debug!("selected account '{}'", identity.username);

        let secret = self.chooser.secret(&identity).await?;
        let raw = self.acquirer.acquire(&identity.username, &secret).await?;

        let token = HubToken::parse(&raw)?;
        if !PermissionScope::satisfies(&desired, &[token.scope]) {
            warn!(
                "token for '{}' grants '{}', which does not cover the requested scopes",
                token.username, token.scope
            );
            return Err(AuthError::ScopeNotGranted {
                desired,
                granted: token.scope,
            });
        }

        let session = CredentialSession::from_token(token, raw);

        {
            let dispatch = self.mutation.lock();
            let replaced = self
                .sessions
                .write()
                .insert(session.id.clone(), session.clone());
            if replaced.is_some() {
                debug!("replaced existing session {}", session.id);
            }
            self.emit(
                &dispatch,
                SessionChangeEvent::Added {
                    sessions: vec![session.clone()],
                },
            );
        }

        info!(
            "created session {} for '{}' with scope '{}'",
            session.id,
            session.account.label,
            crate::scope::format_scopes(&session.scopes)
        );
        Ok(session)
    }

    /// Remove a session. Unknown ids are ignored.
    ///
    /// Returns true if a session was removed.
    pub fn remove_session(&self, id: &str) -> bool {
        let dispatch = self.mutation.lock();
        let removed = self.sessions.write().remove(id);

        match removed {
            Some(session) => {
                info!("removed session {}", id);
                self.emit(
                    &dispatch,
                    SessionChangeEvent::Removed {
                        sessions: vec![session],
                    },
                );
                true
            }
            None => false,
        }
    }

    /// Register a hook for session changes.
    ///
    /// # Example
    ///
    /// ```
    /// # use hubauth_core::{SessionStore, SessionChangeEvent, StaticAccountChooser, TokenAcquirer, AcquireError};
    /// # struct Never;
    /// # #[async_trait::async_trait]
    /// # impl TokenAcquirer for Never {
    /// #     async fn acquire(&self, _: &str, _: &str) -> Result<String, AcquireError> {
    /// #         Err(AcquireError::Other("unused".into()))
    /// #     }
    /// # }
    /// let store = SessionStore::new(StaticAccountChooser::new("alice", "pw"), Never);
    /// let id = store.subscribe(|event: &SessionChangeEvent| {
    ///     println!("{} added, {} removed", event.added().len(), event.removed().len());
    /// });
    /// assert!(store.unsubscribe(id));
    /// ```
    pub fn subscribe(&self, hook: impl SessionHook + 'static) -> HookId {
        let id = HookId(self.next_hook_id.fetch_add(1, Ordering::SeqCst));
        self.hooks.write().insert(id, Arc::new(hook));
        id
    }

    /// Remove a hook. Returns true if it was registered.
    pub fn unsubscribe(&self, id: HookId) -> bool {
        self.hooks.write().remove(&id).is_some()
    }

    /// Subscribe through a channel.
    ///
    /// The channel is unbounded so no event is dropped. Dropping the
    /// receiver ends the subscription.
    pub fn subscribe_channel(&self) -> (HookId, mpsc::UnboundedReceiver<SessionChangeEvent>) {
        let (tx, rx) = mpsc::unbounded_channel();
        let id = self.subscribe(ChannelHook::new(tx));
        (id, rx)
    }

    /// Number of registered hooks.
    pub fn subscriber_count(&self) -> usize {
        self.hooks.read().len()
    }

    /// Deliver `event`, or queue it if a hook on this thread is already
    /// being called. Queued events go out in order once the current
    /// delivery finishes, so every hook sees events in mutation order.
    fn emit(&self, dispatch: &RefCell<Dispatch>, event: SessionChangeEvent) {
        {
            let mut state = dispatch.borrow_mut();
            state.pending.push_back(event);
            if state.delivering {
                return;
            }
            state.delivering = true;
        }

        let _delivery = DeliveryGuard(dispatch);
        loop {
            let next = dispatch.borrow_mut().pending.pop_front();
            match next {
                Some(event) => self.deliver(&event),
                None => break,
            }
        }
    }

    fn deliver(&self, event: &SessionChangeEvent) {
        let hooks: Vec<(HookId, Arc<dyn SessionHook>)> = self
            .hooks
            .read()
            .iter()
            .map(|(id, hook)| (*id, Arc::clone(hook)))
            .collect();

        let mut closed = Vec::new();
        for (id, hook) in hooks {
            hook.on_change(event);
            if hook.is_closed() {
                closed.push(id);
            }
        }

        if !closed.is_empty() {
            let mut hooks = self.hooks.write();
            for id in closed {
                debug!("dropping closed subscriber {:?}", id);
                hooks.remove(&id);
            }
        }
    }
}

impl std::fmt::Debug for SessionStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SessionStore")
            .field("sessions", &self.len())
            .field("subscribers", &self.subscriber_count())
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::account::AccountError;
    use crate::acquirer::AcquireError;
    use crate::test_utils::{token_json, MockAccountChooser, MockTokenAcquirer};
    use std::sync::atomic::AtomicUsize;

    fn store_with(acquirer: MockTokenAcquirer) -> (SessionStore, MockAccountChooser, MockTokenAcquirer) {
        let chooser = MockAccountChooser::new("alice", "hunter2");
        let store = SessionStore::new(chooser.clone(), acquirer.clone());
        (store, chooser, acquirer)
    }

    fn counting_hook(store: &SessionStore) -> (Arc<AtomicUsize>, Arc<AtomicUsize>) {
        let added = Arc::new(AtomicUsize::new(0));
        let removed = Arc::new(AtomicUsize::new(0));
        let (a, r) = (Arc::clone(&added), Arc::clone(&removed));
        store.subscribe(move |event: &SessionChangeEvent| {
            a.fetch_add(event.added().len(), Ordering::SeqCst);
            r.fetch_add(event.removed().len(), Ordering::SeqCst);
        });
        (added, removed)
    }

    #[tokio::test]
    async fn test_create_session_stores_and_notifies() {
        let (store, _, acquirer) =
            store_with(MockTokenAcquirer::new().with_token(token_json("s1", "alice", "u1", "repo:write")));
        let (added, removed) = counting_hook(&store);

        let session = store.create_session(&["repo:write"]).await.unwrap();
        assert_eq!(session.id, "s1");
        assert_eq!(session.account.id, "u1");
        assert_eq!(session.account.label, "alice");
        assert_eq!(session.scopes, vec![PermissionScope::RepoWrite]);

        let found = store.get_sessions(&["repo:write"]).unwrap();
        assert_eq!(found, vec![session]);
        assert_eq!(added.load(Ordering::SeqCst), 1);
        assert_eq!(removed.load(Ordering::SeqCst), 0);
        assert_eq!(acquirer.calls(), vec![("alice".to_string(), "hunter2".to_string())]);
    }

    #[tokio::test]
    async fn test_broader_grant_is_accepted() {
        let (store, _, _) =
            store_with(MockTokenAcquirer::new().with_token(token_json("s1", "alice", "u1", "repo:admin")));

        let session = store.create_session(&["repo:write"]).await.unwrap();
        assert_eq!(session.scopes, vec![PermissionScope::RepoAdmin]);
    }

    #[tokio::test]
    async fn test_narrower_grant_is_rejected() {
        let (store, _, _) =
            store_with(MockTokenAcquirer::new().with_token(token_json("s1", "alice", "u1", "repo:read")));
        let (added, _) = counting_hook(&store);

        let err = store.create_session(&["repo:write"]).await.unwrap_err();
        assert!(err.is_scope_not_granted());
        match err {
            AuthError::ScopeNotGranted { desired, granted } => {
                assert_eq!(desired, vec![PermissionScope::RepoWrite]);
                assert_eq!(granted, PermissionScope::RepoRead);
            }
            other => panic!("unexpected error: {:?}", other),
        }
        assert!(store.is_empty());
        assert_eq!(added.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_admin_desired_read_granted_is_rejected() {
        let (store, _, _) =
            store_with(MockTokenAcquirer::new().with_token(token_json("s1", "alice", "u1", "repo:read")));

        let err = store.create_session(&["repo:admin"]).await.unwrap_err();
        assert!(err.is_scope_not_granted());
        assert!(store.is_empty());
    }

    #[tokio::test]
    async fn test_empty_granted_scope_is_accepted() {
        let (store, _, _) =
            store_with(MockTokenAcquirer::new().with_token(token_json("s1", "alice", "u1", "")));

        let session = store.create_session(&["repo:admin"]).await.unwrap();
        assert_eq!(session.scopes, vec![PermissionScope::Empty]);
    }

    #[tokio::test]
    async fn test_malformed_token_leaves_store_unchanged() {
        let (store, _, _) = store_with(
            MockTokenAcquirer::new()
                .with_token(token_json("s1", "alice", "u1", "repo:read"))
                .with_token(r#"{"username":"alice","user_id":"u1","scope":"repo:read"}"#),
        );
        store.create_session::<&str>(&[]).await.unwrap();
        let (added, _) = counting_hook(&store);

        let err = store.create_session::<&str>(&[]).await.unwrap_err();
        assert!(err.is_malformed_token());
        assert_eq!(store.len(), 1);
        assert_eq!(added.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_invalid_desired_scope_skips_login() {
        let (store, chooser, acquirer) = store_with(MockTokenAcquirer::new());

        let err = store.create_session(&["bogus"]).await.unwrap_err();
        assert!(err.is_invalid_scope());
        assert_eq!(chooser.choose_count(), 0);
        assert!(acquirer.calls().is_empty());
    }

    #[tokio::test]
    async fn test_unknown_granted_scope_is_invalid() {
        let (store, _, _) =
            store_with(MockTokenAcquirer::new().with_token(token_json("s1", "alice", "u1", "repo:owner")));

        let err = store.create_session::<&str>(&[]).await.unwrap_err();
        assert!(err.is_invalid_scope());
        assert!(store.is_empty());
    }

    #[tokio::test]
    async fn test_cancelled_selection_makes_no_change() {
        let chooser = MockAccountChooser::cancelled();
        let acquirer = MockTokenAcquirer::new();
        let store = SessionStore::new(chooser, acquirer.clone());
        let (added, _) = counting_hook(&store);

        let err = store.create_session(&["repo:read"]).await.unwrap_err();
        assert!(err.is_cancelled());
        assert!(store.is_empty());
        assert!(acquirer.calls().is_empty());
        assert_eq!(added.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_account_and_acquire_failures() {
        let chooser = MockAccountChooser::failing(AccountError::NoAccountFound);
        let store = SessionStore::new(chooser, MockTokenAcquirer::new());
        let err = store.create_session::<&str>(&[]).await.unwrap_err();
        assert!(matches!(err, AuthError::AccountSelectionFailed(_)));

        let (store, _, _) = store_with(
            MockTokenAcquirer::new().with_error(AcquireError::Network("connection reset".into())),
        );
        let err = store.create_session::<&str>(&[]).await.unwrap_err();
        assert!(err.is_token_acquisition());
        assert!(err.is_retryable());
        assert!(store.is_empty());
    }

    #[tokio::test]
    async fn test_same_session_id_replaces() {
        let (store, _, _) = store_with(
            MockTokenAcquirer::new()
                .with_token(token_json("s1", "alice", "u1", "repo:read"))
                .with_token(token_json("s1", "alice", "u1", "repo:admin")),
        );
        let (added, _) = counting_hook(&store);

        store.create_session::<&str>(&[]).await.unwrap();
        store.create_session::<&str>(&[]).await.unwrap();

        assert_eq!(store.len(), 1);
        assert_eq!(store.get("s1").unwrap().scopes, vec![PermissionScope::RepoAdmin]);
        assert_eq!(added.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn test_get_sessions_filters_by_scope() {
        let (store, _, _) = store_with(
            MockTokenAcquirer::new()
                .with_token(token_json("s-read", "alice", "u1", "repo:read"))
                .with_token(token_json("s-admin", "alice", "u1", "repo:admin")),
        );
        store.create_session::<&str>(&[]).await.unwrap();
        store.create_session::<&str>(&[]).await.unwrap();

        assert_eq!(store.get_sessions::<&str>(&[]).unwrap().len(), 2);
        assert_eq!(store.get_sessions(&["repo:public_read"]).unwrap().len(), 2);

        let admin = store.get_sessions(&["repo:write"]).unwrap();
        assert_eq!(admin.len(), 1);
        assert_eq!(admin[0].id, "s-admin");

        assert!(store.get_sessions(&["repo:write", "bogus"]).unwrap_err().is_invalid_scope());
    }

    #[tokio::test]
    async fn test_remove_session() {
        let (store, _, _) =
            store_with(MockTokenAcquirer::new().with_token(token_json("s1", "alice", "u1", "repo:read")));
        store.create_session::<&str>(&[]).await.unwrap();
        let (_, removed) = counting_hook(&store);

        assert!(!store.remove_session("missing"));
        assert_eq!(removed.load(Ordering::SeqCst), 0);

        assert!(store.remove_session("s1"));
        assert!(store.is_empty());
        assert_eq!(removed.load(Ordering::SeqCst), 1);

        assert!(!store.remove_session("s1"));
        assert_eq!(removed.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_hook_sees_committed_state() {
        let (store, _, _) =
            store_with(MockTokenAcquirer::new().with_token(token_json("s1", "alice", "u1", "repo:read")));
        let store = Arc::new(store);
        let seen = Arc::new(AtomicUsize::new(0));

        let weak = Arc::downgrade(&store);
        let s = Arc::clone(&seen);
        store.subscribe(move |_: &SessionChangeEvent| {
            if let Some(store) = weak.upgrade() {
                s.store(store.len(), Ordering::SeqCst);
            }
        });

        store.create_session::<&str>(&[]).await.unwrap();
        assert_eq!(seen.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_hook_can_remove_sessions() {
        let (store, _, _) =
            store_with(MockTokenAcquirer::new().with_token(token_json("s1", "alice", "u1", "repo:read")));
        let store = Arc::new(store);

        let weak = Arc::downgrade(&store);
        store.subscribe(move |event: &SessionChangeEvent| {
            if let Some(store) = weak.upgrade() {
                for session in event.added() {
                    store.remove_session(&session.id);
                }
            }
        });

        let log = Arc::new(parking_lot::Mutex::new(Vec::new()));
        let l = Arc::clone(&log);
        store.subscribe(move |event: &SessionChangeEvent| {
            let kind = if event.added().is_empty() { "removed" } else { "added" };
            l.lock().push(kind);
        });

        store.create_session::<&str>(&[]).await.unwrap();

        assert!(store.is_empty());
        assert_eq!(*log.lock(), vec!["added", "removed"]);
    }

    #[tokio::test]
    async fn test_unsubscribe_stops_delivery() {
        let (store, _, _) = store_with(
            MockTokenAcquirer::new()
                .with_token(token_json("s1", "alice", "u1", "repo:read"))
                .with_token(token_json("s2", "alice", "u1", "repo:read")),
        );
        let count = Arc::new(AtomicUsize::new(0));
        let c = Arc::clone(&count);
        let id = store.subscribe(move |_: &SessionChangeEvent| {
            c.fetch_add(1, Ordering::SeqCst);
        });

        store.create_session::<&str>(&[]).await.unwrap();
        assert!(store.unsubscribe(id));
        assert!(!store.unsubscribe(id));
        store.create_session::<&str>(&[]).await.unwrap();

        assert_eq!(count.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_channel_subscription_and_pruning() {
        let (store, _, _) = store_with(
            MockTokenAcquirer::new()
                .with_token(token_json("s1", "alice", "u1", "repo:read"))
                .with_token(token_json("s2", "alice", "u1", "repo:read")),
        );
        let (_, mut rx) = store.subscribe_channel();
        assert_eq!(store.subscriber_count(), 1);

        store.create_session::<&str>(&[]).await.unwrap();
        store.remove_session("s1");

        let event = rx.recv().await.unwrap();
        assert_eq!(event.added()[0].id, "s1");
        let event = rx.recv().await.unwrap();
        assert_eq!(event.removed()[0].id, "s1");

        drop(rx);
        store.create_session::<&str>(&[]).await.unwrap();
        assert_eq!(store.subscriber_count(), 0);
    }

    #[tokio::test]
    async fn test_dropped_create_future_leaves_store_untouched() {
        let chooser = MockAccountChooser::new("alice", "pw");
        let acquirer = MockTokenAcquirer::new()
            .with_token(token_json("s1", "alice", "u1", "repo:read"))
            .with_delay(std::time::Duration::from_secs(60));
        let store = SessionStore::new(chooser, acquirer);

        let result = tokio::time::timeout(
            std::time::Duration::from_millis(20),
            store.create_session::<&str>(&[]),
        )
        .await;

        assert!(result.is_err());
        assert!(store.is_empty());
    }

    #[test]
    fn test_debug_hides_sessions() {
        let store = SessionStore::new(MockAccountChooser::new("a", "b"), MockTokenAcquirer::new());
        let debug = format!("{:?}", store);
        assert!(debug.contains("SessionStore"));
        assert!(debug.contains("sessions: 0"));
    }
}
