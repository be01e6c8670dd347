//! Session and connectivity ports
//!
//! The engines never reach for globals; whoever embeds the core injects
//! these at construction time. CLI and tests plug in the provided static
//! implementations.

use std::sync::Arc;
use tokio::sync::watch;

/// The authenticated account, as far as sync is concerned
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OwnerProfile {
    /// Stable account identifier stamped on entities and outbox events
    pub id: String,
    /// Display email, if known
    pub email: Option<String>,
}

/// Source of the current authenticated owner.
///
/// `None` means logged out; push and pull become no-ops while mutations
/// keep recording outbox events.
pub trait OwnerProvider: Send + Sync {
    /// The current owner's profile, if logged in
    fn profile(&self) -> Option<OwnerProfile>;

    /// Convenience accessor for just the owner id
    fn current_owner(&self) -> Option<String> {
        self.profile().map(|p| p.id)
    }
}

/// Source of network reachability.
///
/// `subscribe` hands out a watch channel so the sync loop can react to
/// reconnects without polling.
pub trait ConnectivityProbe: Send + Sync {
    /// Whether the remote is currently reachable
    fn is_online(&self) -> bool;

    /// Receiver that yields on every connectivity change
    fn subscribe(&self) -> watch::Receiver<bool>;
}

/// Fixed owner, settable at runtime. Suits a single-account CLI session.
#[derive(Default)]
pub struct StaticOwner {
    profile: std::sync::RwLock<Option<OwnerProfile>>,
}

impl StaticOwner {
    /// Start logged out
    #[must_use]
    pub fn logged_out() -> Self {
        Self::default()
    }

    /// Start logged in as the given owner
    #[must_use]
    pub fn logged_in(id: impl Into<String>) -> Self {
        let owner = Self::default();
        owner.set(Some(OwnerProfile {
            id: id.into(),
            email: None,
        }));
        owner
    }

    /// Replace the current session
    pub fn set(&self, profile: Option<OwnerProfile>) {
        *self.profile.write().unwrap_or_else(std::sync::PoisonError::into_inner) = profile;
    }
}

impl OwnerProvider for StaticOwner {
    fn profile(&self) -> Option<OwnerProfile> {
        self.profile
            .read()
            .unwrap_or_else(std::sync::PoisonError::into_inner)
            .clone()
    }
}

/// Connectivity flag shared through a watch channel
pub struct SharedConnectivity {
    sender: watch::Sender<bool>,
}

impl SharedConnectivity {
    /// Start in the given state
    #[must_use]
    pub fn new(online: bool) -> Arc<Self> {
        let (sender, _) = watch::channel(online);
        Arc::new(Self { sender })
    }

    /// Flip the connectivity state, waking subscribers
    pub fn set_online(&self, online: bool) {
        self.sender.send_replace(online);
    }
}

impl ConnectivityProbe for SharedConnectivity {
    fn is_online(&self) -> bool {
        *self.sender.borrow()
    }

    fn subscribe(&self) -> watch::Receiver<bool> {
        self.sender.subscribe()
    }
}
