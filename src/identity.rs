use std::sync::RwLock;

/// What the auth collaborator currently knows about the user. `Resolving` is
/// treated as anonymous at each completion event rather than blocking on it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Identity {
    Anonymous,
    Resolving,
    User(String),
}

pub trait IdentityProvider: Send + Sync {
    fn current(&self) -> Identity;
}

/// Process-local identity slot. Auth provider integration lives outside this
/// crate; whatever owns the sign-in flow writes the resolved user in here.
pub struct SharedIdentity {
    inner: RwLock<Identity>,
}

impl SharedIdentity {
    pub fn new(initial: Identity) -> Self {
        Self {
            inner: RwLock::new(initial),
        }
    }

    pub fn from_user_id(user_id: Option<String>) -> Self {
        Self::new(match user_id {
            Some(id) => Identity::User(id),
            None => Identity::Anonymous,
        })
    }

    pub fn set(&self, identity: Identity) {
        *self.inner.write().unwrap_or_else(|e| e.into_inner()) = identity;
    }
}

impl IdentityProvider for SharedIdentity {
    fn current(&self) -> Identity {
        self.inner.read().unwrap_or_else(|e| e.into_inner()).clone()
    }
}
