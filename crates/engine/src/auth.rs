//! Caller identity and edit targets.

use uuid::Uuid;

/// Who is calling the engine.
///
/// Built by the presentation layer after authentication and passed to every
/// [`Engine`](crate::Engine) method. Anything not owned by `user_id` is
/// reported as not found.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct AuthContext {
    pub user_id: String,
}

impl AuthContext {
    pub fn new(user_id: impl Into<String>) -> Self {
        Self {
            user_id: user_id.into(),
        }
    }
}

/// The entity a user is about to edit.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum EditTarget {
    Wallet(Uuid),
    Theme(Uuid),
    Transaction(Uuid),
}
