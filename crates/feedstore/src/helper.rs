use feedstore_types::Session;
use uuid::Uuid;

use crate::keys::{HEAD_SESSION_TOKEN, SESSION_NAME_PREFIX};

/// Allocates session identities.
#[derive(Clone, Copy, Debug, Default)]
pub struct StoreHelper;

impl StoreHelper {
    /// A fresh, random session token.
    pub fn new_session_token(&self) -> String {
        format!("{SESSION_NAME_PREFIX}{}", Uuid::new_v4())
    }

    /// A fresh session identity.
    pub fn new_session(&self) -> Session {
        Session::new(self.new_session_token())
    }

    /// The distinguished head session.
    pub fn head_session(&self) -> Session {
        Session::new(HEAD_SESSION_TOKEN)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn tokens_are_prefixed_and_unique() {
        let helper = StoreHelper;
        let a = helper.new_session_token();
        let b = helper.new_session_token();
        assert!(a.starts_with(SESSION_NAME_PREFIX));
        assert_ne!(a, b);
        assert_ne!(helper.new_session(), helper.head_session());
    }
}
