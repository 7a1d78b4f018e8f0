use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::jwt::{Claims, TokenError};

/// The caller behind a request, resolved once from its session token.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Identity {
    Authenticated { user_id: Uuid, email: String },
    #[default]
    Anonymous,
}

impl Identity {
    pub fn authenticated(user_id: Uuid, email: impl Into<String>) -> Self {
        Identity::Authenticated {
            user_id,
            email: email.into(),
        }
    }

    /// Build an authenticated identity from verified claims.
    pub fn from_claims(claims: &Claims) -> Result<Self, TokenError> {
        Ok(Identity::Authenticated {
            user_id: claims.user_id()?,
            email: claims.email.clone(),
        })
    }

    pub fn user_id(&self) -> Option<Uuid> {
        match self {
            Identity::Authenticated { user_id, .. } => Some(*user_id),
            Identity::Anonymous => None,
        }
    }

    pub fn is_authenticated(&self) -> bool {
        matches!(self, Identity::Authenticated { .. })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_from_claims() {
        let user_id = Uuid::new_v4();
        let claims = Claims {
            sub: user_id.to_string(),
            email: "ada@example.com".into(),
            iat: 0,
            exp: 3600,
        };

        let identity = Identity::from_claims(&claims).unwrap();
        assert_eq!(identity.user_id(), Some(user_id));
        assert!(identity.is_authenticated());
    }

    #[test]
    fn test_anonymous_has_no_user() {
        assert_eq!(Identity::default(), Identity::Anonymous);
        assert_eq!(Identity::Anonymous.user_id(), None);
    }
}
