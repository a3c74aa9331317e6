use std::collections::BTreeSet;

use serde::{Deserialize, Serialize};

/// An authenticated requester: an identifier plus role and authorisation
/// strings. Identity is established upstream and taken as given here.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub struct User {
    pub id: String,
    #[serde(default, skip_serializing_if = "BTreeSet::is_empty")]
    pub roles: BTreeSet<String>,
    #[serde(default, skip_serializing_if = "BTreeSet::is_empty")]
    pub auths: BTreeSet<String>,
}

impl User {
    pub fn new(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            ..Default::default()
        }
    }

    pub fn with_roles<I, S>(mut self, roles: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.roles.extend(roles.into_iter().map(Into::into));
        self
    }

    pub fn with_auths<I, S>(mut self, auths: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.auths.extend(auths.into_iter().map(Into::into));
        self
    }

    pub fn has_role(&self, role: &str) -> bool {
        self.roles.contains(role)
    }

    pub fn has_auth(&self, auth: &str) -> bool {
        self.auths.contains(auth)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_user_roles_and_auths() {
        let user = User::new("alice")
            .with_roles(["HR", "analyst"])
            .with_auths(vec!["public".to_string()]);

        assert_eq!(user.id, "alice");
        assert!(user.has_role("HR"));
        assert!(!user.has_role("admin"));
        assert!(user.has_auth("public"));
    }

    #[test]
    fn test_user_deserializes_without_roles() {
        let user: User = serde_json::from_str(r#"{"id":"bob"}"#).unwrap();
        assert_eq!(user, User::new("bob"));

        let json = serde_json::to_string(&user).unwrap();
        assert_eq!(json, r#"{"id":"bob"}"#);
    }
}
