use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Identifier of a user in the identity provider's user space.
///
/// The value is opaque to this service: it is never parsed, only compared
/// for equality and echoed back.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[serde(transparent)]
pub struct UserId(pub String);

impl UserId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Short form for log lines.
    pub fn short(&self) -> &str {
        let end = self
            .0
            .char_indices()
            .nth(12)
            .map(|(i, _)| i)
            .unwrap_or(self.0.len());
        &self.0[..end]
    }
}

impl std::fmt::Display for UserId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for UserId {
    fn from(s: &str) -> Self {
        Self(s.to_string())
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(transparent)]
pub struct PostId(pub Uuid);

impl PostId {
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for PostId {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Display for PostId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Public profile of a user as reported by the identity provider's
/// directory. Read-only from this service's point of view.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct AuthorProfile {
    pub id: UserId,
    /// Display handle. Users who never picked one have none.
    #[serde(default)]
    pub username: Option<String>,
    #[serde(default, alias = "profileImageUrl")]
    pub profile_image_url: String,
}

impl AuthorProfile {
    /// The display handle, if it is present and non-empty. Returned verbatim.
    pub fn display_name(&self) -> Option<&str> {
        self.username.as_deref().filter(|name| !name.is_empty())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_user_id_short_truncates_on_char_boundary() {
        let id = UserId::new("user_2NNEqL3JBvFz8cL1ky6gyGj6bXh");
        assert_eq!(id.short(), "user_2NNEqL3");

        let short = UserId::new("u1");
        assert_eq!(short.short(), "u1");
    }

    #[test]
    fn test_user_id_serializes_as_plain_string() {
        let id = UserId::new("u1");
        assert_eq!(serde_json::to_string(&id).unwrap(), "\"u1\"");
    }

    #[test]
    fn test_display_name_rejects_only_missing_or_empty_username() {
        let mut profile = AuthorProfile {
            id: UserId::new("u1"),
            username: Some("alice".into()),
            profile_image_url: "https://img.example/alice.png".into(),
        };
        assert_eq!(profile.display_name(), Some("alice"));

        profile.username = Some(" alice ".into());
        assert_eq!(profile.display_name(), Some(" alice "));

        profile.username = Some("   ".into());
        assert_eq!(profile.display_name(), Some("   "));

        profile.username = Some(String::new());
        assert_eq!(profile.display_name(), None);

        profile.username = None;
        assert_eq!(profile.display_name(), None);
    }

    #[test]
    fn test_profile_accepts_camel_case_image_url() {
        let json = r#"{"id":"u1","username":"bob","profileImageUrl":"https://img.example/b.png"}"#;
        let profile: AuthorProfile = serde_json::from_str(json).unwrap();
        assert_eq!(profile.profile_image_url, "https://img.example/b.png");
    }
}
