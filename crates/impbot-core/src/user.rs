//! Chat users.
//!
//! A [`User`] is a value type. Two users are the same user when they come
//! from the same kind of service and carry the same name; everything else
//! (display name, admin and moderator flags) is metadata that is ignored by
//! equality and hashing.

use std::fmt;
use std::hash::{Hash, Hasher};

/// A user that sent a message.
///
/// The `service` field plays the role of the concrete user kind: an IRC user
/// and a Discord user with the same name are different users.
#[derive(Debug, Clone)]
pub struct User {
    service: &'static str,
    name: String,
    display_name: Option<String>,
    admin: Option<bool>,
    moderator: Option<bool>,
}

impl User {
    /// Creates a user without any metadata.
    pub fn new(service: &'static str, name: impl Into<String>) -> Self {
        Self {
            service,
            name: name.into(),
            display_name: None,
            admin: None,
            moderator: None,
        }
    }

    /// Sets the name shown to other users.
    pub fn with_display_name(mut self, display_name: impl Into<String>) -> Self {
        self.display_name = Some(display_name.into());
        self
    }

    /// Marks the user as an admin (or explicitly not one).
    pub fn with_admin(mut self, admin: bool) -> Self {
        self.admin = Some(admin);
        self
    }

    /// Marks the user as a moderator (or explicitly not one).
    pub fn with_moderator(mut self, moderator: bool) -> Self {
        self.moderator = Some(moderator);
        self
    }

    /// The service this user belongs to.
    pub fn service(&self) -> &'static str {
        self.service
    }

    /// The identifying name.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// The display name, falling back to the identifying name.
    pub fn display_name(&self) -> &str {
        self.display_name.as_deref().unwrap_or(&self.name)
    }

    /// Whether the user is an admin. Unknown counts as no.
    pub fn admin(&self) -> bool {
        self.admin.unwrap_or(false)
    }

    /// Whether the user may run moderator-only commands.
    ///
    /// Admins are always moderators.
    pub fn moderator(&self) -> bool {
        self.admin() || self.moderator.unwrap_or(false)
    }
}

impl PartialEq for User {
    fn eq(&self, other: &Self) -> bool {
        self.service == other.service && self.name == other.name
    }
}

impl Eq for User {}

impl Hash for User {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.service.hash(state);
        self.name.hash(state);
    }
}

impl fmt::Display for User {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.name)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    #[test]
    fn test_metadata_ignored_by_equality() {
        let plain = User::new("irc", "alice");
        let admin = User::new("irc", "alice").with_admin(true).with_display_name("Alice");
        assert_eq!(plain, admin);

        let mut set = HashSet::new();
        set.insert(plain);
        assert!(set.contains(&admin));
    }

    #[test]
    fn test_service_is_part_of_identity() {
        assert_ne!(User::new("irc", "alice"), User::new("discord", "alice"));
    }

    #[test]
    fn test_display_is_name() {
        let user = User::new("irc", "alice").with_display_name("Alice!");
        assert_eq!(user.to_string(), "alice");
        assert_eq!(user.display_name(), "Alice!");
    }

    #[test]
    fn test_admin_implies_moderator() {
        assert!(User::new("irc", "a").with_admin(true).moderator());
        assert!(User::new("irc", "a").with_moderator(true).moderator());
        assert!(!User::new("irc", "a").moderator());
    }
}
