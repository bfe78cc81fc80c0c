//! Role-based authorization.

use super::AuthError;
use super::session::SessionRecord;

/// Permits a resolved identity whose role is in a fixed set.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RoleGate {
    allowed: Vec<String>,
}

impl RoleGate {
    /// Gate admitting any of the given role names.
    pub fn new<I, S>(roles: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            allowed: roles.into_iter().map(Into::into).collect(),
        }
    }

    /// Gate admitting administrators only.
    #[must_use]
    pub fn admin() -> Self {
        Self::new(["admin"])
    }

    /// Check a resolved identity. No identity counts as the empty role.
    ///
    /// # Errors
    ///
    /// Returns `Forbidden` carrying the caller's role when it is not in the
    /// set.
    pub fn check(&self, record: Option<&SessionRecord>) -> Result<(), AuthError> {
        let role = record.map_or("", |r| r.role.as_str());
        if self.allowed.iter().any(|allowed| allowed == role) {
            Ok(())
        } else {
            tracing::debug!(role, allowed = ?self.allowed, "Role gate denied request");
            Err(AuthError::Forbidden(role.to_string()))
        }
    }
}
