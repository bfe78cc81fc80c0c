//! Session records.
//!
//! A session record is the snapshot of an identity that the authentication
//! gate attaches to a request. It lives in the session cache under the
//! identity id; its absence means the identity is logged out, whatever
//! tokens the client still holds.

use std::sync::Arc;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use coursehub_core::IdentityId;

use super::AuthError;
use super::cache::SessionCache;
use super::identity::{Avatar, CourseRef, Identity, Role};

/// Current session record layout.
pub const SESSION_RECORD_VERSION: u32 = 1;

/// Cached snapshot of an identity. Never carries the password hash.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionRecord {
    /// Layout version.
    pub v: u32,
    /// Identity id.
    pub id: IdentityId,
    /// Display name.
    pub name: String,
    /// Email.
    pub email: String,
    /// Role at the time of the write.
    pub role: Role,
    /// Avatar.
    pub avatar: Option<Avatar>,
    /// Owned courses.
    pub courses: Vec<CourseRef>,
    /// Whether the email was verified.
    pub is_verified: bool,
}

impl From<&Identity> for SessionRecord {
    fn from(identity: &Identity) -> Self {
        Self {
            v: SESSION_RECORD_VERSION,
            id: identity.id.clone(),
            name: identity.name.clone(),
            email: identity.email.clone(),
            role: identity.role,
            avatar: identity.avatar.clone(),
            courses: identity.courses.clone(),
            is_verified: identity.is_verified,
        }
    }
}

impl SessionRecord {
    /// Parse a cached blob, rejecting anything that is not a current record.
    fn parse(blob: &str) -> Result<Self, String> {
        let record: Self = serde_json::from_str(blob).map_err(|e| e.to_string())?;
        if record.v != SESSION_RECORD_VERSION {
            return Err(format!("unsupported record version {}", record.v));
        }
        Ok(record)
    }
}

/// Reads and writes session records through a [`SessionCache`].
#[derive(Clone)]
pub struct SessionStore {
    cache: Arc<dyn SessionCache>,
    ttl: Duration,
}

impl SessionStore {
    /// Create a store writing records with the given lifetime.
    #[must_use]
    pub fn new(cache: Arc<dyn SessionCache>, ttl: Duration) -> Self {
        Self { cache, ttl }
    }

    /// Record lifetime.
    #[must_use]
    pub const fn ttl(&self) -> Duration {
        self.ttl
    }

    /// Overwrite the record for an identity.
    ///
    /// # Errors
    ///
    /// Returns error if the cache write fails.
    pub async fn write(&self, identity: &Identity) -> Result<SessionRecord, AuthError> {
        let record = SessionRecord::from(identity);
        self.write_record(&record).await?;
        Ok(record)
    }

    /// Overwrite a record, restarting its lifetime.
    ///
    /// # Errors
    ///
    /// Returns error if serialization or the cache write fails.
    pub async fn write_record(&self, record: &SessionRecord) -> Result<(), AuthError> {
        let blob = serde_json::to_string(record)
            .map_err(|e| AuthError::Cache(format!("Serialization error: {e}")))?;
        self.cache
            .set(record.id.as_str(), &blob, Some(self.ttl))
            .await?;
        tracing::debug!(identity = %record.id, ttl_secs = self.ttl.as_secs(), "Wrote session record");
        Ok(())
    }

    /// Load the record for an identity.
    ///
    /// A blob that is not a current record is deleted and reported as
    /// absent.
    ///
    /// # Errors
    ///
    /// Returns error if the cache is unreachable.
    pub async fn load(&self, id: &IdentityId) -> Result<Option<SessionRecord>, AuthError> {
        let Some(blob) = self.cache.get(id.as_str()).await? else {
            return Ok(None);
        };

        match SessionRecord::parse(&blob) {
            Ok(record) if record.id == *id => Ok(Some(record)),
            Ok(record) => {
                tracing::warn!(identity = %id, stored = %record.id, "Evicting session record filed under the wrong key");
                self.cache.del(id.as_str()).await?;
                Ok(None)
            }
            Err(reason) => {
                tracing::warn!(identity = %id, "Evicting unreadable session record: {reason}");
                self.cache.del(id.as_str()).await?;
                Ok(None)
            }
        }
    }

    /// Delete the record for an identity. Returns whether one existed.
    ///
    /// # Errors
    ///
    /// Returns error if the cache is unreachable.
    pub async fn revoke(&self, id: &IdentityId) -> Result<bool, AuthError> {
        let removed = self.cache.del(id.as_str()).await?;
        tracing::debug!(identity = %id, removed, "Revoked session record");
        Ok(removed)
    }

    /// Remaining lifetime of an identity's record.
    ///
    /// # Errors
    ///
    /// Returns error if the cache is unreachable.
    pub async fn remaining(&self, id: &IdentityId) -> Result<Option<Duration>, AuthError> {
        Ok(self.cache.ttl(id.as_str()).await?)
    }
}

impl std::fmt::Debug for SessionStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SessionStore")
            .field("ttl", &self.ttl)
            .finish_non_exhaustive()
    }
}
