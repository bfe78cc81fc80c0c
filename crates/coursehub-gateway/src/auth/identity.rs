//! Identity model and credential store.

use std::path::Path;

use argon2::{
    Argon2,
    password_hash::{PasswordHash, PasswordHasher, PasswordVerifier, SaltString, rand_core::OsRng},
};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use coursehub_core::{IdentityId, normalize_email};

use super::AuthError;

const EMAIL_INDEX_PREFIX: &str = "idx:email:";

/// Identity role for access control.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    /// Learner account.
    #[default]
    User,
    /// Platform administrator.
    Admin,
}

impl Role {
    /// Role name as used on the wire and in role sets.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::User => "user",
            Self::Admin => "admin",
        }
    }

    /// Check if this role has admin privileges.
    #[must_use]
    pub const fn is_admin(&self) -> bool {
        matches!(self, Self::Admin)
    }
}

impl std::fmt::Display for Role {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for Role {
    type Err = AuthError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "user" => Ok(Self::User),
            "admin" => Ok(Self::Admin),
            _ => Err(AuthError::BadRequest(format!("Unknown role: {s}"))),
        }
    }
}

/// Hosted avatar image.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Avatar {
    /// Media host id, empty for social avatars.
    #[serde(default)]
    pub public_id: String,
    /// Public URL.
    pub url: String,
}

/// Reference to an owned course.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CourseRef {
    /// Course id.
    pub course_id: String,
}

/// A registered account.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Identity {
    /// Unique id, also the session cache key.
    pub id: IdentityId,
    /// Display name.
    pub name: String,
    /// Lower-cased email, unique across the store.
    pub email: String,
    /// Argon2 hash. `None` for social sign-ins.
    #[serde(default, skip_serializing)]
    pub password_hash: Option<String>,
    /// Role.
    #[serde(default)]
    pub role: Role,
    /// Avatar.
    #[serde(default)]
    pub avatar: Option<Avatar>,
    /// Owned courses.
    #[serde(default)]
    pub courses: Vec<CourseRef>,
    /// Whether the email was verified.
    #[serde(default)]
    pub is_verified: bool,
    /// When the identity was created.
    pub created_at: DateTime<Utc>,
    /// Last modification.
    pub updated_at: DateTime<Utc>,
}

impl Identity {
    /// Create an identity with a password.
    ///
    /// # Errors
    ///
    /// Returns error if password hashing fails.
    pub fn new(
        name: impl Into<String>,
        email: &str,
        password: &str,
        role: Role,
    ) -> Result<Self, AuthError> {
        let mut identity = Self::without_password(name, email, role);
        identity.password_hash = Some(hash_password(password)?);
        Ok(identity)
    }

    /// Create an identity that signs in through a social provider.
    #[must_use]
    pub fn without_password(name: impl Into<String>, email: &str, role: Role) -> Self {
        let now = Utc::now();
        Self {
            id: IdentityId::generate(),
            name: name.into(),
            email: normalize_email(email),
            password_hash: None,
            role,
            avatar: None,
            courses: Vec::new(),
            is_verified: false,
            created_at: now,
            updated_at: now,
        }
    }

    /// Whether the identity has a password.
    #[must_use]
    pub const fn has_password(&self) -> bool {
        self.password_hash.is_some()
    }

    /// Verify a password against this identity's hash.
    ///
    /// # Errors
    ///
    /// Returns `InvalidCredentials` if the password doesn't match or the
    /// identity has none.
    pub fn verify_password(&self, password: &str) -> Result<(), AuthError> {
        match &self.password_hash {
            Some(hash) => verify_password(password, hash),
            None => Err(AuthError::InvalidCredentials),
        }
    }

    /// Replace the password.
    ///
    /// # Errors
    ///
    /// Returns error if password hashing fails.
    pub fn set_password(&mut self, password: &str) -> Result<(), AuthError> {
        self.password_hash = Some(hash_password(password)?);
        Ok(())
    }
}

/// Credential store backed by sled.
///
/// Identities live under their id; a secondary `idx:email:` entry maps the
/// lower-cased email back to the id.
pub struct IdentityStore {
    _db: sled::Db,
    tree: sled::Tree,
}

impl IdentityStore {
    /// Open or create a store under the given data directory.
    ///
    /// # Errors
    ///
    /// Returns error if database cannot be opened.
    pub fn open(path: &Path) -> Result<Self, AuthError> {
        let db = sled::open(path.join("identities"))
            .map_err(|e| AuthError::Storage(format!("Failed to open identity database: {e}")))?;
        Self::with_db(&db)
    }

    /// Create a store on an existing sled database.
    ///
    /// # Errors
    ///
    /// Returns error if tree cannot be opened.
    pub fn with_db(db: &sled::Db) -> Result<Self, AuthError> {
        let tree = db
            .open_tree("identities")
            .map_err(|e| AuthError::Storage(format!("Failed to open identities tree: {e}")))?;

        Ok(Self {
            _db: db.clone(),
            tree,
        })
    }

    /// Count stored identities.
    #[must_use]
    pub fn count(&self) -> usize {
        self.tree
            .iter()
            .filter(|r| {
                r.as_ref()
                    .map(|(k, _)| !k.starts_with(EMAIL_INDEX_PREFIX.as_bytes()))
                    .unwrap_or(false)
            })
            .count()
    }

    /// Check if no identities exist.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.count() == 0
    }

    /// Insert a new identity.
    ///
    /// # Errors
    ///
    /// Returns `IdentityExists` if the email is taken.
    pub fn create(&self, identity: &Identity) -> Result<(), AuthError> {
        if self.get_by_email(&identity.email)?.is_some() {
            return Err(AuthError::IdentityExists(identity.email.clone()));
        }

        self.put(identity)?;
        self.tree
            .insert(email_key(&identity.email), identity.id.as_str().as_bytes())
            .map_err(|e| AuthError::Storage(format!("Index error: {e}")))?;
        self.flush()?;

        tracing::debug!(identity = %identity.id, "Created identity");
        Ok(())
    }

    /// Find by id.
    ///
    /// # Errors
    ///
    /// Returns error if storage fails.
    pub fn get(&self, id: &IdentityId) -> Result<Option<Identity>, AuthError> {
        match self.tree.get(id.as_str().as_bytes()) {
            Ok(Some(value)) => {
                let identity: Identity = serde_json::from_slice(&value)
                    .map_err(|e| AuthError::Storage(format!("Deserialization error: {e}")))?;
                Ok(Some(identity))
            }
            Ok(None) => Ok(None),
            Err(e) => Err(AuthError::Storage(format!("Get error: {e}"))),
        }
    }

    /// Find by email, case-insensitively.
    ///
    /// # Errors
    ///
    /// Returns error if storage fails.
    pub fn get_by_email(&self, email: &str) -> Result<Option<Identity>, AuthError> {
        match self.tree.get(email_key(email)) {
            Ok(Some(id_bytes)) => {
                let id = IdentityId::new(String::from_utf8_lossy(&id_bytes).into_owned());
                self.get(&id)
            }
            Ok(None) => Ok(None),
            Err(e) => Err(AuthError::Storage(format!("Index lookup error: {e}"))),
        }
    }

    /// Overwrite an existing identity, moving the email index if the email
    /// changed.
    ///
    /// # Errors
    ///
    /// Returns `IdentityNotFound` if the id is unknown and `IdentityExists`
    /// if the new email belongs to another identity.
    pub fn update(&self, identity: &Identity) -> Result<(), AuthError> {
        let previous = self
            .get(&identity.id)?
            .ok_or_else(|| AuthError::IdentityNotFound(identity.id.to_string()))?;

        if previous.email != identity.email {
            if let Some(owner) = self.get_by_email(&identity.email)? {
                if owner.id != identity.id {
                    return Err(AuthError::IdentityExists(identity.email.clone()));
                }
            }
            self.tree
                .remove(email_key(&previous.email))
                .map_err(|e| AuthError::Storage(format!("Index remove error: {e}")))?;
            self.tree
                .insert(email_key(&identity.email), identity.id.as_str().as_bytes())
                .map_err(|e| AuthError::Storage(format!("Index error: {e}")))?;
        }

        let mut identity = identity.clone();
        identity.updated_at = Utc::now();
        self.put(&identity)?;
        self.flush()
    }

    /// Delete an identity.
    ///
    /// # Errors
    ///
    /// Returns error if storage fails.
    pub fn delete(&self, id: &IdentityId) -> Result<bool, AuthError> {
        if let Some(identity) = self.get(id)? {
            self.tree
                .remove(email_key(&identity.email))
                .map_err(|e| AuthError::Storage(format!("Index remove error: {e}")))?;
        }

        let removed = self
            .tree
            .remove(id.as_str().as_bytes())
            .map_err(|e| AuthError::Storage(format!("Delete error: {e}")))?
            .is_some();

        self.flush()?;
        Ok(removed)
    }

    /// All identities, newest first.
    ///
    /// # Errors
    ///
    /// Returns error if storage fails.
    pub fn list(&self) -> Result<Vec<Identity>, AuthError> {
        let mut identities = Vec::new();

        for result in self.tree.iter() {
            let (key, value) =
                result.map_err(|e| AuthError::Storage(format!("Iter error: {e}")))?;

            if key.starts_with(EMAIL_INDEX_PREFIX.as_bytes()) {
                continue;
            }

            let identity: Identity = serde_json::from_slice(&value)
                .map_err(|e| AuthError::Storage(format!("Deserialization error: {e}")))?;
            identities.push(identity);
        }

        identities.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        Ok(identities)
    }

    fn put(&self, identity: &Identity) -> Result<(), AuthError> {
        // The public serializer skips the hash, so store a full copy.
        let value = serde_json::to_vec(&StoredIdentity::from(identity))
            .map_err(|e| AuthError::Storage(format!("Serialization error: {e}")))?;

        self.tree
            .insert(identity.id.as_str().as_bytes(), value)
            .map_err(|e| AuthError::Storage(format!("Insert error: {e}")))?;
        Ok(())
    }

    fn flush(&self) -> Result<(), AuthError> {
        self.tree
            .flush()
            .map(|_| ())
            .map_err(|e| AuthError::Storage(format!("Flush error: {e}")))
    }
}

impl std::fmt::Debug for IdentityStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("IdentityStore")
            .field("count", &self.count())
            .finish()
    }
}

/// Storage form of [`Identity`], including the password hash.
#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct StoredIdentity<'a> {
    #[serde(flatten)]
    identity: &'a Identity,
    #[serde(skip_serializing_if = "Option::is_none")]
    password_hash: Option<&'a str>,
}

impl<'a> From<&'a Identity> for StoredIdentity<'a> {
    fn from(identity: &'a Identity) -> Self {
        Self {
            identity,
            password_hash: identity.password_hash.as_deref(),
        }
    }
}

fn email_key(email: &str) -> Vec<u8> {
    format!("{EMAIL_INDEX_PREFIX}{}", normalize_email(email)).into_bytes()
}

/// Hash a password using Argon2id.
pub(crate) fn hash_password(password: &str) -> Result<String, AuthError> {
    let salt = SaltString::generate(&mut OsRng);

    Argon2::default()
        .hash_password(password.as_bytes(), &salt)
        .map(|h| h.to_string())
        .map_err(|e| AuthError::Config(format!("Password hashing failed: {e}")))
}

fn verify_password(password: &str, hash: &str) -> Result<(), AuthError> {
    let parsed_hash =
        PasswordHash::new(hash).map_err(|e| AuthError::Storage(format!("Invalid hash: {e}")))?;

    Argon2::default()
        .verify_password(password.as_bytes(), &parsed_hash)
        .map_err(|_| AuthError::InvalidCredentials)
}
