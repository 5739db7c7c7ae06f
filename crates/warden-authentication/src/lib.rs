//! Warden Authentication
//!
//! Identity lifecycle over a pluggable storage backend: verify credentials,
//! persist the resulting identity, and answer "who is this?" cheaply by
//! memoizing one storage read until the identity is cleared.
//!
//! This crate is independent of the authorization engine — it knows nothing
//! about domains or policies. The interface is three capabilities:
//! [`Credentials`] (verify and report a [`ResultCode`]), [`Storage`]
//! (persist the identity), and the [`Auth`] façade tying them together.

pub mod credentials;
pub mod result;
pub mod storage;

pub use credentials::Credentials;
pub use result::{AuthResult, ResultCode};
pub use storage::{MemoryStorage, Storage};

use tracing::debug;

/// Authentication errors.
///
/// Failed authentication attempts are not errors — they are result codes on
/// [`AuthResult`]. Errors here are infrastructure failures of the storage
/// backend.
#[derive(Debug, thiserror::Error)]
pub enum AuthenticationError {
    /// The storage backend failed to read or write the identity.
    #[error("identity storage error: {0}")]
    Storage(String),
}

/// Crate-level result alias.
pub type Result<T> = std::result::Result<T, AuthenticationError>;

/// The authentication and credential manager.
///
/// Wraps a [`Storage`] backend and caches one identity lookup: the first
/// [`Auth::identity`] call reads the backend, later calls reuse the cached
/// value until [`Auth::clear_identity`] invalidates it. Authenticating
/// clears any prior identity before the newly verified one is written.
pub struct Auth<S: Storage> {
    storage: S,
    cached: Option<Option<S::Identity>>,
}

impl<S: Storage + std::fmt::Debug> std::fmt::Debug for Auth<S> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Auth")
            .field("storage", &self.storage)
            .field("memoized", &self.cached.is_some())
            .finish()
    }
}

impl<S: Storage> Auth<S>
where
    S::Identity: Clone,
{
    /// Create a manager over the given storage backend.
    pub fn new(storage: S) -> Self {
        Self {
            storage,
            cached: None,
        }
    }

    /// The underlying storage backend.
    pub fn storage(&self) -> &S {
        &self.storage
    }

    /// Mutable access to the underlying storage backend.
    pub fn storage_mut(&mut self) -> &mut S {
        &mut self.storage
    }

    /// Verify credentials and persist the identity on success.
    ///
    /// Any previously stored identity is cleared before the new one is
    /// written, so a failed attempt also ends the previous session. The
    /// verification outcome is returned verbatim.
    pub fn authenticate<C>(&mut self, credentials: &C) -> Result<AuthResult<S::Identity>>
    where
        C: Credentials<Identity = S::Identity>,
    {
        let result = credentials.authenticate();
        debug!(code = result.code().code(), "authentication attempt");

        if self.has_identity()? {
            self.clear_identity()?;
        }
        if result.is_valid() {
            if let Some(identity) = result.identity() {
                self.storage.write(identity.clone())?;
                self.cached = Some(Some(identity.clone()));
            }
        }
        Ok(result)
    }

    /// The stored identity, if any. The first call reads the backend; later
    /// calls return the memoized value.
    pub fn identity(&mut self) -> Result<Option<S::Identity>> {
        if let Some(cached) = &self.cached {
            return Ok(cached.clone());
        }
        let loaded = self.storage.read()?;
        self.cached = Some(loaded.clone());
        Ok(loaded)
    }

    /// Whether an identity is stored.
    pub fn has_identity(&mut self) -> Result<bool> {
        Ok(self.identity()?.is_some())
    }

    /// Remove the stored identity and invalidate the memoized read.
    pub fn clear_identity(&mut self) -> Result<()> {
        self.storage.clear()?;
        self.cached = None;
        debug!("identity cleared");
        Ok(())
    }
}
