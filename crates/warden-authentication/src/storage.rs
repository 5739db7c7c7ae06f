//! Persistent identity storage.

use crate::Result;

/// Where an authenticated identity is persisted between lookups.
///
/// Backends may fail (a session store, a file, a database), so every
/// operation is fallible. `read` returning `Ok(None)` means the backend is
/// reachable but holds no identity.
pub trait Storage: Send {
    /// The identity type this backend persists.
    type Identity;

    /// Persist an identity, replacing any previous one.
    fn write(&mut self, identity: Self::Identity) -> Result<()>;

    /// Load the stored identity, if any.
    fn read(&self) -> Result<Option<Self::Identity>>;

    /// Remove the stored identity.
    fn clear(&mut self) -> Result<()>;
}

/// Process-local storage holding the identity in memory. Useful for tests
/// and for embeddings that manage persistence elsewhere.
#[derive(Debug, Default, Clone)]
pub struct MemoryStorage<I> {
    identity: Option<I>,
}

impl<I> MemoryStorage<I> {
    /// Create an empty storage.
    pub fn new() -> Self {
        Self { identity: None }
    }
}

impl<I: Clone + Send> Storage for MemoryStorage<I> {
    type Identity = I;

    fn write(&mut self, identity: I) -> Result<()> {
        self.identity = Some(identity);
        Ok(())
    }

    fn read(&self) -> Result<Option<I>> {
        Ok(self.identity.clone())
    }

    fn clear(&mut self) -> Result<()> {
        self.identity = None;
        Ok(())
    }
}
