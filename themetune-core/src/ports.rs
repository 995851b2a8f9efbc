//! Ports to the host collaborators the core calls into.

use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};

use async_trait::async_trait;
use parking_lot::Mutex;

use crate::{
    domain::{EntityId, EntityQuery, LibraryEntity, ResolutionConfiguration},
    error::{Result, ThemeError},
};

/// Read access to the host's entity catalog.
#[async_trait]
pub trait LibraryCatalog: Send + Sync {
    /// Enumerate entities matching `query`, in catalog order.
    async fn list_entities(&self, query: &EntityQuery) -> Result<Vec<LibraryEntity>>;

    async fn entity(&self, id: EntityId) -> Result<Option<LibraryEntity>>;
}

/// Load/save of the resolution configuration record.
///
/// `save` must be durable once it returns `Ok`.
pub trait ConfigurationPersistence: Send + Sync {
    fn load(&self) -> Result<ResolutionConfiguration>;

    fn save(&self, config: &ResolutionConfiguration) -> Result<()>;
}

/// Volatile persistence used by tests and ephemeral deployments.
#[derive(Debug, Default)]
pub struct MemoryConfigurationPersistence {
    saved: Mutex<ResolutionConfiguration>,
    save_count: AtomicUsize,
    fail_saves: AtomicBool,
}

impl MemoryConfigurationPersistence {
    pub fn new(initial: ResolutionConfiguration) -> Self {
        Self {
            saved: Mutex::new(initial),
            ..Self::default()
        }
    }

    /// Last record accepted by `save`.
    pub fn saved(&self) -> ResolutionConfiguration {
        self.saved.lock().clone()
    }

    pub fn save_count(&self) -> usize {
        self.save_count.load(Ordering::SeqCst)
    }

    /// Make subsequent saves fail, simulating an unwritable store.
    pub fn set_fail_saves(&self, fail: bool) {
        self.fail_saves.store(fail, Ordering::SeqCst);
    }
}

impl ConfigurationPersistence for MemoryConfigurationPersistence {
    fn load(&self) -> Result<ResolutionConfiguration> {
        Ok(self.saved.lock().clone())
    }

    fn save(&self, config: &ResolutionConfiguration) -> Result<()> {
        if self.fail_saves.load(Ordering::SeqCst) {
            return Err(ThemeError::Persistence(
                "in-memory store is read-only".to_string(),
            ));
        }
        *self.saved.lock() = config.clone();
        self.save_count.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }
}
