//! Holder for the active [`Settings`] snapshot.
//!
//! Readers get an `Arc` to a complete snapshot; writers swap the pointer.
//! Never call back into the host while holding the write lock: the host may
//! invoke a plugin hook that needs the read lock.

use std::sync::Arc;

use parking_lot::RwLock;

use crate::settings::Settings;

#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("set called with the currently installed settings snapshot")]
    SameSnapshot,
}

#[derive(Clone, Default)]
pub struct ConfigStore {
    current: Arc<RwLock<Arc<Settings>>>,
}

impl ConfigStore {
    pub fn new(settings: Settings) -> Self {
        Self {
            current: Arc::new(RwLock::new(Arc::new(settings))),
        }
    }

    /// The active snapshot. Defaults until the host has supplied settings.
    pub fn get(&self) -> Arc<Settings> {
        Arc::clone(&self.current.read())
    }

    /// Install a new snapshot.
    ///
    /// Handing back the snapshot that is already installed means someone
    /// mutated shared settings instead of building a new value, so it is
    /// rejected.
    pub fn set(&self, settings: Arc<Settings>) -> Result<(), StoreError> {
        let mut current = self.current.write();
        if Arc::ptr_eq(&current, &settings) {
            tracing::error!("refusing to reinstall the active settings snapshot");
            return Err(StoreError::SameSnapshot);
        }
        *current = settings;
        Ok(())
    }
}
