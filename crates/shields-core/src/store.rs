//! Lazy filter stores
//!
//! Each dataset gets one store: an owning slot filled at most once under its
//! own load lock. Once filled, reads go straight to the `OnceLock` without
//! taking the lock. A failed load leaves the slot empty so a later call can
//! retry (e.g. after the data file shows up).

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, OnceLock};

use log::{debug, info, warn};
use parking_lot::Mutex;

use crate::dataset::{read_dataset, DatasetKind, DatasetResolver};
use crate::engine::FilterEngine;
use crate::error::{BlockerError, Result};

// =============================================================================
// Lazy Slot
// =============================================================================

#[derive(Debug)]
struct LazySlot<T> {
    value: OnceLock<T>,
    load_lock: Mutex<()>,
}

impl<T> LazySlot<T> {
    fn new() -> Self {
        Self {
            value: OnceLock::new(),
            load_lock: Mutex::new(()),
        }
    }

    fn filled(value: T) -> Self {
        let slot = Self::new();
        let _ = slot.value.set(value);
        slot
    }

    fn get(&self) -> Option<&T> {
        self.value.get()
    }

    /// Double-checked load: exactly one caller runs `load`, the others wait
    /// on the lock and then observe its result.
    fn get_or_try_load(&self, load: impl FnOnce() -> Result<T>) -> Result<&T> {
        if let Some(value) = self.value.get() {
            return Ok(value);
        }

        let _guard = self.load_lock.lock();
        if let Some(value) = self.value.get() {
            return Ok(value);
        }

        let value = load()?;
        Ok(self.value.get_or_init(|| value))
    }

    fn clear(&mut self) {
        self.value.take();
    }
}

/// Warn on the first failure; repeats while the dataset stays unavailable are
/// logged at debug so a missing file does not warn on every request.
fn log_load_failure(kind: DatasetKind, failures: &AtomicUsize, error: &BlockerError) {
    if failures.fetch_add(1, Ordering::Relaxed) == 0 {
        warn!("Failed to load {} dataset: {}", kind, error);
    } else {
        debug!("{} dataset still unavailable: {}", kind, error);
    }
}

fn load_engine<E: FilterEngine>(kind: DatasetKind, bytes: &[u8]) -> Result<E> {
    let mut engine = E::default();
    if !engine.deserialize(bytes) {
        return Err(BlockerError::Deserialize {
            name: kind.to_string(),
        });
    }
    Ok(engine)
}

// =============================================================================
// Filter Store (one engine per dataset)
// =============================================================================

pub struct FilterStore<E> {
    kind: DatasetKind,
    resolver: Arc<dyn DatasetResolver>,
    slot: LazySlot<E>,
    failures: AtomicUsize,
}

impl<E: FilterEngine> FilterStore<E> {
    pub fn new(kind: DatasetKind, resolver: Arc<dyn DatasetResolver>) -> Self {
        Self {
            kind,
            resolver,
            slot: LazySlot::new(),
            failures: AtomicUsize::new(0),
        }
    }

    /// Store that starts out with an already-built engine.
    pub fn with_engine(kind: DatasetKind, resolver: Arc<dyn DatasetResolver>, engine: E) -> Self {
        Self {
            kind,
            resolver,
            slot: LazySlot::filled(engine),
            failures: AtomicUsize::new(0),
        }
    }

    pub fn kind(&self) -> DatasetKind {
        self.kind
    }

    /// Load the engine on first use. Returns false if the dataset is missing,
    /// empty or rejected; the next call tries again.
    pub fn ensure_loaded(&self) -> bool {
        self.engine().is_some()
    }

    /// The loaded engine, loading it first if needed.
    pub fn engine(&self) -> Option<&E> {
        match self.slot.get_or_try_load(|| self.load()) {
            Ok(engine) => Some(engine),
            Err(e) => {
                log_load_failure(self.kind, &self.failures, &e);
                None
            }
        }
    }

    pub fn is_loaded(&self) -> bool {
        self.slot.get().is_some()
    }

    /// Drop the loaded engine; the next call reloads from disk.
    /// Failed load attempts since the last successful load or unload.
    pub fn load_failures(&self) -> usize {
        self.failures.load(Ordering::Relaxed)
    }

    pub fn unload(&mut self) {
        self.slot.clear();
        self.failures.store(0, Ordering::Relaxed);
    }

    fn load(&self) -> Result<E> {
        let files = self.resolver.resolve(self.kind)?;
        let path = files.first().ok_or_else(|| BlockerError::DatasetUnavailable {
            name: self.kind.to_string(),
        })?;

        let bytes = read_dataset(path)?;
        let engine = load_engine(self.kind, &bytes)?;
        info!(
            "Loaded {} dataset from '{}' ({} bytes)",
            self.kind,
            path.display(),
            bytes.len()
        );
        self.failures.store(0, Ordering::Relaxed);
        Ok(engine)
    }
}

// =============================================================================
// Regional Filter Store (one engine per resolved blob)
// =============================================================================

pub struct RegionalFilterStore<E> {
    kind: DatasetKind,
    resolver: Arc<dyn DatasetResolver>,
    slot: LazySlot<Vec<E>>,
    failures: AtomicUsize,
}

impl<E: FilterEngine> RegionalFilterStore<E> {
    pub fn new(kind: DatasetKind, resolver: Arc<dyn DatasetResolver>) -> Self {
        Self {
            kind,
            resolver,
            slot: LazySlot::new(),
            failures: AtomicUsize::new(0),
        }
    }

    pub fn ensure_loaded(&self) -> bool {
        !self.engines().is_empty()
    }

    /// Loaded engines in load order; empty if none could be loaded.
    pub fn engines(&self) -> &[E] {
        match self.slot.get_or_try_load(|| self.load()) {
            Ok(engines) => engines.as_slice(),
            Err(e) => {
                log_load_failure(self.kind, &self.failures, &e);
                &[]
            }
        }
    }

    pub fn is_loaded(&self) -> bool {
        self.slot.get().is_some()
    }

    /// Failed load attempts since the last successful load or unload.
    pub fn load_failures(&self) -> usize {
        self.failures.load(Ordering::Relaxed)
    }

    pub fn unload(&mut self) {
        self.slot.clear();
        self.failures.store(0, Ordering::Relaxed);
    }

    /// Blobs that fail are skipped; the set counts as loaded once any
    /// region loads.
    fn load(&self) -> Result<Vec<E>> {
        let files = self.resolver.resolve(self.kind)?;
        let mut engines = Vec::with_capacity(files.len());

        for path in &files {
            let loaded = read_dataset(path).and_then(|bytes| load_engine::<E>(self.kind, &bytes));
            match loaded {
                Ok(engine) => {
                    info!("Loaded {} dataset from '{}'", self.kind, path.display());
                    engines.push(engine);
                }
                Err(e) => warn!("Skipping {} dataset '{}': {}", self.kind, path.display(), e),
            }
        }

        if engines.is_empty() {
            return Err(BlockerError::DatasetUnavailable {
                name: self.kind.to_string(),
            });
        }

        self.failures.store(0, Ordering::Relaxed);
        Ok(engines)
    }
}
