//! Content-addressed geometry cache.
//!
//! Maps [`Fingerprint`]s to built meshes. One program run's accesses are
//! strictly ordered, but a host may share a cache across concurrent runs,
//! so the map is a lock-free `DashMap`. There is no eviction during a run;
//! the cache is dropped at program end unless the host retains it.
//!
//! A failed or cancelled build inserts nothing, so an aborted sub-build
//! can never leave a partial entry behind.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use ahash::RandomState;
use dashmap::DashMap;
use parking_lot::Mutex;

use crate::fingerprint::Fingerprint;
use crate::mesh::Mesh;

/// Counters for cache behaviour, used by tests to assert sharing.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct CacheStats {
    /// Lookups that found an entry.
    pub hits: usize,
    /// Lookups that had to build.
    pub misses: usize,
    /// Builds that completed and were inserted.
    pub inserts: usize,
}

/// A concurrent fingerprint-to-mesh map.
#[derive(Debug, Default)]
pub struct GeometryCache {
    map: DashMap<Fingerprint, Arc<Mesh>, RandomState>,
    hits: AtomicUsize,
    misses: AtomicUsize,
    inserts: AtomicUsize,
    /// Serialises builds of the same fingerprint so concurrent runs do
    /// not duplicate work. Builds of different fingerprints only contend
    /// on the brief map access.
    build_lock: Mutex<()>,
}

impl GeometryCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of cached sub-geometries.
    pub fn len(&self) -> usize {
        self.map.len()
    }

    pub fn is_empty(&self) -> bool {
        self.map.is_empty()
    }

    /// Fetch an entry without counting a miss.
    pub fn get(&self, fingerprint: Fingerprint) -> Option<Arc<Mesh>> {
        self.map.get(&fingerprint).map(|entry| entry.clone())
    }

    /// Look up `fingerprint`, building and inserting on a miss.
    ///
    /// The build closure's error (including cancellation) propagates and
    /// leaves the cache untouched.
    pub fn get_or_try_build<E>(
        &self,
        fingerprint: Fingerprint,
        build: impl FnOnce() -> Result<Mesh, E>,
    ) -> Result<Arc<Mesh>, E> {
        if let Some(mesh) = self.map.get(&fingerprint) {
            self.hits.fetch_add(1, Ordering::Relaxed);
            return Ok(mesh.clone());
        }
        self.misses.fetch_add(1, Ordering::Relaxed);

        let _guard = self.build_lock.lock();
        // Another run may have finished the same build while we waited.
        if let Some(mesh) = self.map.get(&fingerprint) {
            return Ok(mesh.clone());
        }
        let mesh = Arc::new(build()?);
        self.inserts.fetch_add(1, Ordering::Relaxed);
        self.map.insert(fingerprint, mesh.clone());
        Ok(mesh)
    }

    /// Current counters.
    pub fn stats(&self) -> CacheStats {
        CacheStats {
            hits: self.hits.load(Ordering::Relaxed),
            misses: self.misses.load(Ordering::Relaxed),
            inserts: self.inserts.load(Ordering::Relaxed),
        }
    }
}
