//! Kernel registry: signature → materialized kernel, append-only.
//!
//! The registry is the single materialization point. A lookup that
//! misses takes the write lock, re-checks, and only then runs the
//! generator, so each signature is generated at most once no matter
//! how many threads race on it. Failed generations leave no trace;
//! the next request for the same signature tries again.
//!
//! Entries never leave the map except through [`KernelRegistry::clear`],
//! and handles are reference-counted, so a handle obtained before a
//! clear stays callable.

use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, RwLock};

use crate::descriptor::{Descriptor, Signature};
use crate::generator::{GenerateError, GeneratedKernel, KernelHandle};

/// How an entry got into the registry.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum KernelOrigin {
    /// Materialized by the generator on a cache miss.
    Generated,
    /// Pre-seeded by the embedder.
    Static,
}

/// One registered kernel with its descriptor and metadata.
#[derive(Debug)]
pub struct KernelEntry {
    pub descriptor: Descriptor,
    pub kernel: KernelHandle,
    pub code_size: usize,
    pub flops: u64,
    pub origin: KernelOrigin,
}

/// Registry statistics, diagnostics only.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct RegistryInfo {
    pub entries: usize,
    pub static_entries: usize,
    pub generated_entries: usize,
    pub code_bytes: usize,
    pub hits: u64,
    pub misses: u64,
}

#[derive(Default)]
pub struct KernelRegistry {
    map: RwLock<HashMap<Signature, Arc<KernelEntry>>>,
    hits: AtomicU64,
    misses: AtomicU64,
}

impl KernelRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Look up a signature without materializing anything.
    pub fn lookup(&self, sig: &Signature) -> Option<Arc<KernelEntry>> {
        let map = self.map.read().unwrap_or_else(|e| e.into_inner());
        map.get(sig).cloned()
    }

    /// Return the entry for `desc`, running `generate` if the signature
    /// is not registered yet.
    ///
    /// The write lock spans the re-check, the generator call and the
    /// insert, so concurrent requests for a new signature invoke the
    /// generator exactly once and all receive the same entry.
    pub fn lookup_or_create<F>(
        &self,
        desc: &Descriptor,
        generate: F,
    ) -> Result<Arc<KernelEntry>, GenerateError>
    where
        F: FnOnce() -> Result<GeneratedKernel, GenerateError>,
    {
        let sig = desc.signature();
        {
            let map = self.map.read().unwrap_or_else(|e| e.into_inner());
            if let Some(entry) = map.get(&sig) {
                self.hits.fetch_add(1, Ordering::Relaxed);
                return Ok(Arc::clone(entry));
            }
        }
        self.misses.fetch_add(1, Ordering::Relaxed);

        let mut map = self.map.write().unwrap_or_else(|e| e.into_inner());
        // Another thread may have won the race between the locks.
        if let Some(entry) = map.get(&sig) {
            return Ok(Arc::clone(entry));
        }
        let generated = generate()?;
        log::debug!(
            "registered kernel sig={:02x?} code_size={}",
            &sig.as_bytes()[..8],
            generated.code_size
        );
        let entry = Arc::new(KernelEntry {
            descriptor: *desc,
            kernel: generated.kernel,
            code_size: generated.code_size,
            flops: generated.flops,
            origin: KernelOrigin::Generated,
        });
        map.insert(sig, Arc::clone(&entry));
        Ok(entry)
    }

    /// Pre-seed an entry. Returns the registered entry; an existing
    /// entry for the same signature is kept and returned unchanged.
    pub fn register_static(
        &self,
        desc: &Descriptor,
        kernel: KernelHandle,
        code_size: usize,
        flops: u64,
    ) -> Arc<KernelEntry> {
        let sig = desc.signature();
        let mut map = self.map.write().unwrap_or_else(|e| e.into_inner());
        if let Some(existing) = map.get(&sig) {
            log::warn!("static registration ignored, signature already present");
            return Arc::clone(existing);
        }
        let entry = Arc::new(KernelEntry {
            descriptor: *desc,
            kernel,
            code_size,
            flops,
            origin: KernelOrigin::Static,
        });
        map.insert(sig, Arc::clone(&entry));
        entry
    }

    /// Drop every entry and reset the counters. Handles already handed
    /// out stay valid.
    pub fn clear(&self) {
        let mut map = self.map.write().unwrap_or_else(|e| e.into_inner());
        map.clear();
        self.hits.store(0, Ordering::Relaxed);
        self.misses.store(0, Ordering::Relaxed);
    }

    pub fn info(&self) -> RegistryInfo {
        let map = self.map.read().unwrap_or_else(|e| e.into_inner());
        let static_entries = map
            .values()
            .filter(|e| e.origin == KernelOrigin::Static)
            .count();
        RegistryInfo {
            entries: map.len(),
            static_entries,
            generated_entries: map.len() - static_entries,
            code_bytes: map.values().map(|e| e.code_size).sum(),
            hits: self.hits.load(Ordering::Relaxed),
            misses: self.misses.load(Ordering::Relaxed),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::descriptor::{encode_unary, UnaryRequest};
    use crate::eltwise::UnaryKernel;
    use crate::types::{Datatype, UnaryFlags, UnaryKind};

    fn descriptor(m: u32) -> Descriptor {
        encode_unary(&UnaryRequest {
            m,
            n: 1,
            ldi: m,
            ldo: m,
            in_type: Datatype::F32,
            comp_type: Datatype::F32,
            out_type: Datatype::F32,
            flags: UnaryFlags::default(),
            kind: UnaryKind::Identity,
        })
    }

    fn noop_kernel() -> GeneratedKernel {
        GeneratedKernel {
            kernel: KernelHandle::Unary(UnaryKernel::new(|_| {})),
            code_size: 128,
            flops: 1,
        }
    }

    #[test]
    fn second_lookup_hits_without_generating() {
        let registry = KernelRegistry::new();
        let desc = descriptor(8);
        let mut calls = 0;
        for _ in 0..3 {
            registry
                .lookup_or_create(&desc, || {
                    calls += 1;
                    Ok(noop_kernel())
                })
                .unwrap();
        }
        assert_eq!(calls, 1);
        let info = registry.info();
        assert_eq!(info.entries, 1);
        assert_eq!(info.misses, 1);
        assert_eq!(info.hits, 2);
        assert_eq!(info.code_bytes, 128);
    }

    #[test]
    fn failure_leaves_no_entry() {
        let registry = KernelRegistry::new();
        let desc = descriptor(8);
        for _ in 0..2 {
            let r = registry.lookup_or_create(&desc, || {
                Err(GenerateError::Unsupported("nope".into()))
            });
            assert!(r.is_err());
        }
        assert_eq!(registry.info().entries, 0);
        // Both attempts were misses that re-ran the generator.
        assert_eq!(registry.info().misses, 2);
    }

    #[test]
    fn static_registration_wins_over_generation() {
        let registry = KernelRegistry::new();
        let desc = descriptor(8);
        let seeded = registry.register_static(
            &desc,
            KernelHandle::Unary(UnaryKernel::new(|_| {})),
            0,
            0,
        );
        let looked_up = registry
            .lookup_or_create(&desc, || panic!("generator must not run"))
            .unwrap();
        assert!(Arc::ptr_eq(&seeded, &looked_up));
        assert_eq!(looked_up.origin, KernelOrigin::Static);
        assert_eq!(registry.info().static_entries, 1);
    }

    #[test]
    fn duplicate_static_registration_keeps_first() {
        let registry = KernelRegistry::new();
        let desc = descriptor(8);
        let first =
            registry.register_static(&desc, KernelHandle::Unary(UnaryKernel::new(|_| {})), 7, 0);
        let second =
            registry.register_static(&desc, KernelHandle::Unary(UnaryKernel::new(|_| {})), 9, 0);
        assert!(Arc::ptr_eq(&first, &second));
        assert_eq!(registry.info().code_bytes, 7);
    }

    #[test]
    fn clear_resets_entries_and_counters() {
        let registry = KernelRegistry::new();
        let desc = descriptor(8);
        let entry = registry.lookup_or_create(&desc, || Ok(noop_kernel())).unwrap();
        registry.clear();
        assert_eq!(registry.info(), RegistryInfo::default());
        // Handle outlives the clear.
        assert!(matches!(entry.kernel, KernelHandle::Unary(_)));
        assert!(registry.lookup(&desc.signature()).is_none());
    }

    #[test]
    fn distinct_descriptors_distinct_entries() {
        let registry = KernelRegistry::new();
        registry
            .lookup_or_create(&descriptor(8), || Ok(noop_kernel()))
            .unwrap();
        registry
            .lookup_or_create(&descriptor(9), || Ok(noop_kernel()))
            .unwrap();
        assert_eq!(registry.info().entries, 2);
    }
}
