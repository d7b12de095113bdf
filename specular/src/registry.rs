//! Process-wide type manager.
//!
//! A single registry owns every [`TypeRecord`] and indexes it three ways:
//! by short name (primary), by name hash (collision-checked against the
//! stored name), and by [`TypeId`] (the fastest path). A reader-writer lock
//! guards the indexes: registration takes the writer side, queries the
//! reader side. In front of the lock sits a small per-thread inline cache
//! (power-of-two slots, one-step linear probe) that answers repeated
//! lookups without locking; it never needs invalidation because records are
//! append-only and their addresses stable.
//!
//! The intended discipline is to perform all registration during
//! single-threaded program initialisation; afterwards the registry is
//! effectively read-only and every query path is lock-free on a cache hit.

use std::any::TypeId;
use std::cell::RefCell;
use std::collections::HashMap;

use fxhash::FxHashMap;
use log::{debug, info};
use once_cell::sync::Lazy;
use parking_lot::RwLock;

use crate::ident::{name_hash, token_hash};
use crate::meta::TypeRecord;

static MANAGER: Lazy<TypeManager> = Lazy::new(TypeManager::new);

/// The global type manager.
#[inline]
pub fn registry() -> &'static TypeManager {
    &MANAGER
}

struct Indexes {
    by_name: HashMap<String, &'static TypeRecord>,
    by_hash: FxHashMap<u64, &'static TypeRecord>,
    by_token: FxHashMap<TypeId, &'static TypeRecord>,
}

/// Thread-safe storage and lookup for all registered type records.
pub struct TypeManager {
    indexes: RwLock<Indexes>,
}

impl TypeManager {
    fn new() -> TypeManager {
        TypeManager {
            indexes: RwLock::new(Indexes {
                by_name: HashMap::new(),
                by_hash: FxHashMap::default(),
                by_token: FxHashMap::default(),
            }),
        }
    }

    /// Register a type under `name`, or adopt the existing record.
    ///
    /// Idempotent: the boolean is true only when the record was newly
    /// created. Subsequent registrations of the same name return the same
    /// record pointer, which is what allows registration of one type to be
    /// split across call sites.
    pub(crate) fn register(
        &self,
        name: String,
        size: usize,
        token: TypeId,
    ) -> (&'static TypeRecord, bool) {
        let hash = name_hash(&name);
        let mut indexes = self.indexes.write();
        if let Some(&existing) = indexes.by_name.get(name.as_str()) {
            return (existing, false);
        }

        let record: &'static TypeRecord =
            Box::leak(Box::new(TypeRecord::new(name.clone(), size, token)));
        if let Some(previous) = indexes.by_hash.insert(hash, record) {
            // The hash index keeps the newest entry; lookups verify the name
            // and fall back to the primary index, so the older type stays
            // reachable.
            info!(
                "name hash collision on 0x{:016x}: '{}' and '{}'",
                hash,
                previous.name(),
                record.name()
            );
        }
        indexes.by_name.insert(name, record);
        indexes.by_token.insert(token, record);
        debug!("registered type '{}' ({} bytes)", record.name(), size);
        (record, true)
    }

    /// Look a type up by its short name.
    pub fn lookup(&self, name: &str) -> Option<&'static TypeRecord> {
        self.lookup_hashed(name_hash(name), name)
    }

    /// Look a type up by a caller-precomputed name hash.
    ///
    /// The name is still required: it verifies the hash-index entry against
    /// collisions and feeds the fallback name lookup.
    pub fn lookup_hashed(&self, hash: u64, name: &str) -> Option<&'static TypeRecord> {
        if let Some(record) = tls_find(&NAME_CACHE, hash) {
            if record.name() == name {
                return Some(record);
            }
        }

        let indexes = self.indexes.read();
        if let Some(record) = indexes.by_hash.get(&hash).copied() {
            if record.name() == name {
                tls_insert(&NAME_CACHE, hash, record);
                return Some(record);
            }
        }
        // Hash collision: the colliding name lives only in the primary index.
        let record = indexes.by_name.get(name).copied()?;
        tls_insert(&NAME_CACHE, hash, record);
        Some(record)
    }

    /// Look a type up by its compile-time token. Fastest path.
    pub fn lookup_token(&self, token: TypeId) -> Option<&'static TypeRecord> {
        let hash = token_hash(token);
        if let Some(record) = tls_find(&TOKEN_CACHE, hash) {
            if record.token() == token {
                return Some(record);
            }
        }
        let record = self.indexes.read().by_token.get(&token).copied()?;
        tls_insert(&TOKEN_CACHE, hash, record);
        Some(record)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.lookup(name).is_some()
    }

    pub fn contains_token(&self, token: TypeId) -> bool {
        self.lookup_token(token).is_some()
    }

    /// Number of registered types.
    pub fn len(&self) -> usize {
        self.indexes.read().by_name.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Names of every registered type (unordered snapshot).
    pub fn type_names(&self) -> Vec<String> {
        self.indexes.read().by_name.keys().cloned().collect()
    }

    /// Drop this thread's inline lookup caches. Only useful in tests that
    /// want to measure the cold path.
    pub fn clear_thread_cache(&self) {
        NAME_CACHE.with(|cache| *cache.borrow_mut() = [TlsSlot::EMPTY; TLS_SLOTS]);
        TOKEN_CACHE.with(|cache| *cache.borrow_mut() = [TlsSlot::EMPTY; TLS_SLOTS]);
    }
}

const TLS_SLOTS: usize = 16;

#[derive(Clone, Copy)]
struct TlsSlot {
    hash: u64,
    record: Option<&'static TypeRecord>,
}

impl TlsSlot {
    const EMPTY: TlsSlot = TlsSlot {
        hash: 0,
        record: None,
    };
}

type TlsCache = RefCell<[TlsSlot; TLS_SLOTS]>;

thread_local! {
    static NAME_CACHE: TlsCache = const { RefCell::new([TlsSlot::EMPTY; TLS_SLOTS]) };
    static TOKEN_CACHE: TlsCache = const { RefCell::new([TlsSlot::EMPTY; TLS_SLOTS]) };
}

fn tls_find(cache: &'static std::thread::LocalKey<TlsCache>, hash: u64) -> Option<&'static TypeRecord> {
    cache.with(|cache| {
        let slots = cache.borrow();
        let mask = TLS_SLOTS - 1;
        let idx = (hash as usize) & mask;
        for probe in [idx, (idx + 1) & mask] {
            let slot = slots[probe];
            if slot.hash == hash {
                if let Some(record) = slot.record {
                    return Some(record);
                }
            }
        }
        None
    })
}

fn tls_insert(cache: &'static std::thread::LocalKey<TlsCache>, hash: u64, record: &'static TypeRecord) {
    cache.with(|cache| {
        let mut slots = cache.borrow_mut();
        let mask = TLS_SLOTS - 1;
        let idx = (hash as usize) & mask;
        let target = if slots[idx].record.is_none() || slots[idx].hash == hash {
            idx
        } else {
            (idx + 1) & mask
        };
        slots[target] = TlsSlot {
            hash,
            record: Some(record),
        };
    })
}
