//! Metadata records.
//!
//! A [`TypeRecord`] is the authoritative description of one registered type:
//! its properties, method overload tables, constructors, and base links.
//! Records (and everything hanging off them) are leaked on creation, so
//! every reference handed out is `&'static` and stays valid for the life of
//! the process — the engine exposes no teardown.
//!
//! Records are append-only: registration may add entries (under the interior
//! locks), but nothing published is ever changed or removed. Lookup goes
//! through small fixed-size hash-indexed caches embedded in the record;
//! entries re-verify their own hash on a hit, so a slot replaced mid-read
//! degrades to a slow-path lookup rather than a wrong answer.

pub mod field;
pub mod method;

pub use field::{FieldKind, FieldRecord};
pub use method::{MethodRecord, ParamSpec};

use std::any::TypeId;
use std::sync::atomic::{AtomicPtr, AtomicU64, Ordering};

use parking_lot::RwLock;
use smallvec::SmallVec;

use crate::ident;
use method::FactoryFn;

const INLINE_CACHE_SLOTS: usize = 16;

/// Entries that can vouch for the hash they were cached under.
trait HashKeyed {
    fn key_hash(&self) -> u64;
}

impl HashKeyed for FieldRecord {
    fn key_hash(&self) -> u64 {
        self.hash
    }
}

impl HashKeyed for MethodTable {
    fn key_hash(&self) -> u64 {
        self.hash
    }
}

struct CacheSlot<T> {
    hash: AtomicU64,
    entry: AtomicPtr<T>,
}

/// Fixed-size hash-indexed cache: power-of-two slots, one-step linear probe.
struct InlineCache<T> {
    slots: [CacheSlot<T>; INLINE_CACHE_SLOTS],
}

impl<T: HashKeyed + 'static> InlineCache<T> {
    fn new() -> Self {
        InlineCache {
            slots: std::array::from_fn(|_| CacheSlot {
                hash: AtomicU64::new(0),
                entry: AtomicPtr::new(std::ptr::null_mut()),
            }),
        }
    }

    fn find(&self, hash: u64) -> Option<&'static T> {
        let mask = INLINE_CACHE_SLOTS - 1;
        let idx = (hash as usize) & mask;
        for probe in [idx, (idx + 1) & mask] {
            let slot = &self.slots[probe];
            if slot.hash.load(Ordering::Acquire) == hash {
                let ptr = slot.entry.load(Ordering::Acquire);
                if !ptr.is_null() {
                    // Entries are leaked, so the pointer is always valid; the
                    // entry's own hash is authoritative against a slot that
                    // was replaced between the two loads.
                    let entry = unsafe { &*ptr };
                    if entry.key_hash() == hash {
                        return Some(entry);
                    }
                }
            }
        }
        None
    }

    fn insert(&self, hash: u64, entry: &'static T) {
        let mask = INLINE_CACHE_SLOTS - 1;
        let idx = (hash as usize) & mask;
        let primary = &self.slots[idx];
        let slot = if primary.entry.load(Ordering::Relaxed).is_null()
            || primary.hash.load(Ordering::Relaxed) == hash
        {
            primary
        } else {
            &self.slots[(idx + 1) & mask]
        };
        slot.entry
            .store(entry as *const T as *mut T, Ordering::Release);
        slot.hash.store(hash, Ordering::Release);
    }

    fn clear(&self) {
        for slot in &self.slots {
            slot.entry.store(std::ptr::null_mut(), Ordering::Release);
            slot.hash.store(0, Ordering::Release);
        }
    }
}

/// The overload set registered under one method name.
pub struct MethodTable {
    pub(crate) name: String,
    pub(crate) hash: u64,
    pub(crate) overloads: RwLock<SmallVec<[&'static MethodRecord; 2]>>,
}

impl MethodTable {
    fn new(name: &str, hash: u64) -> MethodTable {
        MethodTable {
            name: name.to_string(),
            hash,
            overloads: RwLock::new(SmallVec::new()),
        }
    }

    #[inline]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Resolve an overload by argument count; the first record registered
    /// with a given arity wins.
    pub fn by_arity(&self, arity: usize) -> Option<&'static MethodRecord> {
        self.overloads
            .read()
            .iter()
            .copied()
            .find(|m| m.arity() == arity)
    }

    pub fn has_arity(&self, arity: usize) -> bool {
        self.by_arity(arity).is_some()
    }

    pub fn overload_count(&self) -> usize {
        self.overloads.read().len()
    }

    /// Every overload's parameter list, rendered for mismatch errors.
    pub fn expected_signatures(&self) -> String {
        let overloads = self.overloads.read();
        let mut out = String::new();
        for (i, m) in overloads.iter().enumerate() {
            if i > 0 {
                out.push_str(" | ");
            }
            out.push_str(&m.param_signature());
        }
        out
    }

    pub(crate) fn push(&self, record: MethodRecord) {
        self.overloads.write().push(Box::leak(Box::new(record)));
    }
}

/// A registered constructor.
pub struct FactoryRecord {
    pub(crate) signature: String,
    pub(crate) params: SmallVec<[ParamSpec; 4]>,
    pub(crate) produce: FactoryFn,
}

impl FactoryRecord {
    #[inline]
    pub fn signature(&self) -> &str {
        &self.signature
    }

    #[inline]
    pub fn arity(&self) -> usize {
        self.params.len()
    }
}

/// Complete metadata for one registered type.
pub struct TypeRecord {
    name: String,
    hash: u64,
    size: usize,
    token: TypeId,
    fields: RwLock<Vec<&'static FieldRecord>>,
    methods: RwLock<Vec<&'static MethodTable>>,
    factories: RwLock<SmallVec<[&'static FactoryRecord; 2]>>,
    default_factory: RwLock<Option<&'static FactoryRecord>>,
    bases: RwLock<SmallVec<[TypeId; 4]>>,
    field_names: RwLock<Option<Vec<&'static str>>>,
    method_names: RwLock<Option<Vec<&'static str>>>,
    field_cache: InlineCache<FieldRecord>,
    method_cache: InlineCache<MethodTable>,
}

impl TypeRecord {
    pub(crate) fn new(name: String, size: usize, token: TypeId) -> TypeRecord {
        let hash = ident::name_hash(&name);
        TypeRecord {
            name,
            hash,
            size,
            token,
            fields: RwLock::new(Vec::new()),
            methods: RwLock::new(Vec::new()),
            factories: RwLock::new(SmallVec::new()),
            default_factory: RwLock::new(None),
            bases: RwLock::new(SmallVec::new()),
            field_names: RwLock::new(None),
            method_names: RwLock::new(None),
            field_cache: InlineCache::new(),
            method_cache: InlineCache::new(),
        }
    }

    #[inline]
    pub fn name(&self) -> &str {
        &self.name
    }

    #[inline]
    pub fn name_hash(&self) -> u64 {
        self.hash
    }

    #[inline]
    pub fn size(&self) -> usize {
        self.size
    }

    #[inline]
    pub fn token(&self) -> TypeId {
        self.token
    }

    // ---- fields ----

    pub fn find_field(&self, name: &str) -> Option<&'static FieldRecord> {
        self.find_field_hashed(ident::name_hash(name), name)
    }

    /// Lookup with a caller-precomputed hash; the name is still compared on
    /// the slow path to rule out collisions.
    pub fn find_field_hashed(&self, hash: u64, name: &str) -> Option<&'static FieldRecord> {
        if let Some(rec) = self.field_cache.find(hash) {
            return Some(rec);
        }
        let fields = self.fields.read();
        let rec = fields
            .iter()
            .copied()
            .find(|f| f.hash == hash && f.name == name)?;
        self.field_cache.insert(hash, rec);
        Some(rec)
    }

    pub fn has_field(&self, name: &str) -> bool {
        self.find_field(name).is_some()
    }

    /// Registered property names, registration order.
    pub fn field_names(&self) -> Vec<&'static str> {
        if let Some(names) = self.field_names.read().as_ref() {
            return names.clone();
        }
        let names: Vec<&'static str> = self
            .fields
            .read()
            .iter()
            .map(|f| f.name.as_str())
            .collect();
        *self.field_names.write() = Some(names.clone());
        names
    }

    pub(crate) fn field_names_owned(&self) -> Vec<String> {
        self.field_names().iter().map(|n| n.to_string()).collect()
    }

    pub fn field_count(&self) -> usize {
        self.fields.read().len()
    }

    pub(crate) fn fields_snapshot(&self) -> Vec<&'static FieldRecord> {
        self.fields.read().clone()
    }

    pub(crate) fn push_field(&self, record: FieldRecord) {
        let mut fields = self.fields.write();
        if fields.iter().any(|f| f.name == record.name) {
            return;
        }
        fields.push(Box::leak(Box::new(record)));
        drop(fields);
        *self.field_names.write() = None;
        self.field_cache.clear();
    }

    // ---- methods ----

    pub fn find_method(&self, name: &str) -> Option<&'static MethodTable> {
        self.find_method_hashed(ident::name_hash(name), name)
    }

    pub fn find_method_hashed(&self, hash: u64, name: &str) -> Option<&'static MethodTable> {
        if let Some(table) = self.method_cache.find(hash) {
            return Some(table);
        }
        let methods = self.methods.read();
        let table = methods
            .iter()
            .copied()
            .find(|t| t.hash == hash && t.name == name)?;
        self.method_cache.insert(hash, table);
        Some(table)
    }

    pub fn has_method(&self, name: &str) -> bool {
        self.find_method(name).is_some()
    }

    pub fn method_names(&self) -> Vec<&'static str> {
        if let Some(names) = self.method_names.read().as_ref() {
            return names.clone();
        }
        let names: Vec<&'static str> = self
            .methods
            .read()
            .iter()
            .map(|t| t.name.as_str())
            .collect();
        *self.method_names.write() = Some(names.clone());
        names
    }

    pub(crate) fn method_names_owned(&self) -> Vec<String> {
        self.method_names().iter().map(|n| n.to_string()).collect()
    }

    pub(crate) fn methods_snapshot(&self) -> Vec<&'static MethodTable> {
        self.methods.read().clone()
    }

    pub(crate) fn push_method(&self, record: MethodRecord) {
        let mut methods = self.methods.write();
        if let Some(table) = methods
            .iter()
            .copied()
            .find(|t| t.hash == record.hash && t.name == record.name)
        {
            drop(methods);
            table.push(record);
            return;
        }
        let table: &'static MethodTable =
            Box::leak(Box::new(MethodTable::new(&record.name, record.hash)));
        table.push(record);
        methods.push(table);
        drop(methods);
        *self.method_names.write() = None;
        self.method_cache.clear();
    }

    // ---- factories ----

    pub(crate) fn push_factory(&self, record: FactoryRecord) {
        let mut factories = self.factories.write();
        if factories.iter().any(|f| f.signature == record.signature) {
            return;
        }
        let record: &'static FactoryRecord = Box::leak(Box::new(record));
        factories.push(record);
        drop(factories);
        if record.arity() == 0 {
            let mut default = self.default_factory.write();
            if default.is_none() {
                *default = Some(record);
            }
        }
    }

    pub fn default_factory(&self) -> Option<&'static FactoryRecord> {
        *self.default_factory.read()
    }

    /// First registered constructor accepting `arity` arguments.
    pub fn factory_by_arity(&self, arity: usize) -> Option<&'static FactoryRecord> {
        self.factories
            .read()
            .iter()
            .copied()
            .find(|f| f.arity() == arity)
    }

    // ---- bases ----

    pub(crate) fn push_base(&self, token: TypeId) {
        let mut bases = self.bases.write();
        if !bases.contains(&token) {
            bases.push(token);
        }
    }

    /// Tokens of every merged base, transitively.
    pub fn base_tokens(&self) -> Vec<TypeId> {
        self.bases.read().to_vec()
    }

    pub fn has_base(&self, token: TypeId) -> bool {
        self.bases.read().contains(&token)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::variant::Variant;

    fn dummy_field(name: &str, offset: usize) -> FieldRecord {
        FieldRecord::for_value::<i32>(name, offset)
    }

    #[test]
    fn field_lookup_populates_cache() {
        let rec = TypeRecord::new("CacheProbe".into(), 8, TypeId::of::<()>());
        rec.push_field(dummy_field("a", 0));
        rec.push_field(dummy_field("b", 4));

        // First lookup goes through the slow path, second hits the cache.
        let first = rec.find_field("a").unwrap();
        let second = rec.find_field("a").unwrap();
        assert!(std::ptr::eq(first, second));
        assert_eq!(first.offset(), 0);
    }

    #[test]
    fn duplicate_field_names_are_ignored() {
        let rec = TypeRecord::new("Dup".into(), 8, TypeId::of::<()>());
        rec.push_field(dummy_field("a", 0));
        rec.push_field(dummy_field("a", 4));
        assert_eq!(rec.field_count(), 1);
        assert_eq!(rec.find_field("a").unwrap().offset(), 0);
    }

    #[test]
    fn registration_invalidates_name_cache() {
        let rec = TypeRecord::new("Names".into(), 8, TypeId::of::<()>());
        rec.push_field(dummy_field("a", 0));
        assert_eq!(rec.field_names(), vec!["a"]);
        rec.push_field(dummy_field("b", 4));
        assert_eq!(rec.field_names(), vec!["a", "b"]);
    }

    #[test]
    fn overloads_resolve_by_arity() {
        use smallvec::smallvec;
        use std::sync::Arc;

        let rec = TypeRecord::new("Overloads".into(), 0, TypeId::of::<()>());
        let nullary = MethodRecord::new(
            "m",
            smallvec![],
            TypeId::of::<i32>(),
            "i32".into(),
            true,
            Arc::new(|_, _| Ok(Variant::of(1i32))),
        );
        let unary = MethodRecord::new(
            "m",
            smallvec![ParamSpec::of::<i32>()],
            TypeId::of::<i32>(),
            "i32".into(),
            true,
            Arc::new(|_, _| Ok(Variant::of(2i32))),
        );
        rec.push_method(nullary);
        rec.push_method(unary);

        let table = rec.find_method("m").unwrap();
        assert_eq!(table.overload_count(), 2);
        assert_eq!(table.by_arity(0).unwrap().arity(), 0);
        assert_eq!(table.by_arity(1).unwrap().arity(), 1);
        assert!(table.by_arity(2).is_none());
    }
}
