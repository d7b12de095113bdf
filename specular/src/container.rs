//! Container reflection adapters.
//!
//! Field values classified as sequential or associative carry an erased
//! operations table next to their offset, so a member declared as
//! `Vec<i32>` or `HashMap<String, f32>` can be sized, iterated, and
//! mutated through reflection without the caller naming the container
//! type. The shape requirements are expressed as the [`Sequence`] and
//! [`MapLike`] traits; implementations are provided for the standard
//! containers plus [`SmallVec`].

use std::any::TypeId;
use std::collections::{BTreeMap, BTreeSet, HashMap, HashSet, VecDeque};
use std::hash::Hash;
use std::marker::PhantomData;

use smallvec::SmallVec;

use crate::bound::BoundObject;
use crate::error::{ReflectError, ReflectResult};
use crate::meta::FieldKind;
use crate::reflect::Reflect;
use crate::registry::registry;
use crate::variant::Variant;

/// Shape of a sequential container: ordered elements, index access,
/// growth at the back.
pub trait Sequence: 'static {
    type Elem: Clone + 'static;

    fn seq_len(&self) -> usize;
    fn seq_clear(&mut self);
    fn seq_get(&self, index: usize) -> Option<&Self::Elem>;
    fn seq_get_mut(&mut self, index: usize) -> Option<&mut Self::Elem>;
    fn seq_push(&mut self, value: Self::Elem);
    fn seq_pop(&mut self) -> bool;
}

/// Shape of an associative container. Set-like containers expose their
/// key as the value as well and set [`MapLike::SET_LIKE`].
pub trait MapLike: 'static {
    type Key: Clone + 'static;
    type Value: Clone + 'static;
    const SET_LIKE: bool = false;

    fn map_len(&self) -> usize;
    fn map_clear(&mut self);
    fn map_get(&self, key: &Self::Key) -> Option<&Self::Value>;
    fn map_contains(&self, key: &Self::Key) -> bool;
    fn map_insert(&mut self, key: Self::Key, value: Self::Value);
    fn map_remove(&mut self, key: &Self::Key) -> bool;
    fn map_visit(&self, f: &mut dyn FnMut(&Self::Key, &Self::Value));
}

impl<E: Clone + 'static> Sequence for Vec<E> {
    type Elem = E;

    fn seq_len(&self) -> usize {
        self.len()
    }
    fn seq_clear(&mut self) {
        self.clear()
    }
    fn seq_get(&self, index: usize) -> Option<&E> {
        self.as_slice().get(index)
    }
    fn seq_get_mut(&mut self, index: usize) -> Option<&mut E> {
        self.as_mut_slice().get_mut(index)
    }
    fn seq_push(&mut self, value: E) {
        self.push(value)
    }
    fn seq_pop(&mut self) -> bool {
        self.pop().is_some()
    }
}

impl<E: Clone + 'static> Sequence for VecDeque<E> {
    type Elem = E;

    fn seq_len(&self) -> usize {
        self.len()
    }
    fn seq_clear(&mut self) {
        self.clear()
    }
    fn seq_get(&self, index: usize) -> Option<&E> {
        self.get(index)
    }
    fn seq_get_mut(&mut self, index: usize) -> Option<&mut E> {
        self.get_mut(index)
    }
    fn seq_push(&mut self, value: E) {
        self.push_back(value)
    }
    fn seq_pop(&mut self) -> bool {
        self.pop_back().is_some()
    }
}

impl<A> Sequence for SmallVec<A>
where
    A: smallvec::Array + 'static,
    A::Item: Clone + 'static,
{
    type Elem = A::Item;

    fn seq_len(&self) -> usize {
        self.len()
    }
    fn seq_clear(&mut self) {
        self.clear()
    }
    fn seq_get(&self, index: usize) -> Option<&A::Item> {
        self.as_slice().get(index)
    }
    fn seq_get_mut(&mut self, index: usize) -> Option<&mut A::Item> {
        self.as_mut_slice().get_mut(index)
    }
    fn seq_push(&mut self, value: A::Item) {
        self.push(value)
    }
    fn seq_pop(&mut self) -> bool {
        self.pop().is_some()
    }
}

impl<K: Clone + Eq + Hash + 'static, V: Clone + 'static> MapLike for HashMap<K, V> {
    type Key = K;
    type Value = V;

    fn map_len(&self) -> usize {
        self.len()
    }
    fn map_clear(&mut self) {
        self.clear()
    }
    fn map_get(&self, key: &K) -> Option<&V> {
        self.get(key)
    }
    fn map_contains(&self, key: &K) -> bool {
        self.contains_key(key)
    }
    fn map_insert(&mut self, key: K, value: V) {
        self.insert(key, value);
    }
    fn map_remove(&mut self, key: &K) -> bool {
        self.remove(key).is_some()
    }
    fn map_visit(&self, f: &mut dyn FnMut(&K, &V)) {
        for (k, v) in self.iter() {
            f(k, v);
        }
    }
}

impl<K: Clone + Ord + 'static, V: Clone + 'static> MapLike for BTreeMap<K, V> {
    type Key = K;
    type Value = V;

    fn map_len(&self) -> usize {
        self.len()
    }
    fn map_clear(&mut self) {
        self.clear()
    }
    fn map_get(&self, key: &K) -> Option<&V> {
        self.get(key)
    }
    fn map_contains(&self, key: &K) -> bool {
        self.contains_key(key)
    }
    fn map_insert(&mut self, key: K, value: V) {
        self.insert(key, value);
    }
    fn map_remove(&mut self, key: &K) -> bool {
        self.remove(key).is_some()
    }
    fn map_visit(&self, f: &mut dyn FnMut(&K, &V)) {
        for (k, v) in self.iter() {
            f(k, v);
        }
    }
}

impl<K: Clone + Eq + Hash + 'static> MapLike for HashSet<K> {
    type Key = K;
    type Value = K;
    const SET_LIKE: bool = true;

    fn map_len(&self) -> usize {
        self.len()
    }
    fn map_clear(&mut self) {
        self.clear()
    }
    fn map_get(&self, key: &K) -> Option<&K> {
        self.get(key)
    }
    fn map_contains(&self, key: &K) -> bool {
        self.contains(key)
    }
    fn map_insert(&mut self, key: K, _value: K) {
        self.insert(key);
    }
    fn map_remove(&mut self, key: &K) -> bool {
        self.remove(key)
    }
    fn map_visit(&self, f: &mut dyn FnMut(&K, &K)) {
        for k in self.iter() {
            f(k, k);
        }
    }
}

impl<K: Clone + Ord + 'static> MapLike for BTreeSet<K> {
    type Key = K;
    type Value = K;
    const SET_LIKE: bool = true;

    fn map_len(&self) -> usize {
        self.len()
    }
    fn map_clear(&mut self) {
        self.clear()
    }
    fn map_get(&self, key: &K) -> Option<&K> {
        self.get(key)
    }
    fn map_contains(&self, key: &K) -> bool {
        self.contains(key)
    }
    fn map_insert(&mut self, key: K, _value: K) {
        self.insert(key);
    }
    fn map_remove(&mut self, key: &K) -> bool {
        self.remove(key)
    }
    fn map_visit(&self, f: &mut dyn FnMut(&K, &K)) {
        for k in self.iter() {
            f(k, k);
        }
    }
}

// ---------------------------------------------------------------------------
// Erased operation tables
// ---------------------------------------------------------------------------

/// Erased operations over a sequential container, one promoted static per
/// concrete container type.
pub struct SequenceOps {
    pub(crate) len: unsafe fn(*const u8) -> usize,
    pub(crate) clear: unsafe fn(*mut u8),
    pub(crate) get: unsafe fn(*const u8, usize) -> Option<Variant>,
    pub(crate) elem_ptr: unsafe fn(*mut u8, usize) -> Option<*mut u8>,
    pub(crate) push: unsafe fn(*mut u8, Variant) -> Result<(), Variant>,
    pub(crate) pop: unsafe fn(*mut u8) -> bool,
    /// Clone the element *at the given element pointer* into a variant.
    pub(crate) read: unsafe fn(*const u8) -> Variant,
    pub(crate) elem_token: fn() -> TypeId,
    pub(crate) elem_type_name: fn() -> String,
}

unsafe fn seq_len_raw<C: Sequence>(p: *const u8) -> usize {
    unsafe { (*(p as *const C)).seq_len() }
}

unsafe fn seq_clear_raw<C: Sequence>(p: *mut u8) {
    unsafe { (*(p as *mut C)).seq_clear() }
}

unsafe fn seq_get_raw<C: Sequence>(p: *const u8, index: usize) -> Option<Variant> {
    unsafe { (*(p as *const C)).seq_get(index).map(|e| Variant::of(e.clone())) }
}

unsafe fn seq_elem_ptr_raw<C: Sequence>(p: *mut u8, index: usize) -> Option<*mut u8> {
    unsafe {
        (*(p as *mut C))
            .seq_get_mut(index)
            .map(|e| e as *mut C::Elem as *mut u8)
    }
}

unsafe fn seq_push_raw<C: Sequence>(p: *mut u8, value: Variant) -> Result<(), Variant> {
    let container = unsafe { &mut *(p as *mut C) };
    match value.take::<C::Elem>() {
        Ok(elem) => {
            container.seq_push(elem);
            Ok(())
        }
        Err(value) => match value.convert_to::<C::Elem>() {
            Ok(elem) => {
                container.seq_push(elem);
                Ok(())
            }
            Err(_) => Err(value),
        },
    }
}

unsafe fn seq_pop_raw<C: Sequence>(p: *mut u8) -> bool {
    unsafe { (*(p as *mut C)).seq_pop() }
}

unsafe fn seq_read_elem_raw<C: Sequence>(elem: *const u8) -> Variant {
    unsafe { Variant::of((*(elem as *const C::Elem)).clone()) }
}

pub(crate) fn sequence_ops_of<C: Sequence>() -> &'static SequenceOps {
    const {
        &SequenceOps {
            len: seq_len_raw::<C>,
            clear: seq_clear_raw::<C>,
            get: seq_get_raw::<C>,
            elem_ptr: seq_elem_ptr_raw::<C>,
            push: seq_push_raw::<C>,
            pop: seq_pop_raw::<C>,
            read: seq_read_elem_raw::<C>,
            elem_token: TypeId::of::<C::Elem>,
            elem_type_name: crate::ident::type_name_of::<C::Elem>,
        }
    }
}

/// Erased operations over an associative container.
pub struct MapOps {
    pub(crate) len: unsafe fn(*const u8) -> usize,
    pub(crate) clear: unsafe fn(*mut u8),
    pub(crate) get: unsafe fn(*const u8, &Variant) -> ReflectResult<Option<Variant>>,
    pub(crate) contains: unsafe fn(*const u8, &Variant) -> bool,
    pub(crate) insert: unsafe fn(*mut u8, Variant, Option<Variant>) -> ReflectResult<()>,
    pub(crate) remove: unsafe fn(*mut u8, &Variant) -> ReflectResult<bool>,
    pub(crate) visit: unsafe fn(*const u8, &mut dyn FnMut(Variant, Variant)),
    pub(crate) key_token: fn() -> TypeId,
    pub(crate) key_type_name: fn() -> String,
    pub(crate) value_token: fn() -> TypeId,
    pub(crate) value_type_name: fn() -> String,
    pub(crate) set_like: bool,
}

unsafe fn map_len_raw<M: MapLike>(p: *const u8) -> usize {
    unsafe { (*(p as *const M)).map_len() }
}

unsafe fn map_clear_raw<M: MapLike>(p: *mut u8) {
    unsafe { (*(p as *mut M)).map_clear() }
}

unsafe fn map_get_raw<M: MapLike>(p: *const u8, key: &Variant) -> ReflectResult<Option<Variant>> {
    let key = key.convert_to::<M::Key>()?;
    unsafe {
        Ok((*(p as *const M))
            .map_get(&key)
            .map(|v| Variant::of(v.clone())))
    }
}

unsafe fn map_contains_raw<M: MapLike>(p: *const u8, key: &Variant) -> bool {
    match key.convert_to::<M::Key>() {
        Ok(key) => unsafe { (*(p as *const M)).map_contains(&key) },
        Err(_) => false,
    }
}

unsafe fn map_insert_raw<M: MapLike>(
    p: *mut u8,
    key: Variant,
    value: Option<Variant>,
) -> ReflectResult<()> {
    let converted_value = match &value {
        Some(v) => v.convert_to::<M::Value>()?,
        // Set-like containers derive the value from the key.
        None => key.convert_to::<M::Value>()?,
    };
    let key = key.convert_to::<M::Key>()?;
    unsafe { (*(p as *mut M)).map_insert(key, converted_value) };
    Ok(())
}

unsafe fn map_remove_raw<M: MapLike>(p: *mut u8, key: &Variant) -> ReflectResult<bool> {
    let key = key.convert_to::<M::Key>()?;
    unsafe { Ok((*(p as *mut M)).map_remove(&key)) }
}

unsafe fn map_visit_raw<M: MapLike>(p: *const u8, f: &mut dyn FnMut(Variant, Variant)) {
    unsafe {
        (*(p as *const M)).map_visit(&mut |k, v| {
            f(Variant::of(k.clone()), Variant::of(v.clone()));
        });
    }
}

pub(crate) fn map_ops_of<M: MapLike>() -> &'static MapOps {
    const {
        &MapOps {
            len: map_len_raw::<M>,
            clear: map_clear_raw::<M>,
            get: map_get_raw::<M>,
            contains: map_contains_raw::<M>,
            insert: map_insert_raw::<M>,
            remove: map_remove_raw::<M>,
            visit: map_visit_raw::<M>,
            key_token: TypeId::of::<M::Key>,
            key_type_name: crate::ident::type_name_of::<M::Key>,
            value_token: TypeId::of::<M::Value>,
            value_type_name: crate::ident::type_name_of::<M::Value>,
            set_like: M::SET_LIKE,
        }
    }
}

// ---------------------------------------------------------------------------
// Reflect classification for containers
// ---------------------------------------------------------------------------

impl<E: Reflect + Clone> Reflect for Vec<E> {
    const KIND: FieldKind = FieldKind::Sequential;

    fn sequence_ops() -> Option<&'static SequenceOps> {
        Some(sequence_ops_of::<Vec<E>>())
    }
}

impl<E: Reflect + Clone> Reflect for VecDeque<E> {
    const KIND: FieldKind = FieldKind::Sequential;

    fn sequence_ops() -> Option<&'static SequenceOps> {
        Some(sequence_ops_of::<VecDeque<E>>())
    }
}

impl<A> Reflect for SmallVec<A>
where
    A: smallvec::Array + 'static,
    A::Item: Reflect + Clone,
{
    const KIND: FieldKind = FieldKind::Sequential;

    fn sequence_ops() -> Option<&'static SequenceOps> {
        Some(sequence_ops_of::<SmallVec<A>>())
    }
}

impl<K: Reflect + Clone + Eq + Hash, V: Reflect + Clone> Reflect for HashMap<K, V> {
    const KIND: FieldKind = FieldKind::Associative;

    fn map_ops() -> Option<&'static MapOps> {
        Some(map_ops_of::<HashMap<K, V>>())
    }
}

impl<K: Reflect + Clone + Ord, V: Reflect + Clone> Reflect for BTreeMap<K, V> {
    const KIND: FieldKind = FieldKind::Associative;

    fn map_ops() -> Option<&'static MapOps> {
        Some(map_ops_of::<BTreeMap<K, V>>())
    }
}

impl<K: Reflect + Clone + Eq + Hash> Reflect for HashSet<K> {
    const KIND: FieldKind = FieldKind::Associative;

    fn map_ops() -> Option<&'static MapOps> {
        Some(map_ops_of::<HashSet<K>>())
    }
}

impl<K: Reflect + Clone + Ord> Reflect for BTreeSet<K> {
    const KIND: FieldKind = FieldKind::Associative;

    fn map_ops() -> Option<&'static MapOps> {
        Some(map_ops_of::<BTreeSet<K>>())
    }
}

// ---------------------------------------------------------------------------
// Views
// ---------------------------------------------------------------------------

/// Uniform mutable view over a sequential container field.
pub struct SequenceView<'a> {
    ops: &'static SequenceOps,
    ptr: *mut u8,
    _marker: PhantomData<&'a mut ()>,
}

impl<'a> SequenceView<'a> {
    pub(crate) fn new(ops: &'static SequenceOps, ptr: *mut u8) -> Self {
        SequenceView {
            ops,
            ptr,
            _marker: PhantomData,
        }
    }

    pub fn len(&self) -> usize {
        unsafe { (self.ops.len)(self.ptr) }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn clear(&mut self) {
        unsafe { (self.ops.clear)(self.ptr) }
    }

    /// Clone the element at `index` into a variant.
    pub fn get(&self, index: usize) -> Option<Variant> {
        unsafe { (self.ops.get)(self.ptr, index) }
    }

    /// Non-owning view into the element at `index`.
    pub fn at(&mut self, index: usize) -> Option<ElemView<'_>> {
        let ptr = unsafe { (self.ops.elem_ptr)(self.ptr, index)? };
        Some(ElemView {
            ops: self.ops,
            ptr,
            _marker: PhantomData,
        })
    }

    /// Append a boxed value, converting it to the element type if needed.
    pub fn push(&mut self, value: Variant) -> ReflectResult<()> {
        unsafe { (self.ops.push)(self.ptr, value) }.map_err(|value| ReflectError::BadCast {
            expected: (self.ops.elem_type_name)(),
            actual: value.type_name_or_empty(),
        })
    }

    /// Remove the last element; false when already empty.
    pub fn pop(&mut self) -> bool {
        unsafe { (self.ops.pop)(self.ptr) }
    }

    pub fn elem_token(&self) -> TypeId {
        (self.ops.elem_token)()
    }

    pub fn elem_type_name(&self) -> String {
        (self.ops.elem_type_name)()
    }

    /// Iterate over cloned elements in order.
    pub fn iter(&self) -> impl Iterator<Item = Variant> + '_ {
        (0..self.len()).filter_map(move |i| self.get(i))
    }
}

/// Non-owning view of a single container element.
pub struct ElemView<'a> {
    ops: &'static SequenceOps,
    ptr: *mut u8,
    _marker: PhantomData<&'a mut ()>,
}

impl<'a> ElemView<'a> {
    pub fn token(&self) -> TypeId {
        (self.ops.elem_token)()
    }

    pub fn type_name(&self) -> String {
        (self.ops.elem_type_name)()
    }

    /// Clone the element into a variant.
    pub fn as_variant(&self) -> Variant {
        unsafe { (self.ops.read)(self.ptr) }
    }

    /// Borrow the element as `E`.
    pub fn get<E: 'static>(&self) -> ReflectResult<&E> {
        if self.token() != TypeId::of::<E>() {
            return Err(ReflectError::BadCast {
                expected: crate::ident::type_name_of::<E>(),
                actual: self.type_name(),
            });
        }
        Ok(unsafe { &*(self.ptr as *const E) })
    }

    /// Mutably borrow the element as `E`.
    pub fn get_mut<E: 'static>(&mut self) -> ReflectResult<&mut E> {
        if self.token() != TypeId::of::<E>() {
            return Err(ReflectError::BadCast {
                expected: crate::ident::type_name_of::<E>(),
                actual: self.type_name(),
            });
        }
        Ok(unsafe { &mut *(self.ptr as *mut E) })
    }

    /// Bind the element as a reflected object of its registered type.
    pub fn bind(self) -> ReflectResult<BoundObject<'a>> {
        let rec = registry()
            .lookup_token(self.token())
            .ok_or_else(|| ReflectError::TypeNotRegistered(self.type_name()))?;
        Ok(BoundObject::from_raw(rec, self.ptr))
    }
}

/// Uniform mutable view over an associative container field.
pub struct MapView<'a> {
    ops: &'static MapOps,
    ptr: *mut u8,
    _marker: PhantomData<&'a mut ()>,
}

impl<'a> MapView<'a> {
    pub(crate) fn new(ops: &'static MapOps, ptr: *mut u8) -> Self {
        MapView {
            ops,
            ptr,
            _marker: PhantomData,
        }
    }

    pub fn len(&self) -> usize {
        unsafe { (self.ops.len)(self.ptr) }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn clear(&mut self) {
        unsafe { (self.ops.clear)(self.ptr) }
    }

    /// Whether the container is a set (value == key).
    pub fn is_set_like(&self) -> bool {
        self.ops.set_like
    }

    /// Clone the value stored under `key` into a variant.
    pub fn get(&self, key: &Variant) -> ReflectResult<Option<Variant>> {
        unsafe { (self.ops.get)(self.ptr, key) }
    }

    pub fn contains(&self, key: &Variant) -> bool {
        unsafe { (self.ops.contains)(self.ptr, key) }
    }

    /// Insert a key/value pair; set-like containers ignore the value.
    pub fn insert(&mut self, key: Variant, value: Variant) -> ReflectResult<()> {
        let value = if self.ops.set_like { None } else { Some(value) };
        unsafe { (self.ops.insert)(self.ptr, key, value) }
    }

    /// Remove the entry under `key`; false when absent.
    pub fn remove(&mut self, key: &Variant) -> ReflectResult<bool> {
        unsafe { (self.ops.remove)(self.ptr, key) }
    }

    /// Visit every (key, value) pair as cloned variants. For set-like
    /// containers the value equals the key.
    pub fn for_each(&self, mut f: impl FnMut(Variant, Variant)) {
        unsafe { (self.ops.visit)(self.ptr, &mut f) }
    }

    pub fn key_token(&self) -> TypeId {
        (self.ops.key_token)()
    }

    pub fn key_type_name(&self) -> String {
        (self.ops.key_type_name)()
    }

    pub fn value_token(&self) -> TypeId {
        (self.ops.value_token)()
    }

    pub fn value_type_name(&self) -> String {
        (self.ops.value_type_name)()
    }
}
