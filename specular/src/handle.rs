//! Lightweight type handles and pre-resolved member handles.
//!
//! [`TypeHandle`] is a copyable pointer-sized value identifying a registered
//! type; every query on it is a direct read through the record. For hot
//! loops, [`PropertyHandle`] and [`MethodHandle`] pre-resolve a member once
//! so that repeated access skips name hashing and lookup entirely.

use std::any::TypeId;
use std::fmt;
use std::marker::PhantomData;

use crate::bound::BoundObject;
use crate::error::{ReflectError, ReflectResult};
use crate::ident;
use crate::instance::Instance;
use crate::meta::method::render_args;
use crate::meta::{MethodRecord, TypeRecord};
use crate::registry::registry;
use crate::variant::{IntoArgs, Variant};

/// Handle for `T`, if `T` is registered. Fastest lookup form.
#[inline]
pub fn type_of<T: 'static>() -> Option<TypeHandle> {
    registry()
        .lookup_token(TypeId::of::<T>())
        .map(TypeHandle::from_record)
}

/// Handle for the type registered under `name`.
#[inline]
pub fn type_named(name: &str) -> Option<TypeHandle> {
    registry().lookup(name).map(TypeHandle::from_record)
}

/// Handle for the type registered under `name`, erring when absent.
pub fn type_named_or_err(name: &str) -> ReflectResult<TypeHandle> {
    type_named(name).ok_or_else(|| ReflectError::TypeNotRegistered(name.to_string()))
}

/// A pointer-valued handle to a registered type.
#[derive(Clone, Copy)]
pub struct TypeHandle {
    record: &'static TypeRecord,
}

impl TypeHandle {
    #[inline]
    pub(crate) fn from_record(record: &'static TypeRecord) -> TypeHandle {
        TypeHandle { record }
    }

    /// The underlying metadata record.
    #[inline]
    pub fn record(&self) -> &'static TypeRecord {
        self.record
    }

    #[inline]
    pub fn name(&self) -> &'static str {
        let record: &'static TypeRecord = self.record;
        record.name()
    }

    #[inline]
    pub fn size(&self) -> usize {
        self.record.size()
    }

    #[inline]
    pub fn token(&self) -> TypeId {
        self.record.token()
    }

    #[inline]
    pub fn has_property(&self, name: &str) -> bool {
        self.record.has_field(name)
    }

    #[inline]
    pub fn has_method(&self, name: &str) -> bool {
        self.record.has_method(name)
    }

    /// Registered property names, registration order.
    pub fn property_names(&self) -> Vec<&'static str> {
        self.record.field_names()
    }

    pub fn method_names(&self) -> Vec<&'static str> {
        self.record.method_names()
    }

    pub fn base_tokens(&self) -> Vec<TypeId> {
        self.record.base_tokens()
    }

    /// Byte offset of a property, for the offset-based access paths.
    pub fn property_offset(&self, name: &str) -> Option<usize> {
        self.record.find_field(name).map(|f| f.offset())
    }

    /// Bind an object of this type for name-keyed access.
    pub fn bind<'a, T: 'static>(&self, obj: &'a mut T) -> ReflectResult<BoundObject<'a>> {
        if self.record.token() != TypeId::of::<T>() {
            return Err(ReflectError::BadCast {
                expected: self.record.name().to_string(),
                actual: ident::type_name_of::<T>(),
            });
        }
        Ok(BoundObject::from_raw(self.record, obj as *mut T as *mut u8))
    }

    /// Create a new instance through the default constructor.
    pub fn create(&self) -> ReflectResult<Instance<'static>> {
        self.create_with(&[])
    }

    /// Create a new instance through the constructor matching the argument
    /// count, converting boxed arguments like a method call.
    pub fn create_with(&self, args: &[Variant]) -> ReflectResult<Instance<'static>> {
        let factory = if args.is_empty() {
            self.record.default_factory()
        } else {
            self.record.factory_by_arity(args.len())
        }
        .ok_or_else(|| ReflectError::ConstructorNotFound {
            type_name: self.record.name().to_string(),
            arity: args.len(),
        })?;
        let object = (factory.produce.as_ref())(args).map_err(|_| ReflectError::SignatureMismatch {
            method: format!("{}::constructor", self.record.name()),
            expected: factory.signature().to_string(),
            actual: render_args(args),
        })?;
        Ok(Instance::from_boxed(self.record, object))
    }

    /// Pre-resolve a property for hot-loop access. `None` when the name is
    /// unknown or its value type is not `F`.
    pub fn property_handle<F: 'static>(&self, name: &str) -> Option<PropertyHandle<F>> {
        let field = self.record.find_field(name)?;
        if field.token() != TypeId::of::<F>() {
            return None;
        }
        Some(PropertyHandle {
            offset: field.offset(),
            host: self.record.token(),
            _marker: PhantomData,
        })
    }

    /// Pre-resolve a method overload by name and argument count.
    pub fn method_handle(&self, name: &str, arity: usize) -> Option<MethodHandle> {
        let record = self.record.find_method(name)?.by_arity(arity)?;
        Some(MethodHandle {
            record,
            owner: self.record,
        })
    }
}

impl PartialEq for TypeHandle {
    fn eq(&self, other: &Self) -> bool {
        std::ptr::eq(self.record, other.record)
    }
}

impl Eq for TypeHandle {}

impl fmt::Debug for TypeHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TypeHandle")
            .field("name", &self.record.name())
            .field("size", &self.record.size())
            .finish()
    }
}

/// Pre-resolved property accessor: a cached offset plus the host type
/// token. `get`/`set` are pointer arithmetic after one token equality
/// check; the `_unchecked` variants drop even that.
pub struct PropertyHandle<F: 'static> {
    offset: usize,
    host: TypeId,
    _marker: PhantomData<fn() -> F>,
}

impl<F: 'static> Clone for PropertyHandle<F> {
    fn clone(&self) -> Self {
        *self
    }
}

impl<F: 'static> Copy for PropertyHandle<F> {}

impl<F: 'static> PropertyHandle<F> {
    #[inline]
    pub fn offset(&self) -> usize {
        self.offset
    }

    /// Read the property off `obj`.
    ///
    /// Panics when `O` is not the type this handle was resolved against.
    #[inline]
    pub fn get<'o, O: 'static>(&self, obj: &'o O) -> &'o F {
        assert!(TypeId::of::<O>() == self.host, "property handle bound to a different type");
        unsafe { &*((obj as *const O as *const u8).add(self.offset) as *const F) }
    }

    #[inline]
    pub fn get_mut<'o, O: 'static>(&self, obj: &'o mut O) -> &'o mut F {
        assert!(TypeId::of::<O>() == self.host, "property handle bound to a different type");
        unsafe { &mut *((obj as *mut O as *mut u8).add(self.offset) as *mut F) }
    }

    #[inline]
    pub fn set<O: 'static>(&self, obj: &mut O, value: F) {
        *self.get_mut(obj) = value;
    }

    /// Read without the host check.
    ///
    /// # Safety
    /// `obj` must point at a live object of the type this handle was
    /// resolved against.
    #[inline]
    pub unsafe fn get_unchecked<'o, O>(&self, obj: &'o O) -> &'o F {
        unsafe { &*((obj as *const O as *const u8).add(self.offset) as *const F) }
    }

    /// Write without the host check.
    ///
    /// # Safety
    /// As [`PropertyHandle::get_unchecked`].
    #[inline]
    pub unsafe fn get_unchecked_mut<'o, O>(&self, obj: &'o mut O) -> &'o mut F {
        unsafe { &mut *((obj as *mut O as *mut u8).add(self.offset) as *mut F) }
    }
}

/// Pre-resolved method overload.
#[derive(Clone, Copy)]
pub struct MethodHandle {
    record: &'static MethodRecord,
    owner: &'static TypeRecord,
}

impl MethodHandle {
    #[inline]
    pub fn name(&self) -> &str {
        self.record.name()
    }

    #[inline]
    pub fn arity(&self) -> usize {
        self.record.arity()
    }

    #[inline]
    pub fn is_const(&self) -> bool {
        self.record.is_const()
    }

    pub fn signature(&self) -> String {
        self.record.signature()
    }

    /// Invoke on `obj`, boxing arguments and unboxing the result.
    pub fn call<R: Clone + 'static, O: 'static>(
        &self,
        obj: &mut O,
        args: impl IntoArgs,
    ) -> ReflectResult<R> {
        if TypeId::of::<O>() != self.owner.token() {
            return Err(ReflectError::BadCast {
                expected: self.owner.name().to_string(),
                actual: ident::type_name_of::<O>(),
            });
        }
        let args = args.into_args();
        if args.len() != self.record.arity() {
            return Err(ReflectError::SignatureMismatch {
                method: self.record.name().to_string(),
                expected: self.record.param_signature(),
                actual: render_args(&args),
            });
        }
        let result = self
            .record
            .invoke_erased(obj as *mut O as *mut u8, &args)
            .map_err(|_| ReflectError::SignatureMismatch {
                method: self.record.name().to_string(),
                expected: self.record.param_signature(),
                actual: render_args(&args),
            })?;
        result.convert_to::<R>()
    }
}
