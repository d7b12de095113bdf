//! Name-only dynamic object access.
//!
//! [`Instance`] wraps an object together with its type record so that
//! callers with no compile-time type information — script bindings,
//! editors, plugin hosts — can create objects by registered name, read and
//! write properties as [`Variant`]s, and invoke methods with boxed
//! argument lists. An instance either owns its object (created through a
//! registered constructor or adopted from a `Box`) or borrows one that the
//! caller keeps alive.
//!
//! [`DynamicProperty`] and [`DynamicMethod`] cache a single record pointer
//! for repeated name-resolved access without re-hashing the name.

use std::any::{Any, TypeId};
use std::fmt;
use std::marker::PhantomData;

use crate::bound::BoundObject;
use crate::container::{MapView, SequenceView};
use crate::error::{ReflectError, ReflectResult};
use crate::handle::{TypeHandle, type_named_or_err};
use crate::ident;
use crate::meta::method::render_args;
use crate::meta::{FieldKind, FieldRecord, MethodRecord, TypeRecord};
use crate::registry::registry;
use crate::variant::{IntoArgs, Variant};

enum Repr<'a> {
    Owned(Box<dyn Any>),
    Borrowed {
        ptr: *mut u8,
        _marker: PhantomData<&'a mut ()>,
    },
}

/// An object paired with its type record, accessed purely by name.
pub struct Instance<'a> {
    repr: Repr<'a>,
    record: &'static TypeRecord,
}

impl Instance<'static> {
    /// Create an object of the type registered under `name` through its
    /// default constructor.
    pub fn create(name: &str) -> ReflectResult<Instance<'static>> {
        type_named_or_err(name)?.create()
    }

    /// Create through the constructor matching the argument count.
    pub fn create_with(name: &str, args: &[Variant]) -> ReflectResult<Instance<'static>> {
        type_named_or_err(name)?.create_with(args)
    }

    /// Adopt an owned object of a registered type.
    pub fn from_owned<T: 'static>(obj: Box<T>) -> ReflectResult<Instance<'static>> {
        let record = registry()
            .lookup_token(TypeId::of::<T>())
            .ok_or_else(|| ReflectError::TypeNotRegistered(ident::type_name_of::<T>()))?;
        Ok(Instance {
            repr: Repr::Owned(obj as Box<dyn Any>),
            record,
        })
    }

    pub(crate) fn from_boxed(record: &'static TypeRecord, obj: Box<dyn Any>) -> Instance<'static> {
        Instance {
            repr: Repr::Owned(obj),
            record,
        }
    }
}

impl<'a> Instance<'a> {
    /// Borrow an existing object of a registered type.
    pub fn from_ref<T: 'static>(obj: &'a mut T) -> ReflectResult<Instance<'a>> {
        let record = registry()
            .lookup_token(TypeId::of::<T>())
            .ok_or_else(|| ReflectError::TypeNotRegistered(ident::type_name_of::<T>()))?;
        Ok(Instance {
            repr: Repr::Borrowed {
                ptr: obj as *mut T as *mut u8,
                _marker: PhantomData,
            },
            record,
        })
    }

    #[inline]
    pub fn is_owned(&self) -> bool {
        matches!(self.repr, Repr::Owned(_))
    }

    #[inline]
    pub fn type_name(&self) -> &str {
        self.record.name()
    }

    #[inline]
    pub fn handle(&self) -> TypeHandle {
        TypeHandle::from_record(self.record)
    }

    #[inline]
    pub fn record(&self) -> &'static TypeRecord {
        self.record
    }

    /// Raw pointer to the wrapped object.
    pub fn raw(&self) -> *const u8 {
        match &self.repr {
            Repr::Owned(obj) => {
                let any: &dyn Any = &**obj;
                any as *const dyn Any as *const u8
            }
            Repr::Borrowed { ptr, .. } => *ptr as *const u8,
        }
    }

    pub fn raw_mut(&mut self) -> *mut u8 {
        match &mut self.repr {
            Repr::Owned(obj) => {
                let any: &mut dyn Any = &mut **obj;
                any as *mut dyn Any as *mut u8
            }
            Repr::Borrowed { ptr, .. } => *ptr,
        }
    }

    /// Bind the wrapped object for typed hot-path access.
    pub fn bind(&mut self) -> BoundObject<'_> {
        let record = self.record;
        BoundObject::from_raw(record, self.raw_mut())
    }

    #[inline]
    pub fn has_property(&self, name: &str) -> bool {
        self.record.has_field(name)
    }

    #[inline]
    pub fn has_method(&self, name: &str) -> bool {
        self.record.has_method(name)
    }

    pub fn property_names(&self) -> Vec<&'static str> {
        self.record.field_names()
    }

    pub fn method_names(&self) -> Vec<&'static str> {
        self.record.method_names()
    }

    fn field(&self, name: &str) -> ReflectResult<&'static FieldRecord> {
        self.record
            .find_field(name)
            .ok_or_else(|| ReflectError::PropertyNotFound {
                type_name: self.record.name().to_string(),
                property: name.to_string(),
                available: self.record.field_names_owned(),
            })
    }

    /// Clone the property `name` into a variant.
    pub fn get_property(&self, name: &str) -> ReflectResult<Variant> {
        let field = self.field(name)?;
        Ok(unsafe { (field.read)(self.raw().add(field.offset())) })
    }

    /// Write the property `name` from a variant, converting if needed.
    pub fn set_property(&mut self, name: &str, value: Variant) -> ReflectResult<()> {
        let field = self.field(name)?;
        let ptr = unsafe { self.raw_mut().add(field.offset()) };
        unsafe { (field.write)(ptr, value) }.map_err(|value| ReflectError::PropertyTypeMismatch {
            property: name.to_string(),
            expected: field.type_name().to_string(),
            actual: value.type_name_or_empty(),
        })
    }

    /// Typed write that skips boxing when the value type matches exactly.
    pub fn set_property_direct<F: Clone + 'static>(
        &mut self,
        name: &str,
        value: F,
    ) -> ReflectResult<()> {
        let field = self.field(name)?;
        let ptr = unsafe { self.raw_mut().add(field.offset()) };
        if field.token() == TypeId::of::<F>() {
            unsafe { *(ptr as *mut F) = value };
            return Ok(());
        }
        unsafe { (field.write)(ptr, Variant::of(value)) }.map_err(|value| {
            ReflectError::PropertyTypeMismatch {
                property: name.to_string(),
                expected: field.type_name().to_string(),
                actual: value.type_name_or_empty(),
            }
        })
    }

    /// Typed read that skips boxing when the value type matches exactly.
    pub fn get_property_direct<F: Clone + 'static>(&self, name: &str) -> ReflectResult<F> {
        let field = self.field(name)?;
        let ptr = unsafe { self.raw().add(field.offset()) };
        if field.token() == TypeId::of::<F>() {
            return Ok(unsafe { (*(ptr as *const F)).clone() });
        }
        let boxed = unsafe { (field.read)(ptr) };
        boxed
            .convert_to::<F>()
            .map_err(|_| ReflectError::PropertyTypeMismatch {
                property: name.to_string(),
                expected: field.type_name().to_string(),
                actual: ident::type_name_of::<F>(),
            })
    }

    /// Invoke the method `name` with boxed arguments.
    pub fn invoke(&mut self, name: &str, args: &[Variant]) -> ReflectResult<Variant> {
        let table =
            self.record
                .find_method(name)
                .ok_or_else(|| ReflectError::MethodNotFound {
                    type_name: self.record.name().to_string(),
                    method: name.to_string(),
                    available: self.record.method_names_owned(),
                })?;
        let method = table
            .by_arity(args.len())
            .ok_or_else(|| ReflectError::SignatureMismatch {
                method: name.to_string(),
                expected: table.expected_signatures(),
                actual: render_args(args),
            })?;
        method
            .invoke_erased(self.raw_mut(), args)
            .map_err(|_| ReflectError::SignatureMismatch {
                method: name.to_string(),
                expected: method.param_signature(),
                actual: render_args(args),
            })
    }

    /// Invoke with plain values instead of pre-boxed variants.
    pub fn invoke_with(&mut self, name: &str, args: impl IntoArgs) -> ReflectResult<Variant> {
        let args = args.into_args();
        self.invoke(name, &args)
    }

    /// Cache a property handle for repeated access without name hashing.
    pub fn property_handle(&self, name: &str) -> Option<DynamicProperty> {
        self.record.find_field(name).map(|field| DynamicProperty {
            owner: self.record,
            field,
        })
    }

    /// Cache a method handle for repeated invocation without name hashing.
    pub fn method_handle(&self, name: &str, arity: usize) -> Option<DynamicMethod> {
        let method = self.record.find_method(name)?.by_arity(arity)?;
        Some(DynamicMethod {
            owner: self.record,
            method,
        })
    }

    /// View a sequential-container property through the uniform adapter.
    pub fn sequence(&mut self, name: &str) -> ReflectResult<SequenceView<'_>> {
        let field = self.field(name)?;
        let ops = field.sequence.ok_or_else(|| ReflectError::BadCast {
            expected: "sequential container".to_string(),
            actual: format!("{} ({})", field.type_name(), field.kind()),
        })?;
        let ptr = unsafe { self.raw_mut().add(field.offset()) };
        Ok(SequenceView::new(ops, ptr))
    }

    /// View an associative-container property through the uniform adapter.
    pub fn map(&mut self, name: &str) -> ReflectResult<MapView<'_>> {
        let field = self.field(name)?;
        let ops = field.map.ok_or_else(|| ReflectError::BadCast {
            expected: "associative container".to_string(),
            actual: format!("{} ({})", field.type_name(), field.kind()),
        })?;
        let ptr = unsafe { self.raw_mut().add(field.offset()) };
        Ok(MapView::new(ops, ptr))
    }

    /// Borrow the wrapped object as `T`, or `None` on type mismatch.
    pub fn as_ref<T: 'static>(&self) -> Option<&T> {
        if self.record.token() == TypeId::of::<T>() {
            Some(unsafe { &*(self.raw() as *const T) })
        } else {
            None
        }
    }

    /// Mutably borrow the wrapped object as `T`, or `None` on mismatch.
    pub fn as_mut<T: 'static>(&mut self) -> Option<&mut T> {
        if self.record.token() == TypeId::of::<T>() {
            Some(unsafe { &mut *(self.raw_mut() as *mut T) })
        } else {
            None
        }
    }
}

impl fmt::Debug for Instance<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Instance")
            .field("type", &self.record.name())
            .field("owned", &self.is_owned())
            .finish()
    }
}

/// A property resolved once against a type record, reusable on any
/// instance of that same type.
#[derive(Clone, Copy)]
pub struct DynamicProperty {
    owner: &'static TypeRecord,
    field: &'static FieldRecord,
}

impl DynamicProperty {
    #[inline]
    pub fn name(&self) -> &str {
        self.field.name()
    }

    #[inline]
    pub fn type_name(&self) -> &str {
        self.field.type_name()
    }

    #[inline]
    pub fn kind(&self) -> FieldKind {
        self.field.kind()
    }

    #[inline]
    pub fn token(&self) -> TypeId {
        self.field.token()
    }

    fn guard(&self, instance: &Instance<'_>) -> ReflectResult<()> {
        if std::ptr::eq(self.owner, instance.record) {
            Ok(())
        } else {
            Err(ReflectError::NotBound(self.owner.name().to_string()))
        }
    }

    /// Clone the property out of `instance`.
    pub fn get(&self, instance: &Instance<'_>) -> ReflectResult<Variant> {
        self.guard(instance)?;
        Ok(unsafe { (self.field.read)(instance.raw().add(self.field.offset())) })
    }

    /// Write the property on `instance` from a variant.
    pub fn set(&self, instance: &mut Instance<'_>, value: Variant) -> ReflectResult<()> {
        self.guard(instance)?;
        let ptr = unsafe { instance.raw_mut().add(self.field.offset()) };
        unsafe { (self.field.write)(ptr, value) }.map_err(|value| {
            ReflectError::PropertyTypeMismatch {
                property: self.field.name().to_string(),
                expected: self.field.type_name().to_string(),
                actual: value.type_name_or_empty(),
            }
        })
    }

    /// Typed read skipping the variant box on exact matches.
    pub fn get_direct<F: Clone + 'static>(&self, instance: &Instance<'_>) -> ReflectResult<F> {
        self.guard(instance)?;
        instance.get_property_direct::<F>(self.field.name())
    }

    /// Typed write skipping the variant box on exact matches.
    pub fn set_direct<F: Clone + 'static>(
        &self,
        instance: &mut Instance<'_>,
        value: F,
    ) -> ReflectResult<()> {
        self.guard(instance)?;
        let ptr = unsafe { instance.raw_mut().add(self.field.offset()) };
        if self.field.token() == TypeId::of::<F>() {
            unsafe { *(ptr as *mut F) = value };
            return Ok(());
        }
        unsafe { (self.field.write)(ptr, Variant::of(value)) }.map_err(|value| {
            ReflectError::PropertyTypeMismatch {
                property: self.field.name().to_string(),
                expected: self.field.type_name().to_string(),
                actual: value.type_name_or_empty(),
            }
        })
    }
}

/// A method overload resolved once against a type record.
#[derive(Clone, Copy)]
pub struct DynamicMethod {
    owner: &'static TypeRecord,
    method: &'static MethodRecord,
}

impl DynamicMethod {
    #[inline]
    pub fn name(&self) -> &str {
        self.method.name()
    }

    #[inline]
    pub fn arity(&self) -> usize {
        self.method.arity()
    }

    #[inline]
    pub fn is_const(&self) -> bool {
        self.method.is_const()
    }

    pub fn signature(&self) -> String {
        self.method.signature()
    }

    /// Invoke on `instance` with boxed arguments.
    pub fn invoke(&self, instance: &mut Instance<'_>, args: &[Variant]) -> ReflectResult<Variant> {
        if !std::ptr::eq(self.owner, instance.record) {
            return Err(ReflectError::NotBound(self.owner.name().to_string()));
        }
        if args.len() != self.method.arity() {
            return Err(ReflectError::SignatureMismatch {
                method: self.method.name().to_string(),
                expected: self.method.param_signature(),
                actual: render_args(args),
            });
        }
        self.method
            .invoke_erased(instance.raw_mut(), args)
            .map_err(|_| ReflectError::SignatureMismatch {
                method: self.method.name().to_string(),
                expected: self.method.param_signature(),
                actual: render_args(args),
            })
    }
}
