//! Bound objects: a type record paired with an object pointer.
//!
//! [`BoundObject`] is the hot-path access surface. It borrows the object it
//! was bound to (the lifetime parameter pins that borrow) and answers
//! name-keyed reads, writes, and calls by consulting the record directly —
//! a hashed lookup through the record's inline cache, one type-token
//! equality check, then a single pointer add. Callers that have
//! pre-resolved an offset can skip the lookup and the check entirely
//! through the `_by_offset` paths.

use std::any::TypeId;
use std::marker::PhantomData;

use crate::container::{MapView, SequenceView};
use crate::error::{ReflectError, ReflectResult};
use crate::handle::TypeHandle;
use crate::ident;
use crate::meta::method::render_args;
use crate::meta::{FieldRecord, TypeRecord};
use crate::registry::registry;
use crate::variant::IntoArgs;

/// A non-owning handle to one object of a registered type.
pub struct BoundObject<'a> {
    record: &'static TypeRecord,
    ptr: *mut u8,
    _marker: PhantomData<&'a mut ()>,
}

impl<'a> BoundObject<'a> {
    pub(crate) fn from_raw(record: &'static TypeRecord, ptr: *mut u8) -> BoundObject<'a> {
        BoundObject {
            record,
            ptr,
            _marker: PhantomData,
        }
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

    /// Raw pointer to the bound object.
    #[inline]
    pub fn raw(&self) -> *mut u8 {
        self.ptr
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

    fn typed_field<F: 'static>(&self, name: &str) -> ReflectResult<&'static FieldRecord> {
        let field = self.field(name)?;
        if field.token() != TypeId::of::<F>() {
            return Err(ReflectError::PropertyTypeMismatch {
                property: name.to_string(),
                expected: field.type_name().to_string(),
                actual: ident::type_name_of::<F>(),
            });
        }
        Ok(field)
    }

    /// Read the property `name` as `F`.
    pub fn get<F: 'static>(&self, name: &str) -> ReflectResult<&F> {
        let field = self.typed_field::<F>(name)?;
        Ok(unsafe { &*(self.ptr.add(field.offset()) as *const F) })
    }

    /// Mutably borrow the property `name` as `F`.
    pub fn get_mut<F: 'static>(&mut self, name: &str) -> ReflectResult<&mut F> {
        let field = self.typed_field::<F>(name)?;
        Ok(unsafe { &mut *(self.ptr.add(field.offset()) as *mut F) })
    }

    /// Overwrite the property `name` with `value`.
    pub fn set<F: 'static>(&mut self, name: &str, value: F) -> ReflectResult<()> {
        *self.get_mut::<F>(name)? = value;
        Ok(())
    }

    /// Byte offset of a property, for use with the `_by_offset` paths.
    pub fn property_offset(&self, name: &str) -> Option<usize> {
        self.record.find_field(name).map(|f| f.offset())
    }

    /// Read a property through a pre-obtained offset: one add, one cast.
    ///
    /// # Safety
    /// `offset` must have been obtained from this object's type for a
    /// property whose value type is exactly `F`.
    #[inline]
    pub unsafe fn get_by_offset<F>(&self, offset: usize) -> &F {
        unsafe { &*(self.ptr.add(offset) as *const F) }
    }

    /// Mutable counterpart of [`BoundObject::get_by_offset`].
    ///
    /// # Safety
    /// As [`BoundObject::get_by_offset`].
    #[inline]
    pub unsafe fn get_by_offset_mut<F>(&mut self, offset: usize) -> &mut F {
        unsafe { &mut *(self.ptr.add(offset) as *mut F) }
    }

    /// Invoke the method `name`, resolving the overload by argument count.
    ///
    /// Arguments are passed as a tuple (`()`, `(a,)`, `(a, b)`, …) and are
    /// boxed and converted like any dynamic call; the result converts back
    /// to `R` with the same rules.
    pub fn call<R: Clone + 'static>(
        &mut self,
        name: &str,
        args: impl IntoArgs,
    ) -> ReflectResult<R> {
        let table =
            self.record
                .find_method(name)
                .ok_or_else(|| ReflectError::MethodNotFound {
                    type_name: self.record.name().to_string(),
                    method: name.to_string(),
                    available: self.record.method_names_owned(),
                })?;
        let args = args.into_args();
        let method = table
            .by_arity(args.len())
            .ok_or_else(|| ReflectError::SignatureMismatch {
                method: name.to_string(),
                expected: table.expected_signatures(),
                actual: render_args(&args),
            })?;
        let result =
            method
                .invoke_erased(self.ptr, &args)
                .map_err(|_| ReflectError::SignatureMismatch {
                    method: name.to_string(),
                    expected: method.param_signature(),
                    actual: render_args(&args),
                })?;
        result.convert_to::<R>()
    }

    /// Re-bind a class-typed property as a bound object of its own type.
    pub fn project(&mut self, name: &str) -> ReflectResult<BoundObject<'_>> {
        let field = self.field(name)?;
        let record = registry()
            .lookup_token(field.token())
            .ok_or_else(|| ReflectError::TypeNotRegistered(field.type_name().to_string()))?;
        Ok(BoundObject::from_raw(record, unsafe {
            self.ptr.add(field.offset())
        }))
    }

    /// View a sequential-container property through the uniform adapter.
    pub fn sequence(&mut self, name: &str) -> ReflectResult<SequenceView<'_>> {
        let field = self.field(name)?;
        let ops = field.sequence.ok_or_else(|| ReflectError::BadCast {
            expected: "sequential container".to_string(),
            actual: format!("{} ({})", field.type_name(), field.kind()),
        })?;
        Ok(SequenceView::new(ops, unsafe {
            self.ptr.add(field.offset())
        }))
    }

    /// View an associative-container property through the uniform adapter.
    pub fn map(&mut self, name: &str) -> ReflectResult<MapView<'_>> {
        let field = self.field(name)?;
        let ops = field.map.ok_or_else(|| ReflectError::BadCast {
            expected: "associative container".to_string(),
            actual: format!("{} ({})", field.type_name(), field.kind()),
        })?;
        Ok(MapView::new(ops, unsafe { self.ptr.add(field.offset()) }))
    }

    /// Borrow the whole object as `T`.
    pub fn as_ref<T: 'static>(&self) -> ReflectResult<&T> {
        if self.record.token() != TypeId::of::<T>() {
            return Err(ReflectError::BadCast {
                expected: self.record.name().to_string(),
                actual: ident::type_name_of::<T>(),
            });
        }
        Ok(unsafe { &*(self.ptr as *const T) })
    }

    /// Mutably borrow the whole object as `T`.
    pub fn as_mut<T: 'static>(&mut self) -> ReflectResult<&mut T> {
        if self.record.token() != TypeId::of::<T>() {
            return Err(ReflectError::BadCast {
                expected: self.record.name().to_string(),
                actual: ident::type_name_of::<T>(),
            });
        }
        Ok(unsafe { &mut *(self.ptr as *mut T) })
    }
}
