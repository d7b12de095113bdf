//! Fluent type registration.
//!
//! [`register`] returns a [`TypeBuilder`] whose chained calls attach
//! properties, methods, constructors, and base links to the type's record.
//! Registering an already-known name adopts the existing record, so
//! registration of one type can be split across call sites; every chained
//! operation is append-only and idempotent per name/signature.
//!
//! ```rust
//! use std::mem::offset_of;
//!
//! #[derive(Default)]
//! struct Point {
//!     x: i32,
//!     y: i32,
//! }
//!
//! impl Point {
//!     fn len2(&self) -> i32 {
//!         self.x * self.x + self.y * self.y
//!     }
//! }
//!
//! specular::register::<Point>()
//!     .property::<i32>("x", offset_of!(Point, x))
//!     .property::<i32>("y", offset_of!(Point, y))
//!     .method("len2", Point::len2)
//!     .default_constructor();
//! ```

use std::any::TypeId;
use std::marker::PhantomData;
use std::sync::Arc;

use log::warn;
use smallvec::{SmallVec, smallvec};

use crate::handle::TypeHandle;
use crate::ident;
use crate::meta::method::{FactoryFn, Invoker, call_arg, render_signature};
use crate::meta::{FactoryRecord, FieldRecord, MethodRecord, ParamSpec, TypeRecord};
use crate::reflect::Reflect;
use crate::registry::registry;
use crate::variant::Variant;

/// Start (or resume) registration of `T`.
pub fn register<T: 'static>() -> TypeBuilder<T> {
    let name = ident::type_name_of::<T>();
    let (record, fresh) = registry().register(name, size_of::<T>(), TypeId::of::<T>());
    TypeBuilder {
        record,
        fresh,
        _marker: PhantomData,
    }
}

/// Chainable registration handle for one type.
pub struct TypeBuilder<T: 'static> {
    record: &'static TypeRecord,
    fresh: bool,
    _marker: PhantomData<fn() -> T>,
}

impl<T: 'static> TypeBuilder<T> {
    /// False when this builder adopted a record registered earlier.
    #[inline]
    pub fn newly_registered(&self) -> bool {
        self.fresh
    }

    #[inline]
    pub fn record(&self) -> &'static TypeRecord {
        self.record
    }

    #[inline]
    pub fn handle(&self) -> TypeHandle {
        TypeHandle::from_record(self.record)
    }

    /// Register a property of type `F` at `offset` bytes from the object
    /// base. Pair with [`core::mem::offset_of!`]:
    ///
    /// ```rust,ignore
    /// .property::<i32>("x", offset_of!(Point, x))
    /// ```
    ///
    /// Re-registering an existing property name is a no-op.
    pub fn property<F: Reflect + Clone>(self, name: &str, offset: usize) -> Self {
        debug_assert!(
            offset + size_of::<F>() <= size_of::<T>(),
            "property '{name}' does not fit inside {}",
            self.record.name()
        );
        self.record.push_field(FieldRecord::for_value::<F>(name, offset));
        self
    }

    /// Register a method. Accepts plain function items and closures of the
    /// shape `Fn(&T, args…) -> R` (recorded as const) or
    /// `Fn(&mut T, args…) -> R`, up to four parameters. Overloads are
    /// collected under one name and resolved by argument count at call
    /// time.
    pub fn method<M, F: MethodSig<T, M>>(self, name: &str, f: F) -> Self {
        let (ret_token, ret_type_name) = F::return_spec();
        self.record.push_method(MethodRecord::new(
            name,
            F::param_specs(),
            ret_token,
            ret_type_name,
            F::IS_CONST,
            f.into_invoker(),
        ));
        self
    }

    /// Register a constructor from a factory function `Fn(args…) -> T` with
    /// up to four parameters. The nullary factory also becomes the default
    /// constructor used by name-only creation.
    pub fn constructor<M, F: CtorSig<T, M>>(self, f: F) -> Self {
        let params = F::param_specs();
        let signature = render_signature(params.iter().map(|p| p.type_name()));
        self.record.push_factory(FactoryRecord {
            signature,
            params,
            produce: f.into_factory(),
        });
        self
    }

    /// Shorthand for registering `T::default` as the nullary constructor.
    pub fn default_constructor(self) -> Self
    where
        T: Default,
    {
        self.constructor(T::default)
    }

    /// Merge an embedded base type's record into this one.
    ///
    /// `B` must already be registered, and `offset` is the byte offset of
    /// the embedded `B` inside `T` (zero when it is the first field;
    /// `offset_of!` in general). Base properties are re-published with
    /// shifted offsets and base methods with a shifted receiver; entries
    /// already registered on the derived record win. Bases of `B` are
    /// carried over transitively.
    pub fn base<B: 'static>(self, offset: usize) -> Self {
        let token = TypeId::of::<B>();
        self.record.push_base(token);
        let Some(base) = registry().lookup_token(token) else {
            warn!(
                "base type '{}' of '{}' is not registered; nothing merged",
                ident::type_name_of::<B>(),
                self.record.name()
            );
            return self;
        };

        for field in base.fields_snapshot() {
            if !self.record.has_field(&field.name) {
                let mut merged = field.clone();
                merged.offset += offset;
                self.record.push_field(merged);
            }
        }

        for table in base.methods_snapshot() {
            let overloads: Vec<&'static MethodRecord> =
                table.overloads.read().iter().copied().collect();
            for method in overloads {
                let overridden = self
                    .record
                    .find_method(&table.name)
                    .map(|t| t.has_arity(method.arity()))
                    .unwrap_or(false);
                if overridden {
                    continue;
                }
                let mut merged = method.clone();
                if offset != 0 {
                    let inner = method.invoker.clone();
                    merged.invoker = Arc::new(move |obj: *mut u8, args: &[Variant]| {
                        (inner.as_ref())(obj.wrapping_add(offset), args)
                    });
                }
                self.record.push_method(merged);
            }
        }

        for inherited in base.base_tokens() {
            self.record.push_base(inherited);
        }
        self
    }
}

// ---------------------------------------------------------------------------
// Invoker synthesis
// ---------------------------------------------------------------------------

/// Marker for methods taking `&T`.
pub struct ConstReceiver;
/// Marker for methods taking `&mut T`.
pub struct MutReceiver;

/// Callables registrable as methods of `T`. Implemented for functions and
/// closures over `&T`/`&mut T` receivers with up to four extra parameters;
/// the marker type disambiguates the shapes for inference.
pub trait MethodSig<T, Marker>: Send + Sync + 'static {
    const IS_CONST: bool;

    fn param_specs() -> SmallVec<[ParamSpec; 4]>;
    fn return_spec() -> (TypeId, String);
    fn into_invoker(self) -> Invoker;
}

macro_rules! impl_method_sig {
    ($(($A:ident, $a:ident)),*) => {
        impl<T, R, Fun, $($A),*> MethodSig<T, (ConstReceiver, R $(, $A)*)> for Fun
        where
            T: 'static,
            R: Clone + 'static,
            $($A: Clone + 'static,)*
            Fun: Fn(&T $(, $A)*) -> R + Send + Sync + 'static,
        {
            const IS_CONST: bool = true;

            fn param_specs() -> SmallVec<[ParamSpec; 4]> {
                smallvec![$(ParamSpec::of::<$A>()),*]
            }

            fn return_spec() -> (TypeId, String) {
                (TypeId::of::<R>(), ident::type_name_of::<R>())
            }

            #[allow(unused_variables, unused_mut, unused_assignments)]
            fn into_invoker(self) -> Invoker {
                Arc::new(move |obj: *mut u8, args: &[Variant]| {
                    let mut index = 0usize;
                    $(
                        let $a: $A = call_arg::<$A>(args, index)?;
                        index += 1;
                    )*
                    let receiver = unsafe { &*(obj as *const T) };
                    Ok(Variant::of((self)(receiver $(, $a)*)))
                })
            }
        }

        impl<T, R, Fun, $($A),*> MethodSig<T, (MutReceiver, R $(, $A)*)> for Fun
        where
            T: 'static,
            R: Clone + 'static,
            $($A: Clone + 'static,)*
            Fun: Fn(&mut T $(, $A)*) -> R + Send + Sync + 'static,
        {
            const IS_CONST: bool = false;

            fn param_specs() -> SmallVec<[ParamSpec; 4]> {
                smallvec![$(ParamSpec::of::<$A>()),*]
            }

            fn return_spec() -> (TypeId, String) {
                (TypeId::of::<R>(), ident::type_name_of::<R>())
            }

            #[allow(unused_variables, unused_mut, unused_assignments)]
            fn into_invoker(self) -> Invoker {
                Arc::new(move |obj: *mut u8, args: &[Variant]| {
                    let mut index = 0usize;
                    $(
                        let $a: $A = call_arg::<$A>(args, index)?;
                        index += 1;
                    )*
                    let receiver = unsafe { &mut *(obj as *mut T) };
                    Ok(Variant::of((self)(receiver $(, $a)*)))
                })
            }
        }
    };
}

impl_method_sig!();
impl_method_sig!((A0, a0));
impl_method_sig!((A0, a0), (A1, a1));
impl_method_sig!((A0, a0), (A1, a1), (A2, a2));
impl_method_sig!((A0, a0), (A1, a1), (A2, a2), (A3, a3));

/// Callables registrable as constructors of `T`: `Fn(args…) -> T` with up
/// to four parameters.
pub trait CtorSig<T, Marker>: Send + Sync + 'static {
    fn param_specs() -> SmallVec<[ParamSpec; 4]>;
    fn into_factory(self) -> FactoryFn;
}

macro_rules! impl_ctor_sig {
    ($(($A:ident, $a:ident)),*) => {
        impl<T, Fun, $($A),*> CtorSig<T, ($($A,)*)> for Fun
        where
            T: 'static,
            $($A: Clone + 'static,)*
            Fun: Fn($($A),*) -> T + Send + Sync + 'static,
        {
            fn param_specs() -> SmallVec<[ParamSpec; 4]> {
                smallvec![$(ParamSpec::of::<$A>()),*]
            }

            #[allow(unused_variables, unused_mut, unused_assignments)]
            fn into_factory(self) -> FactoryFn {
                Arc::new(move |args: &[Variant]| {
                    let mut index = 0usize;
                    $(
                        let $a: $A = call_arg::<$A>(args, index)?;
                        index += 1;
                    )*
                    Ok(Box::new((self)($($a),*)) as Box<dyn std::any::Any>)
                })
            }
        }
    };
}

impl_ctor_sig!();
impl_ctor_sig!((A0, a0));
impl_ctor_sig!((A0, a0), (A1, a1));
impl_ctor_sig!((A0, a0), (A1, a1), (A2, a2));
impl_ctor_sig!((A0, a0), (A1, a1), (A2, a2), (A3, a3));
