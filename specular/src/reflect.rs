//! Classification of field value types.
//!
//! Registration needs to know, for every property type, which category it
//! falls into (primitive, class, enum, sequential container, associative
//! container) and how to manipulate it behind type erasure. In Rust that
//! shape information cannot be sniffed structurally at compile time, so it
//! is carried by the [`Reflect`] trait instead:
//!
//! - all arithmetic types, `bool` and `char` are provided as primitives;
//! - `String` is provided as a class;
//! - the standard containers (and [`smallvec::SmallVec`]) are provided in
//!   `container` with their erased operation tables attached;
//! - user structs and enums opt in with one line of [`reflect_class!`] or
//!   [`reflect_enum!`].

use std::any::TypeId;

use crate::container::{MapOps, SequenceOps};
use crate::ident;
use crate::meta::FieldKind;

/// A type usable as a reflected property value.
pub trait Reflect: Sized + 'static {
    /// Category stored in the field record and switched on by runtime paths.
    const KIND: FieldKind;

    #[inline]
    fn token() -> TypeId {
        TypeId::of::<Self>()
    }

    fn type_name() -> String {
        ident::type_name_of::<Self>()
    }

    /// Erased sequential-container operations, for sequential kinds only.
    fn sequence_ops() -> Option<&'static SequenceOps> {
        None
    }

    /// Erased associative-container operations, for associative kinds only.
    fn map_ops() -> Option<&'static MapOps> {
        None
    }
}

macro_rules! impl_reflect_primitive {
    ($($ty:ty),+ $(,)?) => {
        $(
            impl Reflect for $ty {
                const KIND: FieldKind = FieldKind::Primitive;
            }
        )+
    };
}

impl_reflect_primitive!(
    bool, char, i8, i16, i32, i64, i128, isize, u8, u16, u32, u64, u128, usize, f32, f64,
);

impl Reflect for String {
    const KIND: FieldKind = FieldKind::Class;
}

/// Classify one or more user types as reflected classes.
///
/// ```rust
/// #[derive(Clone, Default)]
/// struct Inner {
///     k: i32,
/// }
/// specular::reflect_class!(Inner);
/// ```
#[macro_export]
macro_rules! reflect_class {
    ($($ty:ty),+ $(,)?) => {
        $(
            impl $crate::Reflect for $ty {
                const KIND: $crate::FieldKind = $crate::FieldKind::Class;
            }
        )+
    };
}

/// Classify one or more user enums as reflected enums.
#[macro_export]
macro_rules! reflect_enum {
    ($($ty:ty),+ $(,)?) => {
        $(
            impl $crate::Reflect for $ty {
                const KIND: $crate::FieldKind = $crate::FieldKind::Enum;
            }
        )+
    };
}
