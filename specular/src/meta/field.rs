//! Field (property) metadata.

use std::any::TypeId;

use strum::{Display, EnumIs};

use crate::container::{MapOps, SequenceOps};
use crate::ident;
use crate::reflect::Reflect;
use crate::variant::Variant;

/// Category of a property value, recorded once at registration.
///
/// Runtime paths switch on the category, never on the concrete type.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, EnumIs, Display)]
pub enum FieldKind {
    /// Arithmetic types, `bool`, `char`.
    Primitive,
    /// User-defined structs and `String`.
    Class,
    /// User-defined enums.
    Enum,
    /// Sequential containers (`Vec`, `VecDeque`, `SmallVec`).
    Sequential,
    /// Associative containers (maps and sets).
    Associative,
}

/// Metadata for one registered property.
///
/// The byte offset is computed once at registration; every later read is a
/// single pointer add. Records are cloned (with an adjusted offset) when a
/// base type's properties are merged into a derived record.
#[derive(Clone)]
pub struct FieldRecord {
    pub(crate) name: String,
    pub(crate) hash: u64,
    pub(crate) offset: usize,
    pub(crate) token: TypeId,
    pub(crate) type_name: String,
    pub(crate) kind: FieldKind,
    pub(crate) read: unsafe fn(*const u8) -> Variant,
    pub(crate) write: unsafe fn(*mut u8, Variant) -> Result<(), Variant>,
    pub(crate) sequence: Option<&'static SequenceOps>,
    pub(crate) map: Option<&'static MapOps>,
}

impl FieldRecord {
    pub(crate) fn for_value<F: Reflect + Clone>(name: &str, offset: usize) -> FieldRecord {
        FieldRecord {
            name: name.to_string(),
            hash: ident::name_hash(name),
            offset,
            token: F::token(),
            type_name: F::type_name(),
            kind: F::KIND,
            read: read_field::<F>,
            write: write_field::<F>,
            sequence: F::sequence_ops(),
            map: F::map_ops(),
        }
    }

    #[inline]
    pub fn name(&self) -> &str {
        &self.name
    }

    #[inline]
    pub fn offset(&self) -> usize {
        self.offset
    }

    #[inline]
    pub fn token(&self) -> TypeId {
        self.token
    }

    #[inline]
    pub fn type_name(&self) -> &str {
        &self.type_name
    }

    #[inline]
    pub fn kind(&self) -> FieldKind {
        self.kind
    }
}

unsafe fn read_field<F: Reflect + Clone>(p: *const u8) -> Variant {
    unsafe { Variant::of((*(p as *const F)).clone()) }
}

unsafe fn write_field<F: Reflect + Clone>(p: *mut u8, value: Variant) -> Result<(), Variant> {
    let converted = match value.take::<F>() {
        Ok(v) => v,
        Err(value) => match value.convert_to::<F>() {
            Ok(v) => v,
            Err(_) => return Err(value),
        },
    };
    unsafe { *(p as *mut F) = converted };
    Ok(())
}
