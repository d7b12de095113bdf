//! # specular: runtime type reflection over fixed memory layouts
//!
//! `specular` lets application code register class-like metadata (fields,
//! methods, constructors, base embeddings) at program start, then at
//! runtime look types up by name or by compile-time identity, instantiate
//! them, read and write fields by string name, invoke methods with
//! type-erased argument lists, and enumerate members — while keeping
//! string-keyed access close to the cost of direct field access. It is the
//! substrate for serializers, scripting bridges, editors, and
//! entity-component systems that must work generically against types they
//! have never seen.
//!
//! At a high level the crate offers three access tiers:
//!
//! - The typed hot path: [`type_of`] / [`type_named`] produce a
//!   [`TypeHandle`]; binding an object yields a [`BoundObject`] whose reads
//!   are a hashed lookup through a per-record inline cache plus one pointer
//!   add. [`PropertyHandle`] and [`MethodHandle`] pre-resolve a member so a
//!   hot loop pays pointer arithmetic only.
//! - The dynamic path: [`Instance`] creates and manipulates objects purely
//!   by registered name, trafficking in [`Variant`] boxes — the route for
//!   callers with no compile-time type parameters at all.
//! - The container adapters: fields holding `Vec`, maps, or sets are walked
//!   and mutated uniformly through [`SequenceView`] and [`MapView`].
//!
//! ## Quick start
//!
//! ```rust
//! use std::mem::offset_of;
//! use specular::{Instance, Variant, register, type_of};
//!
//! #[derive(Default)]
//! struct Monster {
//!     hp: i32,
//!     name: String,
//! }
//!
//! impl Monster {
//!     fn heal(&mut self, amount: i32) -> i32 {
//!         self.hp += amount;
//!         self.hp
//!     }
//!
//!     fn describe(&self) -> String {
//!         format!("{} ({} hp)", self.name, self.hp)
//!     }
//! }
//!
//! register::<Monster>()
//!     .property::<i32>("hp", offset_of!(Monster, hp))
//!     .property::<String>("name", offset_of!(Monster, name))
//!     .method("heal", Monster::heal)
//!     .method("describe", Monster::describe)
//!     .default_constructor();
//!
//! // Typed hot path.
//! let ty = type_of::<Monster>().unwrap();
//! let mut m = Monster { hp: 10, name: "slime".into() };
//! let mut bound = ty.bind(&mut m).unwrap();
//! assert_eq!(*bound.get::<i32>("hp").unwrap(), 10);
//! let hp: i32 = bound.call("heal", (5,)).unwrap();
//! assert_eq!(hp, 15);
//!
//! // Name-only dynamic path.
//! let mut inst = Instance::create("Monster").unwrap();
//! inst.set_property("name", Variant::of(String::from("goblin"))).unwrap();
//! let desc = inst.invoke("describe", &[]).unwrap();
//! assert_eq!(desc.get::<String>().unwrap(), "goblin (0 hp)");
//! ```
//!
//! ## Design notes
//!
//! - Registration is explicit and append-only, intended to complete during
//!   single-threaded program initialisation; afterwards every query path is
//!   read-only and lock-free on a cache hit.
//! - Field offsets come from [`core::mem::offset_of!`], are recorded once,
//!   and never recomputed: every subsequent read is `base + offset`.
//! - Metadata lives in leaked, process-lifetime records; there is no
//!   teardown and no unregistration.
//! - Method overloads registered under one name are resolved by argument
//!   count; the boxing layer applies a small set of implicit conversions
//!   (numeric widening/narrowing, `&'static str` to `String`).

pub mod bound;
pub mod builder;
pub mod container;
pub mod error;
pub mod handle;
pub mod ident;
pub mod instance;
pub mod meta;
pub mod reflect;
pub mod registry;
pub mod variant;

pub use bound::BoundObject;
pub use builder::{TypeBuilder, register};
pub use container::{ElemView, MapLike, MapView, Sequence, SequenceView};
pub use error::{ReflectError, ReflectResult};
pub use handle::{
    MethodHandle, PropertyHandle, TypeHandle, type_named, type_named_or_err, type_of,
};
pub use instance::{DynamicMethod, DynamicProperty, Instance};
pub use meta::{FieldKind, FieldRecord, MethodRecord, TypeRecord};
pub use reflect::Reflect;
pub use registry::{TypeManager, registry};
pub use variant::{IntoArgs, Variant};
