//! Type names and name hashing.
//!
//! Every lookup in the engine is keyed either by [`std::any::TypeId`] or by a
//! *short type name*: the compiler-provided type path with every module
//! prefix stripped, including inside generic argument lists
//! (`alloc::vec::Vec<alloc::string::String>` becomes `Vec<String>`).
//! Short names are what registration stores, what [`crate::type_named`]
//! matches, and what error messages print.
//!
//! Hashing is seedless and process-stable ([`fxhash`]), so a hash computed at
//! one call site can be reused as a precomputed key at any other.

use std::any::{TypeId, type_name};

/// Stable hash of a type or member name.
///
/// The same string hashes to the same value at every call site in a process,
/// which is what allows pre-hashed lookups to short-circuit string handling
/// on hot paths.
#[inline]
pub fn name_hash(name: &str) -> u64 {
    fxhash::hash64(name.as_bytes())
}

/// Stable hash of a type token, used by the thread-local lookup caches.
#[inline]
pub(crate) fn token_hash(token: TypeId) -> u64 {
    fxhash::hash64(&token)
}

/// The short display name of `T`.
///
/// Example:
/// ```rust
/// assert_eq!(specular::ident::type_name_of::<Vec<String>>(), "Vec<String>");
/// ```
pub fn type_name_of<T: ?Sized + 'static>() -> String {
    short_name(type_name::<T>())
}

/// Strip module paths from a fully-qualified type path.
///
/// Works segment-wise so paths nested in generic arguments, tuples, and
/// references are shortened as well.
pub fn short_name(full: &str) -> String {
    let mut out = String::with_capacity(full.len());
    // Start of the identifier currently being copied; "::" rewinds to it.
    let mut segment = 0;
    let mut chars = full.chars().peekable();
    while let Some(c) = chars.next() {
        match c {
            ':' => {
                if chars.peek() == Some(&':') {
                    chars.next();
                }
                out.truncate(segment);
            }
            '<' | '>' | '(' | ')' | '[' | ']' | ',' | ';' | ' ' | '&' | '*' | '\'' => {
                out.push(c);
                segment = out.len();
            }
            _ => out.push(c),
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn plain_paths_are_stripped() {
        assert_eq!(short_name("alloc::string::String"), "String");
        assert_eq!(short_name("i32"), "i32");
        assert_eq!(short_name("specular::ident::tests::Local"), "Local");
    }

    #[test]
    fn generic_arguments_are_stripped_too() {
        assert_eq!(short_name("alloc::vec::Vec<alloc::string::String>"), "Vec<String>");
        assert_eq!(
            short_name("std::collections::HashMap<alloc::string::String, i64>"),
            "HashMap<String, i64>"
        );
    }

    #[test]
    fn references_and_tuples() {
        assert_eq!(short_name("&alloc::string::String"), "&String");
        assert_eq!(short_name("(i32, alloc::string::String)"), "(i32, String)");
        assert_eq!(short_name("dyn core::any::Any"), "dyn Any");
    }

    #[test]
    fn hash_is_stable_across_call_sites() {
        let a = name_hash(&type_name_of::<Vec<String>>());
        let b = name_hash(&type_name_of::<Vec<String>>());
        assert_eq!(a, b);
    }
}
