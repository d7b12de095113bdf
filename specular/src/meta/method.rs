//! Method metadata and the type-erased invocation layer.

use std::any::{Any, TypeId};
use std::sync::Arc;

use smallvec::SmallVec;

use crate::ident;
use crate::variant::Variant;

/// Type-erased method body: `(object pointer, boxed arguments) -> boxed
/// result`. Stored behind an `Arc` so base-class merging can republish an
/// overload with a shifted receiver without re-registering it.
pub(crate) type Invoker =
    Arc<dyn Fn(*mut u8, &[Variant]) -> Result<Variant, CallFailure> + Send + Sync>;

/// Type-erased constructor: boxed arguments in, owned erased object out.
pub(crate) type FactoryFn =
    Arc<dyn Fn(&[Variant]) -> Result<Box<dyn Any>, CallFailure> + Send + Sync>;

/// Failure raised inside an erased invoker or factory, before or during
/// argument conversion. Callers translate it into a full signature-mismatch
/// error with the surrounding context attached.
#[derive(Debug, Clone)]
pub(crate) struct CallFailure {
    pub(crate) index: usize,
    pub(crate) expected: String,
    pub(crate) actual: String,
}

/// One parameter of a method or constructor signature.
#[derive(Debug, Clone)]
pub struct ParamSpec {
    pub(crate) token: TypeId,
    pub(crate) type_name: String,
}

impl ParamSpec {
    pub(crate) fn of<A: 'static>() -> ParamSpec {
        ParamSpec {
            token: TypeId::of::<A>(),
            type_name: ident::type_name_of::<A>(),
        }
    }

    #[inline]
    pub fn token(&self) -> TypeId {
        self.token
    }

    #[inline]
    pub fn type_name(&self) -> &str {
        &self.type_name
    }
}

/// Metadata for one method overload.
#[derive(Clone)]
pub struct MethodRecord {
    pub(crate) name: String,
    pub(crate) hash: u64,
    pub(crate) params: SmallVec<[ParamSpec; 4]>,
    pub(crate) ret_token: TypeId,
    pub(crate) ret_type_name: String,
    pub(crate) is_const: bool,
    pub(crate) invoker: Invoker,
}

impl MethodRecord {
    pub(crate) fn new(
        name: &str,
        params: SmallVec<[ParamSpec; 4]>,
        ret_token: TypeId,
        ret_type_name: String,
        is_const: bool,
        invoker: Invoker,
    ) -> MethodRecord {
        MethodRecord {
            name: name.to_string(),
            hash: ident::name_hash(name),
            params,
            ret_token,
            ret_type_name,
            is_const,
            invoker,
        }
    }

    #[inline]
    pub fn name(&self) -> &str {
        &self.name
    }

    #[inline]
    pub fn arity(&self) -> usize {
        self.params.len()
    }

    #[inline]
    pub fn is_const(&self) -> bool {
        self.is_const
    }

    #[inline]
    pub fn params(&self) -> &[ParamSpec] {
        &self.params
    }

    #[inline]
    pub fn return_token(&self) -> TypeId {
        self.ret_token
    }

    #[inline]
    pub fn return_type_name(&self) -> &str {
        &self.ret_type_name
    }

    /// Parameter list rendered as `(a, b, c)`.
    pub fn param_signature(&self) -> String {
        render_signature(self.params.iter().map(|p| p.type_name.as_str()))
    }

    /// Full signature rendered as `(a, b) -> r`.
    pub fn signature(&self) -> String {
        format!("{} -> {}", self.param_signature(), self.ret_type_name)
    }

    pub(crate) fn invoke_erased(
        &self,
        obj: *mut u8,
        args: &[Variant],
    ) -> Result<Variant, CallFailure> {
        (self.invoker.as_ref())(obj, args)
    }
}

/// Convert the argument at `index` to the parameter type `A`, applying the
/// implicit conversions of [`Variant::convert_to`].
pub(crate) fn call_arg<A: Clone + 'static>(
    args: &[Variant],
    index: usize,
) -> Result<A, CallFailure> {
    let value = &args[index];
    value.convert_to::<A>().map_err(|_| CallFailure {
        index,
        expected: ident::type_name_of::<A>(),
        actual: value.type_name_or_empty(),
    })
}

/// Render the types of actual arguments as `(a, b)`, for mismatch errors.
pub(crate) fn render_args(args: &[Variant]) -> String {
    render_signature(args.iter().map(|v| v.type_name_or_empty()))
}

pub(crate) fn render_signature<S: AsRef<str>>(parts: impl Iterator<Item = S>) -> String {
    let mut out = String::from("(");
    for (i, part) in parts.enumerate() {
        if i > 0 {
            out.push_str(", ");
        }
        out.push_str(part.as_ref());
    }
    out.push(')');
    out
}
