use std::mem::offset_of;

use specular::{ReflectError, Variant, register, type_of};

#[derive(Default)]
struct Calc {
    acc: i32,
}

impl Calc {
    fn value(&self) -> i32 {
        self.acc
    }

    fn add(&mut self, x: i32) -> i32 {
        self.acc += x;
        self.acc
    }

    fn clamp_to(&mut self, lo: i32, hi: i32) -> i32 {
        self.acc = self.acc.clamp(lo, hi);
        self.acc
    }

    fn label(&self, prefix: String) -> String {
        format!("{prefix}{}", self.acc)
    }
}

fn register_calc() {
    register::<Calc>()
        .property::<i32>("acc", offset_of!(Calc, acc))
        .method("value", Calc::value)
        .method("add", Calc::add)
        .method("clamp_to", Calc::clamp_to)
        .method("label", Calc::label)
        // Overload set: "m" with zero and one argument.
        .method("m", |_: &Calc| 1i32)
        .method("m", |_: &Calc, x: i32| x + 1)
        .default_constructor();
}

#[test]
fn const_and_mut_methods_dispatch() {
    register_calc();
    let ty = type_of::<Calc>().unwrap();
    let mut calc = Calc { acc: 10 };
    let mut bound = ty.bind(&mut calc).unwrap();

    let v: i32 = bound.call("value", ()).unwrap();
    assert_eq!(v, 10);
    let v: i32 = bound.call("add", (5,)).unwrap();
    assert_eq!(v, 15);
    let v: i32 = bound.call("clamp_to", (0, 12)).unwrap();
    assert_eq!(v, 12);

    drop(bound);
    assert_eq!(calc.acc, 12);
}

#[test]
fn overloads_resolve_by_argument_count() {
    register_calc();
    let ty = type_of::<Calc>().unwrap();
    let mut calc = Calc::default();
    let mut bound = ty.bind(&mut calc).unwrap();

    let none: i32 = bound.call("m", ()).unwrap();
    assert_eq!(none, 1);
    let one: i32 = bound.call("m", (4,)).unwrap();
    assert_eq!(one, 5);
}

#[test]
fn unmatched_arity_reports_signatures() {
    register_calc();
    let ty = type_of::<Calc>().unwrap();
    let mut calc = Calc::default();
    let mut bound = ty.bind(&mut calc).unwrap();

    let err = bound.call::<i32>("m", (1, 2)).unwrap_err();
    match err {
        ReflectError::SignatureMismatch {
            method,
            expected,
            actual,
        } => {
            assert_eq!(method, "m");
            assert!(expected.contains("()"));
            assert!(expected.contains("(i32)"));
            assert_eq!(actual, "(i32, i32)");
        }
        other => panic!("expected SignatureMismatch, got {other:?}"),
    }
}

#[test]
fn missing_method_lists_available_names() {
    register_calc();
    let ty = type_of::<Calc>().unwrap();
    let mut calc = Calc::default();
    let mut bound = ty.bind(&mut calc).unwrap();

    let err = bound.call::<i32>("frobnicate", ()).unwrap_err();
    match err {
        ReflectError::MethodNotFound {
            type_name,
            method,
            available,
        } => {
            assert_eq!(type_name, "Calc");
            assert_eq!(method, "frobnicate");
            assert!(available.iter().any(|m| m == "add"));
            assert!(available.iter().any(|m| m == "m"));
        }
        other => panic!("expected MethodNotFound, got {other:?}"),
    }
}

#[test]
fn string_literals_convert_to_string_parameters() {
    register_calc();
    let ty = type_of::<Calc>().unwrap();
    let mut calc = Calc { acc: 3 };
    let mut bound = ty.bind(&mut calc).unwrap();

    let label: String = bound.call("label", ("acc=",)).unwrap();
    assert_eq!(label, "acc=3");
}

#[test]
fn floats_truncate_into_integer_parameters() {
    register_calc();
    let ty = type_of::<Calc>().unwrap();
    let mut calc = Calc::default();
    let mut bound = ty.bind(&mut calc).unwrap();

    let v: i32 = bound.call("add", (4.9f64,)).unwrap();
    assert_eq!(v, 4);
}

#[test]
fn integer_results_widen_on_request() {
    register_calc();
    let ty = type_of::<Calc>().unwrap();
    let mut calc = Calc { acc: 21 };
    let mut bound = ty.bind(&mut calc).unwrap();

    // The method returns i32; the caller asks for i64.
    let wide: i64 = bound.call("value", ()).unwrap();
    assert_eq!(wide, 21);
}

#[test]
fn method_handles_skip_resolution() {
    register_calc();
    let ty = type_of::<Calc>().unwrap();

    let add = ty.method_handle("add", 1).unwrap();
    assert_eq!(add.name(), "add");
    assert_eq!(add.arity(), 1);
    assert!(!add.is_const());

    let mut calc = Calc::default();
    for _ in 0..100 {
        let _: i32 = add.call(&mut calc, (1,)).unwrap();
    }
    assert_eq!(calc.acc, 100);

    let value = ty.method_handle("value", 0).unwrap();
    assert!(value.is_const());
    let v: i32 = value.call(&mut calc, ()).unwrap();
    assert_eq!(v, 100);

    assert!(ty.method_handle("add", 3).is_none());
    assert!(ty.method_handle("missing", 0).is_none());
}

#[test]
fn void_methods_return_unit() {
    #[derive(Default)]
    struct Resettable {
        hits: i32,
    }

    register::<Resettable>()
        .property::<i32>("hits", offset_of!(Resettable, hits))
        .method("reset", |r: &mut Resettable| {
            r.hits = 0;
        });

    let ty = type_of::<Resettable>().unwrap();
    let mut obj = Resettable { hits: 9 };
    let mut bound = ty.bind(&mut obj).unwrap();
    bound.call::<()>("reset", ()).unwrap();
    assert_eq!(*bound.get::<i32>("hits").unwrap(), 0);
}

#[test]
fn invoke_through_variant_argument_pack() {
    register_calc();
    let ty = type_of::<Calc>().unwrap();
    let mut calc = Calc::default();
    let mut bound = ty.bind(&mut calc).unwrap();

    let args = vec![Variant::of(7i32)];
    let v: i32 = bound.call("add", args).unwrap();
    assert_eq!(v, 7);
}
