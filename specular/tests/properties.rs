use std::mem::offset_of;

use specular::{ReflectError, register, type_of};

#[derive(Default)]
struct Sample {
    a: i32,
    b: f32,
    c: String,
}

fn register_sample() {
    register::<Sample>()
        .property::<i32>("a", offset_of!(Sample, a))
        .property::<f32>("b", offset_of!(Sample, b))
        .property::<String>("c", offset_of!(Sample, c))
        .default_constructor();
}

#[test]
fn primitive_round_trip() {
    register_sample();
    let ty = type_of::<Sample>().unwrap();
    let mut obj = Sample::default();
    let mut bound = ty.bind(&mut obj).unwrap();

    bound.set("a", 42i32).unwrap();
    bound.set("b", 3.25f32).unwrap();
    bound.set("c", String::from("hi")).unwrap();

    assert_eq!(*bound.get::<i32>("a").unwrap(), 42);
    assert_eq!(*bound.get::<f32>("b").unwrap(), 3.25);
    assert_eq!(bound.get::<String>("c").unwrap(), "hi");

    drop(bound);
    assert_eq!(obj.a, 42);
    assert_eq!(obj.c, "hi");
}

#[test]
fn offsets_are_stable_across_lookups() {
    register_sample();
    let ty = type_of::<Sample>().unwrap();
    for name in ["a", "b", "c"] {
        let first = ty.property_offset(name).unwrap();
        let second = ty.property_offset(name).unwrap();
        assert_eq!(first, second);
    }
    assert_eq!(ty.property_offset("a").unwrap(), offset_of!(Sample, a));
    assert_eq!(ty.property_offset("c").unwrap(), offset_of!(Sample, c));
}

#[test]
fn offset_path_matches_name_path() {
    register_sample();
    let ty = type_of::<Sample>().unwrap();
    let mut obj = Sample {
        a: 7,
        b: 1.5,
        c: String::new(),
    };
    let mut bound = ty.bind(&mut obj).unwrap();
    bound.set("a", 1234i32).unwrap();

    let offset = bound.property_offset("a").unwrap();
    let by_offset = unsafe { *bound.get_by_offset::<i32>(offset) };
    assert_eq!(by_offset, *bound.get::<i32>("a").unwrap());
}

#[test]
fn name_enumeration_covers_registration() {
    register_sample();
    let ty = type_of::<Sample>().unwrap();
    let mut names = ty.property_names();
    names.sort_unstable();
    assert_eq!(names, vec!["a", "b", "c"]);
    assert!(ty.has_property("b"));
    assert!(!ty.has_property("z"));
}

#[test]
fn missing_property_lists_available_names() {
    register_sample();
    let ty = type_of::<Sample>().unwrap();
    let mut obj = Sample::default();
    let bound = ty.bind(&mut obj).unwrap();

    let err = bound.get::<i32>("z").unwrap_err();
    match err {
        ReflectError::PropertyNotFound {
            type_name,
            property,
            mut available,
        } => {
            assert_eq!(type_name, "Sample");
            assert_eq!(property, "z");
            available.sort_unstable();
            assert_eq!(available, vec!["a", "b", "c"]);
        }
        other => panic!("expected PropertyNotFound, got {other:?}"),
    }
}

#[test]
fn type_mismatch_reports_expected_and_actual() {
    register_sample();
    let ty = type_of::<Sample>().unwrap();
    let mut obj = Sample::default();
    let bound = ty.bind(&mut obj).unwrap();

    let err = bound.get::<u64>("a").unwrap_err();
    match err {
        ReflectError::PropertyTypeMismatch {
            property,
            expected,
            actual,
        } => {
            assert_eq!(property, "a");
            assert_eq!(expected, "i32");
            assert_eq!(actual, "u64");
        }
        other => panic!("expected PropertyTypeMismatch, got {other:?}"),
    }
}

#[test]
fn property_handles_skip_lookup() {
    register_sample();
    let ty = type_of::<Sample>().unwrap();
    let handle = ty.property_handle::<i32>("a").unwrap();
    assert_eq!(handle.offset(), offset_of!(Sample, a));

    let mut obj = Sample::default();
    for i in 0..1000 {
        handle.set(&mut obj, i);
    }
    assert_eq!(*handle.get(&obj), 999);
    assert_eq!(obj.a, 999);

    // Wrong value type never yields a handle.
    assert!(ty.property_handle::<f64>("a").is_none());
    assert!(ty.property_handle::<i32>("nope").is_none());
}

mod nested {
    use super::*;

    #[derive(Default, Clone)]
    struct Inner {
        k: i32,
    }
    specular::reflect_class!(Inner);

    #[derive(Default)]
    struct Outer {
        tag: u8,
        inner: Inner,
    }

    fn register_nested() {
        register::<Inner>()
            .property::<i32>("k", offset_of!(Inner, k))
            .default_constructor();
        register::<Outer>()
            .property::<u8>("tag", offset_of!(Outer, tag))
            .property::<Inner>("inner", offset_of!(Outer, inner));
    }

    #[test]
    fn nested_object_handles_write_through() {
        register_nested();
        let ty = type_of::<Outer>().unwrap();
        let mut outer = Outer::default();
        outer.inner.k = 7;

        {
            let mut bound = ty.bind(&mut outer).unwrap();
            let mut inner = bound.project("inner").unwrap();
            assert_eq!(inner.type_name(), "Inner");
            assert_eq!(*inner.get::<i32>("k").unwrap(), 7);
            inner.set("k", 9i32).unwrap();
        }

        assert_eq!(outer.inner.k, 9);
    }
}
