use specular::Variant;

#[test]
fn small_values_stay_inline() {
    assert!(Variant::of(42i32).is_inline());
    assert!(Variant::of(3.5f64).is_inline());
    assert!(Variant::of(true).is_inline());
    assert!(Variant::of([0u8; 16]).is_inline());
    assert!(Variant::of((1i64, 2i64)).is_inline());
}

#[test]
fn large_or_overaligned_values_go_to_heap() {
    assert!(!Variant::of([0u8; 17]).is_inline());
    assert!(!Variant::of(String::from("heap me")).is_inline()); // String is 24 bytes
    assert!(!Variant::of(vec![1, 2, 3]).is_inline());
}

#[test]
fn clone_semantics_match_across_storage() {
    let inline = Variant::of(7i32);
    let inline2 = inline.clone();
    assert_eq!(*inline.get::<i32>().unwrap(), 7);
    assert_eq!(*inline2.get::<i32>().unwrap(), 7);

    let heap = Variant::of(String::from("shared"));
    let heap2 = heap.clone();
    drop(heap);
    assert_eq!(heap2.get::<String>().unwrap(), "shared");
}

#[test]
fn moves_preserve_the_value() {
    let a = Variant::of(String::from("carried"));
    let b = a;
    assert_eq!(b.get::<String>().unwrap(), "carried");

    let c = Variant::of(99u8);
    let d = c;
    assert_eq!(*d.get::<u8>().unwrap(), 99);
}

#[test]
fn typed_access_and_mismatch() {
    let mut v = Variant::of(10i32);
    assert!(v.is::<i32>());
    assert!(!v.is::<i64>());
    assert!(v.try_ref::<String>().is_none());
    *v.try_mut::<i32>().unwrap() = 11;
    assert_eq!(v.cloned::<i32>().unwrap(), 11);
    assert!(v.get::<f32>().is_err());
}

#[test]
fn clear_empties_the_box() {
    let mut v = Variant::of(String::from("gone"));
    assert!(v.is_valid());
    v.clear();
    assert!(!v.is_valid());
    assert!(v.token().is_none());
    assert_eq!(v.size(), 0);
}

#[test]
fn numeric_conversions_are_conservative() {
    let int = Variant::of(300i32);
    assert_eq!(int.convert_to::<i64>().unwrap(), 300);
    assert_eq!(int.convert_to::<u16>().unwrap(), 300);
    assert_eq!(int.convert_to::<f64>().unwrap(), 300.0);
    // Narrowing wraps like an `as` cast.
    assert_eq!(int.convert_to::<u8>().unwrap(), 44);

    let float = Variant::of(2.75f32);
    assert_eq!(float.convert_to::<f64>().unwrap(), 2.75);
    assert_eq!(float.convert_to::<i32>().unwrap(), 2); // truncates toward zero

    let flag = Variant::of(true);
    assert_eq!(flag.convert_to::<i32>().unwrap(), 1);

    assert!(Variant::of(String::from("nope")).convert_to::<i32>().is_err());
}

#[test]
fn str_literals_convert_to_string() {
    let v = Variant::of("borrowed");
    assert!(v.is::<&'static str>());
    assert_eq!(v.convert_to::<String>().unwrap(), "borrowed");
}

#[test]
fn default_is_empty() {
    let v = Variant::default();
    assert!(!v.is_valid());
    assert!(!v.is_inline());
    assert!(v.convert_to::<i32>().is_err());
}
