use std::collections::{BTreeSet, HashMap};
use std::mem::offset_of;

use specular::{FieldKind, Variant, register, type_of};

#[derive(Default)]
struct Inventory {
    counts: Vec<i32>,
    labels: Vec<String>,
    scores: HashMap<String, i32>,
    tags: BTreeSet<String>,
}

fn register_inventory() {
    register::<Inventory>()
        .property::<Vec<i32>>("counts", offset_of!(Inventory, counts))
        .property::<Vec<String>>("labels", offset_of!(Inventory, labels))
        .property::<HashMap<String, i32>>("scores", offset_of!(Inventory, scores))
        .property::<BTreeSet<String>>("tags", offset_of!(Inventory, tags))
        .default_constructor();
}

#[test]
fn categories_are_detected_at_registration() {
    register_inventory();
    let ty = type_of::<Inventory>().unwrap();
    let record = ty.record();
    assert_eq!(
        record.find_field("counts").unwrap().kind(),
        FieldKind::Sequential
    );
    assert!(record.find_field("scores").unwrap().kind().is_associative());
    assert!(record.find_field("tags").unwrap().kind().is_associative());
}

#[test]
fn sequential_walk() {
    register_inventory();
    let mut inv = Inventory {
        counts: vec![1, 2, 3],
        ..Default::default()
    };
    let ty = type_of::<Inventory>().unwrap();
    let mut bound = ty.bind(&mut inv).unwrap();
    let mut seq = bound.sequence("counts").unwrap();

    assert_eq!(seq.len(), 3);
    assert!(!seq.is_empty());
    assert_eq!(seq.elem_type_name(), "i32");

    let walked: Vec<i32> = seq.iter().map(|v| v.cloned::<i32>().unwrap()).collect();
    assert_eq!(walked, vec![1, 2, 3]);

    seq.push(Variant::of(4i32)).unwrap();
    assert_eq!(seq.get(3).unwrap().cloned::<i32>().unwrap(), 4);
    assert_eq!(seq.len(), 4);

    assert!(seq.pop());
    assert_eq!(seq.len(), 3);

    drop(seq);
    drop(bound);
    assert_eq!(inv.counts, vec![1, 2, 3]);
}

#[test]
fn push_converts_or_reports() {
    register_inventory();
    let mut inv = Inventory::default();
    let ty = type_of::<Inventory>().unwrap();
    let mut bound = ty.bind(&mut inv).unwrap();
    let mut seq = bound.sequence("counts").unwrap();

    // Numeric conversion applies on the way in.
    seq.push(Variant::of(7.9f64)).unwrap();
    assert_eq!(seq.get(0).unwrap().cloned::<i32>().unwrap(), 7);

    assert!(seq.push(Variant::of(String::from("nope"))).is_err());
    assert_eq!(seq.len(), 1);
}

#[test]
fn element_views_write_in_place() {
    register_inventory();
    let mut inv = Inventory {
        labels: vec![String::from("ore"), String::from("gem")],
        ..Default::default()
    };
    let ty = type_of::<Inventory>().unwrap();
    let mut bound = ty.bind(&mut inv).unwrap();
    let mut seq = bound.sequence("labels").unwrap();

    {
        let mut elem = seq.at(1).unwrap();
        assert_eq!(elem.as_variant().cloned::<String>().unwrap(), "gem");
        *elem.get_mut::<String>().unwrap() = String::from("ruby");
    }
    assert!(seq.at(5).is_none());

    drop(seq);
    drop(bound);
    assert_eq!(inv.labels[1], "ruby");
}

#[test]
fn map_access_and_iteration() {
    register_inventory();
    let mut inv = Inventory::default();
    inv.scores.insert(String::from("a"), 1);
    let ty = type_of::<Inventory>().unwrap();
    let mut bound = ty.bind(&mut inv).unwrap();
    let mut map = bound.map("scores").unwrap();

    assert_eq!(map.len(), 1);
    assert!(!map.is_set_like());

    // &str keys convert to the String key type.
    map.insert(Variant::of("b"), Variant::of(2i32)).unwrap();
    assert_eq!(map.len(), 2);
    assert!(map.contains(&Variant::of("a")));
    assert_eq!(
        map.get(&Variant::of("b")).unwrap().unwrap().cloned::<i32>().unwrap(),
        2
    );
    assert!(map.get(&Variant::of("zz")).unwrap().is_none());

    let mut pairs: Vec<(String, i32)> = Vec::new();
    map.for_each(|k, v| {
        pairs.push((k.cloned::<String>().unwrap(), v.cloned::<i32>().unwrap()));
    });
    pairs.sort();
    assert_eq!(pairs, vec![(String::from("a"), 1), (String::from("b"), 2)]);

    assert!(map.remove(&Variant::of("a")).unwrap());
    assert!(!map.remove(&Variant::of("a")).unwrap());
    assert_eq!(map.len(), 1);

    map.clear();
    assert!(map.is_empty());
}

#[test]
fn sets_expose_keys_as_values() {
    register_inventory();
    let mut inv = Inventory::default();
    let ty = type_of::<Inventory>().unwrap();
    let mut bound = ty.bind(&mut inv).unwrap();
    let mut set = bound.map("tags").unwrap();

    assert!(set.is_set_like());
    set.insert(Variant::of("fire"), Variant::empty()).unwrap();
    set.insert(Variant::of("ice"), Variant::empty()).unwrap();
    assert_eq!(set.len(), 2);
    assert!(set.contains(&Variant::of("fire")));

    let mut seen = Vec::new();
    set.for_each(|k, v| {
        // Value equals key for set-like containers.
        assert_eq!(
            k.cloned::<String>().unwrap(),
            v.cloned::<String>().unwrap()
        );
        seen.push(k.cloned::<String>().unwrap());
    });
    seen.sort();
    assert_eq!(seen, vec![String::from("fire"), String::from("ice")]);
}

#[test]
fn non_container_fields_reject_views() {
    #[derive(Default)]
    struct Plain {
        x: i32,
    }
    register::<Plain>().property::<i32>("x", offset_of!(Plain, x));

    let ty = type_of::<Plain>().unwrap();
    let mut obj = Plain::default();
    let mut bound = ty.bind(&mut obj).unwrap();
    assert!(bound.sequence("x").is_err());
    assert!(bound.map("x").is_err());
}

#[test]
fn element_views_bind_registered_types() {
    #[derive(Default, Clone)]
    struct Cell {
        v: i32,
    }
    specular::reflect_class!(Cell);

    #[derive(Default)]
    struct Grid {
        cells: Vec<Cell>,
    }

    register::<Cell>()
        .property::<i32>("v", offset_of!(Cell, v))
        .default_constructor();
    register::<Grid>().property::<Vec<Cell>>("cells", offset_of!(Grid, cells));

    let mut grid = Grid {
        cells: vec![Cell { v: 3 }],
    };
    let ty = type_of::<Grid>().unwrap();
    let mut bound = ty.bind(&mut grid).unwrap();
    let mut seq = bound.sequence("cells").unwrap();

    {
        let elem = seq.at(0).unwrap();
        let mut cell = elem.bind().unwrap();
        assert_eq!(*cell.get::<i32>("v").unwrap(), 3);
        cell.set("v", 8i32).unwrap();
    }

    drop(seq);
    drop(bound);
    assert_eq!(grid.cells[0].v, 8);
}
