//! Name records, declared names and package paths.

use pretty_assertions::assert_eq;
use typelink::abi::{encode_name, NameParts};
use typelink::Runtime;

use crate::common::{load, program, PKG};

#[test]
fn count_field_round_trips_through_the_resolver() {
    let rt = Runtime::default();
    let m = load(&rt, "m", 0x10_0000, program);
    let counter = m.ty(&rt, m.handles.counter);
    let count = counter.as_struct().unwrap().fields().next().unwrap().name();

    assert_eq!(count.name(), "Count");
    assert_eq!(count.tag(), "json:\"count\"");
    assert!(count.is_exported());
    assert_eq!(count.pkg_path(), PKG);

    // The stored record is exactly what the codec produces for these parts.
    let record = count.record();
    let encoded = encode_name(&NameParts {
        name: "Count",
        tag: Some("json:\"count\""),
        exported: true,
        pkg_path: record.pkg_path_off(),
    })
    .unwrap();
    let stored = rt.bytes_at(count.addr()).unwrap();
    assert_eq!(&stored[..encoded.len()], encoded.as_slice());
}

#[test]
fn unexported_field_names_carry_their_package() {
    let rt = Runtime::default();
    let m = load(&rt, "m", 0x10_0000, program);
    let counter = m.ty(&rt, m.handles.counter);
    let next = counter.as_struct().unwrap().fields().nth(1).unwrap();
    assert_eq!(next.name().name(), "next");
    assert!(!next.name().is_exported());
    assert_eq!(next.name().tag(), "");
    assert_eq!(next.name().pkg_path(), PKG);
    assert_eq!(next.offset(), 8);
}

#[test]
fn declared_names() {
    let rt = Runtime::default();
    let m = load(&rt, "m", 0x10_0000, program);
    let p = m.handles;

    let counter = m.ty(&rt, p.counter);
    assert_eq!(counter.string(), "pkg.Counter");
    assert_eq!(counter.name(), "Counter");
    assert_eq!(counter.to_string(), "pkg.Counter");

    // Unnamed types have no declared name.
    assert_eq!(m.ty(&rt, p.counter_ptr).string(), "*pkg.Counter");
    assert_eq!(m.ty(&rt, p.counter_ptr).name(), "");
    assert_eq!(m.ty(&rt, p.ints).name(), "");

    // Without a package qualifier the whole string is the name.
    assert_eq!(m.ty(&rt, p.int).name(), "int");
    assert_eq!(m.ty(&rt, p.stringer).name(), "Stringer");
}

#[test]
fn package_paths() {
    let rt = Runtime::default();
    let m = load(&rt, "m", 0x10_0000, program);
    let p = m.handles;
    assert_eq!(m.ty(&rt, p.counter).pkg_path(), PKG);
    assert_eq!(m.ty(&rt, p.stringer).pkg_path(), PKG);
    assert_eq!(m.ty(&rt, p.counter_ptr).pkg_path(), PKG);
    assert_eq!(m.ty(&rt, p.index).pkg_path(), "");
    assert_eq!(m.ty(&rt, p.int).pkg_path(), "");
}

#[test]
fn methods_and_variadic_signature() {
    let rt = Runtime::default();
    let m = load(&rt, "m", 0x10_0000, program);
    let ptr = m.ty(&rt, m.handles.counter_ptr);

    let methods: Vec<_> = ptr.uncommon().unwrap().exported_methods().collect();
    assert_eq!(methods.len(), 1);
    assert_eq!(methods[0].name().name(), "Add");

    let sig = methods[0].typ().unwrap();
    assert_eq!(sig, m.ty(&rt, m.handles.add));
    let f = sig.as_func().unwrap();
    assert!(f.is_variadic());
    assert_eq!(f.in_count(), 1);
    assert_eq!(f.out_count(), 1);
    assert_eq!(f.results().len(), 1);
    assert_eq!(f.params().next().unwrap().string(), "[]int");

    let index = m.ty(&rt, m.handles.index).as_map().unwrap();
    assert_eq!(index.key().string(), "string");
    assert_eq!(index.elem(), ptr);
}
