//! Descriptors created after load.

use std::collections::BTreeSet;

use pretty_assertions::assert_eq;
use typelink::abi::{Addr, IMethodDef, ImageBuilder, NameDef, TypeDef, TypeOff};
use typelink::Runtime;

use crate::common::{load, program};

#[test]
fn allocated_interface_refers_back_into_a_module() {
    let rt = Runtime::default();
    let m = load(&rt, "m", 0x10_0000, program);
    let p = m.handles;

    let mut b = ImageBuilder::new();
    let s = b.name(NameDef::new("interface { String() string }"));
    let method = b.extern_name(m.name_addr(p.string_method));
    let sig = b.extern_type(m.placement.type_addr(p.to_string));
    let iface = b.add(TypeDef::interface(
        s,
        None,
        vec![IMethodDef {
            name: method,
            typ: sig,
        }],
    ));
    let alloc = rt.allocate(b).unwrap();

    let t = rt.type_at(alloc.type_addr(iface)).unwrap();
    assert!(rt.module_containing(t.addr()).is_none());
    assert_eq!(t.string(), "interface { String() string }");
    assert_eq!(t.name(), "");
    assert_eq!(t.pkg_path(), "");

    let methods: Vec<_> = t.as_interface().unwrap().methods().collect();
    assert_eq!(methods.len(), 1);
    assert_eq!(methods[0].name().name(), "String");
    assert_eq!(methods[0].typ(), Some(m.ty(&rt, p.to_string)));

    // Each offset in the new descriptor is a registry id.
    let ids = [
        t.str_off().raw(),
        methods[0].name_off().raw(),
        methods[0].typ_off().raw(),
    ];
    assert_eq!(ids.iter().copied().collect::<BTreeSet<_>>().len(), 3);
    assert_eq!(rt.object_count(), 3);
}

#[test]
fn registry_ids_start_at_one_and_increase() {
    let rt = Runtime::default();
    let ids: Vec<i32> = (0..5u64)
        .map(|i| rt.register_object(Addr::new(0x7f00_0000_0000 + i * 8)))
        .collect();
    assert_eq!(ids, [1, 2, 3, 4, 5]);

    // Registering again hands back the same id.
    assert_eq!(rt.register_object(Addr::new(0x7f00_0000_0010)), 3);
    assert_eq!(rt.object_count(), 5);
}

#[test]
fn ids_resolve_from_any_unowned_context() {
    let rt = Runtime::default();
    let m = load(&rt, "m", 0x10_0000, program);
    let counter = m.ty(&rt, m.handles.counter);
    let id = rt.register_object(counter.addr());

    for ctx in [Addr::new(0x8000_0000), rt.config().arena_base] {
        let t = rt.resolve_type_off(ctx, TypeOff::new(id)).unwrap();
        assert_eq!(t, counter);
    }
}

#[test]
fn concurrent_registration_hands_out_distinct_ids() {
    let rt = Runtime::default();
    let ids: Vec<i32> = std::thread::scope(|s| {
        let workers: Vec<_> = (0..4u64)
            .map(|w| {
                let rt = &rt;
                s.spawn(move || {
                    (0..64u64)
                        .map(|i| rt.register_object(Addr::new(0x1_0000_0000 + (w * 64 + i) * 8)))
                        .collect::<Vec<i32>>()
                })
            })
            .collect();
        workers
            .into_iter()
            .flat_map(|h| h.join().unwrap())
            .collect()
    });

    let unique: BTreeSet<i32> = ids.iter().copied().collect();
    assert_eq!(unique.len(), 256);
    assert_eq!(unique.first(), Some(&1));
    assert_eq!(unique.last(), Some(&256));
}

#[test]
fn allocations_can_refer_to_earlier_allocations() {
    let rt = Runtime::default();
    let m = load(&rt, "m", 0x10_0000, program);

    let mut first = ImageBuilder::new();
    let s = first.name(NameDef::new("[]*pkg.Counter"));
    let elem = first.extern_type(m.placement.type_addr(m.handles.counter_ptr));
    let slice = first.add(TypeDef::slice(s, elem));
    let first = rt.allocate(first).unwrap();

    let mut second = ImageBuilder::new();
    let s = second.name(NameDef::new("*[]*pkg.Counter"));
    let elem = second.extern_type(first.type_addr(slice));
    let ptr = second.add(TypeDef::ptr(s, elem));
    let second = rt.allocate(second).unwrap();

    let t = rt.type_at(second.type_addr(ptr)).unwrap();
    let inner = t.as_ptr().unwrap().elem();
    assert_eq!(inner.string(), "[]*pkg.Counter");
    assert_eq!(
        inner.as_slice().unwrap().elem(),
        m.ty(&rt, m.handles.counter_ptr)
    );
}
