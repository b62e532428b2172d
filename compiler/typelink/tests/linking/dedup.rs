//! Cross-module deduplication.

use pretty_assertions::assert_eq;
use typelink::abi::{Kind, NameDef, TypeDef};
use typelink::{LinkStats, Runtime};

use crate::common::{load, program};

#[test]
fn every_module_resolves_to_the_first_definition() {
    let rt = Runtime::default();
    let a = load(&rt, "a", 0x10_0000, program);
    let b = load(&rt, "b", 0x20_0000, program);
    let c = load(&rt, "c", 0x30_0000, program);

    let typelinks = a.handles.types().len();
    assert_eq!(
        rt.link_types(),
        LinkStats {
            modules_linked: 2,
            typelinks: 2 * typelinks,
            redirected: 2 * typelinks,
        }
    );

    for later in [&b, &c] {
        for (ha, hl) in a.handles.types().into_iter().zip(later.handles.types()) {
            let canonical = a.ty(&rt, ha);
            let resolved = later.resolve(&rt, hl);
            assert_eq!(resolved.addr(), canonical.addr(), "{}", canonical);
            assert_ne!(later.ty(&rt, hl).addr(), canonical.addr());
        }
    }
}

#[test]
fn first_module_keeps_its_own_descriptors() {
    let rt = Runtime::default();
    let a = load(&rt, "a", 0x10_0000, program);
    load(&rt, "b", 0x20_0000, program);
    rt.link_types();

    assert!(a.module.typemap().is_none());
    for h in a.handles.types() {
        assert_eq!(a.resolve(&rt, h), a.ty(&rt, h));
    }
}

#[test]
fn types_unique_to_a_module_stay_local() {
    let rt = Runtime::default();
    let a = load(&rt, "a", 0x10_0000, program);
    let b = load(&rt, "b", 0x20_0000, |b| {
        let p = program(b);
        let s = b.name(NameDef::new("pkg.Gauge"));
        let gauge = b.add(TypeDef::basic(Kind::Float64, s).named().with_size(8, 8));
        (p, gauge)
    });

    let stats = rt.link_types();
    assert_eq!(stats.redirected, a.handles.types().len());
    let (_, gauge) = b.handles;
    assert_eq!(b.resolve(&rt, gauge), b.ty(&rt, gauge));
    assert_eq!(b.resolve(&rt, gauge).string(), "pkg.Gauge");
}

#[test]
fn equality_is_reflexive_and_symmetric_across_modules() {
    let rt = Runtime::default();
    let a = load(&rt, "a", 0x10_0000, program);
    let b = load(&rt, "b", 0x20_0000, program);

    for (ha, hb) in a.handles.types().into_iter().zip(b.handles.types()) {
        let (ta, tb) = (a.ty(&rt, ha), b.ty(&rt, hb));
        assert!(rt.types_equal(ta, ta));
        assert!(rt.types_equal(ta, tb), "{ta}");
        assert!(rt.types_equal(tb, ta), "{tb}");
    }
    assert!(!rt.types_equal(
        a.ty(&rt, a.handles.counter),
        b.ty(&rt, b.handles.counter_ptr)
    ));
}

#[test]
fn modules_loaded_after_a_link_are_linked_next_time() {
    let rt = Runtime::default();
    let a = load(&rt, "a", 0x10_0000, program);
    load(&rt, "b", 0x20_0000, program);
    assert_eq!(rt.link_types().modules_linked, 1);

    let late = load(&rt, "late", 0x30_0000, program);
    assert!(late.module.typemap().is_none());
    assert_eq!(rt.link_types().modules_linked, 1);
    assert_eq!(
        late.resolve(&rt, late.handles.stringer),
        a.ty(&rt, a.handles.stringer)
    );
}

#[test]
fn linked_runtime_resolves_from_many_threads() {
    let rt = Runtime::default();
    let a = load(&rt, "a", 0x10_0000, program);
    let b = load(&rt, "b", 0x20_0000, program);
    rt.link_types();

    let expected: Vec<_> = a.handles.types().map(|h| a.ty(&rt, h).addr()).to_vec();
    std::thread::scope(|s| {
        for _ in 0..4 {
            s.spawn(|| {
                let got: Vec<_> = b
                    .handles
                    .types()
                    .map(|h| b.resolve(&rt, h).addr())
                    .to_vec();
                assert_eq!(got, expected);
            });
        }
    });
}

#[test]
fn canonical_views_follow_their_own_pointers() {
    let rt = Runtime::default();
    let a = load(&rt, "a", 0x10_0000, program);
    let b = load(&rt, "b", 0x20_0000, program);
    rt.link_types();

    // Raw pointer fields are not rewritten; the canonical descriptor's own
    // fields point into the first module.
    let counter = b.resolve(&rt, b.handles.counter);
    let next = counter.as_struct().unwrap().fields().nth(1).unwrap();
    assert_eq!(next.typ(), a.ty(&rt, a.handles.counter_ptr));
    assert_eq!(counter.ptr_to_this(), Some(a.ty(&rt, a.handles.counter_ptr)));
}
