//! Unrecoverable metadata errors.

use std::panic::{catch_unwind, AssertUnwindSafe};

use pretty_assertions::assert_eq;
use typelink::abi::{Addr, NameOff, TypeOff};
use typelink::{OffsetKind, ResolveError, Runtime};

use crate::common::{load, program};

#[test]
#[should_panic(expected = "base 0x80000000 not in ranges")]
fn unowned_context_without_registration_is_fatal() {
    let rt = Runtime::default();
    load(&rt, "m", 0x10_0000, program);
    rt.resolve_type_off(Addr::new(0x8000_0000), TypeOff::new(1));
}

#[test]
fn fatality_is_deterministic() {
    let rt = Runtime::default();
    load(&rt, "m", 0x10_0000, program);
    let message = || {
        let payload = catch_unwind(AssertUnwindSafe(|| {
            rt.resolve_name_off(Addr::new(0x8000_0000), NameOff::new(42));
        }))
        .unwrap_err();
        payload.downcast_ref::<String>().cloned().unwrap()
    };
    let first = message();
    assert_eq!(first, message());
    assert_eq!(first, "runtime: nameOff 0x2a base 0x80000000 not in ranges");
}

#[test]
fn try_variants_report_instead_of_stopping() {
    let rt = Runtime::default();
    let m = load(&rt, "m", 0x10_0000, program);
    let ctx = Addr::new(0x8000_0000);
    assert_eq!(
        rt.try_resolve_type_off(ctx, TypeOff::new(7)).unwrap_err(),
        ResolveError::NotInRanges {
            what: OffsetKind::Type,
            off: 7,
            ctx,
        }
    );

    let past_end = i32::try_from(m.module.data().len()).unwrap() + 8;
    assert!(matches!(
        rt.try_resolve_name_off(m.module.types(), NameOff::new(past_end)),
        Err(ResolveError::OutOfRange {
            what: OffsetKind::Name,
            ..
        })
    ));

    // The runtime is still usable afterwards.
    assert_eq!(m.ty(&rt, m.handles.int).string(), "int");
}

#[test]
#[should_panic(expected = "textOff")]
fn text_offset_outside_the_module_code_is_fatal() {
    let rt = Runtime::default();
    let m = load(&rt, "m", 0x10_0000, program);
    // The module was loaded without code, so no text offset resolves.
    rt.resolve_text_off(m.module.types(), typelink::abi::TextOff::NONE);
}
