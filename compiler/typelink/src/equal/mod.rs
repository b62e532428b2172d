//! Structural type equality.
//!
//! Used only by the deduplicator, to decide whether a descriptor from a later
//! module describes the same type as one already seen. Recursive types from
//! different modules are distinct descriptor graphs with the same shape, so
//! every pair is recorded in a memo *before* its components are compared;
//! meeting the pair again on a cycle answers `true` and lets the rest of the
//! comparison decide.

use rustc_hash::FxHashSet;
use typelink_abi::{Addr, Kind};

use crate::stack::ensure_sufficient_stack;
use crate::types::{Shape, Type};
use crate::{ResolveError, Runtime};

/// Descriptor pairs already assumed equal during one comparison.
pub type EqualityMemo = FxHashSet<(Addr, Addr)>;

impl Runtime {
    /// Compare two descriptors with a fresh memo.
    pub fn types_equal(&self, t: Type<'_>, v: Type<'_>) -> bool {
        let mut seen = EqualityMemo::default();
        types_equal(t, v, &mut seen)
    }
}

/// Whether `t` and `v` describe the same type.
///
/// A kind outside the closed set reaching the per-kind comparison is fatal.
pub fn types_equal<'rt>(t: Type<'rt>, v: Type<'rt>, seen: &mut EqualityMemo) -> bool {
    ensure_sufficient_stack(|| equal(t, v, seen))
}

fn equal<'rt>(t: Type<'rt>, v: Type<'rt>, seen: &mut EqualityMemo) -> bool {
    if !seen.insert((t.addr(), v.addr())) {
        return true;
    }
    if t == v {
        return true;
    }

    let kind = t.kind();
    if kind != v.kind() {
        return false;
    }
    if t.string() != v.string() {
        return false;
    }
    match (t.uncommon(), v.uncommon()) {
        (None, None) => {}
        (Some(ut), Some(uv)) => {
            if ut.pkg_path() != uv.pkg_path() {
                return false;
            }
        }
        _ => return false,
    }
    if kind.is_numeric_or_bool() {
        return true;
    }

    match (t.shape(), v.shape()) {
        (Shape::Basic, Shape::Basic) if matches!(kind, Kind::String | Kind::UnsafePointer) => true,
        (Shape::Array(at), Shape::Array(av)) => {
            types_equal(at.elem(), av.elem(), seen) && at.len() == av.len()
        }
        (Shape::Chan(ct), Shape::Chan(cv)) => {
            ct.dir_raw() == cv.dir_raw() && types_equal(ct.elem(), cv.elem(), seen)
        }
        (Shape::Func(ft), Shape::Func(fv)) => {
            if ft.raw_out_count() != fv.raw_out_count() || ft.in_count() != fv.in_count() {
                return false;
            }
            ft.params()
                .zip(fv.params())
                .all(|(a, b)| types_equal(a, b, seen))
                && ft
                    .results()
                    .zip(fv.results())
                    .all(|(a, b)| types_equal(a, b, seen))
        }
        (Shape::Interface(it), Shape::Interface(iv)) => {
            if it.pkg_path().name() != iv.pkg_path().name() {
                return false;
            }
            if it.methods().len() != iv.methods().len() {
                return false;
            }
            it.methods().zip(iv.methods()).all(|(tm, vm)| {
                let (tname, vname) = (tm.name(), vm.name());
                tname.name() == vname.name()
                    && tname.pkg_path() == vname.pkg_path()
                    && match (tm.typ(), vm.typ()) {
                        (Some(a), Some(b)) => types_equal(a, b, seen),
                        (None, None) => true,
                        _ => false,
                    }
            })
        }
        (Shape::Map(mt), Shape::Map(mv)) => {
            types_equal(mt.key(), mv.key(), seen) && types_equal(mt.elem(), mv.elem(), seen)
        }
        (Shape::Ptr(pt), Shape::Ptr(pv)) => types_equal(pt.elem(), pv.elem(), seen),
        (Shape::Slice(st), Shape::Slice(sv)) => types_equal(st.elem(), sv.elem(), seen),
        (Shape::Struct(st), Shape::Struct(sv)) => {
            if st.fields().len() != sv.fields().len() {
                return false;
            }
            if st.pkg_path().name() != sv.pkg_path().name() {
                return false;
            }
            st.fields().zip(sv.fields()).all(|(tf, vf)| {
                let (tname, vname) = (tf.name(), vf.name());
                tname.name() == vname.name()
                    && types_equal(tf.typ(), vf.typ(), seen)
                    && tname.tag() == vname.tag()
                    && tf.offset_anon() == vf.offset_anon()
            })
        }
        _ => t.runtime().fatal(&ResolveError::ImpossibleKind {
            raw: kind.to_u8(),
        }),
    }
}
