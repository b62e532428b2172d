#![allow(clippy::unwrap_used, reason = "Tests can panic")]

//! Module fixtures for unit tests.

use std::sync::Arc;

use typelink_abi::{
    Addr, FieldDef, ImageBuilder, Kind, NameDef, Placement, TypeDef, TypeHandle, TypeOff,
    UncommonDef,
};

use crate::{Module, Runtime, Type};

pub(crate) struct Loaded<T> {
    pub(crate) module: Arc<Module>,
    pub(crate) placement: Placement,
    pub(crate) handles: T,
}

impl<T> Loaded<T> {
    pub(crate) fn ty<'rt>(&self, rt: &'rt Runtime, h: TypeHandle) -> Type<'rt> {
        rt.type_at(self.placement.type_addr(h)).unwrap()
    }

    /// Section-relative offset of a descriptor in this module.
    pub(crate) fn off(&self, h: TypeHandle) -> TypeOff {
        let delta = self
            .placement
            .type_addr(h)
            .offset_from(self.module.types())
            .unwrap();
        TypeOff::new(i32::try_from(delta).unwrap())
    }
}

/// Emit an image at `base` and load it as module `name`.
pub(crate) fn load<T>(
    rt: &Runtime,
    name: &str,
    base: u64,
    build: impl FnOnce(&mut ImageBuilder) -> T,
) -> Loaded<T> {
    load_with(rt, name, base, build, |m| m)
}

/// Like [`load`], with a chance to adjust the module before it is added.
pub(crate) fn load_with<T>(
    rt: &Runtime,
    name: &str,
    base: u64,
    build: impl FnOnce(&mut ImageBuilder) -> T,
    adjust: impl FnOnce(Module) -> Module,
) -> Loaded<T> {
    let mut b = ImageBuilder::new();
    let handles = build(&mut b);
    let image = b.finish(Addr::new(base)).unwrap();
    let placement = image.placement().clone();
    let module = rt
        .add_module(adjust(Module::from_image(name, image)))
        .unwrap();
    Loaded {
        module,
        placement,
        handles,
    }
}

pub(crate) struct ListTypes {
    pub(crate) int: TypeHandle,
    pub(crate) node: TypeHandle,
    pub(crate) ptr: TypeHandle,
}

/// `int`, `list.Node { next *Node; Val int }` and `*list.Node`.
pub(crate) fn list_types(b: &mut ImageBuilder) -> ListTypes {
    let pkg = b.name(NameDef::new("example/list"));
    let s_int = b.name(NameDef::new("int"));
    let s_node = b.name(NameDef::new("list.Node"));
    let s_ptr = b.name(NameDef::new("*list.Node"));
    let next = b.name(NameDef::new("next").with_pkg_path(pkg));
    let val = b.name(NameDef::new("Val").exported().with_tag("json:\"val\""));

    let int = b.add(TypeDef::basic(Kind::Int, s_int).with_size(8, 8));
    let node = b.declare();
    let ptr = b.add(TypeDef::ptr(s_ptr, node));
    b.define(
        node,
        TypeDef::structure(
            s_node,
            Some(pkg),
            vec![FieldDef::new(next, ptr, 0), FieldDef::new(val, int, 8)],
        )
        .named()
        .with_size(16, 8)
        .with_uncommon(UncommonDef::new(Some(pkg))),
    )
    .unwrap();
    ListTypes { int, node, ptr }
}
