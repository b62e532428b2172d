//! Module fixtures for the linking tests.
//!
//! [`program`] emits the types of a small package `example/pkg`; loading it
//! into several modules models the same package linked into several
//! independently built binaries.

use std::sync::Arc;

use typelink::abi::{
    Addr, FieldDef, IMethodDef, ImageBuilder, Kind, MethodDef, NameDef, NameHandle, Placement,
    TextOff, TypeDef, TypeHandle, TypeOff, UncommonDef,
};
use typelink::{Module, Runtime, Type};

pub const PKG: &str = "example/pkg";

pub struct Loaded<T> {
    pub module: Arc<Module>,
    pub placement: Placement,
    pub handles: T,
}

impl<T> Loaded<T> {
    /// The module's own descriptor for `h`, bypassing any override map.
    pub fn ty<'rt>(&self, rt: &'rt Runtime, h: TypeHandle) -> Type<'rt> {
        rt.type_at(self.placement.type_addr(h)).unwrap()
    }

    /// `h` resolved by offset from this module, override map included.
    pub fn resolve<'rt>(&self, rt: &'rt Runtime, h: TypeHandle) -> Type<'rt> {
        let delta = self
            .placement
            .type_addr(h)
            .offset_from(self.module.types())
            .unwrap();
        let off = TypeOff::new(i32::try_from(delta).unwrap());
        rt.resolve_type_off(self.module.types(), off).unwrap()
    }

    pub fn name_addr(&self, h: NameHandle) -> Addr {
        self.placement.name_addr(h)
    }
}

pub fn load<T>(
    rt: &Runtime,
    name: &str,
    base: u64,
    build: impl FnOnce(&mut ImageBuilder) -> T,
) -> Loaded<T> {
    let mut b = ImageBuilder::new();
    let handles = build(&mut b);
    let image = b.finish(Addr::new(base)).unwrap();
    let placement = image.placement().clone();
    let module = rt.add_module(Module::from_image(name, image)).unwrap();
    Loaded {
        module,
        placement,
        handles,
    }
}

/// Handles of the types [`program`] emits.
#[derive(Copy, Clone, Debug)]
pub struct Program {
    pub int: TypeHandle,
    pub string: TypeHandle,
    pub ints: TypeHandle,
    pub counter: TypeHandle,
    pub counter_ptr: TypeHandle,
    pub add: TypeHandle,
    pub to_string: TypeHandle,
    pub stringer: TypeHandle,
    pub index: TypeHandle,
    /// Name record of the `String` method.
    pub string_method: NameHandle,
}

impl Program {
    pub fn types(&self) -> [TypeHandle; 9] {
        [
            self.int,
            self.string,
            self.ints,
            self.counter,
            self.counter_ptr,
            self.add,
            self.to_string,
            self.stringer,
            self.index,
        ]
    }
}

/// ```text
/// package pkg
///
/// type Counter struct {
///     Count int `json:"count"`
///     next  *Counter
/// }
///
/// func (c *Counter) Add(...int) int
///
/// type Stringer interface { String() string }
///
/// var index map[string]*Counter
/// ```
pub fn program(b: &mut ImageBuilder) -> Program {
    let pkg = b.name(NameDef::new(PKG));
    let s_int = b.name(NameDef::new("int"));
    let s_string = b.name(NameDef::new("string"));
    let s_ints = b.name(NameDef::new("[]int"));
    let s_counter = b.name(NameDef::new("*pkg.Counter"));
    let s_add = b.name(NameDef::new("func(...int) int"));
    let s_to_string = b.name(NameDef::new("func() string"));
    let s_stringer = b.name(NameDef::new("pkg.Stringer"));
    let s_index = b.name(NameDef::new("map[string]*pkg.Counter"));
    let count = b.name(
        NameDef::new("Count")
            .exported()
            .with_tag("json:\"count\"")
            .with_pkg_path(pkg),
    );
    let next = b.name(NameDef::new("next").with_pkg_path(pkg));
    let add_name = b.name(NameDef::new("Add").exported());
    let string_method = b.name(NameDef::new("String").exported());

    let int = b.add(TypeDef::basic(Kind::Int, s_int).named().with_size(8, 8));
    let string = b.add(TypeDef::basic(Kind::String, s_string).named().with_size(16, 8));
    let ints = b.add(TypeDef::slice(s_ints, int));
    let add = b.add(TypeDef::func(s_add, vec![ints], vec![int], true));
    let to_string = b.add(TypeDef::func(s_to_string, vec![], vec![string], false));

    let counter = b.declare();
    let counter_ptr = b.add(
        TypeDef::ptr(s_counter, counter).with_uncommon(UncommonDef::new(Some(pkg)).with_methods(
            vec![MethodDef {
                name: add_name,
                typ: Some(add),
                ifn: TextOff::NONE,
                tfn: TextOff::NONE,
            }],
            1,
        )),
    );
    // `*pkg.Counter` and `pkg.Counter` share one string with an extra star.
    b.define(
        counter,
        TypeDef::structure(
            s_counter,
            Some(pkg),
            vec![FieldDef::new(count, int, 0), FieldDef::new(next, counter_ptr, 8)],
        )
        .named()
        .extra_star()
        .with_size(16, 8)
        .with_ptr_to_this(counter_ptr)
        .with_uncommon(UncommonDef::new(Some(pkg))),
    )
    .unwrap();

    let stringer = b.add(
        TypeDef::interface(
            s_stringer,
            Some(pkg),
            vec![IMethodDef {
                name: string_method,
                typ: to_string,
            }],
        )
        .named()
        .with_uncommon(UncommonDef::new(Some(pkg))),
    );
    let index = b.add(TypeDef::map(s_index, string, counter_ptr));

    Program {
        int,
        string,
        ints,
        counter,
        counter_ptr,
        add,
        to_string,
        stringer,
        index,
        string_method,
    }
}
