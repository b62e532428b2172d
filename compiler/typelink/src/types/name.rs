use std::fmt;

use typelink_abi::{Addr, NameRecord};

use crate::Runtime;

/// A name record at a resolved address.
#[derive(Copy, Clone)]
pub struct Name<'rt> {
    rt: &'rt Runtime,
    addr: Addr,
    record: NameRecord<'rt>,
}

impl<'rt> Name<'rt> {
    pub(crate) fn new(rt: &'rt Runtime, addr: Addr, record: NameRecord<'rt>) -> Self {
        Self { rt, addr, record }
    }

    /// The absent name: empty identifier, tag and package path.
    pub(crate) fn empty(rt: &'rt Runtime) -> Self {
        Self::new(rt, Addr::NULL, NameRecord::EMPTY)
    }

    pub fn addr(&self) -> Addr {
        self.addr
    }

    pub fn is_null(&self) -> bool {
        self.addr.is_null()
    }

    pub fn record(&self) -> NameRecord<'rt> {
        self.record
    }

    pub fn name(&self) -> &'rt str {
        self.record.name()
    }

    pub fn tag(&self) -> &'rt str {
        self.record.tag()
    }

    pub fn is_exported(&self) -> bool {
        self.record.is_exported()
    }

    /// The package path, following the record's back-reference relative to
    /// the record's own address.
    pub fn pkg_path(&self) -> &'rt str {
        match self.record.pkg_path_off() {
            Some(off) => self.rt.resolve_name_off(self.addr, off).name(),
            None => "",
        }
    }
}

impl fmt::Debug for Name<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Name")
            .field("addr", &self.addr)
            .field("record", &self.record)
            .finish()
    }
}

impl fmt::Display for Name<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}
