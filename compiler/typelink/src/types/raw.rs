use std::mem::size_of;

use typelink_abi::{layout, Addr, DecodeError};

use crate::{ResolveError, Runtime};

/// Bytes at an address, read with the owning runtime's fatal policy.
#[derive(Copy, Clone)]
pub(crate) struct Raw<'rt> {
    pub(crate) rt: &'rt Runtime,
    pub(crate) addr: Addr,
    pub(crate) bytes: &'rt [u8],
}

impl<'rt> Raw<'rt> {
    /// Bytes at `addr`; an unmapped address is fatal.
    pub(crate) fn at(rt: &'rt Runtime, addr: Addr) -> Self {
        let bytes = rt.bytes_at(addr).unwrap_or_else(|err| rt.fatal(&err));
        Self { rt, addr, bytes }
    }

    /// The view `delta` bytes further in.
    pub(crate) fn offset(self, delta: usize) -> Self {
        Self {
            rt: self.rt,
            addr: self.addr.add_bytes(delta as u64),
            bytes: self.bytes.get(delta..).unwrap_or_default(),
        }
    }

    fn read<T>(&self, off: usize, reader: fn(&[u8], usize) -> Option<T>) -> T {
        reader(self.bytes, off).unwrap_or_else(|| {
            self.rt.fatal(&ResolveError::Malformed {
                addr: self.addr,
                source: DecodeError::Truncated {
                    needed: off.saturating_add(size_of::<T>()),
                    available: self.bytes.len(),
                },
            })
        })
    }

    pub(crate) fn u8(&self, off: usize) -> u8 {
        self.read(off, layout::read_u8)
    }

    pub(crate) fn u16(&self, off: usize) -> u16 {
        self.read(off, layout::read_u16)
    }

    pub(crate) fn u32(&self, off: usize) -> u32 {
        self.read(off, layout::read_u32)
    }

    pub(crate) fn i32(&self, off: usize) -> i32 {
        self.read(off, layout::read_i32)
    }

    pub(crate) fn u64(&self, off: usize) -> u64 {
        self.read(off, layout::read_u64)
    }

    pub(crate) fn addr_field(&self, off: usize) -> Addr {
        Addr::new(self.u64(off))
    }

    /// Length field stored as a pointer-sized word.
    pub(crate) fn len_field(&self, off: usize) -> usize {
        let raw = self.u64(off);
        usize::try_from(raw).unwrap_or_else(|_| {
            self.rt.fatal(&ResolveError::Malformed {
                addr: self.addr,
                source: DecodeError::Truncated {
                    needed: usize::MAX,
                    available: self.bytes.len(),
                },
            })
        })
    }
}
