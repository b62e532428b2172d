//! Loaded modules.

use std::sync::OnceLock;

use rustc_hash::FxHashMap;
use typelink_abi::{Addr, Image, TypeOff};

/// Per-module override map filled by the deduplicator: typelinks offset to
/// canonical descriptor.
pub type TypeMap = FxHashMap<TypeOff, Addr>;

/// One independently relocated slice of a module's code.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub struct TextSection {
    /// Start of the section as an offset into the whole text.
    pub vaddr: u64,
    pub length: u64,
    /// Relocated address of the section.
    pub base: Addr,
}

impl TextSection {
    /// Translate a text offset falling inside `[vaddr, vaddr + length)`.
    pub fn translate(&self, off: u64) -> Option<Addr> {
        let rel = off.checked_sub(self.vaddr)?;
        if rel < self.length {
            self.base.checked_add(rel)
        } else {
            None
        }
    }
}

/// Where a module's code lives.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct CodeLayout {
    pub text: Addr,
    pub etext: Addr,
    /// Empty or single-section layouts resolve against `text` directly.
    pub sections: Vec<TextSection>,
}

impl CodeLayout {
    pub fn new(text: Addr, etext: Addr) -> Self {
        Self {
            text,
            etext,
            sections: Vec::new(),
        }
    }

    #[must_use]
    pub fn with_section(mut self, section: TextSection) -> Self {
        self.sections.push(section);
        self
    }
}

/// A module's type section and the tables that describe it.
///
/// The section bytes are pinned for the rest of the process: descriptors are
/// handed out as views that borrow them for as long as the runtime lives.
pub struct Module {
    name: String,
    types: Addr,
    /// `None` when the section would run past the top of the address space.
    end: Option<Addr>,
    data: &'static [u8],
    typelinks: Vec<TypeOff>,
    code: Option<CodeLayout>,
    typemap: OnceLock<TypeMap>,
}

impl Module {
    /// A module whose type section starts at `types` and holds `bytes`.
    pub fn new(
        name: impl Into<String>,
        types: Addr,
        bytes: Vec<u8>,
        typelinks: Vec<TypeOff>,
    ) -> Self {
        let end = types.checked_add(bytes.len() as u64);
        Self {
            name: name.into(),
            types,
            end,
            data: Box::leak(bytes.into_boxed_slice()),
            typelinks,
            code: None,
            typemap: OnceLock::new(),
        }
    }

    /// A module built from an emitted image, laid out at the image's base.
    pub fn from_image(name: impl Into<String>, image: Image) -> Self {
        let base = image.base();
        let (bytes, typelinks, _) = image.into_parts();
        Self::new(name, base, bytes, typelinks)
    }

    #[must_use]
    pub fn with_code(mut self, code: CodeLayout) -> Self {
        self.code = Some(code);
        self
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Start of the type section.
    pub fn types(&self) -> Addr {
        self.types
    }

    /// One past the end of the type section.
    ///
    /// Saturates for a section that wraps the address space; the runtime
    /// never loads such a module.
    pub fn etypes(&self) -> Addr {
        self.end.unwrap_or(Addr::new(u64::MAX))
    }

    pub(crate) fn checked_etypes(&self) -> Option<Addr> {
        self.end
    }

    pub fn data(&self) -> &'static [u8] {
        self.data
    }

    pub fn typelinks(&self) -> &[TypeOff] {
        &self.typelinks
    }

    pub fn code(&self) -> Option<&CodeLayout> {
        self.code.as_ref()
    }

    /// The override map, once the deduplicator has built it.
    pub fn typemap(&self) -> Option<&TypeMap> {
        self.typemap.get()
    }

    /// Install the override map. Returns false if one was already set.
    pub(crate) fn set_typemap(&self, map: TypeMap) -> bool {
        self.typemap.set(map).is_ok()
    }

    /// Whether `addr` lies in `[types, etypes)`.
    pub fn contains(&self, addr: Addr) -> bool {
        self.types <= addr && addr < self.etypes()
    }

    pub(crate) fn overlaps(&self, other: &Module) -> bool {
        self.types < other.etypes() && other.types < self.etypes()
    }

    /// Bytes from `addr` to the end of the section.
    pub(crate) fn bytes_from(&self, addr: Addr) -> Option<&'static [u8]> {
        let off = usize::try_from(addr.offset_from(self.types)?).ok()?;
        self.data.get(off..).filter(|rest| !rest.is_empty())
    }
}

impl std::fmt::Debug for Module {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Module")
            .field("name", &self.name)
            .field("types", &self.types)
            .field("etypes", &self.etypes())
            .field("typelinks", &self.typelinks.len())
            .field("linked", &self.typemap.get().is_some())
            .finish_non_exhaustive()
    }
}
