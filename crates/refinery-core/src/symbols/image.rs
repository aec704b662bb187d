//! Binary image parsing and DWARF section loading.

use std::borrow::Cow;
use std::collections::HashMap;
use std::fs;
use std::path::Path;
use std::sync::Arc;

use gimli::{Dwarf, EndianArcSlice, RunTimeEndian, SectionId};
use object::{Object, ObjectSection};
use tracing::debug;

use crate::error::{RefineryError, RefineryResult};

pub(crate) type OwnedReader = EndianArcSlice<RunTimeEndian>;
pub(crate) type OwnedDwarf = Dwarf<OwnedReader>;

/// Canonical section name and the names it goes by in ELF and Mach-O files.
const DWARF_SECTIONS: &[(&str, &[&str])] = &[
    (".debug_abbrev", &[".debug_abbrev", "__debug_abbrev"]),
    (".debug_addr", &[".debug_addr", "__debug_addr"]),
    (".debug_info", &[".debug_info", "__debug_info"]),
    (".debug_line", &[".debug_line", "__debug_line"]),
    (".debug_line_str", &[".debug_line_str", "__debug_line_str"]),
    (".debug_ranges", &[".debug_ranges", "__debug_ranges"]),
    (".debug_rnglists", &[".debug_rnglists", "__debug_rnglists"]),
    (".debug_str", &[".debug_str", "__debug_str"]),
    (".debug_str_offsets", &[".debug_str_offsets", "__debug_str_offs"]),
    (".debug_types", &[".debug_types", "__debug_types"]),
    (".debug_loc", &[".debug_loc", "__debug_loc"]),
    (".debug_loclists", &[".debug_loclists", "__debug_loclists"]),
    (".debug_cu_index", &[".debug_cu_index"]),
    (".debug_tu_index", &[".debug_tu_index"]),
];

/// The DWARF sections of one binary, keyed by canonical ELF name.
#[derive(Debug, Clone)]
pub struct DebugSections
{
    endian: RunTimeEndian,
    sections: HashMap<&'static str, Arc<[u8]>>,
}

impl DebugSections
{
    /// Read the DWARF sections of the ELF or Mach-O file at `path`.
    ///
    /// Compressed sections are decompressed. Missing sections load as empty.
    ///
    /// ## Errors
    ///
    /// [`RefineryError::Io`] if the file cannot be read and
    /// [`RefineryError::InvalidFormat`] if it is not an object file.
    pub fn load(path: &Path) -> RefineryResult<Self>
    {
        let bytes = fs::read(path)?;
        let file = object::File::parse(&*bytes)
            .map_err(|err| RefineryError::InvalidFormat(format!("failed to parse {}: {err}", path.display())))?;

        let endian = if file.is_little_endian() {
            RunTimeEndian::Little
        } else {
            RunTimeEndian::Big
        };

        let mut sections = HashMap::new();
        for (canonical, aliases) in DWARF_SECTIONS {
            if let Some(data) = load_section_bytes(&file, aliases)? {
                sections.insert(*canonical, data);
            }
        }

        debug!(path = %path.display(), sections = sections.len(), "loaded debug sections");
        Ok(Self { endian, sections })
    }

    /// Wrap section bytes that were obtained some other way, e.g. written in
    /// memory by a DWARF producer. Keys are canonical names such as
    /// `.debug_info`.
    pub fn from_sections(sections: HashMap<&'static str, Arc<[u8]>>, endian: RunTimeEndian) -> Self
    {
        Self { endian, sections }
    }

    pub fn endian(&self) -> RunTimeEndian
    {
        self.endian
    }

    /// Whether the binary carries any type information at all.
    pub fn has_debug_info(&self) -> bool
    {
        [".debug_info", ".debug_types"]
            .iter()
            .any(|name| self.sections.get(name).is_some_and(|data| !data.is_empty()))
    }

    pub(crate) fn load_dwarf(&self) -> RefineryResult<OwnedDwarf>
    {
        Dwarf::load(|section| Ok::<_, gimli::Error>(self.section_reader(section)))
            .map_err(|err| map_dwarf_error("loading DWARF", err))
    }

    fn section_reader(&self, id: SectionId) -> OwnedReader
    {
        let data = self
            .sections
            .get(id.name())
            .cloned()
            .unwrap_or_else(|| Arc::<[u8]>::from(Vec::new()));
        EndianArcSlice::new(data, self.endian)
    }
}

fn load_section_bytes(file: &object::File<'_>, names: &[&str]) -> RefineryResult<Option<Arc<[u8]>>>
{
    for name in names {
        if let Some(section) = file.section_by_name(name) {
            let data = section
                .uncompressed_data()
                .map_err(|err| RefineryError::InvalidFormat(format!("failed to read {name}: {err}")))?;
            return Ok(Some(match data {
                Cow::Borrowed(bytes) => Arc::<[u8]>::from(bytes),
                Cow::Owned(vec) => vec.into(),
            }));
        }
    }

    Ok(None)
}

pub(crate) fn map_dwarf_error(context: &str, err: gimli::Error) -> RefineryError
{
    RefineryError::Dwarf(format!("{context}: {err}"))
}
