//! The part model: arena handles, part kinds, content state, and the
//! per-part relationship table.

use crate::opc::constants::{content_type as ct, relationship_type as rt};
use crate::opc::packuri::PackURI;
use bytes::Bytes;
use std::collections::BTreeMap;

/// Handle to a part in its owning package's arena.
///
/// Handles stay valid across content loads and unloads; they are only
/// invalidated by a commit, which refreshes the whole package.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct PartId(pub(crate) u32);

impl PartId {
    #[inline]
    pub(crate) fn index(self) -> usize {
        self.0 as usize
    }
}

/// The closed set of part kinds the engine distinguishes.
///
/// Anything with an unrecognized content type falls back to `Xml` (for
/// `+xml`/`/xml` types) or `Binary`, so unknown formats never block a merge.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PartKind {
    Presentation,
    Slide,
    SlideLayout,
    SlideMaster,
    NotesSlide,
    NotesMaster,
    HandoutMaster,
    Theme,
    Chart,
    Image,
    Media,
    Xml,
    Binary,
}

impl PartKind {
    /// Classify a content type string.
    pub fn from_content_type(content_type: &str) -> Self {
        match content_type {
            ct::PML_PRESENTATION_MAIN => Self::Presentation,
            ct::PML_SLIDE => Self::Slide,
            ct::PML_SLIDE_LAYOUT => Self::SlideLayout,
            ct::PML_SLIDE_MASTER => Self::SlideMaster,
            ct::PML_NOTES_SLIDE => Self::NotesSlide,
            ct::PML_NOTES_MASTER => Self::NotesMaster,
            ct::PML_HANDOUT_MASTER => Self::HandoutMaster,
            ct::OFC_THEME => Self::Theme,
            ct::DML_CHART => Self::Chart,
            _ if content_type.starts_with("image/") => Self::Image,
            _ if content_type.starts_with("audio/") || content_type.starts_with("video/") => {
                Self::Media
            },
            _ if is_xml_content_type(content_type) => Self::Xml,
            _ => Self::Binary,
        }
    }

    /// Parts that define document identity are always cloned on import,
    /// never aliased onto a byte-identical existing part.
    #[inline]
    pub fn is_identity(self) -> bool {
        matches!(self, Self::Slide | Self::NotesSlide)
    }

    /// Whether the part body is XML and may own a relationship table.
    #[inline]
    pub fn is_xml(self) -> bool {
        !matches!(self, Self::Image | Self::Media | Self::Binary)
    }

    /// The relationship type conventionally used to reference this kind.
    pub fn default_rel_type(self) -> Option<&'static str> {
        match self {
            Self::Presentation => Some(rt::OFFICE_DOCUMENT),
            Self::Slide => Some(rt::SLIDE),
            Self::SlideLayout => Some(rt::SLIDE_LAYOUT),
            Self::SlideMaster => Some(rt::SLIDE_MASTER),
            Self::NotesSlide => Some(rt::NOTES_SLIDE),
            Self::NotesMaster => Some(rt::NOTES_MASTER),
            Self::HandoutMaster => Some(rt::HANDOUT_MASTER),
            Self::Theme => Some(rt::THEME),
            Self::Chart => Some(rt::CHART),
            Self::Image => Some(rt::IMAGE),
            Self::Media | Self::Xml | Self::Binary => None,
        }
    }
}

/// Check whether a content type denotes XML content.
#[inline]
pub fn is_xml_content_type(content_type: &str) -> bool {
    content_type.ends_with("+xml") || content_type.ends_with("/xml")
}

/// Explicit content state: either the bytes are resident or they must be
/// read from the working archive before use.
#[derive(Debug, Clone)]
pub enum PartContent {
    Loaded(Bytes),
    NotLoaded,
}

impl PartContent {
    #[inline]
    pub fn is_loaded(&self) -> bool {
        matches!(self, Self::Loaded(_))
    }
}

/// Where a relationship table entry points.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RelTarget {
    /// Another part in the same package
    Part(PartId),

    /// A URL outside the package
    External(String),

    /// An internal reference whose target part does not exist; preserved
    /// verbatim so the matching body reference stays declared
    Dangling(String),
}

/// One relationship table entry.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RelEntry {
    pub reltype: String,
    pub target: RelTarget,
}

/// A part's relationship table: rId -> target handle.
///
/// Built lazily from the part's `_rels` companion the first time
/// relationships are requested, re-serialized only when dirty and non-empty.
#[derive(Debug, Clone)]
pub struct PartTable {
    /// Directory the owning part lives in, for relative reference math
    base_uri: String,

    entries: BTreeMap<String, RelEntry>,

    dirty: bool,
}

impl PartTable {
    pub fn new<S: Into<String>>(base_uri: S) -> Self {
        Self {
            base_uri: base_uri.into(),
            entries: BTreeMap::new(),
            dirty: false,
        }
    }

    #[inline]
    pub fn base_uri(&self) -> &str {
        &self.base_uri
    }

    #[inline]
    pub fn get(&self, r_id: &str) -> Option<&RelEntry> {
        self.entries.get(r_id)
    }

    #[inline]
    pub fn iter(&self) -> impl Iterator<Item = (&str, &RelEntry)> {
        self.entries.iter().map(|(k, v)| (k.as_str(), v))
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Insert an entry under a caller-chosen rId, preserving ids copied
    /// from a source table. Marks the table dirty.
    pub fn insert_raw<S: Into<String>>(&mut self, r_id: S, entry: RelEntry) {
        self.entries.insert(r_id.into(), entry);
        self.dirty = true;
    }

    /// Add an entry under the next free rId and return that id.
    pub fn add<S: Into<String>>(&mut self, reltype: S, target: RelTarget) -> String {
        let r_id = self.next_rid();
        self.insert_raw(
            r_id.clone(),
            RelEntry {
                reltype: reltype.into(),
                target,
            },
        );
        r_id
    }

    /// Return the rId of an existing entry with this type and target, or
    /// add one. Keeps repeated registrations of the same part idempotent.
    pub fn get_or_add(&mut self, reltype: &str, target: RelTarget) -> String {
        for (r_id, entry) in &self.entries {
            if entry.reltype == reltype && entry.target == target {
                return r_id.clone();
            }
        }
        self.add(reltype, target)
    }

    /// The first entry of a given relationship type, if any.
    pub fn first_of_type(&self, reltype: &str) -> Option<(&str, &RelEntry)> {
        self.iter().find(|(_, entry)| entry.reltype == reltype)
    }

    /// Next free relationship id: one past the highest numeric suffix in
    /// use. Gaps are never filled, so ids are not reused within a session.
    pub fn next_rid(&self) -> String {
        let max = self
            .entries
            .keys()
            .filter_map(|r_id| crate::opc::rel::rid_number(r_id))
            .max()
            .unwrap_or(0);
        format!("rId{}", max + 1)
    }

    #[inline]
    pub fn is_dirty(&self) -> bool {
        self.dirty
    }

    #[inline]
    pub(crate) fn mark_dirty(&mut self) {
        self.dirty = true;
    }

    #[inline]
    pub(crate) fn clear_dirty(&mut self) {
        self.dirty = false;
    }
}

/// One entry in the package arena.
#[derive(Debug, Clone)]
pub struct Part {
    /// Zip membername as of the last refresh; None for parts created since
    pub(crate) initial_member: Option<String>,

    /// Current partname; unique case-insensitively within the package
    pub(crate) path: PackURI,

    pub(crate) kind: PartKind,

    pub(crate) content_type: String,

    /// Relationship type this part is referenced by
    pub(crate) rel_type: String,

    pub(crate) content: PartContent,

    /// None until relationships are first requested
    pub(crate) table: Option<PartTable>,

    /// True when path or content changed since the last commit
    pub(crate) dirty: bool,
}

impl Part {
    #[inline]
    pub fn path(&self) -> &PackURI {
        &self.path
    }

    #[inline]
    pub fn kind(&self) -> PartKind {
        self.kind
    }

    #[inline]
    pub fn content_type(&self) -> &str {
        &self.content_type
    }

    #[inline]
    pub fn rel_type(&self) -> &str {
        &self.rel_type
    }

    #[inline]
    pub fn is_dirty(&self) -> bool {
        self.dirty
    }

    #[inline]
    pub fn is_loaded(&self) -> bool {
        self.content.is_loaded()
    }

    /// True for parts created since the last commit, as opposed to parts
    /// read from the archive (possibly renamed since).
    #[inline]
    pub fn is_new(&self) -> bool {
        self.initial_member.is_none()
    }

    #[inline]
    pub fn table(&self) -> Option<&PartTable> {
        self.table.as_ref()
    }
}
