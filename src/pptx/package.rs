//! The in-memory model of an open presentation package.
//!
//! A `Package` owns the part arena, the path index over it, the content
//! type registry and the id allocator. Parts are addressed through
//! `PartId` handles into the arena; handles stay valid until the next
//! commit, which rewrites the working archive and rebuilds the arena from
//! it. Content and relationship tables load lazily and only dirty state
//! is re-serialized on commit, so untouched parts survive byte-for-byte.

use crate::error::{Error, Result};
use crate::opc::constants::{content_type, relationship_type, target_mode};
use crate::opc::content_types::ContentTypesMap;
use crate::opc::error::OpcError;
use crate::opc::packuri::PackURI;
use crate::opc::phys_pkg::WorkingArchive;
use crate::opc::rel::{self, SerializedRelationship};
use crate::pptx::ids::IdAllocator;
use crate::pptx::part::{Part, PartContent, PartId, PartKind, PartTable, RelEntry, RelTarget};
use crate::pptx::registry::{ContentDigest, ContentTypeRegistry, content_digest};
use crate::pptx::xmledit;
use bytes::Bytes;
use std::collections::{HashMap, HashSet};
use std::path::Path;

pub(crate) const CONTENT_TYPES_MEMBER: &str = "[Content_Types].xml";
pub(crate) const PACKAGE_RELS_MEMBER: &str = "_rels/.rels";

/// Lowercased, the path index is keyed case-insensitively.
const APP_PROPS_KEY: &str = "/docprops/app.xml";

/// Zip membername of the `_rels` companion for a membername.
fn rels_member_for(member: &str) -> String {
    match member.rfind('/') {
        Some(pos) => format!("{}/_rels/{}.rels", &member[..pos], &member[pos + 1..]),
        None => format!("_rels/{member}.rels"),
    }
}

/// Everything `refresh` rebuilds from the working archive.
struct Model {
    parts: Vec<Part>,
    path_index: HashMap<String, PartId>,
    presentation: PartId,
    registry: ContentTypeRegistry,
    ids: IdAllocator,
    package_rels: Vec<u8>,
}

fn build_model(archive: &mut WorkingArchive) -> Result<Model> {
    let members = archive.member_names()?;

    let manifest = archive
        .try_read(CONTENT_TYPES_MEMBER)?
        .ok_or_else(|| Error::MalformedPart("package has no [Content_Types].xml".to_string()))?;
    let types = ContentTypesMap::from_xml(&manifest)?;
    let mut registry = ContentTypeRegistry::new(types);

    let mut parts: Vec<Part> = Vec::with_capacity(members.len());
    let mut path_index: HashMap<String, PartId> = HashMap::with_capacity(members.len());
    for member in &members {
        if member == CONTENT_TYPES_MEMBER || member.ends_with(".rels") || member.ends_with('/') {
            continue;
        }
        let path = match PackURI::new(format!("/{member}")) {
            Ok(path) => path,
            // Entries that do not form a valid partname ride along untouched.
            Err(_) => continue,
        };
        let content_type = registry.resolve_content_type(&path);
        let kind = PartKind::from_content_type(&content_type);
        let rel_type = kind.default_rel_type().unwrap_or("").to_string();
        let id = PartId(parts.len() as u32);
        registry.note_path(path.as_str());
        path_index.entry(path.as_str().to_lowercase()).or_insert(id);
        parts.push(Part {
            initial_member: Some(member.clone()),
            path,
            kind,
            content_type,
            rel_type,
            content: PartContent::NotLoaded,
            table: None,
            dirty: false,
        });
    }

    let package_rels = archive
        .try_read(PACKAGE_RELS_MEMBER)?
        .ok_or_else(|| Error::MalformedPart("package has no _rels/.rels".to_string()))?;
    let rows = rel::parse_rels_xml(&package_rels)?;
    let document = rows
        .iter()
        .find(|row| row.reltype == relationship_type::OFFICE_DOCUMENT && !row.is_external())
        .ok_or_else(|| {
            Error::NotAPresentation("no officeDocument relationship in _rels/.rels".to_string())
        })?;
    let document_path =
        PackURI::from_rel_ref("/", &document.target_ref).map_err(OpcError::InvalidPackUri)?;
    let presentation = path_index
        .get(&document_path.as_str().to_lowercase())
        .copied()
        .ok_or_else(|| {
            Error::NotAPresentation(format!(
                "officeDocument target {} is missing",
                document_path.as_str()
            ))
        })?;
    if parts[presentation.index()].content_type != content_type::PML_PRESENTATION_MAIN {
        return Err(Error::NotAPresentation(format!(
            "officeDocument target has content type {}",
            parts[presentation.index()].content_type
        )));
    }

    // Seed the allocator with every reserved-range id already spent, so
    // fresh ids never collide with loaded ones.
    let mut ids = IdAllocator::new();
    if let Some(member) = &parts[presentation.index()].initial_member {
        let body = archive.read(member)?;
        for entry in xmledit::list_entries(&body, b"sldMasterId")? {
            if let Some(id) = entry.id {
                ids.seed(id);
            }
        }
    }
    for part in &parts {
        if part.kind != PartKind::SlideMaster {
            continue;
        }
        if let Some(member) = &part.initial_member {
            let body = archive.read(member)?;
            for entry in xmledit::list_entries(&body, b"sldLayoutId")? {
                if let Some(id) = entry.id {
                    ids.seed(id);
                }
            }
        }
    }

    Ok(Model {
        parts,
        path_index,
        presentation,
        registry,
        ids,
        package_rels,
    })
}

/// Serialize a relationship table against the current part paths.
fn serialize_rows(parts: &[Part], table: &PartTable) -> String {
    let mut rows: Vec<SerializedRelationship> = Vec::with_capacity(table.len());
    for (r_id, entry) in table.iter() {
        let (target_ref, mode) = match &entry.target {
            RelTarget::Part(pid) => (
                parts[pid.index()].path.relative_ref(table.base_uri()),
                target_mode::INTERNAL,
            ),
            RelTarget::External(url) => (url.clone(), target_mode::EXTERNAL),
            RelTarget::Dangling(raw) => (raw.clone(), target_mode::INTERNAL),
        };
        rows.push(SerializedRelationship {
            r_id: r_id.to_string(),
            reltype: entry.reltype.clone(),
            target_ref,
            target_mode: mode.to_string(),
        });
    }
    rel::rels_to_xml(&rows)
}

/// An open presentation package.
pub struct Package {
    archive: WorkingArchive,
    parts: Vec<Part>,
    path_index: HashMap<String, PartId>,
    presentation: PartId,
    registry: ContentTypeRegistry,
    ids: IdAllocator,
    package_rels: Vec<u8>,
}

impl Package {
    /// Open a package from a file. The file is copied to a working copy
    /// first and is not touched again until `save`.
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self> {
        let mut archive = WorkingArchive::open(path).map_err(Error::Opc)?;
        let model = build_model(&mut archive)?;
        Ok(Self::assemble(archive, model))
    }

    /// Open a package from raw bytes. `save` requires `save_as` first
    /// since there is no origin path.
    pub fn from_bytes(bytes: &[u8]) -> Result<Self> {
        let mut archive = WorkingArchive::from_bytes(bytes).map_err(Error::Opc)?;
        let model = build_model(&mut archive)?;
        Ok(Self::assemble(archive, model))
    }

    fn assemble(archive: WorkingArchive, model: Model) -> Self {
        Self {
            archive,
            parts: model.parts,
            path_index: model.path_index,
            presentation: model.presentation,
            registry: model.registry,
            ids: model.ids,
            package_rels: model.package_rels,
        }
    }

    /// Path the package was opened from, if any.
    pub fn origin(&self) -> Option<&Path> {
        self.archive.origin()
    }

    // -- part access -------------------------------------------------------

    #[inline]
    pub fn part(&self, id: PartId) -> Option<&Part> {
        self.parts.get(id.index())
    }

    fn part_checked(&self, id: PartId) -> Result<&Part> {
        self.parts.get(id.index()).ok_or_else(|| {
            Error::Opc(OpcError::PartNotFound(format!(
                "no part for handle {}",
                id.index()
            )))
        })
    }

    /// Every part with its handle, in arena order.
    pub fn parts(&self) -> impl Iterator<Item = (PartId, &Part)> {
        self.parts
            .iter()
            .enumerate()
            .map(|(index, part)| (PartId(index as u32), part))
    }

    #[inline]
    pub fn part_count(&self) -> usize {
        self.parts.len()
    }

    /// The main presentation part.
    #[inline]
    pub fn presentation_part(&self) -> PartId {
        self.presentation
    }

    /// Look a part up by partname, case-insensitively.
    pub fn part_by_path(&self, path: &str) -> Option<PartId> {
        self.path_index.get(&path.to_lowercase()).copied()
    }

    #[inline]
    pub fn registry(&self) -> &ContentTypeRegistry {
        &self.registry
    }

    #[inline]
    pub fn registry_mut(&mut self) -> &mut ContentTypeRegistry {
        &mut self.registry
    }

    #[inline]
    pub fn id_allocator(&self) -> &IdAllocator {
        &self.ids
    }

    #[inline]
    pub fn id_allocator_mut(&mut self) -> &mut IdAllocator {
        &mut self.ids
    }

    // -- content -----------------------------------------------------------

    fn ensure_loaded(&mut self, id: PartId) -> Result<()> {
        self.part_checked(id)?;
        if !self.parts[id.index()].content.is_loaded() {
            let member = match &self.parts[id.index()].initial_member {
                Some(member) => member.clone(),
                None => {
                    return Err(Error::MalformedPart(format!(
                        "part {} has no backing archive member",
                        self.parts[id.index()].path.as_str()
                    )));
                },
            };
            let blob = self.archive.read(&member).map_err(Error::Opc)?;
            self.parts[id.index()].content = PartContent::Loaded(Bytes::from(blob));
        }
        self.registry.touch(id);
        self.evict_over_capacity(id);
        Ok(())
    }

    /// Drop cold clean contents until the cache fits its bound again.
    /// Dirty parts are pinned; they are the only record of their bytes.
    fn evict_over_capacity(&mut self, keep: PartId) {
        while self.registry.over_capacity() {
            let victim = self.registry.eviction_order().find(|cand| {
                *cand != keep
                    && !self.parts[cand.index()].dirty
                    && self.parts[cand.index()].content.is_loaded()
            });
            match victim {
                Some(victim) => {
                    self.parts[victim.index()].content = PartContent::NotLoaded;
                    self.registry.drop_cached(victim);
                },
                None => break,
            }
        }
    }

    /// The part's current content, loading it from the working archive if
    /// it is not resident.
    pub fn part_content(&mut self, id: PartId) -> Result<&Bytes> {
        self.ensure_loaded(id)?;
        match &self.parts[id.index()].content {
            PartContent::Loaded(bytes) => Ok(bytes),
            PartContent::NotLoaded => Err(Error::MalformedPart(format!(
                "part {} has no readable content",
                self.parts[id.index()].path.as_str()
            ))),
        }
    }

    /// Replace the part's content. The part is dirty from here on and its
    /// directory's deduplication index is discarded.
    pub fn set_part_content<B: Into<Bytes>>(&mut self, id: PartId, bytes: B) -> Result<()> {
        let dir = self.part_checked(id)?.path.base_uri().to_lowercase();
        let part = &mut self.parts[id.index()];
        part.content = PartContent::Loaded(bytes.into());
        part.dirty = true;
        self.registry.touch(id);
        self.registry.invalidate_dir(&dir);
        Ok(())
    }

    /// Drop a clean part's resident content. Returns false when the part
    /// is dirty or was not resident.
    pub fn unload_part_content(&mut self, id: PartId) -> bool {
        match self.parts.get_mut(id.index()) {
            Some(part) if part.content.is_loaded() && !part.dirty => {
                part.content = PartContent::NotLoaded;
                self.registry.drop_cached(id);
                true
            },
            _ => false,
        }
    }

    // -- relationship tables -----------------------------------------------

    fn parse_table(&mut self, id: PartId) -> Result<PartTable> {
        let (base_uri, initial) = {
            let part = self.part_checked(id)?;
            (
                part.path.base_uri().to_string(),
                part.initial_member.clone(),
            )
        };
        let mut table = PartTable::new(base_uri);
        if let Some(member) = initial {
            // Raw refs were written relative to the part's original home.
            let original =
                PackURI::new(format!("/{member}")).map_err(OpcError::InvalidPackUri)?;
            let original_base = original.base_uri().to_string();
            if let Some(blob) = self.archive.try_read(&rels_member_for(&member))? {
                for row in rel::parse_rels_xml(&blob)? {
                    if table.get(&row.r_id).is_some() {
                        continue;
                    }
                    let target = if row.is_external() {
                        RelTarget::External(row.target_ref)
                    } else {
                        match PackURI::from_rel_ref(&original_base, &row.target_ref) {
                            Ok(resolved) => {
                                match self.path_index.get(&resolved.as_str().to_lowercase()) {
                                    Some(pid) => RelTarget::Part(*pid),
                                    None => RelTarget::Dangling(row.target_ref),
                                }
                            },
                            Err(_) => RelTarget::Dangling(row.target_ref),
                        }
                    };
                    table.insert_raw(row.r_id.clone(), RelEntry {
                        reltype: row.reltype,
                        target,
                    });
                }
            }
        }
        table.clear_dirty();
        Ok(table)
    }

    /// Make sure the part's relationship table is materialized.
    pub(crate) fn ensure_table(&mut self, id: PartId) -> Result<()> {
        if self.part_checked(id)?.table.is_none() {
            let table = self.parse_table(id)?;
            self.parts[id.index()].table = Some(table);
        }
        Ok(())
    }

    /// The part's relationship table, parsing the `_rels` companion on
    /// first access.
    pub fn part_table(&mut self, id: PartId) -> Result<&PartTable> {
        self.ensure_table(id)?;
        match &self.parts[id.index()].table {
            Some(table) => Ok(table),
            None => Err(Error::MalformedPart(format!(
                "part {} has no relationship table",
                self.parts[id.index()].path.as_str()
            ))),
        }
    }

    pub(crate) fn table_mut(&mut self, id: PartId) -> Result<&mut PartTable> {
        self.ensure_table(id)?;
        let part = &mut self.parts[id.index()];
        match &mut part.table {
            Some(table) => Ok(table),
            None => Err(Error::MalformedPart(format!(
                "part {} has no relationship table",
                part.path.as_str()
            ))),
        }
    }

    // -- part creation and renaming ----------------------------------------

    /// Add a brand-new part to the arena. The caller owns name allocation;
    /// the path must already be reserved through the registry.
    pub(crate) fn add_part(
        &mut self,
        path: PackURI,
        content_type: String,
        rel_type: String,
        content: Bytes,
    ) -> PartId {
        let kind = PartKind::from_content_type(&content_type);
        let id = PartId(self.parts.len() as u32);
        self.registry.note_path(path.as_str());
        self.registry.declare(&path, &content_type);
        self.path_index.insert(path.as_str().to_lowercase(), id);
        let base_uri = path.base_uri().to_string();
        self.parts.push(Part {
            initial_member: None,
            path,
            kind,
            content_type,
            rel_type,
            content: PartContent::Loaded(content),
            table: Some(PartTable::new(base_uri)),
            dirty: true,
        });
        self.registry.touch(id);
        id
    }

    /// Rename a part within its directory. The new name is a bare
    /// filename; path separators are rejected. Every reference to the
    /// part, including the package-level ones, is rewritten on commit.
    pub fn rename_part(&mut self, id: PartId, new_filename: &str) -> Result<()> {
        if new_filename.is_empty()
            || new_filename.contains('/')
            || new_filename.contains('\\')
        {
            return Err(Error::Opc(OpcError::InvalidName(format!(
                "invalid part filename: {new_filename:?}"
            ))));
        }
        let (old_path, base) = {
            let part = self.part_checked(id)?;
            (
                part.path.as_str().to_string(),
                part.path.base_uri().to_string(),
            )
        };
        let new_path_str = if base == "/" {
            format!("/{new_filename}")
        } else {
            format!("{base}/{new_filename}")
        };
        if new_path_str == old_path {
            return Ok(());
        }
        let lower = new_path_str.to_lowercase();
        if let Some(existing) = self.path_index.get(&lower) {
            if *existing != id {
                return Err(Error::Opc(OpcError::InvalidName(format!(
                    "part name already in use: {new_path_str}"
                ))));
            }
        }

        // Materialize every table before any path changes, so raw refs
        // still resolve against the paths they were written for.
        for index in 0..self.parts.len() {
            self.ensure_table(PartId(index as u32))?;
        }

        let new_path = PackURI::new(new_path_str.clone()).map_err(OpcError::InvalidPackUri)?;
        self.registry.forget_path(&old_path);
        self.registry.note_path(&new_path_str);
        let old_lower = old_path.to_lowercase();
        if self.path_index.get(&old_lower) == Some(&id) {
            self.path_index.remove(&old_lower);
        }
        self.path_index.insert(lower, id);
        let declared = self.parts[id.index()].content_type.clone();
        self.registry.declare(&new_path, &declared);
        self.parts[id.index()].path = new_path;

        // Tables that reference the part serialize a new relative ref.
        for index in 0..self.parts.len() {
            if index == id.index() {
                continue;
            }
            let references = self.parts[index]
                .table
                .as_ref()
                .is_some_and(|table| {
                    table
                        .iter()
                        .any(|(_, entry)| entry.target == RelTarget::Part(id))
                });
            if references {
                if let Some(table) = self.parts[index].table.as_mut() {
                    table.mark_dirty();
                }
            }
        }
        self.rewrite_package_rels_for(&old_path, id)?;
        Ok(())
    }

    /// Re-point package-level relationships at a renamed part.
    fn rewrite_package_rels_for(&mut self, old_path: &str, id: PartId) -> Result<()> {
        let rows = rel::parse_rels_xml(&self.package_rels)?;
        let mut changed = false;
        let mut rewritten: Vec<SerializedRelationship> = Vec::with_capacity(rows.len());
        for mut row in rows {
            if !row.is_external() {
                if let Ok(resolved) = PackURI::from_rel_ref("/", &row.target_ref) {
                    if resolved.as_str().eq_ignore_ascii_case(old_path) {
                        row.target_ref = self.parts[id.index()].path.relative_ref("/");
                        changed = true;
                    }
                }
            }
            rewritten.push(row);
        }
        if changed {
            self.package_rels = rel::rels_to_xml(&rewritten).into_bytes();
        }
        Ok(())
    }

    // -- presentation resource views ---------------------------------------

    /// Slides in presentation order.
    pub fn slides(&mut self) -> Result<Vec<PartId>> {
        crate::pptx::presentation::slide_parts(self)
    }

    /// Slide masters in presentation order.
    pub fn slide_masters(&mut self) -> Result<Vec<PartId>> {
        crate::pptx::presentation::master_parts(self)
    }

    // -- deduplication support ---------------------------------------------

    /// Digest every committed part in a directory once, so imports can
    /// look up reuse candidates by content.
    pub(crate) fn ensure_dir_indexed(&mut self, dir_lower: &str) -> Result<()> {
        if self.registry.dir_indexed(dir_lower) {
            return Ok(());
        }
        let committed: Vec<(PartId, String)> = self
            .parts
            .iter()
            .enumerate()
            .filter(|(_, part)| {
                !part.dirty && part.path.base_uri().eq_ignore_ascii_case(dir_lower)
            })
            .filter_map(|(index, part)| {
                part.initial_member
                    .clone()
                    .map(|member| (PartId(index as u32), member))
            })
            .collect();
        for (id, member) in committed {
            let blob = self.archive.read(&member).map_err(Error::Opc)?;
            self.registry
                .record_digest(dir_lower.to_string(), content_digest(&blob), id);
        }
        self.registry.mark_dir_indexed(dir_lower.to_string());
        Ok(())
    }

    pub(crate) fn find_similar_part(
        &self,
        dir_lower: &str,
        digest: &ContentDigest,
    ) -> Option<PartId> {
        self.registry.find_similar(dir_lower, digest)
    }

    pub(crate) fn record_part_digest(
        &mut self,
        dir_lower: String,
        digest: ContentDigest,
        id: PartId,
    ) {
        self.registry.record_digest(dir_lower, digest, id);
    }

    // -- commit and save ---------------------------------------------------

    /// Flush every pending change into the working archive and rebuild
    /// the model from it. All `PartId` handles are invalidated.
    pub fn commit(&mut self) -> Result<()> {
        // Layouts created this session must end up owned by a master.
        let new_layouts: Vec<PartId> = self
            .parts
            .iter()
            .enumerate()
            .filter(|(_, part)| {
                part.kind == PartKind::SlideLayout && part.initial_member.is_none()
            })
            .map(|(index, _)| PartId(index as u32))
            .collect();
        for id in new_layouts {
            crate::pptx::layout::ensure_master(self, id)?;
        }

        let dirty_masters: Vec<PartId> = self
            .parts
            .iter()
            .enumerate()
            .filter(|(_, part)| {
                part.kind == PartKind::SlideMaster
                    && (part.dirty
                        || part.table.as_ref().is_some_and(|table| table.is_dirty()))
            })
            .map(|(index, _)| PartId(index as u32))
            .collect();
        for id in dirty_masters {
            crate::pptx::master::renumber_layouts(self, id)?;
        }

        self.refresh_app_counts()?;

        let entries = self.emit_entries()?;
        self.archive.rewrite(&entries).map_err(Error::Opc)?;
        self.refresh()
    }

    /// Keep the `Slides` and `Notes` counters of `app.xml` in line with
    /// the package.
    fn refresh_app_counts(&mut self) -> Result<()> {
        let Some(app) = self.path_index.get(APP_PROPS_KEY).copied() else {
            return Ok(());
        };
        let slides = crate::pptx::presentation::slide_entries(self)?.len();
        let notes = self
            .parts
            .iter()
            .filter(|part| part.kind == PartKind::NotesSlide)
            .count();
        let body = self.part_content(app)?.clone();
        if let Some(updated) = xmledit::set_app_counts(&body, slides, notes) {
            self.set_part_content(app, updated)?;
        }
        Ok(())
    }

    fn emit_entries(&mut self) -> Result<Vec<(String, Vec<u8>)>> {
        let members = self.archive.member_names()?;
        let mut consumed: HashSet<String> = HashSet::with_capacity(members.len());
        consumed.insert(CONTENT_TYPES_MEMBER.to_string());
        consumed.insert(PACKAGE_RELS_MEMBER.to_string());
        for part in &self.parts {
            if let Some(member) = &part.initial_member {
                consumed.insert(member.clone());
                consumed.insert(rels_member_for(member));
            }
        }

        let mut entries: Vec<(String, Vec<u8>)> = Vec::with_capacity(members.len() + 4);

        let manifest = if self.registry.manifest_dirty() {
            self.registry.manifest().to_xml().into_bytes()
        } else {
            self.archive.read(CONTENT_TYPES_MEMBER)?
        };
        entries.push((CONTENT_TYPES_MEMBER.to_string(), manifest));
        entries.push((PACKAGE_RELS_MEMBER.to_string(), self.package_rels.clone()));

        for index in 0..self.parts.len() {
            let (membername, initial, dirty) = {
                let part = &self.parts[index];
                (
                    part.path.membername().to_string(),
                    part.initial_member.clone(),
                    part.dirty,
                )
            };

            let body = if dirty {
                match &self.parts[index].content {
                    PartContent::Loaded(bytes) => bytes.to_vec(),
                    PartContent::NotLoaded => match &initial {
                        Some(member) => self.archive.read(member)?,
                        None => {
                            return Err(Error::MalformedPart(format!(
                                "part /{membername} has no content to write"
                            )));
                        },
                    },
                }
            } else {
                match &initial {
                    Some(member) => self.archive.read(member)?,
                    None => {
                        return Err(Error::MalformedPart(format!(
                            "part /{membername} has no content to write"
                        )));
                    },
                }
            };
            entries.push((membername.clone(), body));

            let rels_name = rels_member_for(&membername);
            match &self.parts[index].table {
                Some(table) if table.is_dirty() => {
                    if !table.is_empty() {
                        let xml = serialize_rows(&self.parts, table);
                        entries.push((rels_name, xml.into_bytes()));
                    }
                },
                _ => {
                    // Clean or unparsed tables carry their raw companion.
                    if let Some(member) = &initial {
                        if let Some(blob) = self.archive.try_read(&rels_member_for(member))? {
                            entries.push((rels_name, blob));
                        }
                    }
                },
            }
        }

        for member in &members {
            if consumed.contains(member) {
                continue;
            }
            entries.push((member.clone(), self.archive.read(member)?));
        }
        Ok(entries)
    }

    /// Rebuild the model from the current working copy.
    pub(crate) fn refresh(&mut self) -> Result<()> {
        let capacity = self.registry.cache_capacity();
        let model = build_model(&mut self.archive)?;
        self.parts = model.parts;
        self.path_index = model.path_index;
        self.presentation = model.presentation;
        self.registry = model.registry;
        self.registry.set_cache_capacity(capacity);
        self.ids = model.ids;
        self.package_rels = model.package_rels;
        Ok(())
    }

    /// Commit and copy the working file onto the origin path.
    pub fn save(&mut self) -> Result<()> {
        self.commit()?;
        self.archive.persist().map_err(Error::Opc)
    }

    /// Commit and copy the working file onto a new path, which becomes
    /// the origin for subsequent saves.
    pub fn save_as<P: AsRef<Path>>(&mut self, dest: P) -> Result<()> {
        self.commit()?;
        self.archive.persist_to(dest.as_ref()).map_err(Error::Opc)?;
        self.archive.set_origin(dest);
        Ok(())
    }
}
