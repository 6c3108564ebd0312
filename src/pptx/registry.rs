//! The package-wide content type registry.
//!
//! Single source of truth for three kinds of bookkeeping: what content type
//! (and hence part kind) a path carries, which partnames are taken (existing
//! plus reserved this session), and which part contents are currently
//! resident (a bounded LRU). It also owns the directory-scoped
//! deduplication index consulted when an import considers reusing an
//! existing part instead of cloning.

use crate::opc::content_types::ContentTypesMap;
use crate::opc::error::{OpcError, Result};
use crate::opc::packuri::PackURI;
use crate::pptx::part::{PartId, PartKind};
use std::collections::{HashMap, HashSet};

/// Default bound on simultaneously resident part contents.
pub const DEFAULT_CACHE_CAPACITY: usize = 100;

/// Full-content SHA-256 digest. Partial or sampled hashing is rejected:
/// large media that shares a prefix or suffix but differs inside must not
/// dedupe.
pub type ContentDigest = [u8; 32];

/// Compute the dedup digest of a part body.
pub fn content_digest(bytes: &[u8]) -> ContentDigest {
    use sha2::{Digest, Sha256};
    Sha256::digest(bytes).into()
}

pub struct ContentTypeRegistry {
    /// The `[Content_Types].xml` model
    types: ContentTypesMap,

    /// True once a declaration changed and the manifest must be rewritten
    manifest_dirty: bool,

    /// Lowercased partnames, existing plus reserved this session
    paths: HashSet<String>,

    /// Resident part contents, coldest first
    lru: Vec<PartId>,

    cache_capacity: usize,

    /// Lowercased directory -> content digest -> part
    digests: HashMap<String, HashMap<ContentDigest, PartId>>,

    /// Directories whose committed parts have been digested already
    indexed_dirs: HashSet<String>,
}

impl ContentTypeRegistry {
    pub fn new(types: ContentTypesMap) -> Self {
        Self {
            types,
            manifest_dirty: false,
            paths: HashSet::new(),
            lru: Vec::new(),
            cache_capacity: DEFAULT_CACHE_CAPACITY,
            digests: HashMap::new(),
            indexed_dirs: HashSet::new(),
        }
    }

    // -- classification ----------------------------------------------------

    /// Look up the declared content type for a path: Override first, then
    /// the Default for its extension. None when nothing is declared.
    pub fn classify(&self, path: &PackURI) -> Option<&str> {
        self.types.get(path)
    }

    /// The content type a path resolves to, falling back to the
    /// conventional type for its extension and finally to a generic binary
    /// type. Unknown formats never block a merge.
    pub fn resolve_content_type(&self, path: &PackURI) -> String {
        if let Some(declared) = self.types.get(path) {
            return declared.to_string();
        }
        match ContentTypesMap::well_known_type(path.ext()) {
            Some(known) => known.to_string(),
            None => crate::opc::constants::content_type::OCTET_STREAM.to_string(),
        }
    }

    /// The part kind for a content type.
    pub fn kind_for(&self, content_type: &str) -> PartKind {
        PartKind::from_content_type(content_type)
    }

    /// Record a durably added part in the manifest: a Default if the
    /// extension has none yet, an Override if the existing Default
    /// disagrees with the part's real content type. Idempotent per path.
    pub fn declare(&mut self, path: &PackURI, content_type: &str) {
        let ext = path.ext();
        if ext.is_empty() {
            if self.classify(path) != Some(content_type) {
                self.types.add_override(path.as_str(), content_type);
                self.manifest_dirty = true;
            }
            return;
        }
        match self.types.default_for(ext) {
            None => {
                self.types.add_default(ext, content_type);
                self.manifest_dirty = true;
            },
            Some(default) if default != content_type => {
                if self.classify(path) != Some(content_type) {
                    self.types.add_override(path.as_str(), content_type);
                    self.manifest_dirty = true;
                }
            },
            Some(_) => {},
        }
    }

    #[inline]
    pub fn manifest(&self) -> &ContentTypesMap {
        &self.types
    }

    #[inline]
    pub fn manifest_dirty(&self) -> bool {
        self.manifest_dirty
    }

    #[inline]
    pub(crate) fn clear_manifest_dirty(&mut self) {
        self.manifest_dirty = false;
    }

    // -- partname index ----------------------------------------------------

    /// Instantiate a `%d` template with the first unused number and reserve
    /// the result immediately, so siblings resolved in the same merge
    /// cannot race each other to a name.
    pub fn allocate_name(&mut self, template: &str) -> Result<PackURI> {
        let mut n = 1u32;
        loop {
            let candidate = template.replace("%d", itoa::Buffer::new().format(n));
            if !self.paths.contains(&candidate.to_lowercase()) {
                let uri = PackURI::new(candidate).map_err(OpcError::InvalidPackUri)?;
                self.note_path(uri.as_str());
                return Ok(uri);
            }
            n += 1;
            if n > 10000 {
                // Safety limit to prevent infinite loops
                return Err(OpcError::InvalidPackUri(
                    "Too many parts, cannot find next partname".to_string(),
                ));
            }
        }
    }

    #[inline]
    pub fn note_path(&mut self, path: &str) {
        self.paths.insert(path.to_lowercase());
    }

    #[inline]
    pub fn forget_path(&mut self, path: &str) {
        self.paths.remove(&path.to_lowercase());
    }

    #[inline]
    pub fn has_path(&self, path: &str) -> bool {
        self.paths.contains(&path.to_lowercase())
    }

    // -- content cache -----------------------------------------------------

    #[inline]
    pub fn cache_capacity(&self) -> usize {
        self.cache_capacity
    }

    /// Bound the number of simultaneously resident part contents. Takes
    /// effect on the next load; already-resident parts are not evicted
    /// eagerly.
    pub fn set_cache_capacity(&mut self, capacity: usize) {
        self.cache_capacity = capacity.max(1);
    }

    /// Mark a part's content as most recently used.
    pub(crate) fn touch(&mut self, id: PartId) {
        if let Some(pos) = self.lru.iter().position(|cached| *cached == id) {
            self.lru.remove(pos);
        }
        self.lru.push(id);
    }

    pub(crate) fn over_capacity(&self) -> bool {
        self.lru.len() > self.cache_capacity
    }

    /// Resident parts, coldest first.
    pub(crate) fn eviction_order(&self) -> impl Iterator<Item = PartId> + '_ {
        self.lru.iter().copied()
    }

    pub(crate) fn drop_cached(&mut self, id: PartId) {
        if let Some(pos) = self.lru.iter().position(|cached| *cached == id) {
            self.lru.remove(pos);
        }
    }

    pub(crate) fn resident_count(&self) -> usize {
        self.lru.len()
    }

    // -- deduplication index -----------------------------------------------

    #[inline]
    pub(crate) fn dir_indexed(&self, dir_lower: &str) -> bool {
        self.indexed_dirs.contains(dir_lower)
    }

    #[inline]
    pub(crate) fn mark_dir_indexed(&mut self, dir_lower: String) {
        self.indexed_dirs.insert(dir_lower);
    }

    pub(crate) fn record_digest(&mut self, dir_lower: String, digest: ContentDigest, id: PartId) {
        self.digests
            .entry(dir_lower)
            .or_default()
            .entry(digest)
            .or_insert(id);
    }

    /// Find an existing part in this directory with identical content.
    pub(crate) fn find_similar(&self, dir_lower: &str, digest: &ContentDigest) -> Option<PartId> {
        self.digests.get(dir_lower)?.get(digest).copied()
    }

    /// Drop the digest index for a directory; it rebuilds on next use.
    pub(crate) fn invalidate_dir(&mut self, dir_lower: &str) {
        self.digests.remove(dir_lower);
        self.indexed_dirs.remove(dir_lower);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::opc::constants::content_type as ct;

    fn registry() -> ContentTypeRegistry {
        let mut types = ContentTypesMap::new();
        types.add_default("rels", ct::OPC_RELATIONSHIPS);
        types.add_default("xml", ct::XML);
        ContentTypeRegistry::new(types)
    }

    #[test]
    fn test_declare_fresh_extension_adds_default() {
        let mut reg = registry();
        let path = PackURI::new("/ppt/media/image1.png").unwrap();
        reg.declare(&path, ct::PNG);
        assert!(reg.manifest_dirty());
        assert_eq!(reg.classify(&path), Some(ct::PNG));
    }

    #[test]
    fn test_declare_conflicting_type_adds_override() {
        let mut reg = registry();
        let path = PackURI::new("/ppt/slides/slide1.xml").unwrap();
        reg.declare(&path, ct::PML_SLIDE);
        assert_eq!(reg.classify(&path), Some(ct::PML_SLIDE));

        // Unrelated xml paths keep the Default.
        let other = PackURI::new("/docProps/custom.xml").unwrap();
        assert_eq!(reg.classify(&other), Some(ct::XML));
    }

    #[test]
    fn test_declare_is_idempotent() {
        let mut reg = registry();
        let path = PackURI::new("/ppt/slides/slide1.xml").unwrap();
        reg.declare(&path, ct::PML_SLIDE);
        reg.clear_manifest_dirty();
        reg.declare(&path, ct::PML_SLIDE);
        assert!(!reg.manifest_dirty());
    }

    #[test]
    fn test_resolve_falls_back() {
        let reg = registry();
        let png = PackURI::new("/ppt/media/image1.png").unwrap();
        assert_eq!(reg.resolve_content_type(&png), ct::PNG);

        let unknown = PackURI::new("/stuff/blob.xyz").unwrap();
        assert_eq!(reg.resolve_content_type(&unknown), ct::OCTET_STREAM);
    }

    #[test]
    fn test_allocate_name_reserves_immediately() {
        let mut reg = registry();
        reg.note_path("/ppt/slides/slide1.xml");

        let first = reg.allocate_name("/ppt/slides/slide%d.xml").unwrap();
        assert_eq!(first.as_str(), "/ppt/slides/slide2.xml");

        // The allocation above is already reserved.
        let second = reg.allocate_name("/ppt/slides/slide%d.xml").unwrap();
        assert_eq!(second.as_str(), "/ppt/slides/slide3.xml");
    }

    #[test]
    fn test_allocate_name_is_case_insensitive() {
        let mut reg = registry();
        reg.note_path("/ppt/media/IMAGE1.PNG");
        let name = reg.allocate_name("/ppt/media/image%d.png").unwrap();
        assert_eq!(name.as_str(), "/ppt/media/image2.png");
    }

    #[test]
    fn test_lru_orders_by_recency() {
        let mut reg = registry();
        reg.set_cache_capacity(2);
        reg.touch(PartId(1));
        reg.touch(PartId(2));
        reg.touch(PartId(1));
        reg.touch(PartId(3));

        assert!(reg.over_capacity());
        let order: Vec<PartId> = reg.eviction_order().collect();
        assert_eq!(order, vec![PartId(2), PartId(1), PartId(3)]);

        reg.drop_cached(PartId(2));
        assert!(!reg.over_capacity());
    }

    #[test]
    fn test_dedup_index() {
        let mut reg = registry();
        let digest = content_digest(b"theme bytes");
        reg.record_digest("/ppt/theme".to_string(), digest, PartId(4));

        assert_eq!(reg.find_similar("/ppt/theme", &digest), Some(PartId(4)));
        assert_eq!(reg.find_similar("/ppt/media", &digest), None);

        let other = content_digest(b"different bytes");
        assert_eq!(reg.find_similar("/ppt/theme", &other), None);

        reg.invalidate_dir("/ppt/theme");
        assert_eq!(reg.find_similar("/ppt/theme", &digest), None);
    }
}
