//! Read-only structural validation of a finished package file.
//!
//! The validator re-checks the invariants the merge engine maintains,
//! directly against the archive bytes rather than through the live
//! model. Violations come back as data, never as errors; every check
//! runs to completion even when earlier ones fail, so a corrupted
//! package yields the full list of problems in one pass.

use crate::error::{Error, Result};
use crate::opc::constants::{content_type, relationship_type};
use crate::opc::content_types::ContentTypesMap;
use crate::opc::packuri::PackURI;
use crate::opc::phys_pkg::WorkingArchive;
use crate::opc::rel::{SerializedRelationship, parse_rels_xml};
use crate::pptx::package::{CONTENT_TYPES_MEMBER, PACKAGE_RELS_MEMBER};
use crate::pptx::xmledit::{ListEntry, body_rid_refs, list_entries, list_inner, numeric_attr_values};
use memchr::memmem;
use std::collections::{BTreeMap, HashMap, HashSet};
use std::path::Path;

/// Whether a finding blocks downstream consumption of the file.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum Severity {
    /// The package violates a structural invariant and readers may
    /// reject it or lose content
    Blocking,

    /// Hygiene problem worth reporting; readers will still open the file
    Advisory,
}

/// What a finding is about.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum FindingKind {
    /// A part has no content type via Default or Override, or the
    /// manifest itself is missing or unreadable
    MissingContentType,

    /// An internal relationship target does not resolve to an entry
    DanglingRelationship,

    /// One `.rels` file declares the same rId more than once
    DuplicateRelId,

    /// A part body references an rId its own table does not declare
    UndeclaredRelId,

    /// Two entries share a case-insensitive path
    CasedPathCollision,

    /// Two `sldId` entries carry the same numeric id
    DuplicateSlideId,

    /// Two `sldMasterId` entries carry the same numeric id
    DuplicateMasterId,

    /// Two `sldLayoutId` entries within one master carry the same id
    DuplicateLayoutId,

    /// A section references a slide id absent from `sldIdLst`
    DanglingSectionSlide,

    /// A slide layout has no slideMaster relationship
    LayoutWithoutMaster,

    /// A media entry is not referenced by any relationship
    OrphanedMedia,

    /// A notes slide has no notesMaster relationship
    NotesSlideWithoutMaster,

    /// A comment references an `authorId` absent from `commentAuthors`
    UnknownCommentAuthor,

    /// `app.xml` slide or notes counters disagree with the package
    AppCountMismatch,
}

/// One validation finding.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Finding {
    pub severity: Severity,
    pub kind: FindingKind,

    /// Partname the finding is about, when it concerns a single part
    pub part: Option<String>,

    pub detail: String,
}

impl Finding {
    fn blocking(kind: FindingKind, part: Option<String>, detail: String) -> Self {
        Self {
            severity: Severity::Blocking,
            kind,
            part,
            detail,
        }
    }

    fn advisory(kind: FindingKind, part: Option<String>, detail: String) -> Self {
        Self {
            severity: Severity::Advisory,
            kind,
            part,
            detail,
        }
    }

    #[inline]
    pub fn is_blocking(&self) -> bool {
        self.severity == Severity::Blocking
    }
}

/// Validate a presentation file on disk.
pub fn validate_path<P: AsRef<Path>>(path: P) -> Result<Vec<Finding>> {
    let mut archive = WorkingArchive::open(path).map_err(Error::Opc)?;
    validate_archive(&mut archive)
}

/// Validate an in-memory presentation file.
pub fn validate_bytes(bytes: &[u8]) -> Result<Vec<Finding>> {
    let mut archive = WorkingArchive::from_bytes(bytes).map_err(Error::Opc)?;
    validate_archive(&mut archive)
}

fn validate_archive(archive: &mut WorkingArchive) -> Result<Vec<Finding>> {
    let mut findings = Vec::new();

    let names = archive.member_names().map_err(Error::Opc)?;
    let mut members: BTreeMap<String, Vec<u8>> = BTreeMap::new();
    for name in names {
        if name.ends_with('/') {
            continue;
        }
        let blob = archive.read(&name).map_err(Error::Opc)?;
        members.insert(name, blob);
    }
    let lower_set: HashSet<String> = members.keys().map(|name| name.to_lowercase()).collect();

    // No two entries may share a case-insensitive path.
    let mut by_lower: BTreeMap<String, Vec<&str>> = BTreeMap::new();
    for name in members.keys() {
        by_lower.entry(name.to_lowercase()).or_default().push(name);
    }
    for group in by_lower.values() {
        if group.len() > 1 {
            findings.push(Finding::blocking(
                FindingKind::CasedPathCollision,
                Some(format!("/{}", group[0])),
                format!("paths collide case-insensitively: {}", group.join(", ")),
            ));
        }
    }

    // The content type manifest, if it can be read at all.
    let types = match members.get(CONTENT_TYPES_MEMBER) {
        Some(xml) => match ContentTypesMap::from_xml(xml) {
            Ok(map) => Some(map),
            Err(e) => {
                findings.push(Finding::blocking(
                    FindingKind::MissingContentType,
                    None,
                    format!("content type manifest cannot be parsed: {e}"),
                ));
                None
            },
        },
        None => {
            findings.push(Finding::blocking(
                FindingKind::MissingContentType,
                None,
                "package has no [Content_Types].xml".to_string(),
            ));
            None
        },
    };

    // Every entry except the manifest itself needs a declared type.
    let mut typed: HashMap<&str, String> = HashMap::new();
    if let Some(types) = &types {
        for member in members.keys() {
            if member == CONTENT_TYPES_MEMBER {
                continue;
            }
            let Ok(uri) = PackURI::new(format!("/{member}")) else {
                continue;
            };
            match types.get(&uri) {
                Some(ct) => {
                    typed.insert(member, ct.to_string());
                },
                None => findings.push(Finding::blocking(
                    FindingKind::MissingContentType,
                    Some(uri.as_str().to_string()),
                    "no Default or Override declares this part".to_string(),
                )),
            }
        }
    }

    // Walk every .rels file: duplicate rIds, unresolvable targets.
    let mut declared: HashMap<String, HashSet<String>> = HashMap::new();
    let mut rows_by_owner: HashMap<String, Vec<SerializedRelationship>> = HashMap::new();
    let mut referenced_lower: HashSet<String> = HashSet::new();
    let mut unparsed_owners: HashSet<String> = HashSet::new();

    for (member, blob) in &members {
        if !member.ends_with(".rels") {
            continue;
        }
        let Some((owner, base)) = owner_of_rels(member) else {
            continue;
        };
        let rels_path = format!("/{member}");
        let rows = match parse_rels_xml(blob) {
            Ok(rows) => rows,
            Err(e) => {
                findings.push(Finding::blocking(
                    FindingKind::DanglingRelationship,
                    Some(rels_path),
                    format!("relationships cannot be parsed: {e}"),
                ));
                unparsed_owners.insert(owner);
                continue;
            },
        };

        let mut seen: BTreeMap<&str, u32> = BTreeMap::new();
        for row in &rows {
            *seen.entry(row.r_id.as_str()).or_insert(0) += 1;
        }
        for (r_id, count) in seen {
            if count > 1 {
                findings.push(Finding::blocking(
                    FindingKind::DuplicateRelId,
                    Some(rels_path.clone()),
                    format!("{r_id} is declared {count} times"),
                ));
            }
        }

        for row in &rows {
            declared
                .entry(owner.clone())
                .or_default()
                .insert(row.r_id.clone());
            if row.is_external() {
                continue;
            }
            match PackURI::from_rel_ref(&base, &row.target_ref) {
                Ok(resolved) => {
                    let member_lower = resolved.membername().to_lowercase();
                    if lower_set.contains(&member_lower) {
                        referenced_lower.insert(member_lower);
                    } else {
                        findings.push(Finding::blocking(
                            FindingKind::DanglingRelationship,
                            Some(rels_path.clone()),
                            format!(
                                "{} -> {} does not resolve to a package entry",
                                row.r_id, row.target_ref
                            ),
                        ));
                    }
                },
                Err(_) => findings.push(Finding::blocking(
                    FindingKind::DanglingRelationship,
                    Some(rels_path.clone()),
                    format!("{} -> {} cannot be resolved", row.r_id, row.target_ref),
                )),
            }
        }
        rows_by_owner.insert(owner, rows.into_vec());
    }

    // Every rId an XML body references must be declared by its table.
    for (member, blob) in &members {
        if member.ends_with(".rels") || member == CONTENT_TYPES_MEMBER {
            continue;
        }
        let is_xml = match typed.get(member.as_str()) {
            Some(ct) => is_xml_content_type(ct),
            None => member.ends_with(".xml"),
        };
        if !is_xml || unparsed_owners.contains(member.as_str()) {
            continue;
        }
        let empty = HashSet::new();
        let declared_ids = declared.get(member.as_str()).unwrap_or(&empty);
        let mut missing: Vec<String> = body_rid_refs(blob)
            .into_iter()
            .filter(|r_id| !declared_ids.contains(r_id))
            .collect();
        missing.sort();
        for r_id in missing {
            findings.push(Finding::blocking(
                FindingKind::UndeclaredRelId,
                Some(format!("/{member}")),
                format!("{r_id} is referenced in the body but not declared"),
            ));
        }
    }

    // Structural id lists must not repeat an id within one list, and
    // sections may only reference slides the deck still lists. The slide
    // scan is scoped to `p:sldIdLst` so section `sldId` entries do not
    // count as deck slides.
    let mut slide_list_len: Option<usize> = None;
    let presentation_member = members.keys().find(|member| {
        matches!(typed.get(member.as_str()), Some(ct) if ct == content_type::PML_PRESENTATION_MAIN)
    });
    if let Some(member) = presentation_member {
        let blob = &members[member.as_str()];
        let main_list = list_inner(blob, "p:sldIdLst")
            .map(|(start, end)| &blob[start..end])
            .unwrap_or_default();
        let mut listed_ids: Option<HashSet<u32>> = None;
        if let Ok(entries) = list_entries(main_list, b"sldId") {
            slide_list_len = Some(entries.len());
            listed_ids = Some(entries.iter().filter_map(|entry| entry.id).collect());
            push_duplicate_ids(
                &mut findings,
                FindingKind::DuplicateSlideId,
                "sldId",
                member,
                &entries,
            );
        }
        if let Ok(entries) = list_entries(blob, b"sldMasterId") {
            push_duplicate_ids(
                &mut findings,
                FindingKind::DuplicateMasterId,
                "sldMasterId",
                member,
                &entries,
            );
        }
        let section_list =
            list_inner(blob, "p14:sectionLst").or_else(|| list_inner(blob, "p:sectionLst"));
        if let (Some(listed), Some((start, end))) = (&listed_ids, section_list) {
            if let Ok(ids) = numeric_attr_values(&blob[start..end], b"sldId", b"id") {
                let mut stale: Vec<u32> =
                    ids.into_iter().filter(|id| !listed.contains(id)).collect();
                stale.sort_unstable();
                stale.dedup();
                for id in stale {
                    findings.push(Finding::advisory(
                        FindingKind::DanglingSectionSlide,
                        Some(format!("/{member}")),
                        format!("section references slide id {id} missing from sldIdLst"),
                    ));
                }
            }
        }
    }
    for member in members.keys() {
        let Some(ct) = typed.get(member.as_str()) else {
            continue;
        };
        if ct == content_type::PML_SLIDE_MASTER {
            if let Ok(entries) = list_entries(&members[member.as_str()], b"sldLayoutId") {
                push_duplicate_ids(
                    &mut findings,
                    FindingKind::DuplicateLayoutId,
                    "sldLayoutId",
                    member,
                    &entries,
                );
            }
        }
    }

    // Layouts must be owned by a master; notes slides should name theirs.
    for member in members.keys() {
        let Some(ct) = typed.get(member.as_str()) else {
            continue;
        };
        if unparsed_owners.contains(member.as_str()) {
            continue;
        }
        if ct == content_type::PML_SLIDE_LAYOUT {
            let has_master = rows_by_owner
                .get(member.as_str())
                .is_some_and(|rows| {
                    rows.iter()
                        .any(|row| row.reltype == relationship_type::SLIDE_MASTER)
                });
            if !has_master {
                findings.push(Finding::blocking(
                    FindingKind::LayoutWithoutMaster,
                    Some(format!("/{member}")),
                    "layout has no slideMaster relationship".to_string(),
                ));
            }
        } else if ct == content_type::PML_NOTES_SLIDE {
            let has_master = rows_by_owner
                .get(member.as_str())
                .is_some_and(|rows| {
                    rows.iter()
                        .any(|row| row.reltype == relationship_type::NOTES_MASTER)
                });
            if !has_master {
                findings.push(Finding::advisory(
                    FindingKind::NotesSlideWithoutMaster,
                    Some(format!("/{member}")),
                    "notes slide has no notesMaster relationship".to_string(),
                ));
            }
        }
    }

    // Comment author references must resolve. The check runs only when a
    // commentAuthors part is present; its `cmAuthor` ids are the universe
    // every `cm` authorId must come from.
    let author_member = members.keys().find(|member| {
        matches!(typed.get(member.as_str()), Some(ct) if ct == content_type::PML_COMMENT_AUTHORS)
            || member.eq_ignore_ascii_case("ppt/commentAuthors.xml")
    });
    if let Some(member) = author_member {
        if let Ok(ids) = numeric_attr_values(&members[member.as_str()], b"cmAuthor", b"id") {
            let author_ids: HashSet<u32> = ids.into_iter().collect();
            for (name, blob) in &members {
                let is_comments = matches!(typed.get(name.as_str()), Some(ct) if ct == content_type::PML_COMMENTS)
                    || (name.starts_with("ppt/comments/") && name.ends_with(".xml"));
                if !is_comments {
                    continue;
                }
                let Ok(refs) = numeric_attr_values(blob, b"cm", b"authorId") else {
                    continue;
                };
                let mut unknown: Vec<u32> = refs
                    .into_iter()
                    .filter(|author| !author_ids.contains(author))
                    .collect();
                unknown.sort_unstable();
                unknown.dedup();
                for author in unknown {
                    findings.push(Finding::advisory(
                        FindingKind::UnknownCommentAuthor,
                        Some(format!("/{name}")),
                        format!("authorId {author} is not declared in commentAuthors"),
                    ));
                }
            }
        }
    }

    // Media nobody points at is dead weight.
    for member in members.keys() {
        let is_media = typed.get(member.as_str()).is_some_and(|ct| {
            ct.starts_with("image/") || ct.starts_with("audio/") || ct.starts_with("video/")
        }) || member.starts_with("ppt/media/");
        if is_media && !referenced_lower.contains(&member.to_lowercase()) {
            findings.push(Finding::advisory(
                FindingKind::OrphanedMedia,
                Some(format!("/{member}")),
                "media entry is not referenced by any relationship".to_string(),
            ));
        }
    }

    // app.xml counters drift when files are edited by hand.
    if types.is_some() {
        let app_member = members.keys().find(|member| {
            matches!(typed.get(member.as_str()), Some(ct) if ct == content_type::OFC_EXTENDED_PROPERTIES)
                || member.eq_ignore_ascii_case("docProps/app.xml")
        });
        if let Some(member) = app_member {
            let blob = &members[member.as_str()];
            if let (Some(counter), Some(actual)) = (counter_value(blob, "Slides"), slide_list_len)
            {
                if counter != actual as u64 {
                    findings.push(Finding::advisory(
                        FindingKind::AppCountMismatch,
                        Some(format!("/{member}")),
                        format!("Slides counter is {counter}, sldIdLst has {actual} entries"),
                    ));
                }
            }
            if let Some(counter) = counter_value(blob, "Notes") {
                let actual = members
                    .keys()
                    .filter(|m| {
                        matches!(typed.get(m.as_str()), Some(ct) if ct == content_type::PML_NOTES_SLIDE)
                    })
                    .count();
                if counter != actual as u64 {
                    findings.push(Finding::advisory(
                        FindingKind::AppCountMismatch,
                        Some(format!("/{member}")),
                        format!("Notes counter is {counter}, package has {actual} notes slides"),
                    ));
                }
            }
        }
    }

    findings.sort_by(|a, b| {
        (a.severity, a.kind, &a.part, &a.detail).cmp(&(b.severity, b.kind, &b.part, &b.detail))
    });
    Ok(findings)
}

/// Map a `.rels` membername to its owning part's membername and the
/// base URI its targets resolve against. The package's own rels maps to
/// an empty owner name.
fn owner_of_rels(member: &str) -> Option<(String, String)> {
    if member == PACKAGE_RELS_MEMBER {
        return Some((String::new(), "/".to_string()));
    }
    let stem = member.strip_suffix(".rels")?;
    if let Some(pos) = stem.rfind("/_rels/") {
        let dir = &stem[..pos];
        let file = &stem[pos + "/_rels/".len()..];
        Some((format!("{dir}/{file}"), format!("/{dir}")))
    } else if let Some(file) = stem.strip_prefix("_rels/") {
        Some((file.to_string(), "/".to_string()))
    } else {
        None
    }
}

fn is_xml_content_type(ct: &str) -> bool {
    ct.ends_with("+xml") || ct == content_type::XML || ct == "text/xml"
}

fn push_duplicate_ids(
    findings: &mut Vec<Finding>,
    kind: FindingKind,
    label: &str,
    member: &str,
    entries: &[ListEntry],
) {
    let mut seen: BTreeMap<u32, u32> = BTreeMap::new();
    for entry in entries {
        if let Some(id) = entry.id {
            *seen.entry(id).or_insert(0) += 1;
        }
    }
    for (id, count) in seen {
        if count > 1 {
            findings.push(Finding::blocking(
                kind,
                Some(format!("/{member}")),
                format!("{label} {id} appears {count} times"),
            ));
        }
    }
}

/// Read `<name>value</name>` out of an app properties body.
fn counter_value(xml: &[u8], name: &str) -> Option<u64> {
    let open = format!("<{name}>");
    let close = format!("</{name}>");
    let start = memmem::find(xml, open.as_bytes())? + open.len();
    let end = memmem::find(&xml[start..], close.as_bytes())? + start;
    atoi_simd::parse::<u64>(&xml[start..end]).ok()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pptx::tests::fixtures;

    #[test]
    fn test_clean_package_has_no_findings() {
        let findings = validate_bytes(&fixtures::minimal_pptx()).unwrap();
        assert_eq!(findings, vec![]);
    }

    #[test]
    fn test_dangling_relationship_is_blocking() {
        let rels = fixtures::SLIDE_RELS.replace(
            "</Relationships>",
            r#"<Relationship Id="rId9" Type="http://schemas.openxmlformats.org/officeDocument/2006/relationships/image" Target="../media/ghost.png"/></Relationships>"#,
        );
        let mut entries = fixtures::minimal_members();
        for entry in &mut entries {
            if entry.0 == "ppt/slides/_rels/slide1.xml.rels" {
                entry.1 = rels.as_bytes().to_vec();
            }
        }
        let findings = validate_bytes(&fixtures::zip_of_owned(&entries)).unwrap();
        assert!(findings.iter().any(|f| {
            f.kind == FindingKind::DanglingRelationship && f.is_blocking()
        }));
    }

    #[test]
    fn test_duplicate_slide_id_is_blocking() {
        let pres = fixtures::PRESENTATION_XML.replace(
            "</p:sldIdLst>",
            r#"<p:sldId id="256" r:id="rId2"/></p:sldIdLst>"#,
        );
        let mut entries = fixtures::minimal_members();
        for entry in &mut entries {
            if entry.0 == "ppt/presentation.xml" {
                entry.1 = pres.as_bytes().to_vec();
            }
        }
        let findings = validate_bytes(&fixtures::zip_of_owned(&entries)).unwrap();
        assert!(findings.iter().any(|f| {
            f.kind == FindingKind::DuplicateSlideId && f.is_blocking()
        }));
    }

    #[test]
    fn test_section_slide_refs_must_exist() {
        let pres = fixtures::PRESENTATION_XML.replace(
            "</p:presentation>",
            concat!(
                r#"<p:extLst><p:ext uri="{521415D9-36F7-43E2-AB2F-B90AF26B5E84}">"#,
                r#"<p14:sectionLst xmlns:p14="http://schemas.microsoft.com/office/powerpoint/2010/main">"#,
                r#"<p14:section name="Intro" id="{9D9BEDB1-7B9C-4EF7-B8D2-68F2A1E86E43}">"#,
                r#"<p14:sldIdLst><p14:sldId id="256"/><p14:sldId id="999"/></p14:sldIdLst>"#,
                r#"</p14:section></p14:sectionLst></p:ext></p:extLst></p:presentation>"#
            ),
        );
        let mut entries = fixtures::minimal_members();
        for entry in &mut entries {
            if entry.0 == "ppt/presentation.xml" {
                entry.1 = pres.as_bytes().to_vec();
            }
        }
        let findings = validate_bytes(&fixtures::zip_of_owned(&entries)).unwrap();
        let stale: Vec<_> = findings
            .iter()
            .filter(|f| f.kind == FindingKind::DanglingSectionSlide)
            .collect();
        assert_eq!(stale.len(), 1, "only the unknown id is flagged");
        assert_eq!(stale[0].severity, Severity::Advisory);
        assert!(stale[0].detail.contains("999"));
        // Section entries are not deck slides, so neither the duplicate
        // check nor the app counter sees them.
        assert!(!findings.iter().any(Finding::is_blocking));
        assert!(!findings.iter().any(|f| f.kind == FindingKind::AppCountMismatch));
    }

    #[test]
    fn test_orphaned_media_is_advisory() {
        let mut entries = fixtures::minimal_members();
        entries.push(("ppt/media/image1.png".to_string(), b"\x89PNG\r\n".to_vec()));
        let findings = validate_bytes(&fixtures::zip_of_owned(&entries)).unwrap();
        let orphan = findings
            .iter()
            .find(|f| f.kind == FindingKind::OrphanedMedia)
            .unwrap();
        assert_eq!(orphan.severity, Severity::Advisory);
        assert_eq!(orphan.part.as_deref(), Some("/ppt/media/image1.png"));
        assert!(!findings.iter().any(Finding::is_blocking));
    }

    #[test]
    fn test_cased_path_collision_is_blocking() {
        let mut entries = fixtures::minimal_members();
        entries.push((
            "ppt/slides/Slide1.xml".to_string(),
            fixtures::SLIDE_XML.as_bytes().to_vec(),
        ));
        let findings = validate_bytes(&fixtures::zip_of_owned(&entries)).unwrap();
        assert!(findings.iter().any(|f| {
            f.kind == FindingKind::CasedPathCollision && f.is_blocking()
        }));
    }

    #[test]
    fn test_missing_content_type_is_blocking() {
        let stripped = fixtures::CONTENT_TYPES
            .replace(fixtures::SLIDE_OVERRIDE, "")
            .replace(fixtures::XML_DEFAULT, "");
        let mut entries = fixtures::minimal_members();
        for entry in &mut entries {
            if entry.0 == "[Content_Types].xml" {
                entry.1 = stripped.as_bytes().to_vec();
            }
        }
        let findings = validate_bytes(&fixtures::zip_of_owned(&entries)).unwrap();
        let missing = findings
            .iter()
            .find(|f| f.kind == FindingKind::MissingContentType)
            .unwrap();
        assert!(missing.is_blocking());
        assert_eq!(missing.part.as_deref(), Some("/ppt/slides/slide1.xml"));
    }

    #[test]
    fn test_duplicate_rel_id_is_blocking() {
        let rels = fixtures::SLIDE_RELS.replace(
            "</Relationships>",
            r#"<Relationship Id="rId1" Type="http://schemas.openxmlformats.org/officeDocument/2006/relationships/slideLayout" Target="../slideLayouts/slideLayout1.xml"/></Relationships>"#,
        );
        let mut entries = fixtures::minimal_members();
        for entry in &mut entries {
            if entry.0 == "ppt/slides/_rels/slide1.xml.rels" {
                entry.1 = rels.as_bytes().to_vec();
            }
        }
        let findings = validate_bytes(&fixtures::zip_of_owned(&entries)).unwrap();
        assert!(findings.iter().any(|f| {
            f.kind == FindingKind::DuplicateRelId && f.is_blocking()
        }));
    }

    #[test]
    fn test_undeclared_body_rid_is_blocking() {
        let slide = fixtures::SLIDE_XML.replace(
            "<p:spTree/>",
            r#"<p:spTree><p:pic><a:blip r:embed="rId7"/></p:pic></p:spTree>"#,
        );
        let mut entries = fixtures::minimal_members();
        for entry in &mut entries {
            if entry.0 == "ppt/slides/slide1.xml" {
                entry.1 = slide.as_bytes().to_vec();
            }
        }
        let findings = validate_bytes(&fixtures::zip_of_owned(&entries)).unwrap();
        let undeclared = findings
            .iter()
            .find(|f| f.kind == FindingKind::UndeclaredRelId)
            .unwrap();
        assert!(undeclared.is_blocking());
        assert!(undeclared.detail.contains("rId7"));
    }

    #[test]
    fn test_app_count_mismatch_is_advisory() {
        let app = fixtures::APP_XML.replace("<Slides>1</Slides>", "<Slides>9</Slides>");
        let mut entries = fixtures::minimal_members();
        for entry in &mut entries {
            if entry.0 == "docProps/app.xml" {
                entry.1 = app.as_bytes().to_vec();
            }
        }
        let findings = validate_bytes(&fixtures::zip_of_owned(&entries)).unwrap();
        let drift = findings
            .iter()
            .find(|f| f.kind == FindingKind::AppCountMismatch)
            .unwrap();
        assert_eq!(drift.severity, Severity::Advisory);
        assert!(drift.detail.contains('9'));
    }

    #[test]
    fn test_comment_author_refs_must_resolve() {
        let types = fixtures::CONTENT_TYPES.replace(
            "</Types>",
            concat!(
                r#"  <Override PartName="/ppt/commentAuthors.xml" ContentType="application/vnd.openxmlformats-officedocument.presentationml.commentAuthors+xml"/>"#,
                "\n",
                r#"  <Override PartName="/ppt/comments/comment1.xml" ContentType="application/vnd.openxmlformats-officedocument.presentationml.comments+xml"/>"#,
                "\n</Types>"
            ),
        );
        let mut entries = fixtures::minimal_members();
        for entry in &mut entries {
            if entry.0 == "[Content_Types].xml" {
                entry.1 = types.as_bytes().to_vec();
            }
        }
        entries.push((
            "ppt/commentAuthors.xml".to_string(),
            br#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>
<p:cmAuthorLst xmlns:p="http://schemas.openxmlformats.org/presentationml/2006/main"><p:cmAuthor id="0" name="Reviewer" initials="R" lastIdx="1" clrIdx="0"/></p:cmAuthorLst>"#
                .to_vec(),
        ));
        entries.push((
            "ppt/comments/comment1.xml".to_string(),
            br#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>
<p:cmLst xmlns:p="http://schemas.openxmlformats.org/presentationml/2006/main"><p:cm authorId="0" dt="2024-01-05T10:00:00" idx="1"><p:pos x="10" y="10"/><p:text>looks fine</p:text></p:cm><p:cm authorId="4" dt="2024-01-05T10:05:00" idx="2"><p:pos x="10" y="10"/><p:text>second pass</p:text></p:cm></p:cmLst>"#
                .to_vec(),
        ));
        let findings = validate_bytes(&fixtures::zip_of_owned(&entries)).unwrap();
        let unknown: Vec<_> = findings
            .iter()
            .filter(|f| f.kind == FindingKind::UnknownCommentAuthor)
            .collect();
        assert_eq!(unknown.len(), 1, "declared authors are not flagged");
        assert_eq!(unknown[0].severity, Severity::Advisory);
        assert_eq!(unknown[0].part.as_deref(), Some("/ppt/comments/comment1.xml"));
        assert!(unknown[0].detail.contains('4'));
        assert!(!findings.iter().any(Finding::is_blocking));
    }

    #[test]
    fn test_owner_of_rels() {
        assert_eq!(
            owner_of_rels("_rels/.rels"),
            Some((String::new(), "/".to_string()))
        );
        assert_eq!(
            owner_of_rels("ppt/_rels/presentation.xml.rels"),
            Some(("ppt/presentation.xml".to_string(), "/ppt".to_string()))
        );
        assert_eq!(
            owner_of_rels("ppt/slides/_rels/slide1.xml.rels"),
            Some((
                "ppt/slides/slide1.xml".to_string(),
                "/ppt/slides".to_string()
            ))
        );
        assert_eq!(owner_of_rels("ppt/slides/slide1.xml"), None);
    }
}
