//! Operations on the main presentation part.
//!
//! The presentation body carries four id lists that decide what the deck
//! actually shows: `p:sldMasterIdLst`, `p:notesMasterIdLst`,
//! `p:handoutMasterIdLst` and `p:sldIdLst`. Registration appends to the
//! right list and keeps the matching relationship table entry in step.

use crate::error::{Error, Result};
use crate::opc::error::OpcError;
use crate::pptx::ids::RESERVED_ID_BASE;
use crate::pptx::package::Package;
use crate::pptx::part::{PartId, PartKind, RelTarget};
use crate::pptx::xmledit::{self, ListEntry};

/// PowerPoint numbers `p:sldId` entries from 256.
pub(crate) const FIRST_SLIDE_ID: u32 = 256;

/// `p:sldId` entries of the main slide list in document order. The scan
/// is scoped to `p:sldIdLst`; `sldId` entries inside section lists do
/// not qualify.
pub(crate) fn slide_entries(pkg: &mut Package) -> Result<Vec<ListEntry>> {
    let pres = pkg.presentation_part();
    let body = pkg.part_content(pres)?.clone();
    match xmledit::list_inner(&body, "p:sldIdLst") {
        Some((start, end)) => Ok(xmledit::list_entries(&body[start..end], b"sldId")?),
        None => Ok(Vec::new()),
    }
}

/// `p:sldMasterId` entries in document order.
pub(crate) fn master_entries(pkg: &mut Package) -> Result<Vec<ListEntry>> {
    let pres = pkg.presentation_part();
    let body = pkg.part_content(pres)?.clone();
    Ok(xmledit::list_entries(&body, b"sldMasterId")?)
}

fn parts_for(pkg: &mut Package, entries: Vec<ListEntry>) -> Result<Vec<PartId>> {
    let pres = pkg.presentation_part();
    let table = pkg.part_table(pres)?;
    let mut out = Vec::with_capacity(entries.len());
    for entry in entries {
        let Some(rid) = entry.rid else { continue };
        if let Some(rel) = table.get(&rid) {
            if let RelTarget::Part(pid) = rel.target {
                out.push(pid);
            }
        }
    }
    Ok(out)
}

/// Slide parts in presentation order. List entries whose rId does not
/// resolve are skipped.
pub(crate) fn slide_parts(pkg: &mut Package) -> Result<Vec<PartId>> {
    let entries = slide_entries(pkg)?;
    parts_for(pkg, entries)
}

/// Slide master parts in presentation order.
pub(crate) fn master_parts(pkg: &mut Package) -> Result<Vec<PartId>> {
    let entries = master_entries(pkg)?;
    parts_for(pkg, entries)
}

/// Register a part on the presentation: ensure a relationship to it and
/// an entry on the id list its kind belongs to. Kinds without a list are
/// a no-op. Already-registered parts are left alone.
pub(crate) fn add_resource(pkg: &mut Package, target: PartId) -> Result<()> {
    let kind = match pkg.part(target) {
        Some(part) => part.kind(),
        None => {
            return Err(Error::Opc(OpcError::PartNotFound(format!(
                "no part for handle {target:?}"
            ))));
        },
    };
    let Some(reltype) = kind.default_rel_type() else {
        return Ok(());
    };
    let (list, entry_local, successors): (&str, &[u8], &[&str]) = match kind {
        PartKind::Slide => ("p:sldIdLst", b"sldId", &["p:sldSz"]),
        PartKind::SlideMaster => ("p:sldMasterIdLst", b"sldMasterId", &[
            "p:notesMasterIdLst",
            "p:handoutMasterIdLst",
            "p:sldIdLst",
            "p:sldSz",
        ]),
        PartKind::NotesMaster => ("p:notesMasterIdLst", b"notesMasterId", &[
            "p:handoutMasterIdLst",
            "p:sldIdLst",
            "p:sldSz",
        ]),
        PartKind::HandoutMaster => {
            ("p:handoutMasterIdLst", b"handoutMasterId", &["p:sldIdLst", "p:sldSz"])
        },
        _ => return Ok(()),
    };

    let pres = pkg.presentation_part();
    let rid = pkg
        .table_mut(pres)?
        .get_or_add(reltype, RelTarget::Part(target));
    let body = pkg.part_content(pres)?.clone();
    let existing = match xmledit::list_inner(&body, list) {
        Some((start, end)) => xmledit::list_entries(&body[start..end], entry_local)?,
        None => Vec::new(),
    };
    if existing
        .iter()
        .any(|entry| entry.rid.as_deref() == Some(rid.as_str()))
    {
        return Ok(());
    }

    let entry_xml = match kind {
        PartKind::Slide => {
            // Native ids: one past the highest in the list, floor 256.
            // Ids that strayed into the reserved range are ignored here.
            let next = existing
                .iter()
                .filter_map(|entry| entry.id)
                .filter(|id| *id < RESERVED_ID_BASE)
                .fold(FIRST_SLIDE_ID - 1, u32::max)
                + 1;
            format!(r#"<p:sldId id="{next}" r:id="{rid}"/>"#)
        },
        PartKind::SlideMaster => {
            let id = pkg.id_allocator_mut().next_id();
            format!(r#"<p:sldMasterId id="{id}" r:id="{rid}"/>"#)
        },
        PartKind::NotesMaster => format!(r#"<p:notesMasterId r:id="{rid}"/>"#),
        PartKind::HandoutMaster => format!(r#"<p:handoutMasterId r:id="{rid}"/>"#),
        _ => return Ok(()),
    };

    let updated = xmledit::append_into_list(&body, list, &entry_xml, successors);
    pkg.set_part_content(pres, updated)?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pptx::tests::fixtures;

    #[test]
    fn test_slide_parts_in_order() {
        let mut pkg = Package::from_bytes(&fixtures::two_slide_pptx()).unwrap();
        let slides = pkg.slides().unwrap();
        assert_eq!(slides.len(), 2);
        let first = pkg.part(slides[0]).unwrap().path().as_str().to_string();
        let second = pkg.part(slides[1]).unwrap().path().as_str().to_string();
        assert_eq!(first, "/ppt/slides/slide1.xml");
        assert_eq!(second, "/ppt/slides/slide2.xml");
    }

    #[test]
    fn test_register_slide_assigns_next_native_id() {
        let mut pkg = Package::from_bytes(&fixtures::minimal_pptx()).unwrap();
        // Re-register the layout part as if it were a new slide target:
        // use a real new slide instead, cloned from the existing one.
        let slide = pkg.part_by_path("/ppt/slides/slide1.xml").unwrap();
        let copied = pkg.import_within(slide).unwrap();

        let entries = slide_entries(&mut pkg).unwrap();
        assert_eq!(entries.len(), 2);
        assert_eq!(entries[0].id, Some(256));
        assert_eq!(entries[1].id, Some(257));

        let slides = pkg.slides().unwrap();
        assert_eq!(slides[1], copied);
    }

    #[test]
    fn test_section_entries_are_not_deck_slides() {
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
        let mut members = fixtures::minimal_members();
        for member in &mut members {
            if member.0 == "ppt/presentation.xml" {
                member.1 = pres.as_bytes().to_vec();
            }
        }
        let mut pkg = Package::from_bytes(&fixtures::zip_of_owned(&members)).unwrap();
        assert_eq!(pkg.slides().unwrap().len(), 1);

        let slide = pkg.part_by_path("/ppt/slides/slide1.xml").unwrap();
        pkg.import_within(slide).unwrap();
        let entries = slide_entries(&mut pkg).unwrap();
        assert_eq!(entries.len(), 2);
        assert_eq!(
            entries[1].id,
            Some(257),
            "section ids do not raise the native ceiling"
        );
    }

    #[test]
    fn test_register_is_idempotent() {
        let mut pkg = Package::from_bytes(&fixtures::minimal_pptx()).unwrap();
        let slides = pkg.slides().unwrap();
        add_resource(&mut pkg, slides[0]).unwrap();
        let entries = slide_entries(&mut pkg).unwrap();
        assert_eq!(entries.len(), 1);
    }

    #[test]
    fn test_register_master_creates_list() {
        let mut pkg = Package::from_bytes(&fixtures::empty_pptx()).unwrap();
        assert!(pkg.slide_masters().unwrap().is_empty());

        // Import a master wholesale from a donor package.
        let mut donor = Package::from_bytes(&fixtures::minimal_pptx()).unwrap();
        let master = donor
            .part_by_path("/ppt/slideMasters/slideMaster1.xml")
            .unwrap();
        pkg.import_from(&mut donor, master).unwrap();

        let masters = pkg.slide_masters().unwrap();
        assert_eq!(masters.len(), 1);
        let entries = master_entries(&mut pkg).unwrap();
        assert_eq!(entries[0].id, Some(crate::pptx::ids::RESERVED_ID_BASE));
    }

    #[test]
    fn test_register_theme_is_noop() {
        let mut pkg = Package::from_bytes(&fixtures::minimal_pptx()).unwrap();
        let theme = pkg.part_by_path("/ppt/theme/theme1.xml").unwrap();
        let before = pkg.part_content(pkg.presentation_part()).unwrap().clone();
        add_resource(&mut pkg, theme).unwrap();
        let after = pkg.part_content(pkg.presentation_part()).unwrap().clone();
        assert_eq!(before, after);
    }
}
