//! Slide master bookkeeping.
//!
//! A master owns its layouts twice over: relationship table rows typed
//! slideLayout, and `p:sldLayoutId` entries in the body. Editing can put
//! the two out of step, so a dirty master gets its layout block rebuilt
//! on commit: the body list in document order is the truth, layout rIds
//! are re-keyed as one contiguous block after the highest retained
//! non-layout rId, and rels missing from the list are appended at the
//! end. Non-layout rIds never move, which keeps `r:embed` style
//! references inside the body valid without rewriting them.

use crate::error::Result;
use crate::opc::constants::relationship_type;
use crate::opc::rel::rid_number;
use crate::pptx::ids::RESERVED_ID_BASE;
use crate::pptx::package::Package;
use crate::pptx::part::{PartId, PartTable, RelEntry, RelTarget};
use crate::pptx::xmledit;
use std::collections::HashSet;

const LAYOUT_LIST: &str = "p:sldLayoutIdLst";

/// Elements that may follow `p:sldLayoutIdLst` inside `p:sldMaster`.
const LAYOUT_LIST_SUCCESSORS: &[&str] =
    &["p:transition", "p:timing", "p:hf", "p:txStyles", "p:extLst"];

/// Layout parts in the master's document order.
pub(crate) fn layout_parts(pkg: &mut Package, master: PartId) -> Result<Vec<PartId>> {
    let body = pkg.part_content(master)?.clone();
    let entries = xmledit::list_entries(&body, b"sldLayoutId")?;
    let table = pkg.part_table(master)?;
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

/// Put a layout under this master: a slideLayout relationship plus a
/// `p:sldLayoutId` entry with a fresh reserved-range id. A layout already
/// on the list is left alone.
pub(crate) fn append_layout(pkg: &mut Package, master: PartId, layout: PartId) -> Result<()> {
    let rid = pkg
        .table_mut(master)?
        .get_or_add(relationship_type::SLIDE_LAYOUT, RelTarget::Part(layout));
    let body = pkg.part_content(master)?.clone();
    let entries = xmledit::list_entries(&body, b"sldLayoutId")?;
    if entries
        .iter()
        .any(|entry| entry.rid.as_deref() == Some(rid.as_str()))
    {
        return Ok(());
    }
    let id = pkg.id_allocator_mut().next_id();
    let entry_xml = format!(r#"<p:sldLayoutId id="{id}" r:id="{rid}"/>"#);
    let updated = xmledit::append_into_list(&body, LAYOUT_LIST, &entry_xml, LAYOUT_LIST_SUCCESSORS);
    pkg.set_part_content(master, updated)?;
    Ok(())
}

/// Rebuild a dirty master's layout block before it is written out.
///
/// Repeating the pass on an unchanged master assigns the same rIds again,
/// so alternating edits and saves cannot make the numbering drift.
pub(crate) fn renumber_layouts(pkg: &mut Package, master: PartId) -> Result<()> {
    let touched = match pkg.part(master) {
        Some(part) => {
            part.is_dirty() || part.table().is_some_and(|table| table.is_dirty())
        },
        None => false,
    };
    if !touched {
        return Ok(());
    }

    pkg.ensure_table(master)?;
    let body = pkg.part_content(master)?.clone();
    let listed = xmledit::list_entries(&body, b"sldLayoutId")?;

    let (base_uri, rows): (String, Vec<(String, RelEntry)>) = {
        let table = pkg.part_table(master)?;
        (
            table.base_uri().to_string(),
            table
                .iter()
                .map(|(rid, entry)| (rid.to_string(), entry.clone()))
                .collect(),
        )
    };

    let mut keep_max = 0u32;
    let mut new_table = PartTable::new(base_uri);
    for (rid, entry) in &rows {
        if entry.reltype != relationship_type::SLIDE_LAYOUT {
            if let Some(number) = rid_number(rid) {
                keep_max = keep_max.max(number);
            }
            new_table.insert_raw(rid.clone(), entry.clone());
        }
    }

    // Body list order decides the block; rels off the list trail behind it.
    let mut next = keep_max;
    let mut consumed: HashSet<&str> = HashSet::with_capacity(rows.len());
    let mut block: Vec<(String, Option<u32>)> = Vec::with_capacity(rows.len());
    for entry in &listed {
        let Some(rid) = entry.rid.as_deref() else { continue };
        if consumed.contains(rid) {
            continue;
        }
        let Some((_, rel)) = rows
            .iter()
            .find(|(old, rel)| old == rid && rel.reltype == relationship_type::SLIDE_LAYOUT)
        else {
            continue;
        };
        consumed.insert(rid);
        next += 1;
        let new_rid = format!("rId{next}");
        new_table.insert_raw(new_rid.clone(), rel.clone());
        block.push((new_rid, entry.id));
    }
    for (rid, rel) in &rows {
        if rel.reltype == relationship_type::SLIDE_LAYOUT && !consumed.contains(rid.as_str()) {
            next += 1;
            let new_rid = format!("rId{next}");
            new_table.insert_raw(new_rid.clone(), rel.clone());
            block.push((new_rid, None));
        }
    }

    // Reserved-range ids are reissued; native ids, however they got here,
    // are kept as they are.
    let mut inner = String::with_capacity(block.len() * 48);
    for (rid, listed_id) in &block {
        let id = match listed_id {
            Some(id) if *id < RESERVED_ID_BASE => *id,
            _ => pkg.id_allocator_mut().next_id(),
        };
        inner.push_str("<p:sldLayoutId id=\"");
        inner.push_str(itoa::Buffer::new().format(id));
        inner.push_str("\" r:id=\"");
        inner.push_str(rid);
        inner.push_str("\"/>");
    }

    let updated = match xmledit::replace_list(&body, LAYOUT_LIST, &inner) {
        Some(updated) => updated,
        None if block.is_empty() => body.to_vec(),
        None => xmledit::append_into_list(&body, LAYOUT_LIST, &inner, LAYOUT_LIST_SUCCESSORS),
    };
    pkg.set_part_content(master, updated)?;
    *pkg.table_mut(master)? = new_table;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pptx::tests::fixtures;

    #[test]
    fn test_layout_parts() {
        let mut pkg = Package::from_bytes(&fixtures::minimal_pptx()).unwrap();
        let master = pkg
            .part_by_path("/ppt/slideMasters/slideMaster1.xml")
            .unwrap();
        let layouts = layout_parts(&mut pkg, master).unwrap();
        assert_eq!(layouts.len(), 1);
        assert_eq!(
            pkg.part(layouts[0]).unwrap().path().as_str(),
            "/ppt/slideLayouts/slideLayout1.xml"
        );
    }

    #[test]
    fn test_clean_master_is_left_alone() {
        let mut pkg = Package::from_bytes(&fixtures::minimal_pptx()).unwrap();
        let master = pkg
            .part_by_path("/ppt/slideMasters/slideMaster1.xml")
            .unwrap();
        let before = pkg.part_content(master).unwrap().clone();
        renumber_layouts(&mut pkg, master).unwrap();
        let after = pkg.part_content(master).unwrap().clone();
        assert_eq!(before, after);
    }

    #[test]
    fn test_append_layout_rekeys_block_on_commit() {
        // Donate a second layout to the master, then check the rebuilt
        // block: theme keeps rId2, layouts land on rId3 and rId4.
        let mut pkg = Package::from_bytes(&fixtures::minimal_pptx()).unwrap();
        let mut donor = Package::from_bytes(&fixtures::minimal_pptx()).unwrap();
        let donor_layout = donor
            .part_by_path("/ppt/slideLayouts/slideLayout1.xml")
            .unwrap();
        // Force a distinct body so the layout clones instead of deduping.
        donor
            .set_part_content(
                donor_layout,
                fixtures::LAYOUT_XML.replace("spTree/", "spTree />").into_bytes(),
            )
            .unwrap();
        pkg.import_from(&mut donor, donor_layout).unwrap();

        let master = pkg
            .part_by_path("/ppt/slideMasters/slideMaster1.xml")
            .unwrap();
        let table = pkg.part_table(master).unwrap();
        assert_eq!(
            table.get("rId2").unwrap().reltype,
            crate::opc::constants::relationship_type::THEME
        );
        assert_eq!(
            table.get("rId3").unwrap().reltype,
            relationship_type::SLIDE_LAYOUT
        );
        assert_eq!(
            table.get("rId4").unwrap().reltype,
            relationship_type::SLIDE_LAYOUT
        );
        assert!(table.get("rId1").is_none(), "old layout key is re-keyed away");

        let body = pkg.part_content(master).unwrap().clone();
        let entries = xmledit::list_entries(&body, b"sldLayoutId").unwrap();
        assert_eq!(entries.len(), 2);
        assert_eq!(entries[0].rid.as_deref(), Some("rId3"));
        assert_eq!(entries[1].rid.as_deref(), Some("rId4"));
        for entry in &entries {
            assert!(entry.id.unwrap() >= RESERVED_ID_BASE);
        }
    }

    #[test]
    fn test_renumber_is_stable_across_saves() {
        let mut pkg = Package::from_bytes(&fixtures::minimal_pptx()).unwrap();
        let master = pkg
            .part_by_path("/ppt/slideMasters/slideMaster1.xml")
            .unwrap();
        // Dirty the master without changing its meaning.
        let body = pkg.part_content(master).unwrap().clone();
        pkg.set_part_content(master, body.to_vec()).unwrap();
        pkg.commit().unwrap();

        let master = pkg
            .part_by_path("/ppt/slideMasters/slideMaster1.xml")
            .unwrap();
        let first = pkg.part_content(master).unwrap().clone();
        let rids_once: Vec<String> = pkg
            .part_table(master)
            .unwrap()
            .iter()
            .map(|(rid, _)| rid.to_string())
            .collect();

        // Again: the rId assignment must come out identical.
        let body = pkg.part_content(master).unwrap().clone();
        pkg.set_part_content(master, body.to_vec()).unwrap();
        pkg.commit().unwrap();

        let master = pkg
            .part_by_path("/ppt/slideMasters/slideMaster1.xml")
            .unwrap();
        let rids_twice: Vec<String> = pkg
            .part_table(master)
            .unwrap()
            .iter()
            .map(|(rid, _)| rid.to_string())
            .collect();
        assert_eq!(rids_once, rids_twice);

        let second = pkg.part_content(master).unwrap().clone();
        let entries_first = xmledit::list_entries(&first, b"sldLayoutId").unwrap();
        let entries_second = xmledit::list_entries(&second, b"sldLayoutId").unwrap();
        assert_eq!(
            entries_first.iter().map(|e| e.rid.clone()).collect::<Vec<_>>(),
            entries_second.iter().map(|e| e.rid.clone()).collect::<Vec<_>>(),
        );
    }
}
