//! Slide layout bookkeeping.

use crate::error::Result;
use crate::opc::constants::relationship_type;
use crate::pptx::package::Package;
use crate::pptx::part::{PartId, RelTarget};

/// The master managing this layout, through its slideMaster relationship.
pub(crate) fn master_of(pkg: &mut Package, layout: PartId) -> Result<Option<PartId>> {
    let table = pkg.part_table(layout)?;
    match table.first_of_type(relationship_type::SLIDE_MASTER) {
        Some((_, entry)) => match &entry.target {
            RelTarget::Part(pid) => Ok(Some(*pid)),
            _ => Ok(None),
        },
        None => Ok(None),
    }
}

/// A layout written out without a managing master would render the deck
/// unopenable, so newly created layouts are adopted by the package's
/// first master before the commit. A package with no master at all is
/// left for the validator to report.
pub(crate) fn ensure_master(pkg: &mut Package, layout: PartId) -> Result<()> {
    if master_of(pkg, layout)?.is_some() {
        return Ok(());
    }
    let masters = crate::pptx::presentation::master_parts(pkg)?;
    let Some(master) = masters.first().copied() else {
        return Ok(());
    };
    pkg.table_mut(layout)?
        .get_or_add(relationship_type::SLIDE_MASTER, RelTarget::Part(master));
    crate::pptx::master::append_layout(pkg, master, layout)?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pptx::tests::fixtures;

    #[test]
    fn test_master_of() {
        let mut pkg = Package::from_bytes(&fixtures::minimal_pptx()).unwrap();
        let layout = pkg
            .part_by_path("/ppt/slideLayouts/slideLayout1.xml")
            .unwrap();
        let master = master_of(&mut pkg, layout).unwrap().unwrap();
        assert_eq!(
            pkg.part(master).unwrap().path().as_str(),
            "/ppt/slideMasters/slideMaster1.xml"
        );
    }

    #[test]
    fn test_ensure_master_attaches_first_master() {
        let mut pkg = Package::from_bytes(&fixtures::minimal_pptx()).unwrap();
        let master = pkg
            .part_by_path("/ppt/slideMasters/slideMaster1.xml")
            .unwrap();

        // An orphan layout, as a raw part with no relationships.
        let path = pkg
            .registry_mut()
            .allocate_name("/ppt/slideLayouts/slideLayout%d.xml")
            .unwrap();
        let orphan = pkg.add_part(
            path,
            crate::opc::constants::content_type::PML_SLIDE_LAYOUT.to_string(),
            relationship_type::SLIDE_LAYOUT.to_string(),
            bytes::Bytes::from_static(fixtures::LAYOUT_XML.as_bytes()),
        );

        ensure_master(&mut pkg, orphan).unwrap();
        assert_eq!(master_of(&mut pkg, orphan).unwrap(), Some(master));

        // And the master lists the orphan now.
        let layouts = crate::pptx::master::layout_parts(&mut pkg, master).unwrap();
        assert!(layouts.contains(&orphan));
    }
}
