//! Cross-package cloning of presentation resources.
//!
//! An import walks the transitive relationship closure of a root part,
//! snapshots every node it finds, and replays the snapshot into the
//! destination. The snapshot owns its bytes, so the destination may be
//! the source package itself. Non-identity parts are deduplicated by
//! content digest against same-directory parts already in the
//! destination; slides and notes slides always clone, because two
//! occurrences of the same markup are still two distinct slides.

use crate::error::{Error, Result};
use crate::opc::error::OpcError;
use crate::opc::packuri::PackURI;
use crate::opc::rel::rid_number;
use crate::pptx::package::Package;
use crate::pptx::part::{PartId, PartKind, RelEntry, RelTarget};
use crate::pptx::registry::content_digest;
use bytes::Bytes;
use fixedbitset::FixedBitSet;
use std::collections::HashMap;

/// One part of the closure, detached from its package.
#[derive(Debug)]
struct ImportNode {
    path: PackURI,
    kind: PartKind,
    content_type: String,
    rel_type: String,
    content: Bytes,
    /// rId, relationship type, and where it points
    entries: Vec<(String, String, SnapTarget)>,
}

#[derive(Debug)]
enum SnapTarget {
    Node(usize),
    External(String),
    Dangling(String),
}

/// Walk the closure from `root` and detach it. The root is node 0.
fn snapshot(source: &mut Package, root: PartId) -> Result<Vec<ImportNode>> {
    let mut order: Vec<PartId> = Vec::new();
    let mut visited = FixedBitSet::with_capacity(source.part_count());
    let mut stack = vec![root];
    while let Some(id) = stack.pop() {
        if visited.contains(id.index()) {
            continue;
        }
        visited.insert(id.index());
        order.push(id);

        let mut children: Vec<(String, PartId)> = Vec::new();
        for (rid, entry) in source.part_table(id)?.iter() {
            if let RelTarget::Part(child) = entry.target {
                children.push((rid.to_string(), child));
            }
        }
        children.sort_by(|a, b| {
            rid_number(&a.0)
                .cmp(&rid_number(&b.0))
                .then_with(|| a.0.cmp(&b.0))
        });
        for (_, child) in children.into_iter().rev() {
            if !visited.contains(child.index()) {
                stack.push(child);
            }
        }
    }

    let index_of: HashMap<PartId, usize> = order
        .iter()
        .enumerate()
        .map(|(index, id)| (*id, index))
        .collect();

    let mut nodes = Vec::with_capacity(order.len());
    for id in &order {
        let content = source.part_content(*id)?.clone();
        let (path, kind, content_type, rel_type) = {
            let part = match source.part(*id) {
                Some(part) => part,
                None => {
                    return Err(Error::Opc(OpcError::PartNotFound(format!(
                        "no part for handle {id:?}"
                    ))));
                },
            };
            (
                part.path().clone(),
                part.kind(),
                part.content_type().to_string(),
                part.rel_type().to_string(),
            )
        };
        // An XML part that lost its content type declaration cannot be
        // re-declared faithfully on the other side.
        if path.ext().eq_ignore_ascii_case("xml")
            && source.registry().classify(&path).is_none()
        {
            return Err(Error::MalformedPart(format!(
                "{} has no content type declaration",
                path.as_str()
            )));
        }
        let mut entries = Vec::new();
        for (rid, entry) in source.part_table(*id)?.iter() {
            let target = match &entry.target {
                RelTarget::Part(child) => match index_of.get(child) {
                    Some(node) => SnapTarget::Node(*node),
                    None => {
                        return Err(Error::MalformedPart(format!(
                            "closure of {} is missing a visited part",
                            path.as_str()
                        )));
                    },
                },
                RelTarget::External(url) => SnapTarget::External(url.clone()),
                RelTarget::Dangling(raw) => SnapTarget::Dangling(raw.clone()),
            };
            entries.push((rid.to_string(), entry.reltype.clone(), target));
        }
        nodes.push(ImportNode {
            path,
            kind,
            content_type,
            rel_type,
            content,
            entries,
        });
    }
    Ok(nodes)
}

/// Replay a snapshot into the destination. Returns the destination part
/// for every node, cloned or reused, in node order.
fn apply(dest: &mut Package, nodes: &[ImportNode]) -> Result<Vec<PartId>> {
    let mut resolved: Vec<Option<PartId>> = vec![None; nodes.len()];
    let mut cloned = vec![false; nodes.len()];

    for (index, node) in nodes.iter().enumerate() {
        let dir_lower = node.path.base_uri().to_lowercase();
        let digest = content_digest(&node.content);
        let reuse = if node.kind.is_identity() {
            None
        } else {
            dest.ensure_dir_indexed(&dir_lower)?;
            dest.find_similar_part(&dir_lower, &digest)
        };
        match reuse {
            Some(existing) => resolved[index] = Some(existing),
            None => {
                let path = dest.registry_mut().allocate_name(&node.path.template())?;
                let id = dest.add_part(
                    path,
                    node.content_type.clone(),
                    node.rel_type.clone(),
                    node.content.clone(),
                );
                dest.record_part_digest(dir_lower, digest, id);
                resolved[index] = Some(id);
                cloned[index] = true;
            },
        }
    }

    // Rebuild the cloned tables with their original rIds, so body
    // references keep resolving without a rewrite.
    for (index, node) in nodes.iter().enumerate() {
        if !cloned[index] {
            continue;
        }
        let Some(id) = resolved[index] else { continue };
        for (rid, reltype, target) in &node.entries {
            let target = match target {
                SnapTarget::Node(node_index) => match resolved[*node_index] {
                    Some(part) => RelTarget::Part(part),
                    None => continue,
                },
                SnapTarget::External(url) => RelTarget::External(url.clone()),
                SnapTarget::Dangling(raw) => RelTarget::Dangling(raw.clone()),
            };
            dest.table_mut(id)?.insert_raw(rid.clone(), RelEntry {
                reltype: reltype.clone(),
                target,
            });
        }
    }

    // Stitch the clones into the destination's structure.
    for (index, node) in nodes.iter().enumerate() {
        if !cloned[index] {
            continue;
        }
        let Some(id) = resolved[index] else { continue };
        match node.kind {
            PartKind::SlideLayout => {
                if let Some(master) = crate::pptx::layout::master_of(dest, id)? {
                    crate::pptx::master::append_layout(dest, master, id)?;
                }
            },
            PartKind::SlideMaster | PartKind::NotesMaster | PartKind::HandoutMaster => {
                crate::pptx::presentation::add_resource(dest, id)?;
            },
            _ => {},
        }
    }
    if cloned[0] && nodes[0].kind == PartKind::Slide {
        if let Some(root) = resolved[0] {
            crate::pptx::presentation::add_resource(dest, root)?;
        }
    }

    let mut out = Vec::with_capacity(resolved.len());
    for part in resolved {
        match part {
            Some(part) => out.push(part),
            None => {
                return Err(Error::MalformedPart(
                    "import resolved incompletely".to_string(),
                ));
            },
        }
    }
    Ok(out)
}

impl Package {
    /// Import the closure of `root` from another package, commit, and
    /// return the handle of the imported root.
    pub fn import_from(&mut self, source: &mut Package, root: PartId) -> Result<PartId> {
        let nodes = snapshot(source, root)?;
        let mapping = apply(self, &nodes)?;
        let root_path = self.root_path_of(&mapping)?;
        self.commit()?;
        self.part_by_path(&root_path)
            .ok_or_else(|| Error::Opc(OpcError::PartNotFound(root_path)))
    }

    /// Clone the closure of `root` inside this package. Shared resources
    /// deduplicate onto themselves, so this is how a slide is duplicated.
    pub fn import_within(&mut self, root: PartId) -> Result<PartId> {
        let nodes = snapshot(self, root)?;
        let mapping = apply(self, &nodes)?;
        let root_path = self.root_path_of(&mapping)?;
        self.commit()?;
        self.part_by_path(&root_path)
            .ok_or_else(|| Error::Opc(OpcError::PartNotFound(root_path)))
    }

    /// Import several roots with one commit at the end. Failures are
    /// reported per root and do not stop the rest of the batch.
    pub fn import_batch_from(
        &mut self,
        source: &mut Package,
        roots: &[PartId],
    ) -> Result<Vec<Result<PartId>>> {
        let mut staged: Vec<Result<String>> = Vec::with_capacity(roots.len());
        for root in roots {
            let outcome = snapshot(source, *root)
                .and_then(|nodes| apply(self, &nodes))
                .and_then(|mapping| self.root_path_of(&mapping));
            staged.push(outcome);
        }
        self.commit()?;
        Ok(staged
            .into_iter()
            .map(|outcome| {
                outcome.and_then(|path| {
                    self.part_by_path(&path)
                        .ok_or_else(|| Error::Opc(OpcError::PartNotFound(path)))
                })
            })
            .collect())
    }

    fn root_path_of(&self, mapping: &[PartId]) -> Result<String> {
        let root = mapping.first().and_then(|id| self.part(*id));
        match root {
            Some(part) => Ok(part.path().as_str().to_string()),
            None => Err(Error::MalformedPart(
                "import resolved incompletely".to_string(),
            )),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pptx::tests::fixtures;

    #[test]
    fn test_snapshot_walks_closure_once() {
        let mut pkg = Package::from_bytes(&fixtures::minimal_pptx()).unwrap();
        let slide = pkg.part_by_path("/ppt/slides/slide1.xml").unwrap();
        let nodes = snapshot(&mut pkg, slide).unwrap();
        // slide, layout, master, theme
        assert_eq!(nodes.len(), 4);
        assert_eq!(nodes[0].kind, PartKind::Slide);
        let kinds: Vec<PartKind> = nodes.iter().map(|n| n.kind).collect();
        assert!(kinds.contains(&PartKind::SlideLayout));
        assert!(kinds.contains(&PartKind::SlideMaster));
        assert!(kinds.contains(&PartKind::Theme));
    }

    #[test]
    fn test_snapshot_requires_declared_xml_types() {
        let mut pkg = Package::from_bytes(&fixtures::undeclared_slide_pptx()).unwrap();
        let slide = pkg.part_by_path("/ppt/slides/slide1.xml").unwrap();
        let err = snapshot(&mut pkg, slide).unwrap_err();
        assert!(matches!(err, Error::MalformedPart(_)));
    }

    #[test]
    fn test_import_preserves_rids_in_cloned_tables() {
        let mut dest = Package::from_bytes(&fixtures::empty_pptx()).unwrap();
        let mut src = Package::from_bytes(&fixtures::minimal_pptx()).unwrap();
        let slide = src.part_by_path("/ppt/slides/slide1.xml").unwrap();
        let imported = dest.import_from(&mut src, slide).unwrap();

        let layout = dest
            .part_by_path("/ppt/slideLayouts/slideLayout1.xml")
            .unwrap();
        let table = dest.part_table(imported).unwrap();
        // The slide's layout reference keeps its source rId.
        assert_eq!(table.get("rId1").unwrap().target, RelTarget::Part(layout));
    }

    #[test]
    fn test_import_external_and_dangling_rels_survive() {
        let mut dest = Package::from_bytes(&fixtures::empty_pptx()).unwrap();
        let mut src = Package::from_bytes(&fixtures::linked_slide_pptx()).unwrap();
        let slide = src.part_by_path("/ppt/slides/slide1.xml").unwrap();
        let imported = dest.import_from(&mut src, slide).unwrap();

        let table = dest.part_table(imported).unwrap();
        assert_eq!(
            table.get("rId2").unwrap().target,
            RelTarget::External("https://example.com/".to_string())
        );
        assert_eq!(
            table.get("rId3").unwrap().target,
            RelTarget::Dangling("../media/gone.png".to_string())
        );
    }
}
