//! Raw relationship (`.rels`) parsing and serialization.
//!
//! This is the wire level only: rows in, rows out. Resolving targets to
//! parts and keeping rId invariants is the package model's job.

use crate::opc::constants::target_mode;
use crate::opc::content_types::escape_xml;
use crate::opc::error::{OpcError, Result};
use quick_xml::Reader;
use quick_xml::events::Event;
use smallvec::SmallVec;

/// One relationship row as read from a `.rels` body.
#[derive(Debug, Clone)]
pub struct SerializedRelationship {
    /// Relationship ID (e.g., "rId1")
    pub r_id: String,

    /// Relationship type URI
    pub reltype: String,

    /// Target reference (relative partname or external URL)
    pub target_ref: String,

    /// Target mode (Internal or External)
    pub target_mode: String,
}

impl SerializedRelationship {
    /// Check if this is an external relationship.
    #[inline]
    pub fn is_external(&self) -> bool {
        self.target_mode == target_mode::EXTERNAL
    }
}

/// Parse a `.rels` body into relationship rows.
///
/// Duplicate rIds are kept as separate rows; consumers that need the
/// duplicate information (the validator) can count them, consumers that
/// need a map take the last row per id.
pub fn parse_rels_xml(rels_xml: &[u8]) -> Result<SmallVec<[SerializedRelationship; 8]>> {
    let mut srels = SmallVec::new();
    let mut reader = Reader::from_reader(rels_xml);
    reader.config_mut().trim_text(true);

    let mut buf = Vec::new();

    loop {
        match reader.read_event_into(&mut buf) {
            Ok(Event::Empty(ref e)) | Ok(Event::Start(ref e)) => {
                if e.local_name().as_ref() == b"Relationship" {
                    let mut r_id = None;
                    let mut reltype = None;
                    let mut target_ref = None;
                    let mut target_mode = target_mode::INTERNAL.to_string();

                    for attr in e.attributes() {
                        let attr = attr?;
                        match attr.key.as_ref() {
                            b"Id" => r_id = Some(attr.unescape_value()?.to_string()),
                            b"Type" => reltype = Some(attr.unescape_value()?.to_string()),
                            b"Target" => target_ref = Some(attr.unescape_value()?.to_string()),
                            b"TargetMode" => target_mode = attr.unescape_value()?.to_string(),
                            _ => {},
                        }
                    }

                    if let (Some(id), Some(rt), Some(tr)) = (r_id, reltype, target_ref) {
                        srels.push(SerializedRelationship {
                            r_id: id,
                            reltype: rt,
                            target_ref: tr,
                            target_mode,
                        });
                    }
                }
            },
            Ok(Event::Eof) => break,
            Err(e) => return Err(OpcError::XmlError(format!("Rels parse error: {}", e))),
            _ => {},
        }
        buf.clear();
    }

    Ok(srels)
}

/// Extract the numeric suffix of an "rId{N}" token.
#[inline]
pub fn rid_number(r_id: &str) -> Option<u32> {
    if r_id.len() > 3 && &r_id[..3] == "rId" {
        atoi_simd::parse::<u32>(&r_id.as_bytes()[3..]).ok()
    } else {
        None
    }
}

/// Serialize relationship rows to a `.rels` body, sorted by numeric rId
/// so repeated saves produce identical bytes.
pub fn rels_to_xml(rows: &[SerializedRelationship]) -> String {
    let mut sorted: Vec<&SerializedRelationship> = rows.iter().collect();
    sorted.sort_by_key(|row| (rid_number(&row.r_id), row.r_id.as_str()));

    let mut xml = String::with_capacity(256 + rows.len() * 128);
    xml.push_str(r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>"#);
    xml.push('\n');
    xml.push_str(
        r#"<Relationships xmlns="http://schemas.openxmlformats.org/package/2006/relationships">"#,
    );
    xml.push('\n');

    for row in sorted {
        let target_mode = if row.is_external() {
            r#" TargetMode="External""#
        } else {
            ""
        };
        xml.push_str(&format!(
            r#"  <Relationship Id="{}" Type="{}" Target="{}"{}/>"#,
            escape_xml(&row.r_id),
            escape_xml(&row.reltype),
            escape_xml(&row.target_ref),
            target_mode
        ));
        xml.push('\n');
    }

    xml.push_str("</Relationships>");

    xml
}
