//! The `[Content_Types].xml` model.
//!
//! Maps file extensions to default content types and exact partnames to
//! override content types, implementing the OPC content type discovery
//! algorithm in both directions: parsing the manifest of an opened package
//! and serializing it back after parts were added.

use crate::opc::constants::content_type as ct;
use crate::opc::error::{OpcError, Result};
use crate::opc::packuri::PackURI;
use phf::phf_map;
use quick_xml::Reader;
use quick_xml::events::Event;
use std::collections::HashMap;

/// Extension/content-type pairs conventionally declared as Defaults rather
/// than per-part Overrides.
static WELL_KNOWN_EXTENSIONS: phf::Map<&'static str, &'static str> = phf_map! {
    "rels" => ct::OPC_RELATIONSHIPS,
    "xml" => ct::XML,
    "png" => ct::PNG,
    "jpg" => ct::JPEG,
    "jpeg" => ct::JPEG,
    "gif" => ct::GIF,
    "bmp" => ct::BMP,
    "tiff" => ct::TIFF,
    "emf" => ct::X_EMF,
    "wmf" => ct::X_WMF,
    "bin" => ct::OCTET_STREAM,
    "mp4" => "video/mp4",
    "m4v" => "video/mp4",
    "mp3" => "audio/mpeg",
    "wav" => "audio/wav",
};

/// Content type map for looking up content types by partname or extension.
#[derive(Debug, Clone, Default)]
pub struct ContentTypesMap {
    /// Maps lowercased file extensions to default content types
    defaults: HashMap<String, String>,

    /// Maps exact partnames to override content types
    overrides: HashMap<String, String>,
}

impl ContentTypesMap {
    /// Create an empty map.
    pub fn new() -> Self {
        Self::default()
    }

    /// Parse content types from a serialized `[Content_Types].xml` body.
    pub fn from_xml(xml: &[u8]) -> Result<Self> {
        let mut map = Self::new();
        let mut reader = Reader::from_reader(xml);
        reader.config_mut().trim_text(true);

        let mut buf = Vec::new();

        loop {
            match reader.read_event_into(&mut buf) {
                Ok(Event::Empty(ref e)) => {
                    match e.local_name().as_ref() {
                        b"Default" => {
                            let mut extension = None;
                            let mut content_type = None;

                            for attr in e.attributes() {
                                let attr = attr?;
                                match attr.key.as_ref() {
                                    b"Extension" => {
                                        extension = Some(attr.unescape_value()?.to_string());
                                    },
                                    b"ContentType" => {
                                        content_type = Some(attr.unescape_value()?.to_string());
                                    },
                                    _ => {},
                                }
                            }

                            if let (Some(ext), Some(ct)) = (extension, content_type) {
                                map.add_default(ext, ct);
                            }
                        },
                        b"Override" => {
                            let mut partname = None;
                            let mut content_type = None;

                            for attr in e.attributes() {
                                let attr = attr?;
                                match attr.key.as_ref() {
                                    b"PartName" => {
                                        partname = Some(attr.unescape_value()?.to_string());
                                    },
                                    b"ContentType" => {
                                        content_type = Some(attr.unescape_value()?.to_string());
                                    },
                                    _ => {},
                                }
                            }

                            if let (Some(pn), Some(ct)) = (partname, content_type) {
                                map.add_override(pn, ct);
                            }
                        },
                        _ => {},
                    }
                },
                Ok(Event::Eof) => break,
                Err(e) => {
                    return Err(OpcError::XmlError(format!(
                        "Content types parse error: {}",
                        e
                    )));
                },
                _ => {},
            }
            buf.clear();
        }

        Ok(map)
    }

    /// Add a default content type mapping for a file extension.
    pub fn add_default<S: Into<String>, T: Into<String>>(&mut self, extension: S, content_type: T) {
        self.defaults
            .insert(extension.into().to_lowercase(), content_type.into());
    }

    /// Add an override content type mapping for a specific partname.
    pub fn add_override<S: Into<String>, T: Into<String>>(&mut self, partname: S, content_type: T) {
        self.overrides.insert(partname.into(), content_type.into());
    }

    /// Get the content type for a partname, override first, then the
    /// default for its extension.
    pub fn get(&self, pack_uri: &PackURI) -> Option<&str> {
        if let Some(ct) = self.overrides.get(pack_uri.as_str()) {
            return Some(ct);
        }
        self.defaults
            .get(&pack_uri.ext().to_lowercase())
            .map(String::as_str)
    }

    /// Get the default content type declared for an extension.
    pub fn default_for(&self, extension: &str) -> Option<&str> {
        self.defaults
            .get(&extension.to_lowercase())
            .map(String::as_str)
    }

    /// Number of Default declarations.
    pub fn default_count(&self) -> usize {
        self.defaults.len()
    }

    /// Number of Override declarations.
    pub fn override_count(&self) -> usize {
        self.overrides.len()
    }

    /// Check whether an extension/content-type pair is one of the
    /// conventional Default declarations.
    pub fn is_well_known_default(ext: &str, content_type: &str) -> bool {
        WELL_KNOWN_EXTENSIONS
            .get(ext.to_lowercase().as_str())
            .is_some_and(|known| *known == content_type)
    }

    /// Get the conventional content type for an extension, independent of
    /// what this manifest declares.
    pub fn well_known_type(ext: &str) -> Option<&'static str> {
        WELL_KNOWN_EXTENSIONS.get(ext.to_lowercase().as_str()).copied()
    }

    /// Generate the `[Content_Types].xml` body, Defaults sorted by
    /// extension, Overrides sorted by partname.
    pub fn to_xml(&self) -> String {
        let mut xml = String::with_capacity(4096);

        xml.push_str(r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>"#);
        xml.push('\n');
        xml.push_str(
            r#"<Types xmlns="http://schemas.openxmlformats.org/package/2006/content-types">"#,
        );
        xml.push('\n');

        let mut exts: Vec<_> = self.defaults.keys().collect();
        exts.sort();
        for ext in exts {
            xml.push_str(&format!(
                r#"  <Default Extension="{}" ContentType="{}"/>"#,
                escape_xml(ext),
                escape_xml(&self.defaults[ext])
            ));
            xml.push('\n');
        }

        let mut partnames: Vec<_> = self.overrides.keys().collect();
        partnames.sort();
        for partname in partnames {
            xml.push_str(&format!(
                r#"  <Override PartName="{}" ContentType="{}"/>"#,
                escape_xml(partname),
                escape_xml(&self.overrides[partname])
            ));
            xml.push('\n');
        }

        xml.push_str("</Types>");

        xml
    }
}

/// Escape XML special characters.
#[inline]
pub(crate) fn escape_xml(s: &str) -> String {
    s.replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
        .replace('"', "&quot;")
        .replace('\'', "&apos;")
}
