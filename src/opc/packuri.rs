/// Provides the PackURI value type for part names within an OPC package.
///
/// A PackURI is the canonical name of a part, always beginning with a forward
/// slash and using forward slashes as separators, as defined by the Open
/// Packaging Conventions specification.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct PackURI {
    /// The full pack URI string (e.g., "/ppt/slides/slide1.xml")
    uri: String,
}

impl PackURI {
    /// Create a new PackURI from a string.
    ///
    /// # Arguments
    /// * `uri` - The URI string, which must begin with a forward slash
    ///
    /// # Returns
    /// * `Ok(PackURI)` if the URI is valid
    /// * `Err` if the URI doesn't start with a forward slash
    pub fn new<S: Into<String>>(uri: S) -> Result<Self, String> {
        let uri = uri.into();
        if !uri.starts_with('/') {
            return Err(format!("PackURI must begin with slash, got '{}'", uri));
        }
        Ok(PackURI { uri })
    }

    /// Create a PackURI by resolving a relative reference against a base URI.
    ///
    /// Translates a relative reference (like "../slideMasters/slideMaster1.xml")
    /// onto a base URI (like "/ppt/slideLayouts") to produce an absolute
    /// PackURI (like "/ppt/slideMasters/slideMaster1.xml").
    pub fn from_rel_ref(base_uri: &str, relative_ref: &str) -> Result<Self, String> {
        let joined = if base_uri.ends_with('/') {
            format!("{}{}", base_uri, relative_ref)
        } else {
            format!("{}/{}", base_uri, relative_ref)
        };
        Self::new(Self::normalize(&joined))
    }

    /// Get the base URI (directory portion) of this PackURI.
    ///
    /// For example, "/ppt/slides" for "/ppt/slides/slide1.xml".
    /// For the package pseudo-partname "/", returns "/".
    pub fn base_uri(&self) -> &str {
        match self.uri.rfind('/') {
            Some(0) | None => "/",
            Some(pos) => &self.uri[..pos],
        }
    }

    /// Get the filename portion of this PackURI.
    ///
    /// For example, "slide1.xml" for "/ppt/slides/slide1.xml".
    pub fn filename(&self) -> &str {
        match self.uri.rfind('/') {
            Some(pos) => &self.uri[pos + 1..],
            None => "",
        }
    }

    /// Get the extension portion of this PackURI, without the leading period.
    pub fn ext(&self) -> &str {
        let filename = self.filename();
        match filename.rfind('.') {
            Some(pos) => &filename[pos + 1..],
            None => "",
        }
    }

    /// Get the partname index for tuple partnames, or None for singletons.
    ///
    /// For example, returns 21 for "/ppt/slides/slide21.xml" and None for
    /// "/ppt/presentation.xml".
    pub fn idx(&self) -> Option<u32> {
        let stem = self.stem();
        let digits_at = stem.rfind(|c: char| !c.is_ascii_digit()).map(|p| p + 1)?;
        if digits_at == stem.len() {
            return None;
        }
        atoi_simd::parse::<u32>(stem[digits_at..].as_bytes()).ok()
    }

    /// Get the partname pattern obtained by replacing the numeric index with
    /// a `%d` placeholder, suitable for sequential name allocation.
    ///
    /// For example, "/ppt/slides/slide%d.xml" for "/ppt/slides/slide21.xml".
    /// A partname with no index gets the placeholder appended to its stem.
    pub fn template(&self) -> String {
        let stem = self.stem();
        let prefix_len = stem
            .rfind(|c: char| !c.is_ascii_digit())
            .map(|p| p + 1)
            .unwrap_or(0);
        let ext = self.ext();
        if ext.is_empty() {
            format!("{}/{}%d", self.base_uri(), &stem[..prefix_len])
        } else {
            format!("{}/{}%d.{}", self.base_uri(), &stem[..prefix_len], ext)
        }
    }

    /// Get the membername (URI with the leading slash stripped).
    ///
    /// This is the form used as the zip membername for the package item.
    pub fn membername(&self) -> &str {
        if self.uri == "/" { "" } else { &self.uri[1..] }
    }

    /// Get the relative reference from a base URI to this PackURI.
    ///
    /// For example, PackURI("/ppt/slideLayouts/slideLayout1.xml") returns
    /// "../slideLayouts/slideLayout1.xml" for base_uri "/ppt/slides".
    pub fn relative_ref(&self, base_uri: &str) -> String {
        if base_uri == "/" {
            return self.membername().to_string();
        }

        let from_parts: Vec<&str> = base_uri.split('/').filter(|s| !s.is_empty()).collect();
        let to_parts: Vec<&str> = self.uri.split('/').filter(|s| !s.is_empty()).collect();

        let common = from_parts
            .iter()
            .zip(to_parts.iter())
            .take_while(|(a, b)| a == b)
            .count();

        let mut result = String::new();
        for _ in common..from_parts.len() {
            result.push_str("../");
        }
        for (i, part) in to_parts.iter().enumerate().skip(common) {
            if i > common {
                result.push('/');
            }
            result.push_str(part);
        }
        result
    }

    /// Get the PackURI of the .rels companion for this PackURI.
    ///
    /// For example, "/ppt/_rels/presentation.xml.rels" for
    /// "/ppt/presentation.xml", and "/_rels/.rels" for the package itself.
    pub fn rels_uri(&self) -> Result<PackURI, String> {
        let base_uri = self.base_uri();
        if base_uri == "/" {
            Self::new(format!("/_rels/{}.rels", self.filename()))
        } else {
            Self::new(format!("{}/_rels/{}.rels", base_uri, self.filename()))
        }
    }

    /// Get the full URI string.
    pub fn as_str(&self) -> &str {
        &self.uri
    }

    /// The filename with its extension removed.
    fn stem(&self) -> &str {
        let filename = self.filename();
        match filename.rfind('.') {
            Some(pos) => &filename[..pos],
            None => filename,
        }
    }

    /// Resolve "." and ".." segments, collapsing duplicate slashes.
    fn normalize(path: &str) -> String {
        let mut parts: Vec<&str> = Vec::new();
        for part in path.split('/') {
            match part {
                "" | "." => {},
                ".." => {
                    parts.pop();
                },
                _ => parts.push(part),
            }
        }
        if parts.is_empty() {
            return "/".to_string();
        }
        let mut normalized = String::with_capacity(path.len());
        for part in parts {
            normalized.push('/');
            normalized.push_str(part);
        }
        normalized
    }
}

impl std::fmt::Display for PackURI {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.uri)
    }
}

impl AsRef<str> for PackURI {
    fn as_ref(&self) -> &str {
        &self.uri
    }
}

/// The package pseudo-partname, representing the package itself
pub const PACKAGE_URI: &str = "/";

/// The URI for the [Content_Types].xml stream
pub const CONTENT_TYPES_URI: &str = "/[Content_Types].xml";

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn test_packuri_new() {
        assert!(PackURI::new("/ppt/presentation.xml").is_ok());
        assert!(PackURI::new("ppt/presentation.xml").is_err());
    }

    #[test]
    fn test_base_uri_and_filename() {
        let uri = PackURI::new("/ppt/slides/slide1.xml").unwrap();
        assert_eq!(uri.base_uri(), "/ppt/slides");
        assert_eq!(uri.filename(), "slide1.xml");
        assert_eq!(uri.ext(), "xml");

        let root = PackURI::new("/").unwrap();
        assert_eq!(root.base_uri(), "/");
        assert_eq!(root.filename(), "");
        assert_eq!(root.membername(), "");
    }

    #[test]
    fn test_idx() {
        let uri = PackURI::new("/ppt/slides/slide21.xml").unwrap();
        assert_eq!(uri.idx(), Some(21));

        let uri = PackURI::new("/ppt/presentation.xml").unwrap();
        assert_eq!(uri.idx(), None);
    }

    #[test]
    fn test_template() {
        let uri = PackURI::new("/ppt/slides/slide21.xml").unwrap();
        assert_eq!(uri.template(), "/ppt/slides/slide%d.xml");

        let uri = PackURI::new("/ppt/media/image3.png").unwrap();
        assert_eq!(uri.template(), "/ppt/media/image%d.png");

        let uri = PackURI::new("/ppt/presentation.xml").unwrap();
        assert_eq!(uri.template(), "/ppt/presentation%d.xml");
    }

    #[test]
    fn test_from_rel_ref() {
        let uri = PackURI::from_rel_ref("/ppt/slides", "../slideLayouts/slideLayout1.xml").unwrap();
        assert_eq!(uri.as_str(), "/ppt/slideLayouts/slideLayout1.xml");

        let uri = PackURI::from_rel_ref("/", "ppt/presentation.xml").unwrap();
        assert_eq!(uri.as_str(), "/ppt/presentation.xml");
    }

    #[test]
    fn test_relative_ref() {
        let uri = PackURI::new("/ppt/slideLayouts/slideLayout1.xml").unwrap();
        assert_eq!(
            uri.relative_ref("/ppt/slides"),
            "../slideLayouts/slideLayout1.xml"
        );
        assert_eq!(
            uri.relative_ref("/ppt/slideLayouts"),
            "slideLayout1.xml"
        );
        assert_eq!(
            uri.relative_ref("/"),
            "ppt/slideLayouts/slideLayout1.xml"
        );
    }

    #[test]
    fn test_rels_uri() {
        let uri = PackURI::new("/ppt/presentation.xml").unwrap();
        assert_eq!(uri.rels_uri().unwrap().as_str(), "/ppt/_rels/presentation.xml.rels");

        let root = PackURI::new("/").unwrap();
        assert_eq!(root.rels_uri().unwrap().as_str(), "/_rels/.rels");
    }

    proptest! {
        // Resolving the generated relative reference against the same base
        // must land back on the original partname.
        #[test]
        fn rel_ref_round_trips(
            base_segs in prop::collection::vec("[a-z]{1,8}", 0..3),
            target_segs in prop::collection::vec("[a-z]{1,8}", 1..4),
            name in "[a-z]{1,8}",
        ) {
            let base = if base_segs.is_empty() {
                "/".to_string()
            } else {
                format!("/{}", base_segs.join("/"))
            };
            let target = PackURI::new(format!("/{}/{}.xml", target_segs.join("/"), name)).unwrap();
            let rel_ref = target.relative_ref(&base);
            let resolved = PackURI::from_rel_ref(&base, &rel_ref).unwrap();
            prop_assert_eq!(resolved, target);
        }
    }
}
