//! Longan - A Rust library for merging OOXML presentation packages
//!
//! This library models a .pptx package as a graph of parts joined by OPC
//! relationships and moves whole relationship closures between packages:
//! importing a slide brings its layout, master, theme, notes and media
//! along, and parts identical to ones already on the destination are
//! reused instead of cloned.
//!
//! # Features
//!
//! - **Package model**: Parts, relationship tables and the content type manifest
//! - **Lazy loading**: Part contents load on first use, bounded by an LRU cache
//! - **Closure imports**: Copy a slide and everything it references in one call
//! - **Deduplication**: Identical layouts, masters, themes and media merge once
//! - **Validation**: Standalone consistency checks over any saved package
//!
//! # Example - Merging a slide between decks
//!
//! ```no_run
//! use longan::Package;
//!
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let mut dest = Package::open("deck.pptx")?;
//! let mut donor = Package::open("donor.pptx")?;
//!
//! // Import the donor's first slide with its full closure.
//! let slide = donor.slides()?[0];
//! dest.import_from(&mut donor, slide)?;
//! dest.save()?;
//! # Ok(())
//! # }
//! ```
//!
//! # Example - Validating a package
//!
//! ```no_run
//! use longan::validate_path;
//!
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! for finding in validate_path("deck.pptx")? {
//!     println!("{:?}: {}", finding.kind, finding.detail);
//! }
//! # Ok(())
//! # }
//! ```

/// Open Packaging Conventions container plumbing
///
/// Pack URIs, the zip working copy, the content type manifest and raw
/// relationship rows, independent of any document model.
pub mod opc;

/// The presentation package model
///
/// The part arena, id allocation, relationship-closure imports and
/// standalone package validation.
pub mod pptx;

pub mod error;

// Re-export commonly used types for convenience
pub use error::{Error, Result};
pub use pptx::ids::{IdAllocator, RESERVED_ID_BASE};
pub use pptx::package::Package;
pub use pptx::part::{Part, PartId, PartKind, PartTable, RelEntry, RelTarget};
pub use pptx::registry::ContentTypeRegistry;
pub use pptx::validate::{Finding, FindingKind, Severity, validate_bytes, validate_path};
