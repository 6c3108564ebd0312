//! Open Packaging Conventions container plumbing.
//!
//! Everything in this module is presentation-agnostic: pack URIs, the zip
//! working copy, the content-type manifest, and raw relationship rows. The
//! package model that gives these meaning lives in [`crate::pptx`].

pub mod constants;
pub mod content_types;
pub mod error;
pub mod packuri;
pub mod phys_pkg;
pub mod rel;
