//! The presentation package model.
//!
//! [`package::Package`] owns the part arena, the content type registry and
//! the id allocator; the sibling modules each cover one concern on top of
//! it: relationship-closure imports in [`merge`], the presentation and
//! master id lists in [`presentation`] and [`master`], and standalone
//! package checks in [`validate`].

pub mod ids;
pub(crate) mod layout;
pub(crate) mod master;
mod merge;
pub mod package;
pub mod part;
pub(crate) mod presentation;
pub mod registry;
pub mod validate;
pub(crate) mod xmledit;
