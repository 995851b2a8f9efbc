//! # themetune core
//!
//! Resolves, downloads and remembers the theme song of each series in a media
//! library.
//!
//! ## Overview
//!
//! - **Mapping store** ([`mapping_store`]): persisted entity → theme song table
//!   plus the user-facing resolution settings, saved through the
//!   [`ports::ConfigurationPersistence`] collaborator after every change.
//! - **Candidate resolver** ([`resolver`]): probes the custom theme directory,
//!   a per-series subfolder and the series folder itself, in that order.
//! - **Resolution facade** ([`resolution`]): the one call a host makes to get
//!   a theme song path, enforcing custom-path exclusivity and dropping stale
//!   mappings.
//! - **Acquisition pipeline** ([`acquisition`]): downloads missing theme
//!   songs from the remote source with bounded concurrency.
//!
//! Every component receives its configuration handle explicitly; nothing in
//! this crate reads process-wide state.

#![cfg_attr(docsrs, feature(doc_cfg))]
#![allow(missing_docs)]

/// Bulk download of missing theme songs
pub mod acquisition;

/// Entity, provider and configuration records
pub mod domain;

/// Error types and error handling utilities
pub mod error;

/// Durable entity → theme song mapping table
pub mod mapping_store;

/// Collaborator interfaces implemented by the host
pub mod ports;

/// Theme song lookup entry point
pub mod resolution;

/// Candidate location probing
pub mod resolver;

pub use acquisition::{AcquisitionOutcome, AcquisitionReport, ThemeAcquisition};
pub use error::{Result, ThemeError};
pub use mapping_store::MappingStore;
pub use resolution::ThemeResolver;
