// Copyright (c) 2025 10x Genomics, Inc. All rights reserved.
//! Tools for working with AB1 trace files produced by the sequencing
//! instrument. Major functionality includes:
//! * A process-wide registry of the file and folder naming conventions
//! * Parsing instrument filenames into typed sample records (order
//!   identifier, well position, bracket annotations, reinject flags)
//! * Canonical name normalization for comparing operator spellings against
//!   instrument output
#![expect(missing_docs)]

pub mod filenames;
pub mod patterns;
pub mod wells;

pub use filenames::{normalize, OrderIdentity, SampleFilenameRecord, UnrecognizedReason};
pub use patterns::{PatternNotFound, PatternRegistry, PATTERNS};
pub use wells::WellPosition;
