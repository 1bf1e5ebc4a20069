//! Compressor M&C Common Library
//!
//! Shared vocabulary of the compressor monitor/control workspace: status
//! point identifiers and values, bus message types, configuration loading,
//! the facility error registry and the collaborator traits implemented by
//! `cmc_hal` drivers.
//!
//! # Module Structure
//!
//! - [`consts`] - Address ranges, wire widths, default timing
//! - [`status`] - Status ids, value kinds and big-endian wire encoding
//! - [`bus`] - Bus messages and address classification
//! - [`config`] - Configuration loading traits and node configuration
//! - [`facility`] - Facility error registry
//! - [`hal`] - Collaborator traits and hardware-facing types
//! - [`prelude`] - Common re-exports for convenience
//!
//! # Usage
//!
//! ```toml
//! [dependencies]
//! cmc = { package = "cmc_common", path = "../cmc_common" }
//! ```
//!
//! ```rust
//! use cmc_common::prelude::*;
//! ```

pub mod bus;
pub mod config;
pub mod consts;
pub mod facility;
pub mod hal;
pub mod prelude;
pub mod status;
