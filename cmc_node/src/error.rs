//! Node error type.

use cmc_common::config::ConfigError;
use cmc_common::facility::FacilityError;
use cmc_common::hal::{AdcFault, HalError};
use thiserror::Error;

/// Errors that abort node start or a running node.
#[derive(Debug, Error)]
pub enum NodeError {
    #[error("configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("driver error: {0}")]
    Hal(#[from] HalError),

    #[error("facility registry error: {0}")]
    Facility(#[from] FacilityError),

    /// Converter setup rejected; already reported to the registry.
    #[error("ADC setup rejected: {0:?}")]
    Adc(AdcFault),

    /// The bus thread is gone.
    #[error("bus channel closed")]
    BusClosed,

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}
