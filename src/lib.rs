//! # rs-deepnog
//!
//! Utility core of the deepnog protein orthologous group classifier.
//!
//! ## Core Concept
//!
//! Before a network can classify anything, two things must be settled:
//! - **Where to run**: a device token (`auto`, `cpu`, `gpu`) is resolved to a
//!   concrete candle device, failing loudly if an accelerator was demanded but
//!   is not there
//! - **What to load**: a `(database, level, architecture)` descriptor is
//!   resolved to a parameter file in the local data home, downloading it from
//!   the remote store on a cache miss
//!
//! ## Example
//!
//! ```ignore
//! use rs_deepnog::{resolve_device, resolve_weights, load_model, CountParameters};
//!
//! fn main() -> anyhow::Result<()> {
//!     let device = resolve_device("auto")?;
//!     let weights = resolve_weights("eggNOG5", "2", "deepnog", None, true, 1u8)?;
//!     let model = load_model("deepnog", &weights, &device)?;
//!     println!("{} parameters", model.count_parameters(false));
//!     Ok(())
//! }
//! ```

pub mod config;
pub mod model;
pub mod utils;
pub mod weights;

// Re-exports for convenience
pub use config::Settings;
pub use model::{count_parameters, load_model, Architecture, CountParameters, Model, StateDict};
pub use utils::{
    get_device, get_logger, resolve_device, resolve_device_with, DeviceRequest, Fetcher,
    HardwareProbe, HttpFetcher, Logger, ResolvedDevice, SystemProbe, Verbosity,
};
pub use weights::{resolve_weights, resolve_weights_with, WeightsDescriptor, WeightsLocator};

/// Error types for the library
#[derive(thiserror::Error, Debug)]
pub enum DeepnogError {
    #[error("{0}")]
    InvalidArgument(String),

    #[error("{0}")]
    HardwareUnavailable(String),

    #[error("Data not found at {0}")]
    DataNotFound(std::path::PathBuf),

    #[error("Unsupported network architecture: {0}")]
    UnsupportedArchitecture(String),

    #[error("Configuration error: {0}")]
    ConfigError(String),

    #[error("Download error: {0}")]
    DownloadError(String),

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("Candle error: {0}")]
    CandleError(#[from] candle_core::Error),

    #[error("JSON parse error: {0}")]
    JsonError(#[from] serde_json::Error),

    #[error("Safetensors error: {0}")]
    SafeTensorsError(#[from] safetensors::SafeTensorError),
}

pub type Result<T> = std::result::Result<T, DeepnogError>;
