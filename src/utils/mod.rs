//! Utility modules for device selection, downloads and logging.

mod device;
mod download;
mod format;
mod logging;

pub use device::{
    get_device, resolve_device, resolve_device_with, Device, DeviceRequest, HardwareProbe,
    ResolvedDevice, SystemProbe,
};
pub use download::{download_to_path, Fetcher, HttpFetcher};
pub use format::{format_bytes, format_count};
pub use logging::{get_logger, init_tracing, Logger, Verbosity};
