//! Configuration module for data locations and download settings.

mod settings;

pub use settings::{Settings, DATA_HOME_ENV, DEFAULT_REMOTE, REMOTE_ENV, TIMEOUT_ENV};
