//! Trained parameter files: naming, caching and retrieval.

mod descriptor;
mod locator;

pub use descriptor::{WeightsDescriptor, WEIGHTS_EXTENSION};
pub use locator::{resolve_weights, resolve_weights_with, WeightsLocator};
