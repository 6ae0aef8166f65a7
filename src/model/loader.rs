//! Loading trained networks onto a resolved device.

use std::path::Path;

use super::architecture::Architecture;
use super::state_dict::StateDict;
use super::CountParameters;
use crate::utils::{format_count, ResolvedDevice};

/// A network's parameters materialized on a device
#[derive(Debug, Clone)]
pub struct Model {
    architecture: Architecture,
    device: ResolvedDevice,
    state: StateDict,
}

impl Model {
    pub fn new(architecture: Architecture, device: ResolvedDevice, state: StateDict) -> Self {
        Self {
            architecture,
            device,
            state,
        }
    }

    pub fn architecture(&self) -> Architecture {
        self.architecture
    }

    pub fn device(&self) -> ResolvedDevice {
        self.device
    }

    pub fn state_dict(&self) -> &StateDict {
        &self.state
    }

    pub fn state_dict_mut(&mut self) -> &mut StateDict {
        &mut self.state
    }
}

impl CountParameters for Model {
    fn count_parameters(&self, tunable_only: bool) -> usize {
        self.state.count_parameters(tunable_only)
    }
}

/// Load the parameters of `architecture` from `weights` onto `device`
pub fn load_model(
    architecture: &str,
    weights: impl AsRef<Path>,
    device: &ResolvedDevice,
) -> crate::Result<Model> {
    let architecture: Architecture = architecture.parse()?;
    let candle_device = device.to_candle()?;
    let state = StateDict::load(weights.as_ref(), &candle_device)?;

    if state.is_empty() {
        return Err(crate::DeepnogError::InvalidArgument(format!(
            "No tensors found in {:?}",
            weights.as_ref()
        )));
    }

    let model = Model::new(architecture, *device, state);
    tracing::info!(
        "Loaded {} on {} ({} parameters)",
        architecture,
        device,
        format_count(model.count_parameters(false))
    );

    Ok(model)
}
