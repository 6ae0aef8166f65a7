//! Network parameters: architectures, state dicts and parameter counting.

mod architecture;
mod loader;
mod state_dict;

pub use architecture::Architecture;
pub use loader::{load_model, Model};
pub use state_dict::StateDict;

/// Anything that owns network parameters
pub trait CountParameters {
    /// Number of scalar parameters; with `tunable_only`, frozen ones are skipped
    fn count_parameters(&self, tunable_only: bool) -> usize;
}

impl CountParameters for candle_nn::VarMap {
    fn count_parameters(&self, _tunable_only: bool) -> usize {
        // every variable in a VarMap is trainable
        self.all_vars().iter().map(|var| var.elem_count()).sum()
    }
}

/// Count the parameters of `model`
pub fn count_parameters<M: CountParameters + ?Sized>(model: &M, tunable_only: bool) -> usize {
    model.count_parameters(tunable_only)
}
