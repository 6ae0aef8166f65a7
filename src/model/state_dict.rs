//! Named tensors read from a parameter file.

use std::collections::{BTreeMap, BTreeSet};
use std::path::Path;

use candle_core::{DType, Device, Tensor};
use safetensors::SafeTensors;

use super::CountParameters;

/// Key holding the weights inside pickled training checkpoints
const CHECKPOINT_KEY: &str = "model_state_dict";

/// Tensors tracked by normalization layers that are state, not parameters
const BUFFER_SUFFIXES: [&str; 3] = ["running_mean", "running_var", "num_batches_tracked"];

/// Parameters and buffers of a network, keyed by their dotted names
#[derive(Debug, Clone, Default)]
pub struct StateDict {
    tensors: BTreeMap<String, Tensor>,
    frozen: BTreeSet<String>,
}

impl StateDict {
    pub fn new() -> Self {
        Self::default()
    }

    /// Read a `.safetensors` or pickled `.pth`/`.pt` file onto `device`
    pub fn load(path: impl AsRef<Path>, device: &Device) -> crate::Result<Self> {
        let path = path.as_ref();
        if !path.is_file() {
            return Err(crate::DeepnogError::DataNotFound(path.to_path_buf()));
        }

        let extension = path
            .extension()
            .and_then(|e| e.to_str())
            .map(str::to_lowercase)
            .unwrap_or_default();

        tracing::debug!("Loading state dict from {:?}", path);

        let named = match extension.as_str() {
            "safetensors" => load_safetensors(path)?,
            "pth" | "pt" => load_pickle(path)?,
            other => {
                return Err(crate::DeepnogError::InvalidArgument(format!(
                    "Unsupported weights file extension {:?} for {:?}",
                    other, path
                )))
            }
        };

        let mut state = Self::new();
        for (name, tensor) in named {
            state.insert(name, tensor.to_device(device)?);
        }
        Ok(state)
    }

    pub fn insert(&mut self, name: impl Into<String>, tensor: Tensor) {
        self.tensors.insert(name.into(), tensor);
    }

    pub fn get(&self, name: &str) -> Option<&Tensor> {
        self.tensors.get(name)
    }

    pub fn len(&self) -> usize {
        self.tensors.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tensors.is_empty()
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.tensors.keys().map(String::as_str)
    }

    /// Exclude every parameter under `prefix` (a module path such as
    /// `encoding` or a full name such as `fc.bias`) from tunable counts
    pub fn freeze(&mut self, prefix: impl Into<String>) {
        self.frozen.insert(prefix.into());
    }

    pub fn unfreeze(&mut self, prefix: &str) {
        self.frozen.remove(prefix);
    }

    pub fn is_frozen(&self, name: &str) -> bool {
        self.frozen.iter().any(|prefix| {
            name == prefix
                || (name.starts_with(prefix.as_str())
                    && name[prefix.len()..].starts_with('.'))
        })
    }

    /// Buffers such as batch-norm running statistics
    pub fn is_buffer(name: &str) -> bool {
        let leaf = name.rsplit('.').next().unwrap_or(name);
        BUFFER_SUFFIXES.contains(&leaf)
    }

    /// Iterate over parameters (buffers excluded)
    pub fn parameters(&self) -> impl Iterator<Item = (&str, &Tensor)> {
        self.tensors
            .iter()
            .filter(|(name, _)| !Self::is_buffer(name))
            .map(|(name, tensor)| (name.as_str(), tensor))
    }
}

impl CountParameters for StateDict {
    fn count_parameters(&self, tunable_only: bool) -> usize {
        self.parameters()
            .filter(|(name, _)| !tunable_only || !self.is_frozen(name))
            .map(|(_, tensor)| tensor.elem_count())
            .sum()
    }
}

fn load_safetensors(path: &Path) -> crate::Result<Vec<(String, Tensor)>> {
    let file = std::fs::File::open(path)?;
    let mmap = unsafe { memmap2::Mmap::map(&file)? };

    let safetensors = SafeTensors::deserialize(&mmap)?;

    let mut named = Vec::new();
    for (name, view) in safetensors.tensors() {
        let dtype = convert_safetensor_dtype(view.dtype())?;
        let tensor = Tensor::from_raw_buffer(view.data(), dtype, view.shape(), &Device::Cpu)?;
        named.push((name, tensor));
    }
    Ok(named)
}

fn load_pickle(path: &Path) -> crate::Result<Vec<(String, Tensor)>> {
    match candle_core::pickle::read_all_with_key(path, Some(CHECKPOINT_KEY)) {
        Ok(named) if !named.is_empty() => Ok(named),
        _ => {
            tracing::debug!("No {} entry in {:?}, reading as bare state dict", CHECKPOINT_KEY, path);
            Ok(candle_core::pickle::read_all(path)?)
        }
    }
}

/// Convert safetensor dtype to candle dtype
fn convert_safetensor_dtype(dtype: safetensors::Dtype) -> crate::Result<DType> {
    match dtype {
        safetensors::Dtype::U8 => Ok(DType::U8),
        safetensors::Dtype::U32 => Ok(DType::U32),
        safetensors::Dtype::I64 => Ok(DType::I64),
        safetensors::Dtype::F16 => Ok(DType::F16),
        safetensors::Dtype::BF16 => Ok(DType::BF16),
        safetensors::Dtype::F32 => Ok(DType::F32),
        safetensors::Dtype::F64 => Ok(DType::F64),
        other => Err(crate::DeepnogError::InvalidArgument(format!(
            "Unsupported tensor dtype {:?}",
            other
        ))),
    }
}
