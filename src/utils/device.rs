//! Device selection: turn a user-supplied token into a compute device.

use std::fmt;
use std::str::FromStr;

use candle_core::Device as CandleDevice;

/// Re-export candle Device for convenience
pub type Device = CandleDevice;

/// What the user asked for
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DeviceRequest {
    /// Best available accelerator, CPU otherwise
    Auto,
    /// CPU, regardless of hardware
    Cpu,
    /// Any accelerator; failing if none is present
    Gpu,
}

impl FromStr for DeviceRequest {
    type Err = crate::DeepnogError;

    fn from_str(token: &str) -> crate::Result<Self> {
        match token.trim().to_lowercase().as_str() {
            "auto" => Ok(DeviceRequest::Auto),
            "cpu" => Ok(DeviceRequest::Cpu),
            "gpu" | "cuda" => Ok(DeviceRequest::Gpu),
            _ => Err(crate::DeepnogError::InvalidArgument(format!(
                "Unknown device \"{}\". Try \"auto\".",
                token
            ))),
        }
    }
}

/// A concrete compute device chosen for this process
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResolvedDevice {
    Cpu,
    Cuda(usize),
    Metal(usize),
}

impl ResolvedDevice {
    pub fn is_cpu(&self) -> bool {
        matches!(self, ResolvedDevice::Cpu)
    }

    pub fn is_gpu(&self) -> bool {
        !self.is_cpu()
    }

    /// Open the candle device this handle refers to
    pub fn to_candle(&self) -> crate::Result<Device> {
        let device = match *self {
            ResolvedDevice::Cpu => CandleDevice::Cpu,
            ResolvedDevice::Cuda(ordinal) => CandleDevice::new_cuda(ordinal)?,
            ResolvedDevice::Metal(ordinal) => CandleDevice::new_metal(ordinal)?,
        };
        Ok(device)
    }
}

impl fmt::Display for ResolvedDevice {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ResolvedDevice::Cpu => write!(f, "cpu"),
            ResolvedDevice::Cuda(_) => write!(f, "cuda"),
            ResolvedDevice::Metal(_) => write!(f, "metal"),
        }
    }
}

/// Reports which accelerators this host can actually use.
///
/// Resolution goes through this trait so that "GPU present" and "GPU absent"
/// can both be exercised on any machine.
pub trait HardwareProbe {
    fn cuda_available(&self) -> bool;

    fn metal_available(&self) -> bool;
}

/// Probe backed by candle: the backend must be compiled in and device 0 must open
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemProbe;

impl HardwareProbe for SystemProbe {
    fn cuda_available(&self) -> bool {
        if !candle_core::utils::cuda_is_available() {
            return false;
        }
        match CandleDevice::new_cuda(0) {
            Ok(_) => true,
            Err(e) => {
                tracing::debug!("CUDA not available: {}", e);
                false
            }
        }
    }

    fn metal_available(&self) -> bool {
        if !candle_core::utils::metal_is_available() {
            return false;
        }
        match CandleDevice::new_metal(0) {
            Ok(_) => true,
            Err(e) => {
                tracing::debug!("Metal not available: {}", e);
                false
            }
        }
    }
}

fn best_accelerator(probe: &dyn HardwareProbe) -> Option<ResolvedDevice> {
    if probe.cuda_available() {
        Some(ResolvedDevice::Cuda(0))
    } else if probe.metal_available() {
        Some(ResolvedDevice::Metal(0))
    } else {
        None
    }
}

/// Resolve a device token against the hardware of this host
pub fn resolve_device(token: &str) -> crate::Result<ResolvedDevice> {
    resolve_device_with(token, &SystemProbe)
}

/// Resolve a device token against an explicit hardware probe
pub fn resolve_device_with(
    token: &str,
    probe: &dyn HardwareProbe,
) -> crate::Result<ResolvedDevice> {
    let device = match token.parse::<DeviceRequest>()? {
        DeviceRequest::Cpu => ResolvedDevice::Cpu,
        DeviceRequest::Auto => best_accelerator(probe).unwrap_or_else(|| {
            tracing::debug!("No accelerator found, falling back to CPU");
            ResolvedDevice::Cpu
        }),
        DeviceRequest::Gpu => best_accelerator(probe).ok_or_else(|| {
            crate::DeepnogError::HardwareUnavailable(format!(
                "Device set to \"{}\", but could not access any CUDA-enabled GPU \
                 or Metal device.",
                token
            ))
        })?,
    };

    tracing::info!("Using {} device", device);
    Ok(device)
}

/// Resolve a device token and open the corresponding candle device
pub fn get_device(token: &str) -> crate::Result<Device> {
    resolve_device(token)?.to_candle()
}

#[cfg(test)]
mod tests {
    use super::*;

    struct FakeProbe {
        cuda: bool,
        metal: bool,
    }

    impl HardwareProbe for FakeProbe {
        fn cuda_available(&self) -> bool {
            self.cuda
        }

        fn metal_available(&self) -> bool {
            self.metal
        }
    }

    const NO_GPU: FakeProbe = FakeProbe { cuda: false, metal: false };
    const WITH_CUDA: FakeProbe = FakeProbe { cuda: true, metal: false };
    const WITH_METAL: FakeProbe = FakeProbe { cuda: false, metal: true };

    #[test]
    fn test_unknown_device() {
        let err = resolve_device_with("tpu", &WITH_CUDA).unwrap_err();
        assert!(matches!(err, crate::DeepnogError::InvalidArgument(_)));
        assert_eq!(err.to_string(), "Unknown device \"tpu\". Try \"auto\".");
    }

    #[test]
    fn test_cpu_device() {
        assert_eq!(resolve_device_with("cpu", &WITH_CUDA).unwrap(), ResolvedDevice::Cpu);
        assert_eq!(resolve_device_with("cpu", &NO_GPU).unwrap(), ResolvedDevice::Cpu);
        assert_eq!(resolve_device("cpu").unwrap(), ResolvedDevice::Cpu);
    }

    #[test]
    fn test_auto_device() {
        assert_eq!(resolve_device_with("auto", &NO_GPU).unwrap(), ResolvedDevice::Cpu);
        assert_eq!(resolve_device_with("auto", &WITH_CUDA).unwrap(), ResolvedDevice::Cuda(0));
        assert_eq!(resolve_device_with("auto", &WITH_METAL).unwrap(), ResolvedDevice::Metal(0));

        let device = resolve_device("auto").unwrap();
        assert!(["cpu", "cuda", "metal"].contains(&device.to_string().as_str()));
    }

    #[test]
    fn test_gpu_device_available() {
        for token in ["gpu", "cuda", "GPU"] {
            let device = resolve_device_with(token, &WITH_CUDA).unwrap();
            assert!(device.is_gpu());
        }
        assert_eq!(resolve_device_with("gpu", &WITH_METAL).unwrap(), ResolvedDevice::Metal(0));
    }

    #[test]
    fn test_gpu_device_unavailable() {
        let err = resolve_device_with("gpu", &NO_GPU).unwrap_err();
        assert!(matches!(err, crate::DeepnogError::HardwareUnavailable(_)));
        assert!(err.to_string().contains("could not access any CUDA-enabled GPU"));
    }

    #[test]
    fn test_gpu_matches_system_probe() {
        let probe = SystemProbe;
        let has_gpu = probe.cuda_available() || probe.metal_available();
        assert_eq!(resolve_device("gpu").is_ok(), has_gpu);
    }

    #[test]
    fn test_cpu_opens_candle_device() {
        let device = ResolvedDevice::Cpu.to_candle().unwrap();
        assert!(matches!(device, Device::Cpu));
    }
}
