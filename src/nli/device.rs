use candle_core::Device;
use tracing::{info, warn};

use super::error::NliError;

/// Picks the first usable accelerator compiled in, else the CPU.
///
/// Accelerator failures are logged and never fatal.
pub fn select_device() -> Result<Device, NliError> {
    #[allow(unused_mut)]
    let mut failures: Vec<String> = Vec::new();

    #[cfg(feature = "metal")]
    match Device::new_metal(0) {
        Ok(device) => {
            info!(backend = "metal", "NLI model will run on GPU");
            return Ok(device);
        }
        Err(e) => {
            warn!(backend = "metal", error = %e, "GPU backend unavailable");
            failures.push(format!("metal: {e}"));
        }
    }

    #[cfg(feature = "cuda")]
    match Device::new_cuda(0) {
        Ok(device) => {
            info!(backend = "cuda", "NLI model will run on GPU");
            return Ok(device);
        }
        Err(e) => {
            warn!(backend = "cuda", error = %e, "GPU backend unavailable");
            failures.push(format!("cuda: {e}"));
        }
    }

    if failures.is_empty() {
        info!("NLI model will run on CPU");
    } else {
        warn!(reason = %failures.join("; "), "Falling back to CPU device");
    }
    Ok(Device::Cpu)
}
