mod cpu;
#[cfg(feature = "gpu")]
mod gpu;

pub use cpu::CpuRunner;
#[cfg(feature = "gpu")]
pub use gpu::GpuRunner;

use common::{Console, DeviceInfo, KernelVariant};
use std::error::Error;

pub trait Runner {
    /// Every device this runner can open, in enumeration order.
    fn devices(&self) -> Result<Vec<DeviceInfo>, Box<dyn Error + Send + Sync>>;
    fn run(
        &self,
        device: &DeviceInfo,
        variant: KernelVariant,
        console: &Console,
    ) -> Result<Vec<i32>, Box<dyn Error + Send + Sync>>;
}
