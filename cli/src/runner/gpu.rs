use crate::demo;
use crate::queue::{CudaQueue, KernelSource};
use crate::runner::Runner;
use backtrace::Backtrace;
use common::{Console, DeviceInfo, KernelVariant};
use cust::device::Device;
use cust::CudaFlags;
use std::error::Error;
use std::path::PathBuf;

pub const CUDA_PLATFORM: &str = "NVIDIA CUDA";

pub struct GpuRunner {
    num_devices: usize,
    ptx_path: Option<PathBuf>,
}

impl GpuRunner {
    pub fn new(ptx_path: Option<PathBuf>) -> Result<Self, Box<dyn Error + Send + Sync>> {
        cust::init(CudaFlags::empty())?;
        let num_devices = Device::num_devices()? as usize;
        println!("Found {} CUDA devices", num_devices);
        Ok(Self { num_devices, ptx_path })
    }
}

impl Runner for GpuRunner {
    fn devices(&self) -> Result<Vec<DeviceInfo>, Box<dyn Error + Send + Sync>> {
        let mut devices = Vec::with_capacity(self.num_devices);
        for ordinal in 0..self.num_devices {
            let device = Device::get_device(ordinal as u32)?;
            devices.push(DeviceInfo {
                platform: CUDA_PLATFORM.to_string(),
                name: device.name()?,
                ordinal,
            });
        }
        Ok(devices)
    }

    fn run(
        &self,
        device: &DeviceInfo,
        variant: KernelVariant,
        console: &Console,
    ) -> Result<Vec<i32>, Box<dyn Error + Send + Sync>> {
        let ordinal = device.ordinal;
        log::info!("[{ordinal}] Running {} kernel on {}", variant, device.name);

        let source = KernelSource::load(self.ptx_path.as_deref())?;
        let mut queue = CudaQueue::new(ordinal, source)?;
        demo::run(&mut queue, variant, console).map_err(|e| {
            let bt = Backtrace::new();
            eprintln!("Error in device {}: {}", ordinal, e);
            eprintln!("Backtrace:\n{:?}", bt);
            e
        })
    }
}
