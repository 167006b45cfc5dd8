use crate::demo;
use crate::queue::HostQueue;
use crate::runner::Runner;
use common::{Console, DeviceInfo, KernelVariant};
use std::error::Error;

pub const HOST_PLATFORM: &str = "Host";

pub struct CpuRunner {
    num_threads: usize,
}

impl CpuRunner {
    pub fn new() -> Self {
        let num_threads = std::thread::available_parallelism()
            .map(|n| n.get())
            .unwrap_or(4);
        Self { num_threads }
    }
}

impl Runner for CpuRunner {
    fn devices(&self) -> Result<Vec<DeviceInfo>, Box<dyn Error + Send + Sync>> {
        Ok(vec![DeviceInfo {
            platform: HOST_PLATFORM.to_string(),
            name: format!("Host CPU ({} threads)", self.num_threads),
            ordinal: 0,
        }])
    }

    fn run(
        &self,
        device: &DeviceInfo,
        variant: KernelVariant,
        console: &Console,
    ) -> Result<Vec<i32>, Box<dyn Error + Send + Sync>> {
        log::info!("Running {} kernel on {}", variant, device.name);
        let mut queue = HostQueue::new(self.num_threads)?;
        demo::run(&mut queue, variant, console)
    }
}
