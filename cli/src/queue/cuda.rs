use super::{check_transfer_len, CommandQueue};
use common::{
    check_kernel_extent, BoundKernel, CommandStatus, CompletionSignal, KernelInvocation, MemAccess,
};
use cust::device::Device;
use cust::event::{Event, EventFlags};
use cust::launch;
use cust::memory::{AsyncCopyDestination, DeviceBuffer, LockedBuffer};
use cust::module::{Module, ModuleJitOption};
use cust::prelude::Context;
use cust::stream::{Stream, StreamFlags, StreamWaitEventFlags};
use std::collections::HashMap;
use std::error::Error;
use std::path::Path;

/// Compiled kernel module handed to the driver.
pub enum KernelSource {
    Ptx(String),
    Cubin(Vec<u8>),
}

impl KernelSource {
    /// `CUBIN_PATH` wins over an explicit PTX path; without either the PTX built
    /// alongside this binary is used.
    pub fn load(ptx_path: Option<&Path>) -> Result<Self, Box<dyn Error + Send + Sync>> {
        if let Ok(cubin_path) = std::env::var("CUBIN_PATH") {
            let cubin = std::fs::read(&cubin_path)
                .map_err(|e| format!("Failed to read CUBIN file {}: {}", cubin_path, e))?;
            return Ok(KernelSource::Cubin(cubin));
        }
        if let Some(ptx_path) = ptx_path {
            let ptx = std::fs::read_to_string(ptx_path)
                .map_err(|e| format!("Failed to read PTX file {}: {}", ptx_path.display(), e))?;
            return Ok(KernelSource::Ptx(ptx));
        }
        Ok(KernelSource::Ptx(
            include_str!(concat!(env!("OUT_DIR"), "/kernels.ptx")).to_string(),
        ))
    }

    fn into_module(self) -> Result<Module, Box<dyn Error + Send + Sync>> {
        let module = match self {
            KernelSource::Cubin(cubin) => Module::from_cubin(cubin, &[])?,
            KernelSource::Ptx(ptx) => Module::from_ptx(ptx, &[ModuleJitOption::MaxRegisters(256)])?,
        };
        Ok(module)
    }
}

pub struct CudaBuffer {
    len: usize,
    access: MemAccess,
    memory: DeviceBuffer<i32>,
}

/// A CUDA stream with the demo kernels loaded into its context.
pub struct CudaQueue {
    ordinal: usize,
    stream: Stream,
    module: Module,
    max_threads_per_block: usize,
    // Pinned copies of uploads, kept alive until the stream has consumed them.
    staging: Vec<LockedBuffer<i32>>,
    // Recorded after each upload so launches can wait on them.
    events: HashMap<u64, Event>,
    // Keep context alive for the lifetime of the queue
    #[allow(dead_code)]
    ctx: Context,
}

impl CudaQueue {
    pub fn new(ordinal: usize, source: KernelSource) -> Result<Self, Box<dyn Error + Send + Sync>> {
        let device = Device::get_device(ordinal as u32)?;
        let ctx = Context::new(device)?;
        cust::context::CurrentContext::set_current(&ctx)?;

        println!("[{ordinal}] Loading module...");
        let module = source.into_module()?;
        println!("[{ordinal}] Module loaded");

        let stream = Stream::new(StreamFlags::NON_BLOCKING, None)?;
        let max_threads_per_block = std::env::var("THREADS_PER_BLOCK")
            .unwrap_or("256".to_string())
            .parse::<usize>()
            .map_err(|e| format!("Invalid THREADS_PER_BLOCK: {}", e))?;

        Ok(Self {
            ordinal,
            stream,
            module,
            max_threads_per_block,
            staging: Vec::new(),
            events: HashMap::new(),
            ctx,
        })
    }
}

impl CommandQueue for CudaQueue {
    type Buffer = CudaBuffer;

    fn create_buffer(&mut self, len: usize, access: MemAccess) -> Result<CudaBuffer, Box<dyn Error + Send + Sync>> {
        log::debug!("[{}] Allocating {:?} device buffer of {} elements", self.ordinal, access, len);
        let memory = unsafe { DeviceBuffer::uninitialized(len)? };
        Ok(CudaBuffer { len, access, memory })
    }

    fn enqueue_write(
        &mut self,
        buffer: &mut CudaBuffer,
        data: &[i32],
        label: &str,
    ) -> Result<CompletionSignal, Box<dyn Error + Send + Sync>> {
        check_transfer_len(buffer.len, data.len())?;

        let staging = LockedBuffer::from_slice(data)?;
        unsafe {
            buffer.memory.async_copy_from(staging.as_slice(), &self.stream)?;
        }
        self.staging.push(staging);

        let (signal, done) = CompletionSignal::pending(label);
        let event = Event::new(EventFlags::DISABLE_TIMING)?;
        event.record(&self.stream)?;
        self.events.insert(signal.id(), event);

        // Host callbacks hold back later work in the stream until they return.
        self.stream
            .add_callback(Box::new(move || done.complete(CommandStatus::Complete)))?;

        Ok(signal)
    }

    fn enqueue_kernel(
        &mut self,
        invocation: &KernelInvocation<'_, CudaBuffer>,
        wait_for: &[CompletionSignal],
    ) -> Result<(), Box<dyn Error + Send + Sync>> {
        let bound = invocation.bind()?;
        let count = check_kernel_extent(&bound, |b| b.len, |b| b.access)?;

        for signal in wait_for {
            let event = self
                .events
                .remove(&signal.id())
                .ok_or_else(|| format!("signal '{}' was not produced by this queue", signal.label()))?;
            self.stream.wait_event(event, StreamWaitEventFlags::DEFAULT)?;
        }

        let function = self.module.get_function(invocation.variant().kernel_name())?;
        let stream = &self.stream;

        match bound {
            BoundKernel::PerElement { source_a, source_b, dest } => {
                let dims = logic::per_element_dims(count, self.max_threads_per_block);
                if dims.total_threads() == 0 {
                    return Ok(());
                }
                println!(
                    "[{}] Launching {} ({} blocks, {} threads per block)",
                    self.ordinal,
                    invocation.variant().kernel_name(),
                    dims.blocks_per_grid,
                    dims.threads_per_block
                );
                unsafe {
                    launch!(
                        function<<<dims.blocks_per_grid, dims.threads_per_block, 0, stream>>>(
                            source_a.memory.as_device_ptr(),
                            source_b.memory.as_device_ptr(),
                            dest.memory.as_device_ptr(),
                        )
                    )?;
                }
            }
            BoundKernel::SingleWorkItem { source_a, source_b, dest, count } => {
                let dims = logic::LaunchDims::SINGLE_THREAD;
                println!(
                    "[{}] Launching {} as a single work item",
                    self.ordinal,
                    invocation.variant().kernel_name()
                );
                unsafe {
                    launch!(
                        function<<<dims.blocks_per_grid, dims.threads_per_block, 0, stream>>>(
                            source_a.memory.as_device_ptr(),
                            source_b.memory.as_device_ptr(),
                            dest.memory.as_device_ptr(),
                            count,
                        )
                    )?;
                }
            }
        }

        Ok(())
    }

    fn finish(&mut self) -> Result<(), Box<dyn Error + Send + Sync>> {
        self.stream.synchronize()?;
        self.staging.clear();
        Ok(())
    }

    fn read_buffer(&mut self, buffer: &CudaBuffer, dest: &mut [i32]) -> Result<(), Box<dyn Error + Send + Sync>> {
        check_transfer_len(buffer.len, dest.len())?;

        unsafe {
            buffer.memory.async_copy_to(dest, &self.stream)?;
        }
        self.stream.synchronize()?;
        Ok(())
    }
}

impl Drop for CudaQueue {
    fn drop(&mut self) {
        // Pending uploads still read from the staging buffers.
        if let Err(e) = self.stream.synchronize() {
            log::error!("[{}] Failed to drain stream: {}", self.ordinal, e);
        }
    }
}
