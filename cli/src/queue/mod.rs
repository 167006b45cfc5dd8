//! In-order command queues the demo submits work through.
//!
//! A queue owns its context and compiled kernels; the demo only sees buffer handles,
//! completion signals and the launch descriptor.

mod host;
#[cfg(feature = "gpu")]
mod cuda;

pub use host::{HostBuffer, HostQueue};
#[cfg(feature = "gpu")]
pub use cuda::{CudaBuffer, CudaQueue, KernelSource};

use common::{CompletionSignal, KernelInvocation, MemAccess};
use std::error::Error;

pub trait CommandQueue {
    type Buffer;

    /// Allocate device memory for `len` elements.
    fn create_buffer(&mut self, len: usize, access: MemAccess) -> Result<Self::Buffer, Box<dyn Error + Send + Sync>>;

    /// Non-blocking upload of `data` into `buffer`. The queue keeps its own copy of the data.
    fn enqueue_write(
        &mut self,
        buffer: &mut Self::Buffer,
        data: &[i32],
        label: &str,
    ) -> Result<CompletionSignal, Box<dyn Error + Send + Sync>>;

    /// Launch a kernel once every signal in `wait_for` has completed.
    fn enqueue_kernel(
        &mut self,
        invocation: &KernelInvocation<'_, Self::Buffer>,
        wait_for: &[CompletionSignal],
    ) -> Result<(), Box<dyn Error + Send + Sync>>;

    /// Block until all submitted work has finished.
    fn finish(&mut self) -> Result<(), Box<dyn Error + Send + Sync>>;

    /// Blocking download of `buffer` into `dest`.
    fn read_buffer(&mut self, buffer: &Self::Buffer, dest: &mut [i32]) -> Result<(), Box<dyn Error + Send + Sync>>;
}

pub(crate) fn check_transfer_len(buffer_len: usize, host_len: usize) -> Result<(), Box<dyn Error + Send + Sync>> {
    if buffer_len != host_len {
        return Err(format!(
            "transfer of {} elements does not match buffer of {} elements",
            host_len, buffer_len
        )
        .into());
    }
    Ok(())
}
