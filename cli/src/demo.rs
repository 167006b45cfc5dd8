use crate::queue::CommandQueue;
use common::{CommandStatus, CompletionSignal, Console, KernelArg, KernelInvocation, KernelVariant, MemAccess};
use std::error::Error;

/// Add the two demo vectors of `logic::VECTOR_SIZE` elements on `queue` and print the sum.
pub fn run<Q: CommandQueue>(
    queue: &mut Q,
    variant: KernelVariant,
    console: &Console,
) -> Result<Vec<i32>, Box<dyn Error + Send + Sync>> {
    run_sized(queue, variant, logic::VECTOR_SIZE, console)
}

pub fn run_sized<Q: CommandQueue>(
    queue: &mut Q,
    variant: KernelVariant,
    vector_size: usize,
    console: &Console,
) -> Result<Vec<i32>, Box<dyn Error + Send + Sync>> {
    // Device buffers: two inputs the kernel only reads, one output
    let mut buffer_a = queue.create_buffer(vector_size, MemAccess::ReadOnly)?;
    let mut buffer_b = queue.create_buffer(vector_size, MemAccess::ReadOnly)?;
    let buffer_c = queue.create_buffer(vector_size, MemAccess::ReadWrite)?;

    let mut source_a = vec![0i32; vector_size];
    let mut source_b = vec![0i32; vector_size];
    let mut dest = vec![0i32; vector_size];
    logic::fill_source_a(&mut source_a);
    logic::fill_source_b(&mut source_b);

    // Async uploads; observers report when each one lands on the device
    let upload_a = queue.enqueue_write(&mut buffer_a, &source_a, "A")?;
    let upload_b = queue.enqueue_write(&mut buffer_b, &source_b, "B")?;
    report_upload(&upload_a, console);
    report_upload(&upload_b, console);

    let mut invocation = KernelInvocation::new(variant);
    invocation.set_arg(0, KernelArg::Buffer(&buffer_a))?;
    invocation.set_arg(1, KernelArg::Buffer(&buffer_b))?;
    invocation.set_arg(2, KernelArg::Buffer(&buffer_c))?;
    if variant == KernelVariant::SingleWorkItem {
        invocation.set_arg(3, KernelArg::Int(i32::try_from(vector_size)?))?;
    }

    console.line("Enqueued kernel computation");
    queue.enqueue_kernel(&invocation, &[upload_a, upload_b])?;

    queue.finish()?;

    queue.read_buffer(&buffer_c, &mut dest)?;

    common::print_results(console, &dest);
    Ok(dest)
}

fn report_upload(signal: &CompletionSignal, console: &Console) {
    let console = console.clone();
    let label = signal.label().to_string();
    signal.on_complete(move |status| match status {
        CommandStatus::Complete => console.line(format!("Enqueueing buffer {} completed", label)),
        CommandStatus::Failed(reason) => log::error!("Enqueueing buffer {} failed: {}", label, reason),
    });
}
