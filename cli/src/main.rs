mod args;
mod demo;
mod queue;
mod runner;

use args::Cli;
use backtrace::Backtrace;
use clap::Parser;
use common::Console;
use runner::Runner;
use std::error::Error;

#[cfg(feature = "gpu")]
use runner::GpuRunner;

#[cfg(not(feature = "gpu"))]
use runner::CpuRunner;

fn main() -> Result<(), Box<dyn Error + Send + Sync>> {
    env_logger::init();
    let cli = Cli::parse();

    // Set up panic hook for better error reporting
    std::panic::set_hook(Box::new(|panic_info| {
        let backtrace = Backtrace::new();
        eprintln!("Thread panicked: {}", panic_info);
        eprintln!("Backtrace:\n{:?}", backtrace);
    }));

    let selection = cli.selection();
    if let Some(description) = selection.description() {
        println!("{}", description);
    }

    // Create runner based on compile-time feature
    #[cfg(feature = "gpu")]
    let runner = GpuRunner::new(cli.ptx_path.clone())?;

    #[cfg(not(feature = "gpu"))]
    let runner = CpuRunner::new();

    let devices = runner.devices()?;
    let device = selection.resolve(&devices)?;
    log::info!("Using device '{}' on platform '{}'", device.name, device.platform);

    runner.run(device, cli.variant, &Console::stdout())?;
    Ok(())
}
