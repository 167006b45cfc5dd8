use clap::Parser;
use common::{DeviceSelection, KernelVariant};
use std::path::PathBuf;

#[derive(Parser, Debug)]
#[command(name = "vector-add")]
#[command(about = "Adds two integer vectors on a compute device")]
pub struct Cli {
    /// Platform to search for, or the device when given alone
    pub first: Option<String>,
    /// Device to search for on the given platform
    pub second: Option<String>,
    /// Kernel that performs the addition (per-element or single-work-item)
    #[arg(long, env = "VECTOR_ADD_VARIANT", default_value_t = KernelVariant::PerElement)]
    pub variant: KernelVariant,
    /// Compiled PTX module holding the kernels (gpu builds only)
    #[arg(long, env = "PTX_PATH")]
    pub ptx_path: Option<PathBuf>,
}

impl Cli {
    pub fn selection(&self) -> DeviceSelection {
        DeviceSelection::from_positional(self.first.clone(), self.second.clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_no_arguments() {
        let cli = Cli::try_parse_from(["vector-add"]).unwrap();
        assert_eq!(cli.selection(), DeviceSelection::default());
        assert_eq!(cli.variant, KernelVariant::PerElement);
    }

    #[test]
    fn test_one_argument_is_a_device() {
        let cli = Cli::try_parse_from(["vector-add", "GeForce"]).unwrap();
        let selection = cli.selection();
        assert_eq!(selection.platform, None);
        assert_eq!(selection.device.as_deref(), Some("GeForce"));
    }

    #[test]
    fn test_two_arguments_are_platform_and_device() {
        let cli = Cli::try_parse_from(["vector-add", "CUDA", "A100", "--variant", "single-work-item"]).unwrap();
        let selection = cli.selection();
        assert_eq!(selection.platform.as_deref(), Some("CUDA"));
        assert_eq!(selection.device.as_deref(), Some("A100"));
        assert_eq!(cli.variant, KernelVariant::SingleWorkItem);
    }

    #[test]
    fn test_rejects_unknown_variant_and_extra_arguments() {
        assert!(Cli::try_parse_from(["vector-add", "--variant", "both"]).is_err());
        assert!(Cli::try_parse_from(["vector-add", "a", "b", "c"]).is_err());
    }
}
