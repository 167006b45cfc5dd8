/// Grid shape for a kernel launch.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LaunchDims {
    pub blocks_per_grid: u32,
    pub threads_per_block: u32,
}

impl LaunchDims {
    /// One thread in one block, used for the single-work-item kernel.
    pub const SINGLE_THREAD: LaunchDims = LaunchDims {
        blocks_per_grid: 1,
        threads_per_block: 1,
    };

    pub fn total_threads(&self) -> usize {
        self.blocks_per_grid as usize * self.threads_per_block as usize
    }
}

/// Shape a launch that runs exactly `len` work items.
///
/// The per-element kernel has no bounds check, so the block size is the largest
/// divisor of `len` that does not exceed `max_threads_per_block`.
pub fn per_element_dims(len: usize, max_threads_per_block: usize) -> LaunchDims {
    if len == 0 {
        return LaunchDims {
            blocks_per_grid: 0,
            threads_per_block: 1,
        };
    }

    let mut threads_per_block = len.min(max_threads_per_block.max(1));
    while len % threads_per_block != 0 {
        threads_per_block -= 1;
    }

    LaunchDims {
        blocks_per_grid: (len / threads_per_block) as u32,
        threads_per_block: threads_per_block as u32,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_small_vector_fits_one_block() {
        let dims = per_element_dims(20, 256);
        assert_eq!(dims.blocks_per_grid, 1);
        assert_eq!(dims.threads_per_block, 20);
    }

    #[test]
    fn test_grid_covers_len_exactly() {
        for len in [1usize, 7, 20, 256, 257, 1000, 4096, 65_537] {
            let dims = per_element_dims(len, 256);
            assert_eq!(dims.total_threads(), len, "len = {len}");
            assert!(dims.threads_per_block <= 256);
        }
    }

    #[test]
    fn test_prime_len_above_limit_falls_back_to_one_thread_blocks() {
        let dims = per_element_dims(257, 256);
        assert_eq!(dims.threads_per_block, 1);
        assert_eq!(dims.blocks_per_grid, 257);
    }

    #[test]
    fn test_zero_len_launches_nothing() {
        assert_eq!(per_element_dims(0, 256).total_threads(), 0);
    }
}
