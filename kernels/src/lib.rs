#![cfg_attr(target_os = "cuda", no_std)]

#[cfg(target_os = "cuda")]
mod panic;
#[cfg(target_os = "cuda")]
mod vector_add;

#[cfg(target_os = "cuda")]
pub use vector_add::*;

/// Entry point of the one-thread-per-element kernel.
pub const VECTOR_ADD: &str = "vector_add";

/// Entry point of the kernel where one thread loops over every element.
pub const VECTOR_ADD_SINGLE_WORK_ITEM: &str = "vector_add_single_work_item";
