#![no_std]

mod launch;
mod vector_add;

pub use launch::*;
pub use vector_add::*;
