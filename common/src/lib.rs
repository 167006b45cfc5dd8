mod completion;
mod console;
mod kernel;
mod report;
mod selection;

pub use completion::*;
pub use console::*;
pub use kernel::*;
pub use report::*;
pub use selection::*;
