mod backend;
mod faults;
mod validate;

pub use backend::{MemoryBackend, MemoryStats};
pub use faults::Faults;
