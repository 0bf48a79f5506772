//! Process-wide `tracing` subscriber setup shared by the binaries.

mod tracing;

pub use self::tracing::{LogFormat, init_tracing, init_tracing_with};
