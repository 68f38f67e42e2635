//! # Adapters Layer (Outer Hexagon)
//!
//! Reference implementations of the driven ports.

pub mod memory_backend;
pub mod tracer;

pub use memory_backend::InMemoryBackend;
pub use tracer::{CallEndTrace, NoopTracer, TraceCollector, TraceEvent};
