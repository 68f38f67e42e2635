//! # Ports Layer (Middle Hexagon)
//!
//! - **Driving Ports (Inbound)**: [`ExecutionApi`]
//! - **Driven Ports (Outbound)**: [`StateBackend`], [`PrecompileProvider`],
//!   [`Tracer`]

pub mod inbound;
pub mod outbound;

pub use inbound::*;
pub use outbound::*;
