//! # Domain Layer (Inner Hexagon)
//!
//! Plain data and pure functions: accounts, environments, call requests and
//! results, hardfork rules, address derivation and the post-execution
//! invariants. Nothing here touches state or performs I/O.

pub mod entities;
pub mod hardfork;
pub mod invariants;
pub mod services;
pub mod value_objects;

pub use entities::*;
pub use hardfork::Hardfork;
pub use invariants::*;
pub use services::*;
pub use value_objects::*;
