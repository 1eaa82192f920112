//! platehook-ipc - single-owner election between platehook processes.
//!
//! Every launch of the hook starts a new process. The first one to bind the
//! coordination port owns the aggregation session; the others forward their
//! file path to it and exit.
//!
//! # Example
//!
//! ```ignore
//! use platehook_ipc::{CoordinatorConfig, InstanceCoordinator};
//!
//! let coordinator = InstanceCoordinator::new(CoordinatorConfig::new(28411));
//! if coordinator.try_acquire_ownership() {
//!     coordinator.start_accept_loop(|path| println!("forwarded: {path}"))?;
//! } else if coordinator.send_to_owner("/tmp/plate_2.gcode").await {
//!     return Ok(());
//! }
//! ```

pub mod coordinator;
pub mod error;

pub use coordinator::{CoordinatorConfig, InstanceCoordinator};
pub use error::{CoordinatorError, CoordinatorResult};
