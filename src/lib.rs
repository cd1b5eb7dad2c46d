//!
//! A deterministic, picosecond-resolution discrete-event core.
//!
//! This crate provides the four building blocks a larger simulation
//! framework is built on top of, without committing to any particular
//! notion of "module" or "network":
//!
//! - [`duration::SimDuration`]: an immutable, signed virtual duration
//!   with picosecond resolution.
//! - [`queue_map::QueueMap`]: an ordered map of non-empty FIFO queues,
//!   used to index pending work by the virtual time it is due.
//! - [`timer::SimTimer`]: a one-shot or periodic scheduled callback.
//! - [`simulator::Simulator`]: the delta-cycle event wheel that ties the
//!   above together into a virtual clock.
//!
//! # Examples
//!
//! ```rust
//! use sim_core::prelude::*;
//! use std::cell::Cell;
//! use std::rc::Rc;
//!
//! let sim = Simulator::new("example");
//! let fired = Rc::new(Cell::new(false));
//!
//! let fired_cb = fired.clone();
//! sim.schedule_once(SimDuration::from_secs(1), Zone::ROOT, move || {
//!     fired_cb.set(true);
//! });
//!
//! sim.run_to_completion().unwrap();
//! assert!(fired.get());
//! ```

pub mod duration;
pub mod error;
pub mod logger;
pub mod queue_map;
pub mod simulator;
pub mod timer;

pub mod prelude;

pub use duration::SimDuration;
pub use error::SimError;
pub use queue_map::{Indexable, QueueMap};
pub use simulator::{Simulator, SimulatorOptions};
pub use timer::{SimTimer, Zone};
