//!
//! Convenience re-export of common members.
//!

pub use crate::duration::SimDuration;
pub use crate::error::SimError;
pub use crate::queue_map::{Indexable, QueueMap};
pub use crate::simulator::{Simulator, SimulatorOptions};
pub use crate::timer::{SimTimer, Zone};
