//!
//! Errors raised at the boundary of the virtual time line.
//!

use crate::duration::SimDuration;
use std::fmt::{self, Display};

///
/// An error produced by a [`Simulator`](crate::simulator::Simulator) or
/// [`SimDuration`] operation.
///
/// None of these are recovered internally: every fallible operation in this
/// crate surfaces its error to the caller unchanged.
///
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SimError {
    /// A negative duration was passed to `elapse` or `elapse_blocking`.
    InvalidArgument(String),

    /// `elapse` was called while another `elapse` was already in progress
    /// on the same [`Simulator`](crate::simulator::Simulator).
    Reentrancy,

    /// `flush_timers` exceeded its virtual-time budget before the pending
    /// timer queue ran dry. Usually indicates a periodic-timer livelock.
    Timeout {
        /// The timeout budget that was exceeded.
        budget: SimDuration,
    },

    /// `SimDuration ~/ 0`.
    DivisionByZero,

    /// `resume` was given a timer whose `next_call` lies at or before the
    /// current `elapsed`.
    TimerNotInFuture {
        /// The simulator's `elapsed` at the time of the call.
        elapsed: SimDuration,
        /// The timer's `next_call`.
        next_call: SimDuration,
    },
}

impl SimError {
    pub(crate) fn invalid_argument(msg: impl Into<String>) -> Self {
        Self::InvalidArgument(msg.into())
    }
}

impl Display for SimError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::InvalidArgument(msg) => write!(f, "invalid argument: {msg}"),
            Self::Reentrancy => write!(f, "elapse called while another elapse is in progress"),
            Self::Timeout { budget } => {
                write!(f, "flush_timers exceeded its timeout of {budget}")
            }
            Self::DivisionByZero => write!(f, "division by zero"),
            Self::TimerNotInFuture {
                elapsed,
                next_call,
            } => write!(
                f,
                "timer next_call {next_call} is not after current elapsed {elapsed}"
            ),
        }
    }
}

impl std::error::Error for SimError {}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn display_messages() {
        assert_eq!(
            SimError::invalid_argument("duration must be non-negative").to_string(),
            "invalid argument: duration must be non-negative"
        );
        assert_eq!(
            SimError::Reentrancy.to_string(),
            "elapse called while another elapse is in progress"
        );
        assert_eq!(SimError::DivisionByZero.to_string(), "division by zero");
    }
}
