//!
//! Scheduled, cancellable callbacks.
//!

use crate::duration::SimDuration;
use crate::queue_map::Indexable;
use crate::simulator::SimulatorState;
use std::cell::RefCell;
use std::fmt::{self, Debug};
use std::panic::Location;
use std::rc::{Rc, Weak};
use std::sync::atomic::{AtomicUsize, Ordering};

static NEXT_TIMER_ID: AtomicUsize = AtomicUsize::new(0);

///
/// An opaque token identifying the scheduling context a timer was
/// created in.
///
/// Every timer is born into exactly one zone. [`Simulator::suspend`]
/// detaches every pending timer of a zone from the event wheel;
/// [`Simulator::resume`] reattaches them. The zone carries no meaning
/// beyond equality: it is never interpreted, only compared.
///
/// [`Simulator::suspend`]: crate::simulator::Simulator::suspend
/// [`Simulator::resume`]: crate::simulator::Simulator::resume
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Zone(pub(crate) usize);

impl Zone {
    /// The zone every [`Simulator`](crate::simulator::Simulator) starts
    /// in before any `suspend` call creates others.
    pub const ROOT: Zone = Zone(0);
}

type Callback = dyn FnMut();

struct SimTimerData {
    duration: SimDuration,
    next_call: SimDuration,
    is_periodic: bool,
    tick: u64,
    is_cancelled: bool,
    zone: Zone,
    creation_trace: Option<&'static Location<'static>>,
}

///
/// A one-shot or periodic scheduled callback.
///
/// A `SimTimer` is a cheap, cloneable handle (`Rc`-backed, like
/// [`Rc<RefCell<_>>`] elsewhere in this crate): cloning it does not
/// duplicate the underlying schedule, it shares it. The handle compares
/// and hashes by identity (its creation-order id), never by schedule
/// state, so a `SimTimer` can be looked up and cancelled after being
/// moved into a [`QueueMap`](crate::queue_map::QueueMap).
///
/// Timer state is deliberately split into two `RefCell`s: one for plain
/// scheduling data, one for the callback closure. A periodic callback
/// that calls back into its own handle (`self.tick()`, `self.cancel()`)
/// only ever needs to borrow the data cell, because firing the timer
/// borrows the callback cell alone while the closure runs.
///
pub struct SimTimer {
    id: usize,
    data: Rc<RefCell<SimTimerData>>,
    callback: Rc<RefCell<Option<Box<Callback>>>>,
    owner: Weak<RefCell<SimulatorState>>,
}

impl SimTimer {
    #[track_caller]
    pub(crate) fn new(
        duration: SimDuration,
        next_call: SimDuration,
        is_periodic: bool,
        zone: Zone,
        owner: Weak<RefCell<SimulatorState>>,
        callback: Box<Callback>,
        include_trace: bool,
    ) -> Self {
        let id = NEXT_TIMER_ID.fetch_add(1, Ordering::Relaxed);
        Self {
            id,
            data: Rc::new(RefCell::new(SimTimerData {
                duration: duration.non_negative(),
                next_call,
                is_periodic,
                tick: 0,
                is_cancelled: false,
                zone,
                creation_trace: include_trace.then(Location::caller),
            })),
            callback: Rc::new(RefCell::new(Some(callback))),
            owner,
        }
    }

    /// A stable, opaque identifier for this timer, unique for the
    /// lifetime of the process.
    #[must_use]
    pub fn id(&self) -> usize {
        self.id
    }

    /// The configured period. Zero for a timer meant to fire exactly
    /// once at its current `next_call`.
    #[must_use]
    pub fn duration(&self) -> SimDuration {
        self.data.borrow().duration
    }

    /// The absolute virtual time this timer is next due to fire.
    #[must_use]
    pub fn next_call(&self) -> SimDuration {
        self.data.borrow().next_call
    }

    /// Whether this timer reschedules itself after firing.
    #[must_use]
    pub fn is_periodic(&self) -> bool {
        self.data.borrow().is_periodic
    }

    /// The number of times this timer has fired so far.
    #[must_use]
    pub fn tick(&self) -> u64 {
        self.data.borrow().tick
    }

    /// Whether `cancel` has been called on this timer.
    #[must_use]
    pub fn is_cancelled(&self) -> bool {
        self.data.borrow().is_cancelled
    }

    /// Whether this timer is still eligible to fire: not cancelled, and
    /// for one-shot timers, not yet fired.
    #[must_use]
    pub fn is_active(&self) -> bool {
        let data = self.data.borrow();
        !data.is_cancelled && (data.is_periodic || data.tick == 0)
    }

    /// The zone this timer was created in.
    #[must_use]
    pub fn zone(&self) -> Zone {
        self.data.borrow().zone
    }

    /// The call-site that created this timer, if the owning
    /// [`Simulator`](crate::simulator::Simulator) was configured with
    /// `include_trace(true)`.
    #[must_use]
    pub fn creation_trace(&self) -> Option<&'static Location<'static>> {
        self.data.borrow().creation_trace
    }

    ///
    /// A human-readable summary of this timer's schedule: its `duration`,
    /// whether it is `periodic`, and, if creation traces were enabled for
    /// the owning simulator, the call site it was created at.
    ///
    #[must_use]
    pub fn debug_string(&self) -> String {
        let data = self.data.borrow();
        let mut s = format!(
            "SimTimer#{} {{ duration: {}, periodic: {} }}",
            self.id, data.duration, data.is_periodic
        );
        if let Some(loc) = data.creation_trace {
            s.push_str(&format!(" @ {loc}"));
        }
        s
    }

    ///
    /// Marks this timer as cancelled and removes it from its owning
    /// simulator's pending queue and current delta batch, wherever it
    /// currently sits.
    ///
    /// A sticky flag: cancelling an already-fired one-shot timer, or a
    /// timer whose owning simulator has since been dropped, is a no-op.
    ///
    pub fn cancel(&self) {
        self.data.borrow_mut().is_cancelled = true;
        if let Some(state) = self.owner.upgrade() {
            state.borrow_mut().purge_timer(self.id);
        }
    }

    pub(crate) fn set_next_call(&self, next_call: SimDuration) {
        self.data.borrow_mut().next_call = next_call;
    }

    pub(crate) fn reset_zone(&self, zone: Zone) {
        self.data.borrow_mut().zone = zone;
    }

    ///
    /// Executes the callback exactly once, advancing `tick`, and for a
    /// periodic timer, advancing `next_call` by `duration` unless the
    /// callback cancelled the timer while running.
    ///
    /// Returns `true` if the timer should be reinserted into the
    /// pending queue at its new `next_call`.
    ///
    pub(crate) fn fire(&self) -> bool {
        {
            let mut data = self.data.borrow_mut();
            data.tick += 1;
        }

        let is_periodic = self.data.borrow().is_periodic;
        if is_periodic {
            let cb = self.callback.clone();
            let mut cb = cb.borrow_mut();
            if let Some(f) = cb.as_mut() {
                f();
            }
        } else {
            let cb = self.callback.borrow_mut().take();
            if let Some(mut f) = cb {
                f();
            }
        }

        let mut data = self.data.borrow_mut();
        if data.is_cancelled || !data.is_periodic {
            return false;
        }
        let next_call = data.next_call + data.duration;
        data.next_call = next_call;
        true
    }
}

impl Indexable<SimDuration> for SimTimer {
    fn key(&self) -> SimDuration {
        self.next_call()
    }
}

impl Clone for SimTimer {
    fn clone(&self) -> Self {
        Self {
            id: self.id,
            data: self.data.clone(),
            callback: self.callback.clone(),
            owner: self.owner.clone(),
        }
    }
}

impl PartialEq for SimTimer {
    fn eq(&self, other: &Self) -> bool {
        self.id == other.id
    }
}

impl Eq for SimTimer {}

impl Debug for SimTimer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let data = self.data.borrow();
        f.debug_struct("SimTimer")
            .field("id", &self.id)
            .field("duration", &data.duration)
            .field("next_call", &data.next_call)
            .field("is_periodic", &data.is_periodic)
            .field("tick", &data.tick)
            .field("is_cancelled", &data.is_cancelled)
            .field("creation_trace", &data.creation_trace)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn detached_timer(duration: SimDuration, next_call: SimDuration, periodic: bool) -> SimTimer {
        SimTimer::new(
            duration,
            next_call,
            periodic,
            Zone::ROOT,
            Weak::new(),
            Box::new(|| {}),
            false,
        )
    }

    #[test]
    fn one_shot_fire_does_not_reinsert() {
        let timer = detached_timer(SimDuration::ZERO, SimDuration::from_secs(1), false);
        assert!(timer.is_active());
        assert!(!timer.fire());
        assert_eq!(timer.tick(), 1);
        assert!(!timer.is_active());
    }

    #[test]
    fn periodic_fire_reschedules_and_reinserts() {
        let timer = detached_timer(SimDuration::from_secs(1), SimDuration::from_secs(1), true);
        assert!(timer.fire());
        assert_eq!(timer.next_call(), SimDuration::from_secs(2));
        assert_eq!(timer.tick(), 1);
        assert!(timer.fire());
        assert_eq!(timer.next_call(), SimDuration::from_secs(3));
        assert_eq!(timer.tick(), 2);
    }

    #[test]
    fn debug_string_reports_duration_and_periodicity() {
        let timer = detached_timer(SimDuration::from_secs(1), SimDuration::from_secs(1), true);
        let s = timer.debug_string();
        assert!(s.contains("periodic: true"));
        assert!(s.contains(&SimDuration::from_secs(1).to_string()));
        assert!(!s.contains('@'));
    }

    #[test]
    fn cancelling_during_own_periodic_callback_stops_reinsertion() {
        let data = Rc::new(RefCell::new(SimTimerData {
            duration: SimDuration::from_secs(1),
            next_call: SimDuration::from_secs(1),
            is_periodic: true,
            tick: 0,
            is_cancelled: false,
            zone: Zone::ROOT,
            creation_trace: None,
        }));
        let data_for_cb = data.clone();
        let timer = SimTimer {
            id: 0,
            data,
            callback: Rc::new(RefCell::new(Some(Box::new(move || {
                data_for_cb.borrow_mut().is_cancelled = true;
            })))),
            owner: Weak::new(),
        };
        assert!(!timer.fire());
        assert!(timer.is_cancelled());
    }
}
