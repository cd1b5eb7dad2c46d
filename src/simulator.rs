//!
//! The delta-cycle event wheel driving a virtual clock.
//!

use crate::duration::SimDuration;
use crate::error::SimError;
use crate::queue_map::QueueMap;
use crate::timer::{SimTimer, Zone};
use std::cell::RefCell;
use std::collections::{HashMap, VecDeque};
use std::fmt::{self, Debug};
use std::rc::Rc;

///
/// Configuration accepted by [`Simulator::new_with`].
///
/// Mirrors the chained-builder shape of a runtime options struct: every
/// setter takes `self` by value and returns it, so options can be built
/// in a single expression.
///
#[derive(Debug, Clone)]
pub struct SimulatorOptions {
    clock_period: SimDuration,
    include_trace: bool,
}

impl SimulatorOptions {
    /// Default options: a clock period of one picosecond, no creation
    /// traces recorded.
    #[must_use]
    pub fn new() -> Self {
        Self {
            clock_period: SimDuration::from_picos(1),
            include_trace: false,
        }
    }

    /// Sets the nominal resolution the simulator's clock advances in.
    /// Purely informational: it does not clamp scheduled durations.
    #[must_use]
    pub fn clock_period(mut self, period: SimDuration) -> Self {
        self.clock_period = period;
        self
    }

    /// Enables or disables capturing the call site of every timer at
    /// creation, for use in diagnostics.
    #[must_use]
    pub fn include_trace(mut self, include: bool) -> Self {
        self.include_trace = include;
        self
    }
}

impl Default for SimulatorOptions {
    fn default() -> Self {
        Self::new()
    }
}

pub(crate) struct SimulatorState {
    elapsed: SimDuration,
    elapsing_to: Option<SimDuration>,
    micro_tasks: VecDeque<Box<dyn FnOnce()>>,
    pending: QueueMap<SimDuration, SimTimer>,
    current_delta: VecDeque<SimTimer>,
    suspended: HashMap<Zone, Vec<SimTimer>>,
    next_zone: usize,
}

impl SimulatorState {
    fn new() -> Self {
        Self {
            elapsed: SimDuration::ZERO,
            elapsing_to: None,
            micro_tasks: VecDeque::new(),
            pending: QueueMap::new(),
            current_delta: VecDeque::new(),
            suspended: HashMap::new(),
            next_zone: 1, // Zone::ROOT = 0
        }
    }

    pub(crate) fn purge_timer(&mut self, id: usize) {
        self.pending.remove_where(|t| t.id() == id);
        self.current_delta.retain(|t| t.id() != id);
        for timers in self.suspended.values_mut() {
            timers.retain(|t| t.id() != id);
        }
    }
}

///
/// A self-contained, deterministic discrete-event clock.
///
/// A `Simulator` owns a virtual picosecond clock, a FIFO queue of
/// microtasks, and a time-indexed queue of pending [`SimTimer`]s. It
/// never touches a wall clock or an OS thread: every unit of progress
/// is either a call to [`run`](Self::run)/[`elapse`](Self::elapse) or a
/// microtask/timer scheduled from within one of those calls.
///
/// Cloning a `Simulator` shares the same underlying clock and queues
/// (it is an `Rc` handle), which is how a scheduled callback captures
/// the ability to schedule further timers or microtasks on the
/// simulator that is about to invoke it.
///
#[derive(Clone)]
pub struct Simulator {
    name: Rc<str>,
    clock_period: SimDuration,
    include_trace: bool,
    inner: Rc<RefCell<SimulatorState>>,
}

impl Simulator {
    /// Creates a simulator with default options.
    #[must_use]
    pub fn new(name: impl Into<String>) -> Self {
        Self::new_with(name, SimulatorOptions::default())
    }

    /// Creates a simulator with the given options.
    #[must_use]
    pub fn new_with(name: impl Into<String>, options: SimulatorOptions) -> Self {
        let name: Rc<str> = Rc::from(name.into());
        log::debug!("[{name}] simulator created (clock_period = {})", options.clock_period);
        Self {
            name,
            clock_period: options.clock_period,
            include_trace: options.include_trace,
            inner: Rc::new(RefCell::new(SimulatorState::new())),
        }
    }

    /// This simulator's name, as given at construction.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// The configured clock period.
    #[must_use]
    pub fn clock_period(&self) -> SimDuration {
        self.clock_period
    }

    /// The current virtual time.
    #[must_use]
    pub fn elapsed(&self) -> SimDuration {
        self.inner.borrow().elapsed
    }

    /// Whether an `elapse` call is currently in progress on this
    /// simulator.
    #[must_use]
    pub fn is_elapsing(&self) -> bool {
        self.inner.borrow().elapsing_to.is_some()
    }

    /// The number of timers currently pending (not yet fired, not
    /// cancelled, not suspended).
    #[must_use]
    pub fn pending_timer_count(&self) -> usize {
        self.inner.borrow().pending.len()
    }

    /// The number of whole `clock_period`s that have elapsed, i.e.
    /// `elapsed.in_picoseconds() / clock_period.in_picoseconds()`.
    #[must_use]
    pub fn elapsed_ticks(&self) -> i64 {
        self.elapsed().in_picoseconds() / self.clock_period.in_picoseconds()
    }

    /// A snapshot of every timer not yet fired: the timers still in the
    /// in-progress delta batch (if any), in firing order, followed by
    /// every timer in the pending queue, in queue order.
    #[must_use]
    pub fn pending_timers(&self) -> Vec<SimTimer> {
        let state = self.inner.borrow();
        state
            .current_delta
            .iter()
            .cloned()
            .chain(state.pending.iter().cloned())
            .collect()
    }

    /// A human-readable rendering of [`pending_timers`](Self::pending_timers),
    /// one [`SimTimer::debug_string`] per line.
    #[must_use]
    pub fn pending_timers_debug_string(&self) -> String {
        self.pending_timers()
            .iter()
            .map(SimTimer::debug_string)
            .collect::<Vec<_>>()
            .join("\n")
    }

    /// The number of pending periodic timers, counting both the
    /// in-progress delta batch and the pending queue.
    #[must_use]
    pub fn periodic_timer_count(&self) -> usize {
        self.pending_timers().iter().filter(|t| t.is_periodic()).count()
    }

    /// The number of pending one-shot timers, counting both the
    /// in-progress delta batch and the pending queue.
    #[must_use]
    pub fn non_periodic_timer_count(&self) -> usize {
        self.pending_timers().iter().filter(|t| !t.is_periodic()).count()
    }

    /// The number of microtasks currently queued, not yet run.
    #[must_use]
    pub fn micro_task_count(&self) -> usize {
        self.inner.borrow().micro_tasks.len()
    }

    /// Mints a fresh [`Zone`], distinct from every previously minted
    /// zone on this simulator, for use with
    /// [`suspend`](Self::suspend)/[`resume`](Self::resume).
    pub fn new_zone(&self) -> Zone {
        let mut state = self.inner.borrow_mut();
        let zone = Zone(state.next_zone);
        state.next_zone += 1;
        zone
    }

    ///
    /// Schedules `callback` to run once, `after` virtual time from now.
    ///
    /// `after` is clamped to be non-negative: a negative duration fires
    /// at the current `elapsed` instead of panicking.
    ///
    #[track_caller]
    pub fn schedule_once(
        &self,
        after: SimDuration,
        zone: Zone,
        callback: impl FnOnce() + 'static,
    ) -> SimTimer {
        let next_call = self.elapsed() + after.non_negative();
        let callback = RefCell::new(Some(callback));
        let timer = SimTimer::new(
            SimDuration::ZERO,
            next_call,
            false,
            zone,
            Rc::downgrade(&self.inner),
            Box::new(move || {
                if let Some(f) = callback.borrow_mut().take() {
                    f();
                }
            }),
            self.include_trace,
        );
        self.inner.borrow_mut().pending.add(timer.clone());
        timer
    }

    ///
    /// Schedules `callback` to run every `period` virtual time,
    /// starting `period` from now.
    ///
    #[track_caller]
    pub fn schedule_periodic(
        &self,
        period: SimDuration,
        zone: Zone,
        callback: impl FnMut() + 'static,
    ) -> SimTimer {
        let period = period.non_negative();
        let next_call = self.elapsed() + period;
        let timer = SimTimer::new(
            period,
            next_call,
            true,
            zone,
            Rc::downgrade(&self.inner),
            Box::new(callback),
            self.include_trace,
        );
        self.inner.borrow_mut().pending.add(timer.clone());
        timer
    }

    /// Queues `task` to run after the in-progress delta batch (if any)
    /// finishes firing, before virtual time advances any further.
    pub fn schedule_micro_task(&self, task: impl FnOnce() + 'static) {
        self.inner.borrow_mut().micro_tasks.push_back(Box::new(task));
    }

    /// Runs every queued microtask, including ones scheduled by a
    /// microtask that was itself run by this call.
    pub fn flush_micro_tasks(&self) {
        loop {
            let task = self.inner.borrow_mut().micro_tasks.pop_front();
            match task {
                Some(task) => task(),
                None => break,
            }
        }
    }

    /// Fires the next pending delta batch, if any, and drains the
    /// microtasks it schedules. Returns the ids of the timers fired, or
    /// `None` if nothing was pending.
    fn fire_delta_batch(&self) -> Option<Vec<usize>> {
        let next_key = self.inner.borrow().pending.first_key()?;

        {
            let mut state = self.inner.borrow_mut();
            state.elapsed = state.elapsed.max(next_key);
            state.current_delta = state.pending.remove_first_queue();
        }
        log::trace!(
            "[{}] firing delta batch at {next_key} ({} timers)",
            self.name,
            self.inner.borrow().current_delta.len()
        );

        let mut fired_ids = Vec::new();
        loop {
            let timer = self.inner.borrow_mut().current_delta.pop_front();
            let Some(timer) = timer else { break };
            if timer.is_cancelled() {
                continue;
            }
            fired_ids.push(timer.id());
            let reinsert = timer.fire();
            if reinsert {
                self.inner.borrow_mut().pending.add(timer);
            }
        }

        self.flush_micro_tasks();
        Some(fired_ids)
    }

    ///
    /// Enters a forked scheduling context and invokes `f(self)`, returning
    /// its result.
    ///
    /// Any timer or micro-task scheduling `f` performs goes through this
    /// simulator's own hooks, exactly as if called directly. `run` does
    /// NOT itself advance virtual time: the usual pattern is `run` to
    /// install callbacks, then [`elapse`](Self::elapse) to drive them.
    ///
    pub fn run<T>(&self, f: impl FnOnce(&Self) -> T) -> T {
        log::trace!("[{}] run entered at {}", self.name, self.elapsed());
        f(self)
    }

    ///
    /// Fires every pending timer, draining the microtasks each delta
    /// batch schedules, until no timer remains pending.
    ///
    /// A periodic timer that keeps rescheduling itself will keep this
    /// running forever; use [`flush_timers_with`](Self::flush_timers_with)
    /// with a timeout to bound that case instead.
    ///
    pub fn run_to_completion(&self) -> Result<(), SimError> {
        if self.inner.borrow().elapsing_to.is_some() {
            return Err(SimError::Reentrancy);
        }
        log::trace!("[{}] run_to_completion starting at {}", self.name, self.elapsed());
        self.run_event_wheel(|_| Ok(true))?;
        log::debug!("[{}] run_to_completion finished at {}", self.name, self.elapsed());
        Ok(())
    }

    ///
    /// Advances virtual time by `duration`, firing every timer due
    /// within the window, then resolves with `elapsed` at or past the
    /// computed target.
    ///
    /// Fails with [`SimError::Reentrancy`] if another `elapse` call is
    /// already in progress on this simulator. A callback running during
    /// the elapse can call [`elapse_blocking`](Self::elapse_blocking) to
    /// push the target further out without triggering that error.
    ///
    pub fn elapse(&self, duration: SimDuration) -> Result<(), SimError> {
        if duration.is_negative() {
            return Err(SimError::invalid_argument(
                "elapse duration must be non-negative",
            ));
        }
        if self.inner.borrow().elapsing_to.is_some() {
            return Err(SimError::Reentrancy);
        }

        let target = self.inner.borrow().elapsed + duration;
        self.inner.borrow_mut().elapsing_to = Some(target);
        log::trace!("[{}] elapse started, target {target}", self.name);

        self.run_event_wheel(|delta_time| {
            let target_now = self
                .inner
                .borrow()
                .elapsing_to
                .expect("elapsing_to cleared while elapse in progress");
            Ok(delta_time <= target_now)
        })?;

        let final_target = self
            .inner
            .borrow_mut()
            .elapsing_to
            .take()
            .expect("elapsing_to cleared while elapse in progress");
        let mut state = self.inner.borrow_mut();
        if state.elapsed < final_target {
            state.elapsed = final_target;
        }
        log::trace!("[{}] elapse finished at {}", self.name, state.elapsed);
        Ok(())
    }

    ///
    /// Synchronously advances `elapsed` by `duration`, without running
    /// the event wheel: no timers fire, no microtasks run.
    ///
    /// Called from within a timer or microtask callback that needs to
    /// push virtual time forward immediately, e.g. to make later timers
    /// it just scheduled land within the window an enclosing
    /// [`elapse`](Self::elapse) call is waiting on. If an `elapse` call
    /// is in progress, its target is extended to cover the new `elapsed`
    /// as well.
    ///
    pub fn elapse_blocking(&self, duration: SimDuration) -> Result<(), SimError> {
        if duration.is_negative() {
            return Err(SimError::invalid_argument(
                "elapse duration must be non-negative",
            ));
        }

        let mut state = self.inner.borrow_mut();
        state.elapsed += duration;
        if let Some(target) = state.elapsing_to {
            if state.elapsed > target {
                state.elapsing_to = Some(state.elapsed);
            }
        }
        Ok(())
    }

    /// Drains every pending timer, failing with [`SimError::Timeout`]
    /// if it would take more than an hour of virtual time, equivalent
    /// to `flush_timers_with(SimDuration::from_hours(1), true)`.
    pub fn flush_timers(&self) -> Result<(), SimError> {
        self.flush_timers_with(SimDuration::from_hours(1), true)
    }

    ///
    /// Drains pending timers until none remain (or, with
    /// `flush_periodic = false`, until every remaining pending timer
    /// has already fired at least once against the current `elapsed`),
    /// failing with [`SimError::Timeout`] if a batch due more than
    /// `timeout` of virtual time past the call would otherwise be
    /// needed — a guard against periodic-timer livelock.
    ///
    pub fn flush_timers_with(
        &self,
        timeout: SimDuration,
        flush_periodic: bool,
    ) -> Result<(), SimError> {
        if timeout.is_negative() {
            return Err(SimError::invalid_argument("timeout must be non-negative"));
        }
        if self.inner.borrow().elapsing_to.is_some() {
            return Err(SimError::Reentrancy);
        }

        let absolute_timeout = self.inner.borrow().elapsed + timeout;

        self.run_event_wheel(|delta_time| {
            if delta_time > absolute_timeout {
                log::warn!("[{}] flush_timers exceeded timeout of {timeout}", self.name);
                return Err(SimError::Timeout { budget: timeout });
            }
            if flush_periodic {
                return Ok(true);
            }
            let state = self.inner.borrow();
            let elapsed = state.elapsed;
            let has_due = state
                .pending
                .iter()
                .any(|t| !t.is_periodic() || t.next_call() <= elapsed);
            Ok(has_due)
        })
    }

    /// Drives the event wheel while `predicate(delta_time)` holds,
    /// firing one delta batch per accepted round and draining
    /// microtasks between rounds, exactly the loop described for the
    /// core event wheel.
    fn run_event_wheel(
        &self,
        mut predicate: impl FnMut(SimDuration) -> Result<bool, SimError>,
    ) -> Result<(), SimError> {
        self.flush_micro_tasks();
        loop {
            let delta_time = match self.inner.borrow().pending.first_key() {
                Some(key) => key,
                None => break,
            };
            if !predicate(delta_time)? {
                break;
            }
            self.fire_delta_batch();
        }
        Ok(())
    }

    ///
    /// Detaches every timer created in `zone` from the event wheel,
    /// without cancelling them: they keep their `next_call` and can be
    /// reattached with [`resume`](Self::resume).
    ///
    /// Scans both the pending queue and the in-progress delta batch (if
    /// `suspend` is called from within a timer callback), so a zone
    /// timer cannot slip through by already being in the current batch.
    ///
    pub fn suspend(&self, zone: Zone) {
        let mut state = self.inner.borrow_mut();
        let mut removed = state.pending.remove_where(|t| t.zone() == zone);
        let (from_delta, kept): (VecDeque<SimTimer>, VecDeque<SimTimer>) =
            state.current_delta.drain(..).partition(|t| t.zone() == zone);
        state.current_delta = kept;
        removed.extend(from_delta);
        if !removed.is_empty() {
            log::trace!("[{}] suspended {} timer(s) in zone {:?}", self.name, removed.len(), zone);
        }
        state.suspended.entry(zone).or_default().extend(removed);
    }

    ///
    /// Reattaches every timer previously detached from `zone` by
    /// [`suspend`](Self::suspend).
    ///
    /// Fails with [`SimError::TimerNotInFuture`] if any detached
    /// timer's `next_call` no longer lies in the future, leaving the
    /// zone's suspended set untouched so the call can be retried after
    /// the caller adjusts that timer.
    ///
    pub fn resume(&self, zone: Zone) -> Result<(), SimError> {
        let mut state = self.inner.borrow_mut();
        let Some(timers) = state.suspended.remove(&zone) else {
            return Ok(());
        };

        let elapsed = state.elapsed;
        for timer in &timers {
            if timer.next_call() < elapsed {
                let next_call = timer.next_call();
                state.suspended.insert(zone, timers);
                return Err(SimError::TimerNotInFuture { elapsed, next_call });
            }
        }

        log::trace!("[{}] resumed {} timer(s) in zone {:?}", self.name, timers.len(), zone);
        for timer in timers {
            state.pending.add(timer);
        }
        Ok(())
    }
}

impl Debug for Simulator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let state = self.inner.borrow();
        f.debug_struct("Simulator")
            .field("name", &self.name)
            .field("elapsed", &state.elapsed)
            .field("elapsing_to", &state.elapsing_to)
            .field("pending_timers", &state.pending.len())
            .field("pending_micro_tasks", &state.micro_tasks.len())
            .finish()
    }
}
