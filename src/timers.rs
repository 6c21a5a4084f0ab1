//! One cancellable handle per logical timer.
//!
//! Each slot holds at most one spawned tokio task. Rescheduling a slot aborts the
//! previous task before spawning the next, and every tick carries the generation of the
//! task that produced it so ticks already queued by an aborted task can be discarded.

use std::collections::HashMap;
use std::time::Duration;

use log::{debug, trace};
use tokio::sync::mpsc::UnboundedSender;
use tokio::task::JoinHandle;
use tokio::time::{self, Instant, MissedTickBehavior};

/// The logical timers owned by the presentation controller.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum TimerSlot {
    Idle,
    SlideRotation,
    ClockTick,
    WeatherPoll,
    MediaPoll,
}

impl TimerSlot {
    pub const ALL: [TimerSlot; 5] = [
        TimerSlot::Idle,
        TimerSlot::SlideRotation,
        TimerSlot::ClockTick,
        TimerSlot::WeatherPoll,
        TimerSlot::MediaPoll,
    ];

    /// Slots that only run while the screensaver is up.
    pub const SCREENSAVER: [TimerSlot; 4] = [
        TimerSlot::SlideRotation,
        TimerSlot::ClockTick,
        TimerSlot::WeatherPoll,
        TimerSlot::MediaPoll,
    ];
}

/// A timer firing, as delivered to the owner's event channel.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct TimerTick {
    pub slot: TimerSlot,
    pub generation: u64,
}

struct TimerHandle {
    generation: u64,
    task: JoinHandle<()>,
}

/// Holds the live handle for each `TimerSlot` and delivers ticks as `E` events.
pub struct TimerSet<E> {
    handles: HashMap<TimerSlot, TimerHandle>,
    next_generation: u64,
    events: UnboundedSender<E>,
}

impl<E> TimerSet<E>
where
    E: From<TimerTick> + Send + 'static,
{
    pub fn new(events: UnboundedSender<E>) -> Self {
        Self { handles: HashMap::new(), next_generation: 0, events }
    }

    /// Cancels any existing handle for `slot`, then fires once after `delay`.
    pub fn reschedule_once(&mut self, slot: TimerSlot, delay: Duration) {
        let generation = self.begin(slot);
        let events = self.events.clone();
        debug!("Scheduling {:?} once in {:?} (generation {})", slot, delay, generation);
        let deadline = Instant::now() + delay;
        let task = tokio::spawn(async move {
            time::sleep_until(deadline).await;
            let _ = events.send(E::from(TimerTick { slot, generation }));
        });
        self.handles.insert(slot, TimerHandle { generation, task });
    }

    /// Cancels any existing handle for `slot`, then fires every `period`.
    ///
    /// With `immediate` the first tick fires right away, otherwise after one period.
    pub fn reschedule_every(&mut self, slot: TimerSlot, period: Duration, immediate: bool) {
        let generation = self.begin(slot);
        let events = self.events.clone();
        debug!("Scheduling {:?} every {:?} (generation {}, immediate: {})", slot, period, generation, immediate);
        let start = if immediate { Instant::now() } else { Instant::now() + period };
        let task = tokio::spawn(async move {
            let mut ticker = time::interval_at(start, period);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
            loop {
                ticker.tick().await;
                if events.send(E::from(TimerTick { slot, generation })).is_err() {
                    trace!("Receiver for {:?} dropped, stopping timer.", slot);
                    break;
                }
            }
        });
        self.handles.insert(slot, TimerHandle { generation, task });
    }

    /// Cancels the handle for `slot`. Returns whether one was live.
    pub fn cancel(&mut self, slot: TimerSlot) -> bool {
        match self.handles.remove(&slot) {
            Some(handle) => {
                handle.task.abort();
                debug!("Cancelled {:?} (generation {})", slot, handle.generation);
                true
            }
            None => false,
        }
    }

    pub fn cancel_all(&mut self, slots: &[TimerSlot]) {
        for slot in slots {
            self.cancel(*slot);
        }
    }

    /// Whether `tick` came from the handle currently registered for its slot.
    pub fn is_current(&self, tick: &TimerTick) -> bool {
        self.handles.get(&tick.slot).is_some_and(|handle| handle.generation == tick.generation)
    }

    /// Marks a one-shot slot as spent once its tick has been accepted.
    pub fn complete(&mut self, tick: &TimerTick) {
        if self.is_current(tick) {
            self.handles.remove(&tick.slot);
        }
    }

    /// Number of live handles held for `slot`: zero or one.
    pub fn live_count(&self, slot: TimerSlot) -> usize {
        self.handles.get(&slot).map_or(0, |handle| usize::from(!handle.task.is_finished()))
    }

    pub fn is_armed(&self, slot: TimerSlot) -> bool {
        self.live_count(slot) > 0
    }

    /// Slots that currently hold a live handle.
    pub fn armed_slots(&self) -> Vec<TimerSlot> {
        TimerSlot::ALL.into_iter().filter(|slot| self.is_armed(*slot)).collect()
    }

    fn begin(&mut self, slot: TimerSlot) -> u64 {
        self.cancel(slot);
        self.next_generation += 1;
        self.next_generation
    }
}

impl<E> Drop for TimerSet<E> {
    fn drop(&mut self) {
        for (_, handle) in self.handles.drain() {
            handle.task.abort();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio::sync::mpsc;

    async fn settle() {
        for _ in 0..10 {
            tokio::task::yield_now().await;
        }
    }

    #[tokio::test(start_paused = true)]
    async fn rescheduling_replaces_the_previous_handle() {
        let (tx, mut rx) = mpsc::unbounded_channel::<TimerTick>();
        let mut timers = TimerSet::new(tx);

        timers.reschedule_once(TimerSlot::Idle, Duration::from_secs(10));
        settle().await;
        time::advance(Duration::from_secs(6)).await;
        timers.reschedule_once(TimerSlot::Idle, Duration::from_secs(10));
        assert_eq!(timers.live_count(TimerSlot::Idle), 1);

        time::advance(Duration::from_secs(6)).await;
        settle().await;
        assert!(rx.try_recv().is_err(), "the first handle must not fire after being replaced");

        time::advance(Duration::from_secs(5)).await;
        settle().await;
        let tick = rx.try_recv().unwrap();
        assert!(timers.is_current(&tick));
        assert!(rx.try_recv().is_err());
    }

    #[tokio::test(start_paused = true)]
    async fn stale_ticks_are_not_current() {
        let (tx, mut rx) = mpsc::unbounded_channel::<TimerTick>();
        let mut timers = TimerSet::new(tx);

        timers.reschedule_every(TimerSlot::ClockTick, Duration::from_secs(1), true);
        settle().await;
        let first = rx.try_recv().unwrap();
        timers.reschedule_every(TimerSlot::ClockTick, Duration::from_secs(1), false);
        assert!(!timers.is_current(&first));
    }

    #[tokio::test(start_paused = true)]
    async fn periodic_timer_fires_each_period_until_cancelled() {
        let (tx, mut rx) = mpsc::unbounded_channel::<TimerTick>();
        let mut timers = TimerSet::new(tx);

        timers.reschedule_every(TimerSlot::SlideRotation, Duration::from_secs(5), false);
        settle().await;
        assert!(rx.try_recv().is_err());
        for _ in 0..3 {
            time::advance(Duration::from_secs(5)).await;
            settle().await;
            assert_eq!(rx.try_recv().unwrap().slot, TimerSlot::SlideRotation);
        }

        assert!(timers.cancel(TimerSlot::SlideRotation));
        assert!(!timers.cancel(TimerSlot::SlideRotation));
        time::advance(Duration::from_secs(20)).await;
        settle().await;
        assert!(rx.try_recv().is_err());
        assert!(timers.armed_slots().is_empty());
    }
}
