//! Idle detection on the dashboard.
//!
//! The monitor owns the `Idle` timer slot. Activity re-arms it; it stays disabled while
//! the screensaver is up. Activity sources are registered with the host once for the
//! lifetime of the process, no matter how often the timer is re-armed.

use std::time::Duration;

use log::{debug, info, trace};

use crate::model::{ActivitySignal, ActivitySource};
use crate::surface::Surface;
use crate::timers::{TimerSet, TimerSlot, TimerTick};

#[derive(Debug)]
pub struct IdleMonitor {
    timeout: Duration,
    enabled: bool,
    listeners_registered: bool,
    registrations: usize,
}

impl IdleMonitor {
    pub fn new(timeout: Duration) -> Self {
        Self { timeout, enabled: true, listeners_registered: false, registrations: 0 }
    }

    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    pub fn set_timeout(&mut self, timeout: Duration) {
        self.timeout = timeout;
    }

    pub fn is_enabled(&self) -> bool {
        self.enabled
    }

    /// How many times activity sources were registered with the host.
    pub fn registrations(&self) -> usize {
        self.registrations
    }

    /// Schedules the single-shot idle timeout, replacing any pending one.
    pub fn arm<E, S>(&mut self, timers: &mut TimerSet<E>, surface: &mut S)
    where
        E: From<TimerTick> + Send + 'static,
        S: Surface + ?Sized,
    {
        if !self.enabled {
            trace!("Idle monitor disabled, not arming.");
            return;
        }
        self.register_listeners(surface);
        timers.reschedule_once(TimerSlot::Idle, self.timeout);
    }

    /// Restarts the countdown on activity. Returns whether the timer was re-armed.
    pub fn on_activity<E, S>(&mut self, signal: ActivitySignal, timers: &mut TimerSet<E>, surface: &mut S) -> bool
    where
        E: From<TimerTick> + Send + 'static,
        S: Surface + ?Sized,
    {
        if !self.enabled {
            return false;
        }
        trace!("Activity from {:?}, re-arming idle timer.", signal.source);
        self.arm(timers, surface);
        true
    }

    /// Stops the countdown while the screensaver is showing.
    pub fn disable<E>(&mut self, timers: &mut TimerSet<E>)
    where
        E: From<TimerTick> + Send + 'static,
    {
        if self.enabled {
            debug!("Idle monitor disabled.");
        }
        self.enabled = false;
        timers.cancel(TimerSlot::Idle);
    }

    pub fn enable(&mut self) {
        if !self.enabled {
            debug!("Idle monitor enabled.");
        }
        self.enabled = true;
    }

    fn register_listeners<S: Surface + ?Sized>(&mut self, surface: &mut S) {
        if self.listeners_registered {
            return;
        }
        info!("Registering activity sources: {:?}", ActivitySource::ALL);
        surface.register_activity_sources(&ActivitySource::ALL);
        self.listeners_registered = true;
        self.registrations += 1;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::surface::SharedDisplay;
    use tokio::sync::mpsc;
    use tokio::time;

    async fn settle() {
        for _ in 0..10 {
            tokio::task::yield_now().await;
        }
    }

    #[tokio::test(start_paused = true)]
    async fn activity_restarts_the_countdown() {
        let (tx, mut rx) = mpsc::unbounded_channel::<TimerTick>();
        let mut timers = TimerSet::new(tx);
        let mut display = SharedDisplay::new();
        let mut idle = IdleMonitor::new(Duration::from_secs(60));

        idle.arm(&mut timers, &mut display);
        time::advance(Duration::from_secs(50)).await;
        assert!(idle.on_activity(ActivitySignal::new(ActivitySource::PointerMove), &mut timers, &mut display));
        time::advance(Duration::from_secs(50)).await;
        settle().await;
        assert!(rx.try_recv().is_err());

        time::advance(Duration::from_secs(10)).await;
        settle().await;
        let tick = rx.try_recv().unwrap();
        assert_eq!(tick.slot, TimerSlot::Idle);
        assert!(timers.is_current(&tick));
    }

    #[tokio::test(start_paused = true)]
    async fn listeners_register_once_across_rearms() {
        let (tx, _rx) = mpsc::unbounded_channel::<TimerTick>();
        let mut timers = TimerSet::new(tx);
        let mut display = SharedDisplay::new();
        let mut idle = IdleMonitor::new(Duration::from_secs(5));

        for _ in 0..25 {
            idle.on_activity(ActivitySignal::new(ActivitySource::KeyPress), &mut timers, &mut display);
        }
        assert_eq!(idle.registrations(), 1);
        assert_eq!(display.snapshot().activity_sources.len(), ActivitySource::ALL.len());
        assert_eq!(timers.live_count(TimerSlot::Idle), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn disabled_monitor_ignores_activity() {
        let (tx, _rx) = mpsc::unbounded_channel::<TimerTick>();
        let mut timers = TimerSet::new(tx);
        let mut display = SharedDisplay::new();
        let mut idle = IdleMonitor::new(Duration::from_secs(5));

        idle.arm(&mut timers, &mut display);
        idle.disable(&mut timers);
        assert!(!timers.is_armed(TimerSlot::Idle));
        assert!(!idle.on_activity(ActivitySignal::new(ActivitySource::Click), &mut timers, &mut display));
        assert!(!timers.is_armed(TimerSlot::Idle));

        idle.enable();
        idle.arm(&mut timers, &mut display);
        assert!(timers.is_armed(TimerSlot::Idle));
    }
}
