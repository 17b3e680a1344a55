//! Double-buffered counters and the rate math built on them.
//!
//! Each cumulative counter keeps two observations. The record's `Slot` says
//! which one is written this cycle; the other one holds the previous
//! observation and is the baseline for the delta. The slot flips once per
//! touched cycle, so no history beyond one step is ever stored.

use std::time::Instant;

/// CPU fractions below this are reported as exactly zero.
pub const CPU_EPSILON: f64 = 0.0001;

/// Index of the slot written during the current cycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Slot(u8);

impl Slot {
    pub fn index(self) -> usize {
        self.0 as usize
    }

    pub fn other(self) -> usize {
        (self.0 ^ 1) as usize
    }

    pub fn flip(&mut self) {
        self.0 ^= 1;
    }
}

/// Two observations of one cumulative counter.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct DoubleBuffer {
    values: [u64; 2],
}

impl DoubleBuffer {
    pub fn store(&mut self, slot: Slot, value: u64) {
        self.values[slot.index()] = value;
    }

    pub fn current(&self, slot: Slot) -> u64 {
        self.values[slot.index()]
    }

    pub fn previous(&self, slot: Slot) -> u64 {
        self.values[slot.other()]
    }

    /// Repeats the previous observation in `slot` when no new value exists.
    pub fn carry(&mut self, slot: Slot) {
        self.values[slot.index()] = self.values[slot.other()];
    }

    /// Growth since the previous observation. A counter that went backwards
    /// (pid reuse, reset) yields zero.
    pub fn delta(&self, slot: Slot) -> u64 {
        self.current(slot).saturating_sub(self.previous(slot))
    }

    pub fn rate(&self, slot: Slot, elapsed: Option<f64>) -> f64 {
        per_second(self.delta(slot), elapsed)
    }
}

pub fn per_second(delta: u64, elapsed: Option<f64>) -> f64 {
    match elapsed {
        Some(secs) if secs > 0.0 => delta as f64 / secs,
        _ => 0.0,
    }
}

/// Scheduler ticks consumed over the interval as a fraction of one CPU.
pub fn cpu_fraction(ticks: u64, elapsed: Option<f64>, ticks_per_second: u64) -> f64 {
    let Some(secs) = elapsed else { return 0.0 };
    let tick_span = secs * ticks_per_second as f64;
    if tick_span <= 0.0 {
        return 0.0;
    }
    let fraction = ticks as f64 / tick_span;
    if fraction < CPU_EPSILON {
        0.0
    } else {
        fraction
    }
}

/// Wall-clock interval between cycles.
#[derive(Debug, Clone)]
pub struct CycleClock {
    last: Option<Instant>,
    min_interval: f64,
}

impl CycleClock {
    pub fn new(min_interval: f64) -> Self {
        Self {
            last: None,
            min_interval,
        }
    }

    /// Seconds since the previous tick, floored at the minimum interval.
    /// `None` on the first tick: there is nothing to measure against yet.
    pub fn tick(&mut self, now: Instant) -> Option<f64> {
        let elapsed = self.last.map(|prev| {
            now.saturating_duration_since(prev)
                .as_secs_f64()
                .max(self.min_interval)
        });
        self.last = Some(now);
        elapsed
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    #[test]
    fn rate_uses_other_slot_as_baseline() {
        let mut slot = Slot::default();
        let mut read = DoubleBuffer::default();
        read.store(slot, 1000);
        slot.flip();
        read.store(slot, 1500);
        assert_eq!(read.rate(slot, Some(1.0)), 500.0);

        // and again with slot 0 being the newer one
        slot.flip();
        read.store(slot, 2100);
        assert_eq!(read.rate(slot, Some(2.0)), 300.0);
    }

    #[test]
    fn first_observation_is_measured_from_zero() {
        let slot = Slot::default();
        let mut c = DoubleBuffer::default();
        c.store(slot, 4096);
        assert_eq!(c.rate(slot, Some(2.0)), 2048.0);
    }

    #[test]
    fn regression_gives_zero_rate() {
        let mut slot = Slot::default();
        let mut c = DoubleBuffer::default();
        c.store(slot, 900);
        slot.flip();
        c.store(slot, 100);
        assert_eq!(c.delta(slot), 0);
    }

    #[test]
    fn carried_value_has_no_growth() {
        let mut slot = Slot::default();
        let mut c = DoubleBuffer::default();
        c.store(slot, 700);
        slot.flip();
        c.carry(slot);
        assert_eq!(c.current(slot), 700);
        assert_eq!(c.delta(slot), 0);
    }

    #[test]
    fn tiny_cpu_fraction_snaps_to_zero() {
        // 1 tick over 200s at 100Hz = 0.00005
        assert_eq!(cpu_fraction(1, Some(200.0), 100), 0.0);
        assert_eq!(cpu_fraction(10, None, 100), 0.0);
        assert!((cpu_fraction(50, Some(1.0), 100) - 0.5).abs() < 1e-12);
    }

    #[test]
    fn clock_floors_interval_and_skips_first_tick() {
        let mut clock = CycleClock::new(0.01);
        let t0 = Instant::now();
        assert_eq!(clock.tick(t0), None);
        assert_eq!(clock.tick(t0), Some(0.01));
        let t1 = t0 + Duration::from_millis(1500);
        let e = clock.tick(t1).unwrap();
        assert!((e - 1.5).abs() < 1e-9);
    }
}
