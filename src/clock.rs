//! Monotonic microsecond clock, injected rather than read from a hardware counter so the
//! engine stays portable and its timing is mockable in tests.

use std::time::Instant;

/// A source of monotonic microsecond timestamps. The engine only ever measures elapsed
/// durations with it; it never treats the returned value as wall-clock time.
pub trait Clock {
    fn now_micros(&self) -> u64;
}

/// Default [`Clock`] backed by [`std::time::Instant`].
#[derive(Default)]
pub struct MonotonicClock {
    epoch: Option<Instant>,
}

impl MonotonicClock {
    pub fn new() -> Self {
        MonotonicClock { epoch: Some(Instant::now()) }
    }
}

impl Clock for MonotonicClock {
    fn now_micros(&self) -> u64 {
        let epoch = self.epoch.expect("MonotonicClock::new must be used to construct this clock");
        epoch.elapsed().as_micros() as u64
    }
}

/// A clock that advances only when told to, for deterministic tests of timing-dependent
/// metrics without sleeping.
#[cfg(test)]
pub struct FakeClock {
    micros: std::cell::Cell<u64>,
}

#[cfg(test)]
impl FakeClock {
    pub fn new() -> Self {
        FakeClock { micros: std::cell::Cell::new(0) }
    }

    pub fn advance(&self, micros: u64) {
        self.micros.set(self.micros.get() + micros);
    }
}

#[cfg(test)]
impl Clock for FakeClock {
    fn now_micros(&self) -> u64 {
        self.micros.get()
    }
}
