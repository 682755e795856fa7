//! Delay capability used to time bus strobes.
//!
//! Parallel LCD controllers need pulses in the tens of nanoseconds, far below what
//! [std::thread::sleep] can guarantee, so [SpinDelay] busy-spins instead. [SleepDelay] is fine for
//! long holds like the reset pulse, or when the pin backend is slow enough that the pulse width is
//! dominated by the write itself (as with the character device GPIO backend).
use std::fmt::Debug;
use std::hint::spin_loop;
use std::thread::sleep;
use std::time::{Duration, Instant};

pub trait Delay: Debug {
    /// Blocks for at least `ns` nanoseconds.
    fn delay_ns(&self, ns: u32);

    fn delay_us(&self, us: u32) {
        self.delay_ns(us.saturating_mul(1_000));
    }

    fn delay_ms(&self, ms: u32) {
        for _ in 0..ms {
            self.delay_us(1_000);
        }
    }

    fn delay(&self, duration: Duration) {
        let ns = duration.as_nanos();
        if ns <= u32::MAX as u128 {
            self.delay_ns(ns as u32);
        } else {
            self.delay_ms(duration.as_millis().min(u32::MAX as u128) as u32);
        }
    }
}

/// Busy-spins until the requested time has elapsed.
#[derive(Copy, Clone, Debug, Default)]
pub struct SpinDelay;

impl Delay for SpinDelay {
    fn delay_ns(&self, ns: u32) {
        let start = Instant::now();
        let duration = Duration::from_nanos(ns as u64);
        while start.elapsed() < duration {
            spin_loop();
        }
    }
}

/// Yields to the OS scheduler. Only suitable for delays in the microsecond range and above.
#[derive(Copy, Clone, Debug, Default)]
pub struct SleepDelay;

impl Delay for SleepDelay {
    fn delay_ns(&self, ns: u32) {
        sleep(Duration::from_nanos(ns as u64));
    }
}

/// Returns immediately. Used with the simulated panel, where timing has no meaning.
#[derive(Copy, Clone, Debug, Default)]
pub struct NoDelay;

impl Delay for NoDelay {
    fn delay_ns(&self, _ns: u32) {}
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn spin_delay_waits_at_least_requested_time() {
        let start = Instant::now();
        SpinDelay.delay_us(200);
        assert!(start.elapsed() >= Duration::from_micros(200));
    }

    #[test]
    fn sleep_delay_waits_at_least_requested_time() {
        let start = Instant::now();
        SleepDelay.delay(Duration::from_millis(3));
        assert!(start.elapsed() >= Duration::from_millis(3));
    }
}
