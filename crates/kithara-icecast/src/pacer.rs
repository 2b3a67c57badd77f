//! Real-time pacing by nominal bitrate.

use std::time::{Duration, Instant};

/// Tracks bytes pushed since connect and how far ahead of the wall clock
/// they are.
///
/// The first recorded payload starts the clock. A payload of `n` bytes at
/// `bitrate_kbps` accounts for `n * 8 / (bitrate_kbps * 1000)` seconds of
/// audio.
#[derive(Debug, Clone)]
pub struct Pacer {
    bits_per_sec: u64,
    started: Option<Instant>,
    bytes_sent: u64,
}

impl Pacer {
    /// Create a pacer. A zero bitrate disables pacing.
    #[must_use]
    pub fn new(bitrate_kbps: u32) -> Self {
        Self {
            bits_per_sec: u64::from(bitrate_kbps) * 1000,
            started: None,
            bytes_sent: 0,
        }
    }

    /// Account for `len` bytes sent at `now`.
    pub fn record(&mut self, len: usize, now: Instant) {
        self.started.get_or_insert(now);
        self.bytes_sent = self.bytes_sent.saturating_add(len as u64);
    }

    /// Audio duration covered by everything sent so far.
    pub fn sent_duration(&self) -> Duration {
        if self.bits_per_sec == 0 {
            return Duration::ZERO;
        }
        let bits = u128::from(self.bytes_sent) * 8;
        let nanos = bits * 1_000_000_000 / u128::from(self.bits_per_sec);
        Duration::from_nanos(u64::try_from(nanos).unwrap_or(u64::MAX))
    }

    /// Time left until the next payload is due, measured at `now`.
    pub fn delay(&self, now: Instant) -> Duration {
        let Some(started) = self.started else {
            return Duration::ZERO;
        };
        self.sent_duration()
            .saturating_sub(now.saturating_duration_since(started))
    }

    /// Forget all history (called on close).
    pub fn reset(&mut self) {
        self.started = None;
        self.bytes_sent = 0;
    }
}

#[cfg(test)]
mod tests {
    use rstest::rstest;

    use super::*;

    #[test]
    fn no_delay_before_first_payload() {
        let pacer = Pacer::new(128);
        assert_eq!(pacer.delay(Instant::now()), Duration::ZERO);
    }

    #[rstest]
    #[case(128, 16_000, Duration::from_secs(1))]
    #[case(128, 8_000, Duration::from_millis(500))]
    #[case(320, 40_000, Duration::from_secs(1))]
    #[case(64, 0, Duration::ZERO)]
    fn sent_duration_follows_bitrate(
        #[case] kbps: u32,
        #[case] bytes: usize,
        #[case] expected: Duration,
    ) {
        let mut pacer = Pacer::new(kbps);
        pacer.record(bytes, Instant::now());
        assert_eq!(pacer.sent_duration(), expected);
    }

    #[test]
    fn delay_shrinks_as_wall_clock_advances() {
        let start = Instant::now();
        let mut pacer = Pacer::new(128);
        pacer.record(16_000, start);

        assert_eq!(pacer.delay(start), Duration::from_secs(1));
        assert_eq!(
            pacer.delay(start + Duration::from_millis(400)),
            Duration::from_millis(600)
        );
        assert_eq!(pacer.delay(start + Duration::from_secs(3)), Duration::ZERO);
    }

    #[test]
    fn zero_bitrate_never_waits() {
        let start = Instant::now();
        let mut pacer = Pacer::new(0);
        pacer.record(1_000_000, start);
        assert_eq!(pacer.delay(start), Duration::ZERO);
    }

    #[test]
    fn reset_restarts_clock() {
        let start = Instant::now();
        let mut pacer = Pacer::new(128);
        pacer.record(16_000, start);
        pacer.reset();
        assert_eq!(pacer.delay(start), Duration::ZERO);
        assert_eq!(pacer.sent_duration(), Duration::ZERO);
    }
}
