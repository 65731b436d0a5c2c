use std::sync::{
    atomic::{AtomicU64, Ordering},
    Arc,
};

/// Writer half of the playback position.
///
/// Owned by the render context and deliberately not `Clone`: there is exactly
/// one writer. Each publish is a single atomic store, so it never blocks and
/// readers can never see half of a value.
#[derive(Debug)]
pub struct PlaybackClock {
    position: Arc<AtomicU64>,
}

/// Reader half of the playback position. Cheap to clone, usable from any thread.
#[derive(Debug, Clone)]
pub struct PlaybackClockReader {
    position: Arc<AtomicU64>,
}

impl PlaybackClock {
    pub fn new() -> Self {
        PlaybackClock {
            position: Arc::new(AtomicU64::new(0)),
        }
    }

    #[inline(always)]
    pub fn publish(&mut self, position: u64) {
        self.position.store(position, Ordering::Release);
    }

    pub fn reader(&self) -> PlaybackClockReader {
        PlaybackClockReader {
            position: self.position.clone(),
        }
    }
}

impl Default for PlaybackClock {
    fn default() -> Self {
        Self::new()
    }
}

impl PlaybackClockReader {
    /// The most recently published position, or 0 before the first publish.
    pub fn read(&self) -> u64 {
        self.position.load(Ordering::Acquire)
    }
}

#[cfg(test)]
mod tests {
    use std::{
        sync::atomic::AtomicBool,
        thread,
    };

    use super::*;

    #[test]
    fn test_reads_zero_before_publish() {
        let clock = PlaybackClock::new();
        assert_eq!(clock.reader().read(), 0);
    }

    #[test]
    fn test_latest_value_wins() {
        let mut clock = PlaybackClock::new();
        let reader = clock.reader();
        clock.publish(10);
        clock.publish(512);
        assert_eq!(reader.read(), 512);
        assert_eq!(reader.clone().read(), 512);
    }

    #[test]
    fn test_concurrent_reads_are_never_torn() {
        // Every published value has equal upper and lower halves, so a torn
        // read would show up as a mismatch.
        fn encode(step: u64) -> u64 {
            (step << 32) | step
        }

        let mut clock = PlaybackClock::new();
        let done = Arc::new(AtomicBool::new(false));

        let readers = (0..8)
            .map(|_| {
                let reader = clock.reader();
                let done = done.clone();
                thread::spawn(move || {
                    let mut last = 0u64;
                    let mut observed = 0usize;
                    loop {
                        let finished = done.load(Ordering::Acquire);
                        let value = reader.read();
                        assert_eq!(value >> 32, value & 0xFFFF_FFFF, "torn read {value:#x}");
                        // Positions only go backwards when a session resets to 0
                        assert!(value >= last || value == 0, "{value} after {last}");
                        last = value;
                        observed += 1;
                        if finished {
                            break observed;
                        }
                    }
                })
            })
            .collect::<Vec<_>>();

        // Sessions use increasing ranges so a reader that misses a reset
        // still sees increasing values
        for session in 0..50u64 {
            for step in 1..=2000u64 {
                clock.publish(encode(session * 10_000 + step));
            }
            clock.publish(0);
        }
        done.store(true, Ordering::Release);

        for reader in readers {
            assert!(reader.join().unwrap() > 0);
        }
    }
}
