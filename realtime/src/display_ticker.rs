use std::{
    sync::{
        atomic::{AtomicBool, AtomicUsize, Ordering},
        Arc,
    },
    thread::{self, JoinHandle},
    time::{Duration, Instant},
};

use tracing::{debug, warn};

use sampler_core::display::{DisplayFrame, WaveformView};

const FALLBACK_REFRESH_HZ: f64 = 30.0;

/// Pulls a fresh `DisplayFrame` at a fixed rate on its own thread and hands
/// it to a callback. Stops when dropped.
pub struct DisplayTicker {
    running: Arc<AtomicBool>,
    width: Arc<AtomicUsize>,
    thread: Option<JoinHandle<()>>,
}

impl DisplayTicker {
    pub fn spawn<F>(mut view: WaveformView, refresh_hz: f64, width: usize, mut on_frame: F) -> Self
    where
        F: FnMut(DisplayFrame) + Send + 'static,
    {
        let refresh_hz = if refresh_hz.is_finite() && refresh_hz > 0.0 {
            refresh_hz
        } else {
            warn!(
                refresh_hz,
                fallback = FALLBACK_REFRESH_HZ,
                "Invalid display refresh rate"
            );
            FALLBACK_REFRESH_HZ
        };
        let interval = Duration::from_secs_f64(1.0 / refresh_hz);

        let running = Arc::new(AtomicBool::new(true));
        let width = Arc::new(AtomicUsize::new(width));

        let thread = {
            let running = running.clone();
            let width = width.clone();
            thread::spawn(move || {
                debug!(refresh_hz, "Display ticker started");

                let mut next = Instant::now();
                while running.load(Ordering::Acquire) {
                    on_frame(view.frame(width.load(Ordering::Relaxed)));

                    // Skip ticks instead of bursting when the callback is slow
                    next += interval;
                    let now = Instant::now();
                    if next > now {
                        spin_sleep::sleep(next - now);
                    } else {
                        next = now;
                    }
                }

                debug!("Display ticker stopped");
            })
        };

        DisplayTicker {
            running,
            width,
            thread: Some(thread),
        }
    }

    /// Changes the width of the frames produced from the next tick on.
    pub fn set_width(&self, width: usize) {
        self.width.store(width, Ordering::Relaxed);
    }

    pub fn width(&self) -> usize {
        self.width.load(Ordering::Relaxed)
    }
}

impl Drop for DisplayTicker {
    fn drop(&mut self) {
        self.running.store(false, Ordering::Release);
        if let Some(thread) = self.thread.take() {
            if thread.join().is_err() {
                warn!("Display ticker callback panicked");
            }
        }
    }
}
