//! Continuous capture with periodic background inspection
//!
//! A capture thread reads frames from a [`FrameSource`], keeps the most
//! recent ones in a [`FrameStabilizer`] and every few frames hands an owned
//! copy of that buffer to a short-lived analysis thread. At most one analysis
//! runs at a time; a trigger that finds it busy is dropped. Everything the
//! threads produce reaches the consumer as [`CaptureEvent`]s tagged with the
//! frame generation they belong to.

mod source;

pub use source::{DirectorySource, FrameSource, ImageFileSource};

use crate::config::SharedConfig;
use crate::error::{InspectError, Result};
use crate::pipeline::{Inspection, inspect_with_views};
use crate::stabilizer::{DEFAULT_CAPACITY, FrameStabilizer, stabilize};
use image::{DynamicImage, RgbImage};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::mpsc::{Receiver, SyncSender, TrySendError, sync_channel};
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};
use tracing::{debug, error, info, warn};

/// Lifecycle of a [`CaptureController`]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CaptureState {
    /// No capture thread
    Stopped,
    /// Frames are being read and analyzed
    Running,
    /// Stop requested, thread not yet joined
    Stopping,
}

/// Tuning of the capture loop
#[derive(Debug, Clone)]
pub struct CaptureOptions {
    /// Frames kept for stabilization
    pub buffer_len: usize,
    /// Trigger an analysis every this many frames
    pub analyze_every: u64,
    /// Pause after each loop iteration
    pub idle: Duration,
    /// Longest wait for the capture thread on [`CaptureController::stop`]
    pub join_timeout: Duration,
    /// Undelivered events before new ones are dropped
    pub channel_capacity: usize,
}

impl Default for CaptureOptions {
    fn default() -> Self {
        Self {
            buffer_len: DEFAULT_CAPACITY,
            analyze_every: 10,
            idle: Duration::from_millis(30),
            join_timeout: Duration::from_secs(2),
            channel_capacity: 16,
        }
    }
}

/// Messages from the capture and analysis threads
#[derive(Debug)]
pub enum CaptureEvent {
    /// Newest raw frame, for live display
    Preview {
        /// Frame counter at capture time
        generation: u64,
        /// The frame as read
        frame: RgbImage,
    },
    /// Inspection of the stabilized buffer ending at `generation`
    Analyzed {
        /// Newest frame that went into the stabilized image
        generation: u64,
        /// Verdict and views
        inspection: Inspection,
    },
    /// A frame could not be read; capture keeps going
    SourceError {
        /// Frame counter when the read failed
        generation: u64,
        /// What the source reported
        error: InspectError,
    },
}

impl CaptureEvent {
    /// Frame counter the event belongs to
    pub fn generation(&self) -> u64 {
        match self {
            CaptureEvent::Preview { generation, .. }
            | CaptureEvent::Analyzed { generation, .. }
            | CaptureEvent::SourceError { generation, .. } => *generation,
        }
    }
}

/// Single-slot "most recent wins" holder on the consumer side
#[derive(Debug, Clone)]
pub struct LatestResult<T> {
    generation: Option<u64>,
    value: Option<T>,
}

impl<T> LatestResult<T> {
    /// Empty slot
    pub fn new() -> Self {
        Self {
            generation: None,
            value: None,
        }
    }

    /// Store `value` only if it is newer than what is held; returns whether it was applied
    pub fn offer(&mut self, generation: u64, value: T) -> bool {
        if self.generation.is_some_and(|current| generation <= current) {
            debug!(generation, current = ?self.generation, "stale update dropped");
            return false;
        }
        self.generation = Some(generation);
        self.value = Some(value);
        true
    }

    /// Most recent accepted value
    pub fn get(&self) -> Option<&T> {
        self.value.as_ref()
    }

    /// Generation of the value held
    pub fn generation(&self) -> Option<u64> {
        self.generation
    }
}

impl<T> Default for LatestResult<T> {
    fn default() -> Self {
        Self::new()
    }
}

/// Pass/fail output device (LEDs, buzzer)
pub trait VerdictIndicator: Send {
    /// Display a pass or fail verdict
    fn show(&mut self, is_ok: bool);

    /// Back to the idle, "no verdict" state
    fn clear(&mut self) {}
}

/// Indicator that only logs
#[derive(Debug, Default)]
pub struct LogIndicator {
    last: Option<bool>,
}

impl LogIndicator {
    /// Verdict currently shown, `None` when idle
    pub fn last(&self) -> Option<bool> {
        self.last
    }
}

impl VerdictIndicator for LogIndicator {
    fn show(&mut self, is_ok: bool) {
        if self.last != Some(is_ok) {
            info!(verdict = if is_ok { "pass" } else { "fail" }, "indicator");
        }
        self.last = Some(is_ok);
    }

    fn clear(&mut self) {
        self.last = None;
        info!("indicator cleared");
    }
}

/// Non-queuing "one job at a time" flag
#[derive(Debug, Clone, Default)]
pub struct BusyFlag(Arc<AtomicBool>);

/// Held while a job runs; dropping it frees the flag
#[derive(Debug)]
pub struct BusyGuard(Arc<AtomicBool>);

impl BusyFlag {
    /// `None` when a job is already running
    pub fn try_acquire(&self) -> Option<BusyGuard> {
        self.0
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .ok()
            .map(|_| BusyGuard(Arc::clone(&self.0)))
    }

    /// True while a guard is held
    pub fn is_busy(&self) -> bool {
        self.0.load(Ordering::Acquire)
    }
}

impl Drop for BusyGuard {
    fn drop(&mut self) {
        self.0.store(false, Ordering::Release);
    }
}

/// Releases the source when the capture thread exits, however it exits
struct SourceGuard(Box<dyn FrameSource>);

impl Drop for SourceGuard {
    fn drop(&mut self) {
        self.0.release();
        info!(source = %self.0.describe(), "frame source released");
    }
}

/// Owner of the capture thread
pub struct CaptureController {
    config: SharedConfig,
    options: CaptureOptions,
    state: CaptureState,
    cancel: Arc<AtomicBool>,
    handle: Option<JoinHandle<()>>,
}

impl CaptureController {
    /// Idle controller; nothing is opened until [`start`](CaptureController::start)
    pub fn new(config: SharedConfig, options: CaptureOptions) -> Self {
        Self {
            config,
            options,
            state: CaptureState::Stopped,
            cancel: Arc::new(AtomicBool::new(false)),
            handle: None,
        }
    }

    /// Current state; a capture thread that ended on its own reads as stopped
    pub fn state(&self) -> CaptureState {
        match (&self.state, &self.handle) {
            (CaptureState::Running, Some(handle)) if handle.is_finished() => CaptureState::Stopped,
            (state, _) => *state,
        }
    }

    /// Open `source` and start capturing.
    ///
    /// Fails with `DeviceUnavailable` when the source cannot be opened or a
    /// capture is already running; nothing is started in either case.
    pub fn start(&mut self, mut source: Box<dyn FrameSource>) -> Result<Receiver<CaptureEvent>> {
        if self.state() != CaptureState::Stopped {
            return Err(InspectError::device("capture already running"));
        }
        // Reap a thread that ended by itself.
        self.stop();

        source.open().inspect_err(|err| {
            error!(source = %source.describe(), error = %err, "capture not started");
        })?;
        info!(source = %source.describe(), "capture started");

        let (tx, rx) = sync_channel(self.options.channel_capacity.max(1));
        let cancel = Arc::new(AtomicBool::new(false));
        self.cancel = Arc::clone(&cancel);

        let worker = CaptureLoop {
            source: SourceGuard(source),
            config: self.config.clone(),
            options: self.options.clone(),
            cancel,
            events: tx,
        };
        self.handle = Some(thread::spawn(move || worker.run()));
        self.state = CaptureState::Running;
        Ok(rx)
    }

    /// Stop capturing and wait (bounded) for the capture thread. Safe to call at any time.
    pub fn stop(&mut self) {
        let Some(handle) = self.handle.take() else {
            self.state = CaptureState::Stopped;
            return;
        };
        self.state = CaptureState::Stopping;
        self.cancel.store(true, Ordering::Release);

        let deadline = Instant::now() + self.options.join_timeout;
        while !handle.is_finished() && Instant::now() < deadline {
            thread::sleep(Duration::from_millis(5));
        }
        if handle.is_finished() {
            if handle.join().is_err() {
                error!("capture thread panicked");
            }
        } else {
            warn!(timeout = ?self.options.join_timeout, "capture thread did not stop in time, detaching");
        }
        self.state = CaptureState::Stopped;
        info!("capture stopped");
    }
}

impl Drop for CaptureController {
    fn drop(&mut self) {
        self.stop();
    }
}

struct CaptureLoop {
    source: SourceGuard,
    config: SharedConfig,
    options: CaptureOptions,
    cancel: Arc<AtomicBool>,
    events: SyncSender<CaptureEvent>,
}

impl CaptureLoop {
    fn run(mut self) {
        let mut buffer = FrameStabilizer::new(self.options.buffer_len);
        let busy = BusyFlag::default();
        let analyze_every = self.options.analyze_every.max(1);
        let mut generation = 0u64;

        while !self.cancel.load(Ordering::Acquire) {
            generation += 1;
            match self.source.0.read() {
                Ok(frame) => {
                    buffer.push(frame.clone());
                    if !self.post(CaptureEvent::Preview { generation, frame }) {
                        break;
                    }
                    if generation % analyze_every == 0 {
                        self.trigger_analysis(&busy, &buffer, generation);
                    }
                }
                Err(error) => {
                    warn!(generation, error = %error, "frame read failed");
                    if !self.post(CaptureEvent::SourceError { generation, error }) {
                        break;
                    }
                }
            }
            thread::sleep(self.options.idle);
        }
        debug!(frames = generation, "capture loop finished");
    }

    fn trigger_analysis(&self, busy: &BusyFlag, buffer: &FrameStabilizer, generation: u64) {
        let Some(guard) = busy.try_acquire() else {
            debug!(generation, "analysis still running, trigger skipped");
            return;
        };
        let frames = buffer.snapshot();
        let config = self.config.clone();
        let cancel = Arc::clone(&self.cancel);
        let events = self.events.clone();

        thread::spawn(move || {
            let _guard = guard;
            let Some(frame) = stabilize(&frames) else {
                return;
            };
            let inspection = inspect_with_views(&DynamicImage::ImageRgb8(frame), &config.snapshot());
            if cancel.load(Ordering::Acquire) {
                debug!(generation, "capture stopped, analysis discarded");
                return;
            }
            if let Err(TrySendError::Full(_)) = events.try_send(CaptureEvent::Analyzed { generation, inspection }) {
                warn!(generation, "consumer lagging, analysis dropped");
            }
        });
    }

    /// `false` once the consumer is gone
    fn post(&self, event: CaptureEvent) -> bool {
        match self.events.try_send(event) {
            Ok(()) => true,
            Err(TrySendError::Full(_)) => true,
            Err(TrySendError::Disconnected(_)) => {
                info!("event receiver dropped, stopping capture");
                false
            }
        }
    }
}
