// src/engine.rs
use crate::drivers::source::READ_TIMEOUT;
use crate::drivers::{open_source, SampleSource, SourceConfig, SourceError};
use crate::types::ReaderEvent;
use log::{info, warn};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::mpsc::{channel, Receiver, RecvTimeoutError, Sender};
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};

/// Join bound for a user-requested stop. A poll can sit in a read for up to
/// `READ_TIMEOUT` before it sees the flag.
pub const STOP_TIMEOUT: Duration = READ_TIMEOUT.saturating_add(Duration::from_secs(1));
// Minimum spacing between discard reports sent to the GUI.
const DROP_REPORT_INTERVAL: Duration = Duration::from_secs(1);

/// Background reader thread. Sample sets travel to the GUI over `tx`;
/// the source (and any serial port it owns) lives and dies on the thread.
pub struct ReaderHandle {
    stop: Arc<AtomicBool>,
    // Never sent on; disconnects when the thread exits.
    done: Receiver<()>,
    thread: Option<JoinHandle<()>>,
}

impl ReaderHandle {
    pub fn spawn(config: SourceConfig, tx: Sender<ReaderEvent>) -> Self {
        Self::spawn_with(move || open_source(&config), tx)
    }

    /// Runs `open` on the worker thread so a slow port open never blocks the caller.
    pub fn spawn_with<F>(open: F, tx: Sender<ReaderEvent>) -> Self
    where
        F: FnOnce() -> Result<Box<dyn SampleSource>, SourceError> + Send + 'static,
    {
        let stop = Arc::new(AtomicBool::new(false));
        let (done_tx, done) = channel::<()>();
        let flag = Arc::clone(&stop);
        let thread = thread::spawn(move || {
            let _done = done_tx;
            let source = match open() {
                Ok(source) => source,
                Err(e) => {
                    warn!("source failed to start: {e}");
                    tx.send(ReaderEvent::OpenFailed(e)).ok();
                    return;
                }
            };
            run_source(source, &flag, &tx);
        });
        Self {
            stop,
            done,
            thread: Some(thread),
        }
    }

    pub fn is_running(&self) -> bool {
        self.thread.as_ref().map_or(false, |t| !t.is_finished())
    }

    /// Signals the thread and waits up to `timeout` for it to exit.
    /// Returns false if it did not finish in time (it is then left detached).
    pub fn stop(&mut self, timeout: Duration) -> bool {
        self.stop.store(true, Ordering::Release);
        let Some(thread) = self.thread.take() else {
            return true;
        };
        match self.done.recv_timeout(timeout) {
            Ok(()) | Err(RecvTimeoutError::Disconnected) => {
                if thread.join().is_err() {
                    warn!("reader thread panicked");
                }
                true
            }
            Err(RecvTimeoutError::Timeout) => {
                warn!("reader thread did not stop within {timeout:?}");
                false
            }
        }
    }
}

impl Drop for ReaderHandle {
    fn drop(&mut self) {
        self.stop.store(true, Ordering::Release);
    }
}

fn run_source(mut source: Box<dyn SampleSource>, stop: &AtomicBool, tx: &Sender<ReaderEvent>) {
    let name = source.describe();
    info!("reader started: {name}");
    tx.send(ReaderEvent::Started(name.clone())).ok();
    let mut batch = Vec::new();
    let mut drops = DropReport::default();
    'outer: while !stop.load(Ordering::Acquire) {
        if let Err(e) = source.poll(&mut batch) {
            warn!("{name}: {e}");
            tx.send(ReaderEvent::Failed(e)).ok();
            break;
        }
        for set in batch.drain(..) {
            // GUI gone: nobody left to read.
            if tx.send(ReaderEvent::Samples(set)).is_err() {
                break 'outer;
            }
        }
        drops.update(source.dropped_frames(), false, tx);
    }
    drops.update(source.dropped_frames(), true, tx);
    // Release the transport before announcing the stop.
    drop(source);
    info!("reader stopped: {name}");
    tx.send(ReaderEvent::Stopped).ok();
}

/// Throttles `FramesDropped` events so a misaligned stream cannot flood the log.
#[derive(Default)]
struct DropReport {
    reported: u64,
    last: Option<Instant>,
}

impl DropReport {
    fn update(&mut self, total: u64, force: bool, tx: &Sender<ReaderEvent>) {
        if total <= self.reported {
            return;
        }
        let due = self.last.map_or(true, |t| t.elapsed() >= DROP_REPORT_INTERVAL);
        if !(due || force) {
            return;
        }
        warn!("{} malformed frame(s) discarded so far", total);
        self.reported = total;
        self.last = Some(Instant::now());
        tx.send(ReaderEvent::FramesDropped(total)).ok();
    }
}
