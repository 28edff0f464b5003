// src/types.rs
use crate::drivers::{
    Layout, LayoutError, PlotSurface, RenderLoop, RollingBuffer, SampleSet, SourceConfig,
    SourceError, TickOutcome,
};
use crate::engine::ReaderHandle;
use log::{info, warn};
use std::path::Path;
use std::sync::mpsc::{channel, Receiver, Sender};
use std::time::{Duration, Instant};

// Reader thread -> GUI
#[derive(Debug)]
pub enum ReaderEvent {
    Started(String),
    Samples(SampleSet),
    // Transport could not be opened; no samples will follow.
    OpenFailed(SourceError),
    // Source broke while running; the thread is exiting.
    Failed(SourceError),
    // Running total of frames discarded for a bad terminator.
    FramesDropped(u64),
    Stopped,
}

/// Everything the render tick needs, in one place.
pub struct AppState {
    layout: Option<Layout>,
    buffer: RollingBuffer,
    reader: Option<ReaderHandle>,
    events_tx: Sender<ReaderEvent>,
    events_rx: Receiver<ReaderEvent>,
    render: RenderLoop,
    closing: bool,
}

impl AppState {
    pub fn new(history: usize, refresh: Duration) -> Self {
        let (events_tx, events_rx) = channel();
        Self {
            layout: None,
            buffer: RollingBuffer::new(history),
            reader: None,
            events_tx,
            events_rx,
            render: RenderLoop::new(refresh),
            closing: false,
        }
    }

    #[cfg(test)]
    pub fn layout(&self) -> Option<&Layout> {
        self.layout.as_ref()
    }

    #[cfg(test)]
    pub fn buffer(&self) -> &RollingBuffer {
        &self.buffer
    }

    pub fn render_loop(&self) -> &RenderLoop {
        &self.render
    }

    pub fn is_reading(&self) -> bool {
        self.reader.as_ref().map_or(false, ReaderHandle::is_running)
    }

    /// Set once by `shutdown`; a lost plot surface does not count.
    pub fn is_closing(&self) -> bool {
        self.closing
    }

    /// Starts a reader unless one is already running. Returns whether a new one was spawned.
    pub fn start_reader(&mut self, config: SourceConfig) -> bool {
        if !self.make_room_for_reader() {
            return false;
        }
        self.reader = Some(ReaderHandle::spawn(config, self.events_tx.clone()));
        true
    }

    #[cfg(test)]
    pub fn start_with<F>(&mut self, open: F) -> bool
    where
        F: FnOnce() -> Result<Box<dyn crate::drivers::SampleSource>, SourceError>
            + Send
            + 'static,
    {
        if !self.make_room_for_reader() {
            return false;
        }
        self.reader = Some(ReaderHandle::spawn_with(open, self.events_tx.clone()));
        true
    }

    fn make_room_for_reader(&mut self) -> bool {
        if self.closing || self.is_reading() {
            return false;
        }
        // A finished reader (e.g. failed open) is reaped before replacing it.
        if let Some(mut old) = self.reader.take() {
            old.stop(Duration::ZERO);
        }
        true
    }

    pub fn stop_reader(&mut self, timeout: Duration) -> bool {
        match self.reader.take() {
            Some(mut reader) => reader.stop(timeout),
            None => true,
        }
    }

    /// Replaces the current layout wholesale and rebuilds the surface for it.
    pub fn apply_layout(&mut self, layout: Layout, surface: &mut dyn PlotSurface) {
        if let Err(e) = surface.rebuild(&layout) {
            warn!("could not rebuild plots: {e}");
            self.render.cancel();
        }
        self.layout = Some(layout);
    }

    /// Parses and applies a layout file. On error the previous layout stays active.
    pub fn load_layout(
        &mut self,
        path: &Path,
        surface: &mut dyn PlotSurface,
    ) -> Result<(), LayoutError> {
        let layout = Layout::from_path(path)?;
        self.apply_layout(layout, surface);
        Ok(())
    }

    /// Moves queued sample sets into the rolling buffer and returns the other events.
    pub fn drain_events(&mut self) -> Vec<ReaderEvent> {
        let mut notices = Vec::new();
        while let Ok(event) = self.events_rx.try_recv() {
            match event {
                ReaderEvent::Samples(set) => self.buffer.push(&set),
                other => notices.push(other),
            }
        }
        notices
    }

    pub fn render_tick(&mut self, now: Instant, surface: &mut dyn PlotSurface) -> TickOutcome {
        self.render
            .tick_if_due(now, self.layout.as_ref(), &self.buffer, surface)
    }

    /// Sets the closing flag, cancels rendering and joins the reader.
    pub fn shutdown(&mut self, timeout: Duration) {
        if self.closing && self.reader.is_none() {
            return;
        }
        info!("shutting down");
        self.closing = true;
        self.render.cancel();
        self.stop_reader(timeout);
    }
}
