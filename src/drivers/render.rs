use std::time::{Duration, Instant};
use log::{info, warn};
use crate::drivers::buffer::RollingBuffer;
use crate::drivers::error::RenderError;
use crate::drivers::layout::Layout;
/// Default refresh period of the render loop.
pub const REFRESH_PERIOD: Duration = Duration::from_millis(100);
/// The drawing backend. Lines are addressed by their index in `Layout::channels`.
pub trait PlotSurface {
    /// Drops all subplots and lines and recreates them for `layout`.
    fn rebuild(&mut self, layout: &Layout) -> Result<(), RenderError>;
    /// Replaces the y-values of one line; x runs over `0..values.len()`.
    fn set_line(&mut self, subplot: usize, line: usize, values: &[f64]) -> Result<(), RenderError>;
    fn redraw(&mut self) -> Result<(), RenderError>;
}
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum TickOutcome {
    /// Loop was cancelled; the surface was not touched.
    Cancelled,
    /// Period has not elapsed since the previous tick.
    NotDue,
    /// No layout loaded, nothing drawn.
    Idle,
    Rendered,
    /// Surface went away mid-tick; the loop cancels itself.
    TargetLost,
}
/// Fixed-period polling consumer of the rolling buffer.
#[derive(Debug)]
pub struct RenderLoop {
    period: Duration,
    last_tick: Option<Instant>,
    cancelled: bool,
}
impl RenderLoop {
    pub fn new(period: Duration) -> Self {
        Self {
            period,
            last_tick: None,
            cancelled: false,
        }
    }
    pub fn cancel(&mut self) {
        if !self.cancelled {
            info!("render loop cancelled");
        }
        self.cancelled = true;
    }
    pub fn is_cancelled(&self) -> bool {
        self.cancelled
    }
    /// Time left until the next tick is due, measured from `now`.
    pub fn next_due_in(&self, now: Instant) -> Duration {
        match self.last_tick {
            Some(last) => (last + self.period).saturating_duration_since(now),
            None => Duration::ZERO,
        }
    }
    /// Runs a tick only when a full period has passed since the last one.
    pub fn tick_if_due(
        &mut self,
        now: Instant,
        layout: Option<&Layout>,
        buffer: &RollingBuffer,
        surface: &mut dyn PlotSurface,
    ) -> TickOutcome {
        if self.cancelled {
            return TickOutcome::Cancelled;
        }
        if !self.next_due_in(now).is_zero() {
            return TickOutcome::NotDue;
        }
        self.last_tick = Some(now);
        self.tick(layout, buffer, surface)
    }
    /// One refresh: scale every configured channel's history and push it to the surface.
    pub fn tick(
        &mut self,
        layout: Option<&Layout>,
        buffer: &RollingBuffer,
        surface: &mut dyn PlotSurface,
    ) -> TickOutcome {
        if self.cancelled {
            return TickOutcome::Cancelled;
        }
        let Some(layout) = layout else {
            return TickOutcome::Idle;
        };
        match Self::draw(layout, buffer, surface) {
            Ok(()) => TickOutcome::Rendered,
            Err(RenderError::TargetDestroyed) => {
                warn!("render target destroyed, stopping refresh");
                self.cancelled = true;
                TickOutcome::TargetLost
            }
        }
    }
    fn draw(
        layout: &Layout,
        buffer: &RollingBuffer,
        surface: &mut dyn PlotSurface,
    ) -> Result<(), RenderError> {
        for (line, channel) in layout.channels.iter().enumerate() {
            let scaled: Vec<f64> = buffer
                .snapshot(channel.sample_index)
                .iter()
                .map(|v| f64::from(*v) * channel.scale)
                .collect();
            surface.set_line(channel.subplot, line, &scaled)?;
        }
        surface.redraw()
    }
}
impl Default for RenderLoop {
    fn default() -> Self {
        Self::new(REFRESH_PERIOD)
    }
}
