pub mod buffer;
pub mod error;
pub mod frame;
pub mod layout;
pub mod render;
pub mod source;
pub use buffer::{RollingBuffer, DEFAULT_HISTORY};
pub use error::{LayoutError, RenderError, SourceError};
pub use frame::SampleSet;
pub use layout::Layout;
pub use render::{PlotSurface, RenderLoop, TickOutcome, REFRESH_PERIOD};
pub use source::{
    available_ports, open_source, parse_baud_rate, transport_available, SampleSource,
    SourceConfig, DEFAULT_BAUD_RATE,
};
