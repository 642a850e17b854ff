pub mod axes;
pub mod color;
pub mod frame;
pub mod scale;
pub mod text;

pub use color::{ColorMap, ColorPreset};
pub use frame::{FieldSource, Frame, FrameRenderer, Overlay, Viewport};
pub use scale::{FrequencyAxis, FrequencyScale, TimeAxis};
pub use text::TextOverlay;
