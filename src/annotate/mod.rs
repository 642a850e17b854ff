pub mod category;
pub mod engine;
pub mod label;
pub mod layering;
pub mod layout;

pub use category::{Categories, LabelConfig};
pub use engine::{AnnotationEngine, CategoryDeletion, Gesture, PointerButton, PressOutcome};
pub use label::{Label, LabelId};
pub use layout::LabelLayout;
