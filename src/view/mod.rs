pub mod controller;
pub mod loader;
pub mod scheduler;
pub mod state;

pub use controller::{Modifiers, ViewController, ViewEvent};
pub use loader::{FieldLoader, FieldState};
pub use scheduler::RenderScheduler;
pub use state::{ViewSettings, ViewState};
