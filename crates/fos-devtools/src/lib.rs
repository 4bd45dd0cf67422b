//! fOS DevTools
//!
//! Debug console for the fOS player: a bounded message log, a throttled
//! panel view over it and a `tracing` layer that feeds it.

pub mod console;
pub mod layer;
pub mod panel;

pub use console::{Console, ConsoleHandle, ConsoleMessage, LogLevel};
pub use layer::ConsoleLayer;
pub use panel::DebugPanel;
