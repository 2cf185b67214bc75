//! Async collaborators around the engine: window loading, price loading and
//! the polling watcher.

pub mod loader;
pub mod pricing;
pub mod watcher;

pub use loader::{LoadError, WindowLoader};
pub use pricing::PriceLoader;
pub use watcher::{WatchUpdate, Watcher};
