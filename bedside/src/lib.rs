//! A bedside room display.
//!
//! Producers (the pet, the weather, the tree, an optional clock) are fired
//! by the scheduler and send widgets down the queue; the compositor layers
//! them over the background and writes the result to the display.

pub mod app;
pub mod assets;
pub mod astro;
pub mod config;
pub mod context;
pub mod jobs;
pub mod preview;
pub mod producers;
pub mod weather;

pub use app::{ArgsError, parse_location, run};
pub use config::{Config, Location};
pub use context::AppContext;
