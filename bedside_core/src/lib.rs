//! Core of the bedside display: widgets flow from scheduled producers
//! through a bounded queue into a single compositor task that owns the
//! display.
//!
//! - [`queue`]: the bounded widget channel between producers and the
//!   compositor.
//! - [`compositor`]: layer blending and the drain-render-display loop.
//! - [`sink`]: the display device contract and an in-memory device.
//! - [`scheduler`]: wall-clock triggers and the job loop that fires
//!   producers.

pub mod compositor;
pub mod queue;
pub mod scheduler;
pub mod sink;

pub use types::BoxError;
