//! Windowed aggregation core for Aerosense
//!
//! Reduces bursts of raw sensor readings into fixed-size statistical
//! summaries over a rolling 10 second window. This crate is the pure half
//! of the pipeline: no I/O, no threads, no clocks other than the
//! [`time::Clock`] abstraction. The daemon feeds it snapshots of the latest
//! readings and asks it for a shaped publish payload once per cycle.
//!
//! ```
//! use aerosense_core::window::WindowSet;
//! use aerosense_core::payload::SummaryPayload;
//!
//! let mut windows = WindowSet::new();
//! windows.push_temperature(0, 1_000, 20.0);
//! windows.push_temperature(0, 2_000, 21.0);
//! windows.prune(5_000);
//!
//! let payload = SummaryPayload::from_windows(1, &windows);
//! assert_eq!(payload.data.temperature[0], 20.5);
//! ```

#![deny(unsafe_code)]
#![warn(missing_docs)]

pub mod aggregate;
pub mod metrics;
pub mod payload;
pub mod time;
pub mod window;

// Public API
pub use payload::SummaryPayload;
pub use time::{Clock, MonotonicClock, Timestamp};
pub use window::{SampleWindow, WindowSet};

/// Crate version, for startup banners.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
