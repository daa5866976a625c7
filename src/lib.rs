//! tv_grid: core library for a simulated linear TV programming grid.
//!
//! Weekly slot planning, daily expansion to a second-resolution timeline,
//! episode rotation and "what's on now" lookups all live here. The CLI
//! consumes this crate through [`scheduler::Scheduler`].

pub mod blocks;
pub mod catalog;
pub mod channels;
pub mod clock;
pub mod commercials;
pub mod config;
pub mod cursors;
pub mod daily;
pub mod error;
pub mod playback;
pub mod scheduler;
pub mod series;
pub mod store;
pub mod time_of_day;
pub mod weekly;
