//! Popularity dashboard core for the Indego bikeshare system.
//!
//! Station popularity is fetched per time-of-day window, turned into map features (one per
//! station or summed into a hexagonal grid), styled by origin/destination balance, and binned
//! into histograms whose bucket selections filter the map. [`orchestrator::Dashboard`] ties
//! the pieces together behind a single event loop.

pub mod builder;
pub mod config;
pub mod feature;
pub mod filter;
pub mod histogram;
pub mod legend;
pub mod map;
pub mod orchestrator;
pub mod outline;
pub mod source;
pub mod station;
pub mod style;
pub mod time_window;
pub mod tools;
