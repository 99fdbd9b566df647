//! Host side of the flock: settings files, the tick loop and frame output.

pub mod config;
pub mod driver;

pub use config::{load_settings, to_params, SettingsWatcher};
pub use driver::{Clock, Driver, RunOptions};
