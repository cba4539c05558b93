//! Configuration domain module

mod app_config;
mod recorder_config;

pub use app_config::AppConfig;
pub use recorder_config::{RecorderConfig, SAMPLE_RATE_RANGE};
