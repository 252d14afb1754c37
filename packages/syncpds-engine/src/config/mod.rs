//! Analysis configuration
//!
//! - `AnalysisConfig`: solver/query options (timeout, call graph, sharing)
//! - `Preset`: complete default configurations
//! - YAML schema v1 loading/export

pub mod analysis_config;
pub mod error;
pub mod io;
pub mod preset;

pub use analysis_config::AnalysisConfig;
pub use error::{ConfigError, ConfigResult};
pub use io::{AnalysisOverrides, ConfigExportV1};
pub use preset::Preset;
