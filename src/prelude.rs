pub use crate::config::{Config, ConfigBuilder};
pub use crate::error::{Error, Result};
pub use crate::executor::{PanicStrategy, Priority, TaskHandle, ThreadPool};
pub use crate::telemetry::MetricsSnapshot;
