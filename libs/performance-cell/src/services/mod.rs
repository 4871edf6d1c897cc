pub mod housekeeping;
pub mod measure;
pub mod monitor;

pub use housekeeping::{collect_system_health, Housekeeping};
pub use measure::measure_execution_time;
pub use monitor::{AlertForwarder, PerformanceMonitor};
