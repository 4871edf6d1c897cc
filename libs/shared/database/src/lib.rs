pub mod client;
pub mod error;
pub mod models;
pub mod supabase;

pub use client::{DatabaseProbe, DisabledDatabase, PerformanceSink};
pub use error::{DatabaseError, DatabaseErrorKind};
pub use models::PerformanceRecord;
pub use supabase::SupabaseClient;
