//! Service layer - business logic orchestration
//!
//! Services coordinate domain logic and port interactions. Each service
//! focuses on a specific use case or feature area.

mod account;
mod doctor;
pub mod logging;
pub mod migration;
mod summary;
mod sync;

pub use account::AccountService;
pub use doctor::{CheckResult, DoctorResult, DoctorService, DoctorSummary};
pub use logging::{EntryPoint, LogEntry, LogEvent, LogStats, LoggingService};
pub use migration::{MigrationResult, MigrationService};
pub use summary::{AccountSummary, SummaryService};
pub use sync::SyncService;
