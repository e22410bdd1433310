// Library interface for sectorscope
// This allows integration tests and benches to access internal modules

pub mod aggregate;
pub mod cache;
pub mod colors;
pub mod compare;
pub mod config;
pub mod dominance;
pub mod errors;
pub mod laps;
pub mod preprocess;
pub mod report;
pub mod storage;

// Re-export commonly used types
pub use aggregate::{DriverSummary, SectorRanking, SpeedTrapRanking};
pub use cache::{SessionCache, SessionKey, SessionStatus};
pub use compare::{ComparisonResult, Faster, compare};
pub use dominance::{Dominance, DominanceFrame, TelemetryTrace, dominance};
pub use errors::SectorScopeError;
pub use laps::{LapRecord, LapTable, RawLapRecord};
pub use storage::{FileSessionStore, SessionStore};
