//! Client for the college DSA leaderboard REST API: session handling, the HTTP gateway,
//! and the client-side ranking of fetched students.

pub mod api;
pub mod board;
pub mod config;
pub mod error;
pub mod models;
pub mod ranking;
pub mod report;
pub mod session;

pub use api::ApiClient;
pub use error::ApiError;
pub use models::{FilterCriteria, RankedStudent, StudentRecord, YearFilter};
pub use ranking::compute_ranking;
pub use session::{FileStore, KeyValueStore, MemoryStore, SessionStore};
