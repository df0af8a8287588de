// Service exports
pub mod cache;
pub mod matching;
pub mod memory;
pub mod postgres;
pub mod store;

pub use cache::{CacheError, CacheKey, CacheManager, CacheStats};
pub use matching::MatchService;
pub use memory::InMemoryStore;
pub use postgres::PostgresStore;
pub use store::{MatchStore, StoreError, StoreResult, SwipeOutcome};
