pub mod db;
pub mod memory;
pub mod rate_limit;

pub use db::DbAdapter;
pub use memory::MemoryStore;
pub use rate_limit::SlidingWindowLimiter;
