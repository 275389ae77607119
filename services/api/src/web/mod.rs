pub mod auth;
pub mod middleware;
pub mod mining;
pub mod protocol;
pub mod referral;
pub mod rest;
pub mod spin;
pub mod state;
pub mod streak;
pub mod wallet;

pub use middleware::require_auth;
pub use rest::ApiDoc;
