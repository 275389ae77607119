pub mod accrual;
pub mod domain;
pub mod errors;
pub mod ports;
pub mod session;
pub mod streak;
pub mod wheel;

pub use accrual::{Accrual, AccrualConfig};
pub use domain::{
    CreditKind, LedgerEntry, LegacySnapshot, MiningSession, UserAccount, UserCredentials,
    UserMiningState, UserSpin, UserStreak,
};
pub use errors::{CoreError, CoreResult};
pub use ports::{
    MiningStore, RateLimiter, ReferralOutcome, ReferralStats, SpinOutcome, StreakClaimOutcome,
};
pub use session::{ClaimOutcome, MiningPhase};
pub use streak::{Milestone, StreakClaim};
pub use wheel::WheelSegment;
