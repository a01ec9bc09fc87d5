//! Usage-limit accounting: the limit store, the usage tracker that fans
//! interaction usage out across the organization → team → agent hierarchy,
//! the lazy cleanup policy, and the lookups that feed enforcement.

pub mod cleanup;
pub mod directory;
pub mod interactions;
pub mod pricing;
pub mod store;
pub mod tracker;

pub use cleanup::CleanupPolicy;
pub use directory::{Membership, StaticDirectory};
pub use interactions::InteractionLog;
pub use pricing::PriceTable;
pub use store::{LimitRepository, LimitStore};
pub use tracker::{TracingObserver, UsageObserver, UsageTracker};
