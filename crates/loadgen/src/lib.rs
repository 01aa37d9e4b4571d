pub mod behavior;
pub mod identity;
pub mod session;
pub mod stats;
pub mod swarm;
pub mod weights;

pub use behavior::{Action, Catalog, PlannedAction, PlannedRequest, Profile, dry_run};
pub use stats::{RequestStats, Stats, StatsSnapshot};
pub use swarm::{SwarmConfig, run_swarm};
