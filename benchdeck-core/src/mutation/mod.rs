//! Mutation coordination: serialized writes and their observable effects
//!
//! All user-triggered writes (create, delete, run) funnel through the
//! [`MutationCoordinator`], the sole writer of cache-invalidation triggers.
//! Each mutation instance moves `Idle -> Pending -> (Succeeded | Failed)`;
//! a trigger whose key is already pending is refused, never issued twice.

mod coordinator;
mod state;

pub use coordinator::MutationCoordinator;
pub use state::{MutationKey, MutationKind, MutationPhase, PendingMutations, PendingSnapshot};
