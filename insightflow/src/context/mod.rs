//! Per-run context: identity, the append-only shared state and the
//! read-only view each stage receives.

mod identity;
mod stage_context;
mod state;

pub use identity::RunIdentity;
pub use stage_context::StageContext;
pub use state::{SharedState, StageRecord};
