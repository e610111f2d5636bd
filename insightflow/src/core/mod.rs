//! Core value types shared by stages, the executor and the run registry.

mod fragment;
mod status;

pub use fragment::Fragment;
pub use status::{RunStatus, StageStatus};
