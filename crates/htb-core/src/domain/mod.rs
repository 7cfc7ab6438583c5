//! Domain models for htb-core.
//!
//! - `ResourceKind` / `ResourceRef`: what a command targets
//! - `AccountState`: subscription, active machine and machine type
//! - `LabError`: the error taxonomy

pub mod account;
pub mod error;
pub mod kind;

pub use account::{AccountState, MachineType, SubscriptionTier};
pub use error::{LabError, Result};
pub use kind::{ResourceKind, ResourceRef};
