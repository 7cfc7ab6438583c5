//! htb-core: domain logic behind htb-cli
//!
//! - `resolver`: name → resource id
//! - `probe`: account state snapshot (subscription, active machine, type)
//! - `route`: endpoint selection for start/stop/reset/own
//! - `waiter`: bounded, cancellable provisioning wait
//! - `aggregate`: composite records with tolerant auxiliary queries
//! - `submit`: flag submission dispatch
//! - `lifecycle`: start/stop/reset flows built from the above

pub mod aggregate;
pub mod context;
pub mod domain;
pub mod lifecycle;
pub mod metrics;
pub mod obs;
pub mod probe;
pub mod resolver;
pub mod route;
pub mod submit;
pub mod telemetry;
pub mod waiter;

pub use aggregate::{aggregate, AuxiliaryData, CompositeRecord, PrimaryRecord};
pub use context::Context;
pub use domain::{
    AccountState, LabError, MachineType, ResourceKind, ResourceRef, Result, SubscriptionTier,
};
pub use lifecycle::{reset_active, start_machine, stop_active, StartOutcome};
pub use metrics::METRICS;
pub use obs::{
    emit_auxiliary_unavailable, emit_provisioning_finished, emit_route_selected,
    emit_submission_sent, emit_target_resolved, CommandSpan,
};
pub use resolver::{release_arena_machine, resolve};
pub use route::{OperationKind, Provisioning, Route};
pub use submit::{dispatch, submit, DispatchOutcome, Prompter, SubmissionRequest, SubmitMode};
pub use telemetry::init_tracing;
pub use waiter::{
    IntervalTicker, NoProgress, Progress, ProvisioningStatus, ProvisioningWaiter, Ticker,
    POLL_INTERVAL, PROVISIONING_TIMEOUT,
};

/// htb-cli version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
