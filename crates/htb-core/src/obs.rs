//! Structured observability hooks for command lifecycle events.
//!
//! - `CommandSpan`: RAII guard that tags everything logged during a
//!   command with its name
//! - `emit_*`: one function per lifecycle event

use tracing::info;

use crate::domain::ResourceRef;

/// RAII guard that enters a command-scoped tracing span.
///
/// ```ignore
/// let _span = CommandSpan::enter("start");
/// ```
pub struct CommandSpan {
    _span: tracing::span::EnteredSpan,
}

impl CommandSpan {
    pub fn enter(command: &str) -> Self {
        let span = tracing::info_span!("htb.command", command = %command);
        Self {
            _span: span.entered(),
        }
    }
}

/// Emit event: a name was resolved to a resource id.
pub fn emit_target_resolved(target: &ResourceRef) {
    info!(
        event = "target.resolved",
        kind = %target.kind,
        id = %target.id,
        name = %target.name,
    );
}

/// Emit event: a route was chosen for an operation.
pub fn emit_route_selected(operation: &str, endpoint: &str, machine_type: &str, tier: &str) {
    info!(
        event = "route.selected",
        operation = %operation,
        endpoint = %endpoint,
        machine_type = %machine_type,
        tier = %tier,
    );
}

/// Emit event: provisioning wait reached a terminal state.
pub fn emit_provisioning_finished(outcome: &str, polls: u64, elapsed_secs: u64) {
    info!(
        event = "provisioning.finished",
        outcome = %outcome,
        polls = polls,
        elapsed_secs = elapsed_secs,
    );
}

/// Emit event: an auxiliary query failed and was recorded as unavailable.
pub fn emit_auxiliary_unavailable(source: &str, error: &dyn std::fmt::Display) {
    tracing::warn!(event = "aggregate.auxiliary_unavailable", source = %source, error = %error);
}

/// Emit event: a flag submission was sent. The flag itself is never logged.
pub fn emit_submission_sent(endpoint: &str, resource: Option<&str>) {
    info!(
        event = "submission.sent",
        endpoint = %endpoint,
        resource = resource.unwrap_or("-"),
    );
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_command_span_create() {
        let _span = CommandSpan::enter("test-command");
    }
}
