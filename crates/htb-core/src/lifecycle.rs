//! Machine lifecycle: start, stop and reset.
//!
//! Each operation takes an already resolved target, probes fresh account
//! state, picks a route and sends it. Starts on asynchronous routes hand
//! over to the [`ProvisioningWaiter`].

use serde_json::Value;
use tracing::info;

use crate::context::Context;
use crate::domain::{LabError, ResourceRef, Result};
use crate::probe;
use crate::route::{self, OperationKind, Provisioning};
use crate::waiter::{ActiveMachineAddress, Progress, ProvisioningStatus, ProvisioningWaiter, Ticker};

/// Marker the API uses when another machine is already running.
const MUST_STOP_MARKER: &str = "You must stop";

/// Shown when the wait ends without an address, by timeout or interrupt.
pub const STOPPED_WAITING: &str = "Stopped waiting for an IP address";

/// What happened after a start request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StartOutcome {
    /// Another machine is running; nothing was started.
    Blocked { message: String },
    /// Interrupted before the start request was sent.
    Cancelled,
    /// Synchronous route: address read right after the start.
    Started {
        message: String,
        address: Option<String>,
    },
    /// Asynchronous route: terminal state of the provisioning wait.
    Provisioned {
        message: String,
        status: ProvisioningStatus,
    },
}

impl StartOutcome {
    /// One status line (or two) for the caller to display.
    pub fn summary(&self) -> String {
        match self {
            StartOutcome::Blocked { message } => message.clone(),
            StartOutcome::Cancelled => "Start cancelled, no request was sent".to_string(),
            StartOutcome::Started { message, address } => format!(
                "{message}\nTarget: {}",
                address.as_deref().unwrap_or(probe::UNDEFINED_ADDRESS)
            ),
            StartOutcome::Provisioned {
                message,
                status: ProvisioningStatus::Ready(address),
            } => format!("{message}\nTarget: {address}"),
            StartOutcome::Provisioned { message, .. } => {
                format!("{message}\n{STOPPED_WAITING}")
            }
        }
    }

    pub fn address(&self) -> Option<&str> {
        match self {
            StartOutcome::Started { address, .. } => address.as_deref(),
            StartOutcome::Provisioned {
                status: ProvisioningStatus::Ready(address),
                ..
            } => Some(address),
            _ => None,
        }
    }
}

/// Start `target` and wait for its address when the route is asynchronous.
///
/// A ticker cancelled before the start request goes out yields
/// [`StartOutcome::Cancelled`] and nothing is sent.
pub async fn start_machine<T>(
    ctx: &Context,
    target: &ResourceRef,
    progress: &dyn Progress,
    ticker: &mut T,
) -> Result<StartOutcome>
where
    T: Ticker + ?Sized,
{
    if ticker.is_cancelled() {
        return Ok(StartOutcome::Cancelled);
    }
    let state = probe::probe(ctx, target).await?;
    let route = route::select(OperationKind::Start, target, &state);

    if ticker.is_cancelled() {
        info!(machine = %target.name, "start interrupted before sending");
        return Ok(StartOutcome::Cancelled);
    }
    let message = ctx
        .post_message(&route.endpoint, Value::Object(route.payload))
        .await?;
    info!(machine = %target.name, %message, "start request accepted");

    if message.contains(MUST_STOP_MARKER) {
        return Ok(StartOutcome::Blocked { message });
    }

    match route.provisioning {
        Provisioning::Poll => {
            let status = ProvisioningWaiter::new(progress)
                .wait(&ActiveMachineAddress::new(ctx), ticker)
                .await?;
            Ok(StartOutcome::Provisioned { message, status })
        }
        Provisioning::Immediate => {
            let address = probe::active_machine_address(ctx).await?;
            Ok(StartOutcome::Started { message, address })
        }
    }
}

/// Stop the active machine. Returns it along with the server message.
pub async fn stop_active(ctx: &Context) -> Result<(ResourceRef, String)> {
    act_on_active(ctx, OperationKind::Stop).await
}

/// Reset the active machine. Returns it along with the server message.
pub async fn reset_active(ctx: &Context) -> Result<(ResourceRef, String)> {
    act_on_active(ctx, OperationKind::Reset).await
}

async fn act_on_active(ctx: &Context, op: OperationKind) -> Result<(ResourceRef, String)> {
    let target = probe::active_machine(ctx)
        .await?
        .ok_or(LabError::NoActiveMachine)?;
    let state = probe::probe(ctx, &target).await?;
    let route = route::select(op, &target, &state);
    let message = ctx
        .post_message(&route.endpoint, Value::Object(route.payload))
        .await?;
    info!(machine = %target.name, operation = op.as_str(), %message, "request accepted");
    Ok((target, message))
}
