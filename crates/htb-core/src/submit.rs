//! Flag submission.
//!
//! [`dispatch`] resolves the target for a mode, runs the ownership and
//! input checks, reads the flag and returns a finished
//! [`SubmissionRequest`]. [`submit`] sends it. Nothing is posted by
//! `dispatch` itself.

use serde::Serialize;
use serde_json::{Map, Value};
use tracing::debug;

use htb_api::ResourceId;

use crate::context::Context;
use crate::domain::{LabError, ResourceKind, ResourceRef, Result};
use crate::obs;
use crate::probe;
use crate::resolver;
use crate::route;

/// Payload field that carries the flag in every mode.
pub const FLAG_FIELD: &str = "flag";

/// Valid challenge difficulty ratings.
pub const DIFFICULTY_RANGE: std::ops::RangeInclusive<u8> = 1..=10;

/// What the user wants to submit a flag for.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SubmitMode {
    Challenge {
        name: String,
        difficulty: Option<u8>,
    },
    Machine {
        name: String,
    },
    /// The machine currently running for this account.
    ActiveMachine,
    Fortress {
        name: String,
    },
    Prolab {
        name: String,
    },
}

/// A validated request, ready to send.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SubmissionRequest {
    pub endpoint: String,
    pub payload: Map<String, Value>,
    pub resource: Option<ResourceId>,
}

/// Result of [`dispatch`].
#[derive(Debug, Clone, PartialEq)]
pub enum DispatchOutcome {
    Ready(SubmissionRequest),
    /// User and root flags are both owned; nothing to submit.
    AlreadyOwned { id: ResourceId },
    /// The confirmation prompt was declined.
    Cancelled,
}

/// Interactive input used during dispatch.
pub trait Prompter: Send + Sync {
    /// Yes/no question.
    fn confirm(&self, question: &str) -> bool;
    /// Masked input; the value must never be echoed or logged.
    fn read_secret(&self, prompt: &str) -> std::io::Result<String>;
}

/// Build the submission for `mode`.
pub async fn dispatch(
    ctx: &Context,
    mode: &SubmitMode,
    prompter: &dyn Prompter,
) -> Result<DispatchOutcome> {
    let (mut request, target) = match mode {
        SubmitMode::Challenge { name, difficulty } => {
            let difficulty = difficulty.map(scaled_difficulty).transpose()?;
            let target = resolver::resolve(ctx, name, ResourceKind::Challenge).await?;
            let mut payload = Map::new();
            payload.insert("challenge_id".into(), target.id.to_json());
            if let Some(difficulty) = difficulty {
                payload.insert("difficulty".into(), Value::from(difficulty));
            }
            let request = SubmissionRequest {
                endpoint: "/challenge/own".into(),
                payload,
                resource: Some(target.id.clone()),
            };
            (request, target)
        }
        SubmitMode::Machine { name } => {
            let target = resolver::resolve(ctx, name, ResourceKind::Machine).await?;
            match machine_request(ctx, &target).await? {
                Some(request) => (request, target),
                None => return Ok(DispatchOutcome::AlreadyOwned { id: target.id }),
            }
        }
        SubmitMode::ActiveMachine => {
            if !ctx.batch() && !prompter.confirm("Submit the flag for the active machine?") {
                return Ok(DispatchOutcome::Cancelled);
            }
            let target = probe::active_machine(ctx)
                .await?
                .ok_or(LabError::NoActiveMachine)?;
            match machine_request(ctx, &target).await? {
                Some(request) => (request, target),
                None => return Ok(DispatchOutcome::AlreadyOwned { id: target.id }),
            }
        }
        SubmitMode::Fortress { name } => {
            let target = resolver::resolve(ctx, name, ResourceKind::Fortress).await?;
            (competition_request("fortress", &target), target)
        }
        SubmitMode::Prolab { name } => {
            let target = resolver::resolve(ctx, name, ResourceKind::Prolab).await?;
            (competition_request("prolab", &target), target)
        }
    };

    let flag = normalize_flag(&prompter.read_secret(&format!("Flag for {}: ", target.name))?)?;
    request.payload.insert(FLAG_FIELD.into(), Value::String(flag));
    debug!(endpoint = %request.endpoint, target = %target, "submission ready");
    Ok(DispatchOutcome::Ready(request))
}

/// Send a dispatched request and return the server message.
pub async fn submit(ctx: &Context, request: SubmissionRequest) -> Result<String> {
    let resource = request.resource.as_ref().map(|id| id.to_string());
    obs::emit_submission_sent(&request.endpoint, resource.as_deref());
    ctx.post_message(&request.endpoint, Value::Object(request.payload))
        .await
}

/// `None` when both flags are already owned.
async fn machine_request(ctx: &Context, target: &ResourceRef) -> Result<Option<SubmissionRequest>> {
    let profile = probe::machine_profile(ctx, &target.id).await?;
    if profile.user_owned && profile.root_owned {
        return Ok(None);
    }
    let machine_type = probe::machine_type(ctx, &target.id).await?;
    let route = route::own_route(target, machine_type);
    Ok(Some(SubmissionRequest {
        endpoint: route.endpoint,
        payload: route.payload,
        resource: Some(target.id.clone()),
    }))
}

fn competition_request(segment: &str, target: &ResourceRef) -> SubmissionRequest {
    SubmissionRequest {
        endpoint: format!("/{segment}/{}/flag", target.id),
        payload: Map::new(),
        resource: Some(target.id.clone()),
    }
}

/// Rating in 1..=10, sent to the API multiplied by ten.
pub fn scaled_difficulty(rating: u8) -> Result<u8> {
    if DIFFICULTY_RANGE.contains(&rating) {
        Ok(rating * 10)
    } else {
        Err(LabError::Validation(format!(
            "difficulty must be between {} and {}, got {rating}",
            DIFFICULTY_RANGE.start(),
            DIFFICULTY_RANGE.end()
        )))
    }
}

/// Remove every whitespace character; an empty result is rejected.
pub fn normalize_flag(raw: &str) -> Result<String> {
    let flag: String = raw.chars().filter(|c| !c.is_whitespace()).collect();
    if flag.is_empty() {
        return Err(LabError::Validation("flag is empty".into()));
    }
    Ok(flag)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_scaled_difficulty_bounds() {
        assert_eq!(scaled_difficulty(1).unwrap(), 10);
        assert_eq!(scaled_difficulty(5).unwrap(), 50);
        assert_eq!(scaled_difficulty(10).unwrap(), 100);
        assert!(matches!(scaled_difficulty(0), Err(LabError::Validation(_))));
        assert!(matches!(scaled_difficulty(11), Err(LabError::Validation(_))));
    }

    #[test]
    fn test_normalize_flag_strips_all_whitespace() {
        assert_eq!(normalize_flag("  HTB{a b}\n").unwrap(), "HTB{ab}");
        assert_eq!(normalize_flag("\tabc\r\n").unwrap(), "abc");
        assert!(matches!(normalize_flag(" \n\t"), Err(LabError::Validation(_))));
    }

    #[test]
    fn test_competition_endpoint() {
        let jet = ResourceRef::new(ResourceKind::Fortress, 7u64, "Jet");
        let request = competition_request("fortress", &jet);
        assert_eq!(request.endpoint, "/fortress/7/flag");
        assert!(request.payload.is_empty());
    }
}
