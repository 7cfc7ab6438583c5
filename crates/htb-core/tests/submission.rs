//! Flag submission dispatch: ownership short-circuit, input validation
//! and the request shape for each mode.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use htb_api::fakes::FakeTransport;
use htb_api::{Method, ResourceId};
use htb_core::{dispatch, submit, Context, DispatchOutcome, LabError, Prompter, SubmitMode};
use serde_json::json;

/// Prompter with fixed answers that counts how often it was asked.
struct ScriptedPrompter {
    confirm: bool,
    flag: String,
    confirms: AtomicUsize,
    secrets: AtomicUsize,
}

impl ScriptedPrompter {
    fn new(confirm: bool, flag: &str) -> Self {
        Self {
            confirm,
            flag: flag.to_string(),
            confirms: AtomicUsize::new(0),
            secrets: AtomicUsize::new(0),
        }
    }
}

impl Prompter for ScriptedPrompter {
    fn confirm(&self, _question: &str) -> bool {
        self.confirms.fetch_add(1, Ordering::SeqCst);
        self.confirm
    }

    fn read_secret(&self, _prompt: &str) -> std::io::Result<String> {
        self.secrets.fetch_add(1, Ordering::SeqCst);
        Ok(self.flag.clone())
    }
}

fn machine_search(fake: &FakeTransport) {
    fake.on_get(
        "/search/fetch",
        json!({"machines": [{"id": 1, "value": "Lame"}]}),
    )
    .on_get(
        "/season/machine/active",
        json!({"data": {"id": 99, "name": "Arena"}}),
    );
}

fn ready(outcome: DispatchOutcome) -> htb_core::SubmissionRequest {
    match outcome {
        DispatchOutcome::Ready(request) => request,
        other => panic!("expected a ready request, got {other:?}"),
    }
}

#[tokio::test]
async fn test_owned_machine_short_circuits() {
    let fake = Arc::new(FakeTransport::new());
    machine_search(&fake);
    fake.on_get(
        "/machine/profile/1",
        json!({"info": {"id": 1, "name": "Lame", "authUserInUserOwns": true, "authUserInRootOwns": true}}),
    );
    let ctx = Context::new(fake.clone());
    let prompter = ScriptedPrompter::new(true, "HTB{x}");

    let outcome = dispatch(&ctx, &SubmitMode::Machine { name: "Lame".into() }, &prompter)
        .await
        .unwrap();

    assert_eq!(
        outcome,
        DispatchOutcome::AlreadyOwned {
            id: ResourceId::Numeric(1)
        }
    );
    assert_eq!(prompter.secrets.load(Ordering::SeqCst), 0);
    assert!(fake.last_post().is_none());
}

#[tokio::test]
async fn test_machine_flag_payload() {
    let fake = Arc::new(FakeTransport::new());
    machine_search(&fake);
    fake.on_get(
        "/machine/profile/1",
        json!({"info": {"id": 1, "name": "Lame", "authUserInUserOwns": true, "authUserInRootOwns": false}}),
    )
    .on_post("/machine/own", json!({"message": "Lame root is now owned."}));
    let ctx = Context::new(fake.clone());
    let prompter = ScriptedPrompter::new(true, " 0123abcd \n");

    let request = ready(
        dispatch(&ctx, &SubmitMode::Machine { name: "lame".into() }, &prompter)
            .await
            .unwrap(),
    );
    assert_eq!(request.endpoint, "/machine/own");
    assert_eq!(json!(request.payload), json!({"id": 1, "flag": "0123abcd"}));
    assert_eq!(request.resource, Some(ResourceId::Numeric(1)));

    let message = submit(&ctx, request).await.unwrap();
    assert_eq!(message, "Lame root is now owned.");
    assert_eq!(fake.count(Method::Post, "/machine/own"), 1);
}

#[tokio::test]
async fn test_release_machine_uses_arena_own() {
    let fake = Arc::new(FakeTransport::new());
    fake.on_get("/machine/active", json!({"info": {"id": 99, "name": "Arena"}}))
        .on_get("/season/machine/active", json!({"data": {"id": 99, "name": "Arena"}}))
        .on_get("/machine/profile/99", json!({"info": {"id": 99, "name": "Arena"}}));
    let ctx = Context::new(fake.clone()).with_batch(true);
    let prompter = ScriptedPrompter::new(false, "flag");

    let request = ready(dispatch(&ctx, &SubmitMode::ActiveMachine, &prompter).await.unwrap());

    assert_eq!(request.endpoint, "/arena/own");
    // Batch mode skips the confirmation entirely.
    assert_eq!(prompter.confirms.load(Ordering::SeqCst), 0);
}

#[tokio::test]
async fn test_declined_confirmation_sends_nothing() {
    let fake = Arc::new(FakeTransport::new());
    let ctx = Context::new(fake.clone());
    let prompter = ScriptedPrompter::new(false, "flag");

    let outcome = dispatch(&ctx, &SubmitMode::ActiveMachine, &prompter)
        .await
        .unwrap();

    assert_eq!(outcome, DispatchOutcome::Cancelled);
    assert!(fake.requests().is_empty());
}

#[tokio::test]
async fn test_active_machine_requires_running_machine() {
    let fake = Arc::new(FakeTransport::new());
    fake.on_get("/machine/active", json!({"info": null}));
    let ctx = Context::new(fake.clone());
    let prompter = ScriptedPrompter::new(true, "flag");

    let err = dispatch(&ctx, &SubmitMode::ActiveMachine, &prompter)
        .await
        .unwrap_err();
    assert!(matches!(err, LabError::NoActiveMachine));
}

#[tokio::test]
async fn test_difficulty_out_of_range_fails_before_network() {
    let fake = Arc::new(FakeTransport::new());
    let ctx = Context::new(fake.clone());
    let prompter = ScriptedPrompter::new(true, "flag");
    let mode = SubmitMode::Challenge {
        name: "Emdee".into(),
        difficulty: Some(11),
    };

    let err = dispatch(&ctx, &mode, &prompter).await.unwrap_err();

    assert!(matches!(err, LabError::Validation(_)));
    assert!(fake.requests().is_empty());
    assert_eq!(prompter.secrets.load(Ordering::SeqCst), 0);
}

#[tokio::test]
async fn test_challenge_payload_scales_difficulty() {
    let fake = Arc::new(FakeTransport::new());
    fake.on_get(
        "/search/fetch",
        json!({"challenges": [{"id": 12, "value": "Emdee five for life"}]}),
    );
    let ctx = Context::new(fake.clone());
    let prompter = ScriptedPrompter::new(true, "HTB{md5}");
    let mode = SubmitMode::Challenge {
        name: "Emdee".into(),
        difficulty: Some(5),
    };

    let request = ready(dispatch(&ctx, &mode, &prompter).await.unwrap());

    assert_eq!(request.endpoint, "/challenge/own");
    assert_eq!(
        json!(request.payload),
        json!({"challenge_id": 12, "difficulty": 50, "flag": "HTB{md5}"})
    );
    let search = &fake.requests()[0];
    assert!(search.query.contains(&("tags".to_string(), "challenges".to_string())));
}

#[tokio::test]
async fn test_challenge_without_rating_omits_difficulty() {
    let fake = Arc::new(FakeTransport::new());
    fake.on_get(
        "/search/fetch",
        json!({"challenges": [{"id": 12, "value": "Emdee five for life"}]}),
    );
    let ctx = Context::new(fake.clone());
    let prompter = ScriptedPrompter::new(true, "HTB{md5}");
    let mode = SubmitMode::Challenge {
        name: "Emdee".into(),
        difficulty: None,
    };

    let request = ready(dispatch(&ctx, &mode, &prompter).await.unwrap());
    assert!(!request.payload.contains_key("difficulty"));
}

#[tokio::test]
async fn test_fortress_flag_endpoint_and_payload() {
    let fake = Arc::new(FakeTransport::new());
    fake.on_get(
        "/fortresses",
        json!({"data": {
            "1": {"id": 1, "name": "Akerva"},
            "7": {"id": 7, "name": "Jet"}
        }}),
    );
    let ctx = Context::new(fake.clone());
    let prompter = ScriptedPrompter::new(true, "JET{flag}");

    let request = ready(
        dispatch(&ctx, &SubmitMode::Fortress { name: "jet".into() }, &prompter)
            .await
            .unwrap(),
    );

    assert!(request.endpoint.ends_with("/fortress/7/flag"));
    assert_eq!(json!(request.payload), json!({"flag": "JET{flag}"}));
}

#[tokio::test]
async fn test_prolab_flag_endpoint() {
    let fake = Arc::new(FakeTransport::new());
    fake.on_get(
        "/prolabs",
        json!({"data": {"labs": [
            {"id": 2, "name": "Dante"},
            {"id": 3, "name": "Offshore"}
        ]}}),
    );
    let ctx = Context::new(fake.clone());
    let prompter = ScriptedPrompter::new(true, "DANTE{x}");

    let request = ready(
        dispatch(&ctx, &SubmitMode::Prolab { name: "dante".into() }, &prompter)
            .await
            .unwrap(),
    );
    assert_eq!(request.endpoint, "/prolab/2/flag");
}

#[tokio::test]
async fn test_blank_flag_is_rejected_before_submit() {
    let fake = Arc::new(FakeTransport::new());
    fake.on_get("/prolabs", json!({"data": {"labs": [{"id": 2, "name": "Dante"}]}}));
    let ctx = Context::new(fake.clone());
    let prompter = ScriptedPrompter::new(true, "  \n");

    let err = dispatch(&ctx, &SubmitMode::Prolab { name: "Dante".into() }, &prompter)
        .await
        .unwrap_err();
    assert!(matches!(err, LabError::Validation(_)));
    assert!(fake.last_post().is_none());
}
