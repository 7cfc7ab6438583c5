//! Account-state queries used for routing decisions.
//!
//! Every field of [`AccountState`] is required: a failure in any of the
//! three queries fails the whole probe.

use htb_api::{AccountInfo, ActiveMachine, ArenaMachine, MachineProfile, ResourceId};
use serde_json::Value;
use tracing::debug;

use crate::context::Context;
use crate::domain::{AccountState, MachineType, ResourceKind, ResourceRef, Result, SubscriptionTier};

/// Placeholder the API reports while a machine has no address yet.
pub const UNDEFINED_ADDRESS: &str = "Undefined";

/// Current subscription tier.
pub async fn subscription(ctx: &Context) -> Result<SubscriptionTier> {
    let info: AccountInfo = ctx.get_envelope("/user/info", "info").await?;
    Ok(SubscriptionTier::from_account(&info))
}

/// The machine currently running for this account, if any.
pub async fn active_machine(ctx: &Context) -> Result<Option<ResourceRef>> {
    let active: Option<ActiveMachine> = ctx.get_envelope("/machine/active", "info").await?;
    Ok(active.map(|m| ResourceRef::new(ResourceKind::Machine, m.id, m.name)))
}

/// Release iff `id` is the current release-arena machine.
pub async fn machine_type(ctx: &Context, id: &ResourceId) -> Result<MachineType> {
    let arena: Option<ArenaMachine> = ctx.get_envelope("/season/machine/active", "data").await?;
    Ok(match arena {
        Some(machine) if &machine.id == id => MachineType::Release,
        _ => MachineType::Standard,
    })
}

/// Snapshot subscription, active machine and the type of `target`.
pub async fn probe(ctx: &Context, target: &ResourceRef) -> Result<AccountState> {
    let machine_type = machine_type(ctx, &target.id).await?;
    let subscription = subscription(ctx).await?;
    let active = active_machine(ctx).await?;
    debug!(
        machine_type = %machine_type,
        subscription = %subscription,
        active = ?active.as_ref().map(|a| a.name.as_str()),
        "account state probed"
    );
    Ok(AccountState {
        subscription,
        active,
        machine_type,
    })
}

/// Full profile record of a machine.
pub async fn machine_profile(ctx: &Context, id: &ResourceId) -> Result<MachineProfile> {
    ctx.get_envelope(&format!("/machine/profile/{id}"), "info").await
}

/// Address of the active machine, `None` while still provisioning.
pub async fn active_machine_address(ctx: &Context) -> Result<Option<String>> {
    let Some(active) = active_machine(ctx).await? else {
        return Ok(None);
    };
    let profile: Value = ctx
        .get_envelope(&format!("/machine/profile/{}", active.id), "info")
        .await?;
    Ok(usable_address(profile.get("ip")))
}

/// Absent, null, empty and the `"Undefined"` sentinel all mean "not yet".
pub fn usable_address(ip: Option<&Value>) -> Option<String> {
    match ip {
        Some(Value::String(s)) if !s.trim().is_empty() && s != UNDEFINED_ADDRESS => {
            Some(s.trim().to_string())
        }
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use htb_api::fakes::FakeTransport;
    use serde_json::json;
    use std::sync::Arc;

    #[test]
    fn test_usable_address_sentinels() {
        assert_eq!(usable_address(None), None);
        assert_eq!(usable_address(Some(&Value::Null)), None);
        assert_eq!(usable_address(Some(&json!(""))), None);
        assert_eq!(usable_address(Some(&json!("Undefined"))), None);
        assert_eq!(
            usable_address(Some(&json!("10.10.11.5"))),
            Some("10.10.11.5".to_string())
        );
    }

    #[tokio::test]
    async fn test_probe_collects_all_fields() {
        let fake = Arc::new(FakeTransport::new());
        fake.on_get("/season/machine/active", json!({"data": {"id": 9, "name": "Arena"}}))
            .on_get("/user/info", json!({"info": {"canAccessVIP": true, "isDedicatedVip": false}}))
            .on_get("/machine/active", json!({"info": {"id": 3, "name": "Lame"}}));
        let ctx = Context::new(fake.clone());

        let target = ResourceRef::new(ResourceKind::Machine, 9u64, "Arena");
        let state = probe(&ctx, &target).await.unwrap();

        assert_eq!(state.machine_type, MachineType::Release);
        assert_eq!(state.subscription, SubscriptionTier::Vip);
        assert_eq!(
            state.active,
            Some(ResourceRef::new(ResourceKind::Machine, 3u64, "Lame"))
        );
    }

    #[tokio::test]
    async fn test_probe_fails_when_any_query_fails() {
        let fake = Arc::new(FakeTransport::new());
        fake.on_get("/season/machine/active", json!({"data": {"id": 9, "name": "Arena"}}))
            .fail_get("/user/info", 500)
            .on_get("/machine/active", json!({"info": null}));
        let ctx = Context::new(fake.clone());

        let target = ResourceRef::new(ResourceKind::Machine, 1u64, "Lame");
        assert!(probe(&ctx, &target).await.is_err());
    }

    #[tokio::test]
    async fn test_no_active_machine() {
        let fake = Arc::new(FakeTransport::new());
        fake.on_get("/machine/active", json!({"info": null}));
        let ctx = Context::new(fake.clone());

        assert_eq!(active_machine(&ctx).await.unwrap(), None);
        assert_eq!(active_machine_address(&ctx).await.unwrap(), None);
    }
}
