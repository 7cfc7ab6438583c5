//! Route selection for machine operations.
//!
//! A pure decision table over (operation, machine type, subscription
//! tier), evaluated in this order:
//!
//! 1. release-arena machine: arena endpoint, empty payload
//! 2. VIP / VIP+: personal VM endpoint, payload carries the machine id
//! 3. free tier: per-machine endpoint, empty payload
//!
//! Release status always wins over the subscription tier.

use serde_json::{Map, Value};

use crate::domain::{AccountState, MachineType, ResourceRef, SubscriptionTier};
use crate::obs;

/// Operation performed on a machine.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum OperationKind {
    Start,
    Stop,
    Reset,
    Own,
}

impl OperationKind {
    pub const ALL: [OperationKind; 4] = [
        OperationKind::Start,
        OperationKind::Stop,
        OperationKind::Reset,
        OperationKind::Own,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            OperationKind::Start => "start",
            OperationKind::Stop => "stop",
            OperationKind::Reset => "reset",
            OperationKind::Own => "own",
        }
    }
}

/// How the machine address becomes known after a start.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Provisioning {
    /// Address is readable right after the request.
    Immediate,
    /// Address appears asynchronously; poll until ready.
    Poll,
}

/// Endpoint and payload template for one request.
#[derive(Debug, Clone, PartialEq)]
pub struct Route {
    pub endpoint: String,
    pub payload: Map<String, Value>,
    pub provisioning: Provisioning,
}

impl Route {
    fn empty(endpoint: impl Into<String>, provisioning: Provisioning) -> Self {
        Self {
            endpoint: endpoint.into(),
            payload: Map::new(),
            provisioning,
        }
    }

    fn with_field(mut self, key: &str, value: Value) -> Self {
        self.payload.insert(key.to_string(), value);
        self
    }
}

/// Choose the route for `op` on `target` given the account snapshot.
pub fn select(op: OperationKind, target: &ResourceRef, state: &AccountState) -> Route {
    let route = route_for(op, target, state.machine_type, state.subscription);
    obs::emit_route_selected(
        op.as_str(),
        &route.endpoint,
        &state.machine_type.to_string(),
        &state.subscription.to_string(),
    );
    route
}

/// Own route; the subscription tier plays no part in it.
pub fn own_route(target: &ResourceRef, machine_type: MachineType) -> Route {
    let endpoint = match machine_type {
        MachineType::Release => "/arena/own",
        MachineType::Standard => "/machine/own",
    };
    Route::empty(endpoint, Provisioning::Immediate).with_field("id", target.id.to_json())
}

/// The decision table itself.
pub fn route_for(
    op: OperationKind,
    target: &ResourceRef,
    machine_type: MachineType,
    tier: SubscriptionTier,
) -> Route {
    use MachineType::*;
    use OperationKind::*;
    use SubscriptionTier::*;

    let machine_id = || target.id.to_json();

    match (op, machine_type, tier) {
        (Own, _, _) => own_route(target, machine_type),

        (Start, Release, _) => Route::empty("/arena/start", Provisioning::Poll),
        (Start, Standard, VipPlus) => {
            Route::empty("/vm/spawn", Provisioning::Poll).with_field("machine_id", machine_id())
        }
        (Start, Standard, Vip) => {
            Route::empty("/vm/spawn", Provisioning::Immediate).with_field("machine_id", machine_id())
        }
        (Start, Standard, Free) => {
            Route::empty(format!("/machine/play/{}", target.id), Provisioning::Immediate)
        }

        (Stop, Release, _) => Route::empty("/arena/stop", Provisioning::Immediate),
        (Stop, Standard, Vip | VipPlus) => Route::empty("/vm/terminate", Provisioning::Immediate)
            .with_field("machine_id", machine_id()),
        (Stop, Standard, Free) => Route::empty("/machine/stop", Provisioning::Immediate),

        (Reset, Release, _) => Route::empty("/arena/reset", Provisioning::Immediate),
        (Reset, Standard, _) => Route::empty("/vm/reset", Provisioning::Immediate)
            .with_field("machine_id", machine_id()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::ResourceKind;
    use serde_json::json;

    fn lame() -> ResourceRef {
        ResourceRef::new(ResourceKind::Machine, 1u64, "Lame")
    }

    fn state(machine_type: MachineType, subscription: SubscriptionTier) -> AccountState {
        AccountState {
            subscription,
            active: None,
            machine_type,
        }
    }

    #[test]
    fn test_release_overrides_vip_plus() {
        let route = select(
            OperationKind::Start,
            &lame(),
            &state(MachineType::Release, SubscriptionTier::VipPlus),
        );
        assert_eq!(route.endpoint, "/arena/start");
        assert!(route.payload.is_empty());
        assert_eq!(route.provisioning, Provisioning::Poll);
    }

    #[test]
    fn test_vip_spawn_carries_machine_id() {
        let route = route_for(
            OperationKind::Start,
            &lame(),
            MachineType::Standard,
            SubscriptionTier::Vip,
        );
        assert_eq!(route.endpoint, "/vm/spawn");
        assert_eq!(route.payload.get("machine_id"), Some(&json!(1)));
        assert_eq!(route.provisioning, Provisioning::Immediate);

        let route = route_for(
            OperationKind::Start,
            &lame(),
            MachineType::Standard,
            SubscriptionTier::VipPlus,
        );
        assert_eq!(route.provisioning, Provisioning::Poll);
    }

    #[test]
    fn test_free_tier_play_endpoint() {
        let route = route_for(
            OperationKind::Start,
            &lame(),
            MachineType::Standard,
            SubscriptionTier::Free,
        );
        assert_eq!(route.endpoint, "/machine/play/1");
        assert!(route.payload.is_empty());
    }

    #[test]
    fn test_own_route_by_machine_type() {
        let route = own_route(&lame(), MachineType::Release);
        assert_eq!(route.endpoint, "/arena/own");
        assert_eq!(route.payload.get("id"), Some(&json!(1)));
        assert_eq!(own_route(&lame(), MachineType::Standard).endpoint, "/machine/own");
    }

    #[test]
    fn test_table_is_total_and_deterministic() {
        for op in OperationKind::ALL {
            for machine_type in MachineType::ALL {
                for tier in SubscriptionTier::ALL {
                    let a = route_for(op, &lame(), machine_type, tier);
                    let b = route_for(op, &lame(), machine_type, tier);
                    assert_eq!(a, b);
                    assert!(a.endpoint.starts_with('/'));
                    if machine_type == MachineType::Release {
                        assert!(
                            a.endpoint.starts_with("/arena/"),
                            "{op:?}/{tier:?} on release went to {}",
                            a.endpoint
                        );
                    }
                }
            }
        }
    }
}
