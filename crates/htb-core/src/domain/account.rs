//! Account state snapshot used for routing.

use htb_api::AccountInfo;
use serde::{Deserialize, Serialize};

use super::kind::ResourceRef;

/// Subscription tier of the authenticated account.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum SubscriptionTier {
    Free,
    Vip,
    VipPlus,
}

impl SubscriptionTier {
    pub const ALL: [SubscriptionTier; 3] = [
        SubscriptionTier::Free,
        SubscriptionTier::Vip,
        SubscriptionTier::VipPlus,
    ];

    /// Dedicated VIP wins over plain VIP access.
    pub fn from_account(info: &AccountInfo) -> Self {
        if info.is_dedicated_vip {
            SubscriptionTier::VipPlus
        } else if info.can_access_vip {
            SubscriptionTier::Vip
        } else {
            SubscriptionTier::Free
        }
    }

    pub fn is_vip(&self) -> bool {
        matches!(self, SubscriptionTier::Vip | SubscriptionTier::VipPlus)
    }
}

impl std::fmt::Display for SubscriptionTier {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            SubscriptionTier::Free => write!(f, "free"),
            SubscriptionTier::Vip => write!(f, "vip"),
            SubscriptionTier::VipPlus => write!(f, "vip+"),
        }
    }
}

/// Machine classification: ordinary, or the shared release-arena machine.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum MachineType {
    Standard,
    Release,
}

impl MachineType {
    pub const ALL: [MachineType; 2] = [MachineType::Standard, MachineType::Release];
}

impl std::fmt::Display for MachineType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            MachineType::Standard => write!(f, "standard"),
            MachineType::Release => write!(f, "release"),
        }
    }
}

/// Fresh per-operation snapshot; never cached across commands.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AccountState {
    pub subscription: SubscriptionTier,
    pub active: Option<ResourceRef>,
    pub machine_type: MachineType,
}
