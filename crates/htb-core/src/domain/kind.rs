//! Resource kinds and resolved references.

use htb_api::ResourceId;
use serde::{Deserialize, Serialize};

/// Kind of remote entity a command targets.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ResourceKind {
    Machine,
    Challenge,
    Fortress,
    Prolab,
    User,
}

impl ResourceKind {
    /// Every kind, in declaration order.
    pub const ALL: [ResourceKind; 5] = [
        ResourceKind::Machine,
        ResourceKind::Challenge,
        ResourceKind::Fortress,
        ResourceKind::Prolab,
        ResourceKind::User,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            ResourceKind::Machine => "machine",
            ResourceKind::Challenge => "challenge",
            ResourceKind::Fortress => "fortress",
            ResourceKind::Prolab => "prolab",
            ResourceKind::User => "user",
        }
    }
}

impl std::fmt::Display for ResourceKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A resolved target. Identity is the `(kind, id)` pair; the display
/// name is carried along for messages only.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ResourceRef {
    pub kind: ResourceKind,
    pub id: ResourceId,
    pub name: String,
}

impl ResourceRef {
    pub fn new(kind: ResourceKind, id: impl Into<ResourceId>, name: impl Into<String>) -> Self {
        Self {
            kind,
            id: id.into(),
            name: name.into(),
        }
    }
}

impl PartialEq for ResourceRef {
    fn eq(&self, other: &Self) -> bool {
        self.kind == other.kind && self.id == other.id
    }
}

impl Eq for ResourceRef {}

impl std::hash::Hash for ResourceRef {
    fn hash<H: std::hash::Hasher>(&self, state: &mut H) {
        self.kind.hash(state);
        self.id.hash(state);
    }
}

impl std::fmt::Display for ResourceRef {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{} {} (#{})", self.kind, self.name, self.id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_identity_ignores_display_name() {
        let a = ResourceRef::new(ResourceKind::Machine, 1u64, "Lame");
        let b = ResourceRef::new(ResourceKind::Machine, 1u64, "lame");
        let c = ResourceRef::new(ResourceKind::Challenge, 1u64, "Lame");
        assert_eq!(a, b);
        assert_ne!(a, c);
    }

    #[test]
    fn test_display() {
        let r = ResourceRef::new(ResourceKind::Fortress, 7u64, "Jet");
        assert_eq!(r.to_string(), "fortress Jet (#7)");
    }
}
