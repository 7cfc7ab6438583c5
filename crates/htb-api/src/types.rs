//! Typed response structures, one per endpoint.
//!
//! The API is loose about scalar types (`retired` is `0`/`1` on some
//! endpoints and a bool on others, `stars` may be a string), so a few
//! fields go through the tolerant decoders at the bottom of this file.

use std::collections::BTreeMap;

use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;

/// Resource identifier as returned by the API: numeric for almost every
/// resource, text for a few search results.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ResourceId {
    Numeric(u64),
    Text(String),
}

impl ResourceId {
    /// Numeric value, parsing text ids that hold digits.
    pub fn as_u64(&self) -> Option<u64> {
        match self {
            ResourceId::Numeric(n) => Some(*n),
            ResourceId::Text(s) => s.parse().ok(),
        }
    }

    /// JSON value for request payloads; numeric ids stay numbers.
    pub fn to_json(&self) -> Value {
        match self.as_u64() {
            Some(n) => Value::from(n),
            None => Value::from(self.to_string()),
        }
    }
}

impl From<u64> for ResourceId {
    fn from(id: u64) -> Self {
        ResourceId::Numeric(id)
    }
}

impl From<&str> for ResourceId {
    fn from(id: &str) -> Self {
        match id.parse() {
            Ok(n) => ResourceId::Numeric(n),
            Err(_) => ResourceId::Text(id.to_string()),
        }
    }
}

impl std::fmt::Display for ResourceId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ResourceId::Numeric(n) => write!(f, "{n}"),
            ResourceId::Text(s) => write!(f, "{s}"),
        }
    }
}

/// `{message}` body returned by every mutating endpoint.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MessageResponse {
    pub message: String,
}

// ---------------------------------------------------------------------------
// Search
// ---------------------------------------------------------------------------

/// One search hit.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SearchItem {
    pub id: ResourceId,
    #[serde(alias = "name")]
    pub value: String,
}

/// `/search/fetch` body; each list is present only when it has hits.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SearchResponse {
    #[serde(default)]
    pub machines: Vec<SearchItem>,
    #[serde(default)]
    pub challenges: Vec<SearchItem>,
    #[serde(default, alias = "usernames")]
    pub users: Vec<SearchItem>,
}

/// Entry of the fortress or prolab catalogue.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CatalogueEntry {
    pub id: ResourceId,
    pub name: String,
}

/// `/fortresses` `data`: fortresses keyed by id.
pub type FortressCatalogue = BTreeMap<String, CatalogueEntry>;

/// `/prolabs` `data`.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ProlabCatalogue {
    #[serde(default)]
    pub labs: Vec<CatalogueEntry>,
}

// ---------------------------------------------------------------------------
// Account state
// ---------------------------------------------------------------------------

/// `/user/info` `info`.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AccountInfo {
    #[serde(rename = "canAccessVIP", default, deserialize_with = "loose_bool")]
    pub can_access_vip: bool,
    #[serde(rename = "isDedicatedVip", default, deserialize_with = "loose_bool")]
    pub is_dedicated_vip: bool,
}

/// `/machine/active` `info` when a machine is running.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ActiveMachine {
    pub id: ResourceId,
    pub name: String,
}

/// `/season/machine/active` `data`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ArenaMachine {
    pub id: ResourceId,
    pub name: String,
}

// ---------------------------------------------------------------------------
// Detail records
// ---------------------------------------------------------------------------

/// `/machine/profile/<id>` `info`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MachineProfile {
    pub id: ResourceId,
    pub name: String,
    #[serde(default)]
    pub os: Option<String>,
    #[serde(default, deserialize_with = "loose_bool")]
    pub retired: bool,
    #[serde(rename = "difficultyText", default)]
    pub difficulty_text: Option<String>,
    #[serde(default, deserialize_with = "loose_text")]
    pub stars: Option<String>,
    #[serde(default)]
    pub ip: Option<String>,
    #[serde(rename = "authUserInUserOwns", default, deserialize_with = "loose_bool")]
    pub user_owned: bool,
    #[serde(rename = "authUserInRootOwns", default, deserialize_with = "loose_bool")]
    pub root_owned: bool,
    #[serde(default)]
    pub last_reset_time: Option<String>,
    #[serde(default)]
    pub release: Option<String>,
}

/// `/challenge/info/<id>` `challenge`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChallengeInfo {
    pub id: ResourceId,
    pub name: String,
    #[serde(default)]
    pub category_name: Option<String>,
    #[serde(default, deserialize_with = "loose_bool")]
    pub retired: bool,
    #[serde(default, deserialize_with = "loose_text")]
    pub difficulty: Option<String>,
    #[serde(default, deserialize_with = "loose_text")]
    pub stars: Option<String>,
    #[serde(default, deserialize_with = "loose_text")]
    pub solves: Option<String>,
    #[serde(rename = "authUserSolve", default, deserialize_with = "loose_bool")]
    pub solved: bool,
    #[serde(default)]
    pub release_date: Option<String>,
}

/// Named reference such as a team or university.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NamedRef {
    pub name: String,
}

/// `/user/profile/basic/<id>` `profile`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UserProfile {
    pub id: ResourceId,
    pub name: String,
    #[serde(default, deserialize_with = "loose_text")]
    pub user_owns: Option<String>,
    #[serde(default, deserialize_with = "loose_text")]
    pub system_owns: Option<String>,
    #[serde(default, deserialize_with = "loose_text")]
    pub user_bloods: Option<String>,
    #[serde(default, deserialize_with = "loose_text")]
    pub system_bloods: Option<String>,
    #[serde(default)]
    pub team: Option<NamedRef>,
    #[serde(default)]
    pub university: Option<NamedRef>,
    #[serde(default)]
    pub rank: Option<String>,
    #[serde(default, deserialize_with = "loose_text")]
    pub ranking: Option<String>,
    #[serde(default, deserialize_with = "loose_text")]
    pub points: Option<String>,
}

/// One flag of a fortress or prolab.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FlagEntry {
    #[serde(default)]
    pub title: Option<String>,
    #[serde(default, deserialize_with = "loose_bool")]
    pub owned: bool,
}

/// `/fortress/<id>` and `/prolab/<id>/info` `data`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CompetitionDetail {
    pub id: ResourceId,
    pub name: String,
    #[serde(default)]
    pub flags: Vec<FlagEntry>,
    #[serde(default, deserialize_with = "loose_text")]
    pub progress_percent: Option<String>,
}

// ---------------------------------------------------------------------------
// Tolerant decoders
// ---------------------------------------------------------------------------

/// Accept `true`/`false`, `0`/`1`, `"0"`/`"1"`/`"true"` and null.
fn loose_bool<'de, D: Deserializer<'de>>(deserializer: D) -> Result<bool, D::Error> {
    Ok(match Value::deserialize(deserializer)? {
        Value::Bool(b) => b,
        Value::Number(n) => n.as_f64().map(|f| f != 0.0).unwrap_or(false),
        Value::String(s) => matches!(s.as_str(), "1" | "true" | "True"),
        _ => false,
    })
}

/// Render numbers and strings as text; null becomes `None`.
fn loose_text<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Option<String>, D::Error> {
    Ok(match Value::deserialize(deserializer)? {
        Value::Null => None,
        Value::String(s) => Some(s),
        other => Some(other.to_string()),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_resource_id_untagged() {
        let id: ResourceId = serde_json::from_value(json!(42)).unwrap();
        assert_eq!(id, ResourceId::Numeric(42));
        let id: ResourceId = serde_json::from_value(json!("abc")).unwrap();
        assert_eq!(id, ResourceId::Text("abc".into()));
        assert_eq!(ResourceId::from("17").to_json(), json!(17));
        assert_eq!(ResourceId::Text("x1".into()).to_json(), json!("x1"));
    }

    #[test]
    fn test_machine_profile_loose_fields() {
        let profile: MachineProfile = serde_json::from_value(json!({
            "id": 1,
            "name": "Lame",
            "os": "Linux",
            "retired": 1,
            "difficultyText": "Easy",
            "stars": 4.5,
            "ip": null,
            "authUserInUserOwns": true,
            "authUserInRootOwns": null,
            "release": "2017-03-14T19:00:00.000000Z"
        }))
        .unwrap();
        assert!(profile.retired);
        assert_eq!(profile.stars.as_deref(), Some("4.5"));
        assert!(profile.ip.is_none());
        assert!(profile.user_owned);
        assert!(!profile.root_owned);
    }

    #[test]
    fn test_search_response_missing_lists_default_empty() {
        let search: SearchResponse =
            serde_json::from_value(json!({"machines": [{"id": 1, "value": "Lame"}]})).unwrap();
        assert_eq!(search.machines.len(), 1);
        assert!(search.challenges.is_empty());
        assert!(search.users.is_empty());
    }

    #[test]
    fn test_account_records_ignore_unread_fields() {
        let info: AccountInfo = serde_json::from_value(json!({
            "id": 7,
            "name": "alice",
            "canAccessVIP": 1,
            "isDedicatedVip": false
        }))
        .unwrap();
        assert!(info.can_access_vip);
        assert!(!info.is_dedicated_vip);

        let active: ActiveMachine =
            serde_json::from_value(json!({"id": 1, "name": "Lame", "type": "Starting Point"}))
                .unwrap();
        assert_eq!(
            serde_json::to_value(&active).unwrap(),
            json!({"id": 1, "name": "Lame"})
        );
    }
}
