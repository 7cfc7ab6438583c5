//! Composite records: one required detail query plus optional enrichment.
//!
//! The primary query decides success; auxiliary queries run concurrently
//! and a failure in any of them is recorded as `Unavailable` for that
//! source only. Auxiliary results are keyed in a `BTreeMap`, so the
//! record's ordering never depends on completion order.

use std::collections::BTreeMap;

use chrono::{DateTime, NaiveDate};
use futures::future::join_all;
use htb_api::{ChallengeInfo, CompetitionDetail, MachineProfile, UserProfile};
use serde::Serialize;
use serde_json::Value;

use crate::context::Context;
use crate::domain::{ResourceKind, ResourceRef, Result};
use crate::metrics::METRICS;
use crate::obs;
use crate::probe::UNDEFINED_ADDRESS;

/// Detail record of the subject, typed by kind.
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "kind", content = "record", rename_all = "snake_case")]
pub enum PrimaryRecord {
    Machine(MachineProfile),
    Challenge(ChallengeInfo),
    User(UserProfile),
    Fortress(CompetitionDetail),
    Prolab(CompetitionDetail),
}

/// Result of one auxiliary query.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum AuxiliaryData {
    Available(Value),
    Unavailable(String),
}

impl AuxiliaryData {
    pub fn is_available(&self) -> bool {
        matches!(self, AuxiliaryData::Available(_))
    }
}

/// Merged view of a subject. Partial data is a valid result.
#[derive(Debug, Clone, Serialize)]
pub struct CompositeRecord {
    pub subject: ResourceRef,
    pub primary: PrimaryRecord,
    pub auxiliary: BTreeMap<String, AuxiliaryData>,
}

/// An auxiliary endpoint: GET `{prefix}{id}`, record under `envelope`.
#[derive(Debug, Clone, Copy)]
pub struct AuxiliarySource {
    pub name: &'static str,
    pub prefix: &'static str,
    pub envelope: &'static str,
}

const USER_SOURCES: &[AuxiliarySource] = &[
    AuxiliarySource {
        name: "Fortresses",
        prefix: "/user/profile/progress/fortress/",
        envelope: "profile",
    },
    AuxiliarySource {
        name: "Endgames",
        prefix: "/user/profile/progress/endgame/",
        envelope: "profile",
    },
    AuxiliarySource {
        name: "Prolabs",
        prefix: "/user/profile/progress/prolab/",
        envelope: "profile",
    },
    AuxiliarySource {
        name: "Activity",
        prefix: "/user/profile/activity/",
        envelope: "profile",
    },
];

const MACHINE_SOURCES: &[AuxiliarySource] = &[AuxiliarySource {
    name: "Activity",
    prefix: "/machine/activity/",
    envelope: "info",
}];

const CHALLENGE_SOURCES: &[AuxiliarySource] = &[AuxiliarySource {
    name: "Activity",
    prefix: "/challenge/activity/",
    envelope: "info",
}];

/// Fixed auxiliary set for a kind.
pub fn auxiliary_sources(kind: ResourceKind) -> &'static [AuxiliarySource] {
    match kind {
        ResourceKind::Machine => MACHINE_SOURCES,
        ResourceKind::Challenge => CHALLENGE_SOURCES,
        ResourceKind::User => USER_SOURCES,
        ResourceKind::Fortress | ResourceKind::Prolab => &[],
    }
}

/// Fetch the primary record (required) and every auxiliary record.
pub async fn aggregate(ctx: &Context, subject: &ResourceRef) -> Result<CompositeRecord> {
    let primary = fetch_primary(ctx, subject).await?;
    let auxiliary = fetch_auxiliary(ctx, subject, auxiliary_sources(subject.kind)).await;
    Ok(CompositeRecord {
        subject: subject.clone(),
        primary,
        auxiliary,
    })
}

async fn fetch_primary(ctx: &Context, subject: &ResourceRef) -> Result<PrimaryRecord> {
    let id = &subject.id;
    Ok(match subject.kind {
        ResourceKind::Machine => PrimaryRecord::Machine(
            ctx.get_envelope(&format!("/machine/profile/{id}"), "info")
                .await?,
        ),
        ResourceKind::Challenge => PrimaryRecord::Challenge(
            ctx.get_envelope(&format!("/challenge/info/{id}"), "challenge")
                .await?,
        ),
        ResourceKind::User => PrimaryRecord::User(
            ctx.get_envelope(&format!("/user/profile/basic/{id}"), "profile")
                .await?,
        ),
        ResourceKind::Fortress => {
            PrimaryRecord::Fortress(ctx.get_envelope(&format!("/fortress/{id}"), "data").await?)
        }
        ResourceKind::Prolab => PrimaryRecord::Prolab(
            ctx.get_envelope(&format!("/prolab/{id}/info"), "data")
                .await?,
        ),
    })
}

/// Run `sources` concurrently; failures become `Unavailable`.
pub async fn fetch_auxiliary(
    ctx: &Context,
    subject: &ResourceRef,
    sources: &[AuxiliarySource],
) -> BTreeMap<String, AuxiliaryData> {
    let queries = sources.iter().map(|source| async move {
        let path = format!("{}{}", source.prefix, subject.id);
        let data = match ctx.get_envelope::<Value>(&path, source.envelope).await {
            Ok(value) => AuxiliaryData::Available(value),
            Err(err) => {
                METRICS.inc_auxiliary_failures();
                obs::emit_auxiliary_unavailable(source.name, &err);
                AuxiliaryData::Unavailable(err.to_string())
            }
        };
        (source.name.to_string(), data)
    });
    join_all(queries).await.into_iter().collect()
}

/// Column headers for a kind, matching [`CompositeRecord::fields`].
pub fn field_names(kind: ResourceKind) -> &'static [&'static str] {
    match kind {
        ResourceKind::Machine => &[
            "Name",
            "OS",
            "Retired",
            "Difficulty",
            "Stars",
            "IP",
            "Status",
            "Last Reset",
            "Release",
        ],
        ResourceKind::Challenge => &[
            "Name",
            "Category",
            "Retired",
            "Difficulty",
            "Stars",
            "Solves",
            "Status",
            "Release",
        ],
        ResourceKind::User => &[
            "Name",
            "User Owns",
            "System Owns",
            "User Bloods",
            "System Bloods",
            "Team",
            "University",
            "Rank",
            "Global Rank",
            "Points",
        ],
        ResourceKind::Fortress | ResourceKind::Prolab => &["Name", "Flags", "Progress"],
    }
}

impl CompositeRecord {
    /// Rendered values, in the order of [`field_names`] for the kind.
    pub fn fields(&self) -> Vec<(&'static str, String)> {
        let values = match &self.primary {
            PrimaryRecord::Machine(m) => vec![
                m.name.clone(),
                text(&m.os),
                yes_no(m.retired),
                text(&m.difficulty_text),
                text(&m.stars),
                m.ip.clone()
                    .filter(|ip| !ip.is_empty())
                    .unwrap_or_else(|| UNDEFINED_ADDRESS.to_string()),
                machine_status(m.user_owned, m.root_owned).to_string(),
                text(&m.last_reset_time),
                date(&m.release),
            ],
            PrimaryRecord::Challenge(c) => vec![
                c.name.clone(),
                text(&c.category_name),
                yes_no(c.retired),
                text(&c.difficulty),
                text(&c.stars),
                text(&c.solves),
                if c.solved { "Solved" } else { "Not solved" }.to_string(),
                date(&c.release_date),
            ],
            PrimaryRecord::User(u) => vec![
                u.name.clone(),
                text(&u.user_owns),
                text(&u.system_owns),
                text(&u.user_bloods),
                text(&u.system_bloods),
                u.team.as_ref().map(|t| t.name.clone()).unwrap_or_else(|| "-".into()),
                u.university
                    .as_ref()
                    .map(|t| t.name.clone())
                    .unwrap_or_else(|| "-".into()),
                text(&u.rank),
                text(&u.ranking),
                text(&u.points),
            ],
            PrimaryRecord::Fortress(d) | PrimaryRecord::Prolab(d) => {
                let owned = d.flags.iter().filter(|f| f.owned).count();
                vec![
                    d.name.clone(),
                    format!("{owned}/{}", d.flags.len()),
                    d.progress_percent
                        .as_ref()
                        .map(|p| format!("{p}%"))
                        .unwrap_or_else(|| "-".into()),
                ]
            }
        };
        field_names(self.subject.kind)
            .iter()
            .copied()
            .zip(values)
            .collect()
    }

    /// Names of the auxiliary sources that failed.
    pub fn unavailable(&self) -> Vec<&str> {
        self.auxiliary
            .iter()
            .filter(|(_, data)| !data.is_available())
            .map(|(name, _)| name.as_str())
            .collect()
    }
}

fn text(value: &Option<String>) -> String {
    value.clone().unwrap_or_else(|| "-".to_string())
}

fn yes_no(flag: bool) -> String {
    if flag { "Yes" } else { "No" }.to_string()
}

fn machine_status(user: bool, root: bool) -> &'static str {
    match (user, root) {
        (true, true) => "User & Root",
        (true, false) => "User",
        (false, true) => "Root",
        (false, false) => "None",
    }
}

/// `YYYY-MM-DD` for RFC 3339 or plain dates; anything else verbatim.
pub fn date(value: &Option<String>) -> String {
    let Some(raw) = value.as_deref() else {
        return "-".to_string();
    };
    if let Ok(dt) = DateTime::parse_from_rfc3339(raw) {
        return dt.format("%Y-%m-%d").to_string();
    }
    if let Some(day) = raw.get(..10) {
        if let Ok(d) = NaiveDate::parse_from_str(day, "%Y-%m-%d") {
            return d.format("%Y-%m-%d").to_string();
        }
    }
    raw.to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use htb_api::fakes::FakeTransport;
    use serde_json::json;
    use std::sync::Arc;

    #[test]
    fn test_date_formats() {
        assert_eq!(date(&Some("2017-03-14T19:00:00.000000Z".into())), "2017-03-14");
        assert_eq!(date(&Some("2021-06-05 17:00:00".into())), "2021-06-05");
        assert_eq!(date(&Some("soon".into())), "soon");
        assert_eq!(date(&None), "-");
    }

    #[test]
    fn test_machine_status() {
        assert_eq!(machine_status(true, true), "User & Root");
        assert_eq!(machine_status(false, false), "None");
    }

    fn user_fake() -> Arc<FakeTransport> {
        let fake = Arc::new(FakeTransport::new());
        fake.on_get(
            "/user/profile/basic/42",
            json!({"profile": {
                "id": 42, "name": "alice", "user_owns": 10, "system_owns": 8,
                "team": {"name": "Wolves"}, "university": null, "rank": "Hacker",
                "ranking": 1234, "points": 55
            }}),
        )
        .on_get("/user/profile/progress/fortress/42", json!({"profile": {"fortresses": []}}))
        .on_get("/user/profile/progress/endgame/42", json!({"profile": {"endgames": []}}))
        .on_get("/user/profile/progress/prolab/42", json!({"profile": {"prolabs": []}}));
        fake
    }

    #[tokio::test]
    async fn test_auxiliary_failure_is_isolated() {
        let fake = user_fake();
        fake.fail_get("/user/profile/activity/42", 500);
        let ctx = Context::new(fake.clone());
        let alice = ResourceRef::new(ResourceKind::User, 42u64, "alice");

        let record = aggregate(&ctx, &alice).await.unwrap();

        assert_eq!(record.auxiliary.len(), 4);
        assert_eq!(record.unavailable(), vec!["Activity"]);
        assert!(record.auxiliary["Fortresses"].is_available());
        let fields = record.fields();
        assert_eq!(fields[0], ("Name", "alice".to_string()));
        assert_eq!(fields[5], ("Team", "Wolves".to_string()));
        assert_eq!(fields[6], ("University", "-".to_string()));
    }

    #[tokio::test]
    async fn test_primary_failure_fails_aggregate() {
        let fake = Arc::new(FakeTransport::new());
        fake.fail_get("/machine/profile/1", 500)
            .on_get("/machine/activity/1", json!({"info": {"activity": []}}));
        let ctx = Context::new(fake.clone());
        let lame = ResourceRef::new(ResourceKind::Machine, 1u64, "Lame");

        assert!(aggregate(&ctx, &lame).await.is_err());
    }

    #[tokio::test]
    async fn test_fortress_has_no_auxiliary() {
        let fake = Arc::new(FakeTransport::new());
        fake.on_get(
            "/fortress/7",
            json!({"data": {"id": 7, "name": "Jet", "progress_percent": 50,
                "flags": [{"title": "a", "owned": true}, {"title": "b", "owned": false}]}}),
        );
        let ctx = Context::new(fake.clone());
        let jet = ResourceRef::new(ResourceKind::Fortress, 7u64, "Jet");

        let record = aggregate(&ctx, &jet).await.unwrap();
        assert!(record.auxiliary.is_empty());
        assert_eq!(fake.requests().len(), 1);
        assert_eq!(
            record.fields(),
            vec![
                ("Name", "Jet".to_string()),
                ("Flags", "1/2".to_string()),
                ("Progress", "50%".to_string()),
            ]
        );
    }

    #[test]
    fn test_field_sets_per_kind() {
        for kind in ResourceKind::ALL {
            assert!(!field_names(kind).is_empty());
            assert_eq!(field_names(kind)[0], "Name");
        }
        assert!(auxiliary_sources(ResourceKind::Fortress).is_empty());
        assert_eq!(auxiliary_sources(ResourceKind::User).len(), 4);
    }
}
