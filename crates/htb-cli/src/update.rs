//! Release check against the project's latest GitHub release.

use anyhow::{bail, Result};
use serde::Deserialize;

pub const RELEASES_URL: &str = "https://api.github.com/repos/GoToolSharing/htb-cli/releases/latest";

#[derive(Debug, Deserialize)]
struct ReleasePayload {
    tag_name: String,
}

/// How the running version compares with the latest release.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum UpdateStatus {
    UpToDate,
    Available { latest: String },
}

impl UpdateStatus {
    pub fn message(&self, current: &str) -> String {
        match self {
            UpdateStatus::UpToDate => format!("htb-cli {current} is up to date"),
            UpdateStatus::Available { latest } => {
                format!("A new version is available: {latest} (current: {current})")
            }
        }
    }
}

/// Fetch the latest release tag, without any leading `v`.
pub async fn latest_release(client: &reqwest::Client, url: &str) -> Result<String> {
    let response = client
        .get(url)
        .header("Accept", "application/vnd.github+json")
        .header("User-Agent", concat!("htb-cli/", env!("CARGO_PKG_VERSION")))
        .send()
        .await?;
    let status = response.status();
    if !status.is_success() {
        let body = response.text().await.unwrap_or_default();
        bail!("failed to resolve latest release: HTTP {status} {body}");
    }
    let payload: ReleasePayload = response.json().await?;
    Ok(normalize_tag(&payload.tag_name))
}

/// Compare dotted versions numerically; a newer or equal current is up to date.
pub fn compare(current: &str, latest: &str) -> UpdateStatus {
    if parse_version(latest) > parse_version(current) {
        UpdateStatus::Available {
            latest: normalize_tag(latest),
        }
    } else {
        UpdateStatus::UpToDate
    }
}

fn normalize_tag(tag: &str) -> String {
    tag.trim().trim_start_matches('v').to_string()
}

fn parse_version(version: &str) -> Vec<u64> {
    normalize_tag(version)
        .split(['.', '-'])
        .map_while(|part| part.parse().ok())
        .collect()
}
