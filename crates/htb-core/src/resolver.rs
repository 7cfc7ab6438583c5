//! Name → identifier resolution.
//!
//! Machines, challenges and users are looked up through the fuzzy search
//! endpoint; fortresses and prolabs through their catalogues. Either way
//! the candidates go through [`disambiguate`], which never guesses: a
//! term matching several candidates resolves only if exactly one of them
//! carries that exact name (case-insensitive).

use htb_api::{
    ApiRequest, ArenaMachine, CatalogueEntry, FortressCatalogue, ProlabCatalogue, ResourceId,
    SearchItem, SearchResponse,
};
use tracing::debug;

use crate::context::Context;
use crate::domain::{LabError, ResourceKind, ResourceRef, Result};
use crate::obs;

/// Resolve `name` to a resource of `kind`.
pub async fn resolve(ctx: &Context, name: &str, kind: ResourceKind) -> Result<ResourceRef> {
    let term = name.trim();
    if term.is_empty() {
        return Err(LabError::Validation(format!("empty {kind} name")));
    }

    let candidates = match kind {
        ResourceKind::Machine | ResourceKind::Challenge | ResourceKind::User => {
            search(ctx, term, kind).await?
        }
        ResourceKind::Fortress => {
            let catalogue: FortressCatalogue = ctx.get_envelope("/fortresses", "data").await?;
            filter_catalogue(catalogue.into_values(), term)
        }
        ResourceKind::Prolab => {
            let catalogue: ProlabCatalogue = ctx.get_envelope("/prolabs", "data").await?;
            filter_catalogue(catalogue.labs.into_iter(), term)
        }
    };
    debug!(kind = %kind, term = %term, candidates = candidates.len(), "search finished");

    let resolved = disambiguate(kind, term, candidates)?;
    obs::emit_target_resolved(&resolved);
    Ok(resolved)
}

/// The machine currently running in the release arena.
pub async fn release_arena_machine(ctx: &Context) -> Result<ResourceRef> {
    let machine: ArenaMachine = ctx.get_envelope("/season/machine/active", "data").await?;
    let resolved = ResourceRef::new(ResourceKind::Machine, machine.id, machine.name);
    obs::emit_target_resolved(&resolved);
    Ok(resolved)
}

async fn search(ctx: &Context, term: &str, kind: ResourceKind) -> Result<Vec<(ResourceId, String)>> {
    let tag = match kind {
        ResourceKind::Machine => "machines",
        ResourceKind::Challenge => "challenges",
        _ => "users",
    };
    let request = ApiRequest::get("/search/fetch")
        .with_query("query", term)
        .with_query("tags", tag);
    let response: SearchResponse = ctx.get(request).await?;

    let hits: Vec<SearchItem> = match kind {
        ResourceKind::Machine => response.machines,
        ResourceKind::Challenge => response.challenges,
        _ => response.users,
    };
    Ok(hits.into_iter().map(|hit| (hit.id, hit.value)).collect())
}

fn filter_catalogue(
    entries: impl Iterator<Item = CatalogueEntry>,
    term: &str,
) -> Vec<(ResourceId, String)> {
    let needle = term.to_lowercase();
    entries
        .filter(|entry| entry.name.to_lowercase().contains(&needle))
        .map(|entry| (entry.id, entry.name))
        .collect()
}

/// Pick the single candidate for `term`, or explain why there is none.
pub fn disambiguate(
    kind: ResourceKind,
    term: &str,
    candidates: Vec<(ResourceId, String)>,
) -> Result<ResourceRef> {
    match candidates.len() {
        0 => Err(LabError::NotFound {
            kind,
            term: term.to_string(),
        }),
        1 => {
            let (id, name) = candidates.into_iter().next().ok_or_else(|| LabError::NotFound {
                kind,
                term: term.to_string(),
            })?;
            Ok(ResourceRef::new(kind, id, name))
        }
        _ => {
            let mut exact = candidates
                .iter()
                .filter(|(_, name)| name.eq_ignore_ascii_case(term));
            match (exact.next(), exact.next()) {
                (Some((id, name)), None) => Ok(ResourceRef::new(kind, id.clone(), name.clone())),
                _ => Err(LabError::Ambiguous {
                    kind,
                    term: term.to_string(),
                    candidates: candidates.into_iter().map(|(_, name)| name).collect(),
                }),
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn cand(id: u64, name: &str) -> (ResourceId, String) {
        (ResourceId::Numeric(id), name.to_string())
    }

    #[test]
    fn test_single_candidate_resolves() {
        let r = disambiguate(ResourceKind::Machine, "lam", vec![cand(1, "Lame")]).unwrap();
        assert_eq!(r.id, ResourceId::Numeric(1));
        assert_eq!(r.name, "Lame");
        assert_eq!(r.kind, ResourceKind::Machine);
    }

    #[test]
    fn test_zero_candidates_not_found() {
        let err = disambiguate(ResourceKind::Machine, "nope", vec![]).unwrap_err();
        assert!(matches!(err, LabError::NotFound { ref term, .. } if term == "nope"));
    }

    #[test]
    fn test_exact_name_breaks_tie() {
        let r = disambiguate(
            ResourceKind::Machine,
            "lame",
            vec![cand(1, "Lame"), cand(2, "Lamer")],
        )
        .unwrap();
        assert_eq!(r.id, ResourceId::Numeric(1));
    }

    #[test]
    fn test_multiple_without_exact_match_is_ambiguous() {
        let err = disambiguate(
            ResourceKind::Challenge,
            "web",
            vec![cand(1, "Web One"), cand(2, "Web Two")],
        )
        .unwrap_err();
        match err {
            LabError::Ambiguous { candidates, .. } => {
                assert_eq!(candidates, vec!["Web One", "Web Two"]);
            }
            other => panic!("expected ambiguous, got {other:?}"),
        }
    }

    #[test]
    fn test_duplicate_exact_names_stay_ambiguous() {
        let err = disambiguate(
            ResourceKind::User,
            "neo",
            vec![cand(1, "neo"), cand(2, "Neo")],
        )
        .unwrap_err();
        assert!(matches!(err, LabError::Ambiguous { .. }));
    }
}
