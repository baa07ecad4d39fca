//! Stage 1: pull request id to repository, metadata and latest iteration.

use herald_core::{HeraldError, Iteration, PullRequestMeta, PullRequestRef, Result};
use serde::Serialize;
use tracing::{debug, info};

use crate::capability::{IterationRecord, PullRequestSource};

/// Output of the resolver stage.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Resolution {
    /// Repository and pull request identity.
    pub pull_request: PullRequestRef,
    /// The iteration with the greatest id.
    pub iteration: Iteration,
    /// Metadata used for prompting and the announcement.
    pub meta: PullRequestMeta,
}

/// Resolve `pull_request_id` to its repository and latest iteration.
///
/// The repository comes from the pull request's own metadata unless
/// `repository_name` is given, in which case the project's repositories are
/// listed and matched by name (ASCII case-insensitive).
///
/// # Errors
///
/// - [`HeraldError::NotFound`] if the pull request or named repository does
///   not exist.
/// - [`HeraldError::Upstream`] if the iteration list is empty, the latest
///   iteration lacks commit ids, or the platform misbehaves.
pub async fn resolve(
    source: &dyn PullRequestSource,
    pull_request_id: u64,
    repository_name: Option<&str>,
) -> Result<Resolution> {
    let meta = source.get_pull_request(pull_request_id).await?;

    let repository_id = match repository_name {
        Some(name) => {
            let repos = source.list_repositories().await?;
            repos
                .into_iter()
                .find(|r| r.name.as_deref().is_some_and(|n| n.eq_ignore_ascii_case(name)))
                .map(|r| r.id)
                .ok_or_else(|| HeraldError::NotFound(format!("repository '{name}'")))?
        }
        None => meta.repository.id.clone(),
    };
    if repository_id.trim().is_empty() {
        return Err(HeraldError::upstream(format!(
            "pull request {pull_request_id} has no repository id"
        )));
    }
    debug!(%repository_id, pull_request_id, "resolved repository");

    let pull_request = PullRequestRef::new(repository_id, pull_request_id);
    let records = source.list_iterations(&pull_request).await?;
    let iteration = latest_iteration(&pull_request, records)?;
    info!(
        pr = %pull_request,
        iteration = iteration.iteration_id,
        "resolved latest iteration"
    );

    Ok(Resolution {
        pull_request,
        iteration,
        meta,
    })
}

/// Pick the record with the greatest id, whatever order they arrive in.
fn latest_iteration(pr: &PullRequestRef, records: Vec<IterationRecord>) -> Result<Iteration> {
    let latest = records
        .into_iter()
        .max_by_key(|r| r.id)
        .ok_or_else(|| HeraldError::upstream(format!("pull request {pr} has no iterations")))?;
    Iteration::new(
        latest.id,
        latest.source_commit.unwrap_or_default(),
        latest.base_commit.unwrap_or_default(),
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    fn record(id: u64) -> IterationRecord {
        IterationRecord {
            id,
            source_commit: Some(format!("src{id}")),
            base_commit: Some(format!("base{id}")),
        }
    }

    fn pr() -> PullRequestRef {
        PullRequestRef::new("r", 1)
    }

    #[test]
    fn latest_is_max_id_in_any_order() {
        for order in [vec![1, 2, 3], vec![3, 1, 2], vec![2, 3, 1]] {
            let records = order.into_iter().map(record).collect();
            let it = latest_iteration(&pr(), records).unwrap();
            assert_eq!(it.iteration_id, 3);
            assert_eq!(it.source_commit, "src3");
            assert_eq!(it.base_commit, "base3");
        }
    }

    #[test]
    fn empty_list_is_upstream() {
        let err = latest_iteration(&pr(), Vec::new()).unwrap_err();
        assert!(matches!(err, HeraldError::Upstream { .. }));
    }

    #[test]
    fn latest_without_base_commit_is_upstream() {
        let mut latest = record(4);
        latest.base_commit = None;
        let err = latest_iteration(&pr(), vec![record(1), latest]).unwrap_err();
        assert!(matches!(err, HeraldError::Upstream { .. }));
    }

    #[test]
    fn older_iteration_without_commits_is_ignored() {
        let broken = IterationRecord {
            id: 1,
            ..IterationRecord::default()
        };
        let it = latest_iteration(&pr(), vec![broken, record(2)]).unwrap();
        assert_eq!(it.iteration_id, 2);
    }
}
