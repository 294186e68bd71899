pub mod collect;
pub mod content;
pub mod exclusion;
pub mod validate;

use std::collections::HashSet;
use std::sync::Arc;

use thiserror::Error;
use tracing::{info, instrument, warn};

use crate::forge::{Forge, ForgeError};
use crate::report::types::CandidateVerdict;
use content::ContentScorer;
use validate::Validator;

#[derive(Debug, Error)]
pub enum TriageError {
    #[error("Forge error during sweep: {0}")]
    Forge(#[from] ForgeError),
}

/// Run one full sweep: exclusion, collection, validation.
///
/// Issues excluded by the Exclusion Filter never enter collection, so no
/// verdict can exist for them. Validation of individual candidates is
/// sequential and side-effect-free; a failure for one pair is logged and
/// skipped without aborting the batch.
#[instrument(skip(forge, scorer))]
pub async fn sweep(
    forge: Arc<dyn Forge>,
    scorer: &dyn ContentScorer,
    pr_limit: usize,
) -> Result<Vec<CandidateVerdict>, TriageError> {
    let merged = forge.merged_pull_requests(pr_limit).await?;
    let open = forge.open_issues().await?;
    info!(merged_prs = merged.len(), open_issues = open.len(), "fetched sweep inputs");

    let open_numbers: HashSet<u64> = open.iter().map(|i| i.number).collect();
    let excluded = exclusion::excluded_issues(&merged, &open_numbers);
    if !excluded.is_empty() {
        info!(excluded = excluded.len(), "issues excluded as deliberately reopened");
    }

    let eligible: Vec<_> = open
        .into_iter()
        .filter(|i| !excluded.contains(&i.number))
        .collect();
    let candidates = collect::collect_candidates(&forge, eligible).await;
    info!(candidates = candidates.len(), "issues with candidate PRs");

    let validator = Validator::new(forge.as_ref(), scorer);
    let mut verdicts = Vec::new();
    for candidate in &candidates {
        for pr in &candidate.prs {
            match validator
                .validate(&candidate.issue, &candidate.timeline, *pr)
                .await
            {
                Ok(verdict) => verdicts.push(verdict),
                Err(error) => {
                    warn!(issue = candidate.issue.number, pr, %error, "skipping candidate pair");
                }
            }
        }
    }

    Ok(verdicts)
}
