use std::sync::Arc;

use tokio::task::JoinSet;
use tracing::{debug, warn};

use crate::forge::{Forge, Issue, TimelineEvent};

/// An open issue with its timeline and the candidate PRs discovered there.
/// Candidates are a superset containing false positives; validation happens
/// downstream.
#[derive(Debug, Clone)]
pub struct Candidate {
    pub issue: Issue,
    pub timeline: Vec<TimelineEvent>,
    /// Closed PRs that cross-referenced this issue, in timeline order.
    pub prs: Vec<u64>,
}

/// Candidate Collector.
///
/// Fetches each issue's timeline and keeps cross-reference events whose
/// source PR is in closed state. Timeline reads are independent, so they run
/// concurrently; a failed fetch for one issue is logged and skipped without
/// aborting the batch.
pub async fn collect_candidates(forge: &Arc<dyn Forge>, issues: Vec<Issue>) -> Vec<Candidate> {
    let mut tasks = JoinSet::new();
    for issue in issues {
        let forge = Arc::clone(forge);
        tasks.spawn(async move {
            let timeline = forge.timeline(issue.number).await;
            (issue, timeline)
        });
    }

    let mut candidates = Vec::new();
    while let Some(joined) = tasks.join_next().await {
        let (issue, timeline) = match joined {
            Ok(result) => result,
            Err(error) => {
                warn!(%error, "timeline task panicked, skipping issue");
                continue;
            }
        };
        let timeline = match timeline {
            Ok(timeline) => timeline,
            Err(error) => {
                warn!(issue = issue.number, %error, "failed to fetch timeline, skipping issue");
                continue;
            }
        };

        let mut prs = Vec::new();
        for event in &timeline {
            if let TimelineEvent::CrossReferenced {
                pr_number,
                pr_closed: true,
                ..
            } = event
            {
                if !prs.contains(pr_number) {
                    prs.push(*pr_number);
                }
            }
        }

        if prs.is_empty() {
            continue;
        }
        debug!(issue = issue.number, candidates = prs.len(), "collected candidate PRs");
        candidates.push(Candidate { issue, timeline, prs });
    }

    // JoinSet completion order is nondeterministic; keep output stable.
    candidates.sort_by_key(|c| c.issue.number);
    candidates
}
