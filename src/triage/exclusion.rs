use std::collections::HashSet;

use tracing::debug;

use crate::forge::PullRequest;

/// Exclusion Filter.
///
/// A merged PR with a closing reference auto-closes the referenced issue. If
/// such an issue is open anyway, a maintainer deliberately reopened it after
/// the merge, which means the fix was judged insufficient. Those issues are
/// permanently excluded from the current run; no downstream check may
/// override this.
pub fn excluded_issues(merged_prs: &[PullRequest], open_issues: &HashSet<u64>) -> HashSet<u64> {
    let mut excluded = HashSet::new();
    for pr in merged_prs {
        if !pr.is_merged() {
            continue;
        }
        for issue in &pr.closes {
            if open_issues.contains(issue) && excluded.insert(*issue) {
                debug!(
                    issue,
                    pr = pr.number,
                    "excluding issue reopened after auto-close"
                );
            }
        }
    }
    excluded
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::forge::MergeState;
    use chrono::Utc;

    fn merged_pr(number: u64, closes: Vec<u64>) -> PullRequest {
        PullRequest {
            number,
            title: format!("PR {number}"),
            body: None,
            merge_state: MergeState::Merged,
            merged_at: Some(Utc::now()),
            merge_commit_sha: Some("abc".to_string()),
            files: vec![],
            closes,
        }
    }

    #[test]
    fn test_reopened_issue_is_excluded() {
        // A merged closing PR whose issue is still open means the issue was
        // reopened by a maintainer.
        let prs = vec![merged_pr(60, vec![20])];
        let open: HashSet<u64> = [20, 30].into_iter().collect();
        let excluded = excluded_issues(&prs, &open);
        assert!(excluded.contains(&20));
        assert!(!excluded.contains(&30));
    }

    #[test]
    fn test_closed_referenced_issue_not_excluded() {
        // The auto-close held; nothing to exclude.
        let prs = vec![merged_pr(60, vec![20])];
        let open: HashSet<u64> = [30].into_iter().collect();
        assert!(excluded_issues(&prs, &open).is_empty());
    }

    #[test]
    fn test_unmerged_pr_never_excludes() {
        let mut pr = merged_pr(60, vec![20]);
        pr.merge_state = MergeState::ClosedUnmerged;
        pr.merged_at = None;
        let open: HashSet<u64> = [20].into_iter().collect();
        assert!(excluded_issues(&[pr], &open).is_empty());
    }

    #[test]
    fn test_pr_without_closing_refs_excludes_nothing() {
        let prs = vec![merged_pr(61, vec![])];
        let open: HashSet<u64> = [20].into_iter().collect();
        assert!(excluded_issues(&prs, &open).is_empty());
    }
}
