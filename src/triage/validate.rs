use tracing::debug;

use super::content::ContentScorer;
use crate::forge::{
    CrossReference, DiscoveredVia, Forge, ForgeError, Issue, PullRequest, TimelineEvent,
};
use crate::report::types::{CandidateVerdict, CheckOutcome, CheckOutcomes};

/// Overlap below this, absent other signals, is too weak to call a match.
const CONTENT_AMBIGUITY_THRESHOLD: f32 = 0.25;

/// Candidate Validator.
///
/// Applies the checks in fixed order to one (issue, PR) pair, short-circuiting
/// to a rejection on the first hard failure:
/// merge, ordering, reopen, content match, codebase presence. Reads external
/// state only; never writes.
pub struct Validator<'a> {
    forge: &'a dyn Forge,
    scorer: &'a dyn ContentScorer,
}

impl<'a> Validator<'a> {
    pub fn new(forge: &'a dyn Forge, scorer: &'a dyn ContentScorer) -> Self {
        Self { forge, scorer }
    }

    /// Validate one candidate pair and produce its verdict.
    pub async fn validate(
        &self,
        issue: &Issue,
        timeline: &[TimelineEvent],
        pr_number: u64,
    ) -> Result<CandidateVerdict, ForgeError> {
        let pr = self.forge.pull_request(pr_number).await?;
        let via = if pr.closes.contains(&issue.number) {
            DiscoveredVia::ClosingKeyword
        } else {
            DiscoveredVia::Mention
        };
        let xref = CrossReference {
            issue: issue.number,
            pr: pr.number,
            via,
        };
        debug!(issue = xref.issue, pr = xref.pr, via = ?xref.via, "validating cross-reference");

        let mut checks = CheckOutcomes::default();
        let mut notes = vec![match xref.via {
            DiscoveredVia::ClosingKeyword => "discovered via closing keyword".to_string(),
            DiscoveredVia::Mention => "discovered via passive mention".to_string(),
        }];

        // 1. Merge check: closed-unmerged fails regardless of other evidence.
        let merged_at = match (pr.is_merged(), pr.merged_at) {
            (true, Some(merged_at)) => {
                checks.merge = CheckOutcome::Pass;
                merged_at
            }
            _ => {
                checks.merge = CheckOutcome::Fail;
                notes.push(format!("PR #{} is {}, not merged", pr.number, pr.merge_state));
                return Ok(self.verdict(issue, &pr, checks, notes));
            }
        };

        // 2. Ordering check: the merge must be strictly after issue creation,
        // otherwise the issue existed despite the PR.
        if merged_at > issue.created_at {
            checks.ordering = CheckOutcome::Pass;
        } else {
            checks.ordering = CheckOutcome::Fail;
            notes.push(format!(
                "merged at {merged_at} which is not after issue creation at {}",
                issue.created_at
            ));
            return Ok(self.verdict(issue, &pr, checks, notes));
        }

        // 3. Reopen check: a reopen after this PR's auto-close is a
        // maintainer saying the fix was insufficient.
        let reopened_after_merge = xref.via == DiscoveredVia::ClosingKeyword
            && timeline.iter().any(|event| {
                matches!(event, TimelineEvent::Reopened { at, .. } if *at >= merged_at)
            });
        if reopened_after_merge {
            checks.reopen = CheckOutcome::Fail;
            notes.push("issue was reopened after this PR auto-closed it".to_string());
            return Ok(self.verdict(issue, &pr, checks, notes));
        }
        checks.reopen = CheckOutcome::Pass;

        // 4. Content-match check: heuristic by design. Partial-fix wording or
        // weak overlap degrades to ambiguous for human review instead of
        // failing outright.
        let score = self.scorer.score(issue, &pr);
        if score.partial_fix {
            checks.content = CheckOutcome::Ambiguous;
            notes.push("PR describes itself as a partial fix".to_string());
        } else if score.value < CONTENT_AMBIGUITY_THRESHOLD {
            checks.content = CheckOutcome::Ambiguous;
            notes.push(format!(
                "weak textual overlap ({:.2}), may address a different concern",
                score.value
            ));
        } else {
            checks.content = CheckOutcome::Pass;
            notes.push(format!("issue and PR discuss the same concern ({:.2})", score.value));
        }

        // 5. Codebase-presence check: the most authoritative check, so it
        // runs even when content was ambiguous and overrides prior passes.
        let (presence, presence_note) = self.check_presence(&pr).await?;
        checks.presence = presence;
        notes.push(presence_note);

        Ok(self.verdict(issue, &pr, checks, notes))
    }

    /// Confirm the PR's change is still on the default branch: its merge
    /// commit must be reachable (not merged elsewhere, not rewritten away)
    /// and at least one changed file must still exist (not fully reverted).
    async fn check_presence(&self, pr: &PullRequest) -> Result<(CheckOutcome, String), ForgeError> {
        let Some(sha) = pr.merge_commit_sha.as_deref() else {
            return Ok((
                CheckOutcome::Fail,
                "no merge commit recorded for the PR".to_string(),
            ));
        };

        if !self.forge.merge_reachable(sha).await? {
            return Ok((
                CheckOutcome::Fail,
                "merge commit is not reachable from the default branch".to_string(),
            ));
        }

        if !pr.files.is_empty() {
            let mut any_present = false;
            for path in &pr.files {
                if self.forge.file_exists(path).await? {
                    any_present = true;
                    break;
                }
            }
            if !any_present {
                return Ok((
                    CheckOutcome::Fail,
                    "every file the PR changed has since been deleted".to_string(),
                ));
            }
        }

        Ok((
            CheckOutcome::Pass,
            "change is still present on the default branch".to_string(),
        ))
    }

    fn verdict(
        &self,
        issue: &Issue,
        pr: &PullRequest,
        checks: CheckOutcomes,
        notes: Vec<String>,
    ) -> CandidateVerdict {
        let tier = checks.tier();
        debug!(issue = issue.number, pr = pr.number, %tier, "validated candidate");
        CandidateVerdict {
            issue: issue.number,
            issue_title: issue.title.clone(),
            pr: pr.number,
            checks,
            tier,
            justification: notes.join("; "),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::forge::mock::MockForge;
    use crate::report::types::ConfidenceTier;
    use crate::triage::content::KeywordOverlapScorer;

    async fn validate_fixture(fixture: &str, issue_number: u64, pr: u64) -> CandidateVerdict {
        let forge = MockForge::from_fixture(fixture).unwrap();
        let issue = forge
            .open_issues()
            .await
            .unwrap()
            .into_iter()
            .find(|i| i.number == issue_number)
            .unwrap();
        let timeline = forge.timeline(issue_number).await.unwrap();
        let validator = Validator::new(&forge, &KeywordOverlapScorer);
        validator.validate(&issue, &timeline, pr).await.unwrap()
    }

    #[tokio::test]
    async fn test_closed_unmerged_pr_is_rejected() {
        let fixture = r#"{
            "issues": [{"number": 50, "title": "Flaky retry logic", "body": null,
                        "state": "open", "created_at": "2026-01-25T00:00:00Z"}],
            "pulls": [{"number": 90, "title": "Attempt retry fix", "body": "retry logic rework",
                       "state": "closed", "merged_at": null, "merge_commit_sha": null}]
        }"#;
        let verdict = validate_fixture(fixture, 50, 90).await;
        assert_eq!(verdict.tier, ConfidenceTier::Reject);
        assert_eq!(verdict.checks.merge, CheckOutcome::Fail);
        assert_eq!(verdict.checks.ordering, CheckOutcome::Skipped);
    }

    #[tokio::test]
    async fn test_pr_merged_before_issue_creation_is_rejected() {
        // Merged one second before the issue was created: the issue exists
        // despite the PR, so it cannot have been resolved by it.
        let fixture = r#"{
            "issues": [{"number": 10, "title": "Crash on empty config", "body": null,
                        "state": "open", "created_at": "2026-03-01T00:00:00Z"}],
            "pulls": [{"number": 55, "title": "Handle empty config", "body": "hardens config loading",
                       "state": "closed", "merged_at": "2026-02-28T23:59:59Z",
                       "merge_commit_sha": "sha55", "files": ["src/config.rs"]}]
        }"#;
        let verdict = validate_fixture(fixture, 10, 55).await;
        assert_eq!(verdict.tier, ConfidenceTier::Reject);
        assert_eq!(verdict.checks.merge, CheckOutcome::Pass);
        assert_eq!(verdict.checks.ordering, CheckOutcome::Fail);
    }

    #[tokio::test]
    async fn test_equal_timestamps_fail_ordering() {
        let fixture = r#"{
            "issues": [{"number": 11, "title": "Race in shutdown", "body": null,
                        "state": "open", "created_at": "2026-03-01T00:00:00Z"}],
            "pulls": [{"number": 56, "title": "Shutdown ordering", "body": "shutdown race removed",
                       "state": "closed", "merged_at": "2026-03-01T00:00:00Z",
                       "merge_commit_sha": "sha56", "files": []}]
        }"#;
        let verdict = validate_fixture(fixture, 11, 56).await;
        assert_eq!(verdict.checks.ordering, CheckOutcome::Fail);
    }

    #[tokio::test]
    async fn test_reopen_after_auto_close_is_rejected() {
        let fixture = r#"{
            "issues": [{"number": 20, "title": "Timeouts under load", "body": null,
                        "state": "open", "created_at": "2026-01-10T00:00:00Z"}],
            "pulls": [{"number": 60, "title": "Tune timeouts", "body": "Fixes #20",
                       "state": "closed", "merged_at": "2026-02-01T00:00:00Z",
                       "merge_commit_sha": "sha60", "files": ["src/net.rs"]}],
            "timelines": {
                "20": [
                    {"event": "closed", "actor": "bot", "at": "2026-02-01T00:00:00Z"},
                    {"event": "reopened", "actor": "maintainer", "at": "2026-02-05T00:00:00Z"}
                ]
            }
        }"#;
        let verdict = validate_fixture(fixture, 20, 60).await;
        assert_eq!(verdict.tier, ConfidenceTier::Reject);
        assert_eq!(verdict.checks.reopen, CheckOutcome::Fail);
    }

    #[tokio::test]
    async fn test_partial_fix_needs_human_judgment() {
        let fixture = r#"{
            "issues": [{"number": 30, "title": "Parser rejects unicode identifiers",
                        "body": "Function names with unicode identifiers are rejected by the parser",
                        "state": "open", "created_at": "2026-01-15T00:00:00Z"}],
            "pulls": [{"number": 70, "title": "Unicode handling groundwork",
                       "body": "Covers some of the parser gaps, unicode identifiers now accepted in function names",
                       "state": "closed", "merged_at": "2026-02-10T00:00:00Z",
                       "merge_commit_sha": "sha70", "files": ["src/parser.rs"]}]
        }"#;
        let verdict = validate_fixture(fixture, 30, 70).await;
        assert_eq!(verdict.tier, ConfidenceTier::Medium);
        assert_eq!(verdict.checks.content, CheckOutcome::Ambiguous);
        assert_eq!(verdict.checks.presence, CheckOutcome::Pass);
    }

    #[tokio::test]
    async fn test_clean_candidate_is_proposed() {
        let fixture = r#"{
            "issues": [{"number": 40, "title": "Panic on empty config path",
                        "body": "The loader panics when the config path is empty",
                        "state": "open", "created_at": "2026-01-20T00:00:00Z"}],
            "pulls": [{"number": 80, "title": "Guard config loader against empty path",
                       "body": "The loader no longer panics when the config path is empty",
                       "state": "closed", "merged_at": "2026-02-15T00:00:00Z",
                       "merge_commit_sha": "sha80", "files": ["src/loader.rs"]}]
        }"#;
        let verdict = validate_fixture(fixture, 40, 80).await;
        assert_eq!(verdict.tier, ConfidenceTier::High);
        assert_eq!(verdict.checks.content, CheckOutcome::Pass);
    }

    #[tokio::test]
    async fn test_unreachable_merge_commit_overrides_all_passes() {
        let fixture = r#"{
            "issues": [{"number": 60, "title": "Wrong exit code on failure",
                        "body": "Process reports a wrong exit code when a failure occurs",
                        "state": "open", "created_at": "2026-01-05T00:00:00Z"}],
            "pulls": [{"number": 95, "title": "Fix exit codes",
                       "body": "Exit codes corrected for failure paths",
                       "state": "closed", "merged_at": "2026-02-20T00:00:00Z",
                       "merge_commit_sha": "sha95", "files": ["src/main.rs"]}],
            "unreachable_shas": ["sha95"]
        }"#;
        let verdict = validate_fixture(fixture, 60, 95).await;
        assert_eq!(verdict.tier, ConfidenceTier::Reject);
        assert_eq!(verdict.checks.content, CheckOutcome::Pass);
        assert_eq!(verdict.checks.presence, CheckOutcome::Fail);
    }

    #[tokio::test]
    async fn test_fully_deleted_change_fails_presence() {
        let fixture = r#"{
            "issues": [{"number": 61, "title": "Legacy importer drops rows",
                        "body": "The legacy importer silently drops rows",
                        "state": "open", "created_at": "2026-01-05T00:00:00Z"}],
            "pulls": [{"number": 96, "title": "Patch legacy importer",
                       "body": "Legacy importer no longer drops rows",
                       "state": "closed", "merged_at": "2026-02-20T00:00:00Z",
                       "merge_commit_sha": "sha96", "files": ["src/legacy.rs"]}],
            "deleted_files": ["src/legacy.rs"]
        }"#;
        let verdict = validate_fixture(fixture, 61, 96).await;
        assert_eq!(verdict.checks.presence, CheckOutcome::Fail);
        assert_eq!(verdict.tier, ConfidenceTier::Reject);
    }
}
