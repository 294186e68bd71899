use chrono::{DateTime, Utc};
use serde::Deserialize;

/// Open/closed state of an issue as reported by the forge.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum IssueState {
    Open,
    Closed,
}

/// Snapshot of an issue fetched from the forge. Read-only for the whole run.
#[derive(Debug, Clone, Deserialize)]
pub struct Issue {
    /// Issue number (e.g., 42)
    pub number: u64,
    /// Issue title
    pub title: String,
    /// Issue body text, absent for issues filed without a description
    #[serde(default)]
    pub body: Option<String>,
    /// Current open/closed state
    pub state: IssueState,
    /// Creation timestamp, compared against candidate PR merge times
    pub created_at: DateTime<Utc>,
}

/// Merge state of a pull request. "Closed" on the forge covers both merged
/// and closed-unmerged; the two are distinguished here because only merged
/// PRs can have resolved anything.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MergeState {
    Merged,
    ClosedUnmerged,
    Open,
}

impl std::fmt::Display for MergeState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            MergeState::Merged => write!(f, "merged"),
            MergeState::ClosedUnmerged => write!(f, "closed-unmerged"),
            MergeState::Open => write!(f, "open"),
        }
    }
}

/// Snapshot of a pull request. Not Deserialize — constructed manually from
/// the forge API response plus the parsed closing references, since the
/// merge state and `closes` list are derived rather than wire fields.
#[derive(Debug, Clone)]
pub struct PullRequest {
    /// PR number
    pub number: u64,
    /// PR title
    pub title: String,
    /// PR body text
    pub body: Option<String>,
    /// Derived merge state
    pub merge_state: MergeState,
    /// Merge timestamp, None unless merged
    pub merged_at: Option<DateTime<Utc>>,
    /// Merge commit on the target branch, None unless merged
    pub merge_commit_sha: Option<String>,
    /// Paths touched by this PR
    pub files: Vec<String>,
    /// Issue numbers referenced with a closing keyword in the PR body
    pub closes: Vec<u64>,
}

impl PullRequest {
    pub fn is_merged(&self) -> bool {
        self.merge_state == MergeState::Merged
    }
}

/// A single event from an issue's timeline, reduced to the kinds the
/// triage pipeline inspects. Everything else on the wire is dropped.
#[derive(Debug, Clone)]
pub enum TimelineEvent {
    /// A PR mentioned this issue. `pr_closed` reflects the PR's issue-level
    /// state at fetch time; merged vs closed-unmerged is resolved later by
    /// fetching the PR itself.
    CrossReferenced {
        pr_number: u64,
        pr_closed: bool,
        at: DateTime<Utc>,
    },
    /// The issue was reopened by a person.
    Reopened { actor: String, at: DateTime<Utc> },
    /// The issue was closed (manually or by a merge with a closing keyword).
    Closed { actor: String, at: DateTime<Utc> },
}

/// How a candidate (issue, PR) pair was discovered.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DiscoveredVia {
    /// Closing keyword in the PR body ("fixes #N")
    ClosingKeyword,
    /// Passive mention without auto-close semantics
    Mention,
}

/// Relation between an issue and a PR discovered via timeline inspection.
#[derive(Debug, Clone)]
pub struct CrossReference {
    pub issue: u64,
    pub pr: u64,
    pub via: DiscoveredVia,
}
