use std::collections::{HashMap, HashSet};
use std::sync::Mutex;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::Deserialize;

use super::{refs, Forge, ForgeError, Issue, IssueState, MergeState, PullRequest, TimelineEvent};

/// Fixture-backed [`Forge`] for `--mock` runs and tests. Reads are served
/// from a JSON dataset; writes are recorded instead of performed, so tests
/// can assert that nothing is written without an approval.
pub struct MockForge {
    issues: Vec<Issue>,
    pulls: HashMap<u64, PullRequest>,
    timelines: HashMap<u64, Vec<TimelineEvent>>,
    unreachable_shas: HashSet<String>,
    deleted_files: HashSet<String>,
    writes: Mutex<Vec<WriteAction>>,
}

/// A write the mock received past the gate.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum WriteAction {
    Comment { issue: u64 },
    Label { issue: u64, label: String },
    Close { issue: u64 },
}

#[derive(Deserialize)]
struct Fixture {
    issues: Vec<Issue>,
    pulls: Vec<FixturePull>,
    #[serde(default)]
    timelines: HashMap<String, Vec<FixtureEvent>>,
    /// Merge commits no longer reachable from the default branch.
    #[serde(default)]
    unreachable_shas: Vec<String>,
    /// Paths since deleted from the default branch.
    #[serde(default)]
    deleted_files: Vec<String>,
}

#[derive(Deserialize)]
struct FixturePull {
    number: u64,
    title: String,
    body: Option<String>,
    state: String,
    merged_at: Option<DateTime<Utc>>,
    merge_commit_sha: Option<String>,
    #[serde(default)]
    files: Vec<String>,
}

#[derive(Deserialize)]
#[serde(tag = "event", rename_all = "kebab-case")]
enum FixtureEvent {
    CrossReferenced {
        pr: u64,
        pr_closed: bool,
        at: DateTime<Utc>,
    },
    Reopened {
        actor: String,
        at: DateTime<Utc>,
    },
    Closed {
        actor: String,
        at: DateTime<Utc>,
    },
}

impl From<FixtureEvent> for TimelineEvent {
    fn from(event: FixtureEvent) -> Self {
        match event {
            FixtureEvent::CrossReferenced { pr, pr_closed, at } => TimelineEvent::CrossReferenced {
                pr_number: pr,
                pr_closed,
                at,
            },
            FixtureEvent::Reopened { actor, at } => TimelineEvent::Reopened { actor, at },
            FixtureEvent::Closed { actor, at } => TimelineEvent::Closed { actor, at },
        }
    }
}

impl MockForge {
    /// Build a mock forge from a JSON fixture string.
    pub fn from_fixture(json: &str) -> Result<Self, ForgeError> {
        let fixture: Fixture = serde_json::from_str(json)?;

        let pulls = fixture
            .pulls
            .into_iter()
            .map(|p| {
                let merge_state = match (p.state.as_str(), p.merged_at.is_some()) {
                    (_, true) => MergeState::Merged,
                    ("closed", false) => MergeState::ClosedUnmerged,
                    _ => MergeState::Open,
                };
                let closes = p
                    .body
                    .as_deref()
                    .map(refs::closing_references)
                    .unwrap_or_default();
                (
                    p.number,
                    PullRequest {
                        number: p.number,
                        title: p.title,
                        body: p.body,
                        merge_state,
                        merged_at: p.merged_at,
                        merge_commit_sha: p.merge_commit_sha,
                        files: p.files,
                        closes,
                    },
                )
            })
            .collect();

        let timelines = fixture
            .timelines
            .into_iter()
            .filter_map(|(key, events)| {
                let number = key.parse().ok()?;
                Some((number, events.into_iter().map(Into::into).collect()))
            })
            .collect();

        Ok(Self {
            issues: fixture.issues,
            pulls,
            timelines,
            unreachable_shas: fixture.unreachable_shas.into_iter().collect(),
            deleted_files: fixture.deleted_files.into_iter().collect(),
            writes: Mutex::new(Vec::new()),
        })
    }

    /// Writes recorded so far, in order.
    pub fn recorded_writes(&self) -> Vec<WriteAction> {
        self.writes.lock().unwrap().clone()
    }

    fn record(&self, action: WriteAction) {
        self.writes.lock().unwrap().push(action);
    }
}

#[async_trait]
impl Forge for MockForge {
    async fn open_issues(&self) -> Result<Vec<Issue>, ForgeError> {
        Ok(self
            .issues
            .iter()
            .filter(|i| i.state == IssueState::Open)
            .cloned()
            .collect())
    }

    async fn pull_request(&self, number: u64) -> Result<PullRequest, ForgeError> {
        self.pulls
            .get(&number)
            .cloned()
            .ok_or(ForgeError::UnknownPullRequest(number))
    }

    async fn merged_pull_requests(&self, limit: usize) -> Result<Vec<PullRequest>, ForgeError> {
        let mut merged: Vec<PullRequest> = self
            .pulls
            .values()
            .filter(|p| p.is_merged())
            .cloned()
            .collect();
        // PR numbers are a stand-in for creation order.
        merged.sort_by_key(|p| p.number);
        merged.truncate(limit);
        Ok(merged)
    }

    async fn timeline(&self, issue: u64) -> Result<Vec<TimelineEvent>, ForgeError> {
        Ok(self.timelines.get(&issue).cloned().unwrap_or_default())
    }

    async fn merge_reachable(&self, sha: &str) -> Result<bool, ForgeError> {
        Ok(!self.unreachable_shas.contains(sha))
    }

    async fn file_exists(&self, path: &str) -> Result<bool, ForgeError> {
        Ok(!self.deleted_files.contains(path))
    }

    async fn post_comment(&self, issue: u64, _body: &str) -> Result<(), ForgeError> {
        self.record(WriteAction::Comment { issue });
        Ok(())
    }

    async fn add_label(&self, issue: u64, label: &str) -> Result<(), ForgeError> {
        self.record(WriteAction::Label {
            issue,
            label: label.to_string(),
        });
        Ok(())
    }

    async fn close_issue(&self, issue: u64) -> Result<(), ForgeError> {
        self.record(WriteAction::Close { issue });
        Ok(())
    }
}
