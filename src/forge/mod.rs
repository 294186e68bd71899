pub mod mock;
pub mod refs;
pub mod types;

pub use types::{CrossReference, DiscoveredVia, Issue, IssueState, MergeState, PullRequest, TimelineEvent};

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use thiserror::Error;
use tracing::{debug, instrument};

#[derive(Debug, Error)]
pub enum ForgeError {
    #[error("Forge API request failed: {0}")]
    ApiRequest(#[from] reqwest::Error),

    #[error("Invalid repository target: {0}")]
    InvalidTarget(String),

    #[error("Failed to parse fixture: {0}")]
    Fixture(#[from] serde_json::Error),

    #[error("Unknown pull request #{0}")]
    UnknownPullRequest(u64),

    #[error("GitHub token not found in config or environment")]
    MissingToken,
}

/// Read and (gated) write surface of the code forge. The triage pipeline only
/// talks to this trait; `GitHubForge` is the live implementation and
/// `mock::MockForge` backs `--mock` and tests.
#[async_trait]
pub trait Forge: Send + Sync {
    /// All currently open issues, excluding pull requests.
    async fn open_issues(&self) -> Result<Vec<Issue>, ForgeError>;

    /// A single pull request with its changed files and parsed closing refs.
    async fn pull_request(&self, number: u64) -> Result<PullRequest, ForgeError>;

    /// Merged pull requests ordered by creation time, at most `limit`.
    async fn merged_pull_requests(&self, limit: usize) -> Result<Vec<PullRequest>, ForgeError>;

    /// Ordered timeline events for one issue.
    async fn timeline(&self, issue: u64) -> Result<Vec<TimelineEvent>, ForgeError>;

    /// Whether a merge commit is reachable from the default branch head.
    async fn merge_reachable(&self, sha: &str) -> Result<bool, ForgeError>;

    /// Whether a path still exists on the default branch.
    async fn file_exists(&self, path: &str) -> Result<bool, ForgeError>;

    /// Post a comment on an issue. Write — only called past the approval gate.
    async fn post_comment(&self, issue: u64, body: &str) -> Result<(), ForgeError>;

    /// Apply a label to an issue. Write — only called past the approval gate.
    async fn add_label(&self, issue: u64, label: &str) -> Result<(), ForgeError>;

    /// Close an issue. Write — only called past the approval gate.
    async fn close_issue(&self, issue: u64) -> Result<(), ForgeError>;
}

/// Parsed components of a repository target.
#[derive(Debug, Clone)]
pub struct RepoTarget {
    pub owner: String,
    pub repo: String,
}

impl std::fmt::Display for RepoTarget {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}/{}", self.owner, self.repo)
    }
}

/// Parse a repository target into owner and repo.
///
/// Accepted forms: `owner/repo` and `https://github.com/owner/repo`.
pub fn parse_repo_target(target: &str) -> Result<RepoTarget, ForgeError> {
    let path = if target.contains("://") {
        let parsed = reqwest::Url::parse(target)
            .map_err(|_| ForgeError::InvalidTarget(target.to_string()))?;
        if parsed.host_str() != Some("github.com") {
            return Err(ForgeError::InvalidTarget(target.to_string()));
        }
        parsed.path().trim_matches('/').to_string()
    } else {
        target.trim_matches('/').to_string()
    };

    let segments: Vec<&str> = path.split('/').filter(|s| !s.is_empty()).collect();
    if segments.len() != 2 {
        return Err(ForgeError::InvalidTarget(target.to_string()));
    }

    Ok(RepoTarget {
        owner: segments[0].to_string(),
        repo: segments[1].to_string(),
    })
}

/// Live GitHub REST implementation of [`Forge`].
pub struct GitHubForge {
    client: reqwest::Client,
    target: RepoTarget,
    token: String,
    default_branch: String,
}

const PER_PAGE: usize = 100;

impl GitHubForge {
    /// Connect to a repository: one metadata request resolves the default
    /// branch used by the codebase-presence check.
    #[instrument(skip(token), fields(repo = %target))]
    pub async fn connect(target: RepoTarget, token: String) -> Result<Self, ForgeError> {
        let client = reqwest::Client::new();

        #[derive(serde::Deserialize)]
        struct RepoResponse {
            default_branch: String,
        }

        let url = format!("https://api.github.com/repos/{}/{}", target.owner, target.repo);
        let repo = client
            .get(&url)
            .header("User-Agent", "issue-sweeper")
            .header("Accept", "application/vnd.github+json")
            .bearer_auth(&token)
            .send()
            .await?
            .error_for_status()?
            .json::<RepoResponse>()
            .await?;
        debug!(default_branch = %repo.default_branch, "connected to repository");

        Ok(Self {
            client,
            target,
            token,
            default_branch: repo.default_branch,
        })
    }

    fn api_url(&self, rest: &str) -> String {
        format!(
            "https://api.github.com/repos/{}/{}/{}",
            self.target.owner, self.target.repo, rest
        )
    }

    fn get(&self, url: &str) -> reqwest::RequestBuilder {
        self.client
            .get(url)
            .header("User-Agent", "issue-sweeper")
            .header("Accept", "application/vnd.github+json")
            .bearer_auth(&self.token)
    }

    async fn pull_request_files(&self, number: u64) -> Result<Vec<String>, ForgeError> {
        #[derive(serde::Deserialize)]
        struct FileResponse {
            filename: String,
        }

        let mut files = Vec::new();
        for page in 1.. {
            let url = self.api_url(&format!(
                "pulls/{number}/files?per_page={PER_PAGE}&page={page}"
            ));
            let batch = self
                .get(&url)
                .send()
                .await?
                .error_for_status()?
                .json::<Vec<FileResponse>>()
                .await?;
            let done = batch.len() < PER_PAGE;
            files.extend(batch.into_iter().map(|f| f.filename));
            if done {
                break;
            }
        }
        Ok(files)
    }
}

/// Shared wire shape for the PR endpoints; merge state and closing refs are
/// derived from it.
#[derive(serde::Deserialize)]
struct PullResponse {
    number: u64,
    title: String,
    body: Option<String>,
    state: String,
    merged_at: Option<DateTime<Utc>>,
    merge_commit_sha: Option<String>,
}

impl PullResponse {
    fn into_pull_request(self, files: Vec<String>) -> PullRequest {
        let merge_state = match (self.state.as_str(), self.merged_at.is_some()) {
            (_, true) => MergeState::Merged,
            ("closed", false) => MergeState::ClosedUnmerged,
            _ => MergeState::Open,
        };
        let closes = self
            .body
            .as_deref()
            .map(refs::closing_references)
            .unwrap_or_default();
        PullRequest {
            number: self.number,
            title: self.title,
            body: self.body,
            merge_state,
            merged_at: self.merged_at,
            merge_commit_sha: self.merge_commit_sha,
            files,
            closes,
        }
    }
}

#[async_trait]
impl Forge for GitHubForge {
    #[instrument(skip(self))]
    async fn open_issues(&self) -> Result<Vec<Issue>, ForgeError> {
        // The issues endpoint also returns PRs; they carry a pull_request key.
        #[derive(serde::Deserialize)]
        struct IssueResponse {
            #[serde(flatten)]
            issue: Issue,
            pull_request: Option<serde_json::Value>,
        }

        let mut issues = Vec::new();
        for page in 1.. {
            let url = self.api_url(&format!(
                "issues?state=open&per_page={PER_PAGE}&page={page}"
            ));
            let batch = self
                .get(&url)
                .send()
                .await?
                .error_for_status()?
                .json::<Vec<IssueResponse>>()
                .await?;
            let done = batch.len() < PER_PAGE;
            issues.extend(
                batch
                    .into_iter()
                    .filter(|i| i.pull_request.is_none())
                    .map(|i| i.issue),
            );
            if done {
                break;
            }
        }
        debug!(count = issues.len(), "fetched open issues");
        Ok(issues)
    }

    #[instrument(skip(self))]
    async fn pull_request(&self, number: u64) -> Result<PullRequest, ForgeError> {
        let url = self.api_url(&format!("pulls/{number}"));
        let metadata = self
            .get(&url)
            .send()
            .await?
            .error_for_status()?
            .json::<PullResponse>()
            .await?;
        let files = self.pull_request_files(number).await?;
        debug!(files = files.len(), "fetched pull request");
        Ok(metadata.into_pull_request(files))
    }

    #[instrument(skip(self))]
    async fn merged_pull_requests(&self, limit: usize) -> Result<Vec<PullRequest>, ForgeError> {
        let mut merged = Vec::new();
        for page in 1.. {
            let url = self.api_url(&format!(
                "pulls?state=closed&sort=created&direction=asc&per_page={PER_PAGE}&page={page}"
            ));
            let batch = self
                .get(&url)
                .send()
                .await?
                .error_for_status()?
                .json::<Vec<PullResponse>>()
                .await?;
            let done = batch.len() < PER_PAGE;
            // Listing responses omit files; the validator refetches the full
            // PR for any candidate it inspects.
            merged.extend(
                batch
                    .into_iter()
                    .filter(|p| p.merged_at.is_some())
                    .map(|p| p.into_pull_request(Vec::new())),
            );
            if merged.len() >= limit || done {
                break;
            }
        }
        merged.truncate(limit);
        debug!(count = merged.len(), "fetched merged pull requests");
        Ok(merged)
    }

    #[instrument(skip(self))]
    async fn timeline(&self, issue: u64) -> Result<Vec<TimelineEvent>, ForgeError> {
        #[derive(serde::Deserialize)]
        struct Actor {
            login: String,
        }

        #[derive(serde::Deserialize)]
        struct SourceIssue {
            number: u64,
            state: String,
            pull_request: Option<serde_json::Value>,
        }

        #[derive(serde::Deserialize)]
        struct Source {
            issue: Option<SourceIssue>,
        }

        #[derive(serde::Deserialize)]
        struct EventResponse {
            event: String,
            created_at: Option<DateTime<Utc>>,
            actor: Option<Actor>,
            source: Option<Source>,
        }

        let mut events = Vec::new();
        for page in 1.. {
            let url = self.api_url(&format!(
                "issues/{issue}/timeline?per_page={PER_PAGE}&page={page}"
            ));
            let batch = self
                .get(&url)
                .send()
                .await?
                .error_for_status()?
                .json::<Vec<EventResponse>>()
                .await?;
            let done = batch.len() < PER_PAGE;

            for event in batch {
                let at = match event.created_at {
                    Some(at) => at,
                    None => continue,
                };
                let actor = event.actor.map(|a| a.login).unwrap_or_default();
                match event.event.as_str() {
                    "cross-referenced" => {
                        let Some(source) = event.source.and_then(|s| s.issue) else {
                            continue;
                        };
                        // Only references originating from pull requests matter.
                        if source.pull_request.is_none() {
                            continue;
                        }
                        events.push(TimelineEvent::CrossReferenced {
                            pr_number: source.number,
                            pr_closed: source.state == "closed",
                            at,
                        });
                    }
                    "reopened" => events.push(TimelineEvent::Reopened { actor, at }),
                    "closed" => events.push(TimelineEvent::Closed { actor, at }),
                    _ => {}
                }
            }

            if done {
                break;
            }
        }
        debug!(issue, events = events.len(), "fetched timeline");
        Ok(events)
    }

    async fn merge_reachable(&self, sha: &str) -> Result<bool, ForgeError> {
        #[derive(serde::Deserialize)]
        struct CompareResponse {
            status: String,
        }

        let url = self.api_url(&format!("compare/{}...{}", self.default_branch, sha));
        let compare = self
            .get(&url)
            .send()
            .await?
            .error_for_status()?
            .json::<CompareResponse>()
            .await?;
        // "identical" or "behind" means the merge commit is an ancestor of
        // the default branch head.
        Ok(compare.status == "identical" || compare.status == "behind")
    }

    async fn file_exists(&self, path: &str) -> Result<bool, ForgeError> {
        let url = self.api_url(&format!("contents/{path}?ref={}", self.default_branch));
        let response = self.get(&url).send().await?;
        if response.status() == reqwest::StatusCode::NOT_FOUND {
            return Ok(false);
        }
        response.error_for_status()?;
        Ok(true)
    }

    #[instrument(skip(self, body))]
    async fn post_comment(&self, issue: u64, body: &str) -> Result<(), ForgeError> {
        let url = self.api_url(&format!("issues/{issue}/comments"));
        self.client
            .post(&url)
            .header("User-Agent", "issue-sweeper")
            .header("Accept", "application/vnd.github+json")
            .bearer_auth(&self.token)
            .json(&serde_json::json!({ "body": body }))
            .send()
            .await?
            .error_for_status()?;
        Ok(())
    }

    #[instrument(skip(self))]
    async fn add_label(&self, issue: u64, label: &str) -> Result<(), ForgeError> {
        let url = self.api_url(&format!("issues/{issue}/labels"));
        self.client
            .post(&url)
            .header("User-Agent", "issue-sweeper")
            .header("Accept", "application/vnd.github+json")
            .bearer_auth(&self.token)
            .json(&serde_json::json!({ "labels": [label] }))
            .send()
            .await?
            .error_for_status()?;
        Ok(())
    }

    #[instrument(skip(self))]
    async fn close_issue(&self, issue: u64) -> Result<(), ForgeError> {
        let url = self.api_url(&format!("issues/{issue}"));
        self.client
            .patch(&url)
            .header("User-Agent", "issue-sweeper")
            .header("Accept", "application/vnd.github+json")
            .bearer_auth(&self.token)
            .json(&serde_json::json!({ "state": "closed" }))
            .send()
            .await?
            .error_for_status()?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_shorthand_target() {
        let target = parse_repo_target("org/repo").unwrap();
        assert_eq!(target.owner, "org");
        assert_eq!(target.repo, "repo");
    }

    #[test]
    fn test_parse_url_target() {
        let target = parse_repo_target("https://github.com/org/repo").unwrap();
        assert_eq!(target.owner, "org");
        assert_eq!(target.repo, "repo");
        assert_eq!(target.to_string(), "org/repo");
    }

    #[test]
    fn test_parse_invalid_target() {
        assert!(parse_repo_target("https://example.com/org/repo").is_err());
        assert!(parse_repo_target("just-a-repo").is_err());
        assert!(parse_repo_target("a/b/c").is_err());
    }

    #[test]
    fn test_pull_response_merge_state() {
        let merged: PullResponse = serde_json::from_str(
            r#"{"number":5,"title":"t","body":"Fixes #9","state":"closed",
                "merged_at":"2026-02-01T00:00:00Z","merge_commit_sha":"abc"}"#,
        )
        .unwrap();
        let pr = merged.into_pull_request(vec!["src/lib.rs".to_string()]);
        assert_eq!(pr.merge_state, MergeState::Merged);
        assert_eq!(pr.closes, vec![9]);

        let unmerged: PullResponse = serde_json::from_str(
            r#"{"number":6,"title":"t","body":null,"state":"closed",
                "merged_at":null,"merge_commit_sha":null}"#,
        )
        .unwrap();
        let pr = unmerged.into_pull_request(vec![]);
        assert_eq!(pr.merge_state, MergeState::ClosedUnmerged);
        assert!(pr.closes.is_empty());
    }
}
