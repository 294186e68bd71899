use crate::forge::{Issue, PullRequest};

/// Phrases in a PR body that signal an intentionally partial fix.
const PARTIAL_FIX_MARKERS: &[&str] = &["partially", "partial fix", "part of", "some of", "first step"];

/// Tokens too common to indicate topical overlap.
const STOPWORDS: &[&str] = &[
    "this", "that", "with", "from", "when", "then", "have", "been", "will", "would", "could",
    "should", "there", "their", "which", "into", "after", "before", "while", "because",
];

/// Result of comparing issue text against PR text.
#[derive(Debug, Clone, Copy)]
pub struct ContentScore {
    /// Topical overlap in [0, 1]; higher means the texts discuss the same
    /// concern.
    pub value: f32,
    /// The PR text contains a partial-fix marker.
    pub partial_fix: bool,
}

/// Pluggable scorer for the content-match check. Whether an issue and a PR
/// "address the same concern" is inherently judgment-based, so the scorer
/// returns a confidence value rather than a boolean; the validator maps low
/// or marked scores to an ambiguous outcome for human review, never to an
/// automated hard failure.
pub trait ContentScorer: Send + Sync {
    fn score(&self, issue: &Issue, pr: &PullRequest) -> ContentScore;
}

/// Default scorer: fraction of the issue's significant words that also
/// appear in the PR text. Deliberately simple; the trait exists so a
/// smarter scorer can be slotted in without touching the pipeline.
pub struct KeywordOverlapScorer;

impl KeywordOverlapScorer {
    fn significant_words(text: &str) -> Vec<String> {
        let mut words: Vec<String> = text
            .split(|c: char| !c.is_alphanumeric())
            .map(|w| w.to_ascii_lowercase())
            .filter(|w| w.len() >= 4 && !STOPWORDS.contains(&w.as_str()))
            .collect();
        words.sort();
        words.dedup();
        words
    }
}

impl ContentScorer for KeywordOverlapScorer {
    fn score(&self, issue: &Issue, pr: &PullRequest) -> ContentScore {
        let issue_text = format!("{} {}", issue.title, issue.body.as_deref().unwrap_or(""));
        let pr_text = format!("{} {}", pr.title, pr.body.as_deref().unwrap_or(""));
        let pr_lower = pr_text.to_ascii_lowercase();

        let partial_fix = PARTIAL_FIX_MARKERS
            .iter()
            .any(|marker| pr_lower.contains(marker));

        let issue_words = Self::significant_words(&issue_text);
        let pr_words = Self::significant_words(&pr_text);
        let value = if issue_words.is_empty() {
            // Nothing to compare against; leave it to a human.
            0.0
        } else {
            let shared = issue_words.iter().filter(|w| pr_words.contains(w)).count();
            shared as f32 / issue_words.len() as f32
        };

        ContentScore { value, partial_fix }
    }
}
