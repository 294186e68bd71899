/// Evidence strength for a candidate, as presented to the operator.
/// High means "propose for closure", Medium means "needs human judgment".
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum ConfidenceTier {
    Reject,
    Medium,
    High,
}

impl std::fmt::Display for ConfidenceTier {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ConfidenceTier::Reject => write!(f, "REJECT"),
            ConfidenceTier::Medium => write!(f, "MEDIUM"),
            ConfidenceTier::High => write!(f, "HIGH"),
        }
    }
}

/// Outcome of a single validation check.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum CheckOutcome {
    Pass,
    Fail,
    /// Evidence too ambiguous for a hard pass/fail; degrades the tier.
    Ambiguous,
    /// Not evaluated because an earlier check already failed.
    #[default]
    Skipped,
}

/// Per-check outcomes for one (issue, PR) candidate, in evaluation order.
#[derive(Debug, Clone, Copy, Default)]
pub struct CheckOutcomes {
    pub merge: CheckOutcome,
    pub ordering: CheckOutcome,
    pub reopen: CheckOutcome,
    pub content: CheckOutcome,
    pub presence: CheckOutcome,
}

impl CheckOutcomes {
    /// Derive the confidence tier. High requires every check to pass; a
    /// failing hard check forces Reject; an ambiguous content check with
    /// everything else passing degrades to Medium.
    pub fn tier(&self) -> ConfidenceTier {
        let hard = [self.merge, self.ordering, self.reopen, self.presence];
        if hard.contains(&CheckOutcome::Fail) || self.content == CheckOutcome::Fail {
            return ConfidenceTier::Reject;
        }
        if hard.iter().any(|c| *c != CheckOutcome::Pass) {
            // A skipped or ambiguous hard check means the pair was never
            // fully validated.
            return ConfidenceTier::Reject;
        }
        match self.content {
            CheckOutcome::Pass => ConfidenceTier::High,
            CheckOutcome::Ambiguous => ConfidenceTier::Medium,
            _ => ConfidenceTier::Reject,
        }
    }
}

/// Classified result for one (issue, PR) candidate. Rebuilt on every run,
/// never persisted.
#[derive(Debug, Clone)]
pub struct CandidateVerdict {
    /// Issue number
    pub issue: u64,
    /// Issue title, carried for presentation
    pub issue_title: String,
    /// Candidate PR number
    pub pr: u64,
    /// Outcome of each validation check
    pub checks: CheckOutcomes,
    /// Derived confidence tier
    pub tier: ConfidenceTier,
    /// Free-text justification shown to the operator
    pub justification: String,
}

/// One row of the findings table: an issue with its surviving candidate
/// PR(s), at the best tier any of them reached.
#[derive(Debug, Clone)]
pub struct ProposalRow {
    pub issue: u64,
    pub title: String,
    pub prs: Vec<u64>,
    pub tier: ConfidenceTier,
    pub rationale: String,
}

/// Everything a sweep produced: all verdicts plus the aggregated rows
/// awaiting operator review.
#[derive(Debug)]
pub struct Findings {
    /// Repository the sweep ran against (owner/repo)
    pub repo: String,
    /// Every verdict, including rejections
    pub verdicts: Vec<CandidateVerdict>,
    /// High and Medium verdicts grouped per issue
    pub proposals: Vec<ProposalRow>,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn all_pass() -> CheckOutcomes {
        CheckOutcomes {
            merge: CheckOutcome::Pass,
            ordering: CheckOutcome::Pass,
            reopen: CheckOutcome::Pass,
            content: CheckOutcome::Pass,
            presence: CheckOutcome::Pass,
        }
    }

    #[test]
    fn test_all_pass_is_high() {
        assert_eq!(all_pass().tier(), ConfidenceTier::High);
    }

    #[test]
    fn test_single_fail_forces_reject() {
        let setters: [fn(&mut CheckOutcomes); 4] = [
            |c| c.merge = CheckOutcome::Fail,
            |c| c.ordering = CheckOutcome::Fail,
            |c| c.reopen = CheckOutcome::Fail,
            |c| c.presence = CheckOutcome::Fail,
        ];
        for setter in setters {
            let mut checks = all_pass();
            setter(&mut checks);
            assert_eq!(checks.tier(), ConfidenceTier::Reject);
        }
    }

    #[test]
    fn test_ambiguous_content_is_medium() {
        let mut checks = all_pass();
        checks.content = CheckOutcome::Ambiguous;
        assert_eq!(checks.tier(), ConfidenceTier::Medium);
    }

    #[test]
    fn test_presence_fail_overrides_ambiguous_content() {
        let mut checks = all_pass();
        checks.content = CheckOutcome::Ambiguous;
        checks.presence = CheckOutcome::Fail;
        assert_eq!(checks.tier(), ConfidenceTier::Reject);
    }

    #[test]
    fn test_skipped_checks_never_reach_high() {
        // Default outcomes are all Skipped; an unvalidated pair must not
        // look proposable.
        assert_eq!(CheckOutcomes::default().tier(), ConfidenceTier::Reject);
    }

    #[test]
    fn test_tier_ordering_and_display() {
        assert!(ConfidenceTier::Reject < ConfidenceTier::Medium);
        assert!(ConfidenceTier::Medium < ConfidenceTier::High);
        assert_eq!(ConfidenceTier::High.to_string(), "HIGH");
    }
}
