/// Closing-reference parsing for PR bodies.
///
/// The forge auto-closes an issue when a merged PR body contains a closing
/// keyword followed by an issue reference ("Fixes #12",
/// "resolves: https://github.com/o/r/issues/12"). This module recognizes the
/// same syntax so the pipeline can tell closing references from passive
/// mentions without another API round trip.
const CLOSING_KEYWORDS: &[&str] = &[
    "close", "closes", "closed", "fix", "fixes", "fixed", "resolve", "resolves", "resolved",
];

/// Extract the issue numbers a PR body references with closing keywords.
///
/// Scans whitespace-separated tokens: a closing keyword (optionally suffixed
/// with ':') followed by `#N` or a full issues URL counts. Duplicates are
/// collapsed, order of first appearance is kept.
pub fn closing_references(body: &str) -> Vec<u64> {
    let mut refs = Vec::new();
    let tokens: Vec<&str> = body.split_whitespace().collect();

    for window in tokens.windows(2) {
        let keyword = window[0]
            .trim_end_matches(':')
            .to_ascii_lowercase();
        if !CLOSING_KEYWORDS.contains(&keyword.as_str()) {
            continue;
        }
        if let Some(number) = parse_issue_token(window[1]) {
            if !refs.contains(&number) {
                refs.push(number);
            }
        }
    }

    refs
}

/// Parse a single token as an issue reference: `#N` or an issues URL.
/// Trailing punctuation (".", ",", ")") is tolerated.
fn parse_issue_token(token: &str) -> Option<u64> {
    let token = token.trim_end_matches(['.', ',', ')', ';']);

    if let Some(digits) = token.strip_prefix('#') {
        return digits.parse().ok();
    }

    // Full URL form: https://github.com/{owner}/{repo}/issues/{number}
    if let Some(rest) = token
        .strip_prefix("https://github.com/")
        .or_else(|| token.strip_prefix("http://github.com/"))
    {
        let segments: Vec<&str> = rest.split('/').collect();
        if segments.len() == 4 && segments[2] == "issues" {
            return segments[3].parse().ok();
        }
    }

    None
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_simple_closing_reference() {
        assert_eq!(closing_references("Fixes #12"), vec![12]);
        assert_eq!(closing_references("this resolves #3."), vec![3]);
    }

    #[test]
    fn test_keyword_case_and_colon() {
        assert_eq!(closing_references("CLOSES: #7"), vec![7]);
        assert_eq!(closing_references("Fixed: #9,"), vec![9]);
    }

    #[test]
    fn test_url_form() {
        assert_eq!(
            closing_references("Closes https://github.com/org/repo/issues/41"),
            vec![41]
        );
    }

    #[test]
    fn test_mention_without_keyword_is_not_closing() {
        assert!(closing_references("related to #5 and see #6").is_empty());
    }

    #[test]
    fn test_keyword_without_reference() {
        assert!(closing_references("fixes a typo in the docs").is_empty());
    }

    #[test]
    fn test_multiple_and_duplicate_references() {
        assert_eq!(
            closing_references("Fixes #1, fixes #2, and fixes #1 again"),
            vec![1, 2]
        );
    }

    #[test]
    fn test_partial_phrasing_still_parses_keyword_pair() {
        // "partially resolves #30" still carries a closing reference on the
        // forge; partial-fix handling belongs to the content check, not here.
        assert_eq!(closing_references("partially resolves #30"), vec![30]);
    }
}
