pub mod types;

pub use types::{CandidateVerdict, ConfidenceTier, Findings, ProposalRow};

use std::io::BufRead;
use std::path::Path;

use colored::Colorize;
use thiserror::Error;
use tracing::{debug, info, instrument};

use crate::forge::{Forge, ForgeError};

#[derive(Debug, Error)]
pub enum ReportError {
    #[error("Failed to write report file: {0}")]
    FileWrite(#[from] std::io::Error),

    #[error("Write action attempted for issue #{0} without covering approval")]
    Unapproved(u64),

    #[error("Forge write failed: {0}")]
    Forge(#[from] ForgeError),
}

/// Proof that the operator approved a set of issues for write actions.
/// The field is private and the only constructor lives in
/// [`await_decision`], so write actions cannot be reached without passing
/// the gate — attempting to is a compile error, not a runtime surprise.
#[derive(Debug)]
pub struct Approval {
    approved: Vec<u64>,
}

impl Approval {
    pub fn issues(&self) -> &[u64] {
        &self.approved
    }
}

/// Operator decision at the gate.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Decision {
    ApproveAll,
    ApproveSubset(Vec<u64>),
    RejectAll,
    /// Replace the closing-comment wording, then decide again.
    EditWording(String),
}

/// What the gate produced: an approval (or none) and an optional
/// operator-edited comment.
#[derive(Debug)]
pub struct GateOutcome {
    pub approval: Option<Approval>,
    pub comment_override: Option<String>,
}

/// Aggregate verdicts into findings: every High or Medium verdict becomes
/// part of a per-issue proposal row; rejections are kept for the record but
/// never presented for action.
pub fn build(repo: &str, verdicts: Vec<CandidateVerdict>) -> Findings {
    let mut proposals: Vec<ProposalRow> = Vec::new();
    for verdict in verdicts
        .iter()
        .filter(|v| v.tier > ConfidenceTier::Reject)
    {
        match proposals.iter_mut().find(|row| row.issue == verdict.issue) {
            Some(row) => {
                if !row.prs.contains(&verdict.pr) {
                    row.prs.push(verdict.pr);
                }
                if verdict.tier > row.tier {
                    row.tier = verdict.tier;
                    row.rationale = verdict.justification.clone();
                }
            }
            None => proposals.push(ProposalRow {
                issue: verdict.issue,
                title: verdict.issue_title.clone(),
                prs: vec![verdict.pr],
                tier: verdict.tier,
                rationale: verdict.justification.clone(),
            }),
        }
    }
    proposals.sort_by_key(|row| row.issue);

    Findings {
        repo: repo.to_string(),
        verdicts,
        proposals,
    }
}

/// Output the findings table to the terminal, and to a markdown file when a
/// path is given.
#[instrument(skip(findings), fields(repo = %findings.repo, proposals = findings.proposals.len()))]
pub fn output(findings: &Findings, output_path: Option<&Path>) -> Result<(), ReportError> {
    debug!("writing findings table to terminal");
    print_terminal_table(findings);
    if let Some(path) = output_path {
        debug!(path = %path.display(), "writing findings to markdown file");
        write_markdown(findings, path)?;
    }
    Ok(())
}

fn format_prs(prs: &[u64]) -> String {
    prs.iter()
        .map(|pr| format!("#{pr}"))
        .collect::<Vec<_>>()
        .join(", ")
}

fn print_terminal_table(findings: &Findings) {
    println!();
    println!(
        "Sweep of {} — {} candidate pair(s) validated, {} proposal(s)",
        findings.repo,
        findings.verdicts.len(),
        findings.proposals.len()
    );
    println!();

    if findings.proposals.is_empty() {
        println!("  Nothing to propose.");
        println!();
        return;
    }

    for row in &findings.proposals {
        println!(
            "  #{} \"{}\"  —  PR {}  [{}]",
            row.issue,
            row.title,
            format_prs(&row.prs),
            colorize_tier(row.tier)
        );
        println!("      {}", row.rationale);
    }
    println!();
}

/// Write the findings as a markdown table for offline review.
fn write_markdown(findings: &Findings, path: &Path) -> Result<(), ReportError> {
    let mut md = String::new();
    md.push_str(&format!("# Issue sweep — {}\n\n", findings.repo));
    md.push_str(&format!(
        "{} candidate pair(s) validated, {} proposal(s).\n\n",
        findings.verdicts.len(),
        findings.proposals.len()
    ));

    if !findings.proposals.is_empty() {
        md.push_str("| Issue | Proposed PR(s) | Confidence | Rationale |\n");
        md.push_str("|---|---|---|---|\n");
        for row in &findings.proposals {
            md.push_str(&format!(
                "| #{} {} | {} | {} | {} |\n",
                row.issue,
                row.title,
                format_prs(&row.prs),
                row.tier,
                row.rationale
            ));
        }
        md.push('\n');
    }

    std::fs::write(path, md)?;
    Ok(())
}

fn colorize_tier(tier: ConfidenceTier) -> colored::ColoredString {
    match tier {
        ConfidenceTier::High => "HIGH".green().bold(),
        ConfidenceTier::Medium => "MEDIUM".yellow().bold(),
        ConfidenceTier::Reject => "REJECT".red().bold(),
    }
}

/// Parse one line of operator input into a decision.
///
/// `a`/`all` approves everything, a list of issue numbers (optionally
/// prefixed with `s`) approves a subset, `r`/`n`/`q` rejects everything,
/// `e <text>` replaces the closing-comment wording.
pub fn parse_decision(line: &str) -> Option<Decision> {
    let line = line.trim();
    let (head, rest) = match line.split_once(char::is_whitespace) {
        Some((head, rest)) => (head, rest.trim()),
        None => (line, ""),
    };

    match head.to_ascii_lowercase().as_str() {
        "a" | "all" | "approve" => Some(Decision::ApproveAll),
        "r" | "n" | "q" | "reject" => Some(Decision::RejectAll),
        "e" | "edit" if !rest.is_empty() => Some(Decision::EditWording(rest.to_string())),
        "s" | "subset" => parse_subset(rest),
        _ => parse_subset(line),
    }
}

fn parse_subset(text: &str) -> Option<Decision> {
    let numbers: Vec<u64> = text
        .split_whitespace()
        .map(|t| t.trim_start_matches('#').parse().ok())
        .collect::<Option<Vec<_>>>()?;
    if numbers.is_empty() {
        return None;
    }
    Some(Decision::ApproveSubset(numbers))
}

/// The terminal gate. Blocks on operator input until an approval or a
/// rejection is received; absence of input (EOF) means no action is taken.
/// This is the only place an [`Approval`] can be minted.
pub fn await_decision(
    findings: &Findings,
    input: &mut impl BufRead,
) -> Result<GateOutcome, ReportError> {
    let mut comment_override = None;

    if findings.proposals.is_empty() {
        return Ok(GateOutcome {
            approval: None,
            comment_override,
        });
    }

    loop {
        println!(
            "Decision? [a]pprove all / [s]ubset <issue numbers> / [r]eject all / [e]dit <comment wording>"
        );
        let mut line = String::new();
        if input.read_line(&mut line)? == 0 {
            // EOF: no approval, no action.
            return Ok(GateOutcome {
                approval: None,
                comment_override,
            });
        }

        match parse_decision(&line) {
            Some(Decision::ApproveAll) => {
                let approved = findings.proposals.iter().map(|row| row.issue).collect();
                return Ok(GateOutcome {
                    approval: Some(Approval { approved }),
                    comment_override,
                });
            }
            Some(Decision::ApproveSubset(numbers)) => {
                let approved: Vec<u64> = numbers
                    .into_iter()
                    .filter(|n| findings.proposals.iter().any(|row| row.issue == *n))
                    .collect();
                if approved.is_empty() {
                    println!("None of those issue numbers are in the findings table.");
                    continue;
                }
                return Ok(GateOutcome {
                    approval: Some(Approval { approved }),
                    comment_override,
                });
            }
            Some(Decision::RejectAll) => {
                return Ok(GateOutcome {
                    approval: None,
                    comment_override,
                });
            }
            Some(Decision::EditWording(text)) => {
                println!("Closing-comment wording updated.");
                comment_override = Some(text);
            }
            None => {
                println!("Unrecognized input.");
            }
        }
    }
}

/// Execute the approved write actions: comment, label, close. Only callable
/// with an [`Approval`], and every acted-on issue is re-checked against the
/// findings — an approved number with no proposal row is a programming error
/// surfaced as [`ReportError::Unapproved`].
pub async fn execute(
    forge: &dyn Forge,
    findings: &Findings,
    approval: &Approval,
    label: &str,
    comment_template: &str,
) -> Result<usize, ReportError> {
    let mut acted = 0;
    for issue in approval.issues() {
        let row = findings
            .proposals
            .iter()
            .find(|row| row.issue == *issue)
            .ok_or(ReportError::Unapproved(*issue))?;

        let comment = comment_template.replace("{prs}", &format_prs(&row.prs));
        forge.post_comment(row.issue, &comment).await?;
        forge.add_label(row.issue, label).await?;
        forge.close_issue(row.issue).await?;
        info!(issue = row.issue, prs = %format_prs(&row.prs), "issue closed as already resolved");
        acted += 1;
    }
    Ok(acted)
}
