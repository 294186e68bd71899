mod config;
mod forge;
mod report;
mod triage;

use clap::Parser;
use std::path::PathBuf;
use std::sync::Arc;
use tracing::{debug, info, info_span};
use tracing_subscriber::EnvFilter;

/// Issue Sweeper — CLI tool that finds open GitHub issues already resolved by
/// merged pull requests and, after operator approval, proposes them for
/// closure with a comment and a label.
#[derive(Parser, Debug)]
#[command(name = "issue-sweeper", version, about)]
struct Cli {
    /// Repository target (owner/repo or https://github.com/owner/repo)
    ///
    /// Not required when --mock is used.
    target: Option<String>,

    /// Optional output file path for a markdown findings report
    #[arg(short, long)]
    output: Option<PathBuf>,

    /// Use a built-in mock repository for demo purposes (no GitHub token needed)
    #[arg(long)]
    r#mock: bool,

    /// Override how many merged PRs are paged in per sweep
    #[arg(long)]
    limit: Option<usize>,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_target(true)
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();

    info!("loading configuration");
    let config = config::Config::load()?;

    let (forge, repo_name): (Arc<dyn forge::Forge>, String) = if cli.r#mock {
        info!("using mock forge data for demo");
        let fixture = include_str!("../tests/fixtures/sweep_fixture.json");
        (
            Arc::new(forge::mock::MockForge::from_fixture(fixture)?),
            "mock/repository".to_string(),
        )
    } else {
        let target_str = cli.target.as_deref().ok_or(
            "Repository target is required unless --mock is used. \
             Usage: issue-sweeper <owner/repo> or issue-sweeper --mock",
        )?;
        let target = forge::parse_repo_target(target_str)?;
        debug!(owner = %target.owner, repo = %target.repo, "parsed repository target");

        let token = config.github_token().ok_or(forge::ForgeError::MissingToken)?;
        info!("connecting to repository");
        let github = forge::GitHubForge::connect(target.clone(), token).await?;
        (Arc::new(github), target.to_string())
    };

    let _main_span = info_span!("sweep_run", repo = %repo_name).entered();
    let limit = cli.limit.unwrap_or_else(|| config.max_prs());

    info!("sweeping for already-resolved issues");
    let verdicts = triage::sweep(
        Arc::clone(&forge),
        &triage::content::KeywordOverlapScorer,
        limit,
    )
    .await?;
    info!(verdicts = verdicts.len(), "validation complete");

    let findings = report::build(&repo_name, verdicts);
    report::output(&findings, cli.output.as_deref())?;

    if findings.proposals.is_empty() {
        info!("nothing to propose, no approval needed");
        return Ok(());
    }

    // Hard terminal gate: no write action without an explicit approval.
    let stdin = std::io::stdin();
    let outcome = report::await_decision(&findings, &mut stdin.lock())?;
    match outcome.approval {
        Some(approval) => {
            let comment = outcome
                .comment_override
                .as_deref()
                .unwrap_or_else(|| config.comment());
            let acted = report::execute(
                forge.as_ref(),
                &findings,
                &approval,
                config.label(),
                comment,
            )
            .await?;
            info!(acted, "write actions complete");
        }
        None => info!("no approval given, proposals discarded"),
    }

    Ok(())
}
