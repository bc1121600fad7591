mod analysis;
mod apply;
mod chat;
mod models;
mod report;
mod resume;
mod scraper;
mod store;
mod utils;
mod workflow;

use clap::Parser;
use colored::Colorize;
use eyre::Result;
use log::{info, warn};

use crate::store::Store;
use crate::utils::cli::Args;
use crate::utils::config::{Config, config};
use crate::utils::log::Logger;
use crate::workflow::{Workflow, WorkflowState, WorkflowStatus};

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();
    Logger::init(args.verbosity);

    info!(
        "starting auto-apply {}",
        format!("v{}", env!("CARGO_PKG_VERSION")).magenta()
    );

    let config: Config = load_config(&args)?;

    if args.config_check {
        return config_check(&config);
    }

    let store = Store::open(&config.database.path).await?;

    let auto_apply = args.auto_apply || config.application.auto_apply;
    if auto_apply && args.dry_run {
        info!("dry run enabled, applications will be simulated");
    }

    let workflow = Workflow::new(
        config.clone(),
        store,
        args.resume.clone(),
        auto_apply,
        args.dry_run,
    )?;

    let state = workflow.run().await?;
    print_summary(&state);

    if state.status == WorkflowStatus::Error {
        std::process::exit(1);
    }

    Ok(())
}

/// File config plus CLI overrides, most specific wins.
fn load_config(args: &Args) -> Result<Config> {
    let base = config(args.config.clone())?;
    let mut inner = (*base).clone();

    if let Some(preset) = &args.preset {
        inner.apply_preset(preset)?;
    }
    if let Some(role) = &args.role {
        inner.search.role = role.clone();
    }
    if let Some(location) = &args.location {
        inner.search.location = location.clone();
    }
    if let Some(max_jobs) = args.max_jobs {
        inner.search.max_jobs = max_jobs;
    }

    Ok(std::sync::Arc::new(inner))
}

fn config_check(config: &Config) -> Result<()> {
    if config.validate() {
        println!("{}", "configuration is complete".green());
    } else {
        println!(
            "{}",
            "configuration is usable but incomplete, see warnings above".yellow()
        );
    }
    Ok(())
}

fn print_summary(state: &WorkflowState) {
    println!("\n{}", "=== Workflow Summary ===".cyan().bold());
    println!("  session:      {}", state.session_id);
    println!(
        "  status:       {}",
        match state.status {
            WorkflowStatus::Completed => "completed".green(),
            WorkflowStatus::CompletedWithWarnings => "completed with warnings".yellow(),
            WorkflowStatus::Error => "error".red(),
            WorkflowStatus::Running => "running".normal(),
        }
    );
    if let Some(completed_at) = state.completed_at {
        let elapsed = completed_at.signed_duration_since(state.started_at);
        println!("  duration:     {}s", elapsed.num_seconds());
    }
    println!("  postings:     {}", state.postings.len());
    println!("  analyzed:     {}", state.analyses.len());
    println!("  tailored:     {}", state.tailored.len());
    println!(
        "  applications: {} submitted of {} attempted",
        state.submitted_count(),
        state.attempts.len()
    );

    if let Some(summary) = &state.summary {
        if !summary.top_skills.is_empty() {
            println!("\n{}", "Most requested skills".bold());
            for (skill, count) in summary.top_skills.iter().take(5) {
                println!("  {} ({})", skill.yellow(), count);
            }
        }

        if !summary.category_breakdown.is_empty() {
            println!("\n{}", "Skills by category".bold());
            let mut categories: Vec<_> = summary.category_breakdown.iter().collect();
            categories.sort_by_key(|(category, _)| category.label());
            for (category, skills) in categories {
                println!("  {}: {}", category, skills.join(", "));
            }
        }
    }

    for error in &state.errors {
        warn!("stage {} reported: {}", error.stage, error.message);
    }

    if let Some(tracking) = &state.report {
        println!("{}", report::render(tracking));
    }
}
