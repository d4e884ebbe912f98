use std::path::PathBuf;
use std::process::ExitCode;
use std::sync::Arc;

use anyhow::Context;
use clap::{Parser, Subcommand, ValueEnum};
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

mod api;
mod config;
mod groups;
mod joiner;
mod models;
mod notice;
mod prompt;
mod report;
mod roster;
mod session;
#[cfg(test)]
mod testing;

use api::{CourseApi, HttpCourseApi};
use config::AppConfig;
use groups::GroupView;
use notice::Notice;
use prompt::TerminalConfirm;
use roster::RosterManager;
use session::SessionContext;

#[derive(Parser)]
#[command(name = "course-groups")]
#[command(about = "Course roster and work-group manager for Group Scholar", long_about = None)]
struct Cli {
    /// YAML configuration file (defaults to ./course-groups.yaml when present)
    #[arg(long, global = true)]
    config: Option<PathBuf>,
    /// Session store holding `userData` and `courseId`
    #[arg(long, global = true)]
    session: Option<PathBuf>,
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Show the active course and its enrolled students
    Roster,
    /// List students that can be added to the course
    Candidates,
    /// Enroll a student in the active course
    AddStudent {
        #[arg(long)]
        student: String,
    },
    /// Remove a student from the active course
    RemoveStudent {
        #[arg(long)]
        student: String,
        /// Skip the confirmation prompt
        #[arg(long)]
        yes: bool,
    },
    /// Show the groups visible to the signed-in user
    Groups {
        #[arg(long, value_enum, default_value_t = OutputFormat::Text)]
        format: OutputFormat,
        #[arg(long)]
        out: Option<PathBuf>,
    },
    /// Ask the group service for random groups
    CreateRandomGroups {
        #[arg(long, value_parser = clap::value_parser!(u32).range(1..))]
        count: u32,
    },
    /// Ask the group service for groups informed by the social survey
    CreateSpecializedGroups {
        #[arg(long, value_parser = clap::value_parser!(u32).range(1..))]
        count: u32,
        /// Skip the confirmation prompt
        #[arg(long)]
        yes: bool,
        /// Print the request payload instead of submitting it
        #[arg(long)]
        dry_run: bool,
    },
}

#[derive(Clone, Copy, ValueEnum)]
enum OutputFormat {
    Text,
    Markdown,
    Csv,
}

fn init_tracing(config: &AppConfig) {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&config.log_level));
    let registry = tracing_subscriber::registry().with(filter);
    if config.log_json {
        registry
            .with(fmt::layer().json().with_writer(std::io::stderr))
            .init();
    } else {
        registry
            .with(fmt::layer().with_writer(std::io::stderr))
            .init();
    }
}

/// Prints a notice and reports whether the command should count as failed.
fn announce(notice: Option<&Notice>) -> bool {
    match notice {
        Some(notice) => {
            println!("{notice}");
            notice.is_failure()
        }
        None => false,
    }
}

fn exit_code(failed: bool) -> ExitCode {
    if failed {
        ExitCode::FAILURE
    } else {
        ExitCode::SUCCESS
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<ExitCode> {
    let cli = Cli::parse();
    let config = AppConfig::load(cli.config.as_deref())?;
    init_tracing(&config);

    let session_path = cli.session.unwrap_or_else(|| config.session_path.clone());
    let session = SessionContext::load(&session_path)
        .with_context(|| format!("failed to load session from {}", session_path.display()))?;

    let api: Arc<dyn CourseApi> = Arc::new(
        HttpCourseApi::from_settings(&config.api_base_url, config.request_timeout())
            .context("failed to set up the course API client")?,
    );

    let failed = match cli.command {
        Commands::Roster => {
            let mut roster = RosterManager::new(api, session, config.resolve_policy);
            let failed = announce(roster.load().await.as_ref());
            print!("{}", report::render_roster(roster.course(), roster.enrolled()));
            failed
        }
        Commands::Candidates => {
            let mut roster = RosterManager::new(api, session, config.resolve_policy);
            let failed = announce(roster.load().await.as_ref());
            let options = roster.candidates();
            if options.is_empty() {
                println!("No students found in the directory.");
            }
            for option in options {
                println!("- {} [{}]", option.label, option.value);
            }
            failed
        }
        Commands::AddStudent { student } => {
            let mut roster = RosterManager::new(api, session, config.resolve_policy);
            announce(roster.load().await.as_ref());
            let notice = roster.add_student(&student).await;
            let failed = announce(Some(&notice));
            print!("{}", report::render_roster(roster.course(), roster.enrolled()));
            failed
        }
        Commands::RemoveStudent { student, yes } => {
            let mut roster = RosterManager::new(api, session, config.resolve_policy);
            announce(roster.load().await.as_ref());
            let notice = roster
                .remove_student(&student, &TerminalConfirm::new(yes))
                .await;
            let failed = announce(Some(&notice));
            print!("{}", report::render_roster(roster.course(), roster.enrolled()));
            failed
        }
        Commands::Groups { format, out } => {
            let mut view = GroupView::new(api, session);
            let failed = announce(view.load().await.as_ref());

            let rendered = match format {
                OutputFormat::Text => report::render_groups(&view),
                OutputFormat::Markdown => report::build_report(&view, chrono::Utc::now()),
                OutputFormat::Csv => {
                    let mut buffer = Vec::new();
                    report::write_groups_csv(&view, &mut buffer)
                        .context("failed to render groups as CSV")?;
                    String::from_utf8(buffer).context("CSV output was not UTF-8")?
                }
            };

            match out {
                Some(path) => {
                    std::fs::write(&path, rendered)
                        .with_context(|| format!("failed to write {}", path.display()))?;
                    println!("Groups written to {}.", path.display());
                }
                None => print!("{rendered}"),
            }
            failed
        }
        Commands::CreateRandomGroups { count } => {
            let mut view = GroupView::new(api, session);
            announce(view.load().await.as_ref());
            let notice = view.create_random(count).await;
            let failed = announce(Some(&notice));
            print!("{}", report::render_groups(&view));
            failed
        }
        Commands::CreateSpecializedGroups {
            count,
            yes,
            dry_run,
        } => {
            let mut view = GroupView::new(api, session);
            announce(view.load().await.as_ref());

            if dry_run {
                match view.preview_specialized(count).await {
                    Ok(request) => {
                        println!("{}", serde_json::to_string_pretty(&request)?);
                        false
                    }
                    Err(notice) => announce(Some(&notice)),
                }
            } else {
                let notice = view
                    .create_specialized(count, &TerminalConfirm::new(yes))
                    .await;
                let failed = announce(Some(&notice));
                print!("{}", report::render_groups(&view));
                failed
            }
        }
    };

    Ok(exit_code(failed))
}
