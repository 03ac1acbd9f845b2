use std::path::PathBuf;

use anyhow::Context;
use chrono::{NaiveDate, Utc};
use clap::{Parser, Subcommand};
use sqlx::postgres::PgPoolOptions;
use sqlx::PgPool;
use uuid::Uuid;

mod badges;
mod config;
mod db;
mod models;
mod progress;
mod questions;
mod report;
mod scoring;

#[derive(Parser)]
#[command(name = "therapy-progress")]
#[command(about = "Speech-therapy progress, M-CHAT-R screening and badge tracker", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Create or upgrade the database schema
    InitDb,
    /// Load demo parent, children, sessions and goals
    Seed,
    /// Score an M-CHAT-R answers file and store the result
    Screen {
        /// Stored against this child's parent
        #[arg(long, required_unless_present = "dry_run")]
        child: Option<Uuid>,
        /// CSV with `question,answer` columns
        #[arg(long)]
        answers: PathBuf,
        /// Print the result as JSON
        #[arg(long)]
        json: bool,
        /// Score without storing
        #[arg(long)]
        dry_run: bool,
    },
    /// Record a therapy session and award any new badges
    LogSession {
        #[arg(long)]
        child: Uuid,
        #[arg(long, default_value_t = 1)]
        stars: u16,
        #[arg(long, default_value = "")]
        note: String,
        /// Defaults to today
        #[arg(long)]
        date: Option<NaiveDate>,
    },
    /// Import session logs from a CSV file
    ImportSessions {
        #[arg(long)]
        csv: PathBuf,
    },
    /// Add a therapy goal for a child
    AddGoal {
        #[arg(long)]
        child: Uuid,
        #[arg(long)]
        title: String,
    },
    /// Mark a goal completed and award any new badges
    CompleteGoal {
        #[arg(long)]
        goal: Uuid,
    },
    /// Re-evaluate badges for a child
    AwardBadges {
        #[arg(long)]
        child: Uuid,
    },
    /// Generate a markdown progress report
    Report {
        #[arg(long)]
        child: Uuid,
        #[arg(long, default_value = "report.md")]
        out: PathBuf,
        #[arg(long, default_value_t = 5)]
        sessions: i64,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "therapy_progress=info".into()),
        )
        .init();

    let cli = Cli::parse();

    if let Commands::Screen {
        answers,
        json,
        dry_run: true,
        ..
    } = &cli.command
    {
        let (answer_set, result) = score_file(answers)?;
        print_screening(&answer_set, &result, *json)?;
        return Ok(());
    }

    let config = config::Config::from_env()?;
    let pool = PgPoolOptions::new()
        .max_connections(config.max_connections)
        .connect(&config.database_url)
        .await
        .context("failed to connect to Postgres")?;
    tracing::debug!(max_connections = config.max_connections, "connected to Postgres");

    let today = Utc::now().date_naive();

    match cli.command {
        Commands::InitDb => {
            db::init_db(&pool).await?;
            println!("Schema ready.");
        }
        Commands::Seed => {
            db::seed(&pool).await?;
            println!("Seed data inserted.");
        }
        Commands::Screen {
            child: Some(child),
            answers,
            json,
            ..
        } => {
            let (answer_set, result) = score_file(&answers)?;
            let (id, parent) = db::insert_screening(&pool, child, &answer_set, &result).await?;
            tracing::info!(
                screening = %id,
                child = %child,
                parent = %parent,
                score = result.total_score,
                risk = %result.risk_level,
                "screening stored"
            );
            print_screening(&answer_set, &result, json)?;
        }
        Commands::Screen { child: None, .. } => {
            anyhow::bail!("--child is required unless --dry-run is set");
        }
        Commands::LogSession {
            child,
            stars,
            note,
            date,
        } => {
            let logged_on = date.unwrap_or(today);
            let source_key = format!("cli-{}", Uuid::new_v4());
            db::insert_session(&pool, child, logged_on, i32::from(stars), &note, &source_key)
                .await?;
            println!("Logged {stars} stars on {logged_on}.");
            refresh_badges(&pool, child, today).await?;
        }
        Commands::ImportSessions { csv } => {
            let (inserted, children) = db::import_sessions_csv(&pool, &csv).await?;
            println!("Inserted {inserted} sessions from {}.", csv.display());
            for child in children {
                refresh_badges(&pool, child, today).await?;
            }
        }
        Commands::AddGoal { child, title } => {
            let id = db::add_goal(&pool, child, &title).await?;
            println!("Goal {id} added.");
        }
        Commands::CompleteGoal { goal } => match db::complete_goal(&pool, goal, today).await? {
            Some(child) => {
                println!("Goal {goal} completed.");
                refresh_badges(&pool, child, today).await?;
            }
            None => {
                tracing::warn!(goal = %goal, "goal not found or already completed");
                println!("No active goal {goal}.");
            }
        },
        Commands::AwardBadges { child } => {
            refresh_badges(&pool, child, today).await?;
        }
        Commands::Report {
            child,
            out,
            sessions,
        } => {
            refresh_badges(&pool, child, today).await?;
            let record = db::fetch_child(&pool, child).await?;
            let stats = db::fetch_child_stats(&pool, child, today).await?;
            let screenings = db::fetch_screenings(&pool, child).await?;
            let earned = db::fetch_child_badges(&pool, child).await?;
            let goals = db::fetch_goals(&pool, child).await?;
            let recent = db::fetch_recent_sessions(&pool, child, sessions.max(0)).await?;

            let snapshot = report::ProgressSnapshot {
                child: &record,
                stats,
                screenings: &screenings,
                badges: &earned,
                goals: &goals,
                sessions: &recent,
            };
            std::fs::write(&out, report::build_report(&snapshot, today))?;
            println!("Report written to {}.", out.display());
        }
    }

    Ok(())
}

fn score_file(
    path: &std::path::Path,
) -> anyhow::Result<(models::AnswerSet, models::ScreeningResult)> {
    let file = std::fs::File::open(path)
        .with_context(|| format!("failed to open {}", path.display()))?;
    let answers = questions::read_answers(file)?;

    let missing = scoring::unanswered(&answers);
    if !missing.is_empty() {
        tracing::warn!(?missing, "answers incomplete; unanswered questions are not scored");
    }

    let result = scoring::score_answers(&answers);
    Ok((answers, result))
}

fn print_screening(
    answers: &models::AnswerSet,
    result: &models::ScreeningResult,
    json: bool,
) -> anyhow::Result<()> {
    if json {
        println!("{}", serde_json::to_string_pretty(result)?);
        return Ok(());
    }

    println!(
        "Score {}/{} ({} risk), {} critical items.",
        result.total_score,
        questions::QUESTION_COUNT,
        result.risk_level,
        result.critical_count
    );
    for question in scoring::at_risk_questions(answers) {
        println!("  {:>2}. {}", question.number, question.prompt);
    }
    if result.requires_follow_up {
        println!("Follow-up required.");
    }
    println!("{}", result.message);
    Ok(())
}

async fn refresh_badges(pool: &PgPool, child: Uuid, today: NaiveDate) -> anyhow::Result<()> {
    for badge in db::refresh_badges(pool, child, today).await? {
        println!("New badge: {} {} ({})", badge.icon, badge.name, badge.description);
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn cli_definition_is_valid() {
        Cli::command().debug_assert();
    }

    #[test]
    fn screen_requires_child_unless_dry_run() {
        let missing = Cli::try_parse_from(["therapy-progress", "screen", "--answers", "a.csv"]);
        assert!(missing.is_err());

        let dry_run =
            Cli::try_parse_from(["therapy-progress", "screen", "--answers", "a.csv", "--dry-run"]);
        assert!(matches!(
            dry_run.map(|cli| cli.command),
            Ok(Commands::Screen { child: None, dry_run: true, .. })
        ));

        let child = Uuid::new_v4().to_string();
        let stored = Cli::try_parse_from([
            "therapy-progress",
            "screen",
            "--answers",
            "a.csv",
            "--child",
            child.as_str(),
        ]);
        assert!(matches!(
            stored.map(|cli| cli.command),
            Ok(Commands::Screen { child: Some(_), dry_run: false, .. })
        ));
    }

    #[test]
    fn screen_no_longer_accepts_parent() {
        let child = Uuid::new_v4().to_string();
        let parent = Uuid::new_v4().to_string();
        let parsed = Cli::try_parse_from([
            "therapy-progress",
            "screen",
            "--answers",
            "a.csv",
            "--child",
            child.as_str(),
            "--parent",
            parent.as_str(),
        ]);
        assert!(parsed.is_err());
    }
}
