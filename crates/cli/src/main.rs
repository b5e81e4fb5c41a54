use advisor_core::domain::persona::PersonaId;
use advisor_core::domain::profile::UserProfile;
use advisor_core::pipeline::{ChatRequest, Pipeline};
use anyhow::Context;
use clap::{Parser, Subcommand};
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

mod batch_file;

#[derive(Debug, Parser)]
#[command(name = "advisor")]
struct Args {
    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Create the local store schema and load the bundled companies if the table is empty.
    Seed,

    /// Answer one question and print the JSON reply.
    Ask {
        #[arg(long)]
        message: String,

        /// strategic_advisor | educational_explainer | batch_summarizer
        #[arg(long)]
        persona: Option<PersonaId>,

        /// conservative | balanced | aggressive (Korean labels also accepted)
        #[arg(long, default_value = "balanced")]
        profile: UserProfile,

        /// Reference date (YYYY-MM-DD) for trailing returns. Defaults to today's KST date.
        #[arg(long)]
        as_of_date: Option<String>,
    },

    /// Summarize a list of companies from a JSON file.
    Batch {
        #[arg(long)]
        file: PathBuf,

        #[arg(long)]
        message: Option<String>,

        #[arg(long, default_value = "balanced")]
        profile: UserProfile,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();

    let settings = advisor_core::config::Settings::from_env()?;
    let _sentry_guard = init_sentry(&settings);

    tracing_subscriber::registry()
        .with(EnvFilter::from_default_env())
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .with(sentry_tracing::layer())
        .init();

    let args = Args::parse();
    if let Err(err) = run(args.command, &settings).await {
        sentry_anyhow::capture_anyhow(&err);
        tracing::error!(error = %err, "command failed");
        return Err(err);
    }
    Ok(())
}

async fn run(command: Command, settings: &advisor_core::config::Settings) -> anyhow::Result<()> {
    match command {
        Command::Seed => {
            let pool = advisor_core::storage::connect(&settings.local_store_url).await?;
            let store = advisor_core::store::local::SqliteRecordStore::from_pool(pool);
            let seeded = store.initialize().await?;
            tracing::info!(url = %settings.local_store_url, seeded, "seed finished");
            print_json(&serde_json::json!({ "seeded": seeded }))
        }
        Command::Ask {
            message,
            persona,
            profile,
            as_of_date,
        } => {
            let today = resolve_as_of_date(as_of_date.as_deref())?;
            let pipeline = Pipeline::from_settings(settings).await?;
            let reply = pipeline
                .answer_at(ChatRequest { message, persona }, profile, today)
                .await;
            if !reply.degradations.is_empty() {
                tracing::warn!(degradations = ?reply.degradations, "answer degraded");
            }
            print_json(&reply)
        }
        Command::Batch {
            file,
            message,
            profile,
        } => {
            let req = batch_file::read(&file, message)?;
            let pipeline = Pipeline::from_settings(settings).await?;
            let reply = pipeline.summarize_batch(req, profile).await;
            print_json(&reply)
        }
    }
}

fn print_json<T: serde::Serialize>(value: &T) -> anyhow::Result<()> {
    let text = serde_json::to_string_pretty(value).context("failed to encode reply")?;
    println!("{text}");
    Ok(())
}

fn resolve_as_of_date(as_of_date_arg: Option<&str>) -> anyhow::Result<chrono::NaiveDate> {
    match as_of_date_arg {
        Some(s) => chrono::NaiveDate::parse_from_str(s, "%Y-%m-%d")
            .with_context(|| format!("invalid --as-of-date: {s}")),
        None => Ok(advisor_core::time::kst::today_kst()),
    }
}

fn init_sentry(settings: &advisor_core::config::Settings) -> Option<sentry::ClientInitGuard> {
    let dsn = settings.sentry_dsn.as_deref()?;
    Some(sentry::init((
        dsn,
        sentry::ClientOptions {
            release: sentry::release_name!(),
            ..Default::default()
        },
    )))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_ask_with_korean_profile() {
        let args = Args::try_parse_from([
            "advisor",
            "ask",
            "--message",
            "삼성전자 어때?",
            "--persona",
            "explainer",
            "--profile",
            "안정형",
        ])
        .unwrap();
        match args.command {
            Command::Ask {
                message,
                persona,
                profile,
                as_of_date,
            } => {
                assert_eq!(message, "삼성전자 어때?");
                assert_eq!(persona, Some(PersonaId::EducationalExplainer));
                assert_eq!(profile, UserProfile::Conservative);
                assert_eq!(as_of_date, None);
            }
            other => panic!("unexpected command: {other:?}"),
        }
    }

    #[test]
    fn rejects_unknown_profile() {
        let res = Args::try_parse_from(["advisor", "ask", "--message", "x", "--profile", "yolo"]);
        assert!(res.is_err());
    }

    #[test]
    fn explicit_as_of_date() {
        let d = resolve_as_of_date(Some("2026-01-28")).unwrap();
        assert_eq!(d, chrono::NaiveDate::from_ymd_opt(2026, 1, 28).unwrap());
        assert!(resolve_as_of_date(Some("28/01/2026")).is_err());
    }
}
