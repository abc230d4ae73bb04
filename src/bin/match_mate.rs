use std::process::ExitCode;

use clap::{Args, Parser, Subcommand};
use miette::IntoDiagnostic;
use tracing_subscriber::EnvFilter;

use match_mate::app::{MatchMate, open_app};
use match_mate::config::ConfigLoader;
use match_mate::domain::{Decision, ProfileKey, Status};
use match_mate::error::MatchError;
use match_mate::output::{
    ClearResult, DecisionResult, FeedResult, JsonOutput, ListResult, PageResult, ScoreResult,
};
use match_mate::remote::RemoteSource;
use match_mate::score::match_score;

#[derive(Parser)]
#[command(name = "match-mate")]
#[command(about = "Offline-first candidate feed backed by a local profile store")]
#[command(version, author)]
struct Cli {
    #[arg(long, global = true)]
    config: Option<String>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    #[command(about = "Show the signed-in profile, fetching it on first use")]
    Login,
    #[command(about = "Load candidate pages")]
    Feed(FeedArgs),
    #[command(about = "Accept a candidate")]
    Accept(KeyArgs),
    #[command(about = "Decline a candidate")]
    Decline(KeyArgs),
    #[command(about = "List accepted candidates")]
    Accepted,
    #[command(about = "List declined candidates")]
    Declined,
    #[command(about = "Score two stored profiles against each other")]
    Score(ScoreArgs),
    #[command(about = "Remove every stored profile")]
    Clear,
}

#[derive(Args)]
struct FeedArgs {
    #[arg(long, default_value_t = 1)]
    pages: usize,
}

#[derive(Args)]
struct KeyArgs {
    key: String,
}

#[derive(Args)]
struct ScoreArgs {
    a: String,
    b: String,
}

fn main() -> ExitCode {
    if let Err(report) = run() {
        eprintln!("{report:?}");
        if let Some(error) = report.downcast_ref::<MatchError>() {
            return ExitCode::from(map_exit_code(error));
        }
        return ExitCode::from(1);
    }
    ExitCode::SUCCESS
}

fn map_exit_code(error: &MatchError) -> u8 {
    match error {
        MatchError::ProfileNotFound(_) | MatchError::SelfProfileMissing => 2,
        MatchError::NetworkFailure(_) | MatchError::ApiError { .. } => 3,
        _ => 1,
    }
}

fn run() -> miette::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    let config = ConfigLoader::resolve(cli.config.as_deref())?;
    let app = open_app(&config)?;

    match cli.command {
        Command::Login => {
            let profile = app.sign_in()?;
            JsonOutput::print_profile(&profile).into_diagnostic()
        }
        Command::Feed(args) => run_feed(&app, args),
        Command::Accept(args) => run_decision(&app, &args.key, Decision::Accepted),
        Command::Decline(args) => run_decision(&app, &args.key, Decision::Declined),
        Command::Accepted => {
            let result = ListResult {
                status: Status::Accepted.to_string(),
                profiles: app.accepted()?,
            };
            JsonOutput::print_list(&result).into_diagnostic()
        }
        Command::Declined => {
            let result = ListResult {
                status: Status::Declined.to_string(),
                profiles: app.declined()?,
            };
            JsonOutput::print_list(&result).into_diagnostic()
        }
        Command::Score(args) => {
            let a = find_profile(&app, &args.a)?;
            let b = find_profile(&app, &args.b)?;
            let result = ScoreResult {
                score: match_score(&a, &b),
                a: a.key.to_string(),
                b: b.key.to_string(),
            };
            JsonOutput::print_score(&result).into_diagnostic()
        }
        Command::Clear => {
            app.clear_all()?;
            JsonOutput::print_clear(&ClearResult { cleared: true }).into_diagnostic()
        }
    }
}

fn run_feed<S: RemoteSource>(app: &MatchMate<S>, args: FeedArgs) -> miette::Result<()> {
    app.sign_in()?;
    let mut pages = Vec::new();
    for _ in 0..args.pages {
        let (page, _) = app.feed_position()?;
        let candidates = app.scored_page()?;
        if candidates.is_empty() {
            break;
        }
        pages.push(PageResult { page, candidates });
    }
    let (cursor, exhausted) = app.feed_position()?;
    JsonOutput::print_feed(&FeedResult {
        pages,
        cursor,
        exhausted,
    })
    .into_diagnostic()
}

fn run_decision<S: RemoteSource>(
    app: &MatchMate<S>,
    key: &str,
    decision: Decision,
) -> miette::Result<()> {
    let key: ProfileKey = key.parse()?;
    if app.store().get(&key)?.is_none() {
        return Err(MatchError::ProfileNotFound(key.to_string()).into());
    }
    app.decide(&key, decision.status())?;
    JsonOutput::print_decision(&DecisionResult {
        key: key.to_string(),
        status: decision.status().to_string(),
    })
    .into_diagnostic()
}

fn find_profile<S: RemoteSource>(
    app: &MatchMate<S>,
    key: &str,
) -> Result<match_mate::domain::Profile, MatchError> {
    let key: ProfileKey = key.parse()?;
    app.store()
        .get(&key)?
        .ok_or_else(|| MatchError::ProfileNotFound(key.to_string()))
}
