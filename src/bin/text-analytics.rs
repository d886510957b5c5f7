use std::path::PathBuf;
use std::time::Duration;

use clap::{Args, Parser, Subcommand};
use serde_json::json;
use text_analytics::{
    CancellationToken, CognitiveTextAnalytics, CognitiveTopics, Env, ServiceConfig,
    TextAnalyticsExt as _, TopicsClientExt as _, TopicsOutcome, TopicsRequest,
};

#[derive(Debug, Parser)]
#[command(name = "text-analytics", version, about = "Query a remote text analytics service")]
struct Cli {
    /// TOML service configuration.
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// `.env` file layered over the process environment.
    #[arg(long, global = true, default_value = ".env")]
    dotenv: PathBuf,

    #[arg(long, global = true)]
    json_logs: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Extract key phrases from one text.
    KeyPhrases(TextArgs),
    /// Score the sentiment of one text (0 negative, 1 positive).
    Sentiment(TextArgs),
    /// Detect the language of one text.
    Language {
        text: String,
    },
    /// Run a topic detection job over a file with one document per line.
    Topics(TopicsArgs),
}

#[derive(Debug, Args)]
struct TextArgs {
    text: String,
    #[arg(long)]
    language: Option<String>,
}

#[derive(Debug, Args)]
struct TopicsArgs {
    #[arg(long)]
    input: PathBuf,
    #[arg(long = "stop-word")]
    stop_words: Vec<String>,
    #[arg(long = "exclude-topic")]
    exclude_topics: Vec<String>,
    #[arg(long)]
    poll_interval_secs: Option<u64>,
    #[arg(long)]
    timeout_secs: Option<u64>,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
    let cli = Cli::parse();
    text_analytics::telemetry::init_tracing(cli.json_logs)?;

    let config = match cli.config.as_deref() {
        Some(path) => ServiceConfig::load(path)?,
        None => ServiceConfig::default(),
    };
    let env = Env::load_dotenv(&cli.dotenv)?;

    let output = match cli.command {
        Command::KeyPhrases(args) => {
            let client = CognitiveTextAnalytics::from_config(&config, &env).await?;
            let phrases = client
                .key_phrases_for_text(&args.text, args.language.as_deref())
                .await?;
            json!({ "keyPhrases": phrases })
        }
        Command::Sentiment(args) => {
            let client = CognitiveTextAnalytics::from_config(&config, &env).await?;
            let score = client
                .sentiment_for_text(&args.text, args.language.as_deref())
                .await?;
            json!({ "score": score })
        }
        Command::Language { text } => {
            let client = CognitiveTextAnalytics::from_config(&config, &env).await?;
            let language = client.detect_language_for_text(&text).await?;
            json!({ "language": language })
        }
        Command::Topics(args) => run_topics(&config, &env, args).await?,
    };

    println!("{}", serde_json::to_string_pretty(&output)?);
    Ok(())
}

async fn run_topics(
    config: &ServiceConfig,
    env: &Env,
    args: TopicsArgs,
) -> Result<serde_json::Value, Box<dyn std::error::Error + Send + Sync>> {
    let contents = tokio::fs::read_to_string(&args.input).await?;
    let request = TopicsRequest::from_texts(
        contents
            .lines()
            .map(str::trim)
            .filter(|line| !line.is_empty()),
    )
    .with_stop_words(args.stop_words)
    .with_topics_to_exclude(args.exclude_topics);

    let mut client = CognitiveTopics::from_config(config, env).await?;
    if let Some(secs) = args.poll_interval_secs.filter(|secs| *secs > 0) {
        client = client.with_poll_interval(Duration::from_secs(secs));
    }
    if let Some(secs) = args.timeout_secs {
        client = client.with_timeout(Duration::from_secs(secs));
    }

    let cancel = CancellationToken::new();
    let on_signal = cancel.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            tracing::info!("interrupt received; cancelling topic detection");
            on_signal.cancel();
        }
    });

    let outcome = client.detect_topics_with_cancel(&request, &cancel).await?;
    Ok(outcome_json(&outcome))
}

fn outcome_json(outcome: &TopicsOutcome) -> serde_json::Value {
    match outcome {
        TopicsOutcome::Succeeded { response, .. } | TopicsOutcome::Failed { response, .. } => {
            json!({
                "status": outcome.status(),
                "message": outcome.message(),
                "result": response,
            })
        }
        TopicsOutcome::FailedToStart { status, message, body } => json!({
            "status": outcome.status(),
            "message": message,
            "httpStatus": status.as_u16(),
            "body": body,
        }),
        TopicsOutcome::TimedOut {
            last_status,
            polls,
            last_response,
            ..
        } => json!({
            "status": outcome.status(),
            "message": outcome.message(),
            "lastStatus": last_status,
            "polls": polls,
            "lastResponse": last_response,
        }),
        TopicsOutcome::Cancelled { last_status, polls, .. } => json!({
            "status": outcome.status(),
            "message": outcome.message(),
            "lastStatus": last_status,
            "polls": polls,
        }),
    }
}
