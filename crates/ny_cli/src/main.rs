use std::io::Read;
use std::str::FromStr;
use std::sync::Arc;
use std::time::Duration;

use anyhow::Context;
use clap::Parser;
use ny_core::language::LANGUAGES;
use ny_core::{ImageFormat, NewsValueScore};
use ny_inference::models::{create_model, AVAILABLE_MODELS};
use ny_pipeline::{
    Config, ImageTranscoder, Pipeline, PipelineFailure, PipelineOptions, PipelineOutcome, RejectionReason,
};
use ny_storage::{create_storage, AVAILABLE_BACKENDS};
use serde_json::{json, Value};
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

#[derive(Debug, Clone, Copy, PartialEq)]
struct HumanDuration(Duration);

impl FromStr for HumanDuration {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        let mut total_seconds = 0u64;
        let mut current_number = String::new();
        let mut has_number = false;

        for c in s.chars() {
            if c.is_ascii_digit() {
                current_number.push(c);
            } else if let Ok(num) = current_number.parse::<u64>() {
                let seconds = match c {
                    's' => Some(num),
                    'm' => num.checked_mul(60),
                    'h' => num.checked_mul(3600),
                    _ => return Err(format!("Invalid duration unit: {}", c)),
                };
                total_seconds = seconds
                    .and_then(|secs| total_seconds.checked_add(secs))
                    .ok_or_else(|| "Duration is too large".to_string())?;
                current_number.clear();
                has_number = true;
            } else if !c.is_whitespace() {
                return Err(format!("Invalid character in duration: {}", c));
            }
        }

        // Bare numbers are seconds
        if !current_number.is_empty() {
            let seconds = current_number
                .parse::<u64>()
                .map_err(|_| "Invalid number in duration".to_string())?;
            total_seconds = total_seconds
                .checked_add(seconds)
                .ok_or_else(|| "Duration is too large".to_string())?;
            has_number = true;
        }

        if !has_number {
            return Err("Duration must include a number".to_string());
        }

        Ok(HumanDuration(Duration::from_secs(total_seconds)))
    }
}

#[derive(Parser, Debug)]
#[command(author, version, about = "Turns radio transcriptions into published news articles", long_about = None)]
pub struct Cli {
    #[arg(long, default_value = "openai", help = "Model backend. Available models: openai (default), dummy")]
    model: String,
    #[arg(long, default_value = "azure", help = "Image storage. Available backends: azure (default), memory")]
    storage: String,
    /// Limit for each model or storage call (e.g. 90s, 2m, 1m30s). 0 disables it.
    #[arg(long)]
    timeout: Option<HumanDuration>,
    /// Format published images are encoded in (webp, jpeg, png)
    #[arg(long, default_value = "webp")]
    image_format: ImageFormat,
    #[command(subcommand)]
    command: Commands,
}

#[derive(clap::Subcommand, Debug)]
enum Commands {
    /// Run one transcription through the whole pipeline
    Run {
        /// File with the transcribed text, or - for stdin
        input: String,
        /// Two-letter code of a language to translate the article into
        #[arg(long)]
        translate: Option<String>,
        /// Skip texts scoring below this news value (0-10)
        #[arg(long, value_parser = parse_news_value)]
        min_news_value: Option<f64>,
    },
    /// List the supported translation languages
    Languages,
    /// Draft an article per transcription and let the editor choose one
    Pick {
        #[arg(required = true, num_args = 2..)]
        inputs: Vec<String>,
    },
}

fn parse_news_value(s: &str) -> std::result::Result<f64, String> {
    let value: f64 = s.parse().map_err(|_| format!("Not a number: {}", s))?;
    if NewsValueScore::in_range(value) {
        Ok(value)
    } else {
        Err(format!(
            "News value must be between {} and {}",
            NewsValueScore::MIN,
            NewsValueScore::MAX
        ))
    }
}

fn read_input(path: &str) -> anyhow::Result<String> {
    let text = if path == "-" {
        let mut buffer = String::new();
        std::io::stdin()
            .read_to_string(&mut buffer)
            .context("Failed to read transcription from stdin")?;
        buffer
    } else {
        std::fs::read_to_string(path).with_context(|| format!("Failed to read transcription from {}", path))?
    };

    if text.trim().is_empty() {
        anyhow::bail!("Transcription in {} is empty", path);
    }
    Ok(text)
}

fn cancel_on_ctrl_c() -> CancellationToken {
    let token = CancellationToken::new();
    let cancel = token.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            warn!("🛑 Interrupted, cancelling run");
            cancel.cancel();
        }
    });
    token
}

fn outcome_json(outcome: &PipelineOutcome) -> Value {
    match outcome {
        PipelineOutcome::Published(output) => json!({
            "status": "published",
            "newsValue": output.news_value.value(),
            "article": output.article,
            "translation": output.translation.as_ref().map(|t| json!({
                "language": output.language,
                "article": t.apply_to(&output.article),
            })),
            "imageUrl": output.image_url.as_str(),
            "stages": output.stages,
        }),
        PipelineOutcome::Rejected(rejection) => json!({
            "status": "rejected",
            "reason": rejection.reason,
            "newsValue": rejection.news_value.map(|s| s.value()),
            "stages": rejection.stages,
        }),
    }
}

fn failure_json(failure: &PipelineFailure) -> Value {
    json!({
        "status": "failed",
        "stage": failure.stage,
        "kind": failure.kind(),
        "detail": failure.detail(),
        "stages": failure.reached,
    })
}

fn print_json(value: &Value) -> anyhow::Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with_writer(std::io::stderr)
        .init();
    let cli = Cli::parse();

    if let Commands::Languages = cli.command {
        for (code, name) in LANGUAGES {
            println!("{}  {}", code, name);
        }
        return Ok(());
    }

    let mut config = Config::from_env()?;
    if let Some(HumanDuration(limit)) = cli.timeout {
        config.pipeline.call_timeout = (!limit.is_zero()).then_some(limit);
    }
    config.pipeline.image_format = cli.image_format;

    let model = create_model(&cli.model, config.inference.clone()).with_context(|| {
        format!("Could not set up model '{}' (available: {})", cli.model, AVAILABLE_MODELS.join(", "))
    })?;
    info!("🧠 Inference model initialized (using {})", model.name());
    let storage = create_storage(&cli.storage, &config.storage).with_context(|| {
        format!("Could not set up storage '{}' (available: {})", cli.storage, AVAILABLE_BACKENDS.join(", "))
    })?;

    let pipeline = Pipeline::new(model, storage, Arc::new(ImageTranscoder), config.pipeline);
    let cancellation = cancel_on_ctrl_c();

    match cli.command {
        Commands::Run {
            input,
            translate,
            min_news_value,
        } => {
            let text = read_input(&input)?;
            let options = PipelineOptions {
                translate_to: translate,
                min_news_value,
                cancellation,
            };

            match pipeline.run_pipeline(&text, &options).await {
                Ok(outcome) => {
                    if let PipelineOutcome::Rejected(rejection) = &outcome {
                        if let RejectionReason::LowNewsValue { score, threshold } = rejection.reason {
                            info!("Scored {} against a threshold of {}", score, threshold);
                        }
                    }
                    print_json(&outcome_json(&outcome))?;
                }
                Err(failure) => {
                    print_json(&failure_json(&failure))?;
                    std::process::exit(1);
                }
            }
        }
        Commands::Pick { inputs } => {
            let texts = inputs
                .iter()
                .map(|path| read_input(path))
                .collect::<anyhow::Result<Vec<_>>>()?;

            match pipeline.pick_best(&texts, cancellation).await {
                Ok(pick) => print_json(&json!({
                    "status": "picked",
                    "input": inputs[pick.choice.article_id],
                    "socialMediaHook": pick.choice.social_media_hook,
                    "article": pick.chosen(),
                    "candidates": pick.candidates.iter().zip(&inputs).map(|((article, score), input)| json!({
                        "input": input,
                        "headline": article.headline,
                        "newsValue": score.value(),
                    })).collect::<Vec<_>>(),
                }))?,
                Err(failure) => {
                    print_json(&failure_json(&failure))?;
                    std::process::exit(1);
                }
            }
        }
        Commands::Languages => {}
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_human_duration() {
        assert_eq!("90".parse::<HumanDuration>().unwrap().0, Duration::from_secs(90));
        assert_eq!("2m".parse::<HumanDuration>().unwrap().0, Duration::from_secs(120));
        assert_eq!("1m30s".parse::<HumanDuration>().unwrap().0, Duration::from_secs(90));
        assert_eq!("1h 5m".parse::<HumanDuration>().unwrap().0, Duration::from_secs(3900));
        assert_eq!("0".parse::<HumanDuration>().unwrap().0, Duration::ZERO);
        assert!("".parse::<HumanDuration>().is_err());
        assert!("5x".parse::<HumanDuration>().is_err());
        assert!("m".parse::<HumanDuration>().is_err());
        assert!("99999999999999999h".parse::<HumanDuration>().is_err());
        assert!("18446744073709551615s 1s".parse::<HumanDuration>().is_err());
        assert!("18446744073709551615 1m".parse::<HumanDuration>().is_err());
    }

    #[test]
    fn test_min_news_value_range() {
        let parse = |value: &str| Cli::try_parse_from(["ny", "run", "-", "--min-news-value", value]);

        assert!(parse("11").is_err());
        assert!(parse("-1").is_err());
        assert!(parse("NaN").is_err());
        assert!(parse("high").is_err());
        match parse("5").unwrap().command {
            Commands::Run { min_news_value, .. } => assert_eq!(min_news_value, Some(5.0)),
            other => panic!("unexpected command {:?}", other),
        }
    }

    #[test]
    fn test_cli_parses_run() {
        let cli = Cli::try_parse_from([
            "ny", "--model", "dummy", "--storage", "memory", "--timeout", "2m", "run", "-", "--translate", "en",
        ])
        .unwrap();

        assert_eq!(cli.model, "dummy");
        assert_eq!(cli.timeout, Some(HumanDuration(Duration::from_secs(120))));
        assert_eq!(cli.image_format, ImageFormat::WebP);
        match cli.command {
            Commands::Run { input, translate, .. } => {
                assert_eq!(input, "-");
                assert_eq!(translate.as_deref(), Some("en"));
            }
            other => panic!("unexpected command {:?}", other),
        }
    }

    #[test]
    fn test_image_format_flag() {
        let cli = Cli::try_parse_from(["ny", "--image-format", "jpeg", "languages"]).unwrap();
        assert_eq!(cli.image_format, ImageFormat::Jpeg);
        assert!(Cli::try_parse_from(["ny", "--image-format", "gif", "languages"]).is_err());
    }

    #[test]
    fn test_pick_needs_two_inputs() {
        assert!(Cli::try_parse_from(["ny", "pick", "a.txt"]).is_err());
        assert!(Cli::try_parse_from(["ny", "pick", "a.txt", "b.txt"]).is_ok());
    }
}
