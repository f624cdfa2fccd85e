//! Command-line client for a running translate-proxy.
//!
//! Usage:
//!   translate -t fr hello world
//!   translate --from english --to french "good morning"
//!
//! The service URL defaults to http://localhost:8080/json and can be
//! overridden with TRANSLATE_SERVICE_URL.

use anyhow::{bail, Context, Result};
use clap::{CommandFactory, Parser};
use serde::{Deserialize, Serialize};
use tracing::debug;
use translate_proxy::model::Translation;

const DEFAULT_SERVICE_URL: &str = "http://localhost:8080/json";

#[derive(Parser, Debug)]
#[command(name = "translate", about = "Translate text through translate-proxy")]
struct Cli {
    /// Source language name or tag (omit to auto-detect)
    #[arg(short = 'f', long = "from", value_name = "LANG", default_value = "")]
    from: String,

    /// Target language name or tag
    #[arg(short = 't', long = "to", value_name = "LANG")]
    to: Option<String>,

    /// Text to translate
    #[arg(value_name = "TEXT", trailing_var_arg = true)]
    text: Vec<String>,
}

impl Cli {
    /// Target and joined text, or `None` if either is missing
    fn request(&self) -> Option<(&str, String)> {
        let to = self.to.as_deref().filter(|to| !to.trim().is_empty())?;
        let text = self.text.join(" ");
        if text.trim().is_empty() {
            return None;
        }
        Some((to, text))
    }
}

#[derive(Debug, Serialize)]
struct TranslateBody<'a> {
    from: &'a str,
    to: &'a str,
    text: &'a str,
}

#[derive(Debug, Deserialize)]
struct ErrorBody {
    error: String,
}

async fn translate(service_url: &str, from: &str, to: &str, text: &str) -> Result<Translation> {
    let response = reqwest::Client::new()
        .post(service_url)
        .json(&TranslateBody { from, to, text })
        .send()
        .await
        .with_context(|| format!("failed to reach {}", service_url))?;

    let status = response.status();
    if !status.is_success() {
        let body = response.text().await.unwrap_or_default();
        let message = serde_json::from_str::<ErrorBody>(&body)
            .map(|e| e.error)
            .unwrap_or(body);
        bail!("{} ({})", message, status);
    }

    response
        .json()
        .await
        .context("unexpected response from translation service")
}

#[tokio::main]
async fn main() {
    // Logs go to stderr so they never mix with the translation on stdout
    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "translate=warn".into()),
        )
        .init();

    let cli = Cli::parse();

    let Some((to, text)) = cli.request() else {
        // Help output failing to write is not worth reporting
        let _ = Cli::command().print_help();
        std::process::exit(2);
    };

    let service_url =
        std::env::var("TRANSLATE_SERVICE_URL").unwrap_or_else(|_| DEFAULT_SERVICE_URL.to_string());

    debug!("Posting translation request to {}", service_url);

    match translate(&service_url, &cli.from, to, &text).await {
        Ok(translation) => {
            println!("translate \"{}\" to {}: {}", text, to, translation.translated);
        }
        Err(e) => {
            eprintln!("translate: {:#}", e);
            std::process::exit(1);
        }
    }
}
