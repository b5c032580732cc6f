use anyhow::Context;
use clap::{Parser, Subcommand};
use reqwest::Client;

#[derive(Parser)]
#[command(name = "irp-cli")]
#[command(about = "Issue Resolution Predictor CLI", long_about = None)]
struct Cli {
    #[arg(short, long, default_value = "http://localhost:8080")]
    endpoint: String,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Predict the resolution date of a single issue
    Predict {
        #[arg(value_name = "ISSUE_KEY")]
        key: String,
    },

    /// Forecast unresolved issues created on or before a release date
    Release {
        #[arg(value_name = "DATE")]
        date: String,
    },

    /// Check server health
    Health,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    let client = Client::new();

    match cli.command {
        Commands::Predict { key } => {
            let response = client
                .get(format!("{}/api/issue/{}/resolve-prediction", cli.endpoint, key))
                .send()
                .await
                .context("request failed")?;

            let body: serde_json::Value = response.json().await.context("invalid response body")?;
            println!("{}", serde_json::to_string_pretty(&body)?);
        }

        Commands::Release { date } => {
            let response = client
                .get(format!(
                    "{}/api/release/{}/resolved-since-now",
                    cli.endpoint, date
                ))
                .send()
                .await
                .context("request failed")?;

            let body: serde_json::Value = response.json().await.context("invalid response body")?;
            println!("{}", serde_json::to_string_pretty(&body)?);
        }

        Commands::Health => {
            let response = client
                .get(format!("{}/health", cli.endpoint))
                .send()
                .await
                .context("request failed")?;

            let body: serde_json::Value = response.json().await.context("invalid response body")?;
            println!("{}", serde_json::to_string_pretty(&body)?);
        }
    }

    Ok(())
}
