use clap::{Parser, Subcommand};
use serde_json::Value;

#[derive(Parser)]
#[command(name = "vault-cli")]
#[command(about = "Query client for a running vault-bridge", long_about = None)]
struct Cli {
    #[arg(short, long, default_value = "http://localhost:8080")]
    url: String,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Show a subject's balance
    Balance {
        /// Subject (account) to look up
        subject: String,
    },
    /// Show active provider, breaker state and provider priorities
    Status,
    /// Check that the endpoint is up
    Health,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();
    let client = reqwest::Client::new();

    let request = match &cli.command {
        Commands::Balance { subject } => client
            .get(format!("{}/balance", cli.url))
            .query(&[("subject", subject)]),
        Commands::Status => client.get(format!("{}/status", cli.url)),
        Commands::Health => client.get(format!("{}/health", cli.url)),
    };

    let res = request.send().await?;
    print_response(res).await
}

async fn print_response(res: reqwest::Response) -> Result<(), Box<dyn std::error::Error>> {
    let status = res.status();
    if !status.is_success() {
        eprintln!("Error: vault returned status {}", status);
        if let Ok(text) = res.text().await {
            eprintln!("Response: {}", text);
        }
        return Ok(());
    }

    let json: Value = res.json().await?;
    println!("{}", serde_json::to_string_pretty(&json)?);
    Ok(())
}
