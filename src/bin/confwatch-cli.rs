use clap::{Parser, Subcommand};
use reqwest::header::{HeaderMap, HeaderValue, AUTHORIZATION};
use serde_json::Value;

#[derive(Parser)]
#[command(name = "confwatch-cli")]
#[command(about = "Management CLI for the confwatch admin API", long_about = None)]
struct Cli {
    #[arg(short, long, default_value = "http://localhost:8081")]
    url: String,

    #[arg(short, long, default_value = "admin-secret-key")]
    key: String,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Readiness, watch strategy and per-domain versions
    Status,
    /// Every domain's current document
    Current,
    /// One domain's snapshot (app, business, ui, features)
    Get { domain: String },
    /// Force a reload of every domain
    Reload,
    /// Whether a feature flag is enabled
    Feature { key: String },
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();
    let client = reqwest::Client::new();

    let mut headers = HeaderMap::new();
    headers.insert(
        AUTHORIZATION,
        HeaderValue::from_str(&format!("Bearer {}", cli.key))?,
    );

    let base = cli.url.trim_end_matches('/');
    let request = match &cli.command {
        Commands::Status => client.get(format!("{}/api/config/status", base)),
        Commands::Current => client.get(format!("{}/api/config/current", base)),
        Commands::Get { domain } => client.get(format!("{}/api/config/{}", base, domain)),
        Commands::Reload => client.post(format!("{}/api/config/reload", base)),
        Commands::Feature { key } => client.get(format!("{}/api/config/feature/{}", base, key)),
    };

    let res = request.headers(headers).send().await?;
    print_response(res).await
}

async fn print_response(res: reqwest::Response) -> Result<(), Box<dyn std::error::Error>> {
    let status = res.status();
    if !status.is_success() {
        eprintln!("Error: Admin API returned status {}", status);
        if let Ok(text) = res.text().await {
            eprintln!("Response: {}", text);
        }
        std::process::exit(1);
    }

    let json: Value = res.json().await?;
    println!("{}", serde_json::to_string_pretty(&json)?);
    Ok(())
}
