use std::path::PathBuf;

use clap::{Parser, Subcommand};
use reqwest::header::{HeaderMap, HeaderValue, AUTHORIZATION};
use serde_json::Value;

#[derive(Parser)]
#[command(name = "guard-cli")]
#[command(about = "Management CLI for the storefront guard", long_about = None)]
struct Cli {
    #[arg(short, long, default_value = "http://localhost:8080")]
    url: String,

    /// Admin API key, required by `status` and `logs`
    #[arg(short, long, env = "GUARD_ADMIN_KEY")]
    key: Option<String>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Show rate limiter and request log status
    Status,
    /// Inspect the in-memory request log
    Logs {
        /// Only entries attributed to this user id
        #[arg(long)]
        user: Option<String>,
        /// Only the entry with this request id
        #[arg(long)]
        request: Option<String>,
    },
    /// List content templates
    Templates {
        /// Filter by template type (course, package, donation, page, testimonial)
        #[arg(long = "type")]
        kind: Option<String>,
    },
    /// Validate a JSON file against a template
    Validate {
        template: String,
        file: PathBuf,
    },
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();
    let client = reqwest::Client::new();

    let mut headers = HeaderMap::new();
    if let Some(key) = &cli.key {
        headers.insert(AUTHORIZATION, HeaderValue::from_str(&format!("Bearer {key}"))?);
    }

    let request = match cli.command {
        Commands::Status => client.get(format!("{}/admin/status", cli.url)),
        Commands::Logs { user, request } => {
            let mut query = Vec::new();
            if let Some(user) = user {
                query.push(("userId", user));
            }
            if let Some(request) = request {
                query.push(("requestId", request));
            }
            client.get(format!("{}/admin/logs", cli.url)).query(&query)
        }
        Commands::Templates { kind } => {
            let req = client.get(format!("{}/api/templates", cli.url));
            match kind {
                Some(kind) => req.query(&[("type", kind)]),
                None => req,
            }
        }
        Commands::Validate { template, file } => {
            let body: Value = serde_json::from_str(&std::fs::read_to_string(&file)?)?;
            client
                .post(format!("{}/api/templates/{}/validate", cli.url, template))
                .json(&body)
        }
    };

    let res = request.headers(headers).send().await?;
    print_response(res).await
}

async fn print_response(res: reqwest::Response) -> Result<(), Box<dyn std::error::Error>> {
    let status = res.status();
    let request_id = res
        .headers()
        .get("x-request-id")
        .and_then(|v| v.to_str().ok())
        .map(str::to_string);

    let text = res.text().await?;
    let body = serde_json::from_str::<Value>(&text)
        .and_then(|json| serde_json::to_string_pretty(&json))
        .unwrap_or(text);

    if status.is_success() {
        println!("{body}");
    } else {
        eprintln!("Error: guard returned status {status}");
        if let Some(id) = request_id {
            eprintln!("Request ID: {id}");
        }
        eprintln!("{body}");
    }
    Ok(())
}
