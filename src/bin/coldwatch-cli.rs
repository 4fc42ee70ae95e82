use clap::{Parser, Subcommand};
use reqwest::header::{HeaderMap, HeaderValue, AUTHORIZATION};
use serde_json::Value;

#[derive(Parser)]
#[command(name = "coldwatch-cli")]
#[command(about = "Query the coldwatch reporting API", long_about = None)]
struct Cli {
    #[arg(short, long, default_value = "http://localhost:8080")]
    url: String,

    /// Admin bearer key configured on the server
    #[arg(short, long, env = "COLDWATCH_ADMIN_API_KEY")]
    key: String,

    /// Reporting window, e.g. 5m, 1h, 7d
    #[arg(short, long, default_value = "1h")]
    range: String,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Store mode and server version
    Status,
    /// Request count, latency and error rate
    Summary,
    /// Bucketed resource usage (cpu, memory or disk)
    Trend {
        #[arg(default_value = "cpu")]
        resource: String,
    },
    /// Recent API requests, newest first
    Logs {
        #[arg(long)]
        errors_only: bool,
        #[arg(short, long, default_value_t = 100)]
        limit: usize,
        #[arg(short, long, default_value_t = 0)]
        offset: usize,
    },
    /// Most requested endpoints
    Top {
        #[arg(short, long, default_value_t = 10)]
        limit: usize,
    },
    /// Endpoints with the highest average latency
    Slowest {
        #[arg(short, long, default_value_t = 10)]
        limit: usize,
    },
}

impl Commands {
    fn path_and_query(&self, range: &str) -> (String, Vec<(&'static str, String)>) {
        let range = ("range", range.to_string());
        match self {
            Commands::Status => ("/admin/status".into(), vec![]),
            Commands::Summary => ("/admin/analytics/summary".into(), vec![range]),
            Commands::Trend { resource } => (format!("/admin/analytics/trends/{resource}"), vec![range]),
            Commands::Logs {
                errors_only,
                limit,
                offset,
            } => (
                "/admin/analytics/logs".into(),
                vec![
                    range,
                    ("errors_only", errors_only.to_string()),
                    ("limit", limit.to_string()),
                    ("offset", offset.to_string()),
                ],
            ),
            Commands::Top { limit } => (
                "/admin/analytics/endpoints/top".into(),
                vec![range, ("limit", limit.to_string())],
            ),
            Commands::Slowest { limit } => (
                "/admin/analytics/endpoints/slowest".into(),
                vec![range, ("limit", limit.to_string())],
            ),
        }
    }
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

    let (path, query) = cli.command.path_and_query(&cli.range);
    let res = client
        .get(format!("{}{}", cli.url.trim_end_matches('/'), path))
        .query(&query)
        .headers(headers)
        .send()
        .await?;
    print_response(res).await?;

    Ok(())
}

async fn print_response(res: reqwest::Response) -> Result<(), Box<dyn std::error::Error>> {
    let status = res.status();
    if !status.is_success() {
        eprintln!("Error: reporting API returned status {}", status);
        if let Ok(text) = res.text().await {
            eprintln!("Response: {}", text);
        }
        std::process::exit(1);
    }

    let json: Value = res.json().await?;
    println!("{}", serde_json::to_string_pretty(&json)?);
    Ok(())
}
