use reqwest::{Client, StatusCode};
use serde_json::Value;
use std::time::Instant;

const DEFAULT_URL: &str = "http://localhost:3000";
const BURST: usize = 120;

async fn check(client: &Client, base: &str, path: &str, expected: StatusCode) -> anyhow::Result<Value> {
    let start = Instant::now();
    let res = client.get(format!("{}{}", base, path)).send().await?;
    let status = res.status();
    let csp = res.headers().contains_key("content-security-policy");
    let body: Value = res.json().await.unwrap_or(Value::Null);
    let mark = if status == expected { "✅" } else { "❌" };
    println!(
        "{} GET {:<20} {} in {:.2?} (csp: {})",
        mark,
        path,
        status,
        start.elapsed(),
        csp
    );
    if status != expected {
        anyhow::bail!("{} returned {}, expected {}", path, status, expected);
    }
    Ok(body)
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let base = std::env::var("PROBE_URL").unwrap_or_else(|_| DEFAULT_URL.to_string());
    let base = base.trim_end_matches('/').to_string();
    println!("--- FamEduConnect Probe ---");
    println!("Target: {}\n", base);

    let client = Client::new();

    // 1. Fixed endpoints
    let root = check(&client, &base, "/", StatusCode::OK).await?;
    println!("   message: {}", root["message"]);
    let health = check(&client, &base, "/health", StatusCode::OK).await?;
    println!("   environment: {}", health["environment"]);
    let firebase = check(&client, &base, "/api/test-firebase", StatusCode::OK).await?;
    println!("   project: {}", firebase["projectId"]);
    let missing = check(&client, &base, "/api/nope", StatusCode::NOT_FOUND).await?;
    println!("   error: {}", missing["error"]);

    // 2. Rate limit
    println!("\n🚀 Bursting {} requests...", BURST);
    let start = Instant::now();
    let mut handles = vec![];
    for _ in 0..BURST {
        let client = client.clone();
        let url = format!("{}/health", base);
        handles.push(tokio::spawn(async move {
            client.get(url).send().await.map(|r| r.status())
        }));
    }
    let mut limited = 0;
    let mut ok = 0;
    for h in handles {
        match h.await? {
            Ok(StatusCode::TOO_MANY_REQUESTS) => limited += 1,
            Ok(_) => ok += 1,
            Err(e) => println!("   request failed: {}", e),
        }
    }
    println!(
        "✅ Burst done in {:.2?}: {} passed, {} limited",
        start.elapsed(),
        ok,
        limited
    );
    if limited == 0 {
        println!("⚠️  No 429 seen; the configured limit may be above {}", BURST);
    }

    Ok(())
}
