//! One-shot fetch from the command line: `intel_probe [COUNTRIES] [DISEASES]`
//! with comma-separated codes, e.g. `intel_probe NGA,KEN A00`.
//! Prints the outcome as pretty JSON.

use anyhow::Context;

use afro_sentinel::config::IntelConfig;
use afro_sentinel::filters::{parse_code_list, FilterSelection};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let _ = dotenvy::dotenv();
    tracing_subscriber::fmt().with_target(false).init();

    let mut args = std::env::args().skip(1);
    let countries = args.next().map(|s| parse_code_list(&s)).unwrap_or_default();
    let diseases = args.next().map(|s| parse_code_list(&s)).unwrap_or_default();
    let filters = FilterSelection::new(diseases, countries, Vec::new());

    let cfg = IntelConfig::load_default().context("loading intel config")?;
    let pipeline = cfg.build_pipeline()?;
    tracing::info!(provider = pipeline.provider_name(), ?filters, "probing");

    let outcome = pipeline.fetch_intelligence(&filters).await;
    println!("{}", serde_json::to_string_pretty(&outcome)?);

    if let Some(err) = &outcome.error {
        eprintln!("fetch failed: {err}");
    }
    Ok(())
}
