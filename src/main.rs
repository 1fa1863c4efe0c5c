//! Saathi Router - Entry Point
//!
//! Reads one message per stdin line and prints the routing decision as
//! JSON. With ANTHROPIC_API_KEY set the hybrid LLM classifiers are active;
//! without it, classification is rules-only.

use saathi_router::{
    ClaudeLlm, Config, IntentPipeline, LlmService, PatternClassifier, RecheckBridge, RuleSet,
    Session, ToneAnalyzer,
};
use saathi_router::intent::SearchIntentClassifier;
use std::sync::Arc;
use tokio::io::{AsyncBufReadExt, BufReader};
use tracing::{info, warn, Level};
use tracing_subscriber::FmtSubscriber;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load environment
    dotenvy::dotenv().ok();

    let args: Vec<String> = std::env::args().collect();
    if args.iter().any(|a| a == "--help" || a == "-h") {
        println!("Saathi Router v{}", env!("CARGO_PKG_VERSION"));
        println!();
        println!("Usage: saathi-router [OPTIONS]");
        println!();
        println!("Reads one message per line on stdin, prints one routing");
        println!("decision per line as JSON.");
        println!();
        println!("Options:");
        println!("  --help, -h         Show this help");
        println!();
        println!("Environment variables:");
        println!("  ANTHROPIC_API_KEY      Claude API key (optional)");
        println!("  SAATHI_RULES_PATH      Rules JSON loaded at startup");
        println!("  SAATHI_USER            User id for this session (default: local)");
        println!("  SAATHI_LOG_JSON        Log as JSON instead of pretty output");
        return Ok(());
    }

    // Logging to stderr so stdout stays machine-readable
    let log_level = std::env::var("RUST_LOG")
        .map(|s| match s.to_lowercase().as_str() {
            "trace" => Level::TRACE,
            "debug" => Level::DEBUG,
            "warn" => Level::WARN,
            "error" => Level::ERROR,
            _ => Level::INFO,
        })
        .unwrap_or(Level::INFO);

    if std::env::var("SAATHI_LOG_JSON").is_ok() {
        let subscriber = FmtSubscriber::builder()
            .with_max_level(log_level)
            .with_writer(std::io::stderr)
            .with_ansi(false)
            .json()
            .finish();
        tracing::subscriber::set_global_default(subscriber)?;
    } else {
        let subscriber = FmtSubscriber::builder()
            .with_max_level(log_level)
            .with_writer(std::io::stderr)
            .with_ansi(true)
            .finish();
        tracing::subscriber::set_global_default(subscriber)?;
    }

    info!("Saathi Router v{}", env!("CARGO_PKG_VERSION"));

    let config = Config::from_env()?;

    let rules = RuleSet::new();
    if let Some(path) = &config.rules_path {
        rules.reload_from_path(path)?;
        info!("Loaded rule tables from {}", path.display());
    }

    let llm: Option<Arc<dyn LlmService>> = match &config.anthropic_api_key {
        Some(key) => {
            let client = ClaudeLlm::new(key)?.with_model(&config.llm_model);
            info!("LLM classification enabled: {}", config.llm_model);
            Some(Arc::new(client))
        }
        None => {
            warn!("ANTHROPIC_API_KEY not set - rules-only classification");
            None
        }
    };

    let patterns = PatternClassifier::new(rules.clone());
    let tone = ToneAnalyzer::new(rules.clone(), llm.clone(), config.tone_config());
    let intent = SearchIntentClassifier::new(llm, patterns.clone(), config.intent_config());
    let recheck = RecheckBridge::new(patterns.clone(), None, config.recheck_config());

    // Background expiry sweeps keep memory bounded between reads
    let sweep = std::time::Duration::from_secs(60);
    let _sweepers = [
        intent.spawn_sweeper(sweep),
        tone.spawn_sweeper(sweep),
        recheck.spawn_sweeper(sweep),
    ];

    let pipeline = IntentPipeline::new(patterns, tone, intent, recheck, config.pipeline_config());

    let session = Session::new(std::env::var("SAATHI_USER").unwrap_or_else(|_| "local".to_string()));

    let stdin = BufReader::new(tokio::io::stdin());
    let mut lines = stdin.lines();
    while let Some(line) = lines.next_line().await? {
        let text = line.trim();
        if text.is_empty() {
            continue;
        }
        let decision = pipeline.route(&session, text).await;
        println!("{}", serde_json::to_string(&decision)?);
    }

    Ok(())
}
