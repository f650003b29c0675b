use std::sync::Arc;

use anyhow::Result;
use clap::Parser;
use tracing::{info, warn};
use typo_sentinel::sentinel::{
    AnalysisPipeline, LogAlertSink, NpmSearchFeed, PollMode, RegistryPoller, TyposquatAnalyzer,
    XAlertSink,
};
use typo_sentinel::SentinelConfig;

#[derive(Parser)]
#[command(name = "typo-sentinel")]
#[command(author, version, about = "Watch the npm registry for typosquatting packages", long_about = None)]
struct Cli {
    /// Run a single poll cycle, wait for its analyses, then exit
    #[arg(long)]
    once: bool,

    /// Log alerts instead of broadcasting them
    #[arg(long)]
    dry_run: bool,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    let config = SentinelConfig::load()?;

    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(&config.log_level)),
        )
        .init();

    let matcher = config.matcher()?;
    info!(
        references = matcher.references().len(),
        threshold = matcher.threshold(),
        "Typo sentinel starting"
    );

    let pipeline = if cli.dry_run {
        info!("Dry run: alerts are logged, not broadcast");
        AnalysisPipeline::new(
            TyposquatAnalyzer::new(matcher, LogAlertSink).with_timeout(config.sink_timeout()),
        )
    } else {
        let sink = XAlertSink::new(&config.x_api_url, config.x_credentials(), config.sink_timeout())?;
        match sink.credentials() {
            Some(credentials) => info!(scheme = credentials.scheme(), "X credentials loaded"),
            None => warn!("No X credentials configured; every alert delivery will fail"),
        }
        AnalysisPipeline::new(
            TyposquatAnalyzer::new(matcher, sink).with_timeout(config.sink_timeout()),
        )
    };

    let feed = NpmSearchFeed::new(&config.registry_url, config.page_size, config.fetch_timeout())?;
    let poller = RegistryPoller::new(feed, Arc::new(pipeline)).with_interval(config.poll_interval());

    let mode = if cli.once {
        PollMode::Once
    } else {
        PollMode::Continuous
    };
    poller.run(mode).await;

    Ok(())
}
