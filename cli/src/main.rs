pub mod cli;
pub mod config;
pub mod dry_run;
pub mod events;
pub mod replay;

use std::sync::Arc;

use anyhow::Context;
use clap::Parser;
use tokio::sync::mpsc;

use cli::Cli;
use common::logger::init_logger;
use config::AppConfig;
use dispatcher::SearchDispatcher;
use market::preferences::PreferencesStore;
use session::estimate::{EstimateSnapshot, discord_summary, overlay_line};

fn print_report(snapshot: &EstimateSnapshot, json: bool) -> anyhow::Result<()> {
    if json {
        println!("{}", serde_json::to_string_pretty(snapshot)?);
        return Ok(());
    }

    match overlay_line(snapshot) {
        Some(line) => println!("{line}"),
        None => println!("Est. Sell: -"),
    }
    if let Some(summary) = discord_summary(snapshot) {
        println!("{summary}");
    }
    println!();
    Ok(())
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    let cfg = AppConfig::from_env();
    init_logger("ore-tally", cfg.json_logs);

    let text = std::fs::read_to_string(&cli.events)
        .with_context(|| format!("reading {}", cli.events.display()))?;
    let events = events::parse_events(&text)?;
    tracing::info!(events = events.len(), backend = ?cfg.backend, "loaded replay");

    if cli.dry_run {
        let builder = cfg.query_builder()?;
        let plan = dry_run::plan_requests(&events, builder.as_ref(), &cfg.filter);
        println!("{}", serde_json::to_string_pretty(&plan)?);
        return Ok(());
    }

    let prefs = PreferencesStore::new(cfg.filter.clone()).context("market preferences")?;

    let (job_tx, job_rx) = mpsc::channel(cfg.lookup_queue_capacity.max(1));
    let (ledger, actor) = session::spawn(prefs.subscribe(), job_tx, cfg.ledger_inbox_capacity);

    let source = cfg.build_source().context("building pricing client")?;
    let dispatcher = SearchDispatcher::new(source, Arc::new(ledger.clone()), cfg.dispatcher_config());
    let stats = dispatcher.stats();
    let runner = tokio::spawn(dispatcher.run(job_rx));

    let reports = replay::replay(&ledger, &events).await;

    ledger.shutdown().await;
    actor.await.context("ledger actor panicked")?;
    runner.await.context("dispatcher panicked")?;

    for report in reports? {
        print_report(&report, cli.json)?;
    }

    tracing::info!(stats = ?stats.snapshot(), "done");
    Ok(())
}
