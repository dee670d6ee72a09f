use anyhow::Context;
use chrono::{NaiveDate, NaiveTime, Utc};
use clap::{Parser, Subcommand, ValueEnum};
use std::sync::Arc;
use tokio::signal;
use tracing::info;

use takeout_api as api;

use api::cache::{RedisCache, ReportCache};
use api::services::{ReportRange, ReportService, SeaOrmStatsStore};
use api::tasks::{OrderSweeper, SweeperSettings};

#[derive(Parser)]
#[command(name = "takeout-api", version, about = "Food-ordering backend worker")]
struct Cli {
    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Subcommand)]
enum Command {
    /// Run the background worker: event processor plus both timeout sweepers
    Serve,
    /// Run a single sweeper pass and exit
    Sweep {
        #[arg(long, value_enum)]
        pass: SweepPass,
    },
    /// Print a report over an inclusive date range as JSON
    Report {
        #[arg(long, value_enum)]
        kind: ReportKind,
        #[arg(long)]
        begin: NaiveDate,
        #[arg(long)]
        end: NaiveDate,
    },
}

#[derive(Clone, Copy, ValueEnum)]
enum SweepPass {
    Unpaid,
    Undelivered,
}

#[derive(Clone, Copy, ValueEnum)]
enum ReportKind {
    Turnover,
    Users,
    Orders,
    TopSales,
    Business,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    let cfg = api::config::load_config().context("failed to load configuration")?;
    api::config::init_tracing(&cfg.log_level, cfg.log_json);

    let db = Arc::new(api::db::establish_connection(&cfg).await?);
    if cfg.auto_migrate {
        api::db::run_migrations(&db).await?;
    }

    let (event_sender, event_rx) = api::events::channel(1024);

    match cli.command.unwrap_or(Command::Serve) {
        Command::Serve => {
            let redis = Arc::new(redis::Client::open(cfg.redis_url.clone())?);
            let state = api::AppState {
                db: db.clone(),
                config: cfg.clone(),
                event_sender: event_sender.clone(),
                redis,
            };
            tokio::spawn(api::events::process_events(event_rx));

            let sweeper = Arc::new(OrderSweeper::new(
                state.db.clone(),
                state.event_sender.clone(),
                SweeperSettings::from(&cfg.sweeper),
            ));
            let handles = sweeper.spawn();

            info!("Worker started; press ctrl-c to stop");
            signal::ctrl_c().await?;
            info!("Shutdown signal received");
            for handle in handles {
                handle.abort();
            }
        }
        Command::Sweep { pass } => {
            tokio::spawn(api::events::process_events(event_rx));
            let sweeper =
                OrderSweeper::new(db, event_sender, SweeperSettings::from(&cfg.sweeper));
            let swept = match pass {
                SweepPass::Unpaid => sweeper.sweep_unpaid_once(Utc::now()).await?,
                SweepPass::Undelivered => sweeper.sweep_undelivered_once(Utc::now()).await?,
            };
            info!(swept, "Sweep finished");
        }
        Command::Report { kind, begin, end } => {
            drop(event_rx);
            let redis = Arc::new(redis::Client::open(cfg.redis_url.clone())?);
            let cache = ReportCache::new(Arc::new(RedisCache::new(redis)));
            let service = ReportService::new(Arc::new(SeaOrmStatsStore::new(db)), cache);
            let range = ReportRange { begin, end };

            let rendered = match kind {
                ReportKind::Turnover => {
                    serde_json::to_string_pretty(&service.turnover_statistics(range).await?)?
                }
                ReportKind::Users => {
                    serde_json::to_string_pretty(&service.user_statistics(range).await?)?
                }
                ReportKind::Orders => {
                    serde_json::to_string_pretty(&service.order_statistics(range).await?)?
                }
                ReportKind::TopSales => {
                    serde_json::to_string_pretty(&service.sales_top10(range).await?)?
                }
                ReportKind::Business => {
                    let window_begin = begin.and_time(NaiveTime::MIN).and_utc();
                    let window_end = (end + chrono::Duration::days(1))
                        .and_time(NaiveTime::MIN)
                        .and_utc();
                    serde_json::to_string_pretty(
                        &service.business_data(window_begin, window_end).await?,
                    )?
                }
            };
            println!("{rendered}");
        }
    }

    Ok(())
}
