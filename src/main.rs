use std::path::Path;
use std::sync::Arc;

use q_engine::ClientKey;
use q_engine::MapInfo;
use q_engine::MatchAchieve;
use q_engine::MatchAchieveFactory;
use q_engine::MatchContext;
use q_engine::MatchEngine;
use q_engine::MatchError;
use q_engine::MatchResult;
use q_engine::MatchSuccess;
use q_engine::Settings;
use q_engine::SupplyAchieve;
use q_engine::SupplyAchieveFactory;
use q_engine::SupplyContext;
use q_engine::SupplyInfo;
use q_engine::MATCH_STRATEGY_NORMAL;
use q_engine::{register_custom_metrics, Error, Result, REGISTRY};
use tokio::signal::unix::{signal, SignalKind};
use tokio::sync::watch;
use tracing::{error, info};
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::{EnvFilter, Layer};

#[tokio::main(flavor = "multi_thread", worker_threads = 2)]
async fn main() -> Result<()> {
    let settings = Settings::load(None)?;

    // Initializing Logs
    let _guard = init_observability(&settings.log_dir)?;

    // Initializing Shutdown Signal
    let (graceful_tx, graceful_rx) = watch::channel(());

    register_custom_metrics(&REGISTRY);

    // Build Engine with the stock headcount-only strategy registered
    let mut engine = MatchEngine::new(&settings, Arc::new(LogMatchSuccess), graceful_rx.clone());
    engine
        .manager_mut()
        .register_match_achieve(MATCH_STRATEGY_NORMAL, Arc::new(NormalMatchFactory))?;
    engine
        .manager_mut()
        .register_supply_achieve(MATCH_STRATEGY_NORMAL, Arc::new(NormalSupplyFactory))?;

    info!("Application started. Waiting for CTRL+C signal...");
    // Listen on Shutdown Signal
    tokio::spawn(async {
        if let Err(e) = graceful_shutdown(graceful_tx).await {
            error!("Failed to shutdown: {:?}", e);
        }
    });

    // Start Engine
    if let Err(e) = engine.run().await {
        error!("engine stops: {:?}", e);
    }

    println!("Exiting program.");
    Ok(())
}

async fn graceful_shutdown(graceful_tx: watch::Sender<()>) -> Result<()> {
    info!("Shutdown server..");
    let mut sigint = signal(SignalKind::interrupt()).unwrap();
    let mut sigterm = signal(SignalKind::terminate()).unwrap();
    tokio::select! {
        _ = sigint.recv() => {
            info!("SIGINT detected.");
        },
        _ = sigterm.recv() => {
            info!("SIGTERM detected.");
        },
        _ = tokio::signal::ctrl_c() => {
            info!("Ctrl+C detected.");
        },
    }

    graceful_tx.send(()).map_err(|e| {
        error!("Failed to send shutdown signal: {}", e);
        Error::Match(MatchError::SignalSendFailed(format!(
            "Failed to send shutdown signal: {}",
            e
        )))
    })?;

    info!("Shutdown completed");
    Ok(())
}

pub fn init_observability(log_dir: &str) -> Result<WorkerGuard> {
    std::fs::create_dir_all(Path::new(log_dir))
        .map_err(|e| Error::Fatal(format!("create log dir failed: {}", e)))?;
    let file_appender = tracing_appender::rolling::daily(log_dir, "q-engine.log");

    let (non_blocking, guard) = tracing_appender::non_blocking(file_appender);
    let base_subscriber = tracing_subscriber::fmt::layer()
        .with_writer(non_blocking)
        .with_filter(EnvFilter::from_default_env());
    tracing_subscriber::registry().with(base_subscriber).init();

    Ok(guard)
}

// ---------------- stock headcount-only strategy ----------------

/// Takes waiting elements in enqueue order until the map's total need is
/// covered; produces nothing if the queue cannot fill a match yet.
struct NormalMatchAchieve;

impl MatchAchieve for NormalMatchAchieve {
    fn do_thread_match(&mut self, ctx: &mut MatchContext) {
        let need = ctx.que_map.match_total_need.max(0) as usize;
        let mut picked = Vec::new();
        let mut headcount = 0usize;
        while headcount < need {
            if ctx.que_elems.is_empty() {
                break;
            }
            let elem = ctx.que_elems.remove(0);
            headcount += elem.elem_data.gamer_num();
            picked.push(elem);
        }
        if headcount >= need {
            ctx.que_result.add_group(picked);
        }
    }
}

struct NormalMatchFactory;

impl MatchAchieveFactory for NormalMatchFactory {
    fn create_new(&self) -> Box<dyn MatchAchieve> {
        Box::new(NormalMatchAchieve)
    }
}

/// Backfills one slot with the longest-waiting element.
struct NormalSupplyAchieve;

impl SupplyAchieve for NormalSupplyAchieve {
    fn do_thread_supply(&mut self, ctx: &mut SupplyContext) {
        if !ctx.que_elems.is_empty() {
            let elem = ctx.que_elems.remove(0);
            ctx.que_result.add_group([elem]);
        }
    }
}

struct NormalSupplyFactory;

impl SupplyAchieveFactory for NormalSupplyFactory {
    fn create_new(&self) -> Box<dyn SupplyAchieve> {
        Box::new(NormalSupplyAchieve)
    }
}

struct LogMatchSuccess;

impl MatchSuccess for LogMatchSuccess {
    fn match_success(&self, result: &MatchResult, client_key: ClientKey, map_info: &MapInfo) -> bool {
        info!(
            "match success: groups={}, client={:?}, map={}",
            result.groups.len(),
            client_key,
            map_info.map_id
        );
        true
    }

    fn supply_success(&self, result: &MatchResult, supply_info: &SupplyInfo) -> bool {
        info!(
            "supply success: groups={}, uuid={}",
            result.groups.len(),
            supply_info.supply_uuid
        );
        true
    }
}
