use anyhow::Context;
use clap::{ArgAction, Args, Parser};
use routefinder_core::{
    config::{DirtyClearPolicy, SchedulerConfig},
    guide::{GuideDb, GuideStore},
    pipeline::{IdleDomain, Pipeline},
    scheduler::Scheduler,
};
use std::path::Path;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::watch;

// ---------------------------------------------------------------------------
// Arguments
// ---------------------------------------------------------------------------

#[derive(Args, Debug)]
pub struct RunArgs {
    /// Address the liveness endpoint binds to
    #[arg(long, env = "HOST", default_value = "0.0.0.0")]
    pub host: String,

    /// Port the liveness endpoint binds to
    #[arg(long, env = "PORT", default_value = "5678")]
    pub port: u16,

    /// Recompute when the last iteration is older than this many seconds
    #[arg(long, env = "ITERATION_SLEEP_TIME", default_value = "86400")]
    pub stale_after_secs: u64,

    /// Seconds to sleep between scheduler passes
    #[arg(long, env = "ROUTEFINDER_POLL_SECS", default_value = "10")]
    pub poll_secs: u64,

    /// When to clear the dirty flag: clear-before or clear-after
    #[arg(long, env = "ROUTEFINDER_DIRTY_POLICY", default_value = "clear-before")]
    pub dirty_policy: DirtyClearPolicy,

    /// Stamp the guide even when an iteration fails
    #[arg(
        long,
        env = "ROUTEFINDER_PERSIST_FAILED",
        default_value = "true",
        action = ArgAction::Set
    )]
    pub persist_failed: bool,
}

/// `run` arguments with nothing on the command line, used when the binary is
/// started without a subcommand.
#[derive(Parser)]
struct BareRun {
    #[command(flatten)]
    args: RunArgs,
}

impl RunArgs {
    /// Defaults overlaid with the environment.
    pub fn from_env() -> Result<Self, clap::Error> {
        BareRun::try_parse_from(["routefinder"]).map(|bare| bare.args)
    }

    pub fn scheduler_config(&self) -> SchedulerConfig {
        SchedulerConfig {
            stale_after: Duration::from_secs(self.stale_after_secs),
            poll_interval: Duration::from_secs(self.poll_secs),
            dirty_policy: self.dirty_policy,
            persist_failed_runs: self.persist_failed,
        }
    }
}

// ---------------------------------------------------------------------------
// run
// ---------------------------------------------------------------------------

pub fn run(db_path: &Path, args: RunArgs) -> anyhow::Result<()> {
    let config = args.scheduler_config();
    config.validate()?;

    tracing::info!(time = %chrono::Utc::now(), "routefinder service begins");

    let store: Arc<dyn GuideStore> = Arc::new(
        GuideDb::open(db_path)
            .with_context(|| format!("failed to open guide database {}", db_path.display()))?,
    );
    let domain = Arc::new(IdleDomain);
    let pipeline = Pipeline::standard(domain.clone(), domain);
    let scheduler = Scheduler::new(store, pipeline, config);

    let rt = tokio::runtime::Runtime::new()?;
    rt.block_on(async move {
        let addr = format!("{}:{}", args.host, args.port);
        let listener = tokio::net::TcpListener::bind(&addr)
            .await
            .with_context(|| format!("failed to bind liveness endpoint on {addr}"))?;

        let (shutdown_tx, shutdown_rx) = watch::channel(false);
        let worker = tokio::spawn(scheduler.run(shutdown_rx.clone()));

        let mut server_shutdown = shutdown_rx;
        let mut server = tokio::spawn(routefinder_server::serve_on(listener, async move {
            let _ = server_shutdown.wait_for(|stop| *stop).await;
        }));

        // Either task finishing on its own, or ctrl-c, brings both down.
        let server_result = tokio::select! {
            signal = tokio::signal::ctrl_c() => {
                signal.context("failed to listen for ctrl-c")?;
                tracing::info!("shutdown requested");
                None
            }
            res = &mut server => Some(res),
        };

        let _ = shutdown_tx.send(true);
        let server_result = match server_result {
            Some(res) => res,
            None => server.await,
        };
        worker.await.context("scheduler task failed")?;
        server_result.context("liveness task failed")??;
        Ok(())
    })
}
