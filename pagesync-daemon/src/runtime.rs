use std::path::PathBuf;
use std::time::{Duration, Instant};

use tokio::sync::broadcast;

use pagesync_core::{BatchResult, Discovery};
use pagesync_store::ContentStore;
use pagesync_sync::{save_report, Orchestrator, StopFlag, SyncError};

use crate::error::{io_err, DaemonError};

/// Watch-mode settings.
#[derive(Debug, Clone)]
pub struct WatchOptions {
    /// Pause between the end of one cycle and the start of the next.
    pub interval: Duration,
    /// Where each cycle's report is written; `None` disables reports.
    pub report_dir: Option<PathBuf>,
}

/// What a watch session did before it stopped.
#[derive(Debug, Clone, Default)]
pub struct WatchSummary {
    pub cycles: usize,
    pub last_result: Option<BatchResult>,
    /// Cycles whose fingerprints could not be saved. Their results are
    /// still reported; the records stay in memory for the next flush.
    pub flush_failures: usize,
}

/// Start watch mode on a fresh runtime and block until ctrl-c.
pub fn start_blocking<S>(
    orchestrator: Orchestrator<S>,
    discovery: Discovery,
    options: WatchOptions,
) -> Result<WatchSummary, DaemonError>
where
    S: ContentStore + 'static,
{
    init_tracing();
    let runtime = tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()
        .map_err(|e| io_err("tokio-runtime", e))?;
    let (shutdown_tx, _) = broadcast::channel::<()>(16);
    runtime.block_on(run(orchestrator, discovery, options, shutdown_tx))
}

/// Run the scan loop until `shutdown` fires (or ctrl-c is received).
///
/// Sending on `shutdown` raises the stop flag of a cycle in progress: the
/// current item finishes, the partial result is reported, and fingerprints
/// are flushed before this returns.
pub async fn run<S>(
    orchestrator: Orchestrator<S>,
    discovery: Discovery,
    options: WatchOptions,
    shutdown: broadcast::Sender<()>,
) -> Result<WatchSummary, DaemonError>
where
    S: ContentStore + 'static,
{
    let scan_handle = {
        let shutdown = shutdown.clone();
        let shutdown_rx = shutdown.subscribe();
        tokio::spawn(async move {
            let result = scan_task(orchestrator, discovery, options, shutdown_rx).await;
            let _ = shutdown.send(());
            result
        })
    };

    let signal_handle = {
        let shutdown = shutdown.clone();
        let mut shutdown_rx = shutdown.subscribe();
        tokio::spawn(async move {
            tokio::select! {
                _ = shutdown_rx.recv() => Ok(()),
                signal = tokio::signal::ctrl_c() => {
                    match signal {
                        Ok(()) => {
                            tracing::info!("received ctrl-c, finishing current item");
                            let _ = shutdown.send(());
                            Ok(())
                        }
                        Err(err) => Err(DaemonError::Signal(err.to_string())),
                    }
                }
            }
        })
    };

    let (scan_result, signal_result) = tokio::join!(scan_handle, signal_handle);

    let summary = handle_join("scan", scan_result)?;
    handle_join("signal_handler", signal_result)?;
    Ok(summary)
}

async fn scan_task<S>(
    mut orchestrator: Orchestrator<S>,
    discovery: Discovery,
    options: WatchOptions,
    mut shutdown_rx: broadcast::Receiver<()>,
) -> Result<WatchSummary, DaemonError>
where
    S: ContentStore + 'static,
{
    let stop = StopFlag::new();
    let mut summary = WatchSummary::default();
    let mut attempts = 0usize;

    tracing::info!(
        interval_secs = options.interval.as_secs(),
        roots = discovery.roots().len(),
        "watch mode started"
    );

    loop {
        attempts += 1;
        let started = Instant::now();
        let mut handle = {
            let discovery = discovery.clone();
            let stop = stop.clone();
            let report_dir = options.report_dir.clone();
            tokio::task::spawn_blocking(move || {
                let cycle = run_cycle_blocking(&mut orchestrator, &discovery, &stop, report_dir);
                (orchestrator, cycle)
            })
        };

        // Keep listening for shutdown while the cycle runs so it can stop
        // between items.
        let joined = loop {
            tokio::select! {
                joined = &mut handle => break joined,
                _ = shutdown_rx.recv(), if !stop.is_raised() => {
                    tracing::info!("shutdown requested during cycle");
                    stop.raise();
                }
            }
        };
        let (returned, cycle) =
            joined.map_err(|err| DaemonError::Task(format!("sync cycle join error: {err}")))?;
        orchestrator = returned;

        match cycle {
            Ok((result, flushed)) => {
                summary.cycles += 1;
                if !flushed {
                    summary.flush_failures += 1;
                }
                tracing::info!(
                    cycle = summary.cycles,
                    total = result.stats.total,
                    succeeded = result.stats.succeeded,
                    failed = result.stats.failed,
                    skipped = result.stats.skipped,
                    interrupted = result.interrupted,
                    duration_ms = started.elapsed().as_millis() as u64,
                    "sync cycle finished"
                );
                summary.last_result = Some(result);
            }
            // A broken setup shows up on the first pass; later failures are
            // treated as transient.
            Err(err) if attempts == 1 => return Err(err.into()),
            Err(err) => tracing::error!(error = %err, "sync cycle failed"),
        }

        if stop.is_raised() {
            break;
        }

        tokio::select! {
            _ = shutdown_rx.recv() => break,
            _ = tokio::time::sleep(options.interval) => {}
        }
    }

    tracing::info!(cycles = summary.cycles, "watch mode stopped");
    Ok(summary)
}

/// One cycle plus its report. The flag is `false` when fingerprints could
/// not be saved.
fn run_cycle_blocking<S: ContentStore>(
    orchestrator: &mut Orchestrator<S>,
    discovery: &Discovery,
    stop: &StopFlag,
    report_dir: Option<PathBuf>,
) -> Result<(BatchResult, bool), SyncError> {
    let cycle = orchestrator.run_cycle(discovery, stop)?;
    if let Some(dir) = report_dir {
        if let Err(err) = save_report(&dir, &cycle.result) {
            tracing::warn!(error = %err, "could not write cycle report");
        }
    }
    Ok((cycle.result, cycle.flush.is_ok()))
}

fn handle_join<T>(
    task: &str,
    result: Result<Result<T, DaemonError>, tokio::task::JoinError>,
) -> Result<T, DaemonError> {
    match result {
        Ok(inner) => inner,
        Err(err) => Err(DaemonError::Task(format!("{task} task join failure: {err}"))),
    }
}

/// Install the fmt subscriber used by the binary. Logs go to stderr so stdout
/// stays free for summaries; records from the `log` facade are forwarded too.
pub fn init_tracing() {
    use tracing_subscriber::{fmt, EnvFilter};

    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let _ = fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .try_init();
}
