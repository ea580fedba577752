//! Background worker thread: every pipeline run happens here.
//!
//! The worker owns the `Pipeline` (and so the session cache) and handles
//! commands strictly one at a time. Communication with the main thread is
//! via `mpsc` channels.

use std::io;
use std::sync::mpsc::{Receiver, Sender};
use std::thread::{self, JoinHandle};

use chrono::Local;
use tracing::debug;

use trendcast_core::domain::{Horizon, TickerSymbol};
use trendcast_runner::{Pipeline, PipelineOutcome};

/// Commands sent from the TUI to the worker.
#[derive(Debug)]
pub enum WorkerCommand {
    /// Fetch (through the cache) and forecast.
    Run {
        request_id: u64,
        ticker: TickerSymbol,
        horizon: Horizon,
    },
    /// Drop the cached series so the next run refetches.
    Invalidate { ticker: TickerSymbol },
    Shutdown,
}

/// Responses sent from the worker back to the TUI.
#[derive(Debug, Clone)]
pub enum WorkerResponse {
    Started {
        request_id: u64,
        ticker: TickerSymbol,
    },
    Finished {
        request_id: u64,
        ticker: TickerSymbol,
        horizon: Horizon,
        outcome: Box<PipelineOutcome>,
        cache_hits: u64,
    },
}

/// Spawn the background worker thread.
pub fn spawn_worker(
    pipeline: Pipeline,
    rx: Receiver<WorkerCommand>,
    tx: Sender<WorkerResponse>,
) -> io::Result<JoinHandle<()>> {
    thread::Builder::new()
        .name("trendcast-worker".into())
        .spawn(move || worker_loop(pipeline, rx, tx))
}

fn worker_loop(mut pipeline: Pipeline, rx: Receiver<WorkerCommand>, tx: Sender<WorkerResponse>) {
    loop {
        match rx.recv() {
            Ok(WorkerCommand::Shutdown) | Err(_) => break,
            Ok(WorkerCommand::Invalidate { ticker }) => {
                let dropped = pipeline.invalidate(&ticker);
                debug!(ticker = %ticker, dropped, "cache entry invalidated");
            }
            Ok(WorkerCommand::Run {
                request_id,
                ticker,
                horizon,
            }) => {
                let _ = tx.send(WorkerResponse::Started {
                    request_id,
                    ticker: ticker.clone(),
                });
                let outcome = pipeline.run_at(&ticker, horizon, Local::now().naive_local());
                let _ = tx.send(WorkerResponse::Finished {
                    request_id,
                    ticker,
                    horizon,
                    outcome: Box::new(outcome),
                    cache_hits: pipeline.cache_stats().hits,
                });
            }
        }
    }
}
