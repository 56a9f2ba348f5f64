//! Wires recovery, discovery and the worker pool together.

use std::sync::Arc;

use tokio::sync::{mpsc, Mutex};

use crate::context::EngineContext;
use crate::error::Result;
use crate::shutdown::Shutdown;
use crate::{discovery, worker};

pub struct Coordinator {
    ctx: Arc<EngineContext>,
}

impl Coordinator {
    pub fn new(ctx: EngineContext) -> Self {
        Self { ctx: Arc::new(ctx) }
    }

    pub fn context(&self) -> &Arc<EngineContext> {
        &self.ctx
    }

    /// Runs until `shutdown` fires and the queue is drained.
    ///
    /// Recovery failures are returned before any work starts.
    pub async fn run(&self, shutdown: Shutdown) -> Result<()> {
        let recovery_ctx = self.ctx.clone();
        let recovery = tokio::task::spawn_blocking(move || recovery_ctx.store.recover()).await??;
        log::info!(
            "[Coordinator] recovery: {} in-flight record(s) cleared, {} task(s) reset",
            recovery.cleared_in_flight,
            recovery.reset_tasks
        );

        tokio::fs::create_dir_all(&self.ctx.config.workspace_path).await?;

        let (tx, rx) = mpsc::unbounded_channel();
        let queue: worker::SharedQueue = Arc::new(Mutex::new(rx));

        let workers: Vec<_> = (0..self.ctx.config.worker_count)
            .map(|id| tokio::spawn(worker::run(id, self.ctx.clone(), queue.clone())))
            .collect();
        log::info!(
            "[Coordinator] {} worker(s) started, redaction level {}",
            workers.len(),
            self.ctx.config.redaction_level
        );

        discovery::run(self.ctx.clone(), tx, shutdown).await;

        for handle in workers {
            if let Err(e) = handle.await {
                log::error!("[Coordinator] worker failed: {}", e);
            }
        }
        log::info!("[Coordinator] all workers stopped");
        Ok(())
    }
}
