//! Query bridge service: wires one channel's dispatcher, router and table.

use crate::domain::config::{BridgeConfig, ConfigError};
use crate::domain::pending::{cleanup_task, PendingRequestTable};
use crate::ipc::dispatcher::QueryDispatcher;
use crate::ipc::router::CallbackRouter;
use crate::ports::{EndpointRegistry, QueryTransport, ResultReceiver};
use std::sync::Arc;
use tokio::task::JoinHandle;
use tracing::info;

/// Query bridge for one channel.
pub struct QueryBridge {
    config: BridgeConfig,
    pending: Arc<PendingRequestTable>,
    dispatcher: Arc<QueryDispatcher>,
    router: Arc<CallbackRouter>,
    tasks: Vec<JoinHandle<()>>,
}

impl QueryBridge {
    /// Create a new bridge
    pub fn new(
        channel_id: i32,
        config: BridgeConfig,
        transport: Arc<dyn QueryTransport>,
        registry: Arc<dyn EndpointRegistry>,
    ) -> Result<Self, ConfigError> {
        config.validate()?;

        let pending = Arc::new(PendingRequestTable::new());
        let dispatcher = Arc::new(QueryDispatcher::new(
            channel_id,
            Arc::clone(&pending),
            transport,
            registry,
            &config,
        ));
        let router = Arc::new(CallbackRouter::new(Arc::clone(&pending)));

        Ok(Self {
            config,
            pending,
            dispatcher,
            router,
            tasks: Vec::new(),
        })
    }

    /// Spawn the router loop on `receiver` and the expiry sweep.
    ///
    /// Must be called within a tokio runtime.
    pub fn start(&mut self, receiver: Arc<dyn ResultReceiver>) {
        info!(
            channel_id = self.dispatcher.channel_id(),
            request_timeout_ms = self.config.request_timeout.as_millis() as u64,
            "Starting query bridge"
        );

        let router = Arc::clone(&self.router);
        self.tasks.push(tokio::spawn(async move {
            router.run(receiver).await;
        }));

        let pending = Arc::clone(&self.pending);
        let interval = self.config.sweep_interval;
        self.tasks.push(tokio::spawn(async move {
            cleanup_task(pending, interval).await;
        }));
    }

    /// Stop background tasks and drop every outstanding query.
    ///
    /// No result is delivered after this; callers still waiting observe
    /// `Timeout` once their own deadline passes.
    pub fn shutdown(&mut self) {
        for task in self.tasks.drain(..) {
            task.abort();
        }
        let cancelled = self.pending.clear();
        info!(
            channel_id = self.dispatcher.channel_id(),
            cancelled, "Query bridge shut down"
        );
    }

    pub fn is_running(&self) -> bool {
        self.tasks.iter().any(|task| !task.is_finished())
    }

    pub fn dispatcher(&self) -> Arc<QueryDispatcher> {
        Arc::clone(&self.dispatcher)
    }

    /// Router, for transports that deliver on their own threads.
    pub fn router(&self) -> Arc<CallbackRouter> {
        Arc::clone(&self.router)
    }

    pub fn pending(&self) -> Arc<PendingRequestTable> {
        Arc::clone(&self.pending)
    }

    pub fn config(&self) -> &BridgeConfig {
        &self.config
    }
}

impl Drop for QueryBridge {
    fn drop(&mut self) {
        for task in &self.tasks {
            task.abort();
        }
    }
}
