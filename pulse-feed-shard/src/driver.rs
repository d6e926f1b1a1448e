//! Command-queue driver running one listing view.
//!
//! Renderer events (filter changes, visibility reports, pull to refresh) and
//! fetch completions all arrive on one queue and are applied to the
//! [`FeedController`] one at a time. After every command the new
//! [`FeedSnapshot`] is published on a watch channel.

use std::{
    sync::Arc,
    time::{Duration, Instant},
};

use pulse_feed::{
    ApplyOutcome, FeedConfig, FeedController, FeedError, FeedSnapshot, FilterKey, ListingView,
    PageRequest, PageResponse, VisibilityEvent,
};
use tokio::{
    sync::{mpsc, watch},
    task::JoinHandle,
};
use tracing::{debug, info, instrument};

use crate::{error::ShardError, source::PageSource, task_handles::TaskHandles};

/// Work item processed by a [`FeedDriver`].
#[derive(Debug)]
pub enum FeedCommand {
    /// Switch to new filters.
    SetFilter(FilterKey),
    /// A rendered row changed visibility.
    Visible(VisibilityEvent),
    /// Reload page 1 under the current filters.
    Refresh,
    /// A fetch finished.
    Loaded {
        /// The request that was performed.
        request: PageRequest,
        /// Its outcome.
        result: Result<PageResponse, FeedError>,
    },
    /// Stop the driver and cancel pending fetches.
    Shutdown,
}

/// Owns the pagination state of one listing view and performs its fetches.
pub struct FeedDriver<S> {
    view: ListingView,
    controller: FeedController,
    source: Arc<S>,
    tasks: TaskHandles,
    commands: mpsc::UnboundedReceiver<FeedCommand>,
    loopback: mpsc::WeakUnboundedSender<FeedCommand>,
    snapshots: watch::Sender<FeedSnapshot>,
}

impl<S: PageSource> FeedDriver<S> {
    /// Creates a driver and the handle used to talk to it.
    pub fn new(view: ListingView, config: FeedConfig, source: S) -> (Self, FeedHandle) {
        let controller = FeedController::new(config);
        let (command_tx, commands) = mpsc::unbounded_channel();
        let (snapshots, snapshot_rx) = watch::channel(controller.snapshot());

        let driver = Self {
            view,
            controller,
            source: Arc::new(source),
            tasks: TaskHandles::new(),
            commands,
            loopback: command_tx.downgrade(),
            snapshots,
        };
        let handle = FeedHandle {
            view,
            commands: command_tx,
            snapshots: snapshot_rx,
        };
        (driver, handle)
    }

    /// Spawns [`run`](Self::run) on the current (or shared) runtime.
    pub fn spawn(self) -> JoinHandle<()> {
        crate::tokio_runtime::handle().spawn(self.run())
    }

    /// Processes commands until shutdown or until every handle is dropped.
    pub async fn run(mut self) {
        info!(view = %self.view, "feed driver started");
        while let Some(command) = self.commands.recv().await {
            if !self.handle(command) {
                break;
            }
        }
        let cancelled = self.tasks.cancel_all();
        info!(view = %self.view, cancelled, "feed driver stopped");
    }

    #[instrument(level = "debug", skip_all, fields(view = %self.view))]
    fn handle(&mut self, command: FeedCommand) -> bool {
        match command {
            FeedCommand::SetFilter(filter) => {
                if let Some(request) = self.controller.set_filter(filter) {
                    self.cancel_in_flight();
                    self.dispatch(request);
                }
            }
            FeedCommand::Refresh => {
                self.cancel_in_flight();
                if let Some(request) = self.controller.refresh() {
                    self.dispatch(request);
                }
            }
            FeedCommand::Visible(event) => {
                if let Some(request) = self.controller.on_visibility(&event, Instant::now()) {
                    self.dispatch(request);
                }
            }
            FeedCommand::Loaded { request, result } => {
                if self.controller.apply(&request, result) == ApplyOutcome::Discarded {
                    return true;
                }
            }
            FeedCommand::Shutdown => return false,
        }

        self.snapshots.send_replace(self.controller.snapshot());
        true
    }

    fn cancel_in_flight(&self) {
        let cancelled = self.tasks.cancel_all();
        if cancelled > 0 {
            debug!(cancelled, "cancelled superseded fetches");
        }
    }

    fn dispatch(&self, request: PageRequest) {
        let Some(loopback) = self.loopback.upgrade() else {
            return;
        };
        let source = Arc::clone(&self.source);
        let deadline = fetch_deadline(self.controller.config());

        self.tasks.spawn(async move {
            let started = Instant::now();
            let result = match tokio::time::timeout(deadline, source.fetch_page(&request)).await {
                Ok(result) => result,
                Err(_) => Err(FeedError::Timeout {
                    page: request.page,
                    elapsed: started.elapsed(),
                }),
            };
            let _ = loopback.send(FeedCommand::Loaded { request, result });
        });
    }
}

/// Upper bound on one fetch including every retry attempt and backoff.
fn fetch_deadline(config: &FeedConfig) -> Duration {
    let attempts = config.retry.max_attempts.max(1);
    let backoff: Duration = (1..attempts).map(|attempt| config.retry.backoff(attempt)).sum();
    config.request_timeout() * attempts + backoff
}

/// Cloneable sender side of a [`FeedDriver`].
#[derive(Clone, Debug)]
pub struct FeedHandle {
    view: ListingView,
    commands: mpsc::UnboundedSender<FeedCommand>,
    snapshots: watch::Receiver<FeedSnapshot>,
}

impl FeedHandle {
    /// View the driver runs.
    pub fn view(&self) -> ListingView {
        self.view
    }

    /// Switches to `filter`.
    pub fn set_filter(&self, filter: FilterKey) -> Result<(), ShardError> {
        self.send(FeedCommand::SetFilter(filter))
    }

    /// Reports a visibility change of a rendered row.
    pub fn visible(&self, event: VisibilityEvent) -> Result<(), ShardError> {
        self.send(FeedCommand::Visible(event))
    }

    /// Reloads page 1 under the current filters.
    pub fn refresh(&self) -> Result<(), ShardError> {
        self.send(FeedCommand::Refresh)
    }

    /// Stops the driver.
    pub fn shutdown(&self) -> Result<(), ShardError> {
        self.send(FeedCommand::Shutdown)
    }

    /// Latest published state.
    pub fn snapshot(&self) -> FeedSnapshot {
        self.snapshots.borrow().clone()
    }

    /// A receiver notified on every published state.
    pub fn subscribe(&self) -> watch::Receiver<FeedSnapshot> {
        self.snapshots.clone()
    }

    /// Waits until a published state satisfies `predicate` and returns it.
    pub async fn wait_for(
        &self,
        predicate: impl FnMut(&FeedSnapshot) -> bool,
    ) -> Result<FeedSnapshot, ShardError> {
        let mut snapshots = self.snapshots.clone();
        let snapshot = snapshots
            .wait_for(predicate)
            .await
            .map_err(|_| self.closed())?;
        Ok(snapshot.clone())
    }

    /// Waits until no request is in flight.
    pub async fn settled(&self) -> Result<FeedSnapshot, ShardError> {
        self.wait_for(|snapshot| !snapshot.is_loading()).await
    }

    /// Whether the driver has stopped.
    pub fn is_closed(&self) -> bool {
        self.commands.is_closed()
    }

    fn send(&self, command: FeedCommand) -> Result<(), ShardError> {
        self.commands.send(command).map_err(|_| self.closed())
    }

    fn closed(&self) -> ShardError {
        ShardError::DriverClosed { view: self.view }
    }
}
