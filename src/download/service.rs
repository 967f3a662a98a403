//! Download control task: the single owner of a [`DownloadQueueSupervisor`].

use tokio::sync::{broadcast, mpsc};
use tokio::task::JoinHandle;
use tokio::time::Instant;
use tokio_util::sync::{CancellationToken, DropGuard};

use super::supervisor::DownloadQueueSupervisor;
use crate::error::{Error, Result};
use crate::types::Event;

/// Request for the download task
#[derive(Clone, Debug)]
pub enum DownloadCommand {
    /// Append a url to the download queue
    Download(String),
}

/// Handle to the running download service
///
/// Dropping the handle lets queued downloads finish before the task ends;
/// [`shutdown`](Self::shutdown) kills the running one and drops the rest.
pub struct DownloadHandle {
    command_tx: mpsc::UnboundedSender<DownloadCommand>,
    cancel: CancellationToken,
    task: JoinHandle<()>,
    // Cancels `released` once the handle is gone, by drop or by shutdown
    _released_guard: DropGuard,
    released: CancellationToken,
}

impl DownloadHandle {
    /// Queue a url for download
    pub fn download(&self, url: impl Into<String>) -> Result<()> {
        self.send(DownloadCommand::Download(url.into()))
    }

    /// Send a command to the download task
    pub fn send(&self, command: DownloadCommand) -> Result<()> {
        self.command_tx
            .send(command)
            .map_err(|_| Error::ShuttingDown)
    }

    /// Whether the download task has stopped
    pub fn is_finished(&self) -> bool {
        self.task.is_finished()
    }

    /// Stop the service, killing any running extraction
    pub async fn shutdown(self) -> Result<()> {
        self.cancel.cancel();
        self.task
            .await
            .map_err(|e| Error::Other(format!("download task failed: {}", e)))
    }

    /// A sender that does not keep the download task alive
    pub(crate) fn weak_command_sender(&self) -> mpsc::WeakUnboundedSender<DownloadCommand> {
        self.command_tx.downgrade()
    }

    /// Cancelled when this handle is dropped or shut down
    pub(crate) fn released(&self) -> CancellationToken {
        self.released.clone()
    }
}

/// Spawn the control task around `supervisor`
pub(crate) fn spawn_downloader(
    supervisor: DownloadQueueSupervisor,
    event_tx: broadcast::Sender<Event>,
) -> DownloadHandle {
    let (command_tx, command_rx) = mpsc::unbounded_channel();
    let cancel = CancellationToken::new();
    let task = tokio::spawn(run_downloader(
        supervisor,
        event_tx,
        command_rx,
        cancel.clone(),
    ));
    let released = CancellationToken::new();
    DownloadHandle {
        command_tx,
        cancel,
        task,
        _released_guard: released.clone().drop_guard(),
        released,
    }
}

async fn run_downloader(
    mut supervisor: DownloadQueueSupervisor,
    event_tx: broadcast::Sender<Event>,
    mut command_rx: mpsc::UnboundedReceiver<DownloadCommand>,
    cancel: CancellationToken,
) {
    tracing::info!(
        timeout_secs = supervisor.timeout().as_secs_f64(),
        "Download service started"
    );
    let mut commands_open = true;

    loop {
        tokio::select! {
            _ = cancel.cancelled() => {
                tracing::info!("Download service shutting down");
                supervisor.shutdown();
                event_tx.send(Event::Shutdown).ok();
                return;
            }
            _ = supervisor.next_tick() => supervisor.poll_tick(Instant::now()),
            command = command_rx.recv(), if commands_open => match command {
                Some(DownloadCommand::Download(url)) => supervisor.enqueue(url),
                None => {
                    tracing::debug!("Download handle dropped, draining queue");
                    commands_open = false;
                }
            },
        }

        if !commands_open && supervisor.is_idle() {
            tracing::info!("Download queue drained");
            return;
        }
    }
}
