use super::connection_string::IngestionTarget;
use super::envelope::Envelope;
use super::errors::TelemetryError;
use flume::{Receiver, Sender, TrySendError};
use std::time::Duration;
use tokio::sync::oneshot;

/// Envelopes waiting in the channel before new ones are dropped.
const CHANNEL_CAPACITY: usize = 10_000;

enum ExportCommand {
    Envelope(Box<Envelope>),
    Flush(oneshot::Sender<Result<usize, TelemetryError>>),
}

/// Handle to the background task that batches and posts envelopes.
#[derive(Clone)]
pub struct Exporter {
    sender: Sender<ExportCommand>,
}

impl Exporter {
    /// Spawns the export task on the current Tokio runtime.
    pub fn spawn(
        client: reqwest::Client,
        target: IngestionTarget,
        interval: Duration,
        max_batch_size: usize,
    ) -> Result<Self, TelemetryError> {
        let runtime = tokio::runtime::Handle::try_current().map_err(|_| TelemetryError::NoRuntime)?;
        let (sender, receiver) = flume::bounded(CHANNEL_CAPACITY);

        let worker = ExportWorker {
            client,
            url: target.track_url(),
            receiver,
            interval,
            max_batch_size: max_batch_size.max(1),
            batch: Vec::new(),
            posted: 0,
        };
        runtime.spawn(worker.run());

        Ok(Self { sender })
    }

    /// Queues an envelope. Returns false when it had to be dropped.
    pub fn submit(&self, envelope: Envelope) -> bool {
        match self.sender.try_send(ExportCommand::Envelope(Box::new(envelope))) {
            Ok(()) => true,
            Err(TrySendError::Full(_)) | Err(TrySendError::Disconnected(_)) => false,
        }
    }

    /// Sends everything queued so far and waits for the upload to finish.
    ///
    /// Returns how many envelopes were accepted by the endpoint since the
    /// previous flush.
    pub async fn flush(&self) -> Result<usize, TelemetryError> {
        let (done, wait) = oneshot::channel();
        self.sender
            .send_async(ExportCommand::Flush(done))
            .await
            .map_err(|_| TelemetryError::ExporterStopped)?;
        wait.await.map_err(|_| TelemetryError::ExporterStopped)?
    }

    /// Asks the worker to send what it has without waiting for the result.
    pub fn request_flush(&self) {
        let (done, _) = oneshot::channel();
        let _ = self.sender.try_send(ExportCommand::Flush(done));
    }
}

struct ExportWorker {
    client: reqwest::Client,
    url: String,
    receiver: Receiver<ExportCommand>,
    interval: Duration,
    max_batch_size: usize,
    batch: Vec<Envelope>,
    /// Envelopes posted since the last flush
    posted: usize,
}

impl ExportWorker {
    async fn run(mut self) {
        let mut ticker = tokio::time::interval(self.interval);
        ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);
        // The first tick completes immediately
        ticker.tick().await;

        loop {
            tokio::select! {
                command = self.receiver.recv_async() => match command {
                    Ok(ExportCommand::Envelope(envelope)) => {
                        self.batch.push(*envelope);
                        if self.batch.len() >= self.max_batch_size {
                            let _ = self.send_batch().await;
                        }
                    }
                    Ok(ExportCommand::Flush(done)) => {
                        let result = self.send_batch().await;
                        let posted = std::mem::take(&mut self.posted);
                        let _ = done.send(result.map(|()| posted));
                    }
                    // All handles dropped
                    Err(_) => {
                        let _ = self.send_batch().await;
                        break;
                    }
                },
                _ = ticker.tick() => {
                    let _ = self.send_batch().await;
                }
            }
        }
    }

    async fn send_batch(&mut self) -> Result<(), TelemetryError> {
        if self.batch.is_empty() {
            return Ok(());
        }
        let batch = std::mem::take(&mut self.batch);

        // Errors go to stderr: logging them would feed back into this exporter
        let response = self
            .client
            .post(&self.url)
            .json(&batch)
            .send()
            .await
            .map_err(|e| {
                let err = TelemetryError::Export(e.to_string());
                eprintln!("{err}");
                err
            })?;

        // 206 means some items were rejected; those are not resent
        let status = response.status();
        if status.is_success() {
            self.posted += batch.len();
            Ok(())
        } else {
            let body = response.text().await.unwrap_or_default();
            let err = TelemetryError::Export(format!("HTTP {status}: {body}"));
            eprintln!("{err}");
            Err(err)
        }
    }
}
