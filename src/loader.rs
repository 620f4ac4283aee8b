use anyhow::{anyhow, Context, Result};
use std::sync::mpsc;
use std::thread;

type LoadJob = Box<dyn FnOnce() + Send + 'static>;

/// Receiving half of a one-shot background load.
pub struct PendingLoad<T> {
    label: String,
    rx: mpsc::Receiver<Result<T>>,
}

/// Sending half of a one-shot background load. Dropping it without calling
/// [`LoadCompleter::complete`] fails the load.
pub struct LoadCompleter<T> {
    tx: mpsc::Sender<Result<T>>,
}

pub fn pending<T>(label: impl Into<String>) -> (LoadCompleter<T>, PendingLoad<T>) {
    let (tx, rx) = mpsc::channel();
    (LoadCompleter { tx }, PendingLoad { label: label.into(), rx })
}

impl<T> LoadCompleter<T> {
    pub fn complete(self, result: Result<T>) {
        // Receiver gone means nobody is waiting any more.
        let _ = self.tx.send(result);
    }
}

pub enum LoadPoll<T> {
    Pending,
    Ready(T),
    Failed(anyhow::Error),
}

impl<T> PendingLoad<T> {
    pub fn label(&self) -> &str {
        &self.label
    }

    pub fn poll(&self) -> LoadPoll<T> {
        match self.rx.try_recv() {
            Ok(Ok(value)) => LoadPoll::Ready(value),
            Ok(Err(err)) => LoadPoll::Failed(err),
            Err(mpsc::TryRecvError::Empty) => LoadPoll::Pending,
            Err(mpsc::TryRecvError::Disconnected) => {
                LoadPoll::Failed(anyhow!("Load '{}' was abandoned by the loader", self.label))
            }
        }
    }
}

/// Lifecycle of an asynchronously loaded asset as seen from the render thread.
pub enum AssetSlot<T> {
    /// Nothing requested yet.
    Idle,
    Pending(PendingLoad<T>),
    Ready(T),
    Failed(String),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SlotChange {
    Unchanged,
    Loaded,
    Failed(String),
}

impl<T> Default for AssetSlot<T> {
    fn default() -> Self {
        AssetSlot::Idle
    }
}

impl<T> AssetSlot<T> {
    pub fn is_pending(&self) -> bool {
        matches!(self, AssetSlot::Pending(_))
    }

    pub fn ready(&self) -> Option<&T> {
        match self {
            AssetSlot::Ready(value) => Some(value),
            _ => None,
        }
    }

    pub fn state_name(&self) -> &'static str {
        match self {
            AssetSlot::Idle => "idle",
            AssetSlot::Pending(_) => "pending",
            AssetSlot::Ready(_) => "ready",
            AssetSlot::Failed(_) => "failed",
        }
    }

    /// Moves a pending slot forward if its load has finished.
    pub fn resolve(&mut self) -> SlotChange {
        let AssetSlot::Pending(load) = self else {
            return SlotChange::Unchanged;
        };
        match load.poll() {
            LoadPoll::Pending => SlotChange::Unchanged,
            LoadPoll::Ready(value) => {
                *self = AssetSlot::Ready(value);
                SlotChange::Loaded
            }
            LoadPoll::Failed(err) => {
                let message = format!("{err:#}");
                *self = AssetSlot::Failed(message.clone());
                SlotChange::Failed(message)
            }
        }
    }
}

/// Single named worker thread that runs load jobs in submission order.
pub struct AssetLoader {
    tx: mpsc::Sender<LoadJob>,
}

impl AssetLoader {
    pub fn new() -> Result<Self> {
        let (tx, rx) = mpsc::channel::<LoadJob>();
        thread::Builder::new()
            .name("asset-loader".to_string())
            .spawn(move || {
                while let Ok(job) = rx.recv() {
                    job();
                }
                tracing::debug!("Asset loader thread exiting");
            })
            .context("Failed to spawn asset loader thread")?;
        Ok(Self { tx })
    }

    pub fn spawn<T, F>(&self, label: impl Into<String>, job: F) -> PendingLoad<T>
    where
        T: Send + 'static,
        F: FnOnce() -> Result<T> + Send + 'static,
    {
        let (completer, pending) = pending(label);
        let job_label = pending.label().to_string();
        let boxed: LoadJob = Box::new(move || {
            tracing::debug!(asset = %job_label, "Loading");
            completer.complete(job());
        });
        if self.tx.send(boxed).is_err() {
            // The dropped job takes its completer with it, so the load reports as abandoned.
            tracing::warn!(asset = %pending.label(), "Asset loader is not running");
        }
        pending
    }
}
