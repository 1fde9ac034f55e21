//! A handle to a spawned drive task that owns an upstream update stream.

use std::future::Future;

use tokio::{sync::oneshot, task::JoinHandle};
use tracing::error;


/// A handle to a running drive task, which owns its upstream stream.
///
/// Dropping this handle stops the task before it takes its next update;
/// use [`Subscription::shutdown()`] to also wait for it to finish.
/// A batch that has already started applying always completes first.
pub struct Subscription {
    shutdown_sender: Option<oneshot::Sender<()>>,
    task: Option<JoinHandle<()>>,
}

impl Subscription {
    /// Spawns the future returned by `drive` onto the current Tokio runtime.
    ///
    /// `drive` receives the shutdown signal, which resolves once this handle
    /// is shut down or dropped.
    pub(crate) fn spawn<F>(drive: impl FnOnce(oneshot::Receiver<()>) -> F) -> Self
    where
        F: Future<Output = ()> + Send + 'static,
    {
        let (shutdown_sender, shutdown_receiver) = oneshot::channel();
        let task = tokio::spawn(drive(shutdown_receiver));
        Self { shutdown_sender: Some(shutdown_sender), task: Some(task) }
    }

    /// Stops the drive task, releasing its upstream stream, and waits for it to finish.
    pub async fn shutdown(mut self) {
        if let Some(sender) = self.shutdown_sender.take() {
            let _ = sender.send(());
        }
        if let Some(task) = self.task.take()
            && let Err(e) = task.await
        {
            error!("Drive task failed: {e}");
        }
    }
}

impl Drop for Subscription {
    fn drop(&mut self) {
        if let Some(sender) = self.shutdown_sender.take() {
            let _ = sender.send(());
        }
    }
}
