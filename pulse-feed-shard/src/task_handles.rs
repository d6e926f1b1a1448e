use std::future::Future;

use parking_lot::Mutex;
use tokio::{sync::oneshot, task::JoinHandle};

struct TaskHandle {
    handle: JoinHandle<()>,
    cancel: oneshot::Sender<()>,
}

/// Cancellable fetch tasks of one listing view.
///
/// A filter change cancels every fetch still in flight; their responses
/// would be discarded anyway, so there is no point in waiting for them.
pub struct TaskHandles {
    tasks: Mutex<Vec<TaskHandle>>,
}

impl Default for TaskHandles {
    fn default() -> Self {
        Self::new()
    }
}

impl TaskHandles {
    /// An empty set.
    pub fn new() -> Self {
        Self {
            tasks: Mutex::new(Vec::new()),
        }
    }

    /// Spawns `fut`, racing it against its cancel signal.
    pub fn spawn<F>(&self, fut: F)
    where
        F: Future<Output = ()> + Send + 'static,
    {
        let (tx, rx) = oneshot::channel();
        let wrapped = async move {
            tokio::select! {
                _ = fut => {},
                _ = rx => {},
            }
        };
        let handle = crate::tokio_runtime::handle().spawn(wrapped);

        let mut tasks = self.tasks.lock();
        tasks.retain(|task| !task.handle.is_finished());
        tasks.push(TaskHandle { handle, cancel: tx });
    }

    /// Cancels every task still running. Returns how many were signalled.
    pub fn cancel_all(&self) -> usize {
        let mut tasks = self.tasks.lock();
        let mut cancelled = 0;
        for task in tasks.drain(..) {
            if !task.handle.is_finished() && task.cancel.send(()).is_ok() {
                cancelled += 1;
            }
        }
        cancelled
    }

    /// Number of tasks that have not finished yet.
    pub fn running(&self) -> usize {
        self.tasks
            .lock()
            .iter()
            .filter(|task| !task.handle.is_finished())
            .count()
    }
}

#[cfg(test)]
mod tests {
    use std::{
        sync::{
            Arc,
            atomic::{AtomicBool, Ordering},
        },
        time::Duration,
    };

    use super::TaskHandles;

    #[tokio::test]
    async fn cancel_all_stops_pending_tasks() {
        let tasks = TaskHandles::new();
        let finished = Arc::new(AtomicBool::new(false));
        let flag = finished.clone();
        tasks.spawn(async move {
            tokio::time::sleep(Duration::from_secs(30)).await;
            flag.store(true, Ordering::SeqCst);
        });

        assert_eq!(tasks.running(), 1);
        assert_eq!(tasks.cancel_all(), 1);
        tokio::time::sleep(Duration::from_millis(20)).await;
        assert!(!finished.load(Ordering::SeqCst));
        assert_eq!(tasks.running(), 0);
    }

    #[tokio::test]
    async fn finished_tasks_are_not_cancelled() {
        let tasks = TaskHandles::new();
        let (tx, rx) = tokio::sync::oneshot::channel();
        tasks.spawn(async move {
            let _ = tx.send(());
        });
        rx.await.expect("task ran");
        tokio::time::sleep(Duration::from_millis(20)).await;
        assert_eq!(tasks.cancel_all(), 0);
    }
}
