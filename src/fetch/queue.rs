// src/fetch/queue.rs
// =============================================================================
// An unbounded FIFO work queue with "task done" accounting.
//
// Producers `put` items; consumers `get` them and call `task_done` once
// each item is fully handled. `join` waits until every item ever put has
// been marked done, which is stronger than "the queue is empty": an item
// that is taken but still being processed keeps `join` waiting.
//
// The end of the work is signalled in-band with Envelope::Stop, which goes
// through the same FIFO as the real items and is acknowledged like them.
// =============================================================================

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use tokio::sync::{mpsc, Mutex, Notify};

// A queue entry: a real work item or the sentinel
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Envelope<T> {
    Item(T),
    Stop,
}

pub struct JoinableQueue<T> {
    sender: mpsc::UnboundedSender<Envelope<T>>,
    receiver: Mutex<mpsc::UnboundedReceiver<Envelope<T>>>,
    /// Entries put but not yet acknowledged with task_done()
    unfinished: AtomicUsize,
    drained: Notify,
}

impl<T: Send> JoinableQueue<T> {
    pub fn new() -> Self {
        let (sender, receiver) = mpsc::unbounded_channel();
        Self {
            sender,
            receiver: Mutex::new(receiver),
            unfinished: AtomicUsize::new(0),
            drained: Notify::new(),
        }
    }

    pub fn put(&self, item: T) {
        self.push(Envelope::Item(item));
    }

    pub fn put_stop(&self) {
        self.push(Envelope::Stop);
    }

    fn push(&self, envelope: Envelope<T>) {
        self.unfinished.fetch_add(1, Ordering::SeqCst);
        // The queue owns its receiver, so the channel cannot be closed
        // while `self` is alive
        if self.sender.send(envelope).is_err() {
            self.task_done();
        }
    }

    // Waits for the next entry
    //
    // Several consumers may call this concurrently; each entry goes to
    // exactly one of them, in FIFO order.
    pub async fn get(&self) -> Envelope<T> {
        let mut receiver = self.receiver.lock().await;
        // Never None: we hold a sender ourselves
        receiver.recv().await.unwrap_or(Envelope::Stop)
    }

    // Acknowledges one entry returned by get()
    pub fn task_done(&self) {
        let previous = self.unfinished.fetch_sub(1, Ordering::SeqCst);
        debug_assert!(previous > 0, "task_done() called more times than put()");
        if previous == 1 {
            self.drained.notify_waiters();
        }
    }

    pub fn unfinished(&self) -> usize {
        self.unfinished.load(Ordering::SeqCst)
    }

    // Waits until every entry put so far has been acknowledged
    pub async fn join(&self) {
        loop {
            let notified = self.drained.notified();
            tokio::pin!(notified);
            // Register before checking so a task_done() in between is not lost
            notified.as_mut().enable();
            if self.unfinished() == 0 {
                return;
            }
            notified.await;
        }
    }
}

impl<T: Send> Default for JoinableQueue<T> {
    fn default() -> Self {
        Self::new()
    }
}

// Calls task_done() when dropped, including during a panic unwind
//
// Every dequeued entry is wrapped in one of these right away, so it is
// acknowledged exactly once whatever happens while processing it.
pub struct TaskDone<T: Send> {
    queue: Arc<JoinableQueue<T>>,
}

impl<T: Send> TaskDone<T> {
    pub fn new(queue: Arc<JoinableQueue<T>>) -> Self {
        Self { queue }
    }
}

impl<T: Send> Drop for TaskDone<T> {
    fn drop(&mut self) {
        self.queue.task_done();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    #[tokio::test]
    async fn test_fifo_order_and_sentinel() {
        let queue = JoinableQueue::new();
        queue.put("a");
        queue.put("b");
        queue.put_stop();
        assert_eq!(queue.get().await, Envelope::Item("a"));
        assert_eq!(queue.get().await, Envelope::Item("b"));
        assert_eq!(queue.get().await, Envelope::Stop);
        assert_eq!(queue.unfinished(), 3);
    }

    #[tokio::test]
    async fn test_join_on_empty_queue_returns() {
        let queue: JoinableQueue<String> = JoinableQueue::new();
        tokio::time::timeout(Duration::from_secs(1), queue.join())
            .await
            .expect("join on an empty queue must not block");
    }

    #[tokio::test]
    async fn test_join_waits_for_task_done() {
        let queue = Arc::new(JoinableQueue::new());
        queue.put(1);
        let item = queue.get().await;
        assert_eq!(item, Envelope::Item(1));

        // Taken but not acknowledged: join must still wait
        let pending = tokio::time::timeout(Duration::from_millis(50), queue.join()).await;
        assert!(pending.is_err());

        let worker = {
            let queue = queue.clone();
            tokio::spawn(async move {
                let _done = TaskDone::new(queue);
                tokio::time::sleep(Duration::from_millis(20)).await;
            })
        };
        tokio::time::timeout(Duration::from_secs(1), queue.join())
            .await
            .expect("join must return after task_done");
        worker.await.unwrap();
        assert_eq!(queue.unfinished(), 0);
    }

    #[tokio::test]
    async fn test_task_done_runs_on_panic() {
        let queue = Arc::new(JoinableQueue::new());
        queue.put(1);
        let _ = queue.get().await;
        let guard = TaskDone::new(queue.clone());
        let handle = tokio::spawn(async move {
            let _done = guard;
            panic!("boom");
        });
        assert!(handle.await.is_err());
        assert_eq!(queue.unfinished(), 0);
    }
}
