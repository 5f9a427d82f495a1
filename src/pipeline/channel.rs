//! Bounded stage channel: blocking put/take over `crossbeam_channel::bounded`, a typed
//! end-of-stream marker, and an optional drain barrier.

use anyhow::Result;
use crossbeam_channel::{Receiver, RecvTimeoutError, Sender, bounded};
use std::sync::{Arc, Condvar, Mutex};
use std::time::Duration;

/// Value carried by a stage channel. `EndOfStream` is disjoint from every item.
#[derive(Debug)]
pub enum Message<T> {
    Item(T),
    EndOfStream,
}

impl<T> Message<T> {
    pub fn is_end_of_stream(&self) -> bool {
        matches!(self, Message::EndOfStream)
    }
}

/// Count of values put but not yet acknowledged with [`StageReceiver::task_done`].
#[derive(Default)]
struct DrainState {
    pending: Mutex<usize>,
    drained: Condvar,
}

impl DrainState {
    fn add(&self) {
        *self.pending.lock().unwrap() += 1;
    }

    fn done(&self) {
        let mut pending = self.pending.lock().unwrap();
        *pending = pending.saturating_sub(1);
        if *pending == 0 {
            self.drained.notify_all();
        }
    }

    fn wait(&self) {
        let mut pending = self.pending.lock().unwrap();
        while *pending > 0 {
            pending = self.drained.wait(pending).unwrap();
        }
    }

    fn pending(&self) -> usize {
        *self.pending.lock().unwrap()
    }
}

/// Producer end. Cloneable; the channel disconnects when every sender is dropped.
pub struct StageSender<T> {
    tx: Sender<Message<T>>,
    drain: Arc<DrainState>,
    name: Arc<str>,
}

impl<T> Clone for StageSender<T> {
    fn clone(&self) -> Self {
        Self {
            tx: self.tx.clone(),
            drain: Arc::clone(&self.drain),
            name: Arc::clone(&self.name),
        }
    }
}

/// Consumer end. Cloneable, but each value is delivered to exactly one receiver.
pub struct StageReceiver<T> {
    rx: Receiver<Message<T>>,
    drain: Arc<DrainState>,
    name: Arc<str>,
}

impl<T> Clone for StageReceiver<T> {
    fn clone(&self) -> Self {
        Self {
            rx: self.rx.clone(),
            drain: Arc::clone(&self.drain),
            name: Arc::clone(&self.name),
        }
    }
}

/// Create a named channel holding at most `capacity` values (`capacity` must be ≥ 1).
pub fn stage_channel<T>(name: &str, capacity: usize) -> (StageSender<T>, StageReceiver<T>) {
    let (tx, rx) = bounded::<Message<T>>(capacity.max(1));
    let drain = Arc::new(DrainState::default());
    let name: Arc<str> = Arc::from(name);
    (
        StageSender {
            tx,
            drain: Arc::clone(&drain),
            name: Arc::clone(&name),
        },
        StageReceiver { rx, drain, name },
    )
}

impl<T> StageSender<T> {
    fn send(&self, msg: Message<T>) -> Result<()> {
        self.drain.add();
        if self.tx.send(msg).is_err() {
            self.drain.done();
            anyhow::bail!("{}: every consumer is gone", self.name);
        }
        Ok(())
    }

    /// Enqueue one item, blocking while the channel is full.
    pub fn put(&self, item: T) -> Result<()> {
        self.send(Message::Item(item))
    }

    /// Enqueue one end-of-stream marker, blocking while the channel is full.
    pub fn close(&self) -> Result<()> {
        self.send(Message::EndOfStream)
    }

    /// Block until every value put so far has been taken and acknowledged.
    pub fn wait_drained(&self) {
        self.drain.wait();
    }

    pub fn len(&self) -> usize {
        self.tx.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tx.is_empty()
    }

    pub fn capacity(&self) -> usize {
        self.tx.capacity().unwrap_or(0)
    }

    pub fn name(&self) -> &str {
        &self.name
    }
}

impl<T> StageReceiver<T> {
    fn disconnected(&self) -> anyhow::Error {
        anyhow::anyhow!("{}: producer gone before end-of-stream", self.name)
    }

    /// Take the oldest value, blocking while empty. Errors if every sender is gone.
    pub fn take(&self) -> Result<Message<T>> {
        self.rx.recv().map_err(|_| self.disconnected())
    }

    /// As [`take`](Self::take), giving up after `timeout`.
    pub fn take_timeout(&self, timeout: Duration) -> Result<Message<T>> {
        match self.rx.recv_timeout(timeout) {
            Ok(msg) => Ok(msg),
            Err(RecvTimeoutError::Timeout) => {
                anyhow::bail!("{}: nothing received within {:?}", self.name, timeout)
            }
            Err(RecvTimeoutError::Disconnected) => Err(self.disconnected()),
        }
    }

    /// Acknowledge one taken value (markers included).
    pub fn task_done(&self) {
        self.drain.done();
    }

    /// Block until every value put so far has been taken and acknowledged.
    pub fn wait_drained(&self) {
        self.drain.wait();
    }

    /// Values put but not yet acknowledged (queued plus in flight).
    pub fn pending(&self) -> usize {
        self.drain.pending()
    }

    pub fn len(&self) -> usize {
        self.rx.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rx.is_empty()
    }

    pub fn capacity(&self) -> usize {
        self.rx.capacity().unwrap_or(0)
    }

    pub fn name(&self) -> &str {
        &self.name
    }
}
