//! Bounded dispatch: runs a sink on its own thread behind a fixed-size queue.

use std::{
    io,
    sync::{
        Arc, Mutex, MutexGuard, PoisonError,
        mpsc::{self, Receiver, SyncSender, TrySendError},
    },
    thread::{self, JoinHandle},
};

use log::{debug, error, warn};

use super::{ChangeEvent, ChangeSink};

/// What happens when the queue is full.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Overflow {
    /// The notifying thread waits for room. Nothing is lost.
    Backpressure,

    /// The oldest queued event is discarded and counted to make room, so
    /// the newest event is always delivered.
    DropOldest,
}

/// A sink that forwards events to another sink running on a worker thread.
///
/// Dropping the queue closes it; the worker drains whatever is still queued
/// and is joined before the drop returns.
///
/// Under `DropOldest` the receiving end is shared with the worker so a full
/// queue can be popped from the front. Under `Backpressure` only the worker
/// holds it, so a dead worker disconnects the channel instead of blocking
/// the sender.
pub struct QueuedSink {
    name: String,
    tx: Option<SyncSender<ChangeEvent>>,
    rx: Option<Arc<Mutex<Receiver<ChangeEvent>>>>,
    worker: Option<JoinHandle<()>>,
    overflow: Overflow,
    dropped: u64,
}

impl QueuedSink {
    /// Spawns the worker thread. A capacity of zero is treated as one.
    pub fn spawn(
        name: &str,
        mut sink: impl ChangeSink + 'static,
        capacity: usize,
        overflow: Overflow,
    ) -> io::Result<Self> {
        let (tx, rx) = mpsc::sync_channel::<ChangeEvent>(capacity.max(1));
        let worker_rx = Arc::new(Mutex::new(rx));
        let rx = (overflow == Overflow::DropOldest).then(|| Arc::clone(&worker_rx));
        let worker = thread::Builder::new()
            .name(format!("magpi-sink-{name}"))
            .spawn(move || {
                loop {
                    // The guard is released before the sink runs.
                    let next = lock(&worker_rx).recv();
                    let Ok(event) = next else {
                        break;
                    };
                    sink.notify(&event);
                }
            })?;
        debug!("sink {name} started (capacity {capacity}, {overflow:?})");
        Ok(Self {
            name: name.to_string(),
            tx: Some(tx),
            rx,
            worker: Some(worker),
            overflow,
            dropped: 0,
        })
    }
}

impl ChangeSink for QueuedSink {
    fn notify(&mut self, event: &ChangeEvent) {
        let Some(tx) = &self.tx else {
            return;
        };
        match self.overflow {
            Overflow::Backpressure => {
                if tx.send(event.clone()).is_err() {
                    warn!("sink {} worker has exited; event lost", self.name);
                }
            }
            Overflow::DropOldest => {
                let mut pending = event.clone();
                loop {
                    match tx.try_send(pending) {
                        Ok(()) => break,
                        Err(TrySendError::Full(back)) => {
                            pending = back;
                            // The worker may have taken one in the meantime;
                            // either way there is room on the next try.
                            if let Some(rx) = &self.rx
                                && lock(rx).try_recv().is_ok()
                            {
                                self.dropped += 1;
                                warn!(
                                    "sink {} queue full; dropped oldest event ({} so far)",
                                    self.name, self.dropped
                                );
                            }
                        }
                        Err(TrySendError::Disconnected(_)) => {
                            warn!("sink {} worker has exited; event lost", self.name);
                            break;
                        }
                    }
                }
            }
        }
    }
}

fn lock(rx: &Mutex<Receiver<ChangeEvent>>) -> MutexGuard<'_, Receiver<ChangeEvent>> {
    rx.lock().unwrap_or_else(PoisonError::into_inner)
}

impl Drop for QueuedSink {
    fn drop(&mut self) {
        // Closing the sender ends the worker's receive loop once drained.
        self.tx.take();
        if let Some(handle) = self.worker.take()
            && let Err(err) = handle.join()
        {
            error!("sink {} worker panicked: {err:?}", self.name);
        }
        if self.dropped > 0 {
            warn!("sink {} dropped {} event(s) in total", self.name, self.dropped);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    use std::sync::{Arc, Barrier};

    use crate::model::Thresholds;
    use crate::sink::testing::Recorder;

    fn event(n: f64) -> ChangeEvent {
        ChangeEvent::ThresholdsChanged(Thresholds::new(n, n))
    }

    /// Blocks on its first event until the test releases it.
    struct Gate {
        barrier: Arc<Barrier>,
        opened: bool,
        inner: Recorder,
    }

    impl ChangeSink for Gate {
        fn notify(&mut self, event: &ChangeEvent) {
            if !self.opened {
                self.barrier.wait();
                self.opened = true;
            }
            self.inner.notify(event);
        }
    }

    #[test]
    fn backpressure_delivers_everything_in_order() {
        let recorder = Recorder::default();
        let mut queue =
            QueuedSink::spawn("test", recorder.clone(), 2, Overflow::Backpressure).unwrap();

        for n in 0..50 {
            queue.notify(&event(f64::from(n)));
        }
        drop(queue);

        let events = recorder.events();
        assert_eq!(events.len(), 50);
        assert_eq!(events[0], event(0.0));
        assert_eq!(events[49], event(49.0));
    }

    #[test]
    fn drop_oldest_always_delivers_the_newest_event() {
        let recorder = Recorder::default();
        let barrier = Arc::new(Barrier::new(2));
        let gate = Gate {
            barrier: Arc::clone(&barrier),
            opened: false,
            inner: recorder.clone(),
        };
        let mut queue = QueuedSink::spawn("test", gate, 1, Overflow::DropOldest).unwrap();

        // The first event is taken by the worker, which then parks on the gate.
        queue.notify(&event(0.0));
        // Once the worker has dequeued it, the queue accepts one more.
        while queue.tx.as_ref().unwrap().try_send(event(-1.0)).is_err() {
            thread::yield_now();
        }
        // Queue is full; each notify evicts whatever is queued.
        queue.notify(&event(1.0));
        queue.notify(&event(2.0));
        assert_eq!(queue.dropped, 2);

        barrier.wait();
        drop(queue);

        let events = recorder.events();
        assert_eq!(events, vec![event(0.0), event(2.0)]);
    }
}
