//! Single-producer/single-consumer queue of parameter frames.
//!
//! The queue is the boundary between the frontend (producer) and the
//! renderer (consumer). Push and pop are both non-blocking; an empty pop
//! means "stay on the current frame". Frames are immutable once enqueued.
//! The consumer publishes the user index of the most recently fully rendered
//! frame through a shared atomic so the producer side can report progress
//! without touching renderer state.

use std::sync::atomic::{AtomicI32, Ordering};
use std::sync::Arc;

use crossbeam_channel::{bounded, Receiver, Sender, TrySendError};

use crate::fields::Frame;

/// One entry of the frame queue.
///
/// `frame == None` denotes silence. Durations are in samples; the
/// ms→samples conversion happens at the engine boundary. `fade_samples`
/// never exceeds `min_samples`.
#[derive(Debug, Clone)]
pub struct QueuedFrame {
    pub frame: Option<Frame>,
    pub min_samples: u32,
    pub fade_samples: u32,
    pub user_index: i32,
}

/// Producer half of the frame queue.
pub struct FrameProducer {
    tx: Sender<QueuedFrame>,
    last_index: Arc<AtomicI32>,
}

/// Consumer half of the frame queue.
pub struct FrameConsumer {
    rx: Receiver<QueuedFrame>,
    last_index: Arc<AtomicI32>,
}

/// Creates a queue holding at most `capacity` frames.
pub fn frame_queue(capacity: usize) -> (FrameProducer, FrameConsumer) {
    let (tx, rx) = bounded(capacity.max(1));
    let last_index = Arc::new(AtomicI32::new(-1));
    (
        FrameProducer {
            tx,
            last_index: Arc::clone(&last_index),
        },
        FrameConsumer { rx, last_index },
    )
}

impl FrameProducer {
    /// Enqueues a frame. Returns false when the queue is full or the
    /// consumer is gone; the frame is dropped in that case.
    pub fn push(&self, frame: QueuedFrame) -> bool {
        match self.tx.try_send(frame) {
            Ok(()) => true,
            Err(TrySendError::Full(_)) | Err(TrySendError::Disconnected(_)) => false,
        }
    }

    /// User index of the most recently fully rendered frame, or -1.
    pub fn last_index(&self) -> i32 {
        self.last_index.load(Ordering::Acquire)
    }
}

impl FrameConsumer {
    /// Dequeues the next frame, or `None` when the queue is empty.
    pub fn pop(&self) -> Option<QueuedFrame> {
        self.rx.try_recv().ok()
    }

    /// Publishes `index` as the most recently fully rendered frame.
    pub fn mark_rendered(&self, index: i32) {
        self.last_index.store(index, Ordering::Release);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn entry(index: i32) -> QueuedFrame {
        QueuedFrame {
            frame: None,
            min_samples: 10,
            fade_samples: 0,
            user_index: index,
        }
    }

    #[test]
    fn fifo_order() {
        let (tx, rx) = frame_queue(8);
        for i in 0..5 {
            assert!(tx.push(entry(i)));
        }
        for i in 0..5 {
            assert_eq!(rx.pop().unwrap().user_index, i);
        }
        assert!(rx.pop().is_none());
    }

    #[test]
    fn push_fails_when_full() {
        let (tx, rx) = frame_queue(2);
        assert!(tx.push(entry(0)));
        assert!(tx.push(entry(1)));
        assert!(!tx.push(entry(2)));
        rx.pop().unwrap();
        assert!(tx.push(entry(2)));
    }

    #[test]
    fn last_index_flows_from_consumer_to_producer() {
        let (tx, rx) = frame_queue(2);
        assert_eq!(tx.last_index(), -1);
        rx.mark_rendered(41);
        assert_eq!(tx.last_index(), 41);
    }

    #[test]
    fn works_across_threads() {
        let (tx, rx) = frame_queue(64);
        let producer = std::thread::spawn(move || {
            for i in 0..64 {
                assert!(tx.push(entry(i)));
            }
        });
        producer.join().unwrap();
        let mut seen = Vec::new();
        while let Some(f) = rx.pop() {
            seen.push(f.user_index);
        }
        assert_eq!(seen, (0..64).collect::<Vec<_>>());
    }
}
