//! Incremental result sinks.
//!
//! The engine calls [`IncrementalSink::on_chunk_done`] once per finished
//! group with the cumulative output so far. Sinks must return as soon as the
//! notification is queued; they are called from engine tasks and must never
//! hold them up.
//!
//! * [`ChannelSink`] — pushes into a `tokio::sync::mpsc` unbounded channel.
//! * [`CallbackSink`] — runs a user callback on a dedicated thread, in order.
//!
//! A write may carry a [`DeliveryGate`]. Sinks that queue (like
//! [`CallbackSink`]) consult the gate when the write is finally delivered,
//! not when it is queued.

use std::sync::mpsc as std_mpsc;
use std::sync::Arc;

use tokio::sync::mpsc;

/// Decides, at delivery time, whether a write still goes out.
pub trait DeliveryGate: Send + Sync {
    /// Run `deliver` if the write is still wanted. The decision and the
    /// delivery must not be separated by a state change. Returns whether
    /// `deliver` ran.
    fn pass(&self, deliver: &mut dyn FnMut()) -> bool;
}

/// Receives growing partial output.
pub trait IncrementalSink: Send + Sync {
    /// `partial` is the joined output of every group completed so far.
    fn on_chunk_done(&self, partial: &str);

    /// Like [`on_chunk_done`](Self::on_chunk_done), but only delivered while
    /// `gate` lets it through.
    fn on_gated_chunk_done(&self, partial: &str, gate: Arc<dyn DeliveryGate>) {
        gate.pass(&mut || self.on_chunk_done(partial));
    }
}

// ---------------------------------------------------------------------------
// ChannelSink
// ---------------------------------------------------------------------------

/// Forwards partial results into an unbounded channel.
pub struct ChannelSink {
    tx: mpsc::UnboundedSender<String>,
}

impl ChannelSink {
    /// Create a sink and the receiving end of its channel.
    pub fn new() -> (Self, mpsc::UnboundedReceiver<String>) {
        let (tx, rx) = mpsc::unbounded_channel();
        (Self { tx }, rx)
    }
}

impl IncrementalSink for ChannelSink {
    fn on_chunk_done(&self, partial: &str) {
        if self.tx.send(partial.to_string()).is_err() {
            log::trace!("sink: receiver dropped, discarding partial result");
        }
    }
}

// ---------------------------------------------------------------------------
// CallbackSink
// ---------------------------------------------------------------------------

enum Message {
    Partial {
        text: String,
        gate: Option<Arc<dyn DeliveryGate>>,
    },
    Flush(std_mpsc::Sender<()>),
}

/// Delivers partial results to a callback on its own thread.
///
/// Notifications are delivered in the order they were produced. The thread
/// exits once the sink is dropped and the queue is drained. Gated writes
/// are checked on the callback thread right before the callback runs, and
/// the callback runs inside the gate; it must not call back into whatever
/// owns the gate (e.g. start a new session).
pub struct CallbackSink {
    tx: std_mpsc::Sender<Message>,
}

impl CallbackSink {
    pub fn spawn<F>(callback: F) -> std::io::Result<Self>
    where
        F: Fn(String) + Send + 'static,
    {
        let (tx, rx) = std_mpsc::channel::<Message>();
        std::thread::Builder::new()
            .name("partial-results".into())
            .spawn(move || {
                while let Ok(message) = rx.recv() {
                    match message {
                        Message::Partial { text, gate: None } => callback(text),
                        Message::Partial {
                            text,
                            gate: Some(gate),
                        } => {
                            let mut text = Some(text);
                            gate.pass(&mut || {
                                if let Some(text) = text.take() {
                                    callback(text);
                                }
                            });
                        }
                        Message::Flush(ack) => {
                            let _ = ack.send(());
                        }
                    }
                }
            })?;
        Ok(Self { tx })
    }

    /// Block until every write queued before this call has been handled.
    pub fn flush(&self) {
        let (ack_tx, ack_rx) = std_mpsc::channel();
        if self.tx.send(Message::Flush(ack_tx)).is_ok() {
            let _ = ack_rx.recv();
        }
    }

    fn enqueue(&self, text: &str, gate: Option<Arc<dyn DeliveryGate>>) {
        let message = Message::Partial {
            text: text.to_string(),
            gate,
        };
        if self.tx.send(message).is_err() {
            log::trace!("sink: callback thread gone, discarding partial result");
        }
    }
}

impl IncrementalSink for CallbackSink {
    fn on_chunk_done(&self, partial: &str) {
        self.enqueue(partial, None);
    }

    fn on_gated_chunk_done(&self, partial: &str, gate: Arc<dyn DeliveryGate>) {
        self.enqueue(partial, Some(gate));
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::{Arc, Mutex};
    use std::time::Duration;

    #[tokio::test]
    async fn channel_sink_delivers_in_order() {
        let (sink, mut rx) = ChannelSink::new();
        sink.on_chunk_done("a");
        sink.on_chunk_done("a b");
        drop(sink);

        assert_eq!(rx.recv().await.as_deref(), Some("a"));
        assert_eq!(rx.recv().await.as_deref(), Some("a b"));
        assert_eq!(rx.recv().await, None);
    }

    #[test]
    fn channel_sink_survives_dropped_receiver() {
        let (sink, rx) = ChannelSink::new();
        drop(rx);
        sink.on_chunk_done("ignored");
    }

    #[test]
    fn callback_sink_does_not_block_on_slow_callback() {
        let seen = Arc::new(Mutex::new(Vec::new()));
        let seen_cb = Arc::clone(&seen);
        let (done_tx, done_rx) = std_mpsc::channel();

        let sink = CallbackSink::spawn(move |partial| {
            std::thread::sleep(Duration::from_millis(20));
            seen_cb.lock().unwrap().push(partial);
            let _ = done_tx.send(());
        })
        .expect("spawn");

        let started = std::time::Instant::now();
        for i in 0..5 {
            sink.on_chunk_done(&format!("p{i}"));
        }
        assert!(started.elapsed() < Duration::from_millis(20));

        for _ in 0..5 {
            done_rx.recv_timeout(Duration::from_secs(2)).expect("callback ran");
        }
        assert_eq!(*seen.lock().unwrap(), vec!["p0", "p1", "p2", "p3", "p4"]);
    }

    #[test]
    fn flush_waits_for_queued_partials() {
        let seen = Arc::new(Mutex::new(Vec::new()));
        let seen_cb = Arc::clone(&seen);
        let sink = CallbackSink::spawn(move |partial| {
            std::thread::sleep(Duration::from_millis(10));
            seen_cb.lock().unwrap().push(partial);
        })
        .expect("spawn");

        sink.on_chunk_done("a");
        sink.on_chunk_done("a b");
        sink.on_chunk_done("a b c");
        sink.flush();

        assert_eq!(*seen.lock().unwrap(), vec!["a", "a b", "a b c"]);
    }

    struct Closed;

    impl DeliveryGate for Closed {
        fn pass(&self, _deliver: &mut dyn FnMut()) -> bool {
            false
        }
    }

    #[test]
    fn closed_gate_blocks_callback_delivery() {
        let seen = Arc::new(Mutex::new(Vec::new()));
        let seen_cb = Arc::clone(&seen);
        let sink = CallbackSink::spawn(move |partial| seen_cb.lock().unwrap().push(partial))
            .expect("spawn");

        sink.on_gated_chunk_done("blocked", Arc::new(Closed));
        sink.on_chunk_done("open");
        sink.flush();

        assert_eq!(*seen.lock().unwrap(), vec!["open"]);
    }

    #[test]
    fn sinks_are_object_safe() {
        let (sink, _rx) = ChannelSink::new();
        let _: Arc<dyn IncrementalSink> = Arc::new(sink);
    }
}
