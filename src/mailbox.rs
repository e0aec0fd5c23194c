//! Drain-on-read notification mailbox.
//!
//! Components working asynchronously (the job worker, the media cleaner)
//! report outcomes here; polling consumers take the whole buffer at once.
//! Delivery is at-most-once: a drained message is gone.

use std::collections::VecDeque;
use std::sync::Mutex;

use tracing::warn;

/// Upper bound on buffered messages. With no consumer polling, sustained job
/// failures would otherwise grow the buffer forever; past the cap the oldest
/// message is dropped, which at-most-once delivery already tolerates.
const MAX_PENDING_MESSAGES: usize = 500;

/// A message waiting to be picked up by the next consumer poll.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PendingMessage {
    pub text: String,
    pub is_error: bool,
}

/// FIFO mailbox safe to publish to from the worker thread while request
/// threads drain it.
#[derive(Default)]
pub struct Mailbox {
    messages: Mutex<VecDeque<PendingMessage>>,
}

impl Mailbox {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a message. Never blocks on I/O; drops the oldest entry past
    /// the cap.
    pub fn publish(&self, text: impl Into<String>, is_error: bool) {
        let message = PendingMessage {
            text: text.into(),
            is_error,
        };
        let mut messages = self.messages.lock().unwrap_or_else(|e| e.into_inner());
        if messages.len() >= MAX_PENDING_MESSAGES {
            messages.pop_front();
            warn!(
                "Mailbox full ({} messages), dropping oldest",
                MAX_PENDING_MESSAGES
            );
        }
        messages.push_back(message);
    }

    /// Atomically take every buffered message, oldest first. An empty mailbox
    /// yields an empty vec.
    pub fn drain(&self) -> Vec<PendingMessage> {
        let mut messages = self.messages.lock().unwrap_or_else(|e| e.into_inner());
        messages.drain(..).collect()
    }

    pub fn len(&self) -> usize {
        self.messages.lock().unwrap_or_else(|e| e.into_inner()).len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_drain_preserves_publish_order() {
        let mailbox = Mailbox::new();
        mailbox.publish("m1", false);
        mailbox.publish("m2", true);

        let drained = mailbox.drain();
        assert_eq!(drained.len(), 2);
        assert_eq!(drained[0].text, "m1");
        assert!(!drained[0].is_error);
        assert_eq!(drained[1].text, "m2");
        assert!(drained[1].is_error);
    }

    #[test]
    fn test_second_drain_is_empty() {
        let mailbox = Mailbox::new();
        mailbox.publish("m1", false);
        assert_eq!(mailbox.drain().len(), 1);
        assert!(mailbox.drain().is_empty());
    }

    #[test]
    fn test_cap_drops_oldest() {
        let mailbox = Mailbox::new();
        for i in 0..MAX_PENDING_MESSAGES + 3 {
            mailbox.publish(format!("m{i}"), false);
        }
        let drained = mailbox.drain();
        assert_eq!(drained.len(), MAX_PENDING_MESSAGES);
        assert_eq!(drained[0].text, "m3");
    }

    #[test]
    fn test_concurrent_publish_and_drain_loses_nothing() {
        use std::sync::Arc;

        let mailbox = Arc::new(Mailbox::new());
        let publisher = {
            let mailbox = mailbox.clone();
            std::thread::spawn(move || {
                for i in 0..200 {
                    mailbox.publish(format!("m{i}"), false);
                }
            })
        };

        let mut collected = Vec::new();
        while collected.len() < 200 {
            collected.extend(mailbox.drain());
            if publisher.is_finished() && mailbox.is_empty() {
                collected.extend(mailbox.drain());
                break;
            }
        }
        publisher.join().unwrap();
        collected.extend(mailbox.drain());
        assert_eq!(collected.len(), 200);
    }
}
