//! Background worker for one remote generation call.

use crate::ai::client::ChatSession;
use crate::dispatch::channel::{OutcomeSender, WorkerEvent};
use crate::dispatch::workers::WorkerSet;
use crate::CompanionError;
use std::sync::Arc;
use tracing::{debug, warn};
use uuid::Uuid;

/// Spawn a generation worker for one user message.
///
/// The worker locks the shared session for the send/receive round trip
/// and pushes exactly one event: the reply text, or a formatted error
/// notice. Faults never cross the worker boundary.
pub fn spawn_generation(
    workers: &WorkerSet,
    session: Arc<ChatSession>,
    text: String,
    outcomes: OutcomeSender,
) {
    let request_id = Uuid::new_v4();
    let worker_outcomes = outcomes.clone();
    let spawned = workers.spawn("ai-worker", move || {
        debug!(%request_id, chars = text.len(), "generation started");
        match session.send(&text) {
            Ok(reply) => {
                debug!(%request_id, chars = reply.len(), "generation complete");
                worker_outcomes.push(WorkerEvent::Reply(reply));
            }
            Err(e) => {
                warn!(%request_id, error = %e, "generation failed");
                worker_outcomes.push(WorkerEvent::Notice(format!(
                    "Error generating response: {}",
                    describe(&e)
                )));
            }
        }
    });

    // A refused thread still answers the request, as an error notice.
    if !spawned {
        outcomes.push(WorkerEvent::Notice(
            "Error generating response: could not start worker thread".to_string(),
        ));
    }
}

/// The raw cause without the error-enum prefix, for user-facing text.
fn describe(err: &CompanionError) -> String {
    match err {
        CompanionError::AiError(msg) => msg.clone(),
        other => other.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ai::client::{AiClient, ChatMessage};
    use crate::dispatch::channel::ResponseQueue;
    use crate::Result;
    use std::time::Duration;

    struct ScriptedClient {
        reply: Result<&'static str>,
        delay: Duration,
    }

    impl AiClient for ScriptedClient {
        fn generate(&self, _history: &[ChatMessage]) -> Result<String> {
            std::thread::sleep(self.delay);
            self.reply.clone().map(str::to_string)
        }
    }

    fn wait_for_event(queue: &ResponseQueue) -> WorkerEvent {
        queue
            .receiver()
            .recv_timeout(Duration::from_secs(5))
            .expect("worker should push exactly one event")
    }

    #[test]
    fn test_success_pushes_reply() {
        let queue = ResponseQueue::new();
        let workers = WorkerSet::new();
        let session = Arc::new(ChatSession::new(Box::new(ScriptedClient {
            reply: Ok("4"),
            delay: Duration::ZERO,
        })));

        spawn_generation(&workers, session, "2+2".to_string(), queue.sender());

        assert_eq!(wait_for_event(&queue), WorkerEvent::Reply("4".to_string()));
    }

    #[test]
    fn test_fault_becomes_error_notice() {
        let queue = ResponseQueue::new();
        let workers = WorkerSet::new();
        let session = Arc::new(ChatSession::new(Box::new(ScriptedClient {
            reply: Err(CompanionError::AiError("quota exceeded".to_string())),
            delay: Duration::ZERO,
        })));

        spawn_generation(&workers, session, "2+2".to_string(), queue.sender());

        assert_eq!(
            wait_for_event(&queue),
            WorkerEvent::Notice("Error generating response: quota exceeded".to_string())
        );
    }

    #[test]
    fn test_refused_spawn_still_answers_with_notice() {
        let queue = ResponseQueue::new();
        let workers = WorkerSet::new();
        workers.refuse_spawns();
        let session = Arc::new(ChatSession::new(Box::new(ScriptedClient {
            reply: Ok("4"),
            delay: Duration::ZERO,
        })));

        spawn_generation(&workers, session, "2+2".to_string(), queue.sender());

        assert_eq!(
            wait_for_event(&queue),
            WorkerEvent::Notice(
                "Error generating response: could not start worker thread".to_string()
            )
        );
        assert_eq!(queue.try_pop(), None);
    }

    #[test]
    fn test_concurrent_requests_all_complete() {
        let queue = ResponseQueue::new();
        let workers = WorkerSet::new();
        let session = Arc::new(ChatSession::new(Box::new(ScriptedClient {
            reply: Ok("answer"),
            delay: Duration::from_millis(10),
        })));

        let n = 8;
        for i in 0..n {
            spawn_generation(
                &workers,
                Arc::clone(&session),
                format!("question {i}"),
                queue.sender(),
            );
        }

        for _ in 0..n {
            match wait_for_event(&queue) {
                WorkerEvent::Reply(text) => assert!(!text.is_empty()),
                other => panic!("unexpected event: {other:?}"),
            }
        }
        // Every exchange landed in the session history despite concurrency.
        assert_eq!(session.history_len(), n * 2);
    }
}
