use std::sync::Arc;
use std::time::Duration;

use tokio::runtime::Runtime;
use tokio::sync::mpsc::UnboundedSender;

use crate::message::{Message, StoreRequest};
use crate::mongo::store::{DocumentStore, StoreError};

/// Runs store requests off the event loop and posts their completions back.
///
/// Each request gets `deadline`; if it runs out the caller receives the
/// request's failure message and the stray worker's late result is dropped.
pub struct Executor {
    runtime: Runtime,
    store: Arc<dyn DocumentStore>,
    sender: UnboundedSender<Message>,
    deadline: Duration,
}

impl Executor {
    pub fn new(
        runtime: Runtime,
        store: Arc<dyn DocumentStore>,
        sender: UnboundedSender<Message>,
        deadline: Duration,
    ) -> Self {
        Self { runtime, store, sender, deadline }
    }

    pub fn spawn(&self, request: StoreRequest) {
        let store = Arc::clone(&self.store);
        let sender = self.sender.clone();
        let deadline = self.deadline;
        let identity = request.clone();
        log::debug!("spawning {} request", request.label());

        self.runtime.spawn(async move {
            let worker = tokio::task::spawn_blocking(move || request.execute(store.as_ref()));
            let message = match tokio::time::timeout(deadline, worker).await {
                Ok(Ok(message)) => message,
                Ok(Err(join_error)) => identity.fail(StoreError::Join(join_error.to_string())),
                Err(_) => {
                    log::warn!("{} request timed out after {deadline:?}", identity.label());
                    identity.fail(StoreError::Timeout(deadline))
                }
            };

            if sender.send(message).is_err() {
                log::debug!("event loop gone; dropping completion");
            }
        });
    }

    /// Stops without waiting for workers still blocked on the server.
    pub fn shutdown(self) {
        self.runtime.shutdown_background();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mongo::memory::MemoryStore;
    use mongodb::bson::Document;
    use tokio::sync::mpsc;

    struct StalledStore;

    impl DocumentStore for StalledStore {
        fn list_database_names(&self) -> Result<Vec<String>, StoreError> {
            std::thread::sleep(Duration::from_millis(500));
            Ok(Vec::new())
        }
        fn list_collection_names(&self, _: &str) -> Result<Vec<String>, StoreError> {
            Ok(Vec::new())
        }
        fn find(&self, _: &str, _: &str, _: Document, _: u64, _: u64) -> Result<Vec<Document>, StoreError> {
            Ok(Vec::new())
        }
        fn count(&self, _: &str, _: &str, _: Document) -> Result<u64, StoreError> {
            Ok(0)
        }
        fn drop_database(&self, _: &str) -> Result<(), StoreError> {
            Ok(())
        }
        fn drop_collection(&self, _: &str, _: &str) -> Result<(), StoreError> {
            Ok(())
        }
        fn delete_one(&self, _: &str, _: &str, _: Document) -> Result<u64, StoreError> {
            Ok(0)
        }
        fn insert_one(&self, _: &str, _: &str, _: Document) -> Result<(), StoreError> {
            Ok(())
        }
        fn find_one_and_replace(&self, _: &str, _: &str, _: Document, _: Document) -> Result<(), StoreError> {
            Ok(())
        }
    }

    fn runtime() -> Runtime {
        tokio::runtime::Builder::new_multi_thread()
            .worker_threads(1)
            .enable_time()
            .build()
            .expect("runtime builds")
    }

    #[test]
    fn completion_is_posted_back() {
        let (sender, mut receiver) = mpsc::unbounded_channel();
        let store = Arc::new(MemoryStore::new().with_collection("a", "c", vec![]));
        let executor = Executor::new(runtime(), store, sender, Duration::from_secs(5));

        executor.spawn(StoreRequest::Refresh);
        match receiver.blocking_recv() {
            Some(Message::Refreshed(Ok(listing))) => assert_eq!(listing.len(), 1),
            other => panic!("unexpected message: {other:?}"),
        }
    }

    #[test]
    fn slow_request_times_out() {
        let (sender, mut receiver) = mpsc::unbounded_channel();
        let executor =
            Executor::new(runtime(), Arc::new(StalledStore), sender, Duration::from_millis(50));

        executor.spawn(StoreRequest::Refresh);
        match receiver.blocking_recv() {
            Some(Message::Refreshed(Err(StoreError::Timeout(deadline)))) => {
                assert_eq!(deadline, Duration::from_millis(50));
            }
            other => panic!("unexpected message: {other:?}"),
        }
    }
}
