//! One-at-a-time activation.
//!
//! The platform rejects overlapping PublishXml calls, so every activation in
//! the process goes through a single consumer task. Jobs run in the order they
//! reach the channel; a failed job settles its own caller and the next job
//! starts regardless.

use tokio::sync::{mpsc, oneshot};

use webpub_remote::{RemoteError, ResourceId, WebApiClient};

use crate::error::SyncError;

const QUEUE_CAPACITY: usize = 64;

struct ActivationJob {
    client: WebApiClient,
    ids: Vec<ResourceId>,
    respond_to: oneshot::Sender<Result<(), RemoteError>>,
}

/// Handle to the activation worker. Clones share the same worker.
#[derive(Clone)]
pub struct ActivationQueue {
    jobs: mpsc::Sender<ActivationJob>,
}

impl ActivationQueue {
    /// Start the worker task. Must be called from inside a Tokio runtime.
    ///
    /// The worker exits once every handle has been dropped.
    pub fn spawn() -> Self {
        let (jobs, rx) = mpsc::channel::<ActivationJob>(QUEUE_CAPACITY);
        tokio::spawn(activation_worker(rx));
        Self { jobs }
    }

    /// Activate `ids` once every earlier job has settled.
    pub async fn activate(
        &self,
        client: &WebApiClient,
        ids: Vec<ResourceId>,
    ) -> Result<(), SyncError> {
        let (tx, rx) = oneshot::channel();
        self.jobs
            .send(ActivationJob {
                client: client.clone(),
                ids,
                respond_to: tx,
            })
            .await
            .map_err(|_| SyncError::ChannelClosed("activation queue"))?;

        let result = rx
            .await
            .map_err(|_| SyncError::ChannelClosed("activation response"))?;
        result.map_err(SyncError::from)
    }
}

async fn activation_worker(mut rx: mpsc::Receiver<ActivationJob>) {
    while let Some(job) = rx.recv().await {
        let result = job.client.activate(&job.ids).await;
        if let Err(err) = &result {
            tracing::debug!(error = %err, count = job.ids.len(), "activation failed");
        }
        // Caller may have gone away; the next job runs either way.
        let _ = job.respond_to.send(result);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;
    use std::time::Duration;

    use async_trait::async_trait;
    use webpub_remote::{ApiRequest, ApiResponse, Transport};

    #[derive(Default)]
    struct SlowPublish {
        in_flight: AtomicUsize,
        max_in_flight: AtomicUsize,
        calls: AtomicUsize,
    }

    #[async_trait]
    impl Transport for SlowPublish {
        async fn send(&self, _request: ApiRequest) -> Result<ApiResponse, RemoteError> {
            let call = self.calls.fetch_add(1, Ordering::SeqCst);
            let now = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
            self.max_in_flight.fetch_max(now, Ordering::SeqCst);
            tokio::time::sleep(Duration::from_millis(20)).await;
            self.in_flight.fetch_sub(1, Ordering::SeqCst);
            if call == 0 {
                return Err(webpub_remote::api_error(
                    500,
                    &Default::default(),
                    r#"{"error":{"code":"0x1","message":"busy"}}"#.to_string(),
                ));
            }
            Ok(ApiResponse {
                status: 204,
                headers: Default::default(),
                body: None,
            })
        }
    }

    fn id(n: u32) -> ResourceId {
        ResourceId(format!("00000000-0000-0000-0000-{n:012x}"))
    }

    #[tokio::test]
    async fn activations_never_overlap_and_failures_do_not_block() {
        let transport = Arc::new(SlowPublish::default());
        let client = WebApiClient::new(transport.clone());
        let queue = ActivationQueue::spawn();

        let mut handles = Vec::new();
        for n in 0..4 {
            let queue = queue.clone();
            let client = client.clone();
            handles.push(tokio::spawn(async move {
                queue.activate(&client, vec![id(n)]).await
            }));
        }
        let mut failures = 0;
        for handle in handles {
            if handle.await.expect("task joins").is_err() {
                failures += 1;
            }
        }

        assert_eq!(failures, 1, "only the first call fails");
        assert_eq!(transport.calls.load(Ordering::SeqCst), 4);
        assert_eq!(transport.max_in_flight.load(Ordering::SeqCst), 1);
    }
}
