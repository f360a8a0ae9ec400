//! Background generation behind a request/response boundary
//!
//! Requests carry a caller-chosen id that is echoed back unchanged. Each
//! request runs on tokio's blocking pool, so several can be in flight and
//! they may complete in any order. Errors and panics become
//! [`WorkerResponse::Failure`] data; nothing is thrown across the boundary.
//!
//! There is no cancellation: dropping a [`PendingPlanet`] simply discards
//! its response when it arrives.

#[cfg(feature = "serde")]
pub mod wire;

use std::collections::HashMap;
use std::panic::{self, AssertUnwindSafe};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Duration;

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};
use tokio::sync::{mpsc, oneshot};

use crate::config::PlanetRequest;
use crate::error::{PlanetError, Result};
use crate::mesh::{MeshBuilder, PlanetMeshResult};

/// Request message sent to the worker
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "camelCase"))]
#[derive(Debug, Clone, PartialEq)]
pub struct WorkerRequest {
    pub request_id: u64,
    pub config: PlanetRequest,
}

/// Response message; exactly one per request
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[cfg_attr(feature = "serde", serde(untagged))]
#[derive(Debug, Clone, PartialEq)]
pub enum WorkerResponse {
    Success {
        #[cfg_attr(feature = "serde", serde(rename = "requestId"))]
        request_id: u64,
        data: PlanetMeshResult,
    },
    Failure {
        #[cfg_attr(feature = "serde", serde(rename = "requestId"))]
        request_id: u64,
        error: String,
    },
}

impl WorkerResponse {
    pub fn request_id(&self) -> u64 {
        match self {
            WorkerResponse::Success { request_id, .. } | WorkerResponse::Failure { request_id, .. } => {
                *request_id
            }
        }
    }

    pub fn is_success(&self) -> bool {
        matches!(self, WorkerResponse::Success { .. })
    }

    /// Mesh on success, `GenerationFailed` carrying the message otherwise
    pub fn into_result(self) -> Result<PlanetMeshResult> {
        match self {
            WorkerResponse::Success { data, .. } => Ok(data),
            WorkerResponse::Failure { error, .. } => Err(PlanetError::GenerationFailed(error)),
        }
    }

    fn failure(request_id: u64, error: impl Into<String>) -> Self {
        WorkerResponse::Failure {
            request_id,
            error: error.into(),
        }
    }
}

/// Serve one request synchronously
///
/// Invalid configurations, generation errors and panics all come back as
/// `Failure`; a failed request never yields a partial mesh.
pub fn handle_request(builder: &MeshBuilder, request: WorkerRequest) -> WorkerResponse {
    let WorkerRequest { request_id, config } = request;

    match panic::catch_unwind(AssertUnwindSafe(|| builder.build(&config))) {
        Ok(Ok(data)) => WorkerResponse::Success { request_id, data },
        Ok(Err(e)) => {
            log::warn!("request {} failed: {}", request_id, e);
            WorkerResponse::failure(request_id, e.to_string())
        }
        Err(payload) => {
            let message = panic_message(payload.as_ref());
            log::warn!("request {} panicked: {}", request_id, message);
            WorkerResponse::failure(request_id, format!("generation panicked: {}", message))
        }
    }
}

fn panic_message(payload: &(dyn std::any::Any + Send)) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        (*s).to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "unknown panic".to_string()
    }
}

type PendingMap = Arc<Mutex<HashMap<u64, oneshot::Sender<WorkerResponse>>>>;

fn lock(pending: &PendingMap) -> MutexGuard<'_, HashMap<u64, oneshot::Sender<WorkerResponse>>> {
    pending.lock().unwrap_or_else(|e| e.into_inner())
}

/// Response future of one submitted request
#[derive(Debug)]
pub struct PendingPlanet {
    request_id: u64,
    rx: oneshot::Receiver<WorkerResponse>,
}

impl PendingPlanet {
    pub fn request_id(&self) -> u64 {
        self.request_id
    }

    /// Wait for the response
    ///
    /// A worker that shut down before answering yields a `Failure`.
    pub async fn wait(self) -> WorkerResponse {
        let request_id = self.request_id;
        self.rx
            .await
            .unwrap_or_else(|_| WorkerResponse::failure(request_id, "worker closed before responding"))
    }

    /// Wait at most `limit`; running out of time counts as a failure
    pub async fn wait_timeout(self, limit: Duration) -> WorkerResponse {
        let request_id = self.request_id;
        match tokio::time::timeout(limit, self.wait()).await {
            Ok(response) => response,
            Err(_) => {
                log::warn!("request {} timed out after {:?}", request_id, limit);
                WorkerResponse::failure(request_id, format!("timed out after {:?}", limit))
            }
        }
    }
}

/// Handle to the background worker
///
/// # Example
///
/// ```rust,no_run
/// use rust_biome_planet::*;
///
/// # async fn run() -> Result<()> {
/// let worker = PlanetWorker::spawn();
/// let request = PlanetRequestBuilder::new().seed(1).build()?;
/// let response = worker.request(request)?.wait().await;
/// let mesh = response.into_result()?;
/// println!("{} vertices", mesh.vertex_count());
/// # Ok(())
/// # }
/// ```
#[derive(Debug)]
pub struct PlanetWorker {
    request_tx: mpsc::UnboundedSender<WorkerRequest>,
    pending: PendingMap,
    next_id: AtomicU64,
}

impl PlanetWorker {
    /// Start the worker on the current tokio runtime
    ///
    /// Panics if called outside a tokio runtime context.
    pub fn spawn() -> Self {
        Self::spawn_with_builder(Arc::new(MeshBuilder::new()))
    }

    /// Start the worker with a shared builder (and its shape cache)
    pub fn spawn_with_builder(builder: Arc<MeshBuilder>) -> Self {
        let (request_tx, request_rx) = mpsc::unbounded_channel::<WorkerRequest>();
        let (response_tx, response_rx) = mpsc::unbounded_channel::<WorkerResponse>();
        let pending: PendingMap = Arc::new(Mutex::new(HashMap::new()));

        tokio::spawn(Self::worker_loop(builder, request_rx, response_tx));
        tokio::spawn(Self::route_responses(Arc::clone(&pending), response_rx));

        Self {
            request_tx,
            pending,
            next_id: AtomicU64::new(1),
        }
    }

    /// Run every incoming request on the blocking pool
    async fn worker_loop(
        builder: Arc<MeshBuilder>,
        mut request_rx: mpsc::UnboundedReceiver<WorkerRequest>,
        response_tx: mpsc::UnboundedSender<WorkerResponse>,
    ) {
        while let Some(request) = request_rx.recv().await {
            let builder = Arc::clone(&builder);
            let response_tx = response_tx.clone();
            let request_id = request.request_id;

            tokio::spawn(async move {
                let task = tokio::task::spawn_blocking(move || handle_request(&builder, request));
                let response = match task.await {
                    Ok(response) => response,
                    Err(e) => WorkerResponse::failure(request_id, format!("generation task failed: {}", e)),
                };
                let _ = response_tx.send(response);
            });
        }
        log::debug!("planet worker request channel closed");
    }

    /// Deliver responses to whoever is waiting on their id
    async fn route_responses(pending: PendingMap, mut response_rx: mpsc::UnboundedReceiver<WorkerResponse>) {
        while let Some(response) = response_rx.recv().await {
            let request_id = response.request_id();
            let waiter = lock(&pending).remove(&request_id);
            match waiter {
                Some(tx) => {
                    if tx.send(response).is_err() {
                        log::debug!("response {} discarded by caller", request_id);
                    }
                }
                None => log::warn!("orphaned response for request {}", request_id),
            }
        }
    }

    /// Submit a request under a caller-chosen id
    ///
    /// # Errors
    ///
    /// Returns the configuration error synchronously for an invalid request,
    /// `Protocol` if the id is already in flight, and `WorkerClosed` if the
    /// worker has stopped.
    pub fn submit(&self, request_id: u64, config: PlanetRequest) -> Result<PendingPlanet> {
        config.validate()?;

        let (tx, rx) = oneshot::channel();
        {
            let mut pending = lock(&self.pending);
            if pending.contains_key(&request_id) {
                return Err(PlanetError::Protocol(format!(
                    "request id {} is already in flight",
                    request_id
                )));
            }
            pending.insert(request_id, tx);
        }

        if self.request_tx.send(WorkerRequest { request_id, config }).is_err() {
            lock(&self.pending).remove(&request_id);
            return Err(PlanetError::WorkerClosed(
                "planet worker is no longer running".into(),
            ));
        }

        log::debug!("submitted request {}", request_id);
        Ok(PendingPlanet { request_id, rx })
    }

    /// Submit with the next id from the worker's own counter
    pub fn request(&self, config: PlanetRequest) -> Result<PendingPlanet> {
        let request_id = self.next_id.fetch_add(1, Ordering::Relaxed);
        self.submit(request_id, config)
    }

    /// Requests submitted but not yet answered
    pub fn pending_count(&self) -> usize {
        lock(&self.pending).len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{PlanetRequestBuilder, ShapeKind};

    fn config(detail: i32) -> PlanetRequest {
        PlanetRequestBuilder::new()
            .seed(3)
            .detail(detail)
            .unwrap()
            .build()
            .unwrap()
    }

    #[test]
    fn test_handle_request_success() {
        let builder = MeshBuilder::new();
        let response = handle_request(
            &builder,
            WorkerRequest {
                request_id: 7,
                config: config(2),
            },
        );
        assert_eq!(response.request_id(), 7);
        assert!(response.is_success());
        assert!(response.into_result().unwrap().is_consistent());
    }

    #[test]
    fn test_negative_detail_is_failure() {
        let builder = MeshBuilder::new();
        let mut bad = config(2);
        bad.detail = -4;
        for _ in 0..3 {
            let response = handle_request(
                &builder,
                WorkerRequest {
                    request_id: 9,
                    config: bad.clone(),
                },
            );
            match response {
                WorkerResponse::Failure { request_id, error } => {
                    assert_eq!(request_id, 9);
                    assert!(error.contains("detail"));
                }
                other => panic!("expected failure, got {:?}", other),
            }
        }
    }

    #[test]
    fn test_oversized_density_is_failure() {
        let mut options = crate::biome::presets::get("beach").unwrap();
        options.vegetation = vec![crate::biome::VegetationItemSpec::new("grass", 1.0e13)];
        let mut config = config(2);
        config.biome = crate::config::BiomeSelection::Custom(Box::new(options));
        assert!(config.validate().unwrap_err().is_config_error());

        let response = handle_request(
            &MeshBuilder::new(),
            WorkerRequest {
                request_id: 11,
                config,
            },
        );
        match response {
            WorkerResponse::Failure { request_id, error } => {
                assert_eq!(request_id, 11);
                assert!(error.contains("density"));
            }
            other => panic!("expected failure, got {:?}", other),
        }
    }

    #[test]
    fn test_panic_message_extraction() {
        let payload: Box<dyn std::any::Any + Send> = Box::new("boom");
        assert_eq!(panic_message(payload.as_ref()), "boom");
        let payload: Box<dyn std::any::Any + Send> = Box::new(String::from("bang"));
        assert_eq!(panic_message(payload.as_ref()), "bang");
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 2)]
    async fn test_worker_round_trip() {
        let worker = PlanetWorker::spawn();
        let pending = worker.submit(41, config(3)).unwrap();
        assert_eq!(pending.request_id(), 41);

        let response = pending.wait().await;
        assert_eq!(response.request_id(), 41);
        assert!(response.is_success());
        assert_eq!(worker.pending_count(), 0);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 2)]
    async fn test_multiple_in_flight_are_correlated() {
        let worker = PlanetWorker::spawn();
        let big = worker.submit(1, config(24)).unwrap();
        let small = worker
            .submit(
                2,
                PlanetRequestBuilder::new()
                    .seed(3)
                    .shape(ShapeKind::Box)
                    .detail(1)
                    .unwrap()
                    .build()
                    .unwrap(),
            )
            .unwrap();

        let (big, small) = tokio::join!(big.wait(), small.wait());
        assert_eq!(big.request_id(), 1);
        assert_eq!(small.request_id(), 2);
        assert!(big.into_result().unwrap().vertex_count() > small.into_result().unwrap().vertex_count());
    }

    #[tokio::test]
    async fn test_invalid_config_rejected_synchronously() {
        let worker = PlanetWorker::spawn();
        let mut bad = config(2);
        bad.detail = -1;
        assert!(worker.submit(5, bad).unwrap_err().is_config_error());
        assert_eq!(worker.pending_count(), 0);
    }

    #[tokio::test]
    async fn test_duplicate_id_rejected() {
        let worker = PlanetWorker::spawn();
        let _first = worker.submit(5, config(1)).unwrap();
        assert!(matches!(
            worker.submit(5, config(1)),
            Err(PlanetError::Protocol(_))
        ));
    }

    #[tokio::test]
    async fn test_dropped_pending_is_discarded() {
        let worker = PlanetWorker::spawn();
        drop(worker.request(config(1)).unwrap());
        let response = worker.request(config(1)).unwrap().wait().await;
        assert!(response.is_success());
    }

    #[tokio::test]
    async fn test_wait_timeout() {
        let worker = PlanetWorker::spawn();
        let response = worker
            .request(config(32))
            .unwrap()
            .wait_timeout(Duration::from_nanos(1))
            .await;
        assert!(!response.is_success());
    }
}
