#![allow(dead_code)]

use std::convert::Infallible;
use std::net::SocketAddr;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use hyper::header::CONTENT_TYPE;
use hyper::service::{make_service_fn, service_fn};
use hyper::{Body, Request, Response, Server};
use tokio::sync::mpsc;

use webhook_dispatcher::dispatch::{DispatchRule, DispatchTable};
use webhook_dispatcher::error::StorageError;
use webhook_dispatcher::forward::Forwarder;
use webhook_dispatcher::metrics::Metrics;
use webhook_dispatcher::server::AppState;
use webhook_dispatcher::storage::Storage;

#[derive(Debug, Clone, PartialEq)]
pub struct Stored {
    pub key: String,
    pub path: String,
    pub body: Vec<u8>,
}

/// In-memory backend that records calls and can refuse writes.
#[derive(Default)]
pub struct MemoryStorage {
    pub fail_store: bool,
    pub stored: Mutex<Vec<Stored>>,
    pub store_calls: AtomicUsize,
    pub close_calls: AtomicUsize,
}

impl MemoryStorage {
    pub fn failing() -> Arc<MemoryStorage> {
        Arc::new(MemoryStorage { fail_store: true, ..MemoryStorage::default() })
    }

    pub fn stored(&self) -> Vec<Stored> {
        self.stored.lock().unwrap().clone()
    }

    pub fn store_calls(&self) -> usize {
        self.store_calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl Storage for MemoryStorage {
    async fn store(&self, key: &str, path: &str, body: &[u8]) -> Result<(), StorageError> {
        self.store_calls.fetch_add(1, Ordering::SeqCst);
        if self.fail_store {
            return Err(StorageError::Other("connection refused".into()));
        }
        self.stored.lock().unwrap().push(Stored {
            key: key.to_owned(),
            path: path.to_owned(),
            body: body.to_vec(),
        });
        Ok(())
    }

    async fn count(&self) -> Result<i64, StorageError> {
        Ok(self.stored.lock().unwrap().len() as i64)
    }

    async fn close(&self) -> Result<(), StorageError> {
        self.close_calls.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }
}

pub fn rule(path: &str, targets: &[&str]) -> DispatchRule {
    DispatchRule {
        path: path.to_owned(),
        targets: targets.iter().map(|t| t.to_string()).collect(),
    }
}

pub fn state(storage: Arc<dyn Storage>, rules: Vec<DispatchRule>) -> Arc<AppState> {
    Arc::new(AppState {
        storage,
        dispatch: DispatchTable::new(rules),
        forwarder: Forwarder::new(Duration::from_secs(2)),
        metrics: Arc::new(Metrics::default()),
        log_requests: true,
    })
}

/// What a target server saw.
#[derive(Debug)]
pub struct Received {
    pub content_type: Option<String>,
    pub body: Vec<u8>,
}

/// Local forwarding target. Every request is reported on the channel as soon
/// as its body is read; the answer is then delayed by `delay`.
pub async fn spawn_target(delay: Duration) -> (String, mpsc::UnboundedReceiver<Received>) {
    let (tx, rx) = mpsc::unbounded_channel();
    let service = make_service_fn(move |_| {
        let tx = tx.clone();
        async move {
            Ok::<_, Infallible>(service_fn(move |req: Request<Body>| {
                let tx = tx.clone();
                async move {
                    let content_type = req
                        .headers()
                        .get(CONTENT_TYPE)
                        .map(|v| v.to_str().unwrap().to_owned());
                    let body = hyper::body::to_bytes(req.into_body()).await.unwrap().to_vec();
                    let _ = tx.send(Received { content_type, body });
                    tokio::time::sleep(delay).await;
                    Ok::<_, Infallible>(Response::new(Body::from("ok")))
                }
            }))
        }
    });
    let addr: SocketAddr = ([127, 0, 0, 1], 0).into();
    let server = Server::bind(&addr).serve(service);
    let url = format!("http://{}/hook", server.local_addr());
    tokio::spawn(server);
    (url, rx)
}

pub async fn body_text(res: Response<Body>) -> String {
    let bytes = hyper::body::to_bytes(res.into_body()).await.unwrap();
    String::from_utf8(bytes.to_vec()).unwrap()
}
