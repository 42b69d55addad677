// Fake HTTP health endpoint whose status code can be flipped at runtime.

use axum::{extract::State, http::StatusCode, routing::get, Router};
use std::net::SocketAddr;
use std::sync::atomic::{AtomicU16, AtomicUsize, Ordering};
use std::sync::Arc;
use tokio::net::TcpListener;
use tokio::task::JoinHandle;

#[derive(Default)]
struct Shared {
    status: AtomicU16,
    hits: AtomicUsize,
}

pub struct AdminServer {
    addr: SocketAddr,
    shared: Arc<Shared>,
    handle: JoinHandle<()>,
}

impl AdminServer {
    /// Serves `GET /` on a random loopback port answering with `status`.
    pub async fn start(status: u16) -> Self {
        let shared = Arc::new(Shared {
            status: AtomicU16::new(status),
            hits: AtomicUsize::new(0),
        });
        let app = Router::new()
            .route("/", get(answer))
            .with_state(shared.clone());

        let listener = TcpListener::bind("127.0.0.1:0")
            .await
            .expect("bind fake admin server");
        let addr = listener.local_addr().expect("local addr");
        let handle = tokio::spawn(async move {
            let _ = axum::serve(listener, app).await;
        });

        Self {
            addr,
            shared,
            handle,
        }
    }

    pub fn port(&self) -> u16 {
        self.addr.port()
    }

    pub fn set_status(&self, status: u16) {
        self.shared.status.store(status, Ordering::SeqCst);
    }

    pub fn hits(&self) -> usize {
        self.shared.hits.load(Ordering::SeqCst)
    }
}

impl Drop for AdminServer {
    fn drop(&mut self) {
        self.handle.abort();
    }
}

async fn answer(State(shared): State<Arc<Shared>>) -> StatusCode {
    shared.hits.fetch_add(1, Ordering::SeqCst);
    StatusCode::from_u16(shared.status.load(Ordering::SeqCst))
        .unwrap_or(StatusCode::INTERNAL_SERVER_ERROR)
}
