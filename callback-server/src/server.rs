//! HTTP listener for UPnP event notifications.

use std::borrow::Cow;
use std::collections::HashMap;
use std::convert::Infallible;
use std::net::SocketAddr;
use std::sync::Arc;

use async_trait::async_trait;
use bytes::Bytes;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::{debug, info};
use warp::http::{Method, StatusCode};
use warp::Filter;

use crate::error::{CallbackServerError, Result};

/// One inbound request as received from a device
#[derive(Debug, Clone)]
pub struct Notification {
    pub method: Method,
    pub path: String,
    pub query: HashMap<String, String>,
    /// `SID` header
    pub sid: Option<String>,
    /// `SEQ` header, unparsed
    pub seq: Option<String>,
    pub body: Bytes,
}

impl Notification {
    pub fn is_notify(&self) -> bool {
        self.method.as_str().eq_ignore_ascii_case("NOTIFY")
    }

    pub fn query_param(&self, name: &str) -> Option<&str> {
        self.query.get(name).map(String::as_str)
    }

    /// Event sequence number, `None` when absent or not a number.
    pub fn seq_number(&self) -> Option<u32> {
        self.seq.as_deref().and_then(|seq| seq.trim().parse().ok())
    }

    pub fn body_text(&self) -> Cow<'_, str> {
        String::from_utf8_lossy(&self.body)
    }
}

/// Receives every request the server accepts.
///
/// Requests are handled concurrently, so implementations may be called from
/// several tasks at once.
#[async_trait]
pub trait NotifyHandler: Send + Sync + 'static {
    async fn handle(&self, notification: Notification) -> StatusCode;
}

/// HTTP callback server for UPnP event notifications.
///
/// The server runs on its own task from [`CallbackServer::bind`] until
/// [`CallbackServer::shutdown`] is called or the value is dropped.
pub struct CallbackServer {
    local_addr: SocketAddr,
    shutdown_tx: mpsc::Sender<()>,
    server_handle: Option<JoinHandle<()>>,
}

impl CallbackServer {
    /// Bind to `addr` and start serving. Port 0 picks an ephemeral port.
    pub async fn bind(addr: SocketAddr, handler: Arc<dyn NotifyHandler>) -> Result<Self> {
        let (shutdown_tx, mut shutdown_rx) = mpsc::channel::<()>(1);

        let (local_addr, server) = warp::serve(routes(handler))
            .try_bind_with_graceful_shutdown(addr, async move {
                shutdown_rx.recv().await;
            })
            .map_err(|e| CallbackServerError::Bind {
                addr,
                reason: e.to_string(),
            })?;

        let server_handle = tokio::spawn(async move {
            server.await;
            debug!("Callback server stopped");
        });

        info!(%local_addr, "Callback server listening");

        Ok(Self {
            local_addr,
            shutdown_tx,
            server_handle: Some(server_handle),
        })
    }

    pub fn local_addr(&self) -> SocketAddr {
        self.local_addr
    }

    pub fn port(&self) -> u16 {
        self.local_addr.port()
    }

    /// Signal shutdown without waiting for in-flight requests.
    pub fn close(&self) {
        let _ = self.shutdown_tx.try_send(());
    }

    /// Shut down gracefully and wait for the server task to finish.
    pub async fn shutdown(mut self) -> Result<()> {
        self.close();
        if let Some(handle) = self.server_handle.take() {
            handle
                .await
                .map_err(|e| CallbackServerError::Task(e.to_string()))?;
        }
        Ok(())
    }
}

fn routes(
    handler: Arc<dyn NotifyHandler>,
) -> impl Filter<Extract = (impl warp::Reply,), Error = Infallible> + Clone {
    warp::method()
        .and(warp::path::full())
        .and(warp::query::<HashMap<String, String>>())
        .and(warp::header::optional::<String>("sid"))
        .and(warp::header::optional::<String>("seq"))
        .and(warp::body::bytes())
        .and(warp::any().map(move || Arc::clone(&handler)))
        .and_then(handle_request)
        .recover(handle_rejection)
}

async fn handle_request(
    method: Method,
    path: warp::path::FullPath,
    query: HashMap<String, String>,
    sid: Option<String>,
    seq: Option<String>,
    body: Bytes,
    handler: Arc<dyn NotifyHandler>,
) -> std::result::Result<impl warp::Reply, warp::Rejection> {
    debug!(
        %method,
        path = path.as_str(),
        sid = sid.as_deref().unwrap_or("-"),
        seq = seq.as_deref().unwrap_or("-"),
        bytes = body.len(),
        "Incoming callback request"
    );

    let notification = Notification {
        method,
        path: path.as_str().to_string(),
        query,
        sid,
        seq,
        body,
    };

    let status = handler.handle(notification).await;
    Ok(warp::reply::with_status("", status))
}

/// Handle rejections and convert them to HTTP responses.
async fn handle_rejection(err: warp::Rejection) -> std::result::Result<impl warp::Reply, Infallible> {
    let code = if err.is_not_found() {
        StatusCode::NOT_FOUND
    } else if err.find::<warp::reject::InvalidQuery>().is_some()
        || err.find::<warp::reject::InvalidHeader>().is_some()
    {
        StatusCode::BAD_REQUEST
    } else {
        StatusCode::INTERNAL_SERVER_ERROR
    };
    debug!(?err, %code, "Rejected callback request");

    Ok(warp::reply::with_status("", code))
}
