//! Webhook HTTP server.

use std::net::SocketAddr;

use axum::{
    Router,
    body::Bytes,
    extract::State,
    http::{Method, StatusCode, header},
    response::{IntoResponse, Response},
    routing::any,
};
use tokio::net::TcpListener;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, trace, warn};

use maxbot_core::{BoxedPayloadHandler, Reply, WebhookError};

/// Normalises a route path to start with `/`.
fn route_path(path: &str) -> String {
    if path.starts_with('/') {
        path.to_string()
    } else {
        format!("/{path}")
    }
}

/// Builds the webhook router.
///
/// Every method is routed to `path` so that non-POST requests get the
/// platform's "Access not allowed!" answer instead of axum's 405.
pub fn webhook_router(path: &str, handler: BoxedPayloadHandler) -> Router {
    Router::new()
        .route(&route_path(path), any(webhook_handler))
        .with_state(handler)
}

/// Webhook request handler.
async fn webhook_handler(
    State(handler): State<BoxedPayloadHandler>,
    method: Method,
    body: Bytes,
) -> Response {
    if method != Method::POST {
        debug!(%method, "Rejected non-POST webhook request");
        return error_response(&WebhookError::MethodNotAllowed);
    }

    trace!(len = body.len(), "Received webhook POST");

    match handler.on_payload(&body).await {
        Ok(reply) => reply_response(&reply),
        Err(e) => {
            match &e {
                WebhookError::Handler(_) => error!(error = %e, "Webhook handler failed"),
                _ => warn!(error = %e, "Rejected webhook request"),
            }
            error_response(&e)
        }
    }
}

fn reply_response(reply: &Reply) -> Response {
    let content_type = match reply {
        Reply::Json(_) => "application/json",
        Reply::Empty | Reply::Text(_) => "text/plain; charset=utf-8",
    };
    (
        StatusCode::OK,
        [(header::CONTENT_TYPE, content_type)],
        reply.to_body(),
    )
        .into_response()
}

fn error_response(err: &WebhookError) -> Response {
    let status =
        StatusCode::from_u16(err.status_code()).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);
    (status, err.to_string()).into_response()
}

/// A bound webhook listener, ready to serve.
#[derive(Debug)]
pub struct WebhookServer {
    listener: TcpListener,
    router: Router,
    path: String,
}

impl WebhookServer {
    /// Binds `addr` and prepares to route `path` to `handler`.
    pub async fn bind(addr: &str, path: &str, handler: BoxedPayloadHandler) -> std::io::Result<Self> {
        let listener = TcpListener::bind(addr).await?;
        Ok(Self {
            listener,
            router: webhook_router(path, handler),
            path: route_path(path),
        })
    }

    /// Returns the bound address.
    pub fn local_addr(&self) -> std::io::Result<SocketAddr> {
        self.listener.local_addr()
    }

    /// Serves requests until `cancel` fires.
    pub async fn serve(self, cancel: CancellationToken) -> std::io::Result<()> {
        let addr = self.listener.local_addr()?;
        info!(addr = %addr, path = %self.path, "Webhook server listening");

        axum::serve(self.listener, self.router)
            .with_graceful_shutdown(async move { cancel.cancelled().await })
            .await?;

        info!("Webhook server shut down");
        Ok(())
    }
}
