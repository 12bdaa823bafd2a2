//! The transport adapter: three verbs on one path over axum.
//!
//! Status/body contract at the boundary:
//!
//! - `POST` with no session header and an `initialize` body creates a
//!   session; the minted id is echoed in the session header. A present
//!   header continues the session. Anything else is 400 with a
//!   JSON-RPC-shaped error body. Engine faults are 500 with a
//!   JSON-RPC-shaped error body.
//! - `GET` opens the server-push stream; 400 with a plain-text body when
//!   the session is missing or unknown.
//! - `DELETE` terminates; same 400 rule as GET.
//!
//! Session and engine errors terminate only the offending request, never
//! the run.

use std::convert::Infallible;
use std::pin::Pin;
use std::sync::Arc;
use std::task::{Context, Poll};
use std::time::Duration;

use axum::Json;
use axum::Router;
use axum::extract::State;
use axum::http::{HeaderMap, StatusCode};
use axum::response::sse::{Event, KeepAlive, Sse};
use axum::response::{IntoResponse, Response};
use axum::routing::post;
use futures::Stream;
use parking_lot::Mutex;
use serde_json::{Value, json};
use tokio::net::TcpListener;
use tokio::sync::watch;
use tokio_stream::wrappers::ReceiverStream;

use accord_core::rpc::{self, SESSION_HEADER, error_codes};
use accord_core::{Check, CheckLedger, CheckStatus, EngineFactory, SessionError};

use crate::session::SessionRegistry;

/// The single endpoint path all three verbs share.
pub const RPC_PATH: &str = "/rpc";

/// Interval between SSE keep-alive comments. Short enough that a client
/// disconnect is noticed promptly on the next write.
const KEEP_ALIVE_INTERVAL: Duration = Duration::from_secs(1);

/// Shared state behind one scenario run's router.
pub struct TransportState {
    pub registry: Arc<SessionRegistry>,
    pub factory: Arc<dyn EngineFactory>,
    /// When present, the adapter records an INFO check for the first
    /// incoming request. The ledger's duplicate-id rule keeps it to one.
    ledger: Option<Arc<Mutex<CheckLedger>>>,
}

impl TransportState {
    pub fn new(registry: Arc<SessionRegistry>, factory: Arc<dyn EngineFactory>) -> Self {
        Self {
            registry,
            factory,
            ledger: None,
        }
    }

    pub fn with_ledger(mut self, ledger: Arc<Mutex<CheckLedger>>) -> Self {
        self.ledger = Some(ledger);
        self
    }
}

/// Build the router for one scenario run.
pub fn router(state: Arc<TransportState>) -> Router {
    Router::new()
        .route(
            RPC_PATH,
            post(handle_post).get(handle_get).delete(handle_delete),
        )
        .with_state(state)
}

/// Serve a router on a pre-bound listener until the shutdown signal fires.
///
/// The listener is bound by the caller (port 0 for an ephemeral port) so
/// that bind failures surface from `start()` rather than from inside a
/// spawned task.
pub async fn serve(
    listener: TcpListener,
    app: Router,
    mut shutdown: watch::Receiver<bool>,
) -> std::io::Result<()> {
    axum::serve(listener, app)
        .with_graceful_shutdown(async move {
            let _ = shutdown.changed().await;
        })
        .await
}

fn session_id(headers: &HeaderMap) -> Option<&str> {
    headers.get(SESSION_HEADER).and_then(|v| v.to_str().ok())
}

/// 400 with the JSON-RPC-shaped invalid-session body (POST contract).
fn invalid_session_json() -> Response {
    (
        StatusCode::BAD_REQUEST,
        Json(rpc::error_response(
            Value::Null,
            error_codes::INVALID_SESSION,
            "Invalid or missing session ID",
        )),
    )
        .into_response()
}

/// 400 with a plain-text body (GET/DELETE contract).
fn invalid_session_text() -> Response {
    (StatusCode::BAD_REQUEST, "Invalid or missing session ID").into_response()
}

/// 500 with the JSON-RPC-shaped internal-error body.
fn internal_error_json() -> Response {
    (
        StatusCode::INTERNAL_SERVER_ERROR,
        Json(rpc::error_response(
            Value::Null,
            error_codes::INTERNAL_ERROR,
            "Internal server error",
        )),
    )
        .into_response()
}

async fn handle_post(
    State(state): State<Arc<TransportState>>,
    headers: HeaderMap,
    Json(body): Json<Value>,
) -> Response {
    if let Some(ledger) = &state.ledger {
        ledger.lock().append(
            Check::new(
                "incoming-request",
                "IncomingRequest",
                "Endpoint received a protocol request",
                CheckStatus::Info,
            )
            .with_details(json!({ "method": rpc::method(&body) })),
        );
    }

    match session_id(&headers).map(str::to_owned) {
        // Session header present: continue an existing session.
        Some(id) => match state.registry.get(Some(&id)) {
            Ok(session) => {
                // A session drained concurrently by stop() is gone, not
                // half-disposed.
                if session.is_closed() {
                    return invalid_session_json();
                }
                match session.engine().handle(body).await {
                    Ok(Some(response)) => {
                        (StatusCode::OK, [(SESSION_HEADER, id)], Json(response)).into_response()
                    }
                    Ok(None) => (StatusCode::ACCEPTED, [(SESSION_HEADER, id)]).into_response(),
                    Err(e) => {
                        tracing::error!(session_id = %id, error = %e, "engine fault");
                        internal_error_json()
                    }
                }
            }
            Err(_) => invalid_session_json(),
        },
        // No header: only an initialize request may create a session.
        None if rpc::is_initialize(&body) => {
            let session = state.registry.create(state.factory.as_ref());
            let id = session.id().to_owned();
            match session.engine().handle(body).await {
                Ok(Some(response)) => {
                    (StatusCode::OK, [(SESSION_HEADER, id)], Json(response)).into_response()
                }
                Ok(None) => (StatusCode::ACCEPTED, [(SESSION_HEADER, id)]).into_response(),
                Err(e) => {
                    tracing::error!(session_id = %id, error = %e, "engine fault during create");
                    let _ = state.registry.terminate(&id);
                    internal_error_json()
                }
            }
        }
        None => invalid_session_json(),
    }
}

async fn handle_get(
    State(state): State<Arc<TransportState>>,
    headers: HeaderMap,
) -> Response {
    let Some(id) = session_id(&headers) else {
        return invalid_session_text();
    };

    match state.registry.open_stream(id) {
        Ok(lease) => {
            let stream = NotificationStream {
                rx: ReceiverStream::new(lease.receiver),
                _guard: StreamGuard {
                    registry: state.registry.clone(),
                    session_id: id.to_owned(),
                    generation: lease.generation,
                },
            };
            Sse::new(stream)
                .keep_alive(KeepAlive::new().interval(KEEP_ALIVE_INTERVAL))
                .into_response()
        }
        Err(SessionError::Missing | SessionError::Unknown(_)) => invalid_session_text(),
    }
}

async fn handle_delete(
    State(state): State<Arc<TransportState>>,
    headers: HeaderMap,
) -> Response {
    let Some(id) = session_id(&headers) else {
        return invalid_session_text();
    };

    match state.registry.terminate(id) {
        Ok(()) => StatusCode::OK.into_response(),
        Err(_) => invalid_session_text(),
    }
}

/// Dropped when the SSE response body goes away, for whatever reason.
///
/// The registry decides whether this particular stream's end means the
/// session is gone (generation still current) or was merely superseded.
struct StreamGuard {
    registry: Arc<SessionRegistry>,
    session_id: String,
    generation: u64,
}

impl Drop for StreamGuard {
    fn drop(&mut self) {
        self.registry
            .stream_disconnected(&self.session_id, self.generation);
    }
}

/// Push-notification receiver rendered as SSE events, one `data:` line of
/// compact JSON per notification.
struct NotificationStream {
    rx: ReceiverStream<Value>,
    _guard: StreamGuard,
}

impl Stream for NotificationStream {
    type Item = Result<Event, Infallible>;

    fn poll_next(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Self::Item>> {
        let this = self.get_mut();
        match Pin::new(&mut this.rx).poll_next(cx) {
            Poll::Ready(Some(value)) => {
                Poll::Ready(Some(Ok(Event::default().data(value.to_string()))))
            }
            Poll::Ready(None) => Poll::Ready(None),
            Poll::Pending => Poll::Pending,
        }
    }
}
