#![allow(dead_code)]

use std::sync::mpsc::{self, Receiver, Sender};
use std::sync::{Arc, Mutex};
use std::thread;
use std::time::Duration;

use axum::body::Body;
use axum::extract::State;
use axum::http::{header, Method, StatusCode, Uri};
use axum::response::{IntoResponse, Response};
use axum::Router;
use tokio::net::TcpListener;

/// What the stub answers to every request.
pub enum Reply {
    Respond { status: u16, body: String },
    /// Never answers within the given duration.
    Stall(Duration),
    /// Sends the status line right away, the body only after the delay.
    StallBody { status: u16, delay: Duration },
}

impl Reply {
    pub fn json(status: u16, body: &str) -> Self {
        Reply::Respond {
            status,
            body: body.to_string(),
        }
    }
}

#[derive(Debug, Clone)]
pub struct RecordedRequest {
    pub method: String,
    pub path: String,
    pub body: String,
}

struct StubState {
    reply: Reply,
    requests: Mutex<Sender<RecordedRequest>>,
}

/// Axum server on an OS chosen port, running on its own runtime thread.
pub struct StubServer {
    pub port: u16,
    requests: Receiver<RecordedRequest>,
}

impl StubServer {
    pub fn start(reply: Reply) -> Self {
        let (req_tx, req_rx) = mpsc::channel();
        let (port_tx, port_rx) = mpsc::channel();
        let state = Arc::new(StubState {
            reply,
            requests: Mutex::new(req_tx),
        });

        thread::spawn(move || {
            let runtime = tokio::runtime::Builder::new_current_thread()
                .enable_all()
                .build()
                .expect("stub runtime");
            runtime.block_on(async move {
                let listener = TcpListener::bind("127.0.0.1:0").await.expect("bind stub server");
                port_tx.send(listener.local_addr().unwrap().port()).unwrap();
                let app = Router::new().fallback(record_and_reply).with_state(state);
                axum::serve(listener, app).await.unwrap();
            });
        });

        let port = port_rx
            .recv_timeout(Duration::from_secs(5))
            .expect("stub server did not start");
        StubServer {
            port,
            requests: req_rx,
        }
    }

    pub fn received(&self) -> RecordedRequest {
        self.requests
            .recv_timeout(Duration::from_secs(5))
            .expect("stub server got no request")
    }
}

async fn record_and_reply(
    State(state): State<Arc<StubState>>,
    method: Method,
    uri: Uri,
    body: String,
) -> Response {
    let recorded = RecordedRequest {
        method: method.to_string(),
        path: uri.path().to_string(),
        body,
    };
    let _ = state.requests.lock().unwrap().send(recorded);

    match &state.reply {
        Reply::Respond { status, body } => (
            StatusCode::from_u16(*status).unwrap(),
            [(header::CONTENT_TYPE, "application/json")],
            body.clone(),
        )
            .into_response(),
        Reply::Stall(delay) => {
            tokio::time::sleep(*delay).await;
            StatusCode::OK.into_response()
        }
        Reply::StallBody { status, delay } => {
            let delay = *delay;
            let late_body = futures::stream::once(async move {
                tokio::time::sleep(delay).await;
                Ok::<_, std::io::Error>("late".to_string())
            });
            (StatusCode::from_u16(*status).unwrap(), Body::from_stream(late_body)).into_response()
        }
    }
}

/// A port nobody listens on.
pub fn closed_port() -> u16 {
    let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
    listener.local_addr().unwrap().port()
}
