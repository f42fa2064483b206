use axum::{extract::State, http::StatusCode, routing::post, Json, Router};
use serde_json::Value;
use std::sync::{Arc, Mutex};
use tokio::net::TcpListener;

const WEBHOOK_PATH: &str = "/services/fake-webhook";

/// Incoming-webhook endpoint recording every JSON payload posted to it.
#[derive(Clone)]
pub struct FakeWebhook {
    status: StatusCode,
    received: Arc<Mutex<Vec<Value>>>,
}

impl FakeWebhook {
    pub fn new() -> Self {
        Self {
            status: StatusCode::OK,
            received: Default::default(),
        }
    }

    pub fn respond_with_status(self, status: u16) -> Self {
        Self {
            status: StatusCode::from_u16(status).unwrap(),
            ..self
        }
    }

    /// Binds an ephemeral port, serves in the background and returns the webhook URL.
    pub async fn start(&self) -> String {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let url = format!("http://{}{WEBHOOK_PATH}", listener.local_addr().unwrap());
        let app = Router::new()
            .route(WEBHOOK_PATH, post(receive))
            .with_state(self.clone());
        tokio::spawn(async move {
            axum::serve(listener, app).await.unwrap();
        });
        url
    }

    pub fn received_payloads(&self) -> Vec<Value> {
        self.received.lock().unwrap().clone()
    }
}

impl Default for FakeWebhook {
    fn default() -> Self {
        Self::new()
    }
}

async fn receive(State(state): State<FakeWebhook>, Json(payload): Json<Value>) -> StatusCode {
    state.received.lock().unwrap().push(payload);
    state.status
}
