use std::net::{Ipv4Addr, SocketAddr};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use axum::extract::{Query, State};
use axum::http::StatusCode;
use axum::response::{Html, IntoResponse};
use axum::routing::get;
use axum::Router;
use serde::Deserialize;
use tokio::net::TcpListener;
use tokio::sync::oneshot;

use crate::errors::{CliError, Result};

pub const PREFERRED_PORT: u16 = 8080;

/// Query parameters delivered to `/callback` by the authorization server.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct CallbackResult {
    #[serde(default)]
    pub code: Option<String>,
    #[serde(default)]
    pub state: Option<String>,
    #[serde(default)]
    pub error: Option<String>,
    #[serde(default)]
    pub error_description: Option<String>,
}

type Slot = Arc<Mutex<Option<oneshot::Sender<CallbackResult>>>>;

/// Loopback listener receiving the browser redirect. Only the first
/// callback is delivered; later hits still get a page but are dropped.
pub struct CallbackServer {
    addr: SocketAddr,
    receiver: oneshot::Receiver<CallbackResult>,
    shutdown: Option<oneshot::Sender<()>>,
}

impl CallbackServer {
    /// Bind on 127.0.0.1, preferring port 8080 and falling back to an
    /// ephemeral port when it is taken.
    pub async fn start() -> Result<Self> {
        let listener = match TcpListener::bind((Ipv4Addr::LOCALHOST, PREFERRED_PORT)).await {
            Ok(listener) => listener,
            Err(e) => {
                tracing::debug!(error = %e, port = PREFERRED_PORT, "Preferred callback port unavailable");
                TcpListener::bind((Ipv4Addr::LOCALHOST, 0)).await?
            }
        };
        Self::serve(listener).await
    }

    pub async fn serve(listener: TcpListener) -> Result<Self> {
        let addr = listener.local_addr()?;
        let (tx, receiver) = oneshot::channel();
        let (shutdown_tx, shutdown_rx) = oneshot::channel::<()>();
        let slot: Slot = Arc::new(Mutex::new(Some(tx)));

        let router = Router::new()
            .route("/callback", get(handle_callback))
            .with_state(slot);

        tokio::spawn(async move {
            let result = axum::serve(listener, router)
                .with_graceful_shutdown(async {
                    let _ = shutdown_rx.await;
                })
                .await;
            if let Err(e) = result {
                tracing::warn!(error = %e, "Callback server stopped with an error");
            }
        });

        tracing::info!(%addr, "Callback server listening");
        Ok(Self {
            addr,
            receiver,
            shutdown: Some(shutdown_tx),
        })
    }

    pub fn port(&self) -> u16 {
        self.addr.port()
    }

    pub fn redirect_uri(&self) -> String {
        format!("http://127.0.0.1:{}/callback", self.addr.port())
    }

    /// Wait for the first callback. Gives up with `LoginTimeout` after `timeout`.
    pub async fn wait(mut self, timeout: Duration) -> Result<CallbackResult> {
        let outcome = tokio::time::timeout(timeout, &mut self.receiver).await;
        self.stop();
        match outcome {
            Ok(Ok(result)) => Ok(result),
            Ok(Err(_)) => Err(CliError::OAuth("callback server closed unexpectedly".into())),
            Err(_) => Err(CliError::LoginTimeout(timeout.as_secs())),
        }
    }

    fn stop(&mut self) {
        if let Some(tx) = self.shutdown.take() {
            let _ = tx.send(());
        }
    }
}

impl Drop for CallbackServer {
    fn drop(&mut self) {
        self.stop();
    }
}

async fn handle_callback(
    State(slot): State<Slot>,
    Query(result): Query<CallbackResult>,
) -> impl IntoResponse {
    let page = match &result.error {
        Some(error) => (
            StatusCode::BAD_REQUEST,
            Html(error_page(
                error,
                result.error_description.as_deref().unwrap_or_default(),
            )),
        ),
        None => (StatusCode::OK, Html(SUCCESS_PAGE.to_string())),
    };

    let sender = slot.lock().ok().and_then(|mut guard| guard.take());
    match sender {
        Some(tx) => {
            let _ = tx.send(result);
        }
        None => tracing::debug!("Ignoring repeated OAuth callback"),
    }

    page
}

const SUCCESS_PAGE: &str = r#"<!DOCTYPE html>
<html>
<head><title>Blimu CLI - Authentication Successful</title></head>
<body style="font-family: sans-serif; text-align: center; margin: 40px">
  <h1>Authentication Successful</h1>
  <p>You can close this tab and return to your terminal.</p>
  <script>setTimeout(() => window.close(), 3000);</script>
</body>
</html>"#;

fn error_page(error: &str, description: &str) -> String {
    format!(
        r#"<!DOCTYPE html>
<html>
<head><title>Blimu CLI - Authentication Error</title></head>
<body style="font-family: sans-serif; text-align: center; margin: 40px">
  <h1>Authentication Error</h1>
  <p><strong>Error:</strong> {}</p>
  <p>{}</p>
  <p>Close this tab and try again in your terminal.</p>
</body>
</html>"#,
        html_escape(error),
        html_escape(description)
    )
}

fn html_escape(s: &str) -> String {
    s.replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
        .replace('"', "&quot;")
}
