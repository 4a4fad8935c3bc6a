use axum::extract::ws::{Message, WebSocket};
use tokio::sync::watch;
use tracing::{error, info, warn};

use crate::state::app_state::SharedState;

/// Pushes the current dashboard, then every newly applied one, until the
/// client goes away or the poll loop shuts down.
pub async fn handle_live(mut socket: WebSocket, mut updates: watch::Receiver<SharedState>) {
    info!("live stream opened");

    loop {
        let latest = updates.borrow_and_update().clone();

        if let Some(state) = latest {
            let json = match serde_json::to_string(&*state) {
                Ok(j) => j,
                Err(e) => {
                    error!("json serialize error: {}", e);
                    return;
                }
            };

            if let Err(e) = socket.send(Message::Text(json.into())).await {
                warn!("ws send failed: {}", e);
                return;
            }
        }

        if updates.changed().await.is_err() {
            break;
        }
    }

    let _ = socket.send(Message::Close(None)).await;
    info!("live stream finished");
}
