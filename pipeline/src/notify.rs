use platewatch_common::config::NotifyConfig;
use platewatch_common::message::NotificationMessage;
use tokio::io::AsyncWriteExt;
use tokio::net::TcpStream;
use tracing::{debug, info, warn};

/// Best-effort, at-most-once delivery of plate announcements.
///
/// Every message opens a fresh TCP connection, writes the payload and closes
/// the connection. Nothing is read back. Failures are logged and the message
/// is dropped.
pub struct NotificationClient {
    addr: String,
    enabled: bool,
}

impl NotificationClient {
    pub fn new(config: &NotifyConfig) -> Self {
        Self {
            addr: format!("{}:{}", config.host, config.port),
            enabled: config.enabled,
        }
    }

    pub fn addr(&self) -> &str {
        &self.addr
    }

    /// Send one message. Returns `true` if the send completed without error.
    pub async fn notify(&self, message: &NotificationMessage) -> bool {
        if !self.enabled {
            debug!(plate = message.plate_text, "notifications disabled, not sending");
            return false;
        }

        match self.send(message).await {
            Ok(()) => {
                info!(
                    plate = message.plate_text,
                    slot = message.slot_number,
                    addr = self.addr,
                    "sent plate notification"
                );
                true
            }
            Err(e) => {
                warn!(
                    error = %e,
                    plate = message.plate_text,
                    slot = message.slot_number,
                    "failed to send plate notification, dropping"
                );
                false
            }
        }
    }

    async fn send(&self, message: &NotificationMessage) -> Result<(), NotifyError> {
        let mut stream = TcpStream::connect(&self.addr)
            .await
            .map_err(|e| NotifyError::Connect(self.addr.clone(), e))?;
        stream
            .write_all(&message.encode())
            .await
            .map_err(NotifyError::Send)?;
        stream.shutdown().await.map_err(NotifyError::Send)?;
        Ok(())
    }
}

#[derive(Debug, thiserror::Error)]
pub enum NotifyError {
    #[error("failed to connect to {0}: {1}")]
    Connect(String, std::io::Error),
    #[error("failed to send payload: {0}")]
    Send(std::io::Error),
}
