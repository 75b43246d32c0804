use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use platewatch_common::message::{MessageError, NotificationMessage};
use tokio::io::AsyncReadExt;
use tokio::net::{TcpListener, TcpStream};
use tracing::{debug, error, info, warn};

use crate::registry::RegistryError;
use crate::state::AppState;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Outcome {
    /// Empty or malformed payload.
    Ignored,
    /// Plate already registered; the first entry is kept.
    Duplicate,
    Parked,
}

const MIN_ACCEPT_BACKOFF: Duration = Duration::from_millis(50);
const MAX_ACCEPT_BACKOFF: Duration = Duration::from_secs(2);

/// Accept plate notifications forever. Each connection carries one message
/// and is read to EOF. Accept errors (e.g. out of file descriptors) are
/// retried with exponential backoff.
pub async fn serve(listener: TcpListener, state: Arc<AppState>) {
    if let Ok(addr) = listener.local_addr() {
        info!(%addr, "notification listener ready");
    }
    let mut backoff = MIN_ACCEPT_BACKOFF;
    loop {
        let (stream, peer) = match listener.accept().await {
            Ok(conn) => conn,
            Err(e) => {
                warn!(error = %e, "accept failed, retrying in {:?}", backoff);
                tokio::time::sleep(backoff).await;
                backoff = next_backoff(backoff);
                continue;
            }
        };
        backoff = MIN_ACCEPT_BACKOFF;
        let state = state.clone();
        tokio::spawn(async move {
            handle_connection(stream, peer, state).await;
        });
    }
}

fn next_backoff(current: Duration) -> Duration {
    (current * 2).min(MAX_ACCEPT_BACKOFF)
}

async fn handle_connection(mut stream: TcpStream, peer: SocketAddr, state: Arc<AppState>) {
    let mut payload = Vec::new();
    if let Err(e) = stream.read_to_end(&mut payload).await {
        warn!(%peer, error = %e, "failed to read notification");
        return;
    }

    let result = tokio::task::spawn_blocking(move || handle_payload(&state, &payload)).await;
    match result {
        Ok(Ok(outcome)) => debug!(%peer, ?outcome, "notification handled"),
        Ok(Err(e)) => error!(%peer, error = %e, "failed to record vehicle entry"),
        Err(e) => error!(error = %e, "spawn_blocking failed"),
    }
}

/// Decode one payload and record the entry. Blocking (SQLite).
pub fn handle_payload(state: &AppState, payload: &[u8]) -> Result<Outcome, RegistryError> {
    let msg = match NotificationMessage::decode(payload) {
        Ok(m) => m,
        Err(e @ (MessageError::MissingPlate | MessageError::MissingSlot)) => {
            debug!(reason = %e, "empty notification ignored");
            return Ok(Outcome::Ignored);
        }
        Err(e) => {
            warn!(error = %e, "malformed notification ignored");
            return Ok(Outcome::Ignored);
        }
    };

    let now_ms = chrono::Utc::now().timestamp_millis();
    if !state.registry.park(&msg.plate_text, msg.slot_number, now_ms)? {
        info!(plate = msg.plate_text, "plate already registered");
        return Ok(Outcome::Duplicate);
    }

    info!(plate = msg.plate_text, slot = msg.slot_number, "vehicle entered");
    let mut slots = state.slots.lock().map_err(|_| RegistryError::Poisoned)?;
    if let Err(e) = slots.park(msg.slot_number) {
        warn!(plate = msg.plate_text, error = %e, "slot not marked occupied");
    }
    Ok(Outcome::Parked)
}

#[cfg(test)]
mod tests {
    use super::*;
    use platewatch_common::config::ReceiverConfig;
    use tokio::io::AsyncWriteExt;

    fn temp_state(slots: usize) -> (tempfile::TempDir, AppState) {
        let tmp = tempfile::tempdir().unwrap();
        let config = ReceiverConfig {
            db_path: tmp.path().join("vehicles.db"),
            slots,
            ..ReceiverConfig::default()
        };
        let state = AppState::open(&config).unwrap();
        (tmp, state)
    }

    #[test]
    fn accept_backoff_doubles_up_to_cap() {
        let mut backoff = MIN_ACCEPT_BACKOFF;
        let mut seen = vec![backoff];
        for _ in 0..10 {
            backoff = next_backoff(backoff);
            seen.push(backoff);
        }
        assert_eq!(seen[1], Duration::from_millis(100));
        assert_eq!(seen[2], Duration::from_millis(200));
        assert!(seen.windows(2).all(|w| w[1] >= w[0] && w[1] > Duration::ZERO));
        assert_eq!(*seen.last().unwrap(), MAX_ACCEPT_BACKOFF);
    }

    #[test]
    fn empty_values_are_ignored() {
        let (_tmp, state) = temp_state(3);
        assert_eq!(handle_payload(&state, b"").unwrap(), Outcome::Ignored);
        assert_eq!(handle_payload(&state, b"AB12\n").unwrap(), Outcome::Ignored);
        assert_eq!(handle_payload(&state, b"\n1").unwrap(), Outcome::Ignored);
        assert_eq!(handle_payload(&state, b"AB12\nnope").unwrap(), Outcome::Ignored);
        assert!(state.registry.list().unwrap().is_empty());
    }

    #[test]
    fn entry_marks_slot_and_registers_plate() {
        let (_tmp, state) = temp_state(3);
        assert_eq!(handle_payload(&state, b"AB12CD\n 2 ").unwrap(), Outcome::Parked);

        let vehicle = state.registry.search("ab12cd").unwrap().unwrap();
        assert_eq!(vehicle.slot, 2);
        assert_eq!(state.slots.lock().unwrap().first_vacant(), Some(1));
        assert!(state.slots.lock().unwrap().status()[1].occupied);
    }

    #[test]
    fn repeat_plate_is_duplicate() {
        let (_tmp, state) = temp_state(3);
        handle_payload(&state, b"AB12\n1").unwrap();
        assert_eq!(handle_payload(&state, b"AB12\n2").unwrap(), Outcome::Duplicate);
        assert!(!state.slots.lock().unwrap().status()[1].occupied);
    }

    #[test]
    fn slot_outside_lot_still_registers_plate() {
        let (_tmp, state) = temp_state(1);
        assert_eq!(handle_payload(&state, b"AB12\n7").unwrap(), Outcome::Parked);
        assert!(state.registry.search("AB12").unwrap().is_some());
        assert_eq!(state.slots.lock().unwrap().first_vacant(), Some(1));
    }

    #[tokio::test]
    async fn loopback_notification_is_recorded() {
        let (_tmp, state) = temp_state(3);
        let state = Arc::new(state);
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(serve(listener, state.clone()));

        let mut stream = TcpStream::connect(addr).await.unwrap();
        stream.write_all(b"AB12CD\n1").await.unwrap();
        stream.shutdown().await.unwrap();
        drop(stream);

        let mut found = None;
        for _ in 0..100 {
            found = state.registry.search("AB12CD").unwrap();
            if found.is_some() {
                break;
            }
            tokio::time::sleep(std::time::Duration::from_millis(10)).await;
        }
        assert_eq!(found.unwrap().slot, 1);
    }
}
