use std::io::{self, Read, Write};
use std::sync::{Mutex, PoisonError, mpsc};

use flate2::Compression;
use flate2::read::ZlibDecoder;
use flate2::write::ZlibEncoder;

use crate::error::TransportError;
use crate::protocol::{ClientMessage, ServerMessage};

/// Largest frame a peer may announce before the connection is treated as corrupt.
pub const MAX_FRAME_BYTES: usize = 4 * 1024 * 1024;

/// Client side of the link to the authority (sends ClientMessage, receives ServerMessage).
///
/// `send` is at-most-once: there is no acknowledgement and callers never retry.
pub trait ClientTransport: Send + Sync + 'static {
    fn send(&self, msg: ClientMessage) -> Result<(), TransportError>;
    fn receive(&self) -> Vec<ServerMessage>;
}

/// Authority side (sends ServerMessage, receives ClientMessage).
pub trait ServerTransport: Send + Sync + 'static {
    fn send(&self, client_id: u64, msg: ServerMessage);
    fn broadcast(&self, msg: ServerMessage);
    fn receive(&self) -> Vec<(u64, ClientMessage)>;
    fn disconnect(&self, client_id: u64);
}

// --- Serialization helpers (length-prefixed bincode framing) ---

/// Write a length-prefixed, zlib-compressed bincode message to a writer.
pub fn write_message<W: Write, T: serde::Serialize>(
    writer: &mut W,
    msg: &T,
) -> Result<(), TransportError> {
    let data = bincode::serialize(msg)?;
    let mut encoder = ZlibEncoder::new(Vec::new(), Compression::fast());
    encoder.write_all(&data)?;
    let compressed = encoder.finish()?;
    let len = (compressed.len() as u32).to_be_bytes();
    writer.write_all(&len)?;
    writer.write_all(&compressed)?;
    writer.flush()?;
    Ok(())
}

/// Read a length-prefixed, zlib-compressed bincode message from a reader.
pub fn read_message<R: Read, T: serde::de::DeserializeOwned>(
    reader: &mut R,
) -> Result<T, TransportError> {
    let mut len_buf = [0u8; 4];
    reader.read_exact(&mut len_buf)?;
    let len = u32::from_be_bytes(len_buf) as usize;
    if len > MAX_FRAME_BYTES {
        return Err(io::Error::new(io::ErrorKind::InvalidData, "frame too large").into());
    }
    let mut compressed = vec![0u8; len];
    reader.read_exact(&mut compressed)?;
    let mut decoder = ZlibDecoder::new(&compressed[..]);
    let mut data = Vec::new();
    decoder.read_to_end(&mut data)?;
    Ok(bincode::deserialize(&data)?)
}

fn drain<T>(rx: &Mutex<mpsc::Receiver<T>>) -> Vec<T> {
    let rx = rx.lock().unwrap_or_else(PoisonError::into_inner);
    rx.try_iter().collect()
}

// --- Local transport (same-process via mpsc channels) ---

/// Local client transport using mpsc channels (same-process communication).
pub struct LocalClientTransport {
    tx: mpsc::Sender<ClientMessage>,
    rx: Mutex<mpsc::Receiver<ServerMessage>>,
}

impl ClientTransport for LocalClientTransport {
    fn send(&self, msg: ClientMessage) -> Result<(), TransportError> {
        self.tx.send(msg).map_err(|_| TransportError::Closed)
    }

    fn receive(&self) -> Vec<ServerMessage> {
        drain(&self.rx)
    }
}

/// Local server transport using mpsc channels (same-process communication).
pub struct LocalServerTransport {
    tx: mpsc::Sender<ServerMessage>,
    rx: Mutex<mpsc::Receiver<ClientMessage>>,
}

/// In local mode the only client has id 0.
pub const LOCAL_CLIENT_ID: u64 = 0;

impl ServerTransport for LocalServerTransport {
    fn send(&self, client_id: u64, msg: ServerMessage) {
        if client_id == LOCAL_CLIENT_ID {
            let _ = self.tx.send(msg);
        }
    }

    fn broadcast(&self, msg: ServerMessage) {
        let _ = self.tx.send(msg);
    }

    fn receive(&self) -> Vec<(u64, ClientMessage)> {
        drain(&self.rx)
            .into_iter()
            .map(|msg| (LOCAL_CLIENT_ID, msg))
            .collect()
    }

    fn disconnect(&self, _client_id: u64) {
        // No-op for local transport
    }
}

/// Create a pair of local transports connected by mpsc channels.
/// Used for solo play (client and authority in the same process).
pub fn create_local_transport() -> (LocalClientTransport, LocalServerTransport) {
    let (client_tx, server_rx) = mpsc::channel();
    let (server_tx, client_rx) = mpsc::channel();
    (
        LocalClientTransport {
            tx: client_tx,
            rx: Mutex::new(client_rx),
        },
        LocalServerTransport {
            tx: server_tx,
            rx: Mutex::new(server_rx),
        },
    )
}

#[cfg(test)]
mod tests {
    use bevy_math::Vec3;

    use super::*;
    use crate::protocol::Rotation;

    #[test]
    fn frames_survive_a_byte_stream() {
        let mut wire = Vec::new();
        let sent = ClientMessage::ReportPosition {
            player_id: 3,
            position: Vec3::new(1.0, 0.9, -4.5),
            rotation: Rotation { pitch: 0.25, yaw: -1.0 },
        };
        write_message(&mut wire, &sent).expect("write");
        write_message(&mut wire, &ClientMessage::Leave).expect("write");

        let mut reader = &wire[..];
        let first: ClientMessage = read_message(&mut reader).expect("first frame");
        let second: ClientMessage = read_message(&mut reader).expect("second frame");
        assert!(matches!(
            first,
            ClientMessage::ReportPosition { player_id: 3, position, .. } if position == Vec3::new(1.0, 0.9, -4.5)
        ));
        assert!(matches!(second, ClientMessage::Leave));
    }

    #[test]
    fn oversized_frame_is_rejected() {
        let mut wire = ((MAX_FRAME_BYTES + 1) as u32).to_be_bytes().to_vec();
        wire.extend_from_slice(&[0; 16]);
        let result: Result<ClientMessage, _> = read_message(&mut &wire[..]);
        assert!(matches!(result, Err(TransportError::Io(_))));
    }

    #[test]
    fn local_send_fails_once_authority_is_gone() {
        let (client, server) = create_local_transport();
        assert!(client.send(ClientMessage::Leave).is_ok());
        assert_eq!(server.receive().len(), 1);

        drop(server);
        assert!(matches!(client.send(ClientMessage::Leave), Err(TransportError::Closed)));
    }
}
