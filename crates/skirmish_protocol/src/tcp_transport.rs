use std::collections::HashMap;
use std::io::{self, BufReader, BufWriter};
use std::net::{SocketAddr, TcpListener, TcpStream, ToSocketAddrs};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::mpsc::{self, Receiver, SyncSender, TrySendError};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::thread;

use serde::Serialize;
use tracing::{debug, info, warn};

use crate::error::TransportError;
use crate::protocol::{ClientMessage, ServerMessage};
use crate::transport::{ClientTransport, ServerTransport, read_message, write_message};

/// Frames a connection may hold before new ones are dropped.
pub const OUTBOX_DEPTH: usize = 256;

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

/// Drains `outbox` onto the socket until the channel or the socket closes.
fn spawn_writer<T>(stream: TcpStream, outbox: Receiver<T>, peer: String)
where
    T: Serialize + Send + 'static,
{
    thread::spawn(move || {
        let mut writer = BufWriter::new(stream);
        for msg in outbox {
            if let Err(err) = write_message(&mut writer, &msg) {
                warn!(%err, peer = %peer, "write failed, closing outbox");
                return;
            }
        }
        debug!(peer = %peer, "outbox closed");
    });
}

// --- TCP Server Transport ---

type Inbox<T> = Arc<Mutex<Vec<T>>>;
type Outboxes = Arc<Mutex<HashMap<u64, SyncSender<ServerMessage>>>>;

pub struct TcpServerTransport {
    local_addr: SocketAddr,
    /// Incoming messages from all clients: (client_id, ClientMessage)
    incoming: Inbox<(u64, ClientMessage)>,
    /// Per-client queues drained by that client's writer thread
    clients: Outboxes,
}

impl TcpServerTransport {
    pub fn bind(addr: impl ToSocketAddrs) -> io::Result<Self> {
        let listener = TcpListener::bind(addr)?;
        let local_addr = listener.local_addr()?;

        let incoming: Inbox<(u64, ClientMessage)> = Arc::default();
        let clients: Outboxes = Arc::default();
        let next_id = Arc::new(AtomicU64::new(1));

        let incoming_clone = Arc::clone(&incoming);
        let clients_clone = Arc::clone(&clients);

        thread::spawn(move || {
            for stream in listener.incoming() {
                let stream = match stream {
                    Ok(stream) => stream,
                    Err(err) => {
                        warn!(%err, "failed to accept connection");
                        continue;
                    }
                };
                let _ = stream.set_nodelay(true);

                let client_id = next_id.fetch_add(1, Ordering::SeqCst);
                let read_stream = match stream.try_clone() {
                    Ok(s) => s,
                    Err(err) => {
                        warn!(%err, client_id, "failed to split client stream");
                        continue;
                    }
                };

                let (tx, rx) = mpsc::sync_channel(OUTBOX_DEPTH);
                spawn_writer(stream, rx, format!("client {client_id}"));
                lock(&clients_clone).insert(client_id, tx);
                info!(client_id, "client connected");

                let incoming_for_reader = Arc::clone(&incoming_clone);
                let clients_for_reader = Arc::clone(&clients_clone);
                thread::spawn(move || {
                    let mut reader = BufReader::new(read_stream);
                    loop {
                        match read_message::<_, ClientMessage>(&mut reader) {
                            Ok(msg) => lock(&incoming_for_reader).push((client_id, msg)),
                            Err(err) => {
                                debug!(%err, client_id, "client stream closed");
                                // A dropped connection is an implicit leave.
                                lock(&incoming_for_reader).push((client_id, ClientMessage::Leave));
                                lock(&clients_for_reader).remove(&client_id);
                                break;
                            }
                        }
                    }
                });
            }
        });

        Ok(Self {
            local_addr,
            incoming,
            clients,
        })
    }

    pub fn local_addr(&self) -> SocketAddr {
        self.local_addr
    }
}

/// Queues without blocking. Returns false once the writer thread is gone.
fn enqueue(client_id: u64, outbox: &SyncSender<ServerMessage>, msg: ServerMessage) -> bool {
    match outbox.try_send(msg) {
        Ok(()) => true,
        Err(TrySendError::Full(_)) => {
            debug!(client_id, "outbox full, dropping frame");
            true
        }
        Err(TrySendError::Disconnected(_)) => false,
    }
}

impl ServerTransport for TcpServerTransport {
    fn send(&self, client_id: u64, msg: ServerMessage) {
        let mut clients = lock(&self.clients);
        let open = match clients.get(&client_id) {
            Some(outbox) => enqueue(client_id, outbox, msg),
            None => return,
        };
        if !open {
            warn!(client_id, "dropping client after failed write");
            clients.remove(&client_id);
        }
    }

    fn broadcast(&self, msg: ServerMessage) {
        let mut clients = lock(&self.clients);
        clients.retain(|&id, outbox| {
            let open = enqueue(id, outbox, msg.clone());
            if !open {
                warn!(client_id = id, "dropping client after failed broadcast");
            }
            open
        });
    }

    fn receive(&self) -> Vec<(u64, ClientMessage)> {
        std::mem::take(&mut *lock(&self.incoming))
    }

    fn disconnect(&self, client_id: u64) {
        lock(&self.clients).remove(&client_id);
    }
}

// --- TCP Client Transport ---

pub struct TcpClientTransport {
    outbox: SyncSender<ClientMessage>,
    incoming: Inbox<ServerMessage>,
}

impl TcpClientTransport {
    pub fn connect(addr: impl ToSocketAddrs) -> io::Result<Self> {
        let stream = TcpStream::connect(addr)?;
        stream.set_nodelay(true)?;
        let read_stream = stream.try_clone()?;

        let incoming: Inbox<ServerMessage> = Arc::default();
        let incoming_clone = Arc::clone(&incoming);

        thread::spawn(move || {
            let mut reader = BufReader::new(read_stream);
            loop {
                match read_message::<_, ServerMessage>(&mut reader) {
                    Ok(msg) => lock(&incoming_clone).push(msg),
                    Err(err) => {
                        warn!(%err, "connection to authority lost");
                        break;
                    }
                }
            }
        });

        let (outbox, rx) = mpsc::sync_channel(OUTBOX_DEPTH);
        spawn_writer(stream, rx, "authority".to_owned());

        Ok(Self { outbox, incoming })
    }
}

impl ClientTransport for TcpClientTransport {
    fn send(&self, msg: ClientMessage) -> Result<(), TransportError> {
        match self.outbox.try_send(msg) {
            Ok(()) => Ok(()),
            Err(TrySendError::Full(_)) => {
                debug!("outbox full, dropping frame");
                Ok(())
            }
            Err(TrySendError::Disconnected(_)) => Err(TransportError::Closed),
        }
    }

    fn receive(&self) -> Vec<ServerMessage> {
        std::mem::take(&mut *lock(&self.incoming))
    }
}

#[cfg(test)]
mod tests {
    use std::time::{Duration, Instant};

    use super::*;

    fn wait_for<T>(mut poll: impl FnMut() -> Vec<T>) -> Vec<T> {
        let deadline = Instant::now() + Duration::from_secs(5);
        loop {
            let items = poll();
            if !items.is_empty() || Instant::now() > deadline {
                return items;
            }
            thread::sleep(Duration::from_millis(10));
        }
    }

    #[test]
    fn messages_cross_a_loopback_connection() {
        let server = TcpServerTransport::bind("127.0.0.1:0").expect("bind");
        let client = TcpClientTransport::connect(server.local_addr()).expect("connect");

        client
            .send(ClientMessage::Join {
                player_name: "ash".into(),
            })
            .expect("send");
        let received = wait_for(|| server.receive());
        assert_eq!(received.len(), 1);
        let (client_id, msg) = &received[0];
        assert!(matches!(msg, ClientMessage::Join { player_name } if player_name == "ash"));

        server.send(*client_id, ServerMessage::HitResult(None));
        let replies = wait_for(|| client.receive());
        assert!(matches!(replies.as_slice(), [ServerMessage::HitResult(None)]));
    }

    /// Incompressible text so queued frames outgrow the socket buffers.
    fn noise(seed: u64, len: usize) -> String {
        let mut state = seed | 1;
        (0..len)
            .map(|_| {
                state ^= state << 13;
                state ^= state >> 7;
                state ^= state << 17;
                char::from(b'!' + (state % 94) as u8)
            })
            .collect()
    }

    #[test]
    fn sending_to_a_stalled_client_does_not_block() {
        let server = TcpServerTransport::bind("127.0.0.1:0").expect("bind");
        let mut stalled = TcpStream::connect(server.local_addr()).expect("connect");
        write_message(
            &mut stalled,
            &ClientMessage::Join {
                player_name: "idle".into(),
            },
        )
        .expect("join");
        let received = wait_for(|| server.receive());
        let client_id = received[0].0;

        let frames: Vec<ServerMessage> = (0..2 * OUTBOX_DEPTH as u64)
            .map(|i| ServerMessage::Rejected {
                reason: noise(i, 16 * 1024),
            })
            .collect();
        let started = Instant::now();
        for frame in frames {
            server.send(client_id, frame.clone());
            server.broadcast(frame);
        }
        assert!(started.elapsed() < Duration::from_secs(2));
        drop(stalled);
    }
}
