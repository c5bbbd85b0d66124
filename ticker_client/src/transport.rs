//! WebSocket transport.
//!
//! Each connection runs on its own thread and talks to the connection
//! manager only through messages: lifecycle and inbound frames go out as
//! `ConnectionEvent`s tagged with the connection's generation, outbound frames
//! and close requests come in over a per-connection channel. The socket is put
//! on a short read timeout so the thread can interleave reading with draining
//! that channel.
//!
//! Lifecycle contract, matching what a browser WebSocket reports:
//! - `Opened` once the handshake succeeded.
//! - `Frame` for every inbound text message, in arrival order.
//! - `Errored` when the connection failed; the thread then waits for the
//!   owner to call `close` (or drop the handle) before reporting `Closed`.
//! - `Closed` exactly once, as the last event of the connection.
use std::io::ErrorKind;
use std::net::TcpStream;
use std::thread;
use std::time::{Duration, Instant};

use crossbeam_channel::{Receiver, Sender, TryRecvError, unbounded};
use log::{debug, error, info, warn};
use ticker_common::{FeedError, Result};
use tungstenite::client::IntoClientRequest;
use tungstenite::handshake::client::Request;
use tungstenite::stream::MaybeTlsStream;
use tungstenite::{Message, WebSocket};

/// How long the reader blocks before checking for outbound frames.
pub const DEFAULT_POLL_INTERVAL: Duration = Duration::from_millis(50);
/// Upper bound on waiting for the peer to acknowledge our close frame.
const CLOSE_GRACE: Duration = Duration::from_secs(1);

type Socket = WebSocket<MaybeTlsStream<TcpStream>>;

/// Signal raised by a transport.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TransportEvent {
    /// Handshake finished; the connection accepts frames.
    Opened,
    /// Inbound text frame.
    Frame(String),
    /// Connection is gone; always the last event.
    Closed(String),
    /// Connection failed; a `Closed` follows once the owner closes it.
    Errored(String),
}

/// A transport event tagged with the connection it belongs to.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConnectionEvent {
    /// Generation of the connection that raised the event.
    pub generation: u64,
    /// The event itself.
    pub event: TransportEvent,
}

/// Sending half handed to a transport so it can report its events.
#[derive(Debug, Clone)]
pub struct EventEmitter {
    generation: u64,
    tx: Sender<ConnectionEvent>,
}

impl EventEmitter {
    /// Create an emitter tagging every event with `generation`.
    pub fn new(generation: u64, tx: Sender<ConnectionEvent>) -> Self {
        Self { generation, tx }
    }

    /// Generation this emitter tags events with.
    pub fn generation(&self) -> u64 {
        self.generation
    }

    /// Report an event. Returns `false` if the manager is gone.
    pub fn emit(&self, event: TransportEvent) -> bool {
        let sent = self
            .tx
            .send(ConnectionEvent {
                generation: self.generation,
                event,
            })
            .is_ok();
        if !sent {
            debug!("Event of connection {} dropped: manager gone", self.generation);
        }
        sent
    }
}

/// Handle to an open (or opening) connection.
pub trait Transport {
    /// Queue a text frame for sending.
    fn send(&mut self, frame: String) -> Result<()>;
    /// Ask the connection to close. Idempotent.
    fn close(&mut self);
}

/// Opens transports. Events of the new connection go to `emitter`.
pub trait Connector {
    /// Transport handle produced by this connector.
    type Transport: Transport;

    /// Start connecting to `url`. Must not block on the network.
    fn connect(&mut self, url: &str, emitter: EventEmitter) -> Result<Self::Transport>;
}

enum Outbound {
    Frame(String),
    Close,
}

/// Handle to a connection thread.
pub struct WsTransport {
    outbound: Sender<Outbound>,
    closing: bool,
}

impl Transport for WsTransport {
    fn send(&mut self, frame: String) -> Result<()> {
        if self.closing {
            return Err(FeedError::NotConnected);
        }
        self.outbound
            .send(Outbound::Frame(frame))
            .map_err(|e| FeedError::ChannelSend(e.to_string()))
    }

    fn close(&mut self) {
        if self.closing {
            return;
        }
        self.closing = true;
        if self.outbound.send(Outbound::Close).is_err() {
            debug!("Connection thread already finished");
        }
    }
}

/// Connector backed by `tungstenite` over TCP, with rustls for `wss://`.
#[derive(Debug, Clone)]
pub struct WsConnector {
    poll_interval: Duration,
}

impl Default for WsConnector {
    fn default() -> Self {
        Self::new(DEFAULT_POLL_INTERVAL)
    }
}

impl WsConnector {
    /// Create a connector whose threads poll for outbound frames every
    /// `poll_interval`.
    pub fn new(poll_interval: Duration) -> Self {
        Self { poll_interval }
    }
}

impl Connector for WsConnector {
    type Transport = WsTransport;

    fn connect(&mut self, url: &str, emitter: EventEmitter) -> Result<WsTransport> {
        let request = url
            .into_client_request()
            .map_err(|e| FeedError::InvalidEndpoint(e.to_string()))?;
        let (outbound_tx, outbound_rx) = unbounded::<Outbound>();
        let poll_interval = self.poll_interval;

        thread::Builder::new()
            .name(format!("ws-conn-{}", emitter.generation()))
            .spawn(move || run_connection(request, outbound_rx, emitter, poll_interval))?;

        Ok(WsTransport {
            outbound: outbound_tx,
            closing: false,
        })
    }
}

/// Body of a connection thread.
fn run_connection(
    request: Request,
    outbound: Receiver<Outbound>,
    emitter: EventEmitter,
    poll_interval: Duration,
) {
    let mut socket = match open(request, poll_interval) {
        Ok(socket) => socket,
        Err(e) => {
            error!("Connection {} failed to open: {}", emitter.generation(), e);
            emitter.emit(TransportEvent::Errored(e.to_string()));
            wait_for_close(&outbound);
            emitter.emit(TransportEvent::Closed(e.to_string()));
            return;
        }
    };
    emitter.emit(TransportEvent::Opened);

    let reason = match pump(&mut socket, &outbound, &emitter) {
        Ok(reason) => reason,
        Err(e) => {
            error!("Connection {} failed: {}", emitter.generation(), e);
            emitter.emit(TransportEvent::Errored(e.to_string()));
            wait_for_close(&outbound);
            e.to_string()
        }
    };
    info!("Connection {} closed: {}", emitter.generation(), reason);
    emitter.emit(TransportEvent::Closed(reason));
}

/// TCP connect plus WebSocket (and TLS for `wss://`) handshake.
fn open(request: Request, poll_interval: Duration) -> Result<Socket> {
    let uri = request.uri();
    let host = uri
        .host()
        .map(|h| h.trim_start_matches('[').trim_end_matches(']').to_string())
        .ok_or_else(|| FeedError::InvalidEndpoint(format!("missing host in {}", uri)))?;
    let port = uri.port_u16().unwrap_or(match uri.scheme_str() {
        Some("wss") => 443,
        _ => 80,
    });
    debug!("Opening TCP connection to {}:{}", host, port);

    let stream = TcpStream::connect((host.as_str(), port))?;
    stream.set_nodelay(true)?;
    let timeout_handle = stream.try_clone()?;

    let (socket, response) = tungstenite::client_tls(request, stream)
        .map_err(|e| FeedError::Handshake(e.to_string()))?;
    debug!("Handshake completed with status {}", response.status());

    timeout_handle.set_read_timeout(Some(poll_interval))?;
    Ok(socket)
}

/// Moves frames both ways until the connection closes. `Ok` carries the
/// close reason of an orderly shutdown from either side.
fn pump(
    socket: &mut Socket,
    outbound: &Receiver<Outbound>,
    emitter: &EventEmitter,
) -> std::result::Result<String, tungstenite::Error> {
    loop {
        loop {
            match outbound.try_recv() {
                Ok(Outbound::Frame(text)) => socket.send(Message::text(text))?,
                Ok(Outbound::Close) | Err(TryRecvError::Disconnected) => {
                    close_gracefully(socket);
                    return Ok(String::from("closed by client"));
                }
                Err(TryRecvError::Empty) => break,
            }
        }

        match socket.read() {
            Ok(Message::Text(text)) => {
                emitter.emit(TransportEvent::Frame(text));
            }
            Ok(Message::Close(frame)) => {
                // flush the automatic close reply
                let _ = socket.flush();
                let reason = frame
                    .map(|f| format!("closed by server: {} {}", u16::from(f.code), f.reason))
                    .unwrap_or_else(|| String::from("closed by server"));
                return Ok(reason);
            }
            Ok(other) => debug!("Ignoring non-text frame: {:?}", other),
            Err(tungstenite::Error::Io(e)) if is_timeout(e.kind()) => {}
            Err(tungstenite::Error::ConnectionClosed) => {
                return Ok(String::from("connection closed"));
            }
            Err(e) => return Err(e),
        }
    }
}

fn close_gracefully(socket: &mut Socket) {
    if let Err(e) = socket.close(None) {
        debug!("Close frame not sent: {}", e);
        return;
    }
    let deadline = Instant::now() + CLOSE_GRACE;
    while Instant::now() < deadline {
        match socket.read() {
            Ok(_) => {}
            Err(tungstenite::Error::Io(e)) if is_timeout(e.kind()) => {}
            Err(_) => return,
        }
    }
    warn!("Peer did not acknowledge close within {:?}", CLOSE_GRACE);
}

fn wait_for_close(outbound: &Receiver<Outbound>) {
    loop {
        match outbound.recv() {
            Ok(Outbound::Close) | Err(_) => return,
            Ok(Outbound::Frame(_)) => debug!("Dropping frame for failed connection"),
        }
    }
}

fn is_timeout(kind: ErrorKind) -> bool {
    matches!(kind, ErrorKind::WouldBlock | ErrorKind::TimedOut)
}
