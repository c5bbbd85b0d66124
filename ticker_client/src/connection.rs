//! Stream connection manager.
//!
//! `StreamClient` owns the connection lifecycle and is the only writer of the
//! connection status:
//!
//! ```text
//! DISCONNECTED -> CONNECTING -> CONNECTED -> DISCONNECTED -> ...
//! ```
//!
//! - Entering CONNECTING resets the session accumulator and asks the
//!   connector for a new transport (a fresh generation).
//! - `Opened` moves to CONNECTED and sends the catalog request.
//! - Every `Frame` is decoded and dispatched to the session; catalog
//!   responses publish labels and send subscriptions, ticks feed the throttle.
//! - `Errored` closes the transport, which comes back as `Closed`.
//! - `Closed` drops the transport and schedules exactly one reconnect after
//!   the shared update interval. There is no backoff and no retry cap.
//!
//! Events tagged with an older generation are ignored. Both timers (throttle
//! window and reconnect) are plain deadlines checked by the event loop, and
//! `shutdown` clears the reconnect deadline so a stopped client stays stopped.
use std::time::{Duration, Instant};

use crossbeam_channel::{Receiver, Sender, at, never, select, unbounded};
use log::{debug, error, info, warn};
use ticker_common::net::ConnectionStatus;
use ticker_common::protocol::{Message, Request};
use ticker_common::throttle::Throttle;
use ticker_common::{FeedError, Result};

use crate::model::record::TickRecord;
use crate::model::registry::{Dispatch, Session};
use crate::transport::{ConnectionEvent, Connector, EventEmitter, Transport, TransportEvent};
use crate::view::ViewUpdate;

type RecordsSink = Box<dyn FnMut(Vec<TickRecord>) + Send>;

/// Connection manager and session owner.
pub struct StreamClient<C: Connector> {
    url: String,
    connector: C,
    interval: Duration,
    status: ConnectionStatus,
    transport: Option<C::Transport>,
    generation: u64,
    events_tx: Sender<ConnectionEvent>,
    events_rx: Receiver<ConnectionEvent>,
    session: Session,
    gate: Throttle<Vec<TickRecord>, RecordsSink>,
    reconnect_at: Option<Instant>,
    updates: Sender<ViewUpdate>,
    stopped: bool,
}

impl<C: Connector> StreamClient<C> {
    /// Create a client for `url`. `interval` is both the throttle window for
    /// record snapshots and the reconnect delay. Updates for the view are
    /// published on `updates`.
    pub fn new(url: &str, connector: C, interval: Duration, updates: Sender<ViewUpdate>) -> Self {
        let (events_tx, events_rx) = unbounded();
        let records_tx = updates.clone();
        let sink: RecordsSink = Box::new(move |records| {
            if records_tx.send(ViewUpdate::Records(records)).is_err() {
                debug!("View is gone, dropping record snapshot");
            }
        });

        Self {
            url: String::from(url),
            connector,
            interval,
            status: ConnectionStatus::Disconnected,
            transport: None,
            generation: 0,
            events_tx,
            events_rx,
            session: Session::new(),
            gate: Throttle::new(sink, interval, false),
            reconnect_at: None,
            updates,
            stopped: false,
        }
    }

    /// Current connection status.
    pub fn status(&self) -> ConnectionStatus {
        self.status
    }

    /// The session accumulator of the current connection.
    pub fn session(&self) -> &Session {
        &self.session
    }

    /// Generation of the latest connection attempt.
    pub fn generation(&self) -> u64 {
        self.generation
    }

    /// When the pending reconnect fires, if one is scheduled.
    pub fn reconnect_at(&self) -> Option<Instant> {
        self.reconnect_at
    }

    /// Earliest moment the event loop has to wake up for a timer.
    pub fn next_deadline(&self) -> Option<Instant> {
        match (self.gate.deadline(), self.reconnect_at) {
            (Some(a), Some(b)) => Some(a.min(b)),
            (a, b) => a.or(b),
        }
    }

    /// First connection attempt.
    pub fn start(&mut self, now: Instant) {
        self.connect(now);
    }

    /// Runs the event loop until a message arrives on `stop` (or its sender
    /// is dropped).
    pub fn run(mut self, stop: Receiver<()>) -> Result<()> {
        let events = self.events_rx.clone();
        self.start(Instant::now());

        loop {
            let timer = match self.next_deadline() {
                Some(deadline) => at(deadline),
                None => never(),
            };
            select! {
                recv(stop) -> _ => {
                    info!("Stop requested");
                    self.shutdown();
                    return Ok(());
                },
                recv(events) -> msg => {
                    let event = msg.map_err(|e| FeedError::ChannelRecv(e.to_string()))?;
                    self.handle_event(event, Instant::now());
                },
                recv(timer) -> _ => self.on_timer(Instant::now()),
            }
        }
    }

    /// Fires whichever timers are due at `now`.
    pub fn on_timer(&mut self, now: Instant) {
        if self.reconnect_at.is_some_and(|due| due <= now) {
            self.reconnect_at = None;
            if !self.stopped {
                self.connect(now);
            }
        }
        self.gate.poll(now);
    }

    /// Feeds one transport event into the state machine.
    pub fn handle_event(&mut self, event: ConnectionEvent, now: Instant) {
        if self.stopped || event.generation != self.generation {
            debug!(
                "Ignoring {:?} from connection {} (current {})",
                event.event, event.generation, self.generation
            );
            return;
        }
        match event.event {
            TransportEvent::Opened => self.on_opened(),
            TransportEvent::Frame(text) => self.on_frame(&text, now),
            TransportEvent::Errored(reason) => self.on_error(&reason),
            TransportEvent::Closed(reason) => self.on_closed(&reason, now),
        }
    }

    /// Tears the client down: closes the transport and cancels the pending
    /// reconnect. Terminal for this instance.
    pub fn shutdown(&mut self) {
        self.stopped = true;
        self.reconnect_at = None;
        if let Some(mut transport) = self.transport.take() {
            transport.close();
        }
        self.set_status(ConnectionStatus::Disconnected);
        info!("Stream client stopped");
    }

    fn connect(&mut self, now: Instant) {
        self.reconnect_at = None;
        self.session.reset();
        self.generation += 1;
        self.set_status(ConnectionStatus::Connecting);
        info!("Connecting to {} (attempt {})", self.url, self.generation);

        let emitter = EventEmitter::new(self.generation, self.events_tx.clone());
        match self.connector.connect(&self.url, emitter) {
            Ok(transport) => self.transport = Some(transport),
            Err(e) => {
                error!("Failed to start connection: {}", e);
                self.set_status(ConnectionStatus::Disconnected);
                self.schedule_reconnect(now);
            }
        }
    }

    fn on_opened(&mut self) {
        self.set_status(ConnectionStatus::Connected);
        if let Err(e) = self.send(&Request::get_symbols()) {
            error!("Failed to request catalog: {}", e);
        }
    }

    fn on_frame(&mut self, text: &str, now: Instant) {
        let message = Message::decode(text);
        match self.session.dispatch(&message) {
            Dispatch::Catalog {
                labels,
                subscriptions,
            } => {
                self.publish(ViewUpdate::Labels(labels));
                for request in &subscriptions {
                    if let Err(e) = self.send(request) {
                        error!("Failed to subscribe (request {}): {}", request.id, e);
                        break;
                    }
                }
                info!("Subscribed to {} tickers", subscriptions.len());
            }
            Dispatch::Snapshot(records) => self.gate.call(now, records),
            Dispatch::Ignored => debug!("Ignoring frame: {}", text),
        }
    }

    fn on_error(&mut self, reason: &str) {
        warn!("Transport error: {}", reason);
        if let Some(transport) = self.transport.as_mut() {
            transport.close();
        }
    }

    fn on_closed(&mut self, reason: &str, now: Instant) {
        if self.status == ConnectionStatus::Disconnected {
            debug!("Duplicate close ignored: {}", reason);
            return;
        }
        error!("Connection closed: {}", reason);
        self.transport = None;
        self.set_status(ConnectionStatus::Disconnected);
        self.schedule_reconnect(now);
    }

    fn schedule_reconnect(&mut self, now: Instant) {
        let due = now + self.interval;
        info!("Reconnecting in {:?}", self.interval);
        self.reconnect_at = Some(due);
    }

    fn send(&mut self, request: &Request) -> Result<()> {
        let frame = request.to_json()?;
        match self.transport.as_mut() {
            Some(transport) => transport.send(frame),
            None => Err(FeedError::NotConnected),
        }
    }

    fn set_status(&mut self, status: ConnectionStatus) {
        if self.status == status {
            return;
        }
        self.status = status;
        self.publish(ViewUpdate::Status(status));
    }

    fn publish(&self, update: ViewUpdate) {
        if self.updates.send(update).is_err() {
            debug!("View is gone, dropping update");
        }
    }
}
