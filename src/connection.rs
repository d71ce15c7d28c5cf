//! The façade binding buffer, reader, writer, and state machine together.
//!
//! Grounded on `h11/_connection.py`'s `Connection` class: one object per
//! transport connection, exposing `send`/`receive_data`/`next_event` and
//! hiding the (role, state, framing) dispatch that picks the active reader
//! or writer. Per spec.md's Design Notes, neither the reader nor the
//! writer is kept as a long-lived reference across a state transition -
//! the body reader/writer is the only piece of per-message state this
//! struct keeps, and it is always rebuilt from the `Request`/`Response`
//! event that started the message.

use crate::body::{self, Framing, RequestContext};
use crate::buffer::ReceiveBuffer;
use crate::error::{Error, ErrorKind};
use crate::event::{ConnectionClosed, Data, EndOfMessage, Event, InformationalResponse, Request, Response};
use crate::reader::{self, bodyreader::BodyReader};
use crate::role::Role;
use crate::state::{ConnectionState, State};
use crate::version::Version;
use crate::writer::{self, BodyWriter};

/// The default cap on buffered-but-unparsed bytes: enough for a realistic
/// request line plus a generous header block, per spec.md §5.
pub const DEFAULT_MAX_BUFFER_SIZE: usize = 16 * 1024;

/// Tunables a caller provides at construction time. There is no I/O
/// context to carry here (unlike the teacher's `Scope<C>`/`Context`,
/// which bundle a transport handle) - only the two knobs the sans-I/O
/// core itself needs.
#[derive(Debug, Clone, Copy)]
pub struct Config {
    pub role: Role,
    pub max_buffer_size: usize,
}

impl Config {
    pub fn new(role: Role) -> Config {
        Config { role, max_buffer_size: DEFAULT_MAX_BUFFER_SIZE }
    }

    pub fn with_max_buffer_size(mut self, max_buffer_size: usize) -> Config {
        self.max_buffer_size = max_buffer_size;
        self
    }
}

/// The result of pulling one event off the wire.
#[derive(Debug)]
pub enum NextEvent {
    Event(Event),
    /// The reader needs more bytes than are currently buffered.
    NeedData,
    /// Nothing will be produced right now even though bytes may be
    /// sitting in the buffer: either they are pipelined past the current
    /// request/response cycle, or the connection has entered a
    /// protocol-switch state where HTTP framing no longer applies.
    Paused,
}

/// Binds one `ReceiveBuffer`, one state machine, and the body
/// reader/writer for whichever message is currently in flight.
pub struct Connection {
    role: Role,
    max_buffer_size: usize,
    buf: ReceiveBuffer,
    state: ConnectionState,
    eof: bool,
    body_reader: Option<BodyReader>,
    body_writer: Option<BodyWriter>,
}

impl Connection {
    pub fn new(config: Config) -> Connection {
        Connection {
            role: config.role,
            max_buffer_size: config.max_buffer_size,
            buf: ReceiveBuffer::new(),
            state: ConnectionState::new(),
            eof: false,
            body_reader: None,
            body_writer: None,
        }
    }

    pub fn role(&self) -> Role {
        self.role
    }

    pub fn our_state(&self) -> State {
        self.state.state(self.role)
    }

    pub fn their_state(&self) -> State {
        self.state.state(self.role.other())
    }

    pub fn keep_alive(&self) -> bool {
        self.state.keep_alive
    }

    pub fn client_waiting_for_100_continue(&self) -> bool {
        self.state.client_waiting_for_100
    }

    /// The unconsumed buffer plus whether the peer has sent EOF - exposed
    /// once `SWITCHED_PROTOCOL` is reached, so the collaborator that owns
    /// the socket can hand the same bytes to whatever protocol the
    /// connection switched into.
    pub fn trailing_data(&self) -> (&[u8], bool) {
        (self.buf.as_slice(), self.eof)
    }

    // ---- sending -------------------------------------------------------

    /// Validates `event` against the state machine, serializes it, and
    /// returns the bytes to put on the wire. Returns `Ok(None)` only for
    /// `ConnectionClosed`, which has no wire form and simply marks our
    /// side half-closed.
    pub fn send(&mut self, event: Event) -> Result<Option<Vec<u8>>, Error> {
        if self.our_state() == State::Error {
            return Err(Error::Local(ErrorKind::AlreadyFailedOrClosed));
        }
        match event {
            Event::ConnectionClosed(_) => {
                self.apply_local(&Event::ConnectionClosed(ConnectionClosed))?;
                Ok(None)
            }
            Event::Request(req) => self.send_request(req),
            Event::InformationalResponse(resp) => self.send_informational(resp),
            Event::Response(resp) => self.send_response(resp),
            Event::Data(data) => self.send_data(data),
            Event::EndOfMessage(eom) => self.send_eom(eom),
        }
    }

    fn send_request(&mut self, req: Request) -> Result<Option<Vec<u8>>, Error> {
        let framing = writer::request_framing(&req)?;
        let bytes = writer::write_request_head(&req);
        trace!(
            "{:?} sending {} {:?} with {:?} framing",
            self.role,
            String::from_utf8_lossy(&req.method),
            String::from_utf8_lossy(&req.target),
            framing,
        );
        self.apply_local(&Event::Request(req))?;
        self.body_writer = Some(BodyWriter::for_framing(framing));
        Ok(Some(bytes))
    }

    fn send_informational(&mut self, resp: InformationalResponse) -> Result<Option<Vec<u8>>, Error> {
        let bytes = writer::write_informational_response_head(&resp);
        self.apply_local(&Event::InformationalResponse(resp))?;
        Ok(Some(bytes))
    }

    fn send_response(&mut self, resp: Response) -> Result<Option<Vec<u8>>, Error> {
        let ctx = self.request_context();
        let peer_version = self.state.peer_version(self.role).unwrap_or(Version::Http10);
        let (headers, framing, _need_close) = writer::plan_response(
            resp.status_code,
            &resp.headers,
            ctx,
            peer_version,
            self.state.keep_alive,
        )?;
        let repaired = Response { headers, ..resp };
        let bytes = writer::write_response_head(repaired.status_code, &repaired.reason, &repaired.headers);
        debug!(
            "{:?} sending {} response with {:?} framing (keep_alive={})",
            self.role, repaired.status_code, framing, self.state.keep_alive,
        );
        self.apply_local(&Event::Response(repaired))?;
        self.body_writer = Some(BodyWriter::for_framing(framing));
        Ok(Some(bytes))
    }

    fn send_data(&mut self, data: Data) -> Result<Option<Vec<u8>>, Error> {
        let bytes = self.body_writer.as_mut()
            .ok_or(Error::Local(ErrorKind::WrongState("send Data with no body in flight")))?
            .write_data(&data.data)?;
        self.apply_local(&Event::Data(data))?;
        Ok(Some(bytes))
    }

    fn send_eom(&mut self, eom: EndOfMessage) -> Result<Option<Vec<u8>>, Error> {
        let writer = self.body_writer.as_mut()
            .ok_or(Error::Local(ErrorKind::WrongState("send EndOfMessage with no message in flight")))?;
        let bytes = match writer.write_eom(&eom.headers) {
            Ok(bytes) => bytes,
            Err(err) => {
                self.state.set_error(self.role);
                return Err(err);
            }
        };
        self.apply_local(&Event::EndOfMessage(eom))?;
        self.body_writer = None;
        Ok(Some(bytes))
    }

    /// Runs the event through the state machine as our own action,
    /// marking our side `ERROR` on rejection (spec.md §4.4/§7: a send-side
    /// invalid event only ever disables our own side).
    fn apply_local(&mut self, event: &Event) -> Result<(), Error> {
        self.state.process_event(self.role, event).map_err(|kind| {
            warn!("{:?} rejected outgoing {}: {}", self.role, event.name(), kind);
            self.state.set_error(self.role);
            Error::Local(kind)
        })
    }

    /// The method/CONNECT-ness of the request this role's next outgoing
    /// response is answering, needed to resolve response framing
    /// (HEAD/CONNECT responses never carry a body regardless of headers).
    fn request_context(&self) -> RequestContext {
        match &self.state.request_method {
            None => RequestContext::none(),
            Some(method) => RequestContext {
                is_head: method.eq_ignore_ascii_case(b"HEAD"),
                is_connect: method.eq_ignore_ascii_case(b"CONNECT"),
            },
        }
    }

    // ---- receiving -------------------------------------------------------

    /// Appends bytes to the receive buffer. An empty slice signals that the
    /// peer has closed their write side; calling this again afterward is a
    /// caller error, since there is nothing further to append.
    pub fn receive_data(&mut self, bytes: &[u8]) -> Result<(), Error> {
        if self.eof {
            return Err(Error::Local(ErrorKind::AlreadyFailedOrClosed));
        }
        if bytes.is_empty() {
            self.eof = true;
        } else {
            self.buf.append(bytes);
        }
        Ok(())
    }

    /// Pulls the next event out of the buffer, or reports that more bytes
    /// (`NeedData`) or a protocol-switch/pipelining hold-off (`Paused`) is
    /// in effect.
    ///
    /// `SWITCHED_PROTOCOL` (ours or theirs) and "their state is DONE with
    /// pipelined bytes already buffered" are checked *before* attempting a
    /// read: in both cases any bytes present must never be interpreted as
    /// HTTP. `MIGHT_SWITCH_PROTOCOL` on our own side is different - it is
    /// only a reason to prefer `PAUSED` over `NEED_DATA` once a read has
    /// already come up empty, since the very event we are waiting for (the
    /// server's accept/deny `Response`) is what resolves it. Checking it
    /// upfront would make that response unreadable.
    pub fn next_event(&mut self) -> Result<NextEvent, Error> {
        let their_role = self.role.other();
        let their_state = self.state.state(their_role);
        let our_state = self.state.state(self.role);

        if their_state == State::Error {
            return Err(Error::Remote(ErrorKind::AlreadyFailedOrClosed));
        }
        if their_state == State::Closed {
            return Err(Error::Local(ErrorKind::AlreadyFailedOrClosed));
        }
        if our_state == State::SwitchedProtocol || their_state == State::SwitchedProtocol {
            trace!("{:?} paused: protocol already switched", self.role);
            return Ok(NextEvent::Paused);
        }
        if their_state == State::Done && !self.buf.is_empty() {
            trace!("{:?} paused: {} pipelined bytes past a DONE peer", self.role, self.buf.len());
            return Ok(NextEvent::Paused);
        }

        let outcome = match self.read_one(their_role, their_state) {
            Ok(outcome) => outcome,
            Err(err) => {
                warn!("{:?} sent unparseable bytes: {}", their_role, err);
                self.state.set_error(their_role);
                return Err(err);
            }
        };
        match outcome {
            Some(event) => {
                trace!("{:?} received {}", self.role, event.name());
                self.on_received(their_role, &event)?;
                self.buf.compress();
                Ok(NextEvent::Event(event))
            }
            None => {
                if self.buf.len() > self.max_buffer_size {
                    warn!("{:?} buffer overflow: {} bytes buffered, limit {}",
                        self.role, self.buf.len(), self.max_buffer_size);
                    self.state.set_error(their_role);
                    return Err(Error::Remote(ErrorKind::BufferOverflow));
                }
                if self.eof {
                    self.handle_eof(their_role, their_state)
                } else if our_state == State::MightSwitchProtocol {
                    Ok(NextEvent::Paused)
                } else {
                    Ok(NextEvent::NeedData)
                }
            }
        }
    }

    /// Dispatches to the reader selected by `(their_role, their_state)`,
    /// rederiving it fresh each call rather than caching it across
    /// transitions (spec.md §9's "cyclic state references" note) - except
    /// for the body reader, which genuinely needs to carry per-message
    /// progress (bytes remaining, chunk-parser sub-state) and so is kept
    /// in `self.body_reader` between calls.
    fn read_one(&mut self, their_role: Role, their_state: State) -> Result<Option<Event>, Error> {
        match (their_role, their_state) {
            (Role::Client, State::Idle) => reader::read_request_head(&mut self.buf),
            (Role::Server, State::Idle) | (Role::Server, State::SendResponse) => {
                reader::read_response_head(&mut self.buf)
            }
            (_, State::SendBody) => {
                let reader = self.body_reader.as_mut().ok_or(Error::Remote(ErrorKind::WrongState(
                    "receive a body with no framing established")))?;
                reader.read(&mut self.buf)
            }
            (_, State::MustClose) | (_, State::Done) | (_, State::MightSwitchProtocol) => {
                if self.buf.is_empty() {
                    Ok(None)
                } else {
                    Err(Error::Remote(ErrorKind::UnexpectedData))
                }
            }
            _ => Err(Error::Remote(ErrorKind::UnexpectedData)),
        }
    }

    fn handle_eof(&mut self, their_role: Role, their_state: State) -> Result<NextEvent, Error> {
        trace!("{:?} saw EOF in state {:?}", their_role, their_state);
        let event = match their_state {
            State::SendBody => {
                let reader = self.body_reader.as_ref().ok_or(Error::Remote(ErrorKind::WrongState(
                    "receive EOF with no framing established")))?;
                match reader.read_eof() {
                    Ok(event) => event,
                    Err(err) => {
                        warn!("{:?} EOF arrived mid-body: {}", their_role, err);
                        self.state.set_error(their_role);
                        return Err(err);
                    }
                }
            }
            State::Idle | State::Done | State::MustClose => Event::ConnectionClosed(ConnectionClosed),
            _ => {
                self.state.set_error(their_role);
                return Err(Error::Remote(ErrorKind::PeerClosedMidHeaders));
            }
        };
        self.on_received(their_role, &event)?;
        self.buf.compress();
        Ok(NextEvent::Event(event))
    }

    /// Runs the event through the state machine as the peer's action, and
    /// - for `Request`/`Response` - establishes the body reader/framing
    /// for whatever comes next.
    fn on_received(&mut self, their_role: Role, event: &Event) -> Result<(), Error> {
        self.state.process_event(their_role, event).map_err(|kind| {
            warn!("{:?} received an out-of-turn {}: {}", their_role, event.name(), kind);
            self.state.set_error(their_role);
            Error::Remote(kind)
        })?;
        match event {
            Event::Request(req) => {
                let framing = body::for_request(&req.headers).map_err(remote)?;
                trace!("{:?} body framing resolved to {:?}", their_role, framing);
                self.body_reader = Some(BodyReader::for_framing(framing));
            }
            Event::Response(resp) => {
                let ctx = self.request_context();
                let framing = body::for_response(resp.status_code, ctx, &resp.headers).map_err(remote)?;
                trace!("{:?} body framing resolved to {:?}", their_role, framing);
                self.body_reader = Some(BodyReader::for_framing(framing));
            }
            Event::EndOfMessage(_) => {
                self.body_reader = None;
            }
            _ => {}
        }
        Ok(())
    }

    // ---- reuse -------------------------------------------------------

    /// Resets both parties to `IDLE` for a new request/response cycle.
    /// Requires both parties `DONE`, `keep_alive` still true, and no
    /// pending protocol-switch proposal.
    pub fn start_next_cycle(&mut self) -> Result<(), Error> {
        self.state.start_next_cycle().map_err(Error::Local)?;
        self.body_reader = None;
        self.body_writer = None;
        self.buf.compress();
        Ok(())
    }
}

fn remote(err: Error) -> Error {
    Error::Remote(err.kind().clone())
}

impl BodyReader {
    /// Selects the reader variant for a freshly-determined [`Framing`].
    pub fn for_framing(framing: Framing) -> BodyReader {
        match framing {
            Framing::ContentLengthZero => BodyReader::done(),
            Framing::ContentLength(len) => BodyReader::content_length(len),
            Framing::Chunked => BodyReader::chunked(),
            Framing::ReadUntilClose => BodyReader::http10(),
        }
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::headers::HeaderList;

    fn headers(pairs: &[(&[u8], &[u8])]) -> HeaderList {
        let mut h = HeaderList::new();
        for (n, v) in pairs {
            h.append(n, v).unwrap();
        }
        h
    }

    fn request(target: &[u8], extra: &[(&[u8], &[u8])]) -> Event {
        let mut h = headers(&[(b"Host", b"example.com")]);
        for (n, v) in extra {
            h.append(n, v).unwrap();
        }
        Event::Request(Request::new(b"GET", target, h, Version::Http11).unwrap())
    }

    #[test]
    fn simple_get_round_trips_through_a_mirror_connection() {
        let mut client = Connection::new(Config::new(Role::Client));
        let mut server = Connection::new(Config::new(Role::Server));

        let req = request(b"/", &[(b"Content-Length", b"5")]);
        let bytes = client.send(req).unwrap().unwrap();
        server.receive_data(&bytes).unwrap();
        assert!(matches!(server.next_event().unwrap(), NextEvent::Event(Event::Request(_))));

        let data_bytes = client.send(Event::Data(Data::new(b"hello".to_vec()))).unwrap().unwrap();
        server.receive_data(&data_bytes).unwrap();
        match server.next_event().unwrap() {
            NextEvent::Event(Event::Data(d)) => assert_eq!(d.data, b"hello"),
            other => panic!("expected Data, got {:?}", other),
        }

        client.send(Event::EndOfMessage(EndOfMessage::default())).unwrap();
        assert!(matches!(server.next_event().unwrap(), NextEvent::Event(Event::EndOfMessage(_))));
        assert_eq!(server.our_state(), State::SendResponse);
    }

    #[test]
    fn needs_data_on_a_partial_request() {
        let mut server = Connection::new(Config::new(Role::Server));
        server.receive_data(b"GET / HTTP/1.1\r\nHost: x").unwrap();
        assert!(matches!(server.next_event().unwrap(), NextEvent::NeedData));
    }

    #[test]
    fn buffer_overflow_is_a_remote_error() {
        let mut server = Connection::new(Config::new(Role::Server).with_max_buffer_size(16));
        server.receive_data(b"GET / HTTP/1.1\r\nX-Pad: ").unwrap();
        server.receive_data(&vec![b'a'; 64]).unwrap();
        let err = server.next_event().unwrap_err();
        assert!(err.is_remote());
        assert_eq!(err.status_hint(), 431);
    }

    #[test]
    fn http10_response_forces_connection_close_header() {
        let mut server = Connection::new(Config::new(Role::Server));
        server.receive_data(b"GET / HTTP/1.0\r\n\r\n").unwrap();
        assert!(matches!(server.next_event().unwrap(), NextEvent::Event(Event::Request(_))));
        assert!(matches!(server.next_event().unwrap(), NextEvent::Event(Event::EndOfMessage(_))));
        assert!(!server.keep_alive());

        let resp = Response::new(200, HeaderList::new(), Version::Http11, b"OK").unwrap();
        let bytes = server.send(Event::Response(resp)).unwrap().unwrap();
        let text = String::from_utf8_lossy(&bytes);
        assert!(text.contains("connection: close"));
    }

    #[test]
    fn connect_switch_pauses_the_client_then_switches_both_sides() {
        let mut client = Connection::new(Config::new(Role::Client));
        let mut server = Connection::new(Config::new(Role::Server));

        let req = request(b"example.com:443", &[]);
        let req = if let Event::Request(r) = req {
            Request { method: b"CONNECT".to_vec(), ..r }
        } else {
            unreachable!()
        };
        let bytes = client.send(Event::Request(req)).unwrap().unwrap();
        client.send(Event::EndOfMessage(EndOfMessage::default())).unwrap();
        server.receive_data(&bytes).unwrap();
        assert!(matches!(server.next_event().unwrap(), NextEvent::Event(Event::Request(_))));
        assert!(matches!(server.next_event().unwrap(), NextEvent::Event(Event::EndOfMessage(_))));

        assert!(matches!(client.next_event().unwrap(), NextEvent::Paused));

        let resp = Response::new(200, HeaderList::new(), Version::Http11, b"Connection Established").unwrap();
        let resp_bytes = server.send(Event::Response(resp)).unwrap().unwrap();
        assert_eq!(server.our_state(), State::SwitchedProtocol);

        client.receive_data(&resp_bytes).unwrap();
        assert!(matches!(client.next_event().unwrap(), NextEvent::Event(Event::Response(_))));
        assert_eq!(client.our_state(), State::SwitchedProtocol);
    }

    #[test]
    fn start_next_cycle_requires_both_sides_done() {
        let mut client = Connection::new(Config::new(Role::Client));
        assert!(client.start_next_cycle().is_err());
    }
}
