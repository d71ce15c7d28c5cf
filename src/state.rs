//! The two-party connection state machine.
//!
//! HTTP/1.1 is really two coupled machines, one tracking what the client
//! has done and one tracking what the server has done, advancing together
//! off the same event stream. `ConnectionState` owns both, plus the small
//! set of auxiliary flags (`keep_alive`, pending protocol-switch proposals,
//! the 100-continue wait) that the pure per-event transition table can't
//! express on its own and that feed the *state-triggered* transitions run
//! after every event.

use crate::event::{Event, EventKind};
use crate::error::ErrorKind;
use crate::role::Role;
use crate::version::Version;

#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum State {
    Idle,
    SendResponse,
    SendBody,
    Done,
    MustClose,
    Closed,
    MightSwitchProtocol,
    SwitchedProtocol,
    Error,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SwitchProposals {
    pub upgrade: bool,
    pub connect: bool,
}

impl SwitchProposals {
    pub fn is_empty(&self) -> bool {
        !self.upgrade && !self.connect
    }

    fn clear(&mut self) {
        *self = SwitchProposals::default();
    }
}

/// The full state of a connection, from both parties' perspective.
#[derive(Debug)]
pub struct ConnectionState {
    client_state: State,
    server_state: State,
    pub keep_alive: bool,
    pub pending_switch: SwitchProposals,
    pub client_waiting_for_100: bool,
    pub client_http_version: Option<Version>,
    pub server_http_version: Option<Version>,
    pub request_method: Option<Vec<u8>>,
}

impl Default for ConnectionState {
    fn default() -> ConnectionState {
        ConnectionState {
            client_state: State::Idle,
            server_state: State::Idle,
            keep_alive: true,
            pending_switch: SwitchProposals::default(),
            client_waiting_for_100: false,
            client_http_version: None,
            server_http_version: None,
            request_method: None,
        }
    }
}

impl ConnectionState {
    pub fn new() -> ConnectionState {
        ConnectionState::default()
    }

    pub fn state(&self, role: Role) -> State {
        match role {
            Role::Client => self.client_state,
            Role::Server => self.server_state,
        }
    }

    /// The HTTP version declared by whichever party is not `our_role` -
    /// the version a response-side writer needs in order to decide whether
    /// it may offer chunked framing. Server's peer is the client (whose
    /// version arrived on the `Request`); client's peer is the server
    /// (whose version arrives on the `Response`/`InformationalResponse`).
    pub fn peer_version(&self, our_role: Role) -> Option<Version> {
        match our_role {
            Role::Server => self.client_http_version,
            Role::Client => self.server_http_version,
        }
    }

    /// Forces `role`'s state directly to `ERROR`, bypassing the transition
    /// table. Called by the connection facade after a send-side (own role)
    /// or receive-side (peer role) protocol violation.
    pub fn set_error(&mut self, role: Role) {
        match role {
            Role::Client => self.client_state = State::Error,
            Role::Server => self.server_state = State::Error,
        }
    }

    /// Advances both party machines for an event originated by `actor`,
    /// then runs auxiliary bookkeeping and state-triggered transitions to
    /// a fixed point.
    ///
    /// `actor` is always either the sender's own role (on `send`) or its
    /// complement (on receiving parsed bytes) - callers never need to pass
    /// anything else, because each event variant only ever belongs to one
    /// party.
    pub fn process_event(&mut self, actor: Role, event: &Event) -> Result<(), ErrorKind> {
        let kind = event.kind();
        let client_new = self.client_transition(actor, kind)?;
        let server_new = self.server_transition(actor, kind, event)?;
        if let Some(s) = client_new {
            self.client_state = s;
        }
        if let Some(s) = server_new {
            self.server_state = s;
        }
        self.update_aux(actor, event);
        self.apply_state_triggered();
        Ok(())
    }

    fn client_transition(&self, actor: Role, kind: EventKind) -> Result<Option<State>, ErrorKind> {
        use State::*;
        use EventKind::*;
        let new_state = match (self.client_state, actor, kind) {
            (Idle, Role::Client, Request) => Some(SendBody),
            (SendBody, Role::Client, Data) => Some(SendBody),
            (SendBody, Role::Client, EndOfMessage) => Some(Done),
            (s, Role::Client, ConnectionClosed) if s != Closed => Some(Closed),
            _ => None,
        };
        if new_state.is_none() && actor == Role::Client {
            return Err(ErrorKind::WrongState("send this event as the client"));
        }
        Ok(new_state)
    }

    fn server_transition(
        &self,
        actor: Role,
        kind: EventKind,
        event: &Event,
    ) -> Result<Option<State>, ErrorKind> {
        use State::*;
        use EventKind::*;
        let new_state = match (self.server_state, actor, kind) {
            (Idle, Role::Client, Request) => Some(SendResponse),
            // A response may be sent from IDLE to allow a server to reject
            // a request it couldn't even finish parsing (e.g. a 400 for a
            // malformed request line).
            (Idle, Role::Server, Response) => Some(SendBody),
            (SendResponse, Role::Server, InformationalResponse) => {
                Some(if self.is_upgrade_switch_accept(event) { SwitchedProtocol } else { SendResponse })
            }
            (SendResponse, Role::Server, Response) => {
                Some(if self.is_connect_switch_accept(event) { SwitchedProtocol } else { SendBody })
            }
            (SendBody, Role::Server, Data) => Some(SendBody),
            (SendBody, Role::Server, EndOfMessage) => Some(Done),
            (s, Role::Server, ConnectionClosed) if s != Closed => Some(Closed),
            _ => None,
        };
        if new_state.is_none() && actor == Role::Server {
            return Err(ErrorKind::WrongState("send this event as the server"));
        }
        Ok(new_state)
    }

    fn is_upgrade_switch_accept(&self, event: &Event) -> bool {
        matches!(event, Event::InformationalResponse(r) if r.status_code == 101)
            && self.pending_switch.upgrade
    }

    fn is_connect_switch_accept(&self, event: &Event) -> bool {
        matches!(event, Event::Response(r) if (200..300).contains(&r.status_code))
            && self.pending_switch.connect
    }

    fn update_aux(&mut self, actor: Role, event: &Event) {
        match event {
            Event::Request(req) => {
                self.client_http_version = Some(req.http_version);
                if req.http_version == Version::Http10 || req.headers.has_connection_close() {
                    self.keep_alive = false;
                }
                if req.headers.has_comma_token("expect", b"100-continue") {
                    self.client_waiting_for_100 = true;
                }
                self.pending_switch.connect = req.is_connect();
                self.pending_switch.upgrade = req.proposes_upgrade();
                self.request_method = Some(req.method.clone());
            }
            Event::InformationalResponse(_) => {
                self.client_waiting_for_100 = false;
            }
            Event::Response(resp) => {
                self.server_http_version = Some(resp.http_version);
                if resp.http_version == Version::Http10 || resp.headers.has_connection_close() {
                    self.keep_alive = false;
                }
                self.client_waiting_for_100 = false;
                self.pending_switch.clear();
            }
            Event::Data(_) | Event::EndOfMessage(_) => {
                if actor == Role::Client {
                    self.client_waiting_for_100 = false;
                }
            }
            Event::ConnectionClosed(_) => {}
        }
    }

    /// Applies the state-triggered transitions (spec'd priority: a pending
    /// switch proposal always beats an unconditional `keep_alive = false`
    /// close) to a fixed point.
    fn apply_state_triggered(&mut self) {
        loop {
            let mut changed = false;

            if !self.pending_switch.is_empty() && self.client_state == State::Done {
                self.client_state = State::MightSwitchProtocol;
                changed = true;
            }
            // Checked before the "proposals empty -> DONE" fallback below:
            // the Response that accepts a switch clears `pending_switch` in
            // the same `process_event` call that moves the server to
            // SWITCHED_PROTOCOL, so by the time this loop runs the
            // proposal is already gone. Without this ordering the fallback
            // would collapse the client straight back to DONE and the
            // switch could never be observed.
            if self.client_state == State::MightSwitchProtocol
                && self.server_state == State::SwitchedProtocol
            {
                self.client_state = State::SwitchedProtocol;
                changed = true;
            }

            if self.pending_switch.is_empty()
                && self.client_state == State::MightSwitchProtocol
            {
                self.client_state = State::Done;
                changed = true;
            }

            if !self.keep_alive {
                if self.client_state == State::Done {
                    self.client_state = State::MustClose;
                    changed = true;
                }
                if self.server_state == State::Done {
                    self.server_state = State::MustClose;
                    changed = true;
                }
            }

            if self.client_state == State::Closed
                && matches!(self.server_state, State::Done | State::Idle)
            {
                self.server_state = State::MustClose;
                changed = true;
            }
            if self.server_state == State::Closed
                && matches!(self.client_state, State::Done | State::Idle)
            {
                self.client_state = State::MustClose;
                changed = true;
            }

            if !changed {
                break;
            }
        }
    }

    /// Resets both parties to `IDLE` for a new request/response cycle on a
    /// reused connection. Only legal once both sides have finished the
    /// current cycle cleanly, with no pending close or protocol switch.
    pub fn start_next_cycle(&mut self) -> Result<(), ErrorKind> {
        if !(self.client_state == State::Done
            && self.server_state == State::Done
            && self.keep_alive
            && self.pending_switch.is_empty())
        {
            return Err(ErrorKind::NotReusable);
        }
        self.client_state = State::Idle;
        self.server_state = State::Idle;
        self.client_waiting_for_100 = false;
        self.request_method = None;
        Ok(())
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::event::{ConnectionClosed, EndOfMessage, Request, Response};
    use crate::headers::HeaderList;

    fn request(version: Version) -> Event {
        let mut h = HeaderList::new();
        if version == Version::Http11 {
            h.append(b"Host", b"example.com").unwrap();
        }
        Event::Request(Request::new(b"GET", b"/", h, version).unwrap())
    }

    fn response(code: u16) -> Event {
        Event::Response(Response::new(code, HeaderList::new(), Version::Http11, b"OK").unwrap())
    }

    #[test]
    fn request_advances_both_machines() {
        let mut s = ConnectionState::new();
        s.process_event(Role::Client, &request(Version::Http11)).unwrap();
        assert_eq!(s.state(Role::Client), State::SendBody);
        assert_eq!(s.state(Role::Server), State::SendResponse);
    }

    #[test]
    fn full_request_response_cycle_reaches_done() {
        let mut s = ConnectionState::new();
        s.process_event(Role::Client, &request(Version::Http11)).unwrap();
        s.process_event(Role::Client, &Event::EndOfMessage(EndOfMessage::default())).unwrap();
        assert_eq!(s.state(Role::Client), State::Done);

        s.process_event(Role::Server, &response(200)).unwrap();
        s.process_event(Role::Server, &Event::EndOfMessage(EndOfMessage::default())).unwrap();
        assert_eq!(s.state(Role::Server), State::Done);

        s.start_next_cycle().unwrap();
        assert_eq!(s.state(Role::Client), State::Idle);
        assert_eq!(s.state(Role::Server), State::Idle);
    }

    #[test]
    fn http10_request_forces_must_close_after_done() {
        let mut s = ConnectionState::new();
        s.process_event(Role::Client, &request(Version::Http10)).unwrap();
        s.process_event(Role::Client, &Event::EndOfMessage(EndOfMessage::default())).unwrap();
        assert_eq!(s.state(Role::Client), State::MustClose);
        assert!(s.start_next_cycle().is_err());
    }

    #[test]
    fn client_event_out_of_turn_is_an_error() {
        let mut s = ConnectionState::new();
        let err = s.process_event(Role::Client, &Event::EndOfMessage(EndOfMessage::default())).unwrap_err();
        assert_eq!(err, ErrorKind::WrongState("send this event as the client"));
    }

    #[test]
    fn idle_server_may_send_response_before_request_is_parsed() {
        let mut s = ConnectionState::new();
        s.process_event(Role::Server, &response(400)).unwrap();
        assert_eq!(s.state(Role::Server), State::SendBody);
    }

    #[test]
    fn connection_closed_moves_the_actor_to_closed() {
        let mut s = ConnectionState::new();
        s.process_event(Role::Client, &Event::ConnectionClosed(ConnectionClosed)).unwrap();
        assert_eq!(s.state(Role::Client), State::Closed);
        assert_eq!(s.state(Role::Server), State::MustClose);
    }

    fn connect_request() -> Event {
        let mut h = HeaderList::new();
        h.append(b"Host", b"example.com").unwrap();
        Event::Request(Request::new(b"CONNECT", b"example.com:443", h, Version::Http11).unwrap())
    }

    #[test]
    fn accepted_connect_switch_reaches_switched_protocol_on_both_sides() {
        // Regression test: the proposal-accepting Response clears
        // `pending_switch` in the very call that also moves the server to
        // SWITCHED_PROTOCOL, so the fixed-point loop must land the client
        // on SWITCHED_PROTOCOL too rather than falling back to DONE.
        let mut s = ConnectionState::new();
        s.process_event(Role::Client, &connect_request()).unwrap();
        s.process_event(Role::Client, &Event::EndOfMessage(EndOfMessage::default())).unwrap();
        assert_eq!(s.state(Role::Client), State::MightSwitchProtocol);

        s.process_event(Role::Server, &response(200)).unwrap();
        assert_eq!(s.state(Role::Server), State::SwitchedProtocol);
        assert_eq!(s.state(Role::Client), State::SwitchedProtocol);
    }

    #[test]
    fn denied_connect_switch_falls_back_to_done_then_must_close() {
        let mut s = ConnectionState::new();
        s.process_event(Role::Client, &connect_request()).unwrap();
        s.process_event(Role::Client, &Event::EndOfMessage(EndOfMessage::default())).unwrap();
        assert_eq!(s.state(Role::Client), State::MightSwitchProtocol);

        s.process_event(Role::Server, &response(407)).unwrap();
        assert_eq!(s.state(Role::Server), State::SendBody);
        assert_eq!(s.state(Role::Client), State::Done);
    }
}
