//! A sans-I/O HTTP/1.1 protocol engine.
//!
//! [`Connection`] turns bytes received off a transport into a stream of
//! [`Event`]s, and turns [`Event`]s the caller wants to send into bytes to
//! put on that transport - it never touches a socket, a timer, or a thread
//! itself. Everything it needs to decide is either in the bytes already
//! handed to it or in its own [`state`] machine.
//!
//! A minimal client-side round trip:
//!
//! ```
//! use http_machine::{Config, Connection, Event, HeaderList, NextEvent, Request, Role, Version};
//!
//! let mut conn = Connection::new(Config::new(Role::Client));
//! let mut headers = HeaderList::new();
//! headers.append(b"Host", b"example.com").unwrap();
//! let req = Request::new(b"GET", b"/", headers, Version::Http11).unwrap();
//! let bytes = conn.send(Event::Request(req)).unwrap().unwrap();
//! conn.send(Event::EndOfMessage(Default::default())).unwrap();
//! assert!(bytes.starts_with(b"GET / HTTP/1.1\r\n"));
//! ```

#[macro_use]
extern crate log;

pub mod body;
pub mod buffer;
pub mod connection;
pub mod error;
pub mod event;
pub mod headers;
pub mod reader;
pub mod role;
pub mod state;
pub mod version;
pub mod writer;

pub use body::{Framing, RequestContext};
pub use connection::{Config, Connection, NextEvent, DEFAULT_MAX_BUFFER_SIZE};
pub use error::{Error, ErrorKind};
pub use event::{
    ConnectionClosed, Data, EndOfMessage, Event, EventKind, InformationalResponse, Request,
    Response,
};
pub use headers::{HeaderList, HeaderName};
pub use role::Role;
pub use state::State;
pub use version::Version;
