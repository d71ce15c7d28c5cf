/// Which of the two parties on a connection this engine instance speaks for.
///
/// Every `Connection` fixes one role as "ours" and the other as "theirs";
/// the state machine itself is symmetric and tracks both.
#[derive(Copy, Clone, Debug, Eq, Hash, PartialEq)]
pub enum Role {
    Client,
    Server,
}

impl Role {
    pub fn other(self) -> Role {
        match self {
            Role::Client => Role::Server,
            Role::Server => Role::Client,
        }
    }
}
