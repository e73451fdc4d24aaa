//! The authentication status enumeration and the outcome reported to the
//! one-shot stop-completion listener.

/// Status of the authentication state machine.
///
/// `None` is the pre-`start` state set at construction; `Idle` is reached
/// either by tearing down from a failed state or by completing a graceful
/// `stop`. See the crate's design notes for why these are kept distinct
/// rather than conflated, as a nearby source comment once suggested.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AuthenticationStatus {
    None,
    Idle,
    Started,
    Authenticating,
    Authenticated,
    Refreshing,
    FailedTimeout,
    Failed,
    Deauthenticating,
}

impl AuthenticationStatus {
    /// Statuses from which `destroy`/`drop` is safe.
    #[must_use]
    pub fn is_terminal(self) -> bool {
        matches!(self, Self::None | Self::Idle | Self::Failed | Self::FailedTimeout)
    }
}

/// Result delivered to the one-shot `on_stop_completed` listener.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StopResult {
    Success,
    Error,
}
