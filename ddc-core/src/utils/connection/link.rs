//! Network Join Module
//!
//! Tracks station join progress as an explicit state machine. Events reported
//! by the network collaborator (join started, link lost, address acquired)
//! drive the transitions; each transition yields the action the caller should
//! take next. Reconnects after a link loss are bounded by a retry limit that
//! resets whenever an address is acquired.

use embassy_net::{Ipv4Cidr, Stack};
use embassy_time::{Duration, Timer};

/// Reconnect attempts allowed after a link loss before giving up.
pub const DEFAULT_MAX_RETRIES: u8 = 5;

/// How often `wait_for_network` samples the stack.
const POLL_INTERVAL: Duration = Duration::from_millis(500);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LinkState {
    Idle,
    Connecting,
    Retrying { attempt: u8 },
    Connected,
    Failed,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LinkEvent {
    /// The interface came up and a join can begin.
    Started,
    /// The link to the access point dropped.
    Disconnected,
    /// An IPv4 address was assigned.
    GotIp,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LinkAction {
    /// (Re)issue a connect to the access point.
    Connect,
    /// Connectivity established; start serving.
    Ready,
    /// Retry budget exhausted.
    GiveUp,
    /// Nothing to do for this event in the current state.
    Ignore,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LinkError {
    RetriesExhausted,
}

pub struct NetworkJoin {
    state: LinkState,
    max_retries: u8,
}

impl Default for NetworkJoin {
    fn default() -> Self {
        Self::new(DEFAULT_MAX_RETRIES)
    }
}

impl NetworkJoin {
    pub const fn new(max_retries: u8) -> Self {
        Self {
            state: LinkState::Idle,
            max_retries,
        }
    }

    pub const fn state(&self) -> LinkState {
        self.state
    }

    pub fn is_connected(&self) -> bool {
        self.state == LinkState::Connected
    }

    /// Apply `event` and return the action it calls for.
    pub fn handle(
        &mut self,
        event: LinkEvent,
    ) -> LinkAction {
        use LinkEvent as E;
        use LinkState as S;

        let (next, action) = match (self.state, event) {
            (S::Idle, E::Started) => {
                tracing::info!("starting network join");
                (S::Connecting, LinkAction::Connect)
            }
            (S::Connecting | S::Retrying { .. } | S::Connected, E::Disconnected) => {
                let attempt = match self.state {
                    S::Retrying { attempt } => attempt,
                    _ => 0,
                };
                if attempt < self.max_retries {
                    let attempt = attempt + 1;
                    tracing::warn!(attempt, max = self.max_retries, "reconnecting");
                    (S::Retrying { attempt }, LinkAction::Connect)
                } else {
                    tracing::error!(max = self.max_retries, "network join failed");
                    (S::Failed, LinkAction::GiveUp)
                }
            }
            (S::Connected, E::GotIp) => (S::Connected, LinkAction::Ignore),
            (_, E::GotIp) => (S::Connected, LinkAction::Ready),
            (state, _) => (state, LinkAction::Ignore),
        };

        self.state = next;
        action
    }
}

/// Block until `stack` has an IPv4 address, feeding observed link changes
/// into `join`.
///
/// Returns the assigned address, or an error once the retry budget is spent.
/// The embassy-net runner and the link driver rejoin on their own, so a
/// [`LinkAction::Connect`] here only counts the attempt against the budget.
pub async fn wait_for_network(
    stack: Stack<'_>,
    join: &mut NetworkJoin,
) -> Result<Ipv4Cidr, LinkError> {
    join.handle(LinkEvent::Started);
    let mut link_was_up = false;

    tracing::info!("Waiting to get IP address...");
    loop {
        let link_up = stack.is_link_up();
        if link_was_up && !link_up && join.handle(LinkEvent::Disconnected) == LinkAction::GiveUp {
            return Err(LinkError::RetriesExhausted);
        }
        link_was_up = link_up;

        if let Some(config) = stack.config_v4() {
            join.handle(LinkEvent::GotIp);
            tracing::info!("Got IP: {}", config.address);
            return Ok(config.address);
        }
        Timer::after(POLL_INTERVAL).await;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_join_happy_path() {
        let mut join = NetworkJoin::default();
        assert_eq!(join.state(), LinkState::Idle);
        assert_eq!(join.handle(LinkEvent::Started), LinkAction::Connect);
        assert_eq!(join.state(), LinkState::Connecting);
        assert_eq!(join.handle(LinkEvent::GotIp), LinkAction::Ready);
        assert!(join.is_connected());
        assert_eq!(join.handle(LinkEvent::GotIp), LinkAction::Ignore);
    }

    #[test]
    fn test_retries_are_bounded() {
        let mut join = NetworkJoin::new(2);
        join.handle(LinkEvent::Started);

        assert_eq!(join.handle(LinkEvent::Disconnected), LinkAction::Connect);
        assert_eq!(join.state(), LinkState::Retrying { attempt: 1 });
        assert_eq!(join.handle(LinkEvent::Disconnected), LinkAction::Connect);
        assert_eq!(join.state(), LinkState::Retrying { attempt: 2 });
        assert_eq!(join.handle(LinkEvent::Disconnected), LinkAction::GiveUp);
        assert_eq!(join.state(), LinkState::Failed);
        assert_eq!(join.handle(LinkEvent::Disconnected), LinkAction::Ignore);
        assert_eq!(join.state(), LinkState::Failed);
    }

    #[test]
    fn test_address_resets_retry_budget() {
        let mut join = NetworkJoin::new(1);
        join.handle(LinkEvent::Started);
        join.handle(LinkEvent::Disconnected);
        assert_eq!(join.handle(LinkEvent::GotIp), LinkAction::Ready);

        assert_eq!(join.handle(LinkEvent::Disconnected), LinkAction::Connect);
        assert_eq!(join.state(), LinkState::Retrying { attempt: 1 });
    }

    #[test]
    fn test_started_is_ignored_once_joining() {
        let mut join = NetworkJoin::default();
        join.handle(LinkEvent::Started);
        assert_eq!(join.handle(LinkEvent::Started), LinkAction::Ignore);
        assert_eq!(join.state(), LinkState::Connecting);
    }

    #[test]
    fn test_late_address_recovers_failed_join() {
        let mut join = NetworkJoin::new(0);
        join.handle(LinkEvent::Started);
        assert_eq!(join.handle(LinkEvent::Disconnected), LinkAction::GiveUp);
        assert_eq!(join.handle(LinkEvent::GotIp), LinkAction::Ready);
        assert!(join.is_connected());
    }
}
