//! Channel probe.
//!
//! [`probe`] makes a single bounded connection attempt to the physical
//! controller. On success the opened connection is handed back inside
//! [`ProbeOutcome::Reachable`] and must be reused for the whole session:
//! reconnecting per command would add connection latency on top of the
//! calibrated open-loop waits. On any failure there is no retry.

use std::io;
use std::net::{SocketAddr, TcpStream, ToSocketAddrs};
use std::time::{Duration, Instant};

use pointsman_types::{ArmError, ChannelCapability};
use tracing::{info, warn};

use crate::link::TcpLink;

/// Result of the one-shot probe.
pub enum ProbeOutcome {
    /// The controller accepted a connection. Keep the link for the session.
    Reachable(TcpLink),
    /// The controller could not be reached. Carries the
    /// [`ArmError::ChannelUnreachable`] describing why.
    Unreachable(ArmError),
}

impl ProbeOutcome {
    pub fn capability(&self) -> ChannelCapability {
        match self {
            ProbeOutcome::Reachable(_) => ChannelCapability::PhysicalReachable,
            ProbeOutcome::Unreachable(_) => ChannelCapability::SimulationOnly,
        }
    }

    /// Take the opened link, if any.
    pub fn into_link(self) -> Option<TcpLink> {
        match self {
            ProbeOutcome::Reachable(link) => Some(link),
            ProbeOutcome::Unreachable(_) => None,
        }
    }
}

/// Try to connect to `address:port` within `timeout`.
///
/// `timeout` bounds the whole probe: every address `address` resolves to is
/// tried in turn against one shared deadline. The returned link has
/// `TCP_NODELAY` set and uses `timeout` as its write timeout so a stalled
/// controller cannot block a send forever.
pub fn probe(address: &str, port: u16, timeout: Duration) -> ProbeOutcome {
    let target = format!("{address}:{port}");
    if timeout.is_zero() {
        return fall_back(&target, "probe timeout must be non-zero".to_string());
    }
    let deadline = Instant::now() + timeout;

    let candidates: Vec<SocketAddr> = match (address, port).to_socket_addrs() {
        Ok(addrs) => addrs.collect(),
        Err(e) => return fall_back(&target, format!("address resolution failed: {e}")),
    };
    if candidates.is_empty() {
        return fall_back(&target, "address resolved to nothing".to_string());
    }
    probe_candidates(&target, &candidates, deadline, timeout)
}

fn probe_candidates(
    target: &str,
    candidates: &[SocketAddr],
    deadline: Instant,
    write_timeout: Duration,
) -> ProbeOutcome {
    let mut last_error: Option<io::Error> = None;
    for &addr in candidates {
        let remaining = deadline.saturating_duration_since(Instant::now());
        if remaining.is_zero() {
            last_error = Some(io::Error::new(
                io::ErrorKind::TimedOut,
                "probe deadline passed before every address was tried",
            ));
            break;
        }
        match connect(addr, remaining, write_timeout) {
            Ok(link) => {
                info!(peer = %addr, "controller reachable");
                return ProbeOutcome::Reachable(link);
            }
            Err(e) => last_error = Some(e),
        }
    }
    let reason = last_error.map_or_else(|| "unknown error".to_string(), |e| e.to_string());
    fall_back(target, reason)
}

fn fall_back(target: &str, reason: String) -> ProbeOutcome {
    warn!(%target, %reason, "controller unreachable; continuing in simulation-only mode");
    ProbeOutcome::Unreachable(ArmError::ChannelUnreachable {
        address: target.to_string(),
        reason,
    })
}

fn connect(addr: SocketAddr, timeout: Duration, write_timeout: Duration) -> io::Result<TcpLink> {
    let stream = TcpStream::connect_timeout(&addr, timeout)?;
    stream.set_nodelay(true)?;
    stream.set_write_timeout(Some(write_timeout))?;
    Ok(TcpLink::new(stream, addr))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::link::CommandLink;
    use std::io::Read;
    use std::net::TcpListener;
    use std::thread;

    #[test]
    fn reachable_controller_yields_reusable_link() {
        let listener = TcpListener::bind("127.0.0.1:0").unwrap();
        let port = listener.local_addr().unwrap().port();
        let server = thread::spawn(move || {
            let (mut conn, _) = listener.accept().unwrap();
            let mut received = String::new();
            conn.read_to_string(&mut received).unwrap();
            received
        });

        let outcome = probe("127.0.0.1", port, Duration::from_secs(1));
        assert_eq!(outcome.capability(), ChannelCapability::PhysicalReachable);

        let mut link = outcome.into_link().expect("link");
        link.send("first").unwrap();
        link.send("second").unwrap();
        link.close().unwrap();

        // Both commands arrive on the single probed connection.
        assert_eq!(server.join().unwrap(), "first\nsecond\n");
    }

    #[test]
    fn refused_connection_falls_back_to_simulation() {
        let port = {
            let listener = TcpListener::bind("127.0.0.1:0").unwrap();
            listener.local_addr().unwrap().port()
        };
        let outcome = probe("127.0.0.1", port, Duration::from_secs(1));
        assert_eq!(outcome.capability(), ChannelCapability::SimulationOnly);
        match outcome {
            ProbeOutcome::Unreachable(ArmError::ChannelUnreachable { address, .. }) => {
                assert_eq!(address, format!("127.0.0.1:{port}"));
            }
            _ => panic!("expected ChannelUnreachable"),
        }
    }

    #[test]
    fn unroutable_address_is_bounded_by_timeout() {
        // TEST-NET-1 is reserved and never routed.
        let start = Instant::now();
        let outcome = probe("192.0.2.1", 30002, Duration::from_secs(1));
        assert_eq!(outcome.capability(), ChannelCapability::SimulationOnly);
        assert!(
            start.elapsed() <= Duration::from_millis(1200),
            "probe took {:?}",
            start.elapsed()
        );
    }

    #[test]
    fn several_unroutable_candidates_share_one_deadline() {
        let candidates: Vec<SocketAddr> = ["192.0.2.1:30002", "192.0.2.2:30002", "192.0.2.3:30002"]
            .iter()
            .map(|a| a.parse().unwrap())
            .collect();
        let timeout = Duration::from_millis(500);
        let start = Instant::now();
        let outcome = probe_candidates("ur5e.local:30002", &candidates, start + timeout, timeout);
        assert_eq!(outcome.capability(), ChannelCapability::SimulationOnly);
        assert!(
            start.elapsed() <= Duration::from_millis(700),
            "probe took {:?}",
            start.elapsed()
        );
    }

    #[test]
    fn expired_deadline_tries_nothing() {
        let candidates: Vec<SocketAddr> = vec!["127.0.0.1:30002".parse().unwrap()];
        let outcome = probe_candidates(
            "127.0.0.1:30002",
            &candidates,
            Instant::now(),
            Duration::from_secs(1),
        );
        match outcome {
            ProbeOutcome::Unreachable(ArmError::ChannelUnreachable { reason, .. }) => {
                assert!(reason.contains("deadline"), "{reason}");
            }
            _ => panic!("expected ChannelUnreachable"),
        }
    }

    #[test]
    fn zero_timeout_is_unreachable() {
        let outcome = probe("127.0.0.1", 30002, Duration::ZERO);
        assert!(outcome.into_link().is_none());
    }

    #[test]
    fn unresolvable_host_is_unreachable() {
        let outcome = probe("no such host", 30002, Duration::from_secs(1));
        assert_eq!(outcome.capability(), ChannelCapability::SimulationOnly);
    }
}
