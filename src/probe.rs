//! SSH reachability probe.
//!
//! One attempt connects to the SSH port and waits for the server banner, each
//! step bounded by [`ProbePolicy::attempt_timeout`]. Refused connections,
//! unreachable hosts and name resolution failures mean "not up yet" and are
//! retried after [`ProbePolicy::retry_delay`]. Timed out or blocked connects
//! and connections that stay silent are retried immediately. Any other socket
//! error ends the wait.

use crate::error::{PccVmError, Result};
use std::io::{self, Read};
use std::net::{SocketAddr, TcpStream, ToSocketAddrs};
use std::time::{Duration, Instant};
use tracing::debug;

pub const SSH_PORT: u16 = 22;

#[derive(Debug, Clone)]
pub struct ProbePolicy {
    pub port: u16,
    pub attempt_timeout: Duration,
    pub retry_delay: Duration,
    /// Overall bound on the wait; `None` retries forever.
    /// Set from `clone.ssh_timeout_secs`.
    pub max_wait: Option<Duration>,
}

impl Default for ProbePolicy {
    fn default() -> Self {
        Self {
            port: SSH_PORT,
            attempt_timeout: Duration::from_secs(5),
            retry_delay: Duration::from_secs(2),
            max_wait: None,
        }
    }
}

#[derive(Debug)]
pub enum ProbeOutcome {
    /// sshd accepted the connection and sent its banner.
    Ready { banner: String },
    /// Not reachable yet; `backoff` asks the caller to sleep before retrying.
    Retry { reason: String, backoff: bool },
    Failed(io::Error),
}

/// Whether a socket error means the host is still coming up and the next
/// attempt should wait for the retry delay.
pub fn is_transient(kind: io::ErrorKind) -> bool {
    matches!(
        kind,
        io::ErrorKind::ConnectionRefused | io::ErrorKind::HostUnreachable
    )
}

/// Errors retried straight away, without the retry delay.
pub fn is_retried_immediately(kind: io::ErrorKind) -> bool {
    matches!(
        kind,
        io::ErrorKind::TimedOut | io::ErrorKind::WouldBlock | io::ErrorKind::PermissionDenied
    )
}

fn classify(err: io::Error) -> ProbeOutcome {
    let kind = err.kind();
    if is_transient(kind) || is_retried_immediately(kind) {
        ProbeOutcome::Retry {
            reason: err.to_string(),
            backoff: is_transient(kind),
        }
    } else {
        ProbeOutcome::Failed(err)
    }
}

/// Make a single connection attempt to `host`.
pub fn probe_once(host: &str, policy: &ProbePolicy) -> ProbeOutcome {
    let addrs: Vec<SocketAddr> = match (host, policy.port).to_socket_addrs() {
        Ok(addrs) => addrs.collect(),
        Err(e) => {
            return ProbeOutcome::Retry {
                reason: format!("cannot resolve {}: {}", host, e),
                backoff: true,
            }
        }
    };
    let Some(addr) = addrs.first() else {
        return ProbeOutcome::Retry {
            reason: format!("no address for {}", host),
            backoff: true,
        };
    };

    let mut stream = match TcpStream::connect_timeout(addr, policy.attempt_timeout) {
        Ok(stream) => stream,
        Err(e) => return classify(e),
    };

    if let Err(e) = stream.set_read_timeout(Some(policy.attempt_timeout)) {
        return ProbeOutcome::Failed(e);
    }

    let mut buf = [0u8; 256];
    match stream.read(&mut buf) {
        Ok(0) => ProbeOutcome::Retry {
            reason: "connection closed before banner".to_string(),
            backoff: false,
        },
        Ok(n) => ProbeOutcome::Ready {
            banner: String::from_utf8_lossy(&buf[..n]).trim().to_string(),
        },
        Err(e) if matches!(e.kind(), io::ErrorKind::WouldBlock | io::ErrorKind::TimedOut) => {
            ProbeOutcome::Retry {
                reason: "no banner within timeout".to_string(),
                backoff: false,
            }
        }
        Err(e) => classify(e),
    }
}

/// Probe until sshd answers, calling `on_retry` before every retry.
///
/// Returns the server banner.
pub fn wait_for_ssh(
    host: &str,
    policy: &ProbePolicy,
    mut on_retry: impl FnMut(&str),
) -> Result<String> {
    let started = Instant::now();
    loop {
        match probe_once(host, policy) {
            ProbeOutcome::Ready { banner } => {
                debug!(host, %banner, "sshd accepting connections");
                return Ok(banner);
            }
            ProbeOutcome::Failed(e) => {
                return Err(PccVmError::SshUnreachable {
                    host: host.to_string(),
                    reason: e.to_string(),
                })
            }
            ProbeOutcome::Retry { reason, backoff } => {
                debug!(host, %reason, "ssh not ready");
                if let Some(max_wait) = policy.max_wait {
                    if started.elapsed() >= max_wait {
                        return Err(PccVmError::SshUnreachable {
                            host: host.to_string(),
                            reason: format!(
                                "still not reachable after {}s ({})",
                                max_wait.as_secs(),
                                reason
                            ),
                        });
                    }
                }
                on_retry(&reason);
                if backoff {
                    std::thread::sleep(policy.retry_delay);
                }
            }
        }
    }
}
