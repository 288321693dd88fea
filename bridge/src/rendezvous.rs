//! Single-slot rendezvous for the callback result protocol.
//!
//! A `Rendezvous` is created per call. Its `Resolver` half is parked in the
//! store while the export runs; whichever of `return_result` / `return_error`
//! fires first fills the slot. The driver then waits on the slot with a
//! deadline. Any delivery after the first is counted and reported instead of
//! silently replacing the outcome.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use crossbeam_channel::{bounded, Receiver, RecvTimeoutError, Sender, TrySendError};
use guestcall_abi::{AbiError, GuestResponse, HostValue};
use tracing::warn;

use crate::error::BridgeError;

/// What a callback handed to the host.
#[derive(Debug, Clone, PartialEq)]
pub enum Delivery {
    /// `return_result` with decoded values.
    Values(Vec<HostValue>),
    /// `return_error` with the decoded message.
    Error(String),
    /// A callback fired but its payload could not be decoded.
    Malformed(AbiError),
}

/// Producer half, cloned into the host callbacks.
#[derive(Debug, Clone)]
pub struct Resolver {
    tx: Sender<Delivery>,
    extra: Arc<AtomicUsize>,
}

impl Resolver {
    /// Fill the slot. Returns `false` if it was already filled.
    pub fn resolve(&self, delivery: Delivery) -> bool {
        match self.tx.try_send(delivery) {
            Ok(()) => true,
            Err(TrySendError::Full(_)) | Err(TrySendError::Disconnected(_)) => {
                let n = self.extra.fetch_add(1, Ordering::SeqCst) + 1;
                warn!(extra_deliveries = n, "result callback fired more than once");
                false
            }
        }
    }
}

/// Consumer half, owned by the invocation driver for one call.
#[derive(Debug)]
pub struct Rendezvous {
    rx: Receiver<Delivery>,
    resolver: Resolver,
}

impl Default for Rendezvous {
    fn default() -> Self {
        Self::new()
    }
}

impl Rendezvous {
    pub fn new() -> Self {
        let (tx, rx) = bounded(1);
        Self {
            rx,
            resolver: Resolver {
                tx,
                extra: Arc::new(AtomicUsize::new(0)),
            },
        }
    }

    /// A producer handle for this call.
    pub fn resolver(&self) -> Resolver {
        self.resolver.clone()
    }

    /// Wait up to `timeout` for exactly one delivery.
    pub fn wait(self, timeout: Duration) -> Result<GuestResponse, BridgeError> {
        let delivery = match self.rx.recv_timeout(timeout) {
            Ok(delivery) => delivery,
            Err(RecvTimeoutError::Timeout) => {
                return Err(BridgeError::protocol(format!(
                    "no result callback within {:?}",
                    timeout
                )))
            }
            Err(RecvTimeoutError::Disconnected) => {
                return Err(BridgeError::protocol("result callback channel closed"))
            }
        };

        let extra = self.resolver.extra.load(Ordering::SeqCst);
        if extra > 0 {
            return Err(BridgeError::protocol(format!(
                "result callback fired {} times, expected once",
                extra + 1
            )));
        }

        match delivery {
            Delivery::Values(values) => Ok(GuestResponse::Values(values)),
            Delivery::Error(message) => Ok(GuestResponse::Error(message)),
            Delivery::Malformed(err) => Err(err.into()),
        }
    }
}
