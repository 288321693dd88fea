//! Result callbacks registered with the Wasmtime linker.
//!
//! The callback protocol exposes two host functions to the guest:
//!
//! - `return_result(ptr, count)`: `count` result entries at `ptr`
//! - `return_error(ptr, len)`: a `len`-byte message at `ptr`
//!
//! Each decodes its payload immediately, while the guest memory it points
//! at is still live, and resolves the rendezvous of the in-flight call.

use guestcall_abi::results::{decode_results, read_error_message};
use guestcall_abi::{AbiError, LinearMemory, UnknownTagPolicy};
use tracing::{debug, trace};
use wasmtime::{Caller, Linker};

use crate::error::BridgeError;
use crate::host_impl::HostState;
use crate::memory::GuestMemory;
use crate::rendezvous::Delivery;

/// Import name of the success callback.
pub const RETURN_RESULT: &str = "return_result";

/// Import name of the error callback.
pub const RETURN_ERROR: &str = "return_error";

/// Register `return_result` and `return_error` under `module`.
pub fn register_result_callbacks(
    linker: &mut Linker<HostState>,
    module: &str,
) -> Result<(), BridgeError> {
    linker.func_wrap(
        module,
        RETURN_RESULT,
        |mut caller: Caller<'_, HostState>, ptr: i32, count: i32| -> anyhow::Result<()> {
            trace!(ptr, count, "return_result");
            deliver(&mut caller, RETURN_RESULT, |mem, policy| {
                decode_results(mem, ptr as u32, count as u32, policy).map(Delivery::Values)
            })
        },
    )?;

    linker.func_wrap(
        module,
        RETURN_ERROR,
        |mut caller: Caller<'_, HostState>, ptr: i32, len: i32| -> anyhow::Result<()> {
            trace!(ptr, len, "return_error");
            deliver(&mut caller, RETURN_ERROR, |mem, _| {
                read_error_message(mem, ptr as u32, len as u32).map(Delivery::Error)
            })
        },
    )?;

    Ok(())
}

/// Decode a callback payload and hand it to the waiting call.
///
/// A payload that fails to decode is still delivered, as `Malformed`, so
/// the driver reports it instead of timing out. Only a callback with no
/// call in flight traps the guest.
fn deliver<F>(caller: &mut Caller<'_, HostState>, name: &str, decode: F) -> anyhow::Result<()>
where
    F: FnOnce(&dyn LinearMemory, UnknownTagPolicy) -> Result<Delivery, AbiError>,
{
    let resolver = caller
        .data()
        .resolver
        .clone()
        .ok_or_else(|| anyhow::anyhow!("{} called with no guest call in flight", name))?;
    let policy = caller.data().unknown_tags;
    let export = caller.data().memory_export.clone();

    let delivery = match caller.get_export(&export).and_then(|e| e.into_memory()) {
        Some(memory) => {
            let mem = GuestMemory::new(memory, &mut *caller);
            decode(&mem, policy).unwrap_or_else(Delivery::Malformed)
        }
        None => Delivery::Malformed(AbiError::malformed(format!(
            "no memory export '{}'",
            export
        ))),
    };

    if let Delivery::Malformed(err) = &delivery {
        debug!(callback = name, error = %err, "undecodable callback payload");
    }
    resolver.resolve(delivery);
    Ok(())
}
