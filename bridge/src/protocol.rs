//! Result-delivery protocols.
//!
//! Guests use one of two conventions to hand results back, fixed when the
//! bridge is built:
//!
//! - [`HeaderProtocol`]: the export has signature `(table, count) -> i32` and
//!   returns the address of a 9-byte result descriptor.
//! - [`CallbackProtocol`]: the export has signature `(table, count) -> ()`
//!   and calls `return_result` or `return_error` exactly once before it
//!   returns.
//!
//! Both produce a [`GuestResponse`]; the invocation driver turns an error
//! response into [`BridgeError::GuestReportedError`].

use guestcall_abi::results::read_response;
use guestcall_abi::GuestResponse;
use tracing::trace;
use wasmtime::{Instance, Linker, Store, Trap, TypedFunc, WasmResults};

use crate::allocator::GuestExports;
use crate::config::BridgeConfig;
use crate::error::BridgeError;
use crate::host_impl::HostState;
use crate::linker::register_result_callbacks;
use crate::memory::GuestMemory;
use crate::rendezvous::Rendezvous;

/// A guest result-delivery convention.
pub trait ResultProtocol {
    /// Short name used in logs and error messages.
    const NAME: &'static str;

    /// Register any host imports the convention needs.
    fn register(_linker: &mut Linker<HostState>, _config: &BridgeConfig) -> Result<(), BridgeError> {
        Ok(())
    }

    /// Invoke `export` with an already populated argument table and collect
    /// the guest's response.
    fn invoke(
        store: &mut Store<HostState>,
        instance: &Instance,
        exports: &GuestExports,
        export: &str,
        table_ptr: u32,
        count: u32,
        config: &BridgeConfig,
    ) -> Result<GuestResponse, BridgeError>;
}

/// Synchronous protocol: the export returns a result descriptor pointer.
#[derive(Debug, Clone, Copy, Default)]
pub struct HeaderProtocol;

impl ResultProtocol for HeaderProtocol {
    const NAME: &'static str = "header";

    fn invoke(
        store: &mut Store<HostState>,
        instance: &Instance,
        exports: &GuestExports,
        export: &str,
        table_ptr: u32,
        count: u32,
        config: &BridgeConfig,
    ) -> Result<GuestResponse, BridgeError> {
        let func = typed_export::<i32>(store, instance, export, Self::NAME)?;
        let descriptor = handle_trap(func.call(&mut *store, (table_ptr as i32, count as i32)))?;
        trace!(export, descriptor, "result descriptor");

        let mem = GuestMemory::new(exports.memory, &mut *store);
        Ok(read_response(&mem, descriptor as u32, config.unknown_tags)?)
    }
}

/// Callback protocol: the guest calls `return_result` / `return_error`.
#[derive(Debug, Clone, Copy, Default)]
pub struct CallbackProtocol;

impl ResultProtocol for CallbackProtocol {
    const NAME: &'static str = "callback";

    fn register(linker: &mut Linker<HostState>, config: &BridgeConfig) -> Result<(), BridgeError> {
        register_result_callbacks(linker, &config.callback_module)
    }

    fn invoke(
        store: &mut Store<HostState>,
        instance: &Instance,
        _exports: &GuestExports,
        export: &str,
        table_ptr: u32,
        count: u32,
        config: &BridgeConfig,
    ) -> Result<GuestResponse, BridgeError> {
        let func = typed_export::<()>(store, instance, export, Self::NAME)?;

        let rendezvous = Rendezvous::new();
        store.data_mut().arm(rendezvous.resolver());
        let outcome = handle_trap(func.call(&mut *store, (table_ptr as i32, count as i32)));
        store.data_mut().disarm();
        outcome?;

        rendezvous.wait(config.callback_timeout)
    }
}

/// Look up `export` as a `(table, count) -> R` function.
fn typed_export<R: WasmResults>(
    store: &mut Store<HostState>,
    instance: &Instance,
    export: &str,
    protocol: &str,
) -> Result<TypedFunc<(i32, i32), R>, BridgeError> {
    let func = instance
        .get_func(&mut *store, export)
        .ok_or_else(|| BridgeError::MissingExport(export.to_string()))?;
    func.typed::<(i32, i32), R>(&*store).map_err(|e| {
        BridgeError::protocol(format!(
            "export '{}' does not match the {} protocol: {}",
            export, protocol, e
        ))
    })
}

/// Handle a guest function call result, converting traps to BridgeError.
///
/// Fuel exhaustion → `BridgeError::FuelExhausted`
/// Other traps → `BridgeError::GuestTrapped`
pub(crate) fn handle_trap<R>(result: Result<R, anyhow::Error>) -> Result<R, BridgeError> {
    match result {
        Ok(val) => Ok(val),
        Err(e) => {
            if e.downcast_ref::<Trap>() == Some(&Trap::OutOfFuel) {
                Err(BridgeError::FuelExhausted)
            } else {
                Err(BridgeError::GuestTrapped(format!("{:#}", e)))
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_handle_trap_fuel() {
        let err = handle_trap::<()>(Err(anyhow::Error::new(Trap::OutOfFuel))).unwrap_err();
        assert!(matches!(err, BridgeError::FuelExhausted));
    }

    #[test]
    fn test_handle_trap_other() {
        let err = handle_trap::<()>(Err(anyhow::Error::new(Trap::UnreachableCodeReached)))
            .unwrap_err();
        assert!(matches!(err, BridgeError::GuestTrapped(_)));
        assert_eq!(handle_trap(Ok::<_, anyhow::Error>(7)).unwrap(), 7);
    }
}
