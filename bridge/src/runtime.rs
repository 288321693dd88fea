//! Bridge runtime: Wasmtime engine, instantiation, and the invocation driver.
//!
//! A `Bridge` owns one guest instance for its whole lifetime. Each
//! [`call`](Bridge::call) runs the same sequence:
//!
//! 1. Allocate the argument table and encode every argument into it
//! 2. Invoke the export with `(table, count)`
//! 3. Collect the response through the selected [`ResultProtocol`]
//! 4. Release every allocation made in step 1, whatever happened in 1–3
//!
//! Results are decoded before step 4, so nothing the guest hands back is
//! read after argument buffers have been returned to it.

use std::marker::PhantomData;
use std::path::Path;

use guestcall_abi::{ArgumentFrame, GuestResponse, HostValue};
use tracing::{debug, warn};
use wasmtime::{Config, Engine, Instance, Linker, Module, Store};

use crate::allocator::{Guest, GuestExports};
use crate::config::BridgeConfig;
use crate::error::BridgeError;
use crate::host_impl::HostState;
use crate::protocol::{CallbackProtocol, HeaderProtocol, ResultProtocol};
use crate::validation::validate_module;

/// A bridge whose guest returns a result descriptor pointer.
pub type HeaderBridge = Bridge<HeaderProtocol>;

/// A bridge whose guest calls `return_result` / `return_error`.
pub type CallbackBridge = Bridge<CallbackProtocol>;

/// A guest instance plus the calling convention used to talk to it.
///
/// Not reentrant: one call is in flight at a time, enforced by `&mut self`.
pub struct Bridge<P: ResultProtocol = HeaderProtocol> {
    store: Store<HostState>,
    instance: Instance,
    exports: GuestExports,
    config: BridgeConfig,
    _protocol: PhantomData<P>,
}

impl<P: ResultProtocol> Bridge<P> {
    /// Create a bridge from WASM bytecode (binary or text).
    pub fn new(wasm_bytes: &[u8], config: BridgeConfig) -> Result<Self, BridgeError> {
        Self::with_linker(wasm_bytes, config, |_| Ok(()))
    }

    /// Load from a `.wasm` file path.
    pub fn from_file(path: &Path, config: BridgeConfig) -> Result<Self, BridgeError> {
        let engine = create_engine(&config)?;
        let module = Module::from_file(&engine, path)?;
        Self::instantiate(engine, module, config, |_| Ok(()))
    }

    /// Create a bridge, letting `extend` register further host imports
    /// before the module is instantiated.
    pub fn with_linker<F>(
        wasm_bytes: &[u8],
        config: BridgeConfig,
        extend: F,
    ) -> Result<Self, BridgeError>
    where
        F: FnOnce(&mut Linker<HostState>) -> Result<(), BridgeError>,
    {
        let engine = create_engine(&config)?;
        let module = Module::new(&engine, wasm_bytes)?;
        Self::instantiate(engine, module, config, extend)
    }

    fn instantiate<F>(
        engine: Engine,
        module: Module,
        config: BridgeConfig,
        extend: F,
    ) -> Result<Self, BridgeError>
    where
        F: FnOnce(&mut Linker<HostState>) -> Result<(), BridgeError>,
    {
        validate_module(&module, &config.memory_export)?;

        let mut store = Store::new(&engine, HostState::new(&config));
        store.limiter(|state| &mut state.limits);
        if let Some(fuel) = config.fuel_limit {
            store.set_fuel(fuel)?;
        }

        let mut linker = Linker::new(&engine);
        P::register(&mut linker, &config)?;
        extend(&mut linker)?;

        let instance = handle_start_trap(linker.instantiate(&mut store, &module))?;
        let exports = GuestExports::resolve(&mut store, &instance, &config.memory_export)?;
        debug!(protocol = P::NAME, "guest instantiated");

        Ok(Self {
            store,
            instance,
            exports,
            config,
            _protocol: PhantomData,
        })
    }

    /// Call `export` with `args` and return its typed results.
    ///
    /// A guest-reported failure comes back as
    /// [`BridgeError::GuestReportedError`]. Every guest allocation made for
    /// the arguments is released before this returns, on every path.
    pub fn call(&mut self, export: &str, args: &[HostValue]) -> Result<Vec<HostValue>, BridgeError> {
        debug!(export, args = args.len(), protocol = P::NAME, "guest call");
        self.refuel()?;

        let mut frame = ArgumentFrame::new();
        let outcome = self.run(&mut frame, export, args);

        // Cleanup must not be starved by a guest that burned its fuel.
        if let Err(e) = self.refuel() {
            warn!(export, error = %e, "failed to refuel before release");
        }
        let mut guest = Guest::new(&mut self.store, &self.exports);
        for failure in frame.release(&mut guest) {
            warn!(
                export,
                ptr = failure.allocation.ptr,
                size = failure.allocation.size,
                error = %failure.error,
                "failed to release guest allocation"
            );
        }

        match outcome {
            Ok(GuestResponse::Values(values)) => {
                debug!(export, results = values.len(), "guest call finished");
                Ok(values)
            }
            Ok(GuestResponse::Error(message)) => {
                debug!(export, %message, "guest reported error");
                Err(BridgeError::GuestReportedError(message))
            }
            Err(e) => {
                debug!(export, error = %e, "guest call failed");
                Err(e)
            }
        }
    }

    fn run(
        &mut self,
        frame: &mut ArgumentFrame,
        export: &str,
        args: &[HostValue],
    ) -> Result<GuestResponse, BridgeError> {
        let count = u32::try_from(args.len()).map_err(|_| {
            BridgeError::UnsupportedArgumentType(format!("{} arguments", args.len()))
        })?;
        let table_ptr = {
            let mut guest = Guest::new(&mut self.store, &self.exports);
            frame.populate(&mut guest, args)?
        };
        P::invoke(
            &mut self.store,
            &self.instance,
            &self.exports,
            export,
            table_ptr,
            count,
            &self.config,
        )
    }

    fn refuel(&mut self) -> Result<(), BridgeError> {
        if let Some(fuel) = self.config.fuel_limit {
            self.store.set_fuel(fuel)?;
        }
        Ok(())
    }

    /// The store, for invoking exports outside the calling convention.
    pub fn store_mut(&mut self) -> &mut Store<HostState> {
        &mut self.store
    }

    /// The guest instance.
    pub fn instance(&self) -> &Instance {
        &self.instance
    }

    /// The configuration the bridge was built with.
    pub fn config(&self) -> &BridgeConfig {
        &self.config
    }
}

/// Create a Wasmtime engine for the bridge configuration.
fn create_engine(config: &BridgeConfig) -> Result<Engine, BridgeError> {
    let mut wasm_config = Config::new();

    // Fuel metering
    wasm_config.consume_fuel(config.fuel_limit.is_some());

    // One guest call at a time; no shared memories
    wasm_config.wasm_threads(false);

    Ok(Engine::new(&wasm_config)?)
}

/// Traps raised by a start function are guest traps, not link errors.
fn handle_start_trap<R>(result: Result<R, anyhow::Error>) -> Result<R, BridgeError> {
    match result {
        Err(e) if e.downcast_ref::<wasmtime::Trap>().is_some() => {
            crate::protocol::handle_trap(Err(e))
        }
        other => Ok(other?),
    }
}
