//! WASM module validation: guest contract checks.
//!
//! Validates that a compiled module exposes what every call relies on
//! before it is instantiated:
//!
//! 1. The linear memory export
//! 2. `allocate: (i32) -> i32`
//! 3. `deallocate: (i32, i32) -> ()`
//!
//! The invoked exports themselves are checked per call, against the
//! selected result protocol.

use wasmtime::{ExternType, Module, ValType};

use crate::allocator::{ALLOCATE_EXPORT, DEALLOCATE_EXPORT};
use crate::error::BridgeError;

/// Check if a ValType is i32.
fn is_i32(vt: &ValType) -> bool {
    matches!(vt, ValType::I32)
}

/// Required export: (name, param_count_of_i32, result_count_of_i32).
const REQUIRED_EXPORTS: &[(&str, usize, usize)] =
    &[(ALLOCATE_EXPORT, 1, 1), (DEALLOCATE_EXPORT, 2, 0)];

/// Validate that a module meets the guest contract.
pub fn validate_module(module: &Module, memory_export: &str) -> Result<(), BridgeError> {
    let has_memory = module
        .exports()
        .any(|e| e.name() == memory_export && matches!(e.ty(), ExternType::Memory(_)));
    if !has_memory {
        return Err(BridgeError::ValidationError(format!(
            "module must export memory '{}'",
            memory_export
        )));
    }

    for &(name, expected_param_count, expected_result_count) in REQUIRED_EXPORTS {
        let export = module
            .exports()
            .find(|e| e.name() == name)
            .ok_or_else(|| {
                BridgeError::ValidationError(format!("missing required export: {}", name))
            })?;

        let func_ty = match export.ty() {
            ExternType::Func(ft) => ft,
            _ => {
                return Err(BridgeError::ValidationError(format!(
                    "export '{}' must be a function",
                    name
                )));
            }
        };

        let params: Vec<ValType> = func_ty.params().collect();
        let results: Vec<ValType> = func_ty.results().collect();

        if params.len() != expected_param_count || !params.iter().all(is_i32) {
            return Err(BridgeError::ValidationError(format!(
                "export '{}' has wrong param signature: expected {} i32 params, got {} params",
                name,
                expected_param_count,
                params.len()
            )));
        }

        if results.len() != expected_result_count || !results.iter().all(is_i32) {
            return Err(BridgeError::ValidationError(format!(
                "export '{}' has wrong result signature: expected {} i32 results, got {} results",
                name,
                expected_result_count,
                results.len()
            )));
        }
    }

    Ok(())
}
