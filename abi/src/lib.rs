//! `guestcall-abi`: engine-independent wire ABI for typed guest calls.
//!
//! A guest module only speaks `i32` pointers and lengths. This crate defines
//! how typed host values are laid out in the guest's linear memory and how
//! the guest's answers are read back:
//!
//! - `TypeTag`: the closed registry of value shapes and their wire codes
//! - `HostValue`: typed values with their little-endian byte encoding
//! - `layout`: the 8/9/12-byte descriptor records
//! - `LinearMemory` / `GuestAllocator`: the only ways to touch a guest
//! - `ArgumentFrame`: argument encoding, the indirect table, and the
//!   per-call release list
//! - `results`: result entry and error payload decoding
//! - `MemGuest`: in-memory guest for tests
//!
//! The engine-backed implementation of the traits lives in
//! `guestcall-bridge`.

pub mod error;
pub mod tag;
pub mod value;
pub mod layout;
pub mod traits;
pub mod frame;
pub mod results;
pub mod mem_guest;

// Re-export commonly used types at the crate root.
pub use error::AbiError;
pub use tag::TypeTag;
pub use value::HostValue;
pub use layout::{ArgDescriptor, ResultDescriptor, ResultEntry};
pub use traits::{GuestAllocator, LinearMemory};
pub use frame::{Allocation, ArgumentFrame, ReleaseFailure};
pub use results::{GuestResponse, UnknownTagPolicy};
pub use mem_guest::MemGuest;
