//! xtree VM
//!
//! Evaluates lowered primitive IR trees. Used to check that lowering preserves
//! the observable behavior of extended nodes.

pub mod values;
pub mod vm;

pub use values::{Function, MdArray, Value};
pub use vm::{Vm, VmError, VmOptions};
