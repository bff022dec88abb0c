// src/types.rs

//! Small shared value types used across the queue.

use std::fmt;
use std::str::FromStr;

use serde::Deserialize;

/// Opaque identifier of a resource a task reads or writes.
///
/// The queue never interprets the value; it only compares and hashes it to
/// derive ordering constraints between tasks.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct ResourceId(u64);

impl ResourceId {
    pub const fn new(raw: u64) -> Self {
        Self(raw)
    }

    pub const fn get(self) -> u64 {
        self.0
    }
}

impl fmt::Display for ResourceId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "r{}", self.0)
    }
}

macro_rules! impl_resource_from {
    ($($ty:ty),* $(,)?) => {
        $(
            impl From<$ty> for ResourceId {
                fn from(raw: $ty) -> Self {
                    // Signed values are reinterpreted bit-for-bit, which keeps
                    // the mapping injective.
                    ResourceId(raw as u64)
                }
            }
        )*
    };
}

impl_resource_from!(u8, u16, u32, u64, usize, i8, i16, i32, i64, isize);

impl From<&ResourceId> for ResourceId {
    fn from(id: &ResourceId) -> Self {
        *id
    }
}

/// Empty resource list, for tasks that declare no reads or no writes.
///
/// `queue.submit(f, [a], NO_RESOURCES)` reads better than spelling out an
/// empty iterator type at every call site.
pub const NO_RESOURCES: [ResourceId; 0] = [];

/// What a worker does when a task action panics.
///
/// - `Isolate`: record the failure, release the task's dependents as if it
///   had returned normally and keep serving (default).
/// - `Propagate`: release the dependents, then resume the panic on the
///   worker thread so its `serve` call unwinds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PanicPolicy {
    Isolate,
    Propagate,
}

impl Default for PanicPolicy {
    fn default() -> Self {
        PanicPolicy::Isolate
    }
}

impl FromStr for PanicPolicy {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "isolate" => Ok(PanicPolicy::Isolate),
            "propagate" => Ok(PanicPolicy::Propagate),
            other => Err(format!(
                "invalid panic_policy: {other} (expected \"isolate\" or \"propagate\")"
            )),
        }
    }
}
