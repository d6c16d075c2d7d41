//! Admission control for upstream calls.
//!
//! The gate bounds how many transport calls a client has in flight. Waiters
//! are served in strict arrival order through an explicit queue.
//!
//! Author: kelexine (<https://github.com/kelexine>)

mod gate;

pub use gate::{AdmissionGate, GateStatus, Permit};
