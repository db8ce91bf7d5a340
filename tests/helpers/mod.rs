//! Test helpers module
//!
//! Fakes for the external collaborators and a context that wires them into
//! a `ServiceFactory`, plus a service-account key for the Sheets tests.

#![allow(dead_code)]

pub mod fakes;
pub mod test_context;

pub use test_context::*;
