//! Crate-level tests and shared fixtures.

pub(crate) mod support;
mod unit;
