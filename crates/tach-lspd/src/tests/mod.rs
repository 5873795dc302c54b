//! Test suites for the supervisor binary.

mod support;
