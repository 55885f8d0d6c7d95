//! Testrig workspace-level test utilities.
//!
//! This crate exists solely to host the workspace-level BDD tests in
//! `tests/cucumber.rs`, which drive the `testrig` binary against a scratch
//! repository and a fake `dotnet`.
//!
//! The actual functionality is in the workspace member crates:
//! - `testrig-types`: receipt and config contracts
//! - `testrig-domain`: URI composition, category plan, failure tally
//! - `testrig-adapters`: process execution
//! - `testrig-app`: build, backend and test-suite use cases
//! - `testrig-cli`: the `testrig` binary
