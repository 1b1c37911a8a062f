//! Integration tests for the stream aggregator
//!
//! These tests use wiremock to stand in for both upstream APIs and the
//! downstream state API, and drive full cycles end-to-end.

mod common;
mod cycle_tests;
mod scheduler_tests;
