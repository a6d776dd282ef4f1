//! Integration test suite entry point.

mod coordinator_tests;
mod corpus_tests;
mod fixture;
mod mcp_tests;
