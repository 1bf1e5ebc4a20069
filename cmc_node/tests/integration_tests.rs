//! Integration tests for the compressor node.
//!
//! These tests drive a node assembled on the simulation driver through its
//! public surface: bus messages in, store reads, report lines and facility
//! status out.

mod integration;
