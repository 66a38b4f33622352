//! Tests for the interpreter
//!
//! Organized by feature area

mod helpers;

mod basic_tests;
mod diagnostics_tests;
