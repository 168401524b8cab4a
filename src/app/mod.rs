//! The `correlate` command-line application

pub mod cli;
pub mod input;
pub mod startup;
