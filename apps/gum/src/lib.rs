//! # gum
//!
//! Command-line driver for the Graph Unfolding Machine.
//!
//! The core never touches the filesystem and never decides when to stop;
//! this crate owns genome loading, run-state files and the stepping loop.

pub mod cli;
pub mod genome_io;
