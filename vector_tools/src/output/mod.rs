//! Output module for vector_tools
//!
//! This module writes attribute tables to disk.

pub mod table_writer;

pub use table_writer::TableWriter;
