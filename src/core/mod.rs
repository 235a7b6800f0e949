//! Core compile logic: types, parsing, channel, compilation, assembly, emission.

pub mod assembler;
pub mod channel;
pub mod compiler;
pub mod digest;
pub mod emitter;
pub mod error;
pub mod manifest;
pub mod parser;
pub mod types;
