//! SDP codec: parser and generator for the audio subset this engine negotiates.

pub mod generator;
pub mod parser;
pub mod types;

pub use generator::{generate, GenerateParams};
pub use parser::parse;
pub use types::*;
