//! formdoc-core: the configuration tree.
//!
//! A small nested key/value language serves as the wire format for commands
//! embedded in documents, for transformation function definitions and for
//! the persisted form description.
//!
//! # Public API
//!
//! - [`ConfigNode`] -- a named node with ordered children
//! - [`parse()`] / [`parse_single()`] -- text to tree
//! - [`ConfigNode::to_conf_string`] / [`ConfigNode::to_pretty_string`] -- tree to text
//! - [`is_identifier()`] -- the identifier grammar shared by function and print-function names
//! - [`ConfigError`] -- syntax and lookup errors

pub mod error;
pub mod ident;
pub mod lexer;
pub mod node;
pub mod parser;
pub mod writer;

pub use error::ConfigError;
pub use ident::{identifier, is_identifier};
pub use node::ConfigNode;
pub use parser::{parse, parse_single};
pub use writer::quote;
