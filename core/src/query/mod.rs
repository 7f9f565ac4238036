//! Boolean query engine.
//!
//! A query is lexed into tokens, parsed into a [`QueryNode`] tree and
//! evaluated as set algebra over sorted posting lists pulled from the
//! loaded index.

mod eval;
mod lexer;
mod parser;

pub use eval::{complement, evaluate, intersect, run_query, union};
pub use lexer::{lex, Token};
pub use parser::{parse, QueryNode};
