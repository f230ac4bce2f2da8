//! BIND 9 `named.conf` support: tokenizing, parsing into a tree, include
//! expansion, semantic queries and filtered re-serialization.

pub mod ast;
pub mod expand;
pub mod filter;
pub mod formatter;
pub mod lexer;
pub mod output;
pub mod parser;
pub mod semantics;

pub use ast::Config;
pub use filter::{Filter, FilterTag};
pub use output::Tagged;
pub use parser::{parse, parse_file, parse_reader};
pub use semantics::{ListenOnClauses, RndcConnectionParams};
