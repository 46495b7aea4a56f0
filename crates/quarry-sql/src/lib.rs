//! # quarry-sql
//!
//! The SQL front end of the Quarry query engine.
//!
//! This crate provides:
//! - A hand-written lexer producing a token stream with byte spans
//! - A recursive descent statement parser with Pratt expression parsing
//! - The AST consumed by the `quarry-db` semantic compiler
//!
//! The surface is the engine's dialect: `CREATE TABLE`, multi-row
//! `INSERT INTO ... VALUES`, and queries built from `SELECT` with
//! `WHERE`/`GROUP BY`, combined by `UNION`/`INTERSECT`/`EXCEPT`.
//! Identifiers are case-insensitive and folded to lower case by the lexer;
//! string literals use single quotes with `''` as the escape.
//!
//! ```rust
//! use quarry_sql::{Parser, Statement};
//!
//! let statement = Parser::new("SELECT a, b FROM t WHERE a < 10;")
//!     .parse_statement()
//!     .unwrap();
//! assert!(matches!(statement, Statement::Query(_)));
//! ```

pub mod ast;
pub mod lexer;
pub mod parser;

pub use ast::{Expr, Query, Statement};
pub use lexer::{Keyword, Lexer, Span, Token, TokenKind};
pub use parser::{ParseError, Parser};
