//! Configuration language for the Trellis agent.
//!
//! The language is a labeled-block syntax with referential expressions:
//!
//! ```text
//! discovery "static" "localhost" {
//!     hosts  = ["127.0.0.1:9090"]
//!     labels = { env = "dev" }
//! }
//!
//! scrape "metrics" {
//!     targets = discovery.static.localhost.targets
//! }
//! ```
//!
//! # Module Organization
//!
//! - [`diag`]: positioned, severity-tagged diagnostics
//! - [`lex`] / [`ast`] / [`parse`]: source text to AST
//! - [`value`]: the dynamic value domain used during evaluation
//! - [`decode`]: typed conversion between values and config structs
//! - [`eval`]: expression evaluation against an evaluation context
//! - [`reference`]: canonical dotted component identities
//! - [`context`]: folding evaluated component values into the variable tree
//! - [`blocks`]: the typed per-block configuration structs

pub mod ast;
pub mod blocks;
pub mod context;
pub mod decode;
pub mod diag;
pub mod eval;
pub mod lex;
pub mod parse;
pub mod reference;
pub mod value;

pub use ast::{Attribute, Block, Body, Expr, ExprKind, File, Traversal, TraversalStep};
pub use blocks::{
    ChainDiscoveryConfig, RemoteWriteBlockConfig, RootConfig, ScrapeBlockConfig,
    StaticDiscoveryConfig,
};
pub use context::{build_variables, ReferenceValue, ShapeConflict};
pub use decode::{decode_attributes, decode_body, FromValue, IntoValue};
pub use diag::{Diagnostic, Diagnostics, Severity, Span};
pub use eval::{eval_expr, EvalContext};
pub use parse::parse_file;
pub use reference::{parse_reference, Reference};
pub use value::{Number, Value, ValueError};
