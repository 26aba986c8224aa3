//! A minimal S-expression interpreter: a tagged value model over a
//! capacity-bounded cell arena, a recursive eval/apply evaluator with
//! lexical closures, and a mark/sweep/compact tracing collector that runs
//! between top-level forms.

pub mod arena;
pub mod env;
pub mod error;
pub mod eval;
pub mod globals;
pub mod primitives;
pub mod printer;
pub mod reader;
pub mod value;

pub use error::{SexprError, SexprResult};
pub use eval::Interp;
pub use value::Value;
