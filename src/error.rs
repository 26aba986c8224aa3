/// Everything that can go wrong while reading or evaluating an expression.
///
/// Evaluation propagates the first failure outward unchanged; the driver
/// remembers one error per top-level form and nothing is retried.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum SexprError {
    /// Reader failure: unbalanced parens or end-of-input mid-expression.
    #[error("parse error: {0}")]
    Parse(String),

    /// The arena cursor reached capacity. Callers may collect and retry
    /// or surface this to the user.
    #[error("allocation failure: arena capacity exceeded")]
    ArenaFull,

    /// Symbol lookup (or `set!`) exhausted the frame chain.
    #[error("undefined variable '{0}'")]
    Unbound(String),

    /// Wrong argument count for a lambda application or primitive.
    #[error("arity error: {name} expects {expected} arguments, got {got}")]
    Arity {
        name: String,
        expected: usize,
        got: usize,
    },

    /// Type mismatch in a primitive (car of a non-pair, non-numeral
    /// arithmetic operand, division by zero).
    #[error("invalid argument: {0}")]
    InvalidArgument(String),

    /// Attempt to apply something that is neither a primitive nor a
    /// `proc` tagged list.
    #[error("not applicable: {0}")]
    NotApplicable(String),

    /// Wrong shape for quote/lambda/define/set!/if/begin.
    #[error("malformed special form: {0}")]
    MalformedForm(String),
}

pub type SexprResult<T> = Result<T, SexprError>;
