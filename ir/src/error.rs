use snafu::Snafu;

pub type Result<T, E = Error> = std::result::Result<T, E>;

/// Structural IR violations surfaced by [`crate::Function::verify`].
#[derive(Debug, Clone, PartialEq, Snafu)]
#[snafu(visibility(pub))]
pub enum Error {
    /// The entry block does not end with a `return`.
    #[snafu(display("function `{function}` has no terminator"))]
    MissingTerminator { function: String },

    /// An operand is consumed before its definition.
    #[snafu(display("operation `{op}` uses a value before its definition"))]
    UseBeforeDef { op: String },
}
