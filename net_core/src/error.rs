use std::{
    error::Error,
    fmt::{self, Display},
};

/// The result type used in the entire graph module.
pub type Result<T> = std::result::Result<T, NetErr>;

/// The graph module's error type.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum NetErr {
    /// A spatial dimension would collapse to zero during construction.
    ShapeCollapse {
        op: &'static str,
        h: usize,
        w: usize,
        window: usize,
        stride: usize,
    },
    /// An op was constructed with a structurally invalid hyperparameter.
    InvalidParam {
        op: &'static str,
        what: &'static str,
    },
    /// An op was wired to a value of the wrong rank (feature map vs flat).
    WrongRank { op: &'static str },
    /// A builder call referenced a node id that was never produced.
    UnknownNode { id: usize },
    /// Two runtime sizes that must agree do not.
    SizeMismatch {
        what: &'static str,
        got: usize,
        expected: usize,
    },
    /// The graph is missing a structural piece (input, outputs).
    GraphIncomplete { what: &'static str },
    /// Two outputs were registered under the same name.
    DuplicateOutput { name: String },
}

impl Display for NetErr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            NetErr::ShapeCollapse {
                op,
                h,
                w,
                window,
                stride,
            } => write!(
                f,
                "{op}: a {window}x{window} window with stride {stride} collapses a {h}x{w} input"
            ),
            NetErr::InvalidParam { op, what } => write!(f, "{op}: invalid {what}"),
            NetErr::WrongRank { op } => write!(f, "{op}: input value has the wrong rank"),
            NetErr::UnknownNode { id } => write!(f, "node id {id} does not exist in this graph"),
            NetErr::SizeMismatch {
                what,
                got,
                expected,
            } => write!(f, "size mismatch for {what}: got {got}, expected {expected}"),
            NetErr::GraphIncomplete { what } => write!(f, "graph is missing {what}"),
            NetErr::DuplicateOutput { name } => {
                write!(f, "an output named {name} was already registered")
            }
        }
    }
}

impl Error for NetErr {}
