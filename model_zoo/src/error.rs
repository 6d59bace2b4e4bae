use std::{
    error::Error,
    fmt::{self, Display},
    path::PathBuf,
};

use net_core::NetErr;

/// The result type used in the entire zoo module.
pub type Result<T> = std::result::Result<T, ZooErr>;

/// The zoo module's error type. Every variant keeps enough context to
/// diagnose the failure without inspecting internals.
#[derive(Debug)]
pub enum ZooErr {
    /// The model name is not registered in the configuration.
    UnknownModel(String),
    /// Graph construction failed.
    Net(NetErr),
    /// An artifact or config file could not be read or written.
    Io {
        path: PathBuf,
        source: std::io::Error,
    },
    /// A persisted artifact is missing a tensor, corrupt, or of an
    /// unsupported dtype.
    Artifact { path: PathBuf, msg: String },
    /// A configuration file did not parse.
    Config { path: PathBuf, msg: String },
    /// A loaded artifact's parameter count disagrees with the graph built
    /// for the same model name.
    ParamCount {
        model: String,
        got: usize,
        expected: usize,
    },
    /// A loss recipe violates the output weighting invariants.
    BadRecipe { what: &'static str },
}

impl Display for ZooErr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ZooErr::UnknownModel(name) => write!(f, "unknown model type: {name}"),
            ZooErr::Net(e) => write!(f, "graph construction failed: {e}"),
            ZooErr::Io { path, source } => {
                write!(f, "io error on {}: {source}", path.display())
            }
            ZooErr::Artifact { path, msg } => {
                write!(f, "bad artifact {}: {msg}", path.display())
            }
            ZooErr::Config { path, msg } => {
                write!(f, "bad config {}: {msg}", path.display())
            }
            ZooErr::ParamCount {
                model,
                got,
                expected,
            } => write!(
                f,
                "artifact for {model} holds {got} parameters, the graph expects {expected}"
            ),
            ZooErr::BadRecipe { what } => write!(f, "bad loss recipe: {what}"),
        }
    }
}

impl Error for ZooErr {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            ZooErr::Net(e) => Some(e),
            ZooErr::Io { source, .. } => Some(source),
            _ => None,
        }
    }
}

impl From<NetErr> for ZooErr {
    fn from(e: NetErr) -> Self {
        ZooErr::Net(e)
    }
}
