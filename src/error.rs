use std::fmt;
use std::path::PathBuf;

use thiserror::Error;

/// Which of the two sources an asset failure refers to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AssetKind {
    Image,
    DepthMap,
}

impl fmt::Display for AssetKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            AssetKind::Image => "image",
            AssetKind::DepthMap => "depth map",
        })
    }
}

/// Library error type for parallax effect operations.
///
/// Failures are scoped to a single effect instance; nothing here is shared
/// between instances.
#[derive(Debug, Error)]
pub enum Error {
    /// Either source failed to open or decode. The whole load is aborted.
    #[error("failed to load {kind} {}: {reason}", path.display())]
    AssetLoad {
        kind: AssetKind,
        path: PathBuf,
        reason: String,
    },

    /// The load was abandoned because the instance was disposed first.
    #[error("asset load cancelled")]
    Cancelled,

    /// WGSL source failed to parse.
    #[error("shader compile failed: {0}")]
    ShaderCompile(String),

    /// Parsed module failed validation or lacks the expected entry points.
    #[error("program link failed: {0}")]
    ProgramLink(String),

    /// A named attribute or uniform is absent from the compiled program.
    #[error("shader binding `{0}` not found")]
    BindingLookup(&'static str),

    /// Surface or device acquisition/presentation failure.
    #[error("surface error: {0}")]
    Surface(String),
}

pub type Result<T, E = Error> = std::result::Result<T, E>;
