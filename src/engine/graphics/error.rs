use std::io;
use std::path::PathBuf;

use thiserror::Error;

use crate::engine::graphics::driver::ShaderStage;

/// Errors surfaced by the resource wrappers.
///
/// None of these are retried; construction fails and the caller decides.
#[derive(Error, Debug)]
pub enum GraphicsError {
    #[error("failed to read {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
    #[error("{stage} shader failed to compile: {log}")]
    Compile { stage: ShaderStage, log: String },
    #[error("program failed to link: {log}")]
    Link { log: String },
    #[error("uniform `{name}` not found on shader")]
    UniformNotFound { name: String },
    #[error("failed to decode image {}: {source}", path.display())]
    Decode {
        path: PathBuf,
        #[source]
        source: image::ImageError,
    },
    #[error("driver could not allocate a {kind}: {message}")]
    Allocation { kind: &'static str, message: String },
    #[error("invalid vertex attribute {index}: {reason}")]
    InvalidAttribute { index: u32, reason: String },
}

pub type GraphicsResult<T> = Result<T, GraphicsError>;

impl GraphicsError {
    pub(crate) fn allocation(kind: &'static str) -> impl FnOnce(String) -> GraphicsError {
        move |message| GraphicsError::Allocation { kind, message }
    }

    /// Missing files are reported as `NotFound` before any read is attempted.
    pub(crate) fn missing(path: impl Into<PathBuf>) -> GraphicsError {
        let path = path.into();
        let source = io::Error::new(
            io::ErrorKind::NotFound,
            format!("no such file: {}", path.display()),
        );
        GraphicsError::Io { path, source }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_compile_error_names_stage() {
        let err = GraphicsError::Compile {
            stage: ShaderStage::Fragment,
            log: "0:3: syntax error".into(),
        };
        assert_eq!(err.to_string(), "fragment shader failed to compile: 0:3: syntax error");
    }

    #[test]
    fn test_missing_file_is_not_found() {
        match GraphicsError::missing("shaders/nope.vert") {
            GraphicsError::Io { path, source } => {
                assert_eq!(path, PathBuf::from("shaders/nope.vert"));
                assert_eq!(source.kind(), io::ErrorKind::NotFound);
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }
}
