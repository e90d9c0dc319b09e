use std::io;
use std::path::PathBuf;

use thiserror::Error;

use crate::config::{ConfigError, UsageError};
use crate::tmc::DecodeError;
use crate::transport::TransportError;

#[derive(Debug, Error)]
pub enum Error {
    #[error(transparent)]
    Usage(#[from] UsageError),
    #[error(transparent)]
    Config(#[from] ConfigError),
    #[error(transparent)]
    Transport(#[from] TransportError),
    #[error("malformed response: {0}")]
    MalformedResponse(#[from] DecodeError),
    #[error("cannot read script {}: {source}", path.display())]
    Script { path: PathBuf, source: io::Error },
    #[error("cannot read input: {0}")]
    Input(#[source] io::Error),
    #[error("cannot write {}: {source}", path.display())]
    Output { path: PathBuf, source: io::Error },
}

pub type Result<T> = std::result::Result<T, Error>;

impl Error {
    pub(crate) fn stdout(source: io::Error) -> Self {
        Error::Output {
            path: PathBuf::from("<stdout>"),
            source,
        }
    }
}
