use std::time::Duration;
use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ValidationError {

    #[error("invalid input {0:?} for skip flag | run `kinstall install --help` for more")]
    InvalidSkip(String),
}

#[derive(Error, Debug)]
pub enum InstallerError {

    /* encapsulate a kube-rust error */
    #[error("kube error: {0}")]
    Kube(#[from] kube::Error),

    #[error("unable to serialize {what}: {source}")]
    Serialize {
	what: String,
	#[source]
	source: serde_json::Error,
    },

    #[error("timed out after {after:?} waiting for {what}")]
    Timeout {
	what: String,
	after: Duration,
    },

    #[error("certificate error: {0}")]
    Certificate(String),

    #[error("`{0}`")]
    Other(String),
}
