/// Failure to obtain the trusted key set.
///
/// `Clone` because one refresh result is handed to every caller waiting on it.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum KeyFetchError {
    #[error("public key request failed: {0}")]
    Transport(String),
    #[error("public key endpoint returned status {status}")]
    Status { status: u16 },
    #[error("public key document is malformed: {0}")]
    Malformed(String),
}
