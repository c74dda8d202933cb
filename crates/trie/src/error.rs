use thiserror::Error;

#[derive(Debug, Error)]
pub enum TrieError {
    #[error("leaf index {0} out of range")]
    LeafIndexOutOfRange(usize),
    #[error("proof verification failed")]
    VerificationFailed,
}
