/// Access failures raised outside the protocol services: a missing or bad
/// bearer credential, or an operator check that did not pass.
#[derive(Debug, thiserror::Error)]
pub enum CoreError {
    #[error("Unauthorized: {0}")]
    Unauthorized(String),

    #[error("Forbidden: {0}")]
    Forbidden(String),
}
