/// Errors produced by the turn-limit middleware.
#[derive(Debug, Clone, thiserror::Error)]
pub enum TurnError {
    /// The request was queued but its wait deadline elapsed before an
    /// admission slot freed.
    #[error("request timed out waiting for an admission slot")]
    Timeout,
}
