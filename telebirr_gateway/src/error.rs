use thiserror::Error;

#[derive(Debug, Error)]
pub enum GatewayError {
    /// The gateway could not be reached, timed out, or returned a body we could not parse.
    /// Payments hit by this must be marked failed rather than left `processing`.
    #[error("Gateway transport failure: {0}")]
    Transport(String),
    /// The gateway answered, but with a non-success code. Carries the gateway's message.
    #[error("Gateway rejected the request: {0}")]
    Rejected(String),
    /// The callback signature did not match. The callback must be discarded without touching
    /// any payment or order state.
    #[error("Callback signature mismatch")]
    SignatureMismatch,
    /// The callback carried neither a merchant trade reference nor a gateway trade number,
    /// or was otherwise malformed.
    #[error("Unusable callback payload: {0}")]
    InvalidCallback(String),
    #[error("Invalid gateway configuration: {0}")]
    Configuration(String),
}
