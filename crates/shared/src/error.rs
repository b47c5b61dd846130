use thiserror::Error;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ProtocolError {
    #[error("successful response is missing field `{0}`")]
    MissingField(&'static str),
}
