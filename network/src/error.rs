use hyperdrive_messages::MessageKind;
use thiserror::Error;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum NetworkError {
    #[error("{0} stream closed")]
    Closed(MessageKind),
}
