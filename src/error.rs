use std::io;

use thiserror::Error;

pub type Result<T> = std::result::Result<T, Error>;

#[derive(Error, Debug)]
#[non_exhaustive]
pub enum Error {
    /// ErrInvalidState indicates an operation executed on an entity that is
    /// closing or already closed.
    #[error("invalid state: entity closed")]
    ErrInvalidState,

    /// ErrUnsupported indicates that the requested media cannot be handled
    /// with the given parameters or capabilities.
    #[error("unsupported: {0}")]
    ErrUnsupported(String),

    /// ErrWorker indicates that the worker rejected a request.
    #[error("worker error [{error}]: {reason}")]
    ErrWorker { error: String, reason: String },

    /// ErrTimeout indicates that the worker did not reply in time.
    #[error("request timeout [method:{method}]")]
    ErrTimeout { method: String },

    /// ErrProtocol indicates a malformed or unexpected worker message.
    #[error("protocol error: {0}")]
    ErrProtocol(String),

    /// ErrChannelClosed indicates that the link to the worker is gone.
    #[error("channel closed")]
    ErrChannelClosed,

    #[error("producer not found [id:{0}]")]
    ErrProducerNotFound(String),

    #[error("data producer not found [id:{0}]")]
    ErrDataProducerNotFound(String),

    #[error("invalid RTP parameters: {0}")]
    ErrInvalidRtpParameters(String),

    #[error("invalid RTP capabilities: {0}")]
    ErrInvalidRtpCapabilities(String),

    /// ErrCannotAllocate indicates that the dynamic payload type range is
    /// exhausted.
    #[error("cannot allocate more dynamic codec payload type")]
    ErrCannotAllocate,

    /// ErrInvalidOptions indicates options that do not fit the target
    /// entity, such as connecting a WebRTC transport without DTLS
    /// parameters.
    #[error("invalid options: {0}")]
    ErrInvalidOptions(String),

    /// ErrSctpNotEnabled indicates a data operation on a transport created
    /// without SCTP.
    #[error("SCTP not enabled on transport")]
    ErrSctpNotEnabled,

    /// ErrNoSctpStreamId indicates that every SCTP stream of the transport
    /// is in use.
    #[error("no free SCTP stream id")]
    ErrNoSctpStreamId,

    #[error("frame too long: {0} bytes")]
    ErrFrameTooLong(usize),

    #[error("{0}")]
    Io(#[from] io::Error),

    #[error("{0}")]
    Json(#[from] serde_json::Error),
}
