use thiserror::Error as ThisError;

/// Generic FrameVault error
#[derive(Debug, ThisError)]
pub enum Error {
    /// File or stream I/O failure
    #[error("i/o error: {0}")]
    Io(#[from] std::io::Error),

    /// Malformed packet: bad magic, version or length
    #[error("malformed packet: {0}")]
    Format(String),

    /// Packet checksum mismatch
    #[error("packet checksum mismatch")]
    Integrity,

    /// A chunk failed authentication
    #[error("wrong password or corrupted data")]
    AuthFailed,

    /// Not every chunk of the file could be recovered
    #[error("incomplete file: decoded {decoded} of {expected} chunks")]
    IncompleteFile {
        /// Chunks in the recovered state
        decoded: u32,
        /// Chunks the file is made of
        expected: u32,
    },

    /// Erasure coder failure
    #[error("encode error: {0}")]
    Encode(String),

    /// Invalid configuration or parameter misuse
    #[error("configuration error: {0}")]
    Config(String),
}

///
pub type Result<T> = std::result::Result<T, Error>;

impl Error {
    /// Return a new encode Error with a message
    pub fn encode<E>(msg: E) -> Self
    where
        E: Into<String>,
    {
        let msg = msg.into();
        log::error!("{}", msg);
        Error::Encode(msg)
    }

    /// Return a new configuration Error with a message
    pub fn config<E>(msg: E) -> Self
    where
        E: Into<String>,
    {
        let msg = msg.into();
        log::error!("{}", msg);
        Error::Config(msg)
    }
}
