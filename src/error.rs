#[derive(thiserror::Error, Debug)]
#[non_exhaustive]
pub enum Error {
    #[error(transparent)]
    Io(#[from] std::io::Error),

    /// An aggregate was requested before any samples were recorded.
    #[error("no samples")]
    NoSamples,

    /// Byte source failure that is not an ``std::io::Error``.
    #[error("transport: {0}")]
    Transport(String),
}

pub type Result<T> = std::result::Result<T, Error>;
