use thiserror::Error;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum ProtoError {
    #[error("bad magic")]
    BadMagic,
    #[error("unsupported version {0:#06x}")]
    UnsupportedVersion(u16),
    #[error("buffer too short")]
    TooShort,
    #[error("body too large: {0} bytes")]
    BodyTooLarge(usize),
}
