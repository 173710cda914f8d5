// Licensed under the Apache-2.0 license

//! Error types for the PAL

use thiserror::Error;

pub type PalResult<T> = Result<T, PalError>;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum PalError {
    /// Invalid parameter
    #[error("Invalid parameter")]
    InvalidParameter,
    /// Resource not available
    #[error("Resource unavailable")]
    ResourceUnavailable,
    /// Operation timeout
    #[error("Operation timeout")]
    Timeout,
    /// Permission denied
    #[error("Permission denied")]
    PermissionDenied,
    /// Resource already exists
    #[error("Resource already exists")]
    AlreadyExists,
    /// Resource not found
    #[error("Resource not found")]
    NotFound,
    /// Operation would block
    #[error("Operation would block")]
    WouldBlock,
    /// IO error
    #[error("IO error: {0:?}")]
    Io(IoErrorKind),
    /// errno reported by the host
    #[error("Platform error: {0}")]
    Platform(i32),
    #[error("Error: {0}")]
    Other(&'static str),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IoErrorKind {
    NotFound,
    PermissionDenied,
    ConnectionRefused,
    ConnectionReset,
    NotConnected,
    AddrInUse,
    AddrNotAvailable,
    BrokenPipe,
    AlreadyExists,
    WouldBlock,
    InvalidInput,
    TimedOut,
    Interrupted,
    UnexpectedEof,
    Other,
}

impl From<std::io::Error> for PalError {
    fn from(err: std::io::Error) -> Self {
        let kind = match err.kind() {
            std::io::ErrorKind::NotFound => IoErrorKind::NotFound,
            std::io::ErrorKind::PermissionDenied => IoErrorKind::PermissionDenied,
            std::io::ErrorKind::ConnectionRefused => IoErrorKind::ConnectionRefused,
            std::io::ErrorKind::ConnectionReset => IoErrorKind::ConnectionReset,
            std::io::ErrorKind::NotConnected => IoErrorKind::NotConnected,
            std::io::ErrorKind::AddrInUse => IoErrorKind::AddrInUse,
            std::io::ErrorKind::AddrNotAvailable => IoErrorKind::AddrNotAvailable,
            std::io::ErrorKind::BrokenPipe => IoErrorKind::BrokenPipe,
            std::io::ErrorKind::AlreadyExists => IoErrorKind::AlreadyExists,
            std::io::ErrorKind::WouldBlock => IoErrorKind::WouldBlock,
            std::io::ErrorKind::InvalidInput => IoErrorKind::InvalidInput,
            std::io::ErrorKind::TimedOut => IoErrorKind::TimedOut,
            std::io::ErrorKind::Interrupted => IoErrorKind::Interrupted,
            std::io::ErrorKind::UnexpectedEof => IoErrorKind::UnexpectedEof,
            _ => IoErrorKind::Other,
        };
        PalError::Io(kind)
    }
}

impl From<nix::errno::Errno> for PalError {
    fn from(errno: nix::errno::Errno) -> Self {
        match errno {
            nix::errno::Errno::EINVAL => PalError::InvalidParameter,
            nix::errno::Errno::EAGAIN => PalError::WouldBlock,
            nix::errno::Errno::ETIMEDOUT => PalError::Timeout,
            nix::errno::Errno::EACCES | nix::errno::Errno::EPERM => PalError::PermissionDenied,
            nix::errno::Errno::EADDRINUSE => PalError::Io(IoErrorKind::AddrInUse),
            nix::errno::Errno::ECONNREFUSED => PalError::Io(IoErrorKind::ConnectionRefused),
            nix::errno::Errno::ECONNRESET => PalError::Io(IoErrorKind::ConnectionReset),
            nix::errno::Errno::ENOTCONN => PalError::Io(IoErrorKind::NotConnected),
            nix::errno::Errno::EPIPE => PalError::Io(IoErrorKind::BrokenPipe),
            other => PalError::Platform(other as i32),
        }
    }
}
