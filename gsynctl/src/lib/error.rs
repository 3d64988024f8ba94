//! Mappers from third party errors to [gsync::Error], for use with `map_err`

use std::fmt;

pub fn api<E: fmt::Display>(err: E) -> gsync::Error {
    gsync::Error::Api(err.to_string())
}

pub fn io<E: fmt::Display>(err: E) -> gsync::Error {
    gsync::Error::Io(err.to_string())
}
