use std::fmt::{self, Debug, Display};

/// A credential wrapper that redacts itself in all formatted output.
///
/// The merchant's gateway secret flows through configuration structs and into every signing
/// call; wrapping it keeps an accidental `{:?}` on a config struct from writing the secret to
/// the logs. The inner value is only reachable through an explicit [`Secret::reveal`] call.
#[derive(Clone, Default)]
pub struct Secret<T>(T);

impl<T> Secret<T> {
    pub fn new(value: T) -> Self {
        Self(value)
    }

    pub fn reveal(&self) -> &T {
        &self.0
    }
}

impl Secret<String> {
    /// True when no credential has been configured. Signing with an empty secret still
    /// produces well-formed signatures, so this is checked (and warned about) at startup
    /// rather than discovered when the gateway rejects a request.
    pub fn is_unset(&self) -> bool {
        self.0.is_empty()
    }
}

impl<T> Debug for Secret<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("****")
    }
}

impl<T> Display for Secret<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("****")
    }
}

impl From<&str> for Secret<String> {
    fn from(value: &str) -> Self {
        Self(value.to_string())
    }
}

impl From<String> for Secret<String> {
    fn from(value: String) -> Self {
        Self(value)
    }
}
