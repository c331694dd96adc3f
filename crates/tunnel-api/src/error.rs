use std::fmt::Write as _;

/// An error resolving a declarative resource.
///
/// Errors are opaque. They carry a message and the path to the field that
/// caused the problem, rendered like `ssl_files.tls_key` or
/// `headers[2].key`.
#[derive(Clone, thiserror::Error)]
pub struct Error {
    message: String,

    // leaf first. callers push their own field as the error travels up, so
    // the root ends up last.
    path: Vec<PathEntry>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum PathEntry {
    Field(&'static str),
    Index(usize),
}

impl Error {
    pub fn new(message: String) -> Self {
        Self {
            message,
            path: Vec::new(),
        }
    }

    pub fn new_static(message: &'static str) -> Self {
        Self::new(message.to_string())
    }

    /// The path to the field that caused this error. Empty if the error
    /// isn't attached to a field.
    pub fn path(&self) -> String {
        let mut buf = String::new();

        for (i, entry) in self.path.iter().rev().enumerate() {
            let _ = match entry {
                PathEntry::Field(field) if i == 0 => buf.write_str(field),
                PathEntry::Field(field) => write!(buf, ".{field}"),
                PathEntry::Index(idx) => write!(buf, "[{idx}]"),
            };
        }

        buf
    }

    pub fn with_field(mut self, field: &'static str) -> Self {
        self.path.push(PathEntry::Field(field));
        self
    }

    pub fn with_index(mut self, index: usize) -> Self {
        self.path.push(PathEntry::Index(index));
        self
    }
}

impl std::fmt::Display for Error {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self.path.is_empty() {
            true => f.write_str(&self.message),
            false => write!(f, "{}: {}", self.path(), self.message),
        }
    }
}

impl std::fmt::Debug for Error {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Error")
            .field("message", &self.message)
            .field("path", &self.path())
            .finish()
    }
}

/// Attach field context to the error in a `Result` at the callsite.
///
/// Each function adds the fields it knows about, so a nested failure ends up
/// with a full path from the outermost caller down to the leaf.
pub trait ErrorContext<T>: Sized {
    fn with_field(self, field: &'static str) -> Result<T, Error>;

    fn with_index(self, index: usize) -> Result<T, Error>;

    /// `with_index(index).with_field(field)`, written in path order.
    fn with_field_index(self, field: &'static str, index: usize) -> Result<T, Error> {
        self.with_index(index).with_field(field)
    }
}

impl<T> ErrorContext<T> for Result<T, Error> {
    fn with_field(self, field: &'static str) -> Result<T, Error> {
        self.map_err(|e| e.with_field(field))
    }

    fn with_index(self, index: usize) -> Result<T, Error> {
        self.map_err(|e| e.with_index(index))
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn test_error_path() {
        fn header() -> Result<(), Error> {
            Err(Error::new_static("empty header key"))
        }

        fn headers() -> Result<(), Error> {
            header().with_field("key").with_field_index("headers", 2)
        }

        let err = headers().with_field("upstream").unwrap_err();
        assert_eq!(err.path(), "upstream.headers[2].key");
        assert_eq!(err.to_string(), "upstream.headers[2].key: empty header key");
    }

    #[test]
    fn test_error_path_starts_with_index() {
        let err = Error::new_static("bad").with_field("sni").with_index(0);
        assert_eq!(err.to_string(), "[0].sni: bad");
    }

    #[test]
    fn test_error_without_path() {
        let err = Error::new("upstream default/web not found".to_string());
        assert_eq!(err.path(), "");
        assert_eq!(err.to_string(), "upstream default/web not found");
    }
}
