//! Bundle path normalization.
//!
//! A bundle key is the root-relative path of a file, joined with `/` and
//! percent-encoded one segment at a time.
//!
//! # Encoding
//! - Unreserved bytes (`A-Z a-z 0-9 - . _ ~`) and `$ & + : = @` pass through.
//! - Every other byte, including `/`, `;`, `,`, `?`, `%`, space, and all
//!   non-ASCII UTF-8 bytes, becomes `%XX` with uppercase hex digits.
//! - Segments are rejoined with a literal `/`.
//!
//! `decode_path` inverts `encode_path` for every path whose segments do not
//! themselves contain `/`.

use bundle_sync_shared::{ErrorCode, ErrorEnvelope};
use std::path::{Component, Path, PathBuf};

/// Failures while turning a local path into a bundle key (or back).
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum PathError {
    /// The path is not located under the bundle root.
    #[error("path is not under the bundle root")]
    OutsideRoot {
        /// Bundle root.
        root: PathBuf,
        /// Offending path.
        path: PathBuf,
    },
    /// The path resolves to the root itself.
    #[error("path resolves to the bundle root")]
    EmptyRelativePath {
        /// Offending path.
        path: PathBuf,
    },
    /// A path component is not valid UTF-8.
    #[error("path component is not valid UTF-8")]
    NonUtf8Component {
        /// Offending path.
        path: PathBuf,
    },
    /// A `%` is not followed by two hex digits.
    #[error("invalid percent-escape at byte {offset}")]
    InvalidEscape {
        /// Byte offset of the `%`.
        offset: usize,
    },
    /// The decoded bytes are not valid UTF-8.
    #[error("decoded path is not valid UTF-8")]
    InvalidUtf8,
}

impl PathError {
    fn error_code(&self) -> ErrorCode {
        match self {
            Self::OutsideRoot { .. } | Self::EmptyRelativePath { .. } => {
                ErrorCode::new("path", "outside_root")
            },
            Self::NonUtf8Component { .. } => ErrorCode::new("path", "non_utf8"),
            Self::InvalidEscape { .. } | Self::InvalidUtf8 => {
                ErrorCode::new("path", "invalid_encoding")
            },
        }
    }
}

impl From<PathError> for ErrorEnvelope {
    fn from(error: PathError) -> Self {
        let envelope = Self::expected(error.error_code(), error.to_string());
        match error {
            PathError::OutsideRoot { root, path } => envelope
                .with_metadata("root", root.display().to_string())
                .with_metadata("path", path.display().to_string()),
            PathError::EmptyRelativePath { path } | PathError::NonUtf8Component { path } => {
                envelope.with_metadata("path", path.display().to_string())
            },
            PathError::InvalidEscape { offset } => {
                envelope.with_metadata("offset", offset.to_string())
            },
            PathError::InvalidUtf8 => envelope,
        }
    }
}

/// Compute the root-relative path of `absolute` with `/` separators.
///
/// `.` components are dropped; a `..` component or a path outside `root`
/// cannot be made relative and is rejected.
pub fn to_relative_unix_path(root: &Path, absolute: &Path) -> Result<String, PathError> {
    let outside = || PathError::OutsideRoot {
        root: root.to_path_buf(),
        path: absolute.to_path_buf(),
    };
    let relative = absolute.strip_prefix(root).map_err(|_| outside())?;

    let mut segments = Vec::new();
    for component in relative.components() {
        match component {
            Component::Normal(segment) => {
                let segment = segment.to_str().ok_or_else(|| PathError::NonUtf8Component {
                    path: absolute.to_path_buf(),
                })?;
                segments.push(segment);
            },
            Component::CurDir => {},
            Component::ParentDir | Component::RootDir | Component::Prefix(_) => {
                return Err(outside());
            },
        }
    }

    if segments.is_empty() {
        return Err(PathError::EmptyRelativePath {
            path: absolute.to_path_buf(),
        });
    }
    Ok(segments.join("/"))
}

/// Percent-encode each `/`-separated segment of `relative`.
pub fn encode_path(relative: &str) -> String {
    let mut out = String::with_capacity(relative.len());
    for (index, segment) in relative.split('/').enumerate() {
        if index > 0 {
            out.push('/');
        }
        encode_segment(segment, &mut out);
    }
    out
}

/// Decode a percent-encoded bundle path.
pub fn decode_path(encoded: &str) -> Result<String, PathError> {
    let bytes = encoded.as_bytes();
    let mut out = Vec::with_capacity(bytes.len());
    let mut index = 0;
    while let Some(&byte) = bytes.get(index) {
        if byte == b'%' {
            let high = bytes.get(index + 1).copied().and_then(hex_value);
            let low = bytes.get(index + 2).copied().and_then(hex_value);
            let (Some(high), Some(low)) = (high, low) else {
                return Err(PathError::InvalidEscape { offset: index });
            };
            out.push((high << 4) | low);
            index += 3;
        } else {
            out.push(byte);
            index += 1;
        }
    }
    String::from_utf8(out).map_err(|_| PathError::InvalidUtf8)
}

/// Relative, `/`-joined, percent-encoded bundle key for `absolute`.
pub fn bundle_path(root: &Path, absolute: &Path) -> Result<String, PathError> {
    to_relative_unix_path(root, absolute).map(|relative| encode_path(&relative))
}

fn encode_segment(segment: &str, out: &mut String) {
    for byte in segment.bytes() {
        if passes_through(byte) {
            out.push(char::from(byte));
        } else {
            out.push('%');
            out.push(hex_digit(byte >> 4));
            out.push(hex_digit(byte & 0x0f));
        }
    }
}

const fn passes_through(byte: u8) -> bool {
    byte.is_ascii_alphanumeric()
        || matches!(
            byte,
            b'-' | b'.' | b'_' | b'~' | b'$' | b'&' | b'+' | b':' | b'=' | b'@'
        )
}

const fn hex_digit(nibble: u8) -> char {
    if nibble < 10 {
        (b'0' + nibble) as char
    } else {
        (b'A' + nibble - 10) as char
    }
}

const fn hex_value(byte: u8) -> Option<u8> {
    match byte {
        b'0'..=b'9' => Some(byte - b'0'),
        b'a'..=b'f' => Some(byte - b'a' + 10),
        b'A'..=b'F' => Some(byte - b'A' + 10),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn spaces_are_escaped_per_segment() -> Result<(), PathError> {
        let encoded = encode_path("path/with spaces/file2.java");
        assert_eq!(encoded, "path/with%20spaces/file2.java");
        assert_eq!(decode_path(&encoded)?, "path/with spaces/file2.java");
        Ok(())
    }

    #[test]
    fn reserved_and_unicode_bytes_are_escaped() {
        assert_eq!(encode_path("a;b,c?d"), "a%3Bb%2Cc%3Fd");
        assert_eq!(encode_path("100%.txt"), "100%25.txt");
        assert_eq!(encode_path("ü.rs"), "%C3%BC.rs");
        assert_eq!(encode_path("a+b=c:d@e$f&g~h"), "a+b=c:d@e$f&g~h");
    }

    #[test]
    fn decode_rejects_truncated_escapes() {
        assert_eq!(
            decode_path("abc%2"),
            Err(PathError::InvalidEscape { offset: 3 })
        );
        assert_eq!(
            decode_path("%zz"),
            Err(PathError::InvalidEscape { offset: 0 })
        );
        assert_eq!(decode_path("%FF"), Err(PathError::InvalidUtf8));
    }

    #[test]
    fn decode_accepts_lowercase_hex() -> Result<(), PathError> {
        assert_eq!(decode_path("a%2fb%c3%bc")?, "a/bü");
        Ok(())
    }

    #[test]
    fn relative_path_uses_forward_slashes() -> Result<(), PathError> {
        let root = Path::new("/repo");
        let file = root.join("src").join("main").join("App.java");
        assert_eq!(to_relative_unix_path(root, &file)?, "src/main/App.java");
        assert_eq!(
            bundle_path(root, &root.join("my docs").join("a b.md"))?,
            "my%20docs/a%20b.md"
        );
        Ok(())
    }

    #[test]
    fn paths_outside_root_are_rejected() {
        let root = Path::new("/repo");
        assert!(matches!(
            to_relative_unix_path(root, Path::new("/elsewhere/a.java")),
            Err(PathError::OutsideRoot { .. })
        ));
        assert!(matches!(
            to_relative_unix_path(root, Path::new("/repo/../a.java")),
            Err(PathError::OutsideRoot { .. })
        ));
        assert!(matches!(
            to_relative_unix_path(root, root),
            Err(PathError::EmptyRelativePath { .. })
        ));
    }

    #[test]
    fn path_errors_map_into_envelopes() {
        let envelope: ErrorEnvelope = PathError::InvalidEscape { offset: 4 }.into();
        assert_eq!(envelope.code.to_string(), "path:invalid_encoding");
        assert_eq!(envelope.metadata.get("offset").map(String::as_str), Some("4"));
    }

    proptest! {
        #[test]
        fn encode_then_decode_is_identity(
            segments in prop::collection::vec("[^/]{1,12}", 1..5)
        ) {
            let path = segments.join("/");
            let encoded = encode_path(&path);
            prop_assert!(encoded.is_ascii());
            prop_assert_eq!(encoded.split('/').count(), segments.len());
            prop_assert_eq!(decode_path(&encoded), Ok(path));
        }
    }
}
