//! Encoding and decoding of tile commands.

use std::io::Write;
use std::str;

use thiserror::Error;

use crate::protocol::COMMAND_PREFIX;

/// Errors that can occur while decoding a command datagram.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum ProtocolError {
    /// No `;` terminator was found in the datagram.
    #[error("command is not terminated by ';'")]
    Unterminated,

    /// The command header is not valid ASCII/UTF-8.
    #[error("command header is not valid text")]
    NotText,

    /// The header does not start with the `dpc!` prefix.
    #[error("missing command prefix 'dpc!'")]
    MissingPrefix,

    /// The verb after the prefix is not `data` or `upload`.
    #[error("unknown command verb: {0}")]
    UnknownVerb(String),

    /// An argument is missing, extra, or not a number in range.
    #[error("malformed argument in '{0}'")]
    MalformedArgument(String),

    /// An upload command carried trailing bytes.
    #[error("unexpected {0} payload bytes after upload command")]
    UnexpectedPayload(usize),
}

/// A decoded or to-be-encoded tile command.
///
/// `Data` borrows its payload so that encoding and decoding never copy the
/// frame bytes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Command<'a> {
    /// Write `payload` at `offset` into device buffer `buffer`.
    Data {
        buffer: u8,
        offset: usize,
        payload: &'a [u8],
    },
    /// Display device buffer `buffer`.
    Upload { buffer: u8 },
}

impl Command<'_> {
    /// Appends the encoded datagram to `out` without clearing it first.
    pub fn encode_into(&self, out: &mut Vec<u8>) {
        match self {
            Command::Data {
                buffer,
                offset,
                payload,
            } => {
                // Writing into a Vec cannot fail.
                let _ = write!(out, "{COMMAND_PREFIX} data {buffer} {offset};");
                out.extend_from_slice(payload);
            }
            Command::Upload { buffer } => {
                let _ = write!(out, "{COMMAND_PREFIX} upload {buffer};");
            }
        }
    }

    /// Encodes into a fresh vector.
    pub fn to_bytes(&self) -> Vec<u8> {
        let mut out = Vec::new();
        self.encode_into(&mut out);
        out
    }
}

/// Text of the present command for `buffer`.
///
/// ```rust
/// assert_eq!(betsy_core::upload_command(3), "dpc! upload 3;");
/// ```
pub fn upload_command(buffer: u8) -> String {
    format!("{COMMAND_PREFIX} upload {buffer};")
}

/// Parses a command datagram.
///
/// The header runs up to the first `;`; anything after it is the raw
/// payload of a data command.
///
/// # Errors
///
/// Returns a [`ProtocolError`] describing the first problem found.
pub fn decode_command(datagram: &[u8]) -> Result<Command<'_>, ProtocolError> {
    let end = datagram
        .iter()
        .position(|&b| b == b';')
        .ok_or(ProtocolError::Unterminated)?;
    let header = str::from_utf8(&datagram[..end]).map_err(|_| ProtocolError::NotText)?;
    let payload = &datagram[end + 1..];

    let mut words = header.split_ascii_whitespace();
    if words.next() != Some(COMMAND_PREFIX) {
        return Err(ProtocolError::MissingPrefix);
    }

    let malformed = || ProtocolError::MalformedArgument(header.to_string());
    match words.next() {
        Some("data") => {
            let buffer = words.next().and_then(|w| w.parse().ok()).ok_or_else(malformed)?;
            let offset = words.next().and_then(|w| w.parse().ok()).ok_or_else(malformed)?;
            if words.next().is_some() {
                return Err(malformed());
            }
            Ok(Command::Data {
                buffer,
                offset,
                payload,
            })
        }
        Some("upload") => {
            let buffer = words.next().and_then(|w| w.parse().ok()).ok_or_else(malformed)?;
            if words.next().is_some() {
                return Err(malformed());
            }
            if !payload.is_empty() {
                return Err(ProtocolError::UnexpectedPayload(payload.len()));
            }
            Ok(Command::Upload { buffer })
        }
        Some(other) => Err(ProtocolError::UnknownVerb(other.to_string())),
        None => Err(malformed()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_upload_command_text() {
        assert_eq!(upload_command(0), "dpc! upload 0;");
        assert_eq!(upload_command(3), "dpc! upload 3;");
    }

    #[test]
    fn test_data_command_layout() {
        // Arrange
        let cmd = Command::Data {
            buffer: 1,
            offset: 1024,
            payload: &[0xDE, 0xAD],
        };

        // Act
        let bytes = cmd.to_bytes();

        // Assert
        assert_eq!(bytes, b"dpc! data 1 1024;\xDE\xAD".to_vec());
    }

    #[test]
    fn test_encode_into_appends() {
        let mut out = b"xx".to_vec();

        Command::Upload { buffer: 2 }.encode_into(&mut out);

        assert_eq!(out, b"xxdpc! upload 2;".to_vec());
    }

    #[test]
    fn test_decode_data_keeps_binary_payload() {
        // Arrange – payload itself contains a ';'
        let datagram = b"dpc! data 0 2048;\x00;\xFF";

        // Act
        let cmd = decode_command(datagram).unwrap();

        // Assert
        assert_eq!(
            cmd,
            Command::Data {
                buffer: 0,
                offset: 2048,
                payload: &[0x00, b';', 0xFF]
            }
        );
    }

    #[test]
    fn test_decode_upload() {
        assert_eq!(
            decode_command(b"dpc! upload 7;"),
            Ok(Command::Upload { buffer: 7 })
        );
    }

    #[test]
    fn test_decode_rejects_missing_terminator() {
        assert_eq!(decode_command(b"dpc! upload 1"), Err(ProtocolError::Unterminated));
    }

    #[test]
    fn test_decode_rejects_wrong_prefix() {
        assert_eq!(decode_command(b"dpc upload;"), Err(ProtocolError::MissingPrefix));
    }

    #[test]
    fn test_decode_rejects_unknown_verb() {
        assert_eq!(
            decode_command(b"dpc! reboot;"),
            Err(ProtocolError::UnknownVerb("reboot".into()))
        );
    }

    #[test]
    fn test_decode_rejects_bad_arguments() {
        assert!(matches!(
            decode_command(b"dpc! data 300 0;"),
            Err(ProtocolError::MalformedArgument(_))
        ));
        assert!(matches!(
            decode_command(b"dpc! data 0;"),
            Err(ProtocolError::MalformedArgument(_))
        ));
        assert!(matches!(
            decode_command(b"dpc! upload 1 2;"),
            Err(ProtocolError::MalformedArgument(_))
        ));
    }

    #[test]
    fn test_decode_rejects_upload_payload() {
        assert_eq!(
            decode_command(b"dpc! upload 1;abc"),
            Err(ProtocolError::UnexpectedPayload(3))
        );
    }
}
