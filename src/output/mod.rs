use anyhow::{Context, Result};
use serde::ser::{Serialize, SerializeMap, Serializer};
use std::io;

use crate::TranscriptError;

/// Message reported when the binary is started without a video id
pub const MISSING_VIDEO_ID: &str = "No video_id provided";

/// Outcome of one transcript lookup
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TranscriptResult {
    Success { text: String },
    Failure { message: String },
}

impl TranscriptResult {
    pub fn success(text: impl Into<String>) -> Self {
        TranscriptResult::Success { text: text.into() }
    }

    pub fn failure(message: impl Into<String>) -> Self {
        TranscriptResult::Failure {
            message: message.into(),
        }
    }

    pub fn is_success(&self) -> bool {
        matches!(self, TranscriptResult::Success { .. })
    }

    /// Render as a single JSON line
    pub fn to_json(&self) -> Result<String> {
        let mut buffer = Vec::new();
        let mut serializer = serde_json::Serializer::with_formatter(&mut buffer, PythonFormatter);
        self.serialize(&mut serializer)?;
        Ok(String::from_utf8(buffer)?)
    }
}

impl From<TranscriptError> for TranscriptResult {
    fn from(error: TranscriptError) -> Self {
        tracing::warn!(kind = error.kind(), "Transcript unavailable: {}", error);
        TranscriptResult::failure(error.detail())
    }
}

impl From<std::result::Result<String, TranscriptError>> for TranscriptResult {
    fn from(outcome: std::result::Result<String, TranscriptError>) -> Self {
        match outcome {
            Ok(text) => TranscriptResult::Success { text },
            Err(error) => error.into(),
        }
    }
}

impl Serialize for TranscriptResult {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(2))?;
        match self {
            TranscriptResult::Success { text } => {
                map.serialize_entry("success", &true)?;
                map.serialize_entry("transcript", text)?;
            }
            TranscriptResult::Failure { message } => {
                map.serialize_entry("success", &false)?;
                map.serialize_entry("error", message)?;
            }
        }
        map.end()
    }
}

/// Print the result as one line on stdout
pub fn print_to_console(result: &TranscriptResult) -> Result<()> {
    write_line(&mut io::stdout().lock(), result)
}

/// Write the result as one JSON line, surfacing write errors such as a closed pipe
pub fn write_line<W: io::Write>(writer: &mut W, result: &TranscriptResult) -> Result<()> {
    writeln!(writer, "{}", result.to_json()?).context("Failed to write result")?;
    writer.flush().context("Failed to flush result")?;
    Ok(())
}

/// Compact JSON in the layout of Python's `json.dumps` defaults:
/// `", "` and `": "` separators and ASCII-only strings.
struct PythonFormatter;

impl serde_json::ser::Formatter for PythonFormatter {
    fn begin_array_value<W>(&mut self, writer: &mut W, first: bool) -> io::Result<()>
    where
        W: ?Sized + io::Write,
    {
        if first {
            Ok(())
        } else {
            writer.write_all(b", ")
        }
    }

    fn begin_object_key<W>(&mut self, writer: &mut W, first: bool) -> io::Result<()>
    where
        W: ?Sized + io::Write,
    {
        if first {
            Ok(())
        } else {
            writer.write_all(b", ")
        }
    }

    fn begin_object_value<W>(&mut self, writer: &mut W) -> io::Result<()>
    where
        W: ?Sized + io::Write,
    {
        writer.write_all(b": ")
    }

    fn write_string_fragment<W>(&mut self, writer: &mut W, fragment: &str) -> io::Result<()>
    where
        W: ?Sized + io::Write,
    {
        let mut units = [0u16; 2];
        for c in fragment.chars() {
            // DEL is escaped like the other control characters
            if c.is_ascii() && c != '\x7f' {
                writer.write_all(&[c as u8])?;
            } else {
                for unit in c.encode_utf16(&mut units) {
                    write!(writer, "\\u{:04x}", unit)?;
                }
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_success_json() {
        let result = TranscriptResult::success("Hello world");
        assert_eq!(
            result.to_json().unwrap(),
            r#"{"success": true, "transcript": "Hello world"}"#
        );
    }

    #[test]
    fn test_failure_json() {
        let result = TranscriptResult::failure(MISSING_VIDEO_ID);
        assert_eq!(
            result.to_json().unwrap(),
            r#"{"success": false, "error": "No video_id provided"}"#
        );
    }

    #[test]
    fn test_non_ascii_is_escaped() {
        let result = TranscriptResult::success("café 🎵");
        assert_eq!(
            result.to_json().unwrap(),
            r#"{"success": true, "transcript": "caf\u00e9 \ud83c\udfb5"}"#
        );
    }

    #[test]
    fn test_control_characters_and_quotes() {
        let result = TranscriptResult::success("line\n\"quoted\"");
        assert_eq!(
            result.to_json().unwrap(),
            r#"{"success": true, "transcript": "line\n\"quoted\""}"#
        );
    }

    #[test]
    fn test_delete_character_is_escaped() {
        let result = TranscriptResult::success("a\u{7f}b");
        assert_eq!(
            result.to_json().unwrap(),
            r#"{"success": true, "transcript": "a\u007fb"}"#
        );
    }

    #[test]
    fn test_write_line() {
        let mut buffer = Vec::new();
        write_line(&mut buffer, &TranscriptResult::success("hi")).unwrap();
        assert_eq!(buffer, b"{\"success\": true, \"transcript\": \"hi\"}\n");
    }

    struct ClosedPipe;

    impl io::Write for ClosedPipe {
        fn write(&mut self, _: &[u8]) -> io::Result<usize> {
            Err(io::Error::from(io::ErrorKind::BrokenPipe))
        }

        fn flush(&mut self) -> io::Result<()> {
            Err(io::Error::from(io::ErrorKind::BrokenPipe))
        }
    }

    #[test]
    fn test_write_error_is_returned() {
        let err = write_line(&mut ClosedPipe, &TranscriptResult::failure("x")).unwrap_err();
        assert!(err.to_string().contains("Failed to write result"));
    }

    #[test]
    fn test_output_parses_back() {
        let json = TranscriptResult::success("naïve").to_json().unwrap();
        let value: serde_json::Value = serde_json::from_str(&json).unwrap();
        assert_eq!(value["success"], true);
        assert_eq!(value["transcript"], "naïve");
    }

    #[test]
    fn test_from_transcript_error_uses_detail() {
        let result: TranscriptResult =
            TranscriptError::NoTrackFound("No transcripts were found".to_string()).into();
        assert_eq!(result, TranscriptResult::failure("No transcripts were found"));
        assert!(!result.is_success());
    }
}
