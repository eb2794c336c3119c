//! Best-effort save-state parsing (§9 open question "save-state parsing").
//!
//! No real emulator save-state format ships with this crate — the
//! emulator itself is out of scope (spec.md §1) — so parsing is
//! necessarily best-effort. A recognized format is parsed into whatever
//! fields were confidently extracted; anything else is reported as
//! unrecognized rather than guessed at.

use serde::{Deserialize, Serialize};

/// The result of attempting to parse a save-state blob into structured
/// game data.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum ParsedState {
    /// A recognized format yielded these fields. No field here was
    /// fabricated; anything not confidently extracted is simply absent.
    Partial {
        /// Whatever fields were confidently extracted.
        fields: serde_json::Value,
    },
    /// The blob's format isn't one this crate knows how to parse.
    Unrecognized,
    /// A recognized format's header matched but the body failed to parse
    /// (corrupt or truncated blob).
    Failed {
        /// Why parsing failed.
        reason: String,
    },
}

/// Attempt to parse a save-state blob. Only `MockFrameSource`'s own toy
/// format (`mock-save-state@<cursor>`) is recognized; any other byte
/// layout is `Unrecognized` rather than guessed at, per spec.md §9's open
/// question on save-state parsing.
pub fn parse_save_state(bytes: &[u8]) -> ParsedState {
    let text = match std::str::from_utf8(bytes) {
        Ok(t) => t,
        Err(_) => return ParsedState::Unrecognized,
    };

    match text.strip_prefix("mock-save-state@") {
        Some(rest) => match rest.trim().parse::<u64>() {
            Ok(cursor) => ParsedState::Partial {
                fields: serde_json::json!({ "mockCursor": cursor }),
            },
            Err(_) => ParsedState::Failed {
                reason: "mock-save-state cursor was not a valid integer".to_string(),
            },
        },
        None => ParsedState::Unrecognized,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn unknown_format_is_unrecognized() {
        assert_eq!(parse_save_state(b"\x00\x01\x02garbage"), ParsedState::Unrecognized);
    }

    #[test]
    fn mock_format_parses_its_cursor() {
        let parsed = parse_save_state(b"mock-save-state@42");
        match parsed {
            ParsedState::Partial { fields } => assert_eq!(fields["mockCursor"], 42),
            other => panic!("expected Partial, got {other:?}"),
        }
    }

    #[test]
    fn mock_format_with_a_corrupt_cursor_fails_rather_than_guesses() {
        let parsed = parse_save_state(b"mock-save-state@not-a-number");
        assert!(matches!(parsed, ParsedState::Failed { .. }));
    }

    #[test]
    fn non_utf8_bytes_are_unrecognized_not_an_error() {
        assert_eq!(parse_save_state(&[0xff, 0xfe, 0x00]), ParsedState::Unrecognized);
    }
}
