//! Line parser for the producer's output
//!
//! Each record is one line of four whitespace-separated tokens:
//! `<code:hex> <repeat:hex> <key> <remote>`, as printed by `irw`.

use super::IrEvent;

/// Reasons a line could not be turned into an event
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ParseError {
    #[error("expected 4 tokens, found {found}")]
    TokenCount { found: usize },

    #[error("code is not a hex token: {0:?}")]
    InvalidCode(String),

    #[error("repeat counter is not a hex number: {0:?}")]
    InvalidRepeat(String),
}

/// Parse one producer line into an event
///
/// Surrounding whitespace (including the line terminator) is ignored.
pub fn parse_line(line: &str) -> Result<IrEvent, ParseError> {
    let tokens: Vec<&str> = line.split_ascii_whitespace().collect();
    let [code, repeat, key, remote] = tokens[..] else {
        return Err(ParseError::TokenCount {
            found: tokens.len(),
        });
    };

    if !code.bytes().all(|b| b.is_ascii_hexdigit()) {
        return Err(ParseError::InvalidCode(code.to_string()));
    }

    let repeat = u64::from_str_radix(repeat, 16)
        .map_err(|_| ParseError::InvalidRepeat(repeat.to_string()))?;

    Ok(IrEvent::new(code, repeat, key, remote))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_fresh_press() {
        let event = parse_line("0000000000000000 00 KEY_HOME remote42\n").unwrap();
        assert_eq!(event.code, "0000000000000000");
        assert_eq!(event.repeat, 0);
        assert_eq!(event.key, "KEY_HOME");
        assert_eq!(event.remote, "remote42");
    }

    #[test]
    fn test_parse_repeat_is_hex() {
        let event = parse_line("0000000000f40bf0 1f KEY_LEFT remote2").unwrap();
        assert_eq!(event.repeat, 31);
        assert!(event.is_repeat());
    }

    #[test]
    fn test_parse_tolerates_extra_spacing() {
        let event = parse_line("  0000000000f40bf0\t01   KEY_OK  tv \r\n").unwrap();
        assert_eq!(event.key, "KEY_OK");
        assert_eq!(event.remote, "tv");
        assert_eq!(event.repeat, 1);
    }

    #[test]
    fn test_wrong_token_count() {
        assert_eq!(
            parse_line("0000000000f40bf0 00 KEY_OK"),
            Err(ParseError::TokenCount { found: 3 })
        );
        assert_eq!(
            parse_line("0000000000f40bf0 00 KEY_OK tv extra"),
            Err(ParseError::TokenCount { found: 5 })
        );
        assert_eq!(parse_line(""), Err(ParseError::TokenCount { found: 0 }));
    }

    #[test]
    fn test_invalid_tokens() {
        assert_eq!(
            parse_line("zz 00 KEY_OK tv"),
            Err(ParseError::InvalidCode("zz".to_string()))
        );
        assert_eq!(
            parse_line("0000000000f40bf0 -1 KEY_OK tv"),
            Err(ParseError::InvalidRepeat("-1".to_string()))
        );
    }
}
