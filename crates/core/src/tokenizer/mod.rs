use crate::{Result, SessionError};

/// Default separator between profile tokens.
pub const DEFAULT_DELIMITER: char = '!';

/// Splits raw profile text into its ordered tokens.
///
/// Each token is a maximal non-empty run of characters between delimiters, so
/// consecutive or leading delimiters never yield empty tokens. Position in the
/// returned sequence is meaningful: the descriptor builder reads it as
/// concatenated records.
pub fn split(raw: &str, delimiter: char) -> Result<Vec<String>> {
    let tokens: Vec<String> = raw
        .split(delimiter)
        .filter(|token| !token.is_empty())
        .map(str::to_owned)
        .collect();

    if tokens.is_empty() {
        return Err(SessionError::parse("profile contains no tokens"));
    }

    Ok(tokens)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn preserves_token_order() {
        let tokens = split("videotestsrc!0!colorspace!0!videosink!0", '!').unwrap();
        assert_eq!(
            tokens,
            vec!["videotestsrc", "0", "colorspace", "0", "videosink", "0"]
        );
    }

    #[test]
    fn skips_empty_runs_between_delimiters() {
        let tokens = split("!filesrc!!1!location!clip.mp4!", '!').unwrap();
        assert_eq!(tokens, vec!["filesrc", "1", "location", "clip.mp4"]);
    }

    #[test]
    fn empty_input_is_a_parse_error() {
        assert!(matches!(split("", '!'), Err(SessionError::Parse(_))));
        assert!(matches!(split("!!!", '!'), Err(SessionError::Parse(_))));
    }

    #[test]
    fn honours_custom_delimiter() {
        let tokens = split("a|0|b|0", '|').unwrap();
        assert_eq!(tokens.len(), 4);
    }
}
