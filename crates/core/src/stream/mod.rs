use std::fmt;

use serde::{Deserialize, Serialize};

use crate::{Result, SessionError};

/// Kind of media a request asks to record or play.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StreamKind {
    Audio,
    Video,
}

impl StreamKind {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Audio => "audio",
            Self::Video => "video",
        }
    }
}

impl fmt::Display for StreamKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl TryFrom<i32> for StreamKind {
    type Error = SessionError;

    fn try_from(code: i32) -> Result<Self> {
        match code {
            1 => Ok(Self::Audio),
            2 => Ok(Self::Video),
            other => Err(SessionError::InvalidStreamKind(other)),
        }
    }
}

/// Maps a wire stream code onto a [`StreamKind`].
pub fn classify(code: i32) -> Result<StreamKind> {
    StreamKind::try_from(code)
}

#[cfg(test)]
mod tests {
    use rstest::rstest;

    use super::*;

    #[test]
    fn known_codes() {
        assert_eq!(classify(1).unwrap(), StreamKind::Audio);
        assert_eq!(classify(2).unwrap(), StreamKind::Video);
    }

    #[rstest]
    #[case(0)]
    #[case(3)]
    #[case(-1)]
    fn unknown_codes_are_rejected(#[case] code: i32) {
        assert!(matches!(
            classify(code),
            Err(SessionError::InvalidStreamKind(c)) if c == code
        ));
    }
}
