use std::fmt;

use serde::{Deserialize, Serialize};

use crate::{engine::NativeState, Result, SessionError};

/// Playback state tracked for the active pipeline.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PlaybackState {
    #[default]
    Stopped,
    Playing,
    Paused,
}

impl PlaybackState {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Stopped => "stopped",
            Self::Playing => "playing",
            Self::Paused => "paused",
        }
    }

    /// Native state the engine is driven to for this playback state.
    pub fn native(self) -> NativeState {
        match self {
            Self::Stopped => NativeState::Null,
            Self::Playing => NativeState::Playing,
            Self::Paused => NativeState::Paused,
        }
    }
}

impl fmt::Display for PlaybackState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Transition requested through `ChangeState`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StateCode {
    Play = 1,
    Pause = 2,
    Stop = 3,
}

impl StateCode {
    pub fn target(self) -> PlaybackState {
        match self {
            Self::Play => PlaybackState::Playing,
            Self::Pause => PlaybackState::Paused,
            Self::Stop => PlaybackState::Stopped,
        }
    }
}

impl TryFrom<i32> for StateCode {
    type Error = SessionError;

    fn try_from(code: i32) -> Result<Self> {
        match code {
            1 => Ok(Self::Play),
            2 => Ok(Self::Pause),
            3 => Ok(Self::Stop),
            other => Err(SessionError::InvalidStateCode(other)),
        }
    }
}

#[cfg(test)]
mod tests {
    use rstest::rstest;

    use super::*;

    #[rstest]
    #[case(1, PlaybackState::Playing, NativeState::Playing)]
    #[case(2, PlaybackState::Paused, NativeState::Paused)]
    #[case(3, PlaybackState::Stopped, NativeState::Null)]
    fn codes_map_to_states(
        #[case] code: i32,
        #[case] playback: PlaybackState,
        #[case] native: NativeState,
    ) {
        let target = StateCode::try_from(code).unwrap().target();
        assert_eq!(target, playback);
        assert_eq!(target.native(), native);
    }

    #[test]
    fn unknown_codes_are_rejected() {
        assert!(matches!(
            StateCode::try_from(4),
            Err(SessionError::InvalidStateCode(4))
        ));
        assert!(StateCode::try_from(0).is_err());
    }

    #[test]
    fn starts_stopped() {
        assert_eq!(PlaybackState::default(), PlaybackState::Stopped);
    }
}
