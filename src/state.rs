use crate::api::{NavTarget, SnapshotLabel};
use crate::buttons::DirectionButton;
use crate::pipeline::MotionCommand;

/// Operator input, from the gamepad or the command line.
#[derive(Debug, Clone, PartialEq)]
pub enum ControlEvent {
    Stick {
        source: StickSource,
        sample: StickSample,
    },
    Button(DirectionButton),
    Stop,
    ToggleLockXy,
    ToggleCaptureMode,
    ToggleDriveMode,
    AdjustPower(i16),
    ToggleAutodrive,
    Navigate(NavTarget),
    Snapshot(SnapshotLabel),
    RefreshSnapshots,
}

/// Which stick on the controller produced a sample.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum StickSource {
    /// Forward/turn driving.
    #[default]
    Left,
    /// Lateral (strafe) driving.
    Right,
}

impl StickSource {
    /// Source whose motion mode matches `strafe`, for commands that did not
    /// come from a stick.
    pub fn for_strafe(strafe: bool) -> Self {
        if strafe {
            StickSource::Right
        } else {
            StickSource::Left
        }
    }

    pub fn strafe(self) -> bool {
        matches!(self, StickSource::Right)
    }
}

/// A single stick reading in percent units, each axis in `[-100, 100]`.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct StickSample {
    pub x: f64,
    pub y: f64,
}

impl StickSample {
    pub const CENTER: StickSample = StickSample { x: 0.0, y: 0.0 };

    pub fn new(x: f64, y: f64) -> Self {
        Self { x, y }
    }

    pub fn is_center(&self) -> bool {
        self.x == 0.0 && self.y == 0.0
    }
}

/// Operator-controlled settings plus transmit bookkeeping. Owned by the
/// bridge thread and only mutated there.
#[derive(Debug, Clone, PartialEq)]
pub struct ControllerState {
    /// Throttle setting in percent.
    pub power: u8,
    pub lock_xy: bool,
    pub strafe_source: StickSource,
    pub last_sent: MotionCommand,
    pub capture_mode: bool,
    pub drive_mode: bool,
}

impl ControllerState {
    pub const DEFAULT_POWER: u8 = 60;

    pub fn new(power: u8, lock_xy: bool) -> Self {
        let mut state = Self {
            lock_xy,
            ..Self::default()
        };
        state.set_power(power);
        state
    }

    pub fn set_power(&mut self, power: u8) {
        self.power = power.min(100);
    }

    pub fn adjust_power(&mut self, delta: i16) {
        let power = (self.power as i16 + delta).clamp(0, 100);
        self.power = power as u8;
    }
}

impl Default for ControllerState {
    fn default() -> Self {
        Self {
            power: Self::DEFAULT_POWER,
            lock_xy: false,
            strafe_source: StickSource::Left,
            last_sent: MotionCommand::default(),
            capture_mode: false,
            drive_mode: false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn power_is_clamped() {
        let mut state = ControllerState::new(150, false);
        assert_eq!(state.power, 100);

        state.adjust_power(-30);
        assert_eq!(state.power, 70);

        state.adjust_power(-200);
        assert_eq!(state.power, 0);

        state.adjust_power(10);
        state.set_power(255);
        assert_eq!(state.power, 100);
    }

    #[test]
    fn defaults() {
        let state = ControllerState::default();
        assert_eq!(state.power, 60);
        assert!(!state.lock_xy);
        assert_eq!(state.strafe_source, StickSource::Left);
        assert!(state.last_sent.is_stop());
    }

    #[test]
    fn right_stick_strafes() {
        assert!(StickSource::Right.strafe());
        assert!(!StickSource::Left.strafe());
        assert_eq!(StickSource::for_strafe(true), StickSource::Right);
        assert_eq!(StickSource::for_strafe(false), StickSource::Left);
    }
}
