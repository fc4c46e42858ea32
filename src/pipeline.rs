//! Turns raw stick samples into motion commands and decides which of them are
//! worth sending to the rover.

use crate::state::{ControllerState, StickSample};
use serde::{Deserialize, Serialize};

/// Payload of `POST /api/joystick`.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct MotionCommand {
    pub x: f64,
    pub y: f64,
    pub strafe: bool,
    pub power: f64,
}

impl MotionCommand {
    pub fn is_stop(&self) -> bool {
        self.x == 0.0 && self.y == 0.0
    }
}

/// Map a stick sample to a command using the current settings. Pure.
pub fn map_sample(sample: StickSample, state: &ControllerState) -> MotionCommand {
    let mut x = sample.x / 100.0;
    let mut y = sample.y / 100.0;

    if state.lock_xy {
        // Ties zero y.
        if x.abs() >= y.abs() {
            y = 0.0;
        } else {
            x = 0.0;
        }
    }

    MotionCommand {
        x,
        y,
        strafe: state.strafe_source.strafe(),
        power: state.power as f64 / 100.0,
    }
}

/// Stop commands always go out; anything else only when it changed.
pub fn should_transmit(next: &MotionCommand, last: &MotionCommand) -> bool {
    next.is_stop() || next != last
}

/// Zero-motion command that keeps the current strafe mode.
pub fn stop_command(state: &ControllerState) -> MotionCommand {
    MotionCommand {
        x: 0.0,
        y: 0.0,
        strafe: state.strafe_source.strafe(),
        power: state.power as f64 / 100.0,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::state::StickSource;

    fn state(power: u8, lock_xy: bool) -> ControllerState {
        ControllerState::new(power, lock_xy)
    }

    #[test]
    fn centered_stick_maps_to_stop_and_always_transmits() {
        let state = state(60, false);
        let command = map_sample(StickSample::CENTER, &state);

        assert!(command.is_stop());
        assert_eq!(command.power, 0.6);
        assert!(should_transmit(&command, &command));
        assert!(should_transmit(&command, &MotionCommand::default()));
    }

    #[test]
    fn diagonal_free_motion() {
        let state = state(80, false);
        let command = map_sample(StickSample::new(50.0, -50.0), &state);

        assert_eq!(
            command,
            MotionCommand {
                x: 0.5,
                y: -0.5,
                strafe: false,
                power: 0.8,
            }
        );
    }

    #[test]
    fn lock_xy_breaks_ties_by_zeroing_y() {
        let state = state(80, true);
        let command = map_sample(StickSample::new(50.0, -50.0), &state);

        assert_eq!(
            command,
            MotionCommand {
                x: 0.5,
                y: 0.0,
                strafe: false,
                power: 0.8,
            }
        );
    }

    #[test]
    fn lock_xy_keeps_only_the_dominant_axis() {
        let state = state(60, true);
        let samples = [
            (10.0, 90.0),
            (-90.0, 10.0),
            (-3.0, -4.0),
            (100.0, 0.0),
            (0.0, -100.0),
            (25.0, 25.0),
        ];

        for (x, y) in samples {
            let command = map_sample(StickSample::new(x, y), &state);
            let zeros = [command.x, command.y].iter().filter(|v| **v == 0.0).count();
            assert_eq!(zeros, 1, "sample ({x}, {y}) gave {command:?}");
        }

        let center = map_sample(StickSample::CENTER, &state);
        assert!(center.is_stop());
    }

    #[test]
    fn mapping_is_pure() {
        let state = state(45, true);
        let before = state.clone();
        let sample = StickSample::new(-30.0, 70.0);

        assert_eq!(map_sample(sample, &state), map_sample(sample, &state));
        assert_eq!(state, before);
    }

    #[test]
    fn repeated_motion_is_suppressed() {
        let mut state = state(60, false);
        state.last_sent = MotionCommand {
            x: 0.5,
            y: 0.5,
            strafe: false,
            power: 0.6,
        };
        let sample = StickSample::new(50.0, 50.0);

        let first = map_sample(sample, &state);
        assert!(!should_transmit(&first, &state.last_sent));
        let second = map_sample(sample, &state);
        assert!(!should_transmit(&second, &state.last_sent));
    }

    #[test]
    fn any_field_change_transmits() {
        let last = MotionCommand {
            x: 0.5,
            y: 0.5,
            strafe: false,
            power: 0.6,
        };

        assert!(should_transmit(&MotionCommand { x: 0.4, ..last }, &last));
        assert!(should_transmit(&MotionCommand { strafe: true, ..last }, &last));
        assert!(should_transmit(&MotionCommand { power: 0.7, ..last }, &last));
    }

    #[test]
    fn right_stick_sets_strafe() {
        let mut state = state(60, false);
        state.strafe_source = StickSource::Right;

        assert!(map_sample(StickSample::new(-20.0, 0.0), &state).strafe);
        assert!(stop_command(&state).strafe);
    }

    #[test]
    fn serializes_as_flat_json() {
        let command = MotionCommand {
            x: 0.5,
            y: -0.25,
            strafe: true,
            power: 0.6,
        };
        let json = serde_json::to_value(command).unwrap();

        assert_eq!(
            json,
            serde_json::json!({"x": 0.5, "y": -0.25, "strafe": true, "power": 0.6})
        );
    }
}
