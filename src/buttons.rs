use crate::pipeline::MotionCommand;
use std::{fmt, str::FromStr};

/// Discrete direction buttons, laid out as a 3x3 pad.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DirectionButton {
    ForwardLeft,
    Forward,
    ForwardRight,
    Left,
    Stop,
    Right,
    BackLeft,
    Backward,
    BackRight,
}

impl DirectionButton {
    pub const ALL: [DirectionButton; 9] = [
        DirectionButton::ForwardLeft,
        DirectionButton::Forward,
        DirectionButton::ForwardRight,
        DirectionButton::Left,
        DirectionButton::Stop,
        DirectionButton::Right,
        DirectionButton::BackLeft,
        DirectionButton::Backward,
        DirectionButton::BackRight,
    ];

    /// `(x, y, strafe)` preset for this button.
    pub fn vector(self) -> (f64, f64, bool) {
        match self {
            DirectionButton::ForwardLeft => (-1.0, 0.8, false),
            DirectionButton::Forward => (0.0, 1.0, false),
            DirectionButton::ForwardRight => (1.0, 0.8, false),
            DirectionButton::Left => (-1.0, 0.0, true),
            DirectionButton::Stop => (0.0, 0.0, false),
            DirectionButton::Right => (1.0, 0.0, true),
            DirectionButton::BackLeft => (-1.0, -0.8, false),
            DirectionButton::Backward => (0.0, -1.0, false),
            DirectionButton::BackRight => (1.0, -0.8, false),
        }
    }

    pub fn command(self, power: u8) -> MotionCommand {
        let (x, y, strafe) = self.vector();
        MotionCommand {
            x,
            y,
            strafe,
            power: power as f64 / 100.0,
        }
    }

    pub fn name(self) -> &'static str {
        match self {
            DirectionButton::ForwardLeft => "forward-left",
            DirectionButton::Forward => "forward",
            DirectionButton::ForwardRight => "forward-right",
            DirectionButton::Left => "left",
            DirectionButton::Stop => "stop",
            DirectionButton::Right => "right",
            DirectionButton::BackLeft => "back-left",
            DirectionButton::Backward => "backward",
            DirectionButton::BackRight => "back-right",
        }
    }
}

impl fmt::Display for DirectionButton {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for DirectionButton {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|button| button.name() == s)
            .ok_or_else(|| format!("unknown direction button: {s}"))
    }
}

/// What a button press asks the rover to do.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PadAction {
    Drive(DirectionButton),
    Stop,
}

/// Tracks the selected direction button. Pressing the selected button again
/// releases it.
#[derive(Debug, Default)]
pub struct ButtonPad {
    selected: Option<DirectionButton>,
}

impl ButtonPad {
    pub fn selected(&self) -> Option<DirectionButton> {
        self.selected
    }

    pub fn press(&mut self, button: DirectionButton) -> PadAction {
        if button == DirectionButton::Stop || self.selected == Some(button) {
            self.selected = None;
            PadAction::Stop
        } else {
            self.selected = Some(button);
            PadAction::Drive(button)
        }
    }

    /// Forget the selection, e.g. after the sticks took over.
    pub fn release(&mut self) {
        self.selected = None;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn press_twice_stops() {
        let mut pad = ButtonPad::default();

        assert_eq!(
            pad.press(DirectionButton::Forward),
            PadAction::Drive(DirectionButton::Forward)
        );
        assert_eq!(pad.selected(), Some(DirectionButton::Forward));

        assert_eq!(pad.press(DirectionButton::Forward), PadAction::Stop);
        assert_eq!(pad.selected(), None);
    }

    #[test]
    fn switching_buttons_drives_the_new_one() {
        let mut pad = ButtonPad::default();
        pad.press(DirectionButton::Left);

        assert_eq!(
            pad.press(DirectionButton::BackRight),
            PadAction::Drive(DirectionButton::BackRight)
        );
        assert_eq!(pad.selected(), Some(DirectionButton::BackRight));
    }

    #[test]
    fn stop_button_always_stops() {
        let mut pad = ButtonPad::default();
        assert_eq!(pad.press(DirectionButton::Stop), PadAction::Stop);
        assert_eq!(pad.press(DirectionButton::Stop), PadAction::Stop);
        assert_eq!(pad.selected(), None);
    }

    #[test]
    fn presets() {
        let command = DirectionButton::ForwardRight.command(50);
        assert_eq!(
            command,
            MotionCommand {
                x: 1.0,
                y: 0.8,
                strafe: false,
                power: 0.5,
            }
        );
        assert!(DirectionButton::Left.command(60).strafe);
        assert_eq!(DirectionButton::Backward.vector(), (0.0, -1.0, false));
        assert!(DirectionButton::Stop.command(60).is_stop());
    }

    #[test]
    fn parses_names() {
        for button in DirectionButton::ALL {
            assert_eq!(button.to_string().parse::<DirectionButton>(), Ok(button));
        }
        assert!("sideways".parse::<DirectionButton>().is_err());
    }
}
