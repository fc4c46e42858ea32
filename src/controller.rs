use std::{
    sync::mpsc::Sender,
    time::{Duration, Instant},
};

use crate::{
    api::SnapshotLabel,
    buttons::DirectionButton,
    state::{ControlEvent, StickSample, StickSource},
};
use color_eyre::eyre::{eyre, Result};
use gilrs::{Axis, Button, EventType, GamepadId, Gilrs};
use log::{debug, info, warn};

/// Step applied to the power setting by the lower triggers.
const POWER_STEP: i16 = 10;

/// Monitors input from a game controller and forwards it as control events.
pub struct ControllerMonitor {
    name_matches: String,
    gilrs: Gilrs,
    selected_gamepad: Option<GamepadId>,
    sender: Sender<ControlEvent>,
    deadzone: f32,
    left: StickThrottle,
    right: StickThrottle,
}

impl ControllerMonitor {
    /// Create a new monitor. Only events from the first controller found whose
    /// name contains the given string will be monitored.
    pub fn new(
        name_matches: &str,
        deadzone: f32,
        throttle: Duration,
        sender: Sender<ControlEvent>,
    ) -> Result<Self> {
        let gilrs = Gilrs::new().map_err(|e| eyre!("failed to open gamepad input: {}", e))?;

        Ok(Self {
            name_matches: name_matches.to_string(),
            gilrs,
            selected_gamepad: None,
            sender,
            deadzone,
            left: StickThrottle::new(throttle),
            right: StickThrottle::new(throttle),
        })
    }

    /// Forward gamepad input until the receiving side hangs up.
    pub fn run(&mut self) -> Result<()> {
        loop {
            let timeout = self.left.interval.min(self.right.interval);

            if let Some(event) = self.gilrs.next_event_blocking(Some(timeout)) {
                // Re-select a gamepad whenever one is connected or disconnected.
                if let EventType::Connected | EventType::Disconnected = event.event {
                    self.select_gamepad();
                    if self.selected_gamepad.is_none() {
                        // Lost the stick mid-drive, halt the rover.
                        self.send(ControlEvent::Stop)?;
                    }
                }
                // Handle events from the selected gamepad.
                else if Some(event.id) == self.selected_gamepad {
                    self.handle_event(event.event)?;
                }
            }

            let now = Instant::now();
            for source in [StickSource::Left, StickSource::Right] {
                if let Some(sample) = self.stick(source).poll(now) {
                    self.send(ControlEvent::Stick { source, sample })?;
                }
            }
        }
    }

    pub fn select_gamepad(&mut self) {
        info!("Discovering game controllers...");
        let mut selected = None;

        for (id, gamepad) in self.gilrs.gamepads() {
            info!("  {}", gamepad.name());

            if selected.is_none() && gamepad.name().contains(&self.name_matches) {
                selected = Some(id);
            }
        }

        if selected.is_none() {
            warn!("No controller matching {:?} found", self.name_matches);
        }

        self.selected_gamepad = selected;
    }

    fn handle_event(&mut self, event: EventType) -> Result<()> {
        match event {
            EventType::AxisChanged(axis, value, ..) => {
                let Some((source, update)) = stick_axis(axis) else {
                    return Ok(());
                };
                let percent = axis_percent(value, self.deadzone);
                let now = Instant::now();

                if let Some(sample) = self.stick(source).update(update, percent, now) {
                    self.send(ControlEvent::Stick { source, sample })?;
                }
            }
            EventType::ButtonPressed(button, ..) => {
                if let Some(event) = button_event(button) {
                    debug!("{:?} => {:?}", button, event);
                    self.send(event)?;
                }
            }
            _ => {}
        }

        Ok(())
    }

    fn stick(&mut self, source: StickSource) -> &mut StickThrottle {
        match source {
            StickSource::Left => &mut self.left,
            StickSource::Right => &mut self.right,
        }
    }

    fn send(&self, event: ControlEvent) -> Result<()> {
        self.sender
            .send(event)
            .map_err(|_| eyre!("control event receiver has stopped"))
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum AxisUpdate {
    X,
    Y,
}

/// Rate-limits samples from one stick. Samples arriving too soon are held
/// and released by `poll`; a centred stick is always let through.
#[derive(Debug)]
struct StickThrottle {
    interval: Duration,
    current: StickSample,
    pending: bool,
    last_emit: Option<Instant>,
}

impl StickThrottle {
    fn new(interval: Duration) -> Self {
        Self {
            interval,
            current: StickSample::CENTER,
            pending: false,
            last_emit: None,
        }
    }

    fn update(&mut self, axis: AxisUpdate, percent: f64, now: Instant) -> Option<StickSample> {
        match axis {
            AxisUpdate::X => self.current.x = percent,
            AxisUpdate::Y => self.current.y = percent,
        }
        self.pending = true;

        if self.current.is_center() || self.is_due(now) {
            self.emit(now)
        } else {
            None
        }
    }

    fn poll(&mut self, now: Instant) -> Option<StickSample> {
        if self.pending && self.is_due(now) {
            self.emit(now)
        } else {
            None
        }
    }

    fn is_due(&self, now: Instant) -> bool {
        self.last_emit
            .map_or(true, |last| now.duration_since(last) >= self.interval)
    }

    fn emit(&mut self, now: Instant) -> Option<StickSample> {
        self.pending = false;
        self.last_emit = Some(now);
        Some(self.current)
    }
}

fn stick_axis(axis: Axis) -> Option<(StickSource, AxisUpdate)> {
    match axis {
        Axis::LeftStickX => Some((StickSource::Left, AxisUpdate::X)),
        Axis::LeftStickY => Some((StickSource::Left, AxisUpdate::Y)),
        Axis::RightStickX => Some((StickSource::Right, AxisUpdate::X)),
        Axis::RightStickY => Some((StickSource::Right, AxisUpdate::Y)),
        _ => None,
    }
}

/// Convert a gamepad axis position in `[-1, 1]` to whole percent, treating
/// anything inside the deadzone as centred.
fn axis_percent(axis_position: f32, deadzone: f32) -> f64 {
    let axis_position = axis_position.clamp(-1.0, 1.0);
    let axis_position_abs = axis_position.abs();

    if axis_position_abs < deadzone || axis_position_abs == 0.0 {
        return 0.0;
    }

    let percentage = (axis_position_abs - deadzone) / (1.0 - deadzone);
    let percent = (100.0 * percentage).round() as f64;

    if axis_position.is_sign_negative() {
        -percent
    } else {
        percent
    }
}

fn button_event(button: Button) -> Option<ControlEvent> {
    let event = match button {
        Button::East => ControlEvent::Stop,
        Button::South => ControlEvent::ToggleLockXy,
        Button::North => ControlEvent::ToggleAutodrive,
        Button::West => ControlEvent::Snapshot(SnapshotLabel::Forward),
        Button::LeftTrigger => ControlEvent::Snapshot(SnapshotLabel::Left),
        Button::RightTrigger => ControlEvent::Snapshot(SnapshotLabel::Right),
        Button::LeftTrigger2 => ControlEvent::AdjustPower(-POWER_STEP),
        Button::RightTrigger2 => ControlEvent::AdjustPower(POWER_STEP),
        Button::DPadUp => ControlEvent::Button(DirectionButton::Forward),
        Button::DPadDown => ControlEvent::Button(DirectionButton::Backward),
        Button::DPadLeft => ControlEvent::Button(DirectionButton::Left),
        Button::DPadRight => ControlEvent::Button(DirectionButton::Right),
        Button::Select => ControlEvent::RefreshSnapshots,
        _ => return None,
    };

    Some(event)
}
