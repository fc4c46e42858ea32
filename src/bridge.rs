use crate::{
    api::{ApiRequest, NavTarget, NavigateRequest, SnapshotLabel},
    buttons::{ButtonPad, DirectionButton, PadAction},
    dispatch::Dispatcher,
    pipeline::{map_sample, should_transmit, stop_command, MotionCommand},
    state::{ControlEvent, ControllerState, StickSample, StickSource},
};
use log::{debug, info, warn};
use std::sync::mpsc::Receiver;

/// Turns operator input into requests for the rover's backend.
pub struct RoverBridge {
    state: ControllerState,
    pad: ButtonPad,
    dispatcher: Dispatcher,
    snapshot_folder: String,
}

impl RoverBridge {
    pub fn new(state: ControllerState, dispatcher: Dispatcher, snapshot_folder: &str) -> Self {
        Self {
            state,
            pad: ButtonPad::default(),
            dispatcher,
            snapshot_folder: snapshot_folder.to_string(),
        }
    }

    pub fn state(&self) -> &ControllerState {
        &self.state
    }

    /// Handle events until every sender has gone away.
    pub fn run(&mut self, events: Receiver<ControlEvent>) {
        for event in events {
            self.handle_event(event);
        }

        info!("Input closed, stopping rover");
        self.stop();
    }

    pub fn handle_event(&mut self, event: ControlEvent) {
        match event {
            ControlEvent::Stick { source, sample } => {
                self.handle_sample(source, sample);
            }
            ControlEvent::Button(button) => self.press_button(button),
            ControlEvent::Stop => {
                self.stop();
            }
            ControlEvent::ToggleLockXy => {
                self.state.lock_xy = !self.state.lock_xy;
                log_toggle("Lock XY", self.state.lock_xy);
            }
            ControlEvent::ToggleCaptureMode => {
                self.state.capture_mode = !self.state.capture_mode;
                log_toggle("Capture", self.state.capture_mode);
            }
            ControlEvent::ToggleDriveMode => {
                self.state.drive_mode = !self.state.drive_mode;
                log_toggle("Auto Nav", self.state.drive_mode);
            }
            ControlEvent::AdjustPower(delta) => {
                self.state.adjust_power(delta);
                info!("Power: {}%", self.state.power);
            }
            ControlEvent::ToggleAutodrive => self.submit(ApiRequest::ToggleAutodrive),
            ControlEvent::Navigate(target) => self.navigate(target),
            ControlEvent::Snapshot(label) => self.create_snapshot(label),
            ControlEvent::RefreshSnapshots => self.refresh_snapshots(),
        }
    }

    /// Map a stick sample and send it unless it repeats the last command.
    /// Returns whether anything was sent.
    pub fn handle_sample(&mut self, source: StickSource, sample: StickSample) -> bool {
        self.state.strafe_source = source;
        let command = map_sample(sample, &self.state);

        if !should_transmit(&command, &self.state.last_sent) {
            return false;
        }

        // The sticks override whatever direction button was held.
        self.pad.release();
        self.transmit(command)
    }

    /// Halt the rover. Never deduplicated.
    pub fn stop(&mut self) -> MotionCommand {
        self.pad.release();
        let command = stop_command(&self.state);
        self.transmit(command);
        command
    }

    pub fn press_button(&mut self, button: DirectionButton) {
        match self.pad.press(button) {
            PadAction::Drive(button) => {
                info!("Button: {}", button);
                let command = button.command(self.state.power);
                self.state.strafe_source = StickSource::for_strafe(command.strafe);
                self.transmit(command);
            }
            PadAction::Stop => {
                info!("Button: stop");
                self.stop();
            }
        }
    }

    pub fn navigate(&mut self, target: NavTarget) {
        if !self.state.capture_mode && !self.state.drive_mode {
            info!(
                "Target x: {} y: {} w: {} h: {} ignored, capture and auto nav are off",
                target.x, target.y, target.w, target.h
            );
            return;
        }

        self.submit(ApiRequest::Navigate(NavigateRequest {
            cmd: target,
            capture_mode: self.state.capture_mode,
            drive_mode: self.state.drive_mode,
        }));
    }

    pub fn create_snapshot(&mut self, label: SnapshotLabel) {
        self.submit(ApiRequest::CreateSnapshot {
            folder: self.snapshot_folder.clone(),
            label,
        });
    }

    pub fn refresh_snapshots(&mut self) {
        self.submit(ApiRequest::Snapshots {
            folder: self.snapshot_folder.clone(),
        });
    }

    /// Queue a motion command. `last_sent` follows what was issued, not what
    /// the rover acknowledged.
    fn transmit(&mut self, command: MotionCommand) -> bool {
        match self.dispatcher.submit(ApiRequest::Joystick(command)) {
            Ok(()) => {
                debug!(
                    "x: {:.2} y: {:.2} strafe: {} power: {:.2}",
                    command.x, command.y, command.strafe, command.power
                );
                self.state.last_sent = command;
                true
            }
            Err(e) => {
                warn!("Failed to queue motion command: {:#}", e);
                false
            }
        }
    }

    fn submit(&self, request: ApiRequest) {
        if let Err(e) = self.dispatcher.submit(request) {
            warn!("Failed to queue request: {:#}", e);
        }
    }
}

fn log_toggle(label: &str, on: bool) {
    info!("{}: {}", label, if on { "ON" } else { "OFF" });
}
