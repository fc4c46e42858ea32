use crate::api::{ApiRequest, Backend};
use crate::pipeline::MotionCommand;
use color_eyre::eyre::{bail, Result};
use serde_json::{json, Value};
use std::{
    sync::{Arc, Mutex},
    thread,
    time::{Duration, Instant},
};

/// Backend that remembers every request it is given.
#[derive(Clone, Default)]
pub struct RecordingBackend {
    requests: Arc<Mutex<Vec<ApiRequest>>>,
    fail: bool,
    delay: Duration,
}

impl RecordingBackend {
    /// Records requests but answers each one with an error.
    pub fn failing() -> Self {
        Self {
            fail: true,
            ..Self::default()
        }
    }

    /// Takes `delay` to answer each request.
    pub fn slow(delay: Duration) -> Self {
        Self {
            delay,
            ..Self::default()
        }
    }

    pub fn requests(&self) -> Vec<ApiRequest> {
        self.requests.lock().unwrap().clone()
    }

    pub fn motion(&self) -> Vec<MotionCommand> {
        self.requests()
            .into_iter()
            .filter_map(|request| match request {
                ApiRequest::Joystick(command) => Some(command),
                _ => None,
            })
            .collect()
    }

    /// Poll until the delivered motion commands satisfy `done`.
    pub fn wait_for(&self, timeout: Duration, done: impl Fn(&[MotionCommand]) -> bool) -> bool {
        let deadline = Instant::now() + timeout;

        while Instant::now() < deadline {
            if done(&self.motion()) {
                return true;
            }
            thread::sleep(Duration::from_millis(1));
        }

        done(&self.motion())
    }

    /// Wait until `count` motion commands have been delivered.
    pub fn settle(&self, count: usize) {
        assert!(
            self.wait_for(Duration::from_secs(2), |sent| sent.len() >= count),
            "expected {count} motion commands, got {:?}",
            self.motion()
        );
    }
}

impl Backend for RecordingBackend {
    fn send(&self, request: &ApiRequest) -> Result<Value> {
        if !self.delay.is_zero() {
            thread::sleep(self.delay);
        }
        self.requests.lock().unwrap().push(request.clone());

        if self.fail {
            bail!("connection refused");
        }

        if request.returns_snapshot_counts() {
            Ok(json!({"forward": 1, "left": 2, "right": 3}))
        } else {
            Ok(json!({"status": "ok"}))
        }
    }
}
