//! Requests understood by the rover's HTTP backend.

use crate::pipeline::MotionCommand;
use color_eyre::eyre::Result;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::{fmt, str::FromStr, time::Duration};

/// Class label attached to a recorded snapshot.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SnapshotLabel {
    Forward,
    Left,
    Right,
}

impl SnapshotLabel {
    pub fn as_str(self) -> &'static str {
        match self {
            SnapshotLabel::Forward => "forward",
            SnapshotLabel::Left => "left",
            SnapshotLabel::Right => "right",
        }
    }
}

impl fmt::Display for SnapshotLabel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for SnapshotLabel {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "forward" => Ok(SnapshotLabel::Forward),
            "left" => Ok(SnapshotLabel::Left),
            "right" => Ok(SnapshotLabel::Right),
            _ => Err(format!("unknown snapshot label: {s}")),
        }
    }
}

/// Snapshot totals per label for a folder.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SnapshotCounts {
    #[serde(default)]
    pub forward: u64,
    #[serde(default)]
    pub left: u64,
    #[serde(default)]
    pub right: u64,
}

impl fmt::Display for SnapshotCounts {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "Left: {} Forward: {} Right: {}",
            self.left, self.forward, self.right
        )
    }
}

/// Pixel position on the camera image, with the image size it was taken on.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct NavTarget {
    pub x: f64,
    pub y: f64,
    pub w: f64,
    pub h: f64,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NavigateRequest {
    pub cmd: NavTarget,
    pub capture_mode: bool,
    pub drive_mode: bool,
}

#[derive(Debug, Clone, PartialEq)]
pub enum ApiRequest {
    Joystick(MotionCommand),
    Navigate(NavigateRequest),
    Snapshots { folder: String },
    CreateSnapshot { folder: String, label: SnapshotLabel },
    ToggleAutodrive,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Method {
    Get,
    Post,
}

impl ApiRequest {
    pub fn method(&self) -> Method {
        match self {
            ApiRequest::Snapshots { .. } => Method::Get,
            _ => Method::Post,
        }
    }

    pub fn path(&self) -> String {
        match self {
            ApiRequest::Joystick(_) => "/api/joystick".to_string(),
            ApiRequest::Navigate(_) => "/api/navigate".to_string(),
            ApiRequest::Snapshots { folder } => format!("/api/snapshots/{folder}"),
            ApiRequest::CreateSnapshot { folder, label } => {
                format!("/api/snapshots/{folder}/{label}")
            }
            ApiRequest::ToggleAutodrive => "/api/autodrive".to_string(),
        }
    }

    /// JSON body, if the endpoint takes one.
    pub fn body(&self) -> Result<Option<Value>> {
        Ok(match self {
            ApiRequest::Joystick(command) => Some(serde_json::to_value(command)?),
            ApiRequest::Navigate(request) => Some(serde_json::to_value(request)?),
            _ => None,
        })
    }

    /// Whether the response carries fresh snapshot counts.
    pub fn returns_snapshot_counts(&self) -> bool {
        matches!(
            self,
            ApiRequest::Snapshots { .. } | ApiRequest::CreateSnapshot { .. }
        )
    }
}

/// Something that can deliver a request to the rover and hand back its reply.
pub trait Backend: Send + Sync {
    fn send(&self, request: &ApiRequest) -> Result<Value>;
}

/// Talks to the rover's web server over HTTP.
pub struct HttpBackend {
    base_url: String,
    agent: ureq::Agent,
}

impl HttpBackend {
    pub fn new(base_url: &str, timeout: Duration) -> Self {
        Self {
            base_url: base_url.trim_end_matches('/').to_string(),
            agent: ureq::AgentBuilder::new().timeout(timeout).build(),
        }
    }

    pub fn url(&self, request: &ApiRequest) -> String {
        format!("{}{}", self.base_url, request.path())
    }
}

impl Backend for HttpBackend {
    fn send(&self, request: &ApiRequest) -> Result<Value> {
        let url = self.url(request);
        let response = match (request.method(), request.body()?) {
            (Method::Get, _) => self.agent.get(&url).call()?,
            (Method::Post, Some(body)) => self.agent.post(&url).send_json(body)?,
            (Method::Post, None) => self.agent.post(&url).call()?,
        };

        Ok(response.into_json()?)
    }
}
