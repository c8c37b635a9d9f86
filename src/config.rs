//! Runtime configuration and the host environment gates are checked against.

use std::fmt;
use std::time::Duration;

// ---------------------------------------------------------------------------
// Environment
// ---------------------------------------------------------------------------

/// Coarse device class the `environment` gate matches against.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DeviceClass {
    Mobile,
    Tablet,
    Desktop,
}

impl DeviceClass {
    /// Parse a device class name, case-insensitively.
    pub fn parse(s: &str) -> Option<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "mobile" | "phone" => Some(Self::Mobile),
            "tablet" => Some(Self::Tablet),
            "desktop" => Some(Self::Desktop),
            _ => None,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Mobile => "mobile",
            Self::Tablet => "tablet",
            Self::Desktop => "desktop",
        }
    }
}

impl fmt::Display for DeviceClass {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Screen orientation, observed by the base runtime through the
/// `orientation` attribute.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Orientation {
    Portrait,
    Landscape,
}

impl Orientation {
    pub fn parse(s: &str) -> Option<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "portrait" => Some(Self::Portrait),
            "landscape" => Some(Self::Landscape),
            _ => None,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Portrait => "portrait",
            Self::Landscape => "landscape",
        }
    }
}

/// Description of the host a runtime renders for.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Environment {
    /// Protocol the document was served over, without the trailing colon.
    pub protocol: String,
    pub device: DeviceClass,
    /// Operating system string (matched by substring).
    pub os: String,
    /// Browser identity string (matched by substring).
    pub browser: String,
    pub orientation: Orientation,
}

impl Default for Environment {
    fn default() -> Self {
        Self {
            protocol: "https".to_owned(),
            device: DeviceClass::Desktop,
            os: String::new(),
            browser: String::new(),
            orientation: Orientation::Landscape,
        }
    }
}

impl Environment {
    /// Describe the process this runtime runs in: a desktop landscape host on
    /// the compile-time OS, served from local files.
    pub fn detect() -> Self {
        Self {
            protocol: "file".to_owned(),
            os: std::env::consts::OS.to_owned(),
            ..Self::default()
        }
    }

    pub fn with_protocol(mut self, protocol: impl Into<String>) -> Self {
        let protocol = protocol.into();
        self.protocol = protocol.trim_end_matches(':').to_ascii_lowercase();
        self
    }

    pub fn with_device(mut self, device: DeviceClass) -> Self {
        self.device = device;
        self
    }

    pub fn with_os(mut self, os: impl Into<String>) -> Self {
        self.os = os.into();
        self
    }

    pub fn with_browser(mut self, browser: impl Into<String>) -> Self {
        self.browser = browser.into();
        self
    }

    pub fn with_orientation(mut self, orientation: Orientation) -> Self {
        self.orientation = orientation;
        self
    }
}

// ---------------------------------------------------------------------------
// RuntimeConfig
// ---------------------------------------------------------------------------

/// Configuration for a [`Runtime`](crate::runtime::Runtime).
#[derive(Debug, Clone)]
pub struct RuntimeConfig {
    /// Host environment gates are evaluated against.
    pub environment: Environment,
    /// Target frames per second for the paint-aligned frame source.
    pub fps: u32,
    /// Name of the event broadcast at the root when an instance becomes ready.
    pub ready_event: String,
    /// Timeout used by [`Runtime::wait_for_default`](crate::runtime::Runtime::wait_for_default).
    /// Zero waits forever.
    pub wait_timeout: Duration,
    /// Upper bound on frames [`Runtime::settle`](crate::runtime::Runtime::settle) runs.
    pub max_settle_frames: usize,
}

impl Default for RuntimeConfig {
    fn default() -> Self {
        Self {
            environment: Environment::default(),
            fps: 60,
            ready_event: "component-ready".to_owned(),
            wait_timeout: Duration::from_secs(5),
            max_settle_frames: 64,
        }
    }
}

impl RuntimeConfig {
    /// Create a new default config.
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the environment (builder).
    pub fn with_environment(mut self, environment: Environment) -> Self {
        self.environment = environment;
        self
    }

    /// Set the target FPS (builder).
    pub fn with_fps(mut self, fps: u32) -> Self {
        self.fps = fps;
        self
    }

    /// Set the ready event name (builder).
    pub fn with_ready_event(mut self, name: impl Into<String>) -> Self {
        self.ready_event = name.into();
        self
    }

    /// Set the default wait timeout (builder).
    pub fn with_wait_timeout(mut self, timeout: Duration) -> Self {
        self.wait_timeout = timeout;
        self
    }

    /// Set the settle bound (builder).
    pub fn with_max_settle_frames(mut self, frames: usize) -> Self {
        self.max_settle_frames = frames;
        self
    }

    /// Duration of one paint frame at the configured FPS.
    pub fn frame_interval(&self) -> Duration {
        Duration::from_secs_f64(1.0 / f64::from(self.fps.max(1)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config() {
        let config = RuntimeConfig::default();
        assert_eq!(config.fps, 60);
        assert_eq!(config.ready_event, "component-ready");
        assert_eq!(config.environment.device, DeviceClass::Desktop);
    }

    #[test]
    fn builder_chain() {
        let config = RuntimeConfig::new()
            .with_fps(30)
            .with_ready_event("ready")
            .with_wait_timeout(Duration::ZERO)
            .with_max_settle_frames(8);
        assert_eq!(config.fps, 30);
        assert_eq!(config.ready_event, "ready");
        assert!(config.wait_timeout.is_zero());
        assert_eq!(config.max_settle_frames, 8);
    }

    #[test]
    fn frame_interval_guards_zero_fps() {
        let config = RuntimeConfig::new().with_fps(0);
        assert_eq!(config.frame_interval(), Duration::from_secs(1));
        let config = RuntimeConfig::new().with_fps(50);
        assert_eq!(config.frame_interval(), Duration::from_millis(20));
    }

    #[test]
    fn environment_protocol_is_normalised() {
        let env = Environment::default().with_protocol("HTTP:");
        assert_eq!(env.protocol, "http");
    }

    #[test]
    fn parse_device_and_orientation() {
        assert_eq!(DeviceClass::parse(" Mobile "), Some(DeviceClass::Mobile));
        assert_eq!(DeviceClass::parse("watch"), None);
        assert_eq!(Orientation::parse("PORTRAIT"), Some(Orientation::Portrait));
        assert_eq!(Orientation::parse("sideways"), None);
    }

    #[test]
    fn detect_uses_compile_time_os() {
        let env = Environment::detect();
        assert_eq!(env.os, std::env::consts::OS);
        assert_eq!(env.protocol, "file");
    }
}
