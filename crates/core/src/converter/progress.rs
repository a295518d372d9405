//! Parsing of ffmpeg's `-progress` key=value stream.

use once_cell::sync::Lazy;
use regex_lite::Regex;

static OUT_TIME_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^out_time_(?:ms|us)=(\d+)").expect("valid regex"));
static SPEED_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"speed=\s*(\d+(?:\.\d+)?)x").expect("valid regex"));

/// One recognised progress line.
#[derive(Debug, Clone, PartialEq)]
pub enum ProgressLine {
    /// Output position in seconds.
    Time(f64),
    /// Encoding speed, e.g. "2.5x".
    Speed(String),
}

/// Recognises the progress keys ffmpeg writes to `pipe:2`.
///
/// Both `out_time_ms` and `out_time_us` are in microseconds.
pub fn parse_progress_line(line: &str) -> Option<ProgressLine> {
    let line = line.trim();
    if let Some(caps) = OUT_TIME_RE.captures(line) {
        let micros = caps.get(1)?.as_str().parse::<f64>().ok()?;
        return Some(ProgressLine::Time(micros / 1_000_000.0));
    }
    SPEED_RE
        .captures(line)
        .and_then(|caps| caps.get(1))
        .map(|m| ProgressLine::Speed(format!("{}x", m.as_str())))
}

/// Turns raw output positions into a clamped, non-decreasing percentage.
#[derive(Debug, Clone)]
pub struct ProgressTracker {
    duration_secs: Option<f64>,
    percent: f32,
}

impl ProgressTracker {
    pub fn new(duration_secs: Option<f64>) -> Self {
        Self {
            duration_secs: duration_secs.filter(|d| d.is_finite() && *d > 0.0),
            percent: 0.0,
        }
    }

    /// Records the output position and returns the current percentage.
    pub fn update(&mut self, time_secs: f64) -> f32 {
        if let Some(duration) = self.duration_secs {
            let raw = (time_secs / duration * 100.0) as f32;
            if raw.is_finite() {
                self.percent = self.percent.max(raw.clamp(0.0, 100.0));
            }
        }
        self.percent
    }

    /// Marks the job complete.
    pub fn finish(&mut self) -> f32 {
        self.percent = 100.0;
        self.percent
    }

    pub fn percent(&self) -> f32 {
        self.percent
    }
}
