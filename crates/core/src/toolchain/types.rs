//! Types for the toolchain module.

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Where a toolchain installation was found.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ToolchainSource {
    /// Paths given explicitly in configuration.
    Configured,
    /// Found on the system search path.
    SystemPath,
    /// Previously installed in the application-managed directory.
    Managed,
    /// Downloaded and installed during this process.
    Downloaded,
}

/// Resolved paths of the transcoder and its probe companion.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ToolchainLocation {
    /// Path to the ffmpeg executable.
    pub ffmpeg: PathBuf,
    /// Path to the ffprobe executable.
    pub ffprobe: PathBuf,
    /// How the installation was located.
    pub source: ToolchainSource,
}

impl ToolchainLocation {
    /// Location of two executables inside `dir`.
    pub fn in_dir(
        dir: &Path,
        ffmpeg_name: &str,
        ffprobe_name: &str,
        source: ToolchainSource,
    ) -> Self {
        Self {
            ffmpeg: dir.join(ffmpeg_name),
            ffprobe: dir.join(ffprobe_name),
            source,
        }
    }

    /// Directory containing the ffmpeg executable.
    pub fn directory(&self) -> Option<&Path> {
        self.ffmpeg.parent()
    }

    /// Whether both executables exist on disk.
    pub fn exists(&self) -> bool {
        self.ffmpeg.is_file() && self.ffprobe.is_file()
    }
}

/// Lifecycle of the runtime dependency bootstrap.
///
/// ```text
/// Unchecked -> Probing -> Available
///                      -> Downloading -> Available
///                                     -> Unavailable (terminal)
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ToolchainState {
    Unchecked,
    Probing,
    Downloading,
    Available,
    Unavailable,
}

impl ToolchainState {
    /// Whether no further transition can happen.
    pub fn is_settled(&self) -> bool {
        matches!(self, Self::Available | Self::Unavailable)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_location_in_dir() {
        let loc = ToolchainLocation::in_dir(
            Path::new("/opt/ffmpeg"),
            "ffmpeg",
            "ffprobe",
            ToolchainSource::Managed,
        );
        assert_eq!(loc.ffmpeg, PathBuf::from("/opt/ffmpeg/ffmpeg"));
        assert_eq!(loc.ffprobe, PathBuf::from("/opt/ffmpeg/ffprobe"));
        assert_eq!(loc.directory(), Some(Path::new("/opt/ffmpeg")));
        assert!(!loc.exists());
    }

    #[test]
    fn test_settled_states() {
        assert!(ToolchainState::Available.is_settled());
        assert!(ToolchainState::Unavailable.is_settled());
        assert!(!ToolchainState::Probing.is_settled());
        assert!(!ToolchainState::Unchecked.is_settled());
    }
}
