//! Pass configuration and output-location derivation.

use std::ffi::OsStr;
use std::io;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::ParseError;

// ---------------------------------------------------------------------------
// StreamConfig
// ---------------------------------------------------------------------------

/// Configuration for one parse pass.
///
/// Missing fields fall back to [`Default`] when deserialized, so a config
/// file only needs to name what it changes.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct StreamConfig {
    /// Pretty-print each record (and the header). The framing tokens are
    /// unaffected.
    pub pretty: bool,
    /// Appended to the input's file stem to name the ticks document.
    pub ticks_suffix: String,
    /// Appended to the input's file stem to name the header document.
    pub header_suffix: String,
    /// Capacity of the buffered writer in front of the ticks document.
    /// Zero disables buffering.
    pub buffer_capacity: usize,
}

impl Default for StreamConfig {
    /// Compact records, `<stem>_ticks.json` / `<stem>_header.json`, 64 KiB
    /// write buffer.
    fn default() -> Self {
        Self {
            pretty: false,
            ticks_suffix: "_ticks.json".to_owned(),
            header_suffix: "_header.json".to_owned(),
            buffer_capacity: 64 * 1024,
        }
    }
}

// ---------------------------------------------------------------------------
// OutputPaths
// ---------------------------------------------------------------------------

/// The two artifacts produced for one input.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OutputPaths {
    pub ticks: PathBuf,
    pub header: PathBuf,
}

impl OutputPaths {
    /// Place both outputs next to `input`, named after its file stem.
    ///
    /// `matches/final.dem` with the default config yields
    /// `matches/final_ticks.json` and `matches/final_header.json`.
    pub fn for_input(input: &Path, config: &StreamConfig) -> Self {
        let stem = input.file_stem().unwrap_or(OsStr::new("replay"));
        let sibling = |suffix: &str| {
            let mut name = stem.to_os_string();
            name.push(suffix);
            input.with_file_name(name)
        };
        Self {
            ticks: sibling(&config.ticks_suffix),
            header: sibling(&config.header_suffix),
        }
    }

    /// Check that neither output overwrites `input` and that the two outputs
    /// are distinct files.
    ///
    /// Paths are compared as written; `for_input` always derives siblings of
    /// `input`, so a suffix equal to the input's extension is caught here.
    pub fn ensure_distinct(&self, input: &Path) -> Result<(), ParseError> {
        let collision = if self.ticks == input {
            Some((&self.ticks, "ticks output would overwrite the replay input"))
        } else if self.header == input {
            Some((&self.header, "header output would overwrite the replay input"))
        } else if self.ticks == self.header {
            Some((&self.header, "ticks and header outputs resolve to the same file"))
        } else {
            None
        };

        match collision {
            Some((path, reason)) => Err(ParseError::CreateOutput {
                path: path.clone(),
                source: io::Error::new(io::ErrorKind::InvalidInput, reason),
            }),
            None => Ok(()),
        }
    }
}
