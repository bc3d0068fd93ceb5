//! Read file naming conventions.

use crate::errors::ConfigError;
use serde::{Deserialize, Serialize};

/// A forward/reverse marker pair such as `_R1_001` / `_R2_001`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MateMarkers {
    /// Marker of the forward read file.
    pub forward: String,
    /// Marker of the reverse read file.
    pub reverse: String,
}

impl MateMarkers {
    /// Creates a marker pair.
    #[must_use]
    pub fn new(forward: impl Into<String>, reverse: impl Into<String>) -> Self {
        Self {
            forward: forward.into(),
            reverse: reverse.into(),
        }
    }
}

/// How the sample name is derived from a read file name.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SampleNaming {
    /// The text before the first delimiter.
    #[default]
    FirstDelimiter,
    /// The whole stem with the mate marker removed.
    StripMarker,
}

/// Which mate of a pair a file holds.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Mate {
    /// Forward (R1) reads.
    Forward,
    /// Reverse (R2) reads.
    Reverse,
}

/// What a file name means under a [`ReadConvention`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ReadName {
    /// A mate file of the named sample. `markers` indexes the matched marker pair.
    Mate {
        /// Derived sample name.
        sample: String,
        /// Forward or reverse.
        mate: Mate,
        /// Index into [`ReadConvention::markers`].
        markers: usize,
    },
    /// A read file without a recognised mate marker.
    Unmarked,
}

/// Naming convention for paired read files (config section `[discovery]`).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReadConvention {
    /// Marker pairs, tried longest first.
    #[serde(default = "default_markers")]
    pub markers: Vec<MateMarkers>,
    /// Recognised read file extensions.
    #[serde(default = "default_extensions")]
    pub extensions: Vec<String>,
    /// Delimiter ending the sample name under [`SampleNaming::FirstDelimiter`].
    #[serde(default = "default_delimiter")]
    pub delimiter: String,
    /// Sample naming mode.
    #[serde(default)]
    pub naming: SampleNaming,
}

fn default_markers() -> Vec<MateMarkers> {
    vec![
        MateMarkers::new("_R1_001", "_R2_001"),
        MateMarkers::new("_R1", "_R2"),
        MateMarkers::new("_1", "_2"),
    ]
}

fn default_extensions() -> Vec<String> {
    [".fastq.gz", ".fq.gz", ".fastq", ".fq"]
        .into_iter()
        .map(String::from)
        .collect()
}

fn default_delimiter() -> String {
    "_".to_string()
}

impl Default for ReadConvention {
    fn default() -> Self {
        Self {
            markers: default_markers(),
            extensions: default_extensions(),
            delimiter: default_delimiter(),
            naming: SampleNaming::default(),
        }
    }
}

impl ReadConvention {
    /// Checks that the convention can classify anything at all.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Invalid`] for empty or self-contradicting entries.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.markers.is_empty() {
            return Err(ConfigError::invalid("discovery.markers", "at least one marker pair is required"));
        }
        for pair in &self.markers {
            if pair.forward.is_empty() || pair.reverse.is_empty() {
                return Err(ConfigError::invalid("discovery.markers", "markers must not be empty"));
            }
            if pair.forward == pair.reverse {
                return Err(ConfigError::invalid(
                    "discovery.markers",
                    format!("forward and reverse marker are both '{}'", pair.forward),
                ));
            }
        }
        if self.extensions.is_empty() {
            return Err(ConfigError::invalid("discovery.extensions", "at least one extension is required"));
        }
        if let Some(ext) = self.extensions.iter().find(|e| !e.starts_with('.') || e.len() < 2) {
            return Err(ConfigError::invalid(
                "discovery.extensions",
                format!("'{ext}' must start with '.'"),
            ));
        }
        if self.delimiter.is_empty() {
            return Err(ConfigError::invalid("discovery.delimiter", "must not be empty"));
        }
        Ok(())
    }

    /// Classifies a file name.
    ///
    /// Returns `None` for files that are not read files at all. The longest
    /// matching extension and the longest matching marker win.
    #[must_use]
    pub fn classify(&self, file_name: &str) -> Option<ReadName> {
        let lower = file_name.to_ascii_lowercase();
        let ext_len = self
            .extensions
            .iter()
            .filter(|ext| lower.ends_with(&ext.to_ascii_lowercase()))
            .map(String::len)
            .max()?;
        let stem = &file_name[..file_name.len() - ext_len];

        let candidates = self.markers.iter().enumerate().flat_map(|(i, pair)| {
            [(i, Mate::Forward, pair.forward.as_str()), (i, Mate::Reverse, pair.reverse.as_str())]
        });
        let Some((markers, mate, marker)) = candidates
            .filter(|(_, _, marker)| stem.ends_with(marker))
            .max_by_key(|(i, _, marker)| (marker.len(), std::cmp::Reverse(*i)))
        else {
            return Some(ReadName::Unmarked);
        };

        let base = &stem[..stem.len() - marker.len()];
        let sample = match self.naming {
            SampleNaming::FirstDelimiter => base.split(self.delimiter.as_str()).next().unwrap_or(base),
            SampleNaming::StripMarker => base,
        };
        Some(ReadName::Mate {
            sample: sample.to_string(),
            mate,
            markers,
        })
    }
}
