//! Pairing read files into samples.

use super::convention::{Mate, ReadConvention, ReadName};
use crate::core::Sample;
use crate::errors::{ConfigError, DiscoveryWarning};
use regex::Regex;
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use tracing::{debug, warn};

/// A matched forward/reverse pair.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReadPair {
    /// Sample name.
    pub name: String,
    /// Forward read file.
    pub forward: PathBuf,
    /// Reverse read file.
    pub reverse: PathBuf,
}

/// Result of scanning an input directory.
#[derive(Debug, Clone, Default)]
pub struct Discovery {
    pairs: Vec<ReadPair>,
    warnings: Vec<DiscoveryWarning>,
}

impl Discovery {
    /// Matched pairs in sample name order.
    #[must_use]
    pub fn pairs(&self) -> &[ReadPair] {
        &self.pairs
    }

    /// Files that could not be placed into a sample.
    #[must_use]
    pub fn warnings(&self) -> &[DiscoveryWarning] {
        &self.warnings
    }

    /// Splits the discovery into its pairs and warnings.
    #[must_use]
    pub fn into_parts(self) -> (Vec<ReadPair>, Vec<DiscoveryWarning>) {
        (self.pairs, self.warnings)
    }

    /// Lazily turns the pairs into samples rooted at `output_root/<name>`.
    pub fn samples<'a>(&'a self, output_root: &'a Path) -> impl Iterator<Item = Sample> + 'a {
        self.pairs.iter().map(move |pair| {
            Sample::new(
                pair.name.clone(),
                pair.forward.clone(),
                pair.reverse.clone(),
                output_root.join(&pair.name),
            )
        })
    }
}

#[derive(Default)]
struct Group {
    forward: Vec<(PathBuf, usize)>,
    reverse: Vec<(PathBuf, usize)>,
}

impl Group {
    fn into_files(self) -> Vec<PathBuf> {
        let mut files: Vec<PathBuf> = self
            .forward
            .into_iter()
            .chain(self.reverse)
            .map(|(path, _)| path)
            .collect();
        files.sort();
        files
    }
}

/// Groups read files into same-sample forward/reverse pairs.
#[derive(Debug, Clone)]
pub struct FilePairMatcher {
    convention: ReadConvention,
    safe_name: Regex,
}

impl FilePairMatcher {
    /// Creates a matcher for the given convention.
    ///
    /// # Errors
    ///
    /// Returns an error if the convention is invalid.
    pub fn new(convention: ReadConvention) -> Result<Self, ConfigError> {
        convention.validate()?;
        let safe_name =
            Regex::new(r"^[A-Za-z0-9._-]+$").map_err(|e| ConfigError::Parse(e.to_string()))?;
        Ok(Self {
            convention,
            safe_name,
        })
    }

    /// Returns the convention in use.
    #[must_use]
    pub fn convention(&self) -> &ReadConvention {
        &self.convention
    }

    /// Scans `input_dir` (not recursively) and pairs its read files.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::InputDirectory`] if the directory cannot be listed.
    pub fn discover(&self, input_dir: &Path) -> Result<Discovery, ConfigError> {
        let entries = std::fs::read_dir(input_dir)
            .map_err(|e| ConfigError::input_directory(input_dir, e.to_string()))?;

        let mut files = Vec::new();
        for entry in entries {
            let entry = entry.map_err(|e| ConfigError::input_directory(input_dir, e.to_string()))?;
            let path = entry.path();
            if path.is_file() {
                files.push(path);
            } else {
                debug!(path = %path.display(), "Skipping non-file entry");
            }
        }

        let discovery = self.pair_files(files);
        for warning in discovery.warnings() {
            warn!(%warning, "Read file not paired");
        }
        debug!(
            input = %input_dir.display(),
            samples = discovery.pairs().len(),
            warnings = discovery.warnings().len(),
            "Discovery finished"
        );
        Ok(discovery)
    }

    /// Pairs an already listed set of files.
    #[must_use]
    pub fn pair_files(&self, files: impl IntoIterator<Item = PathBuf>) -> Discovery {
        let mut groups: BTreeMap<String, Group> = BTreeMap::new();
        let mut unmarked = Vec::new();

        for path in files {
            let Some(file_name) = path.file_name().and_then(|n| n.to_str()) else {
                debug!(path = %path.display(), "Skipping file with non UTF-8 name");
                continue;
            };
            match self.convention.classify(file_name) {
                None => debug!(path = %path.display(), "Ignoring non-read file"),
                Some(ReadName::Unmarked) => unmarked.push(path),
                Some(ReadName::Mate {
                    sample,
                    mate,
                    markers,
                }) => {
                    let group = groups.entry(sample).or_default();
                    match mate {
                        Mate::Forward => group.forward.push((path, markers)),
                        Mate::Reverse => group.reverse.push((path, markers)),
                    }
                }
            }
        }

        let mut discovery = Discovery::default();
        for (sample, mut group) in groups {
            if !self.is_safe_name(&sample) {
                discovery.warnings.push(DiscoveryWarning::InvalidSampleName {
                    sample,
                    files: group.into_files(),
                });
                continue;
            }
            match (group.forward.len(), group.reverse.len()) {
                (1, 1) if group.forward[0].1 == group.reverse[0].1 => {
                    let (forward, _) = group.forward.remove(0);
                    let (reverse, _) = group.reverse.remove(0);
                    discovery.pairs.push(ReadPair {
                        name: sample,
                        forward,
                        reverse,
                    });
                }
                (0, 1) | (1, 0) => discovery.warnings.push(DiscoveryWarning::Orphan {
                    sample,
                    files: group.into_files(),
                }),
                _ => discovery.warnings.push(DiscoveryWarning::Ambiguous {
                    sample,
                    files: group.into_files(),
                }),
            }
        }

        unmarked.sort();
        discovery
            .warnings
            .extend(unmarked.into_iter().map(|file| DiscoveryWarning::UnrecognizedMate {
                files: vec![file],
            }));
        discovery
    }

    fn is_safe_name(&self, name: &str) -> bool {
        name != "." && name != ".." && self.safe_name.is_match(name)
    }
}
