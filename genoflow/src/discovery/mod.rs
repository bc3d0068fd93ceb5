//! Input discovery.
//!
//! Scans an input directory and groups read files into samples by their
//! forward/reverse naming convention. Files that cannot be paired are
//! reported as [`DiscoveryWarning`](crate::errors::DiscoveryWarning)s and
//! never stop discovery of the remaining samples.

mod convention;
mod matcher;

pub use convention::{Mate, MateMarkers, ReadConvention, ReadName, SampleNaming};
pub use matcher::{Discovery, FilePairMatcher, ReadPair};
