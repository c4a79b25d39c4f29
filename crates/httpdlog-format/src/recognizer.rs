//! Per-worker line recognition scratch.
//!
//! Matching is pure CPU and holds no locks; each worker owns one
//! [`LineScratch`] sized to the recognizer's capture count and reuses it for
//! every line it reads. Captures are exposed as borrowed slices of the input
//! line, so nothing is copied on the hot path.

use regex::{CaptureLocations, Regex};

/// Reusable capture-offset buffer for a single worker.
#[derive(Debug)]
pub struct LineScratch {
    locations: CaptureLocations,
}

impl LineScratch {
    pub(crate) fn new(regex: &Regex) -> Self {
        Self {
            locations: regex.capture_locations(),
        }
    }

    /// Run the recognizer over a line, recording capture offsets.
    pub(crate) fn run(&mut self, regex: &Regex, line: &str) -> bool {
        regex.captures_read(&mut self.locations, line).is_some()
    }

    /// Borrow capture group `index` (1-based) out of `line`.
    ///
    /// Only meaningful after a successful
    /// [`recognize`](crate::CompiledFormat::recognize) on the same line.
    pub fn get<'l>(&self, line: &'l str, index: usize) -> Option<&'l str> {
        self.locations
            .get(index)
            .map(|(start, end)| &line[start..end])
    }
}
