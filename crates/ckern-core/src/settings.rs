/// Per-evaluation settings shared by tessellation, bevel building and key blending.
///
/// Deserializes with defaults for any missing field, so a partial JSON
/// document (`{"rendering": true}`) is a valid configuration.
#[derive(Debug, Clone, Copy, PartialEq, serde::Serialize, serde::Deserialize)]
#[serde(default)]
pub struct EvalSettings {
    /// Use the curve's render resolution instead of the interactive one.
    pub rendering: bool,
    /// Per-axis distance below which consecutive bevel points are welded.
    pub weld_tolerance: f64,
    /// Emit a single point for Bezier segments whose inner handles are both `Vector`.
    pub collapse_vector_segments: bool,
    /// Subsample slurph re-timing for large element counts.
    pub slurph_subsample: bool,
    /// Element count above which slurph subsampling kicks in.
    pub slurph_subsample_threshold: usize,
    /// Number of chunks a subsampled slurph pass is split into.
    pub slurph_subsample_chunks: usize,
}

impl EvalSettings {
    pub const DEFAULT_WELD_TOLERANCE: f64 = 1e-5;

    pub fn interactive() -> Self {
        Self {
            rendering: false,
            weld_tolerance: Self::DEFAULT_WELD_TOLERANCE,
            collapse_vector_segments: true,
            slurph_subsample: true,
            slurph_subsample_threshold: 100,
            slurph_subsample_chunks: 50,
        }
    }

    pub fn render() -> Self {
        Self {
            rendering: true,
            ..Self::interactive()
        }
    }

    /// Check if two points coincide within the weld tolerance on every axis.
    pub fn welds(&self, a: [f64; 3], b: [f64; 3]) -> bool {
        (a[0] - b[0]).abs() < self.weld_tolerance
            && (a[1] - b[1]).abs() < self.weld_tolerance
            && (a[2] - b[2]).abs() < self.weld_tolerance
    }

    /// Slurph chunk size for `total` elements.
    pub fn slurph_step(&self, total: usize) -> usize {
        if self.slurph_subsample && total > self.slurph_subsample_threshold {
            (total / self.slurph_subsample_chunks.max(1)).max(1)
        } else {
            1
        }
    }
}

impl Default for EvalSettings {
    fn default() -> Self {
        Self::interactive()
    }
}
