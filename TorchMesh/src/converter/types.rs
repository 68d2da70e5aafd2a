//! Progress reporting for the import and export pipelines

/// Progress callback for pipeline operations.
pub type ProgressCallback<'a> = &'a dyn Fn(&ConvertProgress);

/// Progress information during import or export.
#[derive(Debug, Clone)]
pub struct ConvertProgress {
    pub phase: ConvertPhase,
    /// Current step (1-indexed)
    pub current: usize,
    pub total: usize,
    /// File being read or written, if any
    pub current_file: Option<String>,
}

impl ConvertProgress {
    #[must_use]
    pub fn new(phase: ConvertPhase, current: usize, total: usize) -> Self {
        Self { phase, current, total, current_file: None }
    }

    #[must_use]
    pub fn with_file(phase: ConvertPhase, current: usize, total: usize, file: impl Into<String>) -> Self {
        Self { phase, current, total, current_file: Some(file.into()) }
    }

    /// Progress as 0.0 - 1.0
    #[must_use]
    pub fn percentage(&self) -> f32 {
        if self.total == 0 { 1.0 } else { self.current as f32 / self.total as f32 }
    }
}

/// Pipeline phase.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConvertPhase {
    // === Import ===
    ReadingMesh,
    ReadingSkeleton,
    ReadingMaterials,
    PopulatingScene,

    // === Export ===
    ReadingScene,
    BuildingSkeleton,
    BuildingMeshes,
    BuildingAnimations,
    Encoding,
    WritingFiles,

    // === Common ===
    Complete,
}

impl ConvertPhase {
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::ReadingMesh => "Reading mesh",
            Self::ReadingSkeleton => "Reading skeleton",
            Self::ReadingMaterials => "Reading materials",
            Self::PopulatingScene => "Populating scene",
            Self::ReadingScene => "Reading scene",
            Self::BuildingSkeleton => "Building skeleton",
            Self::BuildingMeshes => "Building meshes",
            Self::BuildingAnimations => "Building animations",
            Self::Encoding => "Encoding",
            Self::WritingFiles => "Writing files",
            Self::Complete => "Complete",
        }
    }
}

/// Callback that ignores every update.
pub(crate) fn no_progress(_: &ConvertProgress) {}
