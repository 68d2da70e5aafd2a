//! CLI progress display utilities
//!
//! Step indicators with emoji for single-file commands and a progress bar
//! for directory batches.

use std::time::Duration;

use console::{Emoji, style};
use indicatif::{HumanDuration, ProgressBar, ProgressStyle};

use crate::converter::{ConvertPhase, ConvertProgress};

// =============================================================================
// Emoji Constants (with ASCII fallbacks for terminals without emoji support)
// =============================================================================

/// Magnifying glass - for reading/scanning operations
pub static LOOKING_GLASS: Emoji<'_, '_> = Emoji("🔍 ", "");
/// Floppy disk - for writing/saving operations
pub static DISK: Emoji<'_, '_> = Emoji("💾 ", "");
/// Gear - for processing/conversion operations
pub static GEAR: Emoji<'_, '_> = Emoji("⚙️  ", "");
/// Sparkles - for completion
pub static SPARKLE: Emoji<'_, '_> = Emoji("✨ ", "");
/// Cube - for 3D model operations
pub static CUBE: Emoji<'_, '_> = Emoji("📐 ", "");

/// Print a step indicator: `[1/3] 🔍 Message...`
pub fn print_step(current: usize, total: usize, emoji: &Emoji, msg: &str) {
    println!("{} {}{}", style(format!("[{current}/{total}]")).bold().dim(), emoji, msg);
}

/// Print completion message: `✨ Done in 2s`
pub fn print_done(elapsed: Duration) {
    println!("{} Done in {}", SPARKLE, HumanDuration(elapsed));
}

/// Emoji for a pipeline phase.
fn phase_emoji(phase: ConvertPhase) -> &'static Emoji<'static, 'static> {
    match phase {
        ConvertPhase::ReadingMesh
        | ConvertPhase::ReadingSkeleton
        | ConvertPhase::ReadingMaterials
        | ConvertPhase::ReadingScene => &LOOKING_GLASS,
        ConvertPhase::BuildingSkeleton | ConvertPhase::BuildingMeshes | ConvertPhase::BuildingAnimations => &CUBE,
        ConvertPhase::Encoding | ConvertPhase::PopulatingScene => &GEAR,
        ConvertPhase::WritingFiles => &DISK,
        ConvertPhase::Complete => &SPARKLE,
    }
}

/// Print a pipeline progress update as a step line.
pub fn print_progress(progress: &ConvertProgress) {
    if progress.phase == ConvertPhase::Complete {
        return;
    }
    let msg = match &progress.current_file {
        Some(file) => format!("{} {file}...", progress.phase.as_str()),
        None => format!("{}...", progress.phase.as_str()),
    };
    print_step(progress.current, progress.total, phase_emoji(progress.phase), &msg);
}

/// Progress bar style for determinate progress
///
/// Format: `Validating [████████░░░░░░░░] 50/100`
///
/// # Panics
/// Panics if the template string is invalid (this is a compile-time constant).
#[must_use]
pub fn bar_style() -> ProgressStyle {
    ProgressStyle::default_bar()
        .template("{msg} [{bar:40.cyan/blue}] {pos}/{len}")
        .expect("valid template")
}

/// Create a simple progress bar
#[must_use]
pub fn simple_bar(total: u64, msg: &str) -> ProgressBar {
    let pb = ProgressBar::new(total);
    pb.set_style(bar_style());
    pb.set_message(msg.to_string());
    pb
}
