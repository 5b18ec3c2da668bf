//! Human-readable run reports.
//!
//! Progress for individual packages and groups goes through the log; these
//! writers print the closing summary to stdout.

use std::io::{self, Write};

use crate::cache::BuildSummary;
use crate::duplicates::{DedupSummary, GroupOutcome, MemberAction};

const RULE_WIDTH: usize = 70;

/// Write the cache build summary.
///
/// # Errors
///
/// Returns any error from `writer`.
pub fn write_build_summary<W: Write>(writer: &mut W, summary: &BuildSummary) -> io::Result<()> {
    writeln!(writer, "{}", "=".repeat(RULE_WIDTH))?;
    writeln!(writer, "Summary:")?;
    if summary.dry_run {
        writeln!(writer, "  Would create: {}", summary.would_create)?;
    } else {
        writeln!(writer, "  Created: {}", summary.created)?;
    }
    writeln!(writer, "  Skipped: {}", summary.skipped)?;
    writeln!(writer, "  Errors: {}", summary.error_count())?;

    if !summary.errors.is_empty() {
        writeln!(writer, "\nErrors:")?;
        for error in &summary.errors {
            writeln!(writer, "  - {error}")?;
        }
    }

    if summary.interrupted {
        writeln!(
            writer,
            "\nInterrupted after {} of {} packages.",
            summary.packages.len(),
            summary.total_packages
        )?;
    }

    if !summary.dry_run && summary.created > 0 {
        writeln!(
            writer,
            "\nCache created at: {}",
            summary.absolute_cache_root().display()
        )?;
        writeln!(writer, "\nTo use this cache, set:")?;
        writeln!(
            writer,
            "  export VCPKG_BINARY_SOURCES='{}'",
            summary.binary_sources()
        )?;
    }

    Ok(())
}

/// Write per-group actions and the dedup completion line.
///
/// # Errors
///
/// Returns any error from `writer`.
pub fn write_dedup_summary<W: Write>(writer: &mut W, summary: &DedupSummary) -> io::Result<()> {
    if summary.dry_run {
        writeln!(writer, "=== DRY RUN: no files were modified ===")?;
    }

    for dir in &summary.directories {
        if let Some(ref error) = dir.error {
            writeln!(writer, "{}: could not read directory: {error}", dir.path.display())?;
            continue;
        }
        let groups: Vec<_> = dir
            .groups
            .iter()
            .filter(|g| g.outcome != GroupOutcome::SingleMember)
            .collect();
        if groups.is_empty() {
            continue;
        }

        writeln!(writer, "{}", dir.path.display())?;
        for group in groups {
            let canonical = group.canonical.as_deref().unwrap_or("?");
            match &group.outcome {
                GroupOutcome::CanonicalIsSymlink => {
                    writeln!(
                        writer,
                        "  {}: skipped, canonical {canonical} is a symlink",
                        group.family
                    )?;
                }
                GroupOutcome::CanonicalUnreadable(error) => {
                    writeln!(
                        writer,
                        "  {}: skipped, cannot read {canonical}: {error}",
                        group.family
                    )?;
                }
                GroupOutcome::SingleMember | GroupOutcome::Processed => {
                    writeln!(writer, "  {} -> {canonical}", group.family)?;
                }
            }
            for member in &group.members {
                writeln!(writer, "    {} {}", describe(&member.action), member.name)?;
            }
        }
    }

    writeln!(
        writer,
        "\n{} packages, {} library directories, {} groups",
        summary.packages, summary.library_dirs, summary.groups
    )?;
    if summary.dry_run {
        writeln!(writer, "  Would relink: {}", summary.would_relink)?;
    } else {
        writeln!(writer, "  Relinked: {}", summary.relinked)?;
    }
    writeln!(writer, "  Differing: {}", summary.differing)?;
    writeln!(writer, "  Failures: {}", summary.failures)?;

    if summary.interrupted {
        writeln!(writer, "\n=== Deduplication interrupted. ===")?;
    } else {
        writeln!(writer, "\n=== Deduplication complete. ===")?;
    }
    Ok(())
}

fn describe(action: &MemberAction) -> String {
    match action {
        MemberAction::AlreadySymlink { target: Some(t) } => format!("[symlink -> {}]", t.display()),
        MemberAction::AlreadySymlink { target: None } => "[symlink]".to_string(),
        MemberAction::Unreadable(e) => format!("[unreadable: {e}]"),
        MemberAction::Relinked => "[relinked]".to_string(),
        MemberAction::WouldRelink => "[would relink]".to_string(),
        MemberAction::RelinkFailed(e) => format!("[relink failed: {e}]"),
        MemberAction::Differs => "[differs, kept]".to_string(),
    }
}
