//! Duplicate resolution within one library family.
//!
//! # Overview
//!
//! For a [`LibraryGroup`] the resolver:
//!
//! 1. Picks the canonical member: the longest file name, ties broken by
//!    name order. Versioned names (`libfoo.so.1.2.3`) are the longest, and
//!    vcpkg installs the real file under that name.
//! 2. Refuses the whole group if the canonical member is a symlink.
//! 3. Hashes the canonical member, then every other member that is not
//!    already a symlink, and relinks those whose SHA-256 matches.
//!
//! Members are never relinked on size alone, and a member whose content
//! differs is reported and left untouched.

use std::cmp::Reverse;
use std::fs;
use std::path::PathBuf;

use serde::Serialize;

use super::groups::LibraryGroup;
use crate::actions::relink_to_canonical;
use crate::scanner::{FileDigest, Hasher};

/// What happened to the group as a whole.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "status", content = "detail", rename_all = "snake_case")]
pub enum GroupOutcome {
    /// Fewer than two members; nothing to do.
    SingleMember,
    /// The canonical member is a symlink; the group was left alone.
    CanonicalIsSymlink,
    /// The canonical member could not be hashed; the group was left alone.
    CanonicalUnreadable(String),
    /// Every non-canonical member was examined.
    Processed,
}

/// What happened to one non-canonical member.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "action", content = "detail", rename_all = "snake_case")]
pub enum MemberAction {
    /// Already a symlink; left untouched. Carries the target if readable.
    AlreadySymlink { target: Option<PathBuf> },
    /// Could not be hashed; left untouched.
    Unreadable(String),
    /// Identical content, replaced with a link to the canonical file.
    Relinked,
    /// Identical content; a dry run would replace it.
    WouldRelink,
    /// Identical content, but replacing it failed.
    RelinkFailed(String),
    /// Same family, different content; left untouched.
    Differs,
}

impl MemberAction {
    /// Whether this action counts as a failure in the run summary.
    #[must_use]
    pub fn is_failure(&self) -> bool {
        matches!(self, Self::Unreadable(_) | Self::RelinkFailed(_))
    }
}

/// One member and what was done with it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct MemberReport {
    /// Member file name
    pub name: String,
    /// Size and hash, when the member was hashed
    #[serde(skip_serializing_if = "Option::is_none")]
    pub size: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub hash: Option<String>,
    /// Action taken
    #[serde(flatten)]
    pub action: MemberAction,
}

/// Result of resolving one group.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct GroupReport {
    /// Family key
    pub family: String,
    /// Directory of the group
    pub dir: PathBuf,
    /// Canonical member, if the group had two or more members
    pub canonical: Option<String>,
    /// Hash of the canonical member, if it was hashed
    pub canonical_hash: Option<String>,
    /// Group-level outcome
    pub outcome: GroupOutcome,
    /// Per-member results, in processing order
    pub members: Vec<MemberReport>,
}

impl GroupReport {
    fn new(group: &LibraryGroup, canonical: Option<String>, outcome: GroupOutcome) -> Self {
        Self {
            family: group.family.clone(),
            dir: group.dir.clone(),
            canonical,
            canonical_hash: None,
            outcome,
            members: Vec::new(),
        }
    }

    fn count(&self, predicate: impl Fn(&MemberAction) -> bool) -> usize {
        self.members.iter().filter(|m| predicate(&m.action)).count()
    }

    /// Members replaced with links.
    #[must_use]
    pub fn relinked(&self) -> usize {
        self.count(|a| matches!(a, MemberAction::Relinked))
    }

    /// Members a dry run would replace.
    #[must_use]
    pub fn would_relink(&self) -> usize {
        self.count(|a| matches!(a, MemberAction::WouldRelink))
    }

    /// Members with different content.
    #[must_use]
    pub fn differing(&self) -> usize {
        self.count(|a| matches!(a, MemberAction::Differs))
    }

    /// Failures in this group, including an unreadable canonical file.
    #[must_use]
    pub fn failures(&self) -> usize {
        let canonical = usize::from(matches!(self.outcome, GroupOutcome::CanonicalUnreadable(_)));
        canonical + self.count(MemberAction::is_failure)
    }
}

/// Order members for canonical selection: longest name first, then by name.
#[must_use]
pub fn canonical_order(members: &[String]) -> Vec<String> {
    let mut ordered = members.to_vec();
    ordered.sort_by(|a, b| {
        Reverse(a.len())
            .cmp(&Reverse(b.len()))
            .then_with(|| a.cmp(b))
    });
    ordered
}

/// Resolves duplicate members of library groups.
#[derive(Debug, Clone, Default)]
pub struct DuplicateResolver {
    dry_run: bool,
    hasher: Hasher,
}

impl DuplicateResolver {
    /// Create a resolver. In dry-run mode nothing on disk is changed.
    #[must_use]
    pub fn new(dry_run: bool) -> Self {
        Self {
            dry_run,
            hasher: Hasher::new(),
        }
    }

    /// Whether this resolver only reports.
    #[must_use]
    pub fn is_dry_run(&self) -> bool {
        self.dry_run
    }

    /// Resolve one group.
    pub fn resolve(&self, group: &LibraryGroup) -> GroupReport {
        if !group.needs_resolution() {
            log::debug!(
                "  Group '{}' has only one file. No action needed.",
                group.family
            );
            return GroupReport::new(group, None, GroupOutcome::SingleMember);
        }

        log::info!(
            "  Found group '{}': {}",
            group.family,
            group.members.join(", ")
        );

        let ordered = canonical_order(&group.members);
        let canonical = ordered[0].clone();
        let canonical_path = group.member_path(&canonical);
        log::info!("    -> Canonical file: {}", canonical);

        if is_symlink(&canonical_path) {
            log::warn!("    Canonical file is a symlink. Skipping this group to be safe.");
            return GroupReport::new(group, Some(canonical), GroupOutcome::CanonicalIsSymlink);
        }

        let canonical_digest = match self.hasher.digest_file(&canonical_path) {
            Ok(digest) => digest,
            Err(e) => {
                log::warn!("    Could not read canonical file: {}. Skipping group.", e);
                return GroupReport::new(
                    group,
                    Some(canonical),
                    GroupOutcome::CanonicalUnreadable(e.to_string()),
                );
            }
        };
        log::debug!(
            "      Size: {} bytes, Hash: {}",
            canonical_digest.size,
            canonical_digest.hash
        );

        let mut report = GroupReport::new(group, Some(canonical.clone()), GroupOutcome::Processed);
        report.canonical_hash = Some(canonical_digest.hash.clone());

        for name in &ordered[1..] {
            let member = self.resolve_member(group, name, &canonical, &canonical_digest);
            report.members.push(member);
        }

        report
    }

    fn resolve_member(
        &self,
        group: &LibraryGroup,
        name: &str,
        canonical: &str,
        canonical_digest: &FileDigest,
    ) -> MemberReport {
        let path = group.member_path(name);
        let report = |digest: Option<&FileDigest>, action| MemberReport {
            name: name.to_string(),
            size: digest.map(|d| d.size),
            hash: digest.map(|d| d.hash.clone()),
            action,
        };

        if is_symlink(&path) {
            let target = fs::read_link(&path).ok();
            match &target {
                Some(t) => log::info!(
                    "    - Skipping '{}': Already a symlink -> '{}'",
                    name,
                    t.display()
                ),
                None => log::info!("    - Skipping '{}': Already a symlink (broken link?)", name),
            }
            return report(None, MemberAction::AlreadySymlink { target });
        }

        let digest = match self.hasher.digest_file(&path) {
            Ok(digest) => digest,
            Err(e) => {
                log::warn!("    - Could not read '{}': {}", name, e);
                return report(None, MemberAction::Unreadable(e.to_string()));
            }
        };
        log::debug!(
            "    - Checking '{}': Size: {} bytes, Hash: {}",
            name,
            digest.size,
            digest.hash
        );

        if digest.hash != canonical_digest.hash {
            log::warn!(
                "    - WARNING: '{}' is not identical to the canonical file. Leaving it alone.",
                name
            );
            return report(Some(&digest), MemberAction::Differs);
        }

        log::info!(
            "    - Found duplicate: '{}' is identical to '{}'.",
            name,
            canonical
        );

        if self.dry_run {
            log::info!("      (DRY RUN) Would remove and link to '{}'", canonical);
            return report(Some(&digest), MemberAction::WouldRelink);
        }

        log::info!("      -> Relinking '{}' -> '{}'", name, canonical);
        match relink_to_canonical(&group.dir, name, canonical) {
            Ok(()) => report(Some(&digest), MemberAction::Relinked),
            Err(e) => {
                log::error!("      FAILED to relink: {}", e);
                report(Some(&digest), MemberAction::RelinkFailed(e.to_string()))
            }
        }
    }
}

fn is_symlink(path: &std::path::Path) -> bool {
    fs::symlink_metadata(path).is_ok_and(|m| m.file_type().is_symlink())
}
