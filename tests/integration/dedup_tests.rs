use std::fs;
use std::path::{Path, PathBuf};

use tempfile::tempdir;
use vcpkg_cache::duplicates::{DedupError, Deduplicator, GroupOutcome, MemberAction};

fn write_libs(dir: &Path, files: &[(&str, &[u8])]) {
    fs::create_dir_all(dir).unwrap();
    for (name, content) in files {
        fs::write(dir.join(name), content).unwrap();
    }
}

fn is_regular_file(path: &Path) -> bool {
    fs::symlink_metadata(path).unwrap().file_type().is_file()
}

#[test]
fn test_dry_run_changes_nothing() {
    let root = tempdir().unwrap();
    let lib = root.path().join("ada-idna_x64-linux").join("lib");
    write_libs(
        &lib,
        &[
            ("libada-idna.so", b"ELF-ada"),
            ("libada-idna.so.1", b"ELF-ada"),
            ("libada-idna.so.1.0.0", b"ELF-ada"),
        ],
    );

    let summary = Deduplicator::new(true).run(root.path()).unwrap();

    assert_eq!(summary.would_relink, 2);
    assert_eq!(summary.relinked, 0);
    for name in ["libada-idna.so", "libada-idna.so.1", "libada-idna.so.1.0.0"] {
        assert!(is_regular_file(&lib.join(name)));
    }
}

#[test]
fn test_unrelated_files_untouched() {
    let root = tempdir().unwrap();
    let lib = root.path().join("zlib_x64-linux").join("lib");
    write_libs(
        &lib,
        &[("libz.a", b"archive"), ("libz.so.1", b"ELF"), ("zlib.pc", b"pc")],
    );
    fs::create_dir_all(lib.join("pkgconfig")).unwrap();

    let summary = Deduplicator::new(false).run(root.path()).unwrap();

    assert_eq!(summary.groups, 1);
    assert_eq!(summary.relinked, 0);
    assert!(is_regular_file(&lib.join("libz.a")));
    assert!(is_regular_file(&lib.join("libz.so.1")));
}

#[test]
fn test_differing_content_is_left_alone() {
    let root = tempdir().unwrap();
    let lib = root.path().join("foo_x64-linux").join("lib");
    write_libs(&lib, &[("libfoo.so", b"old build"), ("libfoo.so.2", b"new build")]);

    let summary = Deduplicator::new(false).run(root.path()).unwrap();

    assert_eq!(summary.differing, 1);
    assert_eq!(fs::read(lib.join("libfoo.so")).unwrap(), b"old build");
    assert!(summary.all_succeeded());
}

#[test]
fn test_missing_root_is_error() {
    let root = tempdir().unwrap();
    let result = Deduplicator::new(false).run(&root.path().join("does-not-exist"));
    assert!(matches!(result, Err(DedupError::RootNotFound(_))));
}

#[cfg(unix)]
#[test]
fn test_ada_idna_family_relinked_to_longest_name() {
    let root = tempdir().unwrap();
    let lib = root.path().join("ada-idna_x64-linux").join("lib");
    write_libs(
        &lib,
        &[
            ("libada-idna.so", b"ELF-ada"),
            ("libada-idna.so.1", b"ELF-ada"),
            ("libada-idna.so.1.0.0", b"ELF-ada"),
        ],
    );

    let summary = Deduplicator::new(false).run(root.path()).unwrap();

    assert_eq!(summary.relinked, 2);
    assert!(is_regular_file(&lib.join("libada-idna.so.1.0.0")));
    for name in ["libada-idna.so", "libada-idna.so.1"] {
        assert_eq!(
            fs::read_link(lib.join(name)).unwrap(),
            PathBuf::from("libada-idna.so.1.0.0")
        );
        assert_eq!(fs::read(lib.join(name)).unwrap(), b"ELF-ada");
    }
}

#[cfg(unix)]
#[test]
fn test_second_run_is_idempotent() {
    let root = tempdir().unwrap();
    let lib = root.path().join("foo_x64-linux").join("debug").join("lib");
    write_libs(&lib, &[("libfoo.so", b"dbg"), ("libfoo.so.3", b"dbg")]);

    let first = Deduplicator::new(false).run(root.path()).unwrap();
    assert_eq!(first.relinked, 1);

    let second = Deduplicator::new(false).run(root.path()).unwrap();
    assert_eq!(second.relinked, 0);
    let group = &second.directories[0].groups[0];
    assert_eq!(group.outcome, GroupOutcome::Processed);
    assert_eq!(
        group.members[0].action,
        MemberAction::AlreadySymlink {
            target: Some(PathBuf::from("libfoo.so.3"))
        }
    );
}

#[cfg(unix)]
#[test]
fn test_equal_length_tie_breaks_by_name() {
    let root = tempdir().unwrap();
    let lib = root.path().join("foo_x64-linux").join("lib");
    write_libs(&lib, &[("libfoo.so.2", b"same"), ("libfoo.so.1", b"same")]);

    let summary = Deduplicator::new(false).run(root.path()).unwrap();

    assert_eq!(
        summary.directories[0].groups[0].canonical.as_deref(),
        Some("libfoo.so.1")
    );
    assert!(is_regular_file(&lib.join("libfoo.so.1")));
    assert_eq!(
        fs::read_link(lib.join("libfoo.so.2")).unwrap(),
        PathBuf::from("libfoo.so.1")
    );
}

#[cfg(unix)]
#[test]
fn test_unreadable_library_dir_is_counted_and_run_continues() {
    use std::os::unix::fs::PermissionsExt;

    let root = tempdir().unwrap();
    let locked = root.path().join("aaa_x64-linux").join("lib");
    write_libs(&locked, &[("liba.so", b"a")]);
    let open = root.path().join("bbb_x64-linux").join("lib");
    write_libs(&open, &[("libb.so", b"b"), ("libb.so.1", b"b")]);

    fs::set_permissions(&locked, fs::Permissions::from_mode(0o000)).unwrap();
    let summary = Deduplicator::new(false).run(root.path()).unwrap();
    fs::set_permissions(&locked, fs::Permissions::from_mode(0o755)).unwrap();

    assert_eq!(summary.library_dirs, 2);
    assert_eq!(summary.relinked, 1);
    // Root can still list the directory
    if summary.directories[0].error.is_some() {
        assert_eq!(summary.failures, 1);
    }
}
