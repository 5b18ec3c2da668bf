use std::fs::{self, File};
use std::io::Read;
use std::path::{Path, PathBuf};

use sha2::{Digest, Sha256};
use tempfile::tempdir;
use vcpkg_cache::cache::{entry_path, CacheError, CacheStore, PackageOutcome};
use zip::ZipArchive;

fn add_package(root: &Path, dir_name: &str, port: &str, abi: &str) -> PathBuf {
    let package = root.join(dir_name);
    let share = package.join("share").join(port);
    fs::create_dir_all(&share).unwrap();
    fs::write(share.join("vcpkg_abi_info.txt"), abi).unwrap();
    fs::write(share.join("copyright"), format!("{port} license")).unwrap();
    fs::create_dir_all(package.join("include")).unwrap();
    fs::write(package.join("include").join(format!("{port}.h")), "#pragma once\n").unwrap();
    package
}

fn sha256_hex(data: &[u8]) -> String {
    hex::encode(Sha256::digest(data))
}

fn read_entry(archive: &mut ZipArchive<File>, name: &str) -> Vec<u8> {
    let mut file = archive.by_name(name).unwrap();
    let mut buf = Vec::new();
    file.read_to_end(&mut buf).unwrap();
    buf
}

#[test]
fn test_entry_location_is_sharded_abi_hash() {
    let packages = tempdir().unwrap();
    let cache = tempdir().unwrap();
    add_package(packages.path(), "zlib_x64-linux", "zlib", "zlib abi contents\n");

    let summary = CacheStore::new(cache.path())
        .build_from_packages(packages.path())
        .unwrap();

    let hash = sha256_hex(b"zlib abi contents\n");
    let expected = cache.path().join(&hash[..2]).join(format!("{hash}.zip"));
    assert!(expected.is_file());
    assert_eq!(summary.created, 1);
    assert_eq!(summary.error_count(), 0);
    assert_eq!(entry_path(cache.path(), &hash), expected);
}

#[test]
fn test_archive_reproduces_package_tree() {
    let packages = tempdir().unwrap();
    let cache = tempdir().unwrap();
    let package = add_package(packages.path(), "fmt_x64-linux", "fmt", "fmt-abi");
    fs::create_dir_all(package.join("lib").join("pkgconfig")).unwrap();
    fs::create_dir_all(package.join("debug").join("empty")).unwrap();
    fs::write(package.join("lib").join("libfmt.a"), vec![7u8; 10_000]).unwrap();

    CacheStore::new(cache.path())
        .build_from_packages(packages.path())
        .unwrap();

    let entry = entry_path(cache.path(), &sha256_hex(b"fmt-abi"));
    let mut archive = ZipArchive::new(File::open(entry).unwrap()).unwrap();
    let names: Vec<String> = archive.file_names().map(str::to_string).collect();

    assert!(names.contains(&"include/fmt.h".to_string()));
    assert!(names.contains(&"share/fmt/vcpkg_abi_info.txt".to_string()));
    assert!(names.contains(&"lib/pkgconfig/".to_string()));
    assert!(names.contains(&"debug/empty/".to_string()));
    assert!(!names.iter().any(|n| n.starts_with("fmt_x64-linux")));
    assert_eq!(read_entry(&mut archive, "lib/libfmt.a"), vec![7u8; 10_000]);
    assert_eq!(read_entry(&mut archive, "include/fmt.h"), b"#pragma once\n");
}

#[test]
fn test_second_run_skips_existing_entries() {
    let packages = tempdir().unwrap();
    let cache = tempdir().unwrap();
    add_package(packages.path(), "zlib_x64-linux", "zlib", "abi-1");
    add_package(packages.path(), "fmt_x64-linux", "fmt", "abi-2");

    let store = CacheStore::new(cache.path());
    let first = store.build_from_packages(packages.path()).unwrap();
    assert_eq!(first.created, 2);

    let entry = entry_path(cache.path(), &sha256_hex(b"abi-1"));
    let before = fs::read(&entry).unwrap();

    let second = store.build_from_packages(packages.path()).unwrap();
    assert_eq!(second.created, 0);
    assert_eq!(second.skipped, 2);
    assert_eq!(fs::read(&entry).unwrap(), before);
}

#[test]
fn test_existing_entry_is_never_overwritten() {
    let packages = tempdir().unwrap();
    let cache = tempdir().unwrap();
    add_package(packages.path(), "zlib_x64-linux", "zlib", "abi-1");

    let entry = entry_path(cache.path(), &sha256_hex(b"abi-1"));
    fs::create_dir_all(entry.parent().unwrap()).unwrap();
    fs::write(&entry, b"placeholder").unwrap();

    let summary = CacheStore::new(cache.path())
        .build_from_packages(packages.path())
        .unwrap();

    assert_eq!(summary.skipped, 1);
    assert_eq!(fs::read(&entry).unwrap(), b"placeholder");
}

#[test]
fn test_dry_run_writes_nothing() {
    let packages = tempdir().unwrap();
    let cache_parent = tempdir().unwrap();
    let cache = cache_parent.path().join("cache");
    add_package(packages.path(), "zlib_x64-linux", "zlib", "abi-1");

    let summary = CacheStore::new(&cache)
        .with_dry_run(true)
        .build_from_packages(packages.path())
        .unwrap();

    assert_eq!(summary.would_create, 1);
    assert_eq!(summary.created, 0);
    assert!(summary.dry_run);
    assert!(!cache.exists());
}

#[test]
fn test_failed_package_does_not_stop_others() {
    let packages = tempdir().unwrap();
    let cache = tempdir().unwrap();
    add_package(packages.path(), "aaa_x64-linux", "aaa", "abi-a");
    fs::create_dir_all(packages.path().join("broken_x64-linux").join("lib")).unwrap();
    add_package(packages.path(), "zzz_x64-linux", "zzz", "abi-z");

    let summary = CacheStore::new(cache.path())
        .build_from_packages(packages.path())
        .unwrap();

    assert_eq!(summary.total_packages, 3);
    assert_eq!(summary.created, 2);
    assert_eq!(summary.error_count(), 1);
    assert!(summary.errors[0].starts_with("Error processing broken_x64-linux: "));
    assert!(matches!(
        summary.packages[1].outcome,
        PackageOutcome::Failed { .. }
    ));
}

#[test]
fn test_missing_abi_info_is_reported() {
    let packages = tempdir().unwrap();
    let cache = tempdir().unwrap();
    let package = packages.path().join("curl_x64-linux");
    fs::create_dir_all(package.join("share").join("curl")).unwrap();

    let summary = CacheStore::new(cache.path())
        .build_from_packages(packages.path())
        .unwrap();

    assert_eq!(summary.error_count(), 1);
    assert!(summary.errors[0].contains("vcpkg_abi_info.txt"));
}

#[test]
fn test_known_triplet_selects_port() {
    let packages = tempdir().unwrap();
    let cache = tempdir().unwrap();
    add_package(packages.path(), "zlib_x64_custom", "zlib", "abi-custom");

    let without = CacheStore::new(cache.path())
        .with_dry_run(true)
        .build_from_packages(packages.path())
        .unwrap();
    assert_eq!(without.error_count(), 1);

    let with = CacheStore::new(cache.path())
        .with_dry_run(true)
        .with_known_triplets(vec!["x64_custom".to_string()])
        .build_from_packages(packages.path())
        .unwrap();
    assert_eq!(with.would_create, 1);
    match &with.packages[0].outcome {
        PackageOutcome::WouldCreate { identity, .. } => assert_eq!(identity.port, "zlib"),
        other => panic!("Expected WouldCreate, got {:?}", other),
    }
}

#[test]
fn test_empty_packages_root_is_fatal() {
    let packages = tempdir().unwrap();
    let cache = tempdir().unwrap();
    fs::write(packages.path().join("README"), "not a package").unwrap();

    let err = CacheStore::new(cache.path())
        .build_from_packages(packages.path())
        .unwrap_err();
    assert!(matches!(err, CacheError::NoPackages(_)));
}

#[cfg(unix)]
#[test]
fn test_symlinks_and_modes_preserved() {
    use std::os::unix::fs::PermissionsExt;

    let packages = tempdir().unwrap();
    let cache = tempdir().unwrap();
    let package = add_package(packages.path(), "ada-idna_x64-linux", "ada-idna", "ada-abi");
    let lib = package.join("lib");
    fs::create_dir_all(&lib).unwrap();
    fs::write(lib.join("libada-idna.so.1.0.0"), b"ELF").unwrap();
    fs::set_permissions(lib.join("libada-idna.so.1.0.0"), fs::Permissions::from_mode(0o755))
        .unwrap();
    std::os::unix::fs::symlink("libada-idna.so.1.0.0", lib.join("libada-idna.so")).unwrap();

    CacheStore::new(cache.path())
        .build_from_packages(packages.path())
        .unwrap();

    let entry = entry_path(cache.path(), &sha256_hex(b"ada-abi"));
    let mut archive = ZipArchive::new(File::open(entry).unwrap()).unwrap();

    {
        let link = archive.by_name("lib/libada-idna.so").unwrap();
        assert!(link.is_symlink());
    }
    assert_eq!(
        read_entry(&mut archive, "lib/libada-idna.so"),
        b"libada-idna.so.1.0.0"
    );
    let real = archive.by_name("lib/libada-idna.so.1.0.0").unwrap();
    assert_eq!(real.unix_mode().unwrap() & 0o777, 0o755);
}
