//! File naming and disk-scanning helpers for unit files.
//!
//! All three logs of a unit live under one cache root and share the
//! `{kind}_{shard}_{unit}.dat` convention.

use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use regex::Regex;
use tracing::debug;

use blobcache_types::{ShardId, UnitId};

use crate::error::LogResult;

pub const BINARY_KIND: &str = "binary";
pub const INDEX_KIND: &str = "idx_h";
pub const MANIFEST_KIND: &str = "mf_h";

fn unit_file(root: &Path, kind: &str, shard: ShardId, unit: &UnitId) -> PathBuf {
    root.join(format!("{kind}_{shard}_{unit}.dat"))
}

pub fn binary_path(root: &Path, shard: ShardId, unit: &UnitId) -> PathBuf {
    unit_file(root, BINARY_KIND, shard, unit)
}

pub fn index_path(root: &Path, shard: ShardId, unit: &UnitId) -> PathBuf {
    unit_file(root, INDEX_KIND, shard, unit)
}

pub fn manifest_path(root: &Path, shard: ShardId, unit: &UnitId) -> PathBuf {
    unit_file(root, MANIFEST_KIND, shard, unit)
}

/// Size of the file at `path`, or 0 if it does not exist.
pub fn file_size(path: &Path) -> io::Result<u64> {
    match fs::metadata(path) {
        Ok(meta) => Ok(meta.len()),
        Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(0),
        Err(e) => Err(e),
    }
}

/// Combined on-disk size of a unit's three files.
pub fn unit_files_size(root: &Path, shard: ShardId, unit: &UnitId) -> io::Result<u64> {
    Ok(file_size(&binary_path(root, shard, unit))?
        + file_size(&index_path(root, shard, unit))?
        + file_size(&manifest_path(root, shard, unit))?)
}

/// Delete a unit's three files. Returns the bytes reclaimed; a file that is
/// already absent counts zero.
pub fn remove_unit_files(root: &Path, shard: ShardId, unit: &UnitId) -> io::Result<u64> {
    let mut reclaimed = 0;
    for path in [
        binary_path(root, shard, unit),
        index_path(root, shard, unit),
        manifest_path(root, shard, unit),
    ] {
        let size = file_size(&path)?;
        match fs::remove_file(&path) {
            Ok(()) => reclaimed += size,
            Err(e) if e.kind() == io::ErrorKind::NotFound => {}
            Err(e) => return Err(e),
        }
    }
    debug!(unit = %unit, reclaimed, "removed unit files");
    Ok(reclaimed)
}

/// Scan the cache root for units belonging to this shard.
///
/// Unit ids are recovered from index-file names; the returned total is the
/// combined size of every matching unit's three files.
pub fn scan_units(root: &Path, shard: ShardId) -> LogResult<(Vec<UnitId>, u64)> {
    let pattern = format!(r"^{INDEX_KIND}_{shard}_(.+)\.dat$");
    let re = Regex::new(&pattern).expect("valid unit-file pattern");

    let mut units = Vec::new();
    for entry in fs::read_dir(root)? {
        let entry = entry?;
        let name = entry.file_name();
        let Some(name) = name.to_str() else { continue };
        if let Some(caps) = re.captures(name) {
            units.push(UnitId::new(&caps[1]));
        }
    }

    let mut total = 0;
    for unit in &units {
        total += unit_files_size(root, shard, unit)?;
    }
    debug!(shard = %shard, units = units.len(), total, "scanned cache root");
    Ok((units, total))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn paths_follow_naming_convention() {
        let root = Path::new("/cache");
        let unit = UnitId::new("ab12cd34");
        assert_eq!(
            binary_path(root, ShardId(3), &unit),
            PathBuf::from("/cache/binary_3_ab12cd34.dat")
        );
        assert_eq!(
            index_path(root, ShardId(3), &unit),
            PathBuf::from("/cache/idx_h_3_ab12cd34.dat")
        );
        assert_eq!(
            manifest_path(root, ShardId(3), &unit),
            PathBuf::from("/cache/mf_h_3_ab12cd34.dat")
        );
    }

    #[test]
    fn scan_finds_only_this_shard() {
        let dir = tempfile::tempdir().unwrap();
        let root = dir.path();
        fs::write(root.join("idx_h_1_unit0001.dat"), b"2\n[\n]").unwrap();
        fs::write(root.join("idx_h_1_unit0002.dat"), b"3\n[\n]").unwrap();
        fs::write(root.join("idx_h_2_other001.dat"), b"2\n[\n]").unwrap();
        fs::write(root.join("binary_1_unit0001.dat"), b"xxxx").unwrap();
        fs::write(root.join("unrelated.txt"), b"zz").unwrap();

        let (mut units, total) = scan_units(root, ShardId(1)).unwrap();
        units.sort();
        assert_eq!(
            units,
            vec![UnitId::new("unit0001"), UnitId::new("unit0002")]
        );
        // two index files (5 bytes each) plus one binary file (4 bytes)
        assert_eq!(total, 14);
    }

    #[test]
    fn remove_reports_reclaimed_bytes() {
        let dir = tempfile::tempdir().unwrap();
        let root = dir.path();
        let unit = UnitId::new("unit0001");
        fs::write(binary_path(root, ShardId(0), &unit), b"123456").unwrap();
        fs::write(index_path(root, ShardId(0), &unit), b"2\n[\n]").unwrap();
        // manifest intentionally absent

        let reclaimed = remove_unit_files(root, ShardId(0), &unit).unwrap();
        assert_eq!(reclaimed, 11);
        assert_eq!(file_size(&binary_path(root, ShardId(0), &unit)).unwrap(), 0);

        // removing again reclaims nothing
        assert_eq!(remove_unit_files(root, ShardId(0), &unit).unwrap(), 0);
    }
}
