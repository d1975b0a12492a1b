//! SHA-256 digests of built bundles.

use anyhow::{Context, Result};
use sha2::{Digest, Sha256};
use std::fs::File;
use std::io::{self, BufReader};
use std::path::{Path, PathBuf};

/// Hex-encoded SHA-256 of a file's contents.
pub fn sha256_file(path: &Path) -> Result<String> {
    let file = File::open(path).with_context(|| format!("opening '{}'", path.display()))?;
    let mut reader = BufReader::new(file);
    let mut hasher = Sha256::new();
    io::copy(&mut reader, &mut hasher).with_context(|| format!("hashing '{}'", path.display()))?;
    Ok(format!("{:x}", hasher.finalize()))
}

/// Write `<hash>  <filename>` next to `bundle` as `<bundle>.sha256`.
///
/// Only the file name is recorded so the bundle can be verified with
/// `sha256sum -c` from its own directory.
pub fn write_checksum_file(bundle: &Path, hash: &str) -> Result<PathBuf> {
    let filename = bundle
        .file_name()
        .context("bundle path has no file name")?
        .to_string_lossy();

    let mut checksum_path = bundle.as_os_str().to_owned();
    checksum_path.push(".sha256");
    let checksum_path = PathBuf::from(checksum_path);

    std::fs::write(&checksum_path, format!("{hash}  {filename}\n"))
        .with_context(|| format!("writing checksum '{}'", checksum_path.display()))?;
    Ok(checksum_path)
}

/// `abcdef12...34567890` form for progress output.
pub fn abbreviate(hash: &str) -> String {
    if hash.len() >= 16 {
        format!("{}...{}", &hash[..8], &hash[hash.len() - 8..])
    } else {
        hash.to_string()
    }
}
