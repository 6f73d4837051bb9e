//! Content hashing for artifact identity.
//!
//! The hash covers everything that can change the generated artifact:
//! the scan configuration and every source file's path and contents.
//! Files are fed in sorted path order, so reordering the scan roots or
//! the filesystem walk cannot change the result.

use sha2::{Digest, Sha256};

use crate::options::AnalyzerOptions;

/// Length of the hex-encoded directory name.
const HASH_LEN: usize = 16;

/// Hash the full analyzer input set.
pub fn content_hash(options: &AnalyzerOptions, files: &[(String, String)]) -> String {
    let mut hasher = Sha256::new();

    for dir in &options.src_dirs {
        hasher.update(crate::options::scan_root_label(dir).as_bytes());
        hasher.update([0]);
    }
    for pattern in &options.exclude {
        hasher.update(pattern.as_bytes());
        hasher.update([0]);
    }
    for ext in &options.extensions {
        hasher.update(ext.as_bytes());
        hasher.update([0]);
    }
    for base in &options.state_base_names {
        hasher.update(base.as_bytes());
        hasher.update([0]);
    }
    for profile in &options.active_profiles {
        hasher.update(profile.as_bytes());
        hasher.update([0]);
    }
    hasher.update([
        options.enable_inheritance_di as u8,
        options.enable_state_di as u8,
        options.enable_interface_resolution as u8,
        options.enable_functional_di as u8,
    ]);
    hasher.update(options.package_name.as_bytes());
    hasher.update([0]);
    hasher.update(options.environment.as_bytes());
    hasher.update([0]);

    let mut sorted: Vec<&(String, String)> = files.iter().collect();
    sorted.sort_by(|a, b| a.0.cmp(&b.0));
    for (path, content) in sorted {
        hasher.update(path.as_bytes());
        hasher.update([0]);
        hasher.update((content.len() as u64).to_le_bytes());
        hasher.update(content.as_bytes());
    }

    let digest = hasher.finalize();
    let mut hex = String::with_capacity(HASH_LEN);
    for byte in &digest[..HASH_LEN / 2] {
        hex.push_str(&format!("{byte:02x}"));
    }
    hex
}
