use anyhow::{Context, Result};
use atomic_write_file::AtomicWriteFile;
use serde::Serialize;
use std::io::Write;
use std::path::Path;

/// Write `value` to `path` as 2-space indented JSON, atomically.
///
/// The destination is either the complete new document or left untouched.
/// The parent directory must already exist.
pub fn write_json_pretty<T: Serialize>(path: &Path, value: &T) -> Result<()> {
    let mut file = AtomicWriteFile::open(path)
        .with_context(|| format!("Failed to open atomic write file at {}", path.display()))?;

    serde_json::to_writer_pretty(&mut file, value)
        .with_context(|| format!("Failed to serialize JSON for {}", path.display()))?;
    file.flush()
        .with_context(|| format!("Failed to flush {}", path.display()))?;

    file.commit()
        .with_context(|| format!("Failed to save {}", path.display()))?;

    Ok(())
}
