use std::io;
use std::path::Path;

/// Make sure the Copilot CLI binary at `path` can be executed.
///
/// Package managers do not always preserve the executable bit on bundled
/// binaries. Returns `Ok(true)` when permissions were changed, `Ok(false)` when
/// the file is missing or already executable. A no-op on non-Unix targets.
pub fn ensure_executable(path: &Path) -> io::Result<bool> {
    if !path.is_file() {
        return Ok(false);
    }
    set_execute_bits(path)
}

#[cfg(unix)]
fn set_execute_bits(path: &Path) -> io::Result<bool> {
    use std::os::unix::fs::PermissionsExt;

    let metadata = std::fs::metadata(path)?;
    let mode = metadata.permissions().mode();
    if mode & 0o100 != 0 {
        return Ok(false);
    }
    std::fs::set_permissions(path, std::fs::Permissions::from_mode(mode | 0o111))?;
    tracing::info!("Marked {} as executable", path.display());
    Ok(true)
}

#[cfg(not(unix))]
fn set_execute_bits(_path: &Path) -> io::Result<bool> {
    Ok(false)
}
