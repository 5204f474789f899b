//! Textconv: the pre-diff presentation transform (§4.7). When a path's
//! driver names a textconv command and the option is enabled, run that
//! command over a tempfile holding the side's bytes, and substitute its
//! stdout for the bytes that get diffed. The `FileSpec`'s hash and size are
//! untouched — textconv changes what the differ sees, never what the
//! content *is*.

use crate::error::DiffError;
use crate::filespec::FileSpec;
use crate::tempfile_glue::TempfileSlot;
use std::path::Path;

/// Apply `spec`'s driver's textconv command, if any, in place. No-op if the
/// driver has none, or if `spec` has no bytes yet (the caller is expected to
/// `fill` before converting).
pub fn apply(spec: &mut FileSpec, root: &Path) -> Result<(), DiffError> {
    let Some(command) = spec.driver.textconv_command.clone() else {
        return Ok(());
    };
    spec.fill(root)?;
    let bytes = spec.bytes().expect("just filled").to_vec();

    let slot = TempfileSlot::create(&bytes)?;
    let output = std::process::Command::new(&command)
        .arg(slot.path())
        .output()
        .map_err(|source| DiffError::ChildProcess {
            command: command.clone(),
            path: slot.path().to_path_buf(),
            reason: source.to_string(),
        })?;
    drop(slot);

    if !output.status.success() {
        return Err(DiffError::ChildProcess {
            command,
            path: root.join(String::from_utf8_lossy(&spec.path).into_owned()),
            reason: format!("exited with {}", output.status),
        });
    }

    spec.set_textconv_bytes(output.stdout);
    Ok(())
}
