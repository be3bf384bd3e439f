//! Per-run rendering of the deployment manifest.
//!
//! The base manifest carries a literal placeholder token where the registry
//! name belongs. Rendering is plain text substitution; the YAML is never
//! parsed.

mod error;

use std::{
    io::Write,
    path::{Path, PathBuf},
};

use snafu::ResultExt;
use tempfile::NamedTempFile;

pub use self::error::Error;

/// Replaces every occurrence of `placeholder` in `template` with `value`.
///
/// An empty `placeholder` leaves the template untouched.
pub fn substitute(template: &str, placeholder: &str, value: &str) -> String {
    if placeholder.is_empty() { template.to_string() } else { template.replace(placeholder, value) }
}

/// A rendered manifest stored in a temporary file.
///
/// The file is deleted by [`RenderedManifest::remove`] or, if the run stops
/// early, when the value is dropped.
#[derive(Debug)]
pub struct RenderedManifest {
    file: NamedTempFile,
    replacements: usize,
}

impl RenderedManifest {
    /// Reads `base`, substitutes `placeholder` with `value` and writes the
    /// result to a new temporary file.
    ///
    /// # Errors
    ///
    /// Fails when `base` cannot be read or the temporary file cannot be
    /// written.
    pub fn render(base: &Path, placeholder: &str, value: &str) -> Result<Self, Error> {
        let template = std::fs::read_to_string(base)
            .with_context(|_| error::ReadManifestSnafu { path: base.to_path_buf() })?;
        let replacements =
            if placeholder.is_empty() { 0 } else { template.matches(placeholder).count() };
        let rendered = substitute(&template, placeholder, value);

        let mut file = tempfile::Builder::new()
            .prefix("deployment-")
            .suffix(".yaml")
            .tempfile()
            .context(error::WriteRenderedManifestSnafu)?;
        file.write_all(rendered.as_bytes()).context(error::WriteRenderedManifestSnafu)?;
        file.flush().context(error::WriteRenderedManifestSnafu)?;

        tracing::debug!(
            "Rendered {} into {} ({replacements} replacement(s))",
            base.display(),
            file.path().display()
        );
        Ok(Self { file, replacements })
    }

    pub fn path(&self) -> &Path { self.file.path() }

    /// Number of placeholder occurrences that were replaced.
    pub const fn replacements(&self) -> usize { self.replacements }

    /// Deletes the temporary file.
    ///
    /// # Errors
    ///
    /// Returns [`Error::RemoveRenderedManifest`] when the file cannot be
    /// deleted.
    pub fn remove(self) -> Result<PathBuf, Error> {
        let path = self.file.path().to_path_buf();
        self.file.close().with_context(|_| error::RemoveRenderedManifestSnafu { path: path.clone() })?;
        Ok(path)
    }
}
