use std::path::PathBuf;

use snafu::Snafu;

#[derive(Debug, Snafu)]
#[snafu(visibility(pub(crate)))]
pub enum Error {
    #[snafu(display("Failed to read manifest {}, error: {source}", path.display()))]
    ReadManifest { path: PathBuf, source: std::io::Error },

    #[snafu(display("Failed to write rendered manifest, error: {source}"))]
    WriteRenderedManifest { source: std::io::Error },

    #[snafu(display("Failed to remove rendered manifest {}, error: {source}", path.display()))]
    RemoveRenderedManifest { path: PathBuf, source: std::io::Error },
}
