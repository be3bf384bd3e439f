//! Table rendering for the cluster status report.

mod snapshot_ext;

pub use self::snapshot_ext::TableExt;
