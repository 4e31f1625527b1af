//! Update manifests: what an update job has to do to move a server from its
//! installed license to a desired one.

mod differ;
mod types;

pub use differ::{install_records, uninstall_records, ManifestDiffer, DEFAULT_SECRET_PREFIX};
pub use types::{CredentialTarget, InstallRecord, RepoRecord, UpdateManifest};
