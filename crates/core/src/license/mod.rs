//! Licenses: the set of software components a server should run.
//!
//! - [`License`] / [`SoftwareComponent`]: the data model.
//! - [`LicenseStore`]: the installed license, persisted as `_license`.
//! - [`LicenseFetcher`]: where desired licenses come from.

mod remote;
mod store;
mod types;

pub use remote::{license_url, HttpLicenseFetcher, LicenseFetchError, LicenseFetcher};
pub use store::{LicenseError, LicenseStore, LICENSE_FILE_NAME};
pub use types::{License, SetOption, SoftwareComponent};
