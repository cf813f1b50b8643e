//! Build metadata embedded by `build.rs`.

pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Git commit SHA
pub const GIT_SHA: &str = env!("VERGEN_GIT_SHA");

pub const GIT_BRANCH: &str = env!("VERGEN_GIT_BRANCH");

/// Whether the working tree had uncommitted changes
pub const GIT_DIRTY: &str = env!("VERGEN_GIT_DIRTY");

pub const RUSTC_VERSION: &str = env!("VERGEN_RUSTC_SEMVER");

pub const BUILD_TIMESTAMP: &str = env!("VERGEN_BUILD_TIMESTAMP");

/// Target triple
pub const TARGET: &str = env!("VERGEN_CARGO_TARGET_TRIPLE");

/// User agent sent to the MAAS API.
pub const USER_AGENT: &str = concat!("neolaas-provisioner/", env!("CARGO_PKG_VERSION"));

/// `<version> (<git_sha>[ dirty])`
pub fn full_version() -> String {
    let dirty = if GIT_DIRTY == "true" { " dirty" } else { "" };
    format!("{VERSION} ({GIT_SHA}{dirty})")
}

/// Multi-line build report for `neolaas-provisioner version`.
pub fn build_info() -> String {
    format!(
        "neolaas-provisioner {}\n\
         branch: {}\n\
         built:  {}\n\
         rustc:  {}\n\
         target: {}",
        full_version(),
        GIT_BRANCH,
        BUILD_TIMESTAMP,
        RUSTC_VERSION,
        TARGET
    )
}
