//! Disposable per-module workspaces
//!
//! Every module runs inside its own sandbox (a fresh mapset) below the
//! target location. A sandbox is created right before execution and removed
//! right after it, whatever the outcome. Removal problems never abort a run.

mod naming;
mod provisioner;

pub use naming::{sandbox_id, SANDBOX_PREFIX};
pub use provisioner::{
    create_sandbox, destroy_sandbox, Sandbox, SandboxError, SandboxProvisioner,
    DEFAULT_REGION_FILE, PERMANENT_MAPSET, REGION_FILE,
};
