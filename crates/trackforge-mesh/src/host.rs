//! Host-injected services
//!
//! The pipeline runs inside different hosts: an interactive editor that
//! wants object-lifecycle notifications (for undo) and secondary-UV
//! generation, or a headless build with neither. The capability set is
//! passed explicitly into build and layout calls; the core never assumes
//! the editor implementation is present.

use crate::mesh_data::MeshData;

/// Capabilities a surrounding host provides to the build pipeline.
///
/// Non-fatal problems are surfaced through `warning`/`error` for display;
/// the core holds no UI and never blocks on a prompt.
pub trait HostServices {
    /// A generated object came into existence (editors hook undo here).
    fn object_created(&mut self, _name: &str) {}

    /// A generated object was removed.
    fn object_destroyed(&mut self, _name: &str) {}

    /// Generate a secondary UV set for a freshly warped mesh.
    fn generate_secondary_uvs(&mut self, _mesh: &mut MeshData) {}

    /// Malformed-but-expected input (degraded output, element skipped).
    fn warning(&mut self, message: &str);

    /// Structural invariant violation (item skipped, build continues).
    fn error(&mut self, message: &str);
}

/// No-op host for headless or runtime use; diagnostics go to the log.
#[derive(Debug, Default)]
pub struct NullHost;

impl HostServices for NullHost {
    fn warning(&mut self, message: &str) {
        log::warn!("{}", message);
    }

    fn error(&mut self, message: &str) {
        log::error!("{}", message);
    }
}

/// Host that records everything it is told, for CLIs and tests.
#[derive(Debug, Default)]
pub struct CollectingHost {
    pub warnings: Vec<String>,
    pub errors: Vec<String>,
    pub created: Vec<String>,
    pub destroyed: Vec<String>,
}

impl HostServices for CollectingHost {
    fn object_created(&mut self, name: &str) {
        self.created.push(name.to_string());
    }

    fn object_destroyed(&mut self, name: &str) {
        self.destroyed.push(name.to_string());
    }

    fn warning(&mut self, message: &str) {
        self.warnings.push(message.to_string());
    }

    fn error(&mut self, message: &str) {
        self.errors.push(message.to_string());
    }
}
