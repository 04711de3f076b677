//! Service layer
//!
//! One service per pipeline stage. Each service wraps an external
//! collaborator behind a trait (package manager, toolchain manager, build
//! backend, asset uploader) and turns collaborator failures into the job
//! error of its stage.
//!
//! All collaborators are trait-based to enable testing and dependency injection.

mod build;
mod provision;
mod publish;
mod toolchain;

// Re-export traits
pub use build::BuildBackend;
pub use provision::PackageManager;
pub use publish::AssetUploader;
pub use toolchain::ToolchainManager;

// Re-export implementations
pub use build::{BuildExecutor, CargoBuild};
pub use provision::{Provisioner, SystemPackageManager};
pub use publish::Publisher;
pub use toolchain::{RustupToolchain, ToolchainInstaller};
