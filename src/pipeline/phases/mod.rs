// Pipeline stages, in execution order
//
// Each stage reads what earlier stages left in the context and stores its own
// output there before returning.

#[path = "01_scan.rs"]
pub mod scan;
#[path = "02_detect.rs"]
pub mod detect;
#[path = "03_imports.rs"]
pub mod imports;
#[path = "04_resolve.rs"]
pub mod resolve;
#[path = "05_lock.rs"]
pub mod lock;
#[path = "06_synthesize.rs"]
pub mod synthesize;
#[path = "07_sbom.rs"]
pub mod sbom;
#[path = "08_build.rs"]
pub mod build;
#[path = "09_run.rs"]
pub mod run;

pub use build::BuildPhase;
pub use detect::DetectPhase;
pub use imports::ImportsPhase;
pub use lock::LockPhase;
pub use resolve::ResolvePhase;
pub use run::RunPhase;
pub use sbom::SbomPhase;
pub use scan::ScanPhase;
pub use synthesize::SynthesizePhase;
