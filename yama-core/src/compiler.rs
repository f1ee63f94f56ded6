use std::sync::Arc;

use yama_model::{ImportPath, Module};

use crate::install::Environment;
use crate::signal::Result;

/// What a [`Compiler`] invocation can ask its host domain to do while
/// turning source text into a [`Module`]. Compilation may recursively
/// import `self.X`/`dep.X` paths — those recursive imports go through the
/// same memoised, verified path as any other import, just re-entered on
/// the same thread (the new-data lock is reentrant for exactly this
/// reason).
pub trait CompileServices: Send + Sync {
    /// Imports `path`, resolving its head through the compiling parcel's own
    /// environment if it isn't already an install-name.
    fn import(&self, path: &ImportPath) -> Result<Arc<Module>>;

    /// The environment of the parcel whose source is being compiled.
    fn environment(&self) -> &Environment;
}

/// The source-language compiler collaborator: turns a source-code blob
/// returned by a parcel's `import` into a fully-formed [`Module`]. The
/// concrete parser/grammar and AST-to-bytecode pipeline are out of scope
/// for this crate — it only defines the seam.
pub trait Compiler: Send + Sync {
    fn compile(
        &self,
        services: &dyn CompileServices,
        source: &str,
        source_import_path: &ImportPath,
    ) -> Result<Module>;
}
