use std::sync::Arc;

use yama_model::{ImportPath, Module};

use crate::compiler::{CompileServices, Compiler};
use crate::install::Environment;
use crate::parcel::{ImportOutcome, Parcel};
use crate::signal::{Result, Signal};
use crate::sink::{Category, DebugSink};

/// Resolves an import path's head (a dep-name or `self`, meaningful only
/// relative to `requester_env`) to an install-name.
pub fn resolve_head(path: &ImportPath, requester_env: &Environment) -> Result<String> {
    requester_env
        .resolve(path.head())
        .map(str::to_string)
        .ok_or_else(|| Signal::ImportModuleNotFound(path.to_string()))
}

/// The result of one successful import: the module itself and the
/// install-name it was resolved under (needed by the loader to qualify
/// fully-qualified names nested within it).
pub struct ImportedModule {
    pub install_name: String,
    pub module: Arc<Module>,
}

/// Imports `(install_name, relative_path)`, given a parcel to ask and
/// (optionally) a compiler to hand source blobs to. Does **not** consult or
/// update any memo table — that is the domain's job, so this function can be
/// unit-tested without locking or caching concerns.
pub fn import_uncached(
    parcel: &dyn Parcel,
    install_name: &str,
    relative_path: &str,
    compiler: Option<&dyn Compiler>,
    services: &dyn CompileServices,
    source_path: &ImportPath,
    sink: &dyn DebugSink,
) -> Result<Module> {
    match parcel.import(relative_path) {
        ImportOutcome::NotFound => {
            crate::yama_log!(
                sink,
                Category::IMPORT,
                "module not found: {install_name}.{relative_path}"
            );
            Err(Signal::ImportModuleNotFound(format!(
                "{install_name}.{relative_path}"
            )))
        }
        ImportOutcome::Ready(module) => verify_and_return(module, install_name, sink),
        ImportOutcome::Source(source) => {
            let compiler = compiler.ok_or_else(|| {
                Signal::ImportModuleNotFound(format!("{install_name}.{relative_path}"))
            })?;
            let module = compiler.compile(services, &source, source_path)?;
            verify_and_return(module, install_name, sink)
        }
    }
}

/// The single place a module becomes eligible for memoisation: both the
/// ready-module and the compiled-from-source paths converge here before
/// verification.
fn verify_and_return(module: Module, self_name: &str, sink: &dyn DebugSink) -> Result<Module> {
    yama_verifier::verify_module(&module, self_name).map_err(|(_id, signal)| {
        crate::yama_log!(
            sink,
            Category::VERIF,
            "module '{self_name}' failed verification: {signal}"
        );
        Signal::ImportInvalidModule(signal)
    })?;
    Ok(module)
}
