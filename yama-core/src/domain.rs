use std::collections::HashMap;
use std::sync::Arc;

use parking_lot::{ReentrantMutex, RwLock};

use yama_model::{parse_fq_name, ImportPath, Module};

use crate::builtin::{BuiltinParcel, BUILTIN_INSTALL_NAME};
use crate::compiler::{CompileServices, Compiler};
use crate::importer;
use crate::install::{Environment, InstallBatch, InstallRegistry};
use crate::item_ref::ItemRef;
use crate::loader::{self, ModuleSource};
use crate::signal::{Result, Signal};
use crate::sink::{Category, DebugSink, NullSink};

/// Mutable state guarded by [`Domain`]'s shared/exclusive lock (spec §5):
/// the install registry and both memo tables. Only the thread holding the
/// new-data lock ever takes the write side of this lock.
struct DomainState {
    install: InstallRegistry,
    /// Memoised modules, keyed by `(install_name, relative_path)` (spec
    /// §4.3: "memoised, keyed by full import path").
    modules: HashMap<(String, String), Arc<Module>>,
    /// Memoised loaded types, keyed by fully-qualified name (spec §4.4).
    loaded: HashMap<String, ItemRef>,
}

/// The single-writer, multi-reader facade tying the parcel/install registry,
/// importer, and loader together under the concurrency model of spec §5.
///
/// Two locks guard all mutable state: `new_data_lock`, a re-entrant mutex
/// serialising any operation that may add new data (install/import/load —
/// re-entrant because the compiler collaborator may recursively import on
/// the same thread, spec §5's "suspension points"), and `state`'s
/// `RwLock`, taken briefly (never across a parcel/compiler invocation) to
/// read or publish the memo tables and install registry.
pub struct Domain {
    new_data_lock: ReentrantMutex<()>,
    state: RwLock<DomainState>,
    compiler: Option<Arc<dyn Compiler>>,
    sink: Arc<dyn DebugSink>,
}

impl Domain {
    /// Builds a domain with the built-in parcel (spec §4.2) pre-installed
    /// under the fixed name `"yama"`, an optional compiler collaborator, and
    /// the given debug sink (defaulting to [`NullSink`] via
    /// [`Domain::new`]'s sibling [`Domain::with_sink`]).
    pub fn new(compiler: Option<Arc<dyn Compiler>>) -> Self {
        Self::with_sink(compiler, Arc::new(NullSink))
    }

    pub fn with_sink(compiler: Option<Arc<dyn Compiler>>, sink: Arc<dyn DebugSink>) -> Self {
        let mut install = InstallRegistry::new();
        install
            .install(InstallBatch::new().add_parcel(BUILTIN_INSTALL_NAME, Arc::new(BuiltinParcel)))
            .expect("the built-in parcel is always self-consistent and name-free of conflicts");
        Self {
            new_data_lock: ReentrantMutex::new(()),
            state: RwLock::new(DomainState {
                install,
                modules: HashMap::new(),
                loaded: HashMap::new(),
            }),
            compiler,
            sink,
        }
    }

    pub fn is_installed(&self, install_name: &str) -> bool {
        self.state.read().install.is_installed(install_name)
    }

    /// Validates and installs `batch` (spec §4.2). Atomic: on failure the
    /// registry is left exactly as it was.
    pub fn install(&self, batch: InstallBatch) -> Result<Vec<String>> {
        let _guard = self.new_data_lock.lock();
        let mut state = self.state.write();
        let result = state.install.install(batch);
        if let Err(ref signal) = result {
            self.sink.raise_signal(Category::INSTALL, signal);
        }
        result
    }

    /// Imports `path`, resolving its head through `requester_env` (spec
    /// §4.3 step 1). Top-level callers needing the root module of a freshly
    /// installed parcel pass that parcel's own environment; the compiler
    /// collaborator's [`CompileServices::import`] does the same for
    /// `self.X`/`dep.X` references encountered mid-compile.
    pub fn import(&self, path: &ImportPath, requester_env: &Environment) -> Result<Arc<Module>> {
        let install_name = importer::resolve_head(path, requester_env)?;
        self.import_resolved(&install_name, &path.relative_path())
    }

    /// Imports `path` treating its head directly as an install-name, for
    /// callers outside of any parcel's own environment (e.g. the embedding
    /// application requesting a freshly installed parcel's root module).
    /// The compiler collaborator instead goes through [`Domain::import`]
    /// with its own parcel's environment, since its paths may use `self`/
    /// dep-names (spec §4.3 step 1).
    pub fn import_path(&self, path: &ImportPath) -> Result<Arc<Module>> {
        self.import_resolved(path.head(), &path.relative_path())
    }

    /// Imports a path whose head has already been resolved to an
    /// install-name. Shared by [`Domain::import`] and the loader's
    /// [`ModuleSource`] adapter, so compiled-path and loaded-path imports go
    /// through exactly one memoise-then-verify tail (spec §4.3).
    fn import_resolved(&self, install_name: &str, relative_path: &str) -> Result<Arc<Module>> {
        let _guard = self.new_data_lock.lock();
        let key = (install_name.to_string(), relative_path.to_string());

        if let Some(module) = self.state.read().modules.get(&key).cloned() {
            return Ok(module);
        }

        let parcel = self
            .state
            .read()
            .install
            .parcel(install_name)
            .ok_or_else(|| Signal::ImportModuleNotFound(install_name.to_string()))?;
        let env = self
            .state
            .read()
            .install
            .environment(install_name)
            .cloned()
            .expect("a parcel found in the registry always has a frozen environment");

        let services = DomainServices { domain: self, env };
        let source_segments: Vec<String> = relative_path
            .split('.')
            .filter(|s| !s.is_empty())
            .map(str::to_string)
            .collect();
        let source_path = ImportPath::new(install_name, source_segments);

        crate::yama_log!(
            self.sink.as_ref(),
            Category::IMPORT,
            "importing {install_name}.{relative_path}"
        );
        let module = importer::import_uncached(
            parcel.as_ref(),
            install_name,
            relative_path,
            self.compiler.as_deref(),
            &services,
            &source_path,
            self.sink.as_ref(),
        )
        .map_err(|signal| {
            self.sink.raise_signal(Category::IMPORT, &signal);
            signal
        })?;

        let module = Arc::new(module);
        self.state.write().modules.insert(key, module.clone());
        Ok(module)
    }

    /// Loads a fully-qualified item name (spec §4.4): imports its module,
    /// then links every type-constant transitively reachable from the
    /// item's constant table, publishing every newly created handle
    /// atomically on success.
    pub fn load(&self, fq_name: &str) -> Result<ItemRef> {
        let _guard = self.new_data_lock.lock();

        if let Some(item) = self.state.read().loaded.get(fq_name).cloned() {
            return Ok(item);
        }

        let source = DomainModuleSource(self);
        let result = loader::load(&source, fq_name).map_err(|signal| {
            self.sink.raise_signal(Category::LOAD, &signal);
            signal
        })?;

        let mut state = self.state.write();
        for (name, item) in result.all {
            state.loaded.entry(name).or_insert(item);
        }
        Ok(result.root)
    }
}

/// Adapts [`Domain::import_resolved`] to the pure [`ModuleSource`] interface
/// the loader algorithm depends on, and lets the loader reuse previously
/// published handles instead of re-resolving them (needed for load
/// determinism under identity equality — see `SPEC_FULL.md` §8).
struct DomainModuleSource<'a>(&'a Domain);

impl ModuleSource for DomainModuleSource<'_> {
    fn module_for(&self, install_name: &str, relative_path: &str) -> Result<Arc<Module>> {
        self.0.import_resolved(install_name, relative_path)
    }

    fn already_loaded(&self, fq_name: &str) -> Option<ItemRef> {
        self.0.state.read().loaded.get(fq_name).cloned()
    }
}

struct DomainServices<'a> {
    domain: &'a Domain,
    env: Environment,
}

impl CompileServices for DomainServices<'_> {
    fn import(&self, path: &ImportPath) -> Result<Arc<Module>> {
        self.domain.import(path, &self.env)
    }

    fn environment(&self) -> &Environment {
        &self.env
    }
}

/// Convenience for callers that already have a bare `"install.path:name"`
/// string rather than a parsed [`ImportPath`]/name pair — parses it, then
/// loads.
pub fn load_str(domain: &Domain, fq_name: &str) -> Result<ItemRef> {
    parse_fq_name(fq_name)
        .map_err(|_| Signal::ImportModuleNotFound(fq_name.to_string()))?;
    domain.load(fq_name)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parcel::{ImportOutcome, Parcel, ParcelMetadata};
    use yama_model::{CallFn, ConstTable, PrimitiveKind, TypeConst, TypeConstKind};

    /// A test parcel exposing one primitive `b` and one function `f :
    /// fn(Int, Float, Char) -> Float` — spec §8 scenario 1.
    struct ScenarioOneParcel;
    impl Parcel for ScenarioOneParcel {
        fn metadata(&self) -> ParcelMetadata {
            ParcelMetadata::new("a", vec!["yama".to_string()])
        }
        fn import(&self, relative_path: &str) -> ImportOutcome {
            if !relative_path.is_empty() {
                return ImportOutcome::NotFound;
            }
            let mut consts = ConstTable::new();
            let kt_int = consts.push_type(TypeConst::new(TypeConstKind::Primitive, "yama:Int", None));
            let kt_float = consts.push_type(TypeConst::new(TypeConstKind::Primitive, "yama:Float", None));
            let kt_char = consts.push_type(TypeConst::new(TypeConstKind::Primitive, "yama:Char", None));

            let mut m = Module::new();
            m.add_primitive("b", ConstTable::new(), PrimitiveKind::Int).unwrap();
            m.add_function(
                "f",
                consts,
                yama_model::CallSig::new(vec![kt_int, kt_float, kt_char], kt_float),
                0,
                CallFn::Native(0),
            )
            .unwrap();
            ImportOutcome::Ready(m)
        }
    }

    fn install_scenario_one(domain: &Domain) {
        domain
            .install(
                InstallBatch::new()
                    .add_parcel("a", Arc::new(ScenarioOneParcel))
                    .map_dep("a", "yama", "yama"),
            )
            .unwrap();
    }

    /// Spec §8 end-to-end scenario 1.
    #[test]
    fn scenario_1_install_and_load_function() {
        let domain = Domain::new(None);
        install_scenario_one(&domain);

        let f = domain.load("a:f").unwrap();
        let sig = f.callsig().unwrap();
        assert_eq!(sig.param_count(), 3);
    }

    #[test]
    fn builtin_parcel_is_preinstalled() {
        let domain = Domain::new(None);
        assert!(domain.is_installed(BUILTIN_INSTALL_NAME));
        let none_ty = domain.load("yama:None").unwrap();
        assert_eq!(none_ty.fq_name(), "yama:None");
    }

    /// Memoisation property (spec §8): a parcel's `import` is invoked at
    /// most once per path for the life of the domain.
    #[test]
    fn import_is_memoised() {
        use std::sync::atomic::{AtomicUsize, Ordering};

        struct CountingParcel(AtomicUsize);
        impl Parcel for CountingParcel {
            fn metadata(&self) -> ParcelMetadata {
                ParcelMetadata::new("a", vec![])
            }
            fn import(&self, relative_path: &str) -> ImportOutcome {
                if relative_path.is_empty() {
                    self.0.fetch_add(1, Ordering::SeqCst);
                    ImportOutcome::Ready(Module::new())
                } else {
                    ImportOutcome::NotFound
                }
            }
        }

        let domain = Domain::new(None);
        let parcel = Arc::new(CountingParcel(AtomicUsize::new(0)));
        domain
            .install(InstallBatch::new().add_parcel("a", parcel.clone()))
            .unwrap();

        domain.import_path(&ImportPath::new("a", vec![])).unwrap();
        domain.import_path(&ImportPath::new("a", vec![])).unwrap();
        domain.import_path(&ImportPath::new("a", vec![])).unwrap();

        assert_eq!(parcel.0.load(Ordering::SeqCst), 1);
    }

    /// Load determinism (spec §8): `load(name)` called twice returns
    /// identity-equal handles.
    #[test]
    fn load_determinism() {
        let domain = Domain::new(None);
        install_scenario_one(&domain);
        let first = domain.load("a:b").unwrap();
        let second = domain.load("a:b").unwrap();
        assert_eq!(first, second);
    }

    #[test]
    fn missing_parcel_is_module_not_found() {
        let domain = Domain::new(None);
        let err = domain
            .import_path(&ImportPath::new("nonexistent", vec![]))
            .unwrap_err();
        assert!(matches!(err, Signal::ImportModuleNotFound(_)));
    }
}
