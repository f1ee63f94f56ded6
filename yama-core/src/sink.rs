use bitflags::bitflags;

bitflags! {
    /// Which subsystem a diagnostic record originates from, as a bitmask. A
    /// sink filters by category so a caller only interested in, say,
    /// verifier chatter doesn't pay for import/compile noise.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
    pub struct Category: u32 {
        const GENERAL = 1 << 0;
        const IMPORT  = 1 << 1;
        const LOAD    = 1 << 2;
        const VERIF   = 1 << 3;
        const COMPILE = 1 << 4;
        const INSTALL = 1 << 5;
    }
}

/// An injected diagnostic collaborator. Never a process-wide singleton —
/// every `Domain` holds its own `Arc<dyn DebugSink>`.
pub trait DebugSink: Send + Sync {
    fn enabled(&self, category: Category) -> bool;
    fn log(&self, category: Category, message: std::fmt::Arguments<'_>);

    /// Called at the point a signal is raised, before it propagates as an
    /// `Err`. The default does nothing; sinks that want raise-site context
    /// (distinct from a formatted log line) override this.
    fn raise_signal(&self, _category: Category, _signal: &crate::signal::Signal) {}
}

/// The no-op sink. `enabled` always returns `false`, so
/// [`crate::yama_log`] never formats its arguments — short-circuiting
/// argument evaluation on a disabled sink is a measurable hot-path
/// concern.
#[derive(Debug, Default, Clone, Copy)]
pub struct NullSink;

impl DebugSink for NullSink {
    fn enabled(&self, _category: Category) -> bool {
        false
    }

    fn log(&self, _category: Category, _message: std::fmt::Arguments<'_>) {}
}

/// Logs to `tracing` at `debug` level, gated by `enabled`. Useful for wiring
/// a domain's diagnostics into the ambient `tracing` subscriber instead of a
/// bespoke sink.
#[derive(Debug, Default, Clone, Copy)]
pub struct TracingSink {
    mask: Category,
}

impl TracingSink {
    pub fn new(mask: Category) -> Self {
        Self { mask }
    }

    pub fn all() -> Self {
        Self::new(Category::all())
    }
}

impl DebugSink for TracingSink {
    fn enabled(&self, category: Category) -> bool {
        self.mask.intersects(category)
    }

    fn log(&self, category: Category, message: std::fmt::Arguments<'_>) {
        tracing::debug!(category = ?category, "{}", message);
    }
}

/// Logs `$($arg)*` to `$sink` under `$category`, short-circuiting the
/// `format_args!` call entirely when the sink has that category disabled.
#[macro_export]
macro_rules! yama_log {
    ($sink:expr, $category:expr, $($arg:tt)*) => {{
        let sink = $sink;
        let category = $category;
        if $crate::sink::DebugSink::enabled(sink, category) {
            $crate::sink::DebugSink::log(sink, category, format_args!($($arg)*));
        }
    }};
}
