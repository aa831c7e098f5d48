//! Diagnostic sink handed to the normalizer and the consent resolver.
//!
//! The sync frame only reports diagnostics when its `debug` parameter is set.
//! Callers pick the sink through a [`LogFactory`], so tests can swap in a
//! recording implementation.

/// A sink for human readable diagnostics.
pub trait DiagnosticLog {
    fn log(&self, message: &str);
}

/// Produces the diagnostic sink matching the frame's debug flag.
pub trait LogFactory {
    fn logger(&self, debug: bool) -> Box<dyn DiagnosticLog>;
}

/// Forwards diagnostics to the `log` facade when debug is on.
#[derive(Debug, Clone, Copy, Default)]
pub struct DebugLogFactory;

impl LogFactory for DebugLogFactory {
    fn logger(&self, debug: bool) -> Box<dyn DiagnosticLog> {
        Box::new(FrameLog { enabled: debug })
    }
}

struct FrameLog {
    enabled: bool,
}

impl DiagnosticLog for FrameLog {
    fn log(&self, message: &str) {
        if self.enabled {
            log::info!("[usersync] {}", message);
        }
    }
}
