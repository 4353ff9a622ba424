//! Shared setup for commands: configuration, cache selection, diagnostics output.

use std::path::Path;
use std::sync::Arc;

use sigil_cache::{NoopSignatureCache, PersistentSignatureCache, SignatureCache};
use sigil_common::{InternalError, SigilResult};
use sigil_config::SigilConfig;
use sigil_diagnostics::{Diagnostic, DiagnosticCode, DiagnosticRenderer, DiagnosticSink, TerminalRenderer};

use crate::GlobalArgs;

/// Version recorded in, and required of, persistent cache directories.
pub const TOOL_VERSION: &str = env!("CARGO_PKG_VERSION");

/// Loads `--config`, or `sigil.toml` from the working directory, or defaults.
pub fn load_config(global: &GlobalArgs) -> SigilResult<SigilConfig> {
    let loaded = match &global.config {
        Some(path) => sigil_config::load_config_file(path),
        None => std::env::current_dir()
            .map_err(sigil_config::ConfigError::from)
            .and_then(|dir| sigil_config::load_config(&dir)),
    };
    loaded.map_err(|e| InternalError::new(e.to_string()))
}

/// Chooses the signature cache for a run.
///
/// A persistent cache that cannot be opened is reported as a warning and
/// replaced by a no-op cache; snapshots stay correct, only slower.
pub fn open_cache(
    config: &SigilConfig,
    dir_override: Option<&Path>,
    disabled: bool,
    sink: &DiagnosticSink,
) -> Arc<dyn SignatureCache> {
    if disabled || !config.cache.enabled {
        tracing::debug!("signature cache disabled");
        return Arc::new(NoopSignatureCache);
    }
    let dir = dir_override.unwrap_or(&config.cache.dir);
    match PersistentSignatureCache::open(dir, TOOL_VERSION) {
        Ok(cache) => Arc::new(cache),
        Err(err) => {
            sink.emit(
                Diagnostic::warning(
                    DiagnosticCode::CACHE_UNAVAILABLE,
                    format!("signature cache is unavailable: {err}"),
                )
                .with_resource(dir.display().to_string())
                .with_help("fingerprints are computed without memoization for this run"),
            );
            Arc::new(NoopSignatureCache)
        }
    }
}

/// Renders every accumulated diagnostic to stderr.
pub fn render_diagnostics(sink: &DiagnosticSink, global: &GlobalArgs) {
    let renderer = TerminalRenderer::new(global.color);
    for diag in sink.take_all() {
        if global.quiet && !diag.severity.is_error() {
            continue;
        }
        eprint!("{}", renderer.render(&diag));
    }
}
