//! `sigil cache`: inspect or clear the persistent signature cache.

use std::path::PathBuf;

use sigil_cache::PersistentSignatureCache;

use crate::context::{self, TOOL_VERSION};
use crate::{CacheAction, CacheArgs, GlobalArgs};

/// Runs the `sigil cache` command.
pub fn run(args: &CacheArgs, global: &GlobalArgs) -> Result<i32, Box<dyn std::error::Error>> {
    let config = context::load_config(global)?;
    let dir: PathBuf = args
        .cache_dir
        .clone()
        .unwrap_or_else(|| config.cache.dir.clone());
    let cache = PersistentSignatureCache::open(&dir, TOOL_VERSION)?;

    match args.action {
        CacheAction::Stats => {
            let stats = cache.stats()?;
            println!("{}  {} entries, {} bytes", dir.display(), stats.entries, stats.bytes);
        }
        CacheAction::Clear => {
            let removed = cache.clear()?;
            if !global.quiet {
                eprintln!("   Removed {removed} cached signatures from {}", dir.display());
            }
        }
    }
    Ok(0)
}
