use super::ExitCode;
use onelock::housekeep::{clean_stale_locks, CleanConfig};
use onelock::{LockConfig, Result};
use std::path::PathBuf;

pub fn execute_housekeep(
    lock: LockConfig,
    dir: Option<PathBuf>,
    dry_run: bool,
    quiet: bool,
) -> Result<ExitCode> {
    let config = CleanConfig { lock, dir, dry_run };
    let cleaned = clean_stale_locks(&config)?;

    if !quiet {
        let verb = if dry_run { "Would remove" } else { "Removed" };
        for path in &cleaned {
            println!("{}: {}", verb, path.display());
        }
        if cleaned.is_empty() {
            println!("No stale lock files found");
        }
    }

    Ok(0)
}
