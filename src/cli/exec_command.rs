use super::ExitCode;
use onelock::lock::{check_single_instance, is_locked};
use onelock::{ExclusiveLock, LockConfig, LockError, LockTimeout, Result, TeardownRegistry};
use std::ffi::OsString;
use std::path::Path;
use std::process::{Command, ExitStatus};
use tracing::info;

pub fn execute_exec(
    config: &LockConfig,
    lock_file: &Path,
    timeout: i64,
    command: &[OsString],
) -> Result<ExitCode> {
    let mut lock = ExclusiveLock::with_config(lock_file, LockTimeout::from_secs(timeout), config);
    lock.acquire()?;
    info!("Lock acquired: {}", lock_file.display());

    let code = run_child(command);
    lock.release();
    code
}

pub fn execute_instance(
    config: &LockConfig,
    name: &str,
    command: &[OsString],
    teardown: &TeardownRegistry,
) -> Result<ExitCode> {
    if !check_single_instance(config, name, teardown) {
        return Err(LockError::AnotherInstance(name.to_string()));
    }
    info!("Running as the only instance of '{}'", name);
    run_child(command)
}

pub fn execute_status(config: &LockConfig, lock_file: &Path, quiet: bool) -> Result<ExitCode> {
    let held = is_locked(lock_file, config)?;
    if !quiet {
        println!("{}", if held { "held" } else { "free" });
    }
    Ok(if held { 2 } else { 0 })
}

fn run_child(command: &[OsString]) -> Result<ExitCode> {
    let (program, rest) = command
        .split_first()
        .ok_or_else(|| LockError::Other("No command given".to_string()))?;

    let status = Command::new(program)
        .args(rest)
        .status()
        .map_err(|e| LockError::CommandFailed {
            command: program.to_string_lossy().into_owned(),
            source: e,
        })?;

    Ok(exit_code_of(status))
}

/// Child's own code, or `128 + signal` when it was killed, as shells report it
fn exit_code_of(status: ExitStatus) -> ExitCode {
    if let Some(code) = status.code() {
        return code;
    }
    #[cfg(unix)]
    {
        use std::os::unix::process::ExitStatusExt;
        if let Some(signal) = status.signal() {
            return 128 + signal;
        }
    }
    1
}
