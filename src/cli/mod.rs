mod args;
mod exec_command;
mod housekeep_command;

use onelock::{LockConfig, Result, TeardownRegistry};
pub use args::{Args, Command};

/// What the process should exit with once teardown has run
pub type ExitCode = i32;

pub fn run(args: Args, teardown: &TeardownRegistry) -> Result<ExitCode> {
    let config = match &args.app {
        Some(app) => LockConfig::new(app.clone()),
        None => LockConfig::default(),
    };

    match args.command {
        Command::Exec {
            lock_file,
            timeout,
            command,
        } => exec_command::execute_exec(&config, &lock_file, timeout, &command),
        Command::Instance {
            name,
            lock_dir,
            command,
        } => {
            let config = match lock_dir {
                Some(dir) => config.with_lock_dir(dir),
                None => config,
            };
            exec_command::execute_instance(&config, &name, &command, teardown)
        }
        Command::Status { lock_file } => exec_command::execute_status(&config, &lock_file, args.quiet),
        Command::Housekeep { dir, dry_run } => {
            housekeep_command::execute_housekeep(config, dir, dry_run, args.quiet)
        }
    }
}
