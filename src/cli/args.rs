use clap::{Parser, Subcommand};
use std::ffi::OsString;
use std::path::PathBuf;

#[derive(Parser, Debug)]
#[command(
    name = "onelock",
    version,
    about = "Exclusive file locks and single-instance checks across processes",
    long_about = None
)]
pub struct Args {
    #[command(subcommand)]
    pub command: Command,

    /// Application name that namespaces every lock
    #[arg(long, value_name = "NAME", global = true)]
    pub app: Option<String>,

    /// Verbose output
    #[arg(short = 'v', action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Suppress non-error output
    #[arg(short = 'q', long, conflicts_with = "verbose", global = true)]
    pub quiet: bool,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Run a command while holding an exclusive lock
    Exec {
        /// Lock file to hold (created if missing, never truncated)
        #[arg(value_name = "LOCKFILE")]
        lock_file: PathBuf,

        /// Seconds to wait for the lock; negative waits forever
        #[arg(
            short = 't',
            long,
            value_name = "SECONDS",
            default_value_t = 10,
            allow_negative_numbers = true
        )]
        timeout: i64,

        /// Command and arguments to run
        #[arg(last = true, required = true, value_name = "COMMAND")]
        command: Vec<OsString>,
    },

    /// Run a command only if no other instance of NAME is running
    Instance {
        /// Logical instance name
        #[arg(value_name = "NAME")]
        name: String,

        /// Directory for the instance lock file (default: home directory)
        #[arg(long, value_name = "DIR")]
        lock_dir: Option<PathBuf>,

        /// Command and arguments to run
        #[arg(last = true, required = true, value_name = "COMMAND")]
        command: Vec<OsString>,
    },

    /// Report whether a lock file is currently held
    Status {
        #[arg(value_name = "LOCKFILE")]
        lock_file: PathBuf,
    },

    /// Remove single-instance lock files left by crashed processes
    Housekeep {
        /// Directory to clean (default: home directory)
        #[arg(value_name = "DIR")]
        dir: Option<PathBuf>,

        /// Show what would be deleted without deleting
        #[arg(short = 'n', long)]
        dry_run: bool,
    },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_exec_negative_timeout() {
        let args = Args::try_parse_from(["onelock", "exec", "-t", "-1", "a.lock", "--", "true"]).unwrap();
        match args.command {
            Command::Exec {
                timeout, command, ..
            } => {
                assert_eq!(timeout, -1);
                assert_eq!(command, vec![OsString::from("true")]);
            }
            other => panic!("unexpected command: {:?}", other),
        }
    }

    #[test]
    fn test_exec_default_timeout() {
        let args = Args::try_parse_from(["onelock", "exec", "a.lock", "--", "ls", "-l"]).unwrap();
        match args.command {
            Command::Exec {
                timeout, command, ..
            } => {
                assert_eq!(timeout, 10);
                assert_eq!(command.len(), 2);
            }
            other => panic!("unexpected command: {:?}", other),
        }
    }

    #[test]
    fn test_exec_requires_command() {
        assert!(Args::try_parse_from(["onelock", "exec", "a.lock"]).is_err());
    }

    #[test]
    fn test_verbose_conflicts_with_quiet() {
        assert!(Args::try_parse_from(["onelock", "-v", "-q", "status", "a.lock"]).is_err());
    }
}
