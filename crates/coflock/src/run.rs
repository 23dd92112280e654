//! Lock the file, run the command, release, report the exit status.

use std::{path::PathBuf, process::ExitStatus, time::Duration};

use anyhow::{anyhow, Context, Result};
use clap::ArgMatches;
use coflock_core::{load_options, AccessMode, LockHandle, LockMode, LockOptions, Resource};

/// Parsed command line for one locked run
#[derive(Debug, Clone)]
pub struct Invocation {
    pub path: PathBuf,
    pub mode: LockMode,
    pub access: AccessMode,
    pub nonblock: bool,
    pub retry_interval: Option<Duration>,
    pub config: Option<PathBuf>,
    pub program: String,
    pub args: Vec<String>,
}

impl Invocation {
    pub fn from_matches(matches: &ArgMatches) -> Result<Self> {
        let mode = if matches.get_flag("shared") {
            LockMode::Shared
        } else {
            LockMode::Exclusive
        };
        let access = matches
            .get_one::<AccessMode>("access")
            .copied()
            .unwrap_or_else(|| default_access(mode));

        let mut command = matches
            .get_many::<String>("command")
            .ok_or_else(|| anyhow!("no command given"))?
            .cloned();
        let program = command.next().ok_or_else(|| anyhow!("no command given"))?;

        Ok(Self {
            path: matches
                .get_one::<PathBuf>("file")
                .cloned()
                .ok_or_else(|| anyhow!("no file given"))?,
            mode,
            access,
            nonblock: matches.get_flag("nonblock"),
            retry_interval: matches
                .get_one::<u64>("retry-interval-ms")
                .map(|ms| Duration::from_millis(*ms)),
            config: matches.get_one::<PathBuf>("config").cloned(),
            program,
            args: command.collect(),
        })
    }

    /// Config files and environment, then CLI flags on top.
    pub fn options(&self) -> Result<LockOptions> {
        let options = load_options(self.config.as_deref())?;
        let options = match self.retry_interval {
            Some(interval) => options.with_retry_interval(interval),
            None => options,
        };
        options.validate()?;
        Ok(options)
    }
}

/// Shared locks need a read-only descriptor; exclusive ones create the file.
const fn default_access(mode: LockMode) -> AccessMode {
    match mode {
        LockMode::Exclusive => AccessMode::ReadWrite,
        LockMode::Shared => AccessMode::ReadOnly,
    }
}

/// Returns the exit code to terminate with.
pub async fn run(matches: &ArgMatches) -> Result<i32> {
    let invocation = Invocation::from_matches(matches)?;
    let options = invocation.options()?;

    let resource = Resource::open(&invocation.path, invocation.access)?;
    let mut lock = LockHandle::new(&resource, invocation.mode)?.with_options(options);

    let guard = if invocation.nonblock {
        lock.try_lock()?.ok_or_else(|| {
            anyhow!(
                "{} is locked by another holder",
                invocation.path.display()
            )
        })?
    } else {
        lock.lock().await?
    };
    tracing::info!(
        "Holding {} lock on {}, running {}",
        invocation.mode,
        invocation.path.display(),
        invocation.program
    );

    let status = tokio::process::Command::new(&invocation.program)
        .args(&invocation.args)
        .status()
        .await
        .with_context(|| format!("Failed to run '{}'", invocation.program));

    // Release before reporting so a failed spawn still unlocks explicitly.
    guard.release()?;
    Ok(exit_code(status?))
}

#[cfg(unix)]
fn exit_code(status: ExitStatus) -> i32 {
    use std::os::unix::process::ExitStatusExt;

    status
        .code()
        .or_else(|| status.signal().map(|signal| 128 + signal))
        .unwrap_or(1)
}

#[cfg(not(unix))]
fn exit_code(status: ExitStatus) -> i32 {
    status.code().unwrap_or(1)
}
