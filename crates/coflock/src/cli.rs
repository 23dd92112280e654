use std::path::PathBuf;

use clap::{value_parser, Arg, ArgAction, Command};
use coflock_core::AccessMode;

pub fn build_cli() -> Command {
    Command::new("coflock")
        .version(env!("CARGO_PKG_VERSION"))
        .about("Run a command while holding an advisory lock on a file")
        .arg(
            Arg::new("shared")
                .short('s')
                .long("shared")
                .action(ArgAction::SetTrue)
                .conflicts_with("exclusive")
                .help("Take a shared lock (the file is opened read-only)"),
        )
        .arg(
            Arg::new("exclusive")
                .short('x')
                .long("exclusive")
                .action(ArgAction::SetTrue)
                .help("Take an exclusive lock (default)"),
        )
        .arg(
            Arg::new("access")
                .long("access")
                .value_name("MODE")
                .value_parser(|s: &str| s.parse::<AccessMode>())
                .help("Open the file read-only, write-only, read-write or append"),
        )
        .arg(
            Arg::new("nonblock")
                .short('n')
                .long("nonblock")
                .action(ArgAction::SetTrue)
                .help("Fail instead of waiting if the lock is held"),
        )
        .arg(
            Arg::new("retry-interval-ms")
                .long("retry-interval-ms")
                .value_name("MS")
                .value_parser(value_parser!(u64).range(1..))
                .help("Pause between attempts while the lock is contended"),
        )
        .arg(
            Arg::new("config")
                .long("config")
                .value_name("PATH")
                .value_parser(value_parser!(PathBuf))
                .help("Config file layered over the global config"),
        )
        .arg(
            Arg::new("file")
                .required(true)
                .value_name("FILE")
                .value_parser(value_parser!(PathBuf))
                .help("File to lock"),
        )
        .arg(
            Arg::new("command")
                .required(true)
                .num_args(1..)
                .last(true)
                .value_name("COMMAND")
                .help("Command to run while the lock is held"),
        )
}
