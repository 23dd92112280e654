//! coflock - run a command while holding an advisory lock on a file
//!
//! Binary name: `coflock`

use std::process;

mod cli;
mod run;

#[tokio::main(flavor = "current_thread")]
async fn main() {
    // Initialize tracing subscriber for logging
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("warn")),
        )
        .with_writer(std::io::stderr)
        .init();

    let matches = cli::build_cli().get_matches();

    let code = match run::run(&matches).await {
        Ok(code) => code,
        Err(err) => {
            #[allow(clippy::print_stderr)]
            {
                eprintln!("Error: {err:#}");
            }

            err.downcast_ref::<coflock_core::Error>()
                .map_or(1, coflock_core::Error::exit_code)
        }
    };

    #[allow(clippy::exit)]
    process::exit(code);
}
