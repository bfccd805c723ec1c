//! vouch - declarative verification of HTTP services
//!
//! Compiles YAML scenarios into request/response checks, runs them against
//! a live service, and exits 0 only when every check passed.

use clap::Parser;

use vouch::cli::{self, Args};

#[tokio::main]
async fn main() {
    let args = Args::parse();
    vouch::common::logging::init_cli(args.verbose);

    match cli::run(args).await {
        // Exit 1 distinguishes "the service failed verification" from
        // exit 2, an engine fault that prevented a verdict.
        Ok(overall) if overall.is_succeeded() => {}
        Ok(_) => std::process::exit(1),
        Err(e) => {
            tracing::error!("{}", e);
            std::process::exit(2);
        }
    }
}
