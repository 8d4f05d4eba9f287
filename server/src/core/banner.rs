//! Startup banner and URL display

use super::config::ResolvedConfiguration;
use super::constants::{APP_NAME, FILTER_HEADER};

/// Print the startup banner with the filter endpoint
pub fn print_banner(config: &ResolvedConfiguration, tracer_enabled: bool) {
    let server = &config.server;

    println!();
    println!(
        "  \x1b[1m\x1b[36m{}\x1b[0m \x1b[90mv{}\x1b[0m",
        APP_NAME,
        env!("CARGO_PKG_VERSION")
    );
    println!();

    // Label width: "Startup filter:" is 15 chars, pad to 17 for alignment
    const W: usize = 17;

    println!(
        "  \x1b[32m➜\x1b[0m  \x1b[1m{:<W$}\x1b[0m {}{}",
        "JQ endpoint:",
        server.listen_url(),
        server.path
    );

    match &config.filter {
        Some(filter) => println!(
            "  \x1b[33m➜\x1b[0m  \x1b[1m{:<W$}\x1b[0m {}",
            "Startup filter:",
            filter.source()
        ),
        None => println!(
            "  \x1b[90m➜  {:<W$} none, send {}\x1b[0m",
            "Startup filter:", FILTER_HEADER
        ),
    }

    if tracer_enabled {
        println!(
            "  \x1b[35m➜\x1b[0m  \x1b[1m{:<W$}\x1b[0m {} \x1b[90m(ratio {})\x1b[0m",
            "Tracing:", config.tracer.endpoint, config.tracer.ratio
        );
    } else {
        println!("  \x1b[90m➜  {:<W$} disabled\x1b[0m", "Tracing:");
    }

    println!();
}
