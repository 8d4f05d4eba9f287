use goque_server::core::{CoreApp, StartupError};

fn main() {
    match CoreApp::run() {
        Ok(()) => {}
        Err(StartupError::Cli(e)) => e.exit(),
        Err(e) => {
            eprintln!("\nError: {}\n", e);
            std::process::exit(1);
        }
    }
}
