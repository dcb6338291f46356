// MavShell - Shell over MAVLink
use anyhow::Context;
use clap::Parser;
use mavshell::cli::{execute_command, Args};
use mavshell::SessionOutcome;

#[tokio::main(flavor = "current_thread")]
async fn main() {
    let args = Args::parse();

    let code = match run(args).await {
        Ok(()) => 0,
        Err(e) => {
            eprintln!("Error: {:#}", e);
            1
        }
    };

    // A pending stdin read would otherwise hold up runtime shutdown
    std::process::exit(code);
}

async fn run(args: Args) -> anyhow::Result<()> {
    match execute_command(args).await? {
        SessionOutcome::Failed(e) => Err(e).context("shell session ended"),
        SessionOutcome::Interrupted | SessionOutcome::InputClosed => Ok(()),
    }
}
