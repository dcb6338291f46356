use crate::cli::args::Args;
use crate::core::{Interrupt, SerialTunnel, SessionOutcome, ShellLoop, StdinLines};
use crate::domain::config::ShellConfig;
use crate::domain::error::{ShellError, ShellResult};
use crate::infrastructure::config::ConfigManager;
use crate::infrastructure::detect::{AutoDetector, PortEnumerator, SystemPorts};
use crate::infrastructure::link::Endpoint;
use crate::infrastructure::logging::init_logging;
use std::io::{self, Write};
use tracing::{debug, info};

/// Load configuration and apply command line overrides
pub fn load_config(args: &Args) -> ShellResult<ShellConfig> {
    let config_manager = ConfigManager::new();
    let mut config = if let Some(config_path) = &args.config {
        config_manager.load_config_from_path(config_path)?
    } else {
        config_manager.load_config()?
    };
    args.apply_to(&mut config);
    Ok(config)
}

/// Work out which link to open, auto-detecting a serial port if none was given.
///
/// Fails with [`ShellError::NoSerialPortFound`] before anything is opened when
/// detection comes up empty.
pub fn resolve_endpoint<W: Write>(
    port: Option<&str>,
    detector: &AutoDetector,
    enumerator: &dyn PortEnumerator,
    out: &mut W,
) -> ShellResult<Endpoint> {
    if let Some(port) = port {
        return port.parse();
    }

    let found = detector.detect(enumerator)?;
    let first = found.first().ok_or(ShellError::NoSerialPortFound)?;

    let report = |out: &mut W| -> io::Result<()> {
        if found.len() > 1 {
            writeln!(out, "Auto-detected serial ports are:")?;
            for port in &found {
                writeln!(out, " {}", port)?;
            }
        }
        writeln!(out, "Using port {}", first)
    };
    report(out).map_err(|e| ShellError::Terminal(e.to_string()))?;

    Ok(Endpoint::Serial {
        path: first.device.clone(),
        baud: None,
    })
}

/// Run a shell session as described by the command line
pub async fn execute_command(args: Args) -> ShellResult<SessionOutcome> {
    let config = load_config(&args)?;

    if let Err(e) = init_logging(&config.log_level, args.verbose) {
        eprintln!("Warning: logging unavailable: {}", e);
    }
    debug!("Effective configuration: {:?}", config);

    let mut stdout = io::stdout();
    let detector = AutoDetector::from_settings(&config.detect);
    let endpoint = resolve_endpoint(args.port.as_deref(), &detector, &SystemPorts, &mut stdout)?;

    println!("Connecting to MAVLink...");
    let tunnel = SerialTunnel::open(
        &endpoint,
        config.link.baud_rate,
        config.link.channel,
        &config.link,
    )
    .await?;
    info!("Connected to {}", endpoint);

    let interrupt = Interrupt::new();
    let _listener = interrupt.listen_for_ctrl_c();

    let mut shell = ShellLoop::new(
        tunnel,
        StdinLines::new(),
        stdout,
        interrupt,
        config.terminal.clone(),
    );
    Ok(shell.run().await)
}
