//! im - Image manipulation tool
//!
//! Thin binary over the `im-tool` library: parses the CLI, wires up
//! logging and configuration, and dispatches to the image operations or
//! the terminal viewer.

use anyhow::Result;
use chrono::Local;
use clap::Parser;
use im_tool::{Cli, Command, Config, ExitKey};
use std::path::{Path, PathBuf};
use tracing::{Level, error, info};
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::{EnvFilter, fmt, prelude::*};

// CLI Output Module
mod cli_output {
    //! Styling for command-line output.

    use crossterm::{
        ExecutableCommand,
        style::{Color, Print, Stylize, style},
    };
    use std::io::stdout;

    /// CLI theme colors
    pub struct CliTheme;

    impl CliTheme {
        /// Error color (red)
        pub const ERROR: Color = Color::Red;
        /// Hint color (dark grey)
        pub const HINT: Color = Color::DarkGrey;
    }

    /// Print an error message
    pub fn print_error(msg: &str) {
        let _ = stdout().execute(Print(style("✗ ").with(CliTheme::ERROR).bold()));
        let _ = stdout().execute(Print(format!("{}\n", msg)));
    }

    /// Print a hint message
    pub fn print_hint(msg: &str) {
        let _ = stdout().execute(Print(style("→ ").with(CliTheme::HINT)));
        let _ = stdout().execute(Print(format!("{}\n", msg)));
    }

    /// Print a key-value pair
    pub fn print_key_value(key: &str, value: &str) {
        let key_styled = style(key).with(CliTheme::HINT);
        let _ = stdout().execute(Print("  "));
        let _ = stdout().execute(Print(key_styled));
        let _ = stdout().execute(Print(": "));
        let _ = stdout().execute(Print(style(value).bold()));
        let _ = stdout().execute(Print("\n"));
    }
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    let config = load_config(&cli)?;

    // Get the executable directory for the Log directory
    let exe_dir = get_executable_dir()?;
    let log_path = get_log_path(&exe_dir, &cli);

    // The viewer owns the terminal, so `show` logs to file only
    let _guard = if matches!(cli.command, Command::Show { .. }) {
        setup_file_only_logging(&log_path)?
    } else {
        setup_logging(&cli, config.verbose, &log_path)?
    };

    info!(
        version = env!("CARGO_PKG_VERSION"),
        command = cli.command_name(),
        "im starting"
    );
    if let Some(ref config_path) = cli.config {
        info!(config_file = %config_path.display(), "Configuration loaded from file");
    }

    match run_command(&cli, &config) {
        Ok(()) => Ok(()),
        Err(e) => {
            error!(error = %e, "Command failed");
            cli_output::print_error(&e.to_string());
            std::process::exit(1);
        }
    }
}

/// Dispatch the parsed subcommand
fn run_command(cli: &Cli, config: &Config) -> im_tool::Result<()> {
    use im_tool::ops::{self, CropWindow, ResizeTarget};

    match &cli.command {
        Command::Gray {
            input,
            output,
            overwrite,
        } => ops::gray(input, output, *overwrite),

        Command::Resize {
            input,
            output,
            overwrite,
            size,
            width,
            height,
        } => {
            let target = match (width, height) {
                (Some(w), Some(h)) => ResizeTarget::Exact {
                    width: *w,
                    height: *h,
                },
                _ => ResizeTarget::LargerDimension(size.unwrap_or(config.resize_size)),
            };
            ops::resize(input, output, *overwrite, target)
        }

        Command::Rotate {
            input,
            output,
            overwrite,
            k,
        } => ops::rotate(input, output, *overwrite, *k),

        Command::Crop {
            input,
            output,
            x,
            y,
            width,
            height,
            overwrite,
        } => {
            let window = CropWindow {
                x: *x,
                y: *y,
                width: *width,
                height: *height,
            };
            ops::crop(input, output, *overwrite, window)
        }

        Command::Stack {
            input,
            output,
            horizontal,
        } => ops::stack(input, output.clone(), *horizontal),

        Command::Exif {
            input,
            show,
            remove,
        } => run_exif(input, *show, *remove),

        Command::Config { output } => run_config(output.as_deref(), config),

        Command::Show {
            input,
            slideshow,
            timeout,
        } => {
            let timeout = timeout.unwrap_or(config.slideshow_timeout);
            let exit_key = im_tool::show(input, *slideshow, timeout, config)?;
            match exit_key {
                ExitKey::Quit => info!("Viewer quit by user"),
                ExitKey::Finished => info!("Slideshow finished"),
            }
            Ok(())
        }
    }
}

/// Print or strip EXIF metadata for each input
fn run_exif(inputs: &[PathBuf], show: bool, remove: bool) -> im_tool::Result<()> {
    use cli_output::*;

    for input in inputs {
        if show {
            print_hint(&format!("Image: {}", input.display()));
            match im_tool::meta::exif_fields(input) {
                Ok(fields) => {
                    for (tag, value) in fields {
                        print_key_value(&tag, &value);
                    }
                }
                Err(e) => print_error(&e.to_string()),
            }
            println!();
        }
        if remove {
            im_tool::meta::strip_exif(input)?;
        }
    }
    Ok(())
}

/// Print a commented sample configuration, or persist the effective one
fn run_config(output: Option<&Path>, config: &Config) -> im_tool::Result<()> {
    match output {
        Some(path) => {
            config.save_to_file(path)?;
            cli_output::print_hint(&format!("Configuration written to {}", path.display()));
        }
        None => print!("{}", Config::sample_config()),
    }
    Ok(())
}

/// Get the directory where the executable is located
fn get_executable_dir() -> Result<PathBuf> {
    let exe_path = std::env::current_exe()?;
    Ok(exe_path
        .parent()
        .map(|p| p.to_path_buf())
        .unwrap_or_else(|| PathBuf::from(".")))
}

/// Determine the log file path from the subcommand and a timestamp
fn get_log_path(exe_dir: &Path, cli: &Cli) -> PathBuf {
    let log_dir = exe_dir.join("Log");
    let timestamp = Local::now().format("%Y%m%d_%H%M%S");
    let log_filename = format!("{}_{}.log", cli.command_name(), timestamp);
    log_dir.join(log_filename)
}

/// Load configuration from file or defaults
///
/// Runs before logging is set up, since `config.verbose` feeds the log
/// level. CLI flags override file settings.
fn load_config(cli: &Cli) -> Result<Config> {
    let mut config = if let Some(ref config_path) = cli.config {
        Config::load_from_file(config_path)?
    } else {
        Config::default()
    };

    if cli.verbose {
        config.verbose = true;
    }

    Ok(config)
}

/// Setup logging for CLI mode (file + console)
fn setup_logging(cli: &Cli, verbose: bool, log_path: &Path) -> Result<Option<WorkerGuard>> {
    let level = if verbose { Level::DEBUG } else { Level::INFO };

    let env_filter = EnvFilter::builder()
        .with_default_directive(level.into())
        .from_env_lossy();

    if let Some(parent) = log_path.parent() {
        std::fs::create_dir_all(parent)?;
    }

    let file = std::fs::OpenOptions::new()
        .create(true)
        .write(true)
        .truncate(true)
        .open(log_path)?;

    let (non_blocking, guard) = tracing_appender::non_blocking(file);

    let subscriber = tracing_subscriber::registry().with(env_filter);

    if cli.json_log {
        subscriber
            .with(
                fmt::layer()
                    .json()
                    .with_ansi(false)
                    .with_writer(non_blocking),
            )
            .with(fmt::layer().with_writer(std::io::stderr))
            .init();
    } else {
        subscriber
            .with(fmt::layer().with_ansi(false).with_writer(non_blocking))
            .with(fmt::layer().with_writer(std::io::stderr))
            .init();
    }

    Ok(Some(guard))
}

/// Setup logging for the viewer (file only, the terminal is in use)
fn setup_file_only_logging(log_path: &Path) -> Result<Option<WorkerGuard>> {
    let env_filter = EnvFilter::builder()
        .with_default_directive(Level::INFO.into())
        .from_env_lossy();

    if let Some(parent) = log_path.parent() {
        std::fs::create_dir_all(parent)?;
    }

    let file = std::fs::OpenOptions::new()
        .create(true)
        .write(true)
        .truncate(true)
        .open(log_path)?;

    let (non_blocking, guard) = tracing_appender::non_blocking(file);

    tracing_subscriber::registry()
        .with(env_filter)
        .with(fmt::layer().with_ansi(false).with_writer(non_blocking))
        .init();

    Ok(Some(guard))
}
