// Evsense CLI
// Runs the input subsystem on the console and prints normalized events

use std::path::PathBuf;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use anyhow::Context as _;
use clap::Parser;

use evsense_core::settings::ENV_OPTIONS;
use evsense_core::{EventBatch, InputContext, InputSettings};

/// Interval between non-blocking polls
const TICK: Duration = Duration::from_millis(10);

/// Linux input device monitor
#[derive(Parser, Debug)]
#[command(name = "evsense")]
#[command(version)]
#[command(about = "Discover, classify and decode Linux input devices", long_about = None)]
struct Args {
    /// Settings file (default: ~/.config/evsense/settings.toml)
    #[arg(short, long, value_name = "FILE")]
    config: Option<PathBuf>,

    /// Directory to scan and watch for device nodes
    #[arg(long, value_name = "DIR")]
    scan_dir: Option<PathBuf>,

    /// Terminal to take over instead of the active console
    #[arg(long, value_name = "TTY")]
    tty: Option<PathBuf>,

    /// Device override table
    #[arg(long, value_name = "FILE")]
    overrides: Option<PathBuf>,

    /// Leave the terminal keyboard alone
    #[arg(long)]
    no_mute: bool,

    /// Take exclusive access to every discovered device
    #[arg(long)]
    grab: bool,

    /// Keyboard repeat as PERIOD,DELAY in milliseconds
    #[arg(long, value_name = "PERIOD,DELAY", value_parser = parse_repeat)]
    repeat: Option<(i32, i32)>,

    /// Log discovery at warning level and enable debug logging
    #[arg(short, long)]
    verbose: bool,

    /// List discovered devices and exit
    #[arg(long)]
    list_devices: bool,

    /// Describe the environment variables and exit
    #[arg(long)]
    env_help: bool,
}

fn parse_repeat(value: &str) -> Result<(i32, i32), String> {
    let (period, delay) = value
        .split_once(',')
        .ok_or_else(|| format!("expected PERIOD,DELAY, got {:?}", value))?;
    let parse = |part: &str| {
        part.trim()
            .parse::<i32>()
            .map_err(|e| format!("{:?}: {}", part, e))
    };
    Ok((parse(period)?, parse(delay)?))
}

fn load_settings(args: &Args) -> anyhow::Result<InputSettings> {
    let mut settings = match &args.config {
        Some(path) => InputSettings::from_file(path)
            .and_then(|s| s.with_lookup(|name| std::env::var(name).ok()))
            .with_context(|| format!("loading {}", path.display()))?,
        None => InputSettings::load().context("loading settings")?,
    };

    if let Some(dir) = &args.scan_dir {
        settings.scan_dir = dir.clone();
    }
    if let Some(tty) = &args.tty {
        settings.tty_override = Some(tty.clone());
    }
    if let Some(path) = &args.overrides {
        settings.overrides_path = Some(path.clone());
    }
    if args.no_mute || args.list_devices {
        settings.mute_tty = false;
    }
    settings.verbose |= args.verbose;
    Ok(settings)
}

fn print_env_help() {
    println!("Environment variables:");
    for (name, help) in ENV_OPTIONS {
        println!("  {:<28} {}", name, help);
    }
}

fn list_devices(context: &InputContext) {
    let devices = context.list_devices();
    println!("Found {} input device(s):", devices.len());
    for device in &devices {
        println!(
            "  {}: [{}] {} {} ({})",
            device.slot, device.id, device.kind, device.label, device.path
        );
    }
    println!("Capabilities: {:?}", context.capabilities());
}

fn grab_all(context: &mut InputContext) {
    for device in context.list_devices() {
        if let Err(e) = context.device_lock(i32::from(device.id), true) {
            log::warn!("{}", e);
        }
    }
}

/// SIGTERM stops the loop. SIGINT is only honored while the terminal
/// keyboard is not muted.
fn install_signals(stop: Arc<AtomicBool>, interrupt: Arc<AtomicBool>) -> anyhow::Result<()> {
    use signal_hook::consts::{SIGINT, SIGTERM};
    use signal_hook::iterator::Signals;

    let mut signals = Signals::new([SIGINT, SIGTERM]).context("installing signal handlers")?;
    std::thread::spawn(move || {
        for signal in &mut signals {
            match signal {
                SIGTERM => {
                    stop.store(true, Ordering::SeqCst);
                    break;
                }
                SIGINT => interrupt.store(true, Ordering::SeqCst),
                _ => {}
            }
        }
    });
    Ok(())
}

/// Default log filter; `--verbose`, the config file and the environment
/// toggle all raise it to debug
fn log_level(settings: &InputSettings) -> &'static str {
    if settings.verbose {
        "debug"
    } else {
        "info"
    }
}

fn run(args: Args) -> anyhow::Result<()> {
    let settings = load_settings(&args)?;
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(log_level(&settings)))
        .init();
    let mut context = InputContext::init(settings).context("starting input subsystem")?;

    if args.list_devices {
        list_devices(&context);
        return Ok(());
    }

    if let Some((period, delay)) = args.repeat {
        let previous = context.key_repeat(period, delay);
        log::info!(
            "Key repeat {}ms/{}ms (was {}ms/{}ms)",
            period,
            delay,
            previous.period,
            previous.delay
        );
    }
    if args.grab {
        grab_all(&mut context);
    }

    let stop = Arc::new(AtomicBool::new(false));
    let interrupt = Arc::new(AtomicBool::new(false));
    install_signals(stop.clone(), interrupt.clone())?;

    log::info!(
        "Watching {} ({} devices, terminal {})",
        context.settings().scan_dir.display(),
        context.registry().live(),
        if context.is_muted() { "muted" } else { "untouched" }
    );

    let mut batch = EventBatch::new();
    while !stop.load(Ordering::SeqCst) {
        if interrupt.swap(false, Ordering::SeqCst) {
            if context.is_muted() {
                log::debug!("Ignoring SIGINT while the terminal is muted");
            } else {
                break;
            }
        }

        context.process(&mut batch)?;
        if batch.dropped() > 0 {
            log::warn!("Dropped {} events this tick", batch.dropped());
        }
        for event in batch.drain() {
            println!("{}", event);
        }
        std::thread::sleep(TICK);
    }

    context.shutdown();
    Ok(())
}

fn main() -> anyhow::Result<()> {
    let args = Args::parse();

    if args.env_help {
        print_env_help();
        return Ok(());
    }

    run(args)
}
