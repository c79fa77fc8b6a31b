//! Demo binary: wires a `Scanner` and `LineIo` together against shared state
//! for manual smoke testing. Not part of the library's public API.

use std::sync::Arc;
use std::sync::atomic::AtomicBool;
use std::time::Duration;

use clap::Parser;

use scan3705::config::ScannerConfig;
use scan3705::discipline::Sdlc;
use scan3705::ereg::ExternalRegisters;
use scan3705::interrupts::Interrupts;
use scan3705::lineio::LineIo;
use scan3705::scanner::Scanner;
use scan3705::worker;

#[derive(Parser, Debug)]
#[command(name = "scan3705d", about = "Type-2 Communication Scanner demo host")]
struct Args {
    /// Path to a TOML config file overlaying the built-in defaults.
    #[arg(long)]
    config: Option<std::path::PathBuf>,

    /// Interface address Line I/O binds its listeners to.
    #[arg(long)]
    bind: Option<String>,

    /// First line's TCP listen port; line `i` listens on `port_base + i`.
    #[arg(long)]
    port_base: Option<u16>,

    /// Number of lines to scan.
    #[arg(long)]
    max_lines: Option<usize>,

    /// Increase log verbosity (repeatable: -v, -vv).
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,

    /// Decrease log verbosity (repeatable: -q, -qq).
    #[arg(short, long, action = clap::ArgAction::Count)]
    quiet: u8,
}

fn main() -> anyhow::Result<()> {
    let args = Args::parse();
    init_logging(args.verbose, args.quiet);

    let mut config = ScannerConfig::load(args.config.as_deref())?;
    if let Some(bind) = args.bind {
        config.bind_addr = bind;
    }
    if let Some(port_base) = args.port_base {
        config.port_base = port_base;
    }
    if let Some(max_lines) = args.max_lines {
        config.max_lines = max_lines;
    }

    log::info!(
        "starting scan3705d: {} line(s), bind {}:{}",
        config.max_lines,
        config.bind_addr,
        config.port_base
    );

    let eregs = Arc::new(ExternalRegisters::new(config.max_lines));
    let interrupts = Arc::new(Interrupts::new());
    let shutdown = Arc::new(AtomicBool::new(false));

    let (scanner_halves, lineio_halves) = scan3705::channels::build_channels(config.max_lines);

    let scanner = Arc::new(Scanner::new(
        config.max_lines,
        config.buffer_size,
        config.scan_interval(),
        eregs.clone(),
        interrupts.clone(),
        scanner_halves,
        Box::new(Sdlc),
        shutdown.clone(),
    ));
    let lineio = Arc::new(LineIo::bind(&config, lineio_halves, shutdown.clone())?);

    {
        let scanner = scanner.clone();
        worker::spawn_pinned("scanner", config.scanner_core, move || scanner.run())?;
    }
    {
        let lineio = lineio.clone();
        worker::spawn_pinned("lineio", config.lineio_core, move || lineio.run())?;
    }

    // Runs for process lifetime; stopped externally (Ctrl-C/SIGTERM). The
    // shared `shutdown` flag exists for embedders and tests, not this demo,
    // which never sets it.
    loop {
        for line in 0..config.max_lines {
            if let Ok(view) = scanner.ncp_read_icw(line) {
                log::info!(
                    "line {line}: e44={:#06x} e45={:#06x} e47={:#06x}",
                    view.e44,
                    view.e45,
                    view.e47
                );
            }
        }
        std::thread::sleep(Duration::from_secs(1));
    }
}

fn init_logging(verbose: u8, quiet: u8) {
    let level = match i32::from(verbose) - i32::from(quiet) {
        ..=-2 => log::LevelFilter::Error,
        -1 => log::LevelFilter::Warn,
        0 => log::LevelFilter::Info,
        1 => log::LevelFilter::Debug,
        _ => log::LevelFilter::Trace,
    };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(level.as_str()))
        .init();
}

