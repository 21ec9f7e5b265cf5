extern crate clap;
use crossbeam_channel::bounded; // Inter-thread communication
use ctrlc; // exit using cntrl-c
use env_logger;
use log::{error, info};

// Internal project modules
use dte_core::{DteLink, LinkConfig};
use dte_peripherals::host::{ConsoleBridge, HostDevice, PrinterSpool};
use dte_peripherals::utils::TtyMode;

mod ten;
use ten::{PrimaryTen, SecondaryTen, TenSide};

// Virtual clock runs at one tick per microsecond
const SLICE_TICKS: u64 = 50;

/// Configures command-line interface using clap
fn get_cli_config<'a>() -> clap::ArgMatches<'a> {
    let description = "DTE20 front end emulator: the KL10 side of a PDP-11 console link";
    clap::App::new("DTE20 front end")
        .version("0.1")
        .about(description)
        .arg(
            clap::Arg::with_name("lines")
                .long("lines")
                .takes_value(true)
                .default_value("16")
                .help("Terminal multiplexer lines (at most 64)"),
        )
        .arg(
            clap::Arg::with_name("mode")
                .long("mode")
                .takes_value(true)
                .default_value("7B")
                .possible_values(&["UC", "7B", "7P", "8B"])
                .help("Console terminal conversion"),
        )
        .arg(
            clap::Arg::with_name("its")
                .long("its")
                .help("The 10 runs the ITS pager, enabling the ITS fast path"),
        )
        .arg(
            clap::Arg::with_name("printer")
                .long("printer")
                .takes_value(true)
                .value_name("FILE")
                .help("Spool line printer output to FILE"),
        )
        .subcommand(
            clap::SubCommand::with_name("secondary")
                .about("Scripted 10 talks the secondary protocol (monitor echo)"),
        )
        .subcommand(
            clap::SubCommand::with_name("primary")
                .about("Scripted 10 brings up the primary protocol and echoes the console"),
        )
        .get_matches()
}

fn main() {
    env_logger::init();

    // Set up Ctrl-C handler with channel communication
    let (signal_sender, signal_receiver) = bounded(1);
    let handler_result = ctrlc::set_handler(move || {
        if signal_sender.is_full() {
            std::process::exit(-1); // Emergency exit if channel blocked
        }
        let _send_result = signal_sender.send(());
    });

    if let Err(e) = handler_result {
        error!("Signal handler failed: {:?}", e);
        return;
    }

    let cli_matches = get_cli_config();

    let tty_lines = match cli_matches.value_of("lines").unwrap_or("16").parse::<usize>() {
        Ok(lines) => lines,
        Err(e) => {
            error!("Invalid line count: {}", e);
            return;
        }
    };
    let mode = match cli_matches.value_of("mode").unwrap_or("7B").parse::<TtyMode>() {
        Ok(mode) => mode,
        Err(e) => {
            error!("{}", e);
            return;
        }
    };
    let config = LinkConfig {
        tty_lines,
        its_paging: cli_matches.is_present("its"),
        ..LinkConfig::default()
    };

    let mut link = DteLink::new(ten::memory(), config);

    let mut ten: Box<dyn TenSide> = match cli_matches.subcommand_name() {
        Some("secondary") => Box::new(SecondaryTen::new()),
        Some("primary") => Box::new(PrimaryTen::new(&mut link)),
        _ => {
            error!("Invalid 10-side specified (secondary or primary)");
            return;
        }
    };

    let mut devices: Vec<Box<dyn HostDevice<dte_core::CoreMemory>>> =
        vec![Box::new(ConsoleBridge::stdio(mode))];
    if let Some(path) = cli_matches.value_of("printer") {
        match PrinterSpool::create(path) {
            Ok(spool) => devices.push(Box::new(spool)),
            Err(e) => {
                error!("Cannot open printer spool {}: {}", path, e);
                return;
            }
        }
    }
    info!("DTE20 up with {} lines", link.lines().count());

    // Main emulation loop
    let mut slice_timer = std::time::Instant::now();
    loop {
        if !signal_receiver.is_empty() {
            break;
        }

        let elapsed_time = slice_timer.elapsed();
        if elapsed_time.as_millis() == 0 {
            // Prevent busy-waiting
            std::thread::sleep(std::time::Duration::from_micros(5000));
            continue;
        }
        slice_timer = std::time::Instant::now();

        // Catch the virtual clock up with real time, letting the 10 act between slices
        let mut ticks = elapsed_time.as_micros() as u64;
        while ticks > 0 {
            let slice = ticks.min(SLICE_TICKS);
            link.run(slice);
            ten.step(&mut link);
            ticks -= slice;
        }

        for device in devices.iter_mut() {
            if let Err(e) = device.service(&mut link) {
                error!("Host device failed: {}", e);
                return;
            }
        }
    }
}
