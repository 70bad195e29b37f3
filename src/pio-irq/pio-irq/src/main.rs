extern crate clap;
use crossbeam_channel::{bounded, Receiver}; // Ctrl-C notification
use log::{error, info, warn};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::{Duration, Instant};

use pio_irq_core::{pio_irq_table, IrqHandler, IrqTable, PioId, PioPlatform, SmId};
use pio_irq_peripherals::vpio::{FlagEvent, Stimulus, VirtualPio, STORM_LIMIT};

/// Counts the interrupts of one state machine
struct Probe {
    name: &'static str,
    hits: AtomicUsize,
}

impl Probe {
    const fn new(name: &'static str) -> Self {
        Probe {
            name,
            hits: AtomicUsize::new(0),
        }
    }

    fn hits(&self) -> usize {
        self.hits.load(Ordering::Relaxed)
    }
}

impl IrqHandler for Probe {
    fn on_irq(&self) {
        let count = self.hits.fetch_add(1, Ordering::Relaxed) + 1;
        info!("{}: interrupt #{}", self.name, count);
    }
}

pio_irq_table!(
    /// Handlers for PIO IRQ flag 0 (relative to each state machine)
    struct ProbeIrq<Probe, 0, VirtualPio>
);

static SM_PROBES: [Probe; 4] = [
    Probe::new("SM0"),
    Probe::new("SM1"),
    Probe::new("SM2"),
    Probe::new("SM3"),
];
static PROBE_A: Probe = Probe::new("A");
static PROBE_B: Probe = Probe::new("B");

/// Configures command-line interface using clap
fn get_cli_config<'a>() -> clap::ArgMatches<'a> {
    let description = "PIO interrupt demultiplexer running on a virtual PIO";
    clap::App::new("PIO IRQ demo")
        .version("0.1")
        .about(description)
        .subcommand(
            clap::SubCommand::with_name("single")
                .about("Bind, wire and fire PIO0 SM2 once"),
        )
        .subcommand(
            clap::SubCommand::with_name("rebind")
                .about("Replace the handler of PIO0 SM1 and fire it"),
        )
        .subcommand(
            clap::SubCommand::with_name("unhandled")
                .about("Fire a wired source that has no handler"),
        )
        .subcommand(
            clap::SubCommand::with_name("run")
                .about("Fire state machines periodically until Ctrl-C")
                .arg(
                    clap::Arg::with_name("pio")
                        .long("pio")
                        .takes_value(true)
                        .default_value("0")
                        .help("PIO block to use"),
                )
                .arg(
                    clap::Arg::with_name("sm")
                        .long("sm")
                        .takes_value(true)
                        .multiple(true)
                        .use_delimiter(true)
                        .default_value("0,1,2,3")
                        .help("State machines to fire"),
                )
                .arg(
                    clap::Arg::with_name("line")
                        .long("line")
                        .takes_value(true)
                        .default_value("0")
                        .help("PIO interrupt line (0 or 1)"),
                )
                .arg(
                    clap::Arg::with_name("period")
                        .long("period")
                        .takes_value(true)
                        .default_value("250")
                        .help("Milliseconds between flag events"),
                )
                .arg(
                    clap::Arg::with_name("duration")
                        .long("duration")
                        .takes_value(true)
                        .help("Stop after this many milliseconds"),
                ),
        )
        .get_matches()
}

/// Settings of the `run` scenario
struct RunConfig {
    pio: PioId,
    sms: heapless::Vec<SmId, 4>,
    line: u8,
    period: Duration,
    duration: Option<Duration>,
}

fn parse_number<T: std::str::FromStr>(args: &clap::ArgMatches, name: &str) -> Option<T> {
    let raw = args.value_of(name)?;
    match raw.parse() {
        Ok(value) => Some(value),
        Err(_) => {
            error!("Invalid value for --{}: {}", name, raw);
            None
        }
    }
}

fn parse_run_config(args: &clap::ArgMatches) -> Option<RunConfig> {
    let pio = match PioId::new(parse_number(args, "pio")?) {
        Some(pio) => pio,
        None => {
            error!("No such PIO block");
            return None;
        }
    };

    let mut sms: heapless::Vec<SmId, 4> = heapless::Vec::new();
    for raw in args.values_of("sm")? {
        let sm = match raw.parse().ok().and_then(SmId::new) {
            Some(sm) => sm,
            None => {
                error!("Invalid state machine: {}", raw);
                return None;
            }
        };
        if !sms.contains(&sm) && sms.push(sm).is_err() {
            return None;
        }
    }

    let line: u8 = parse_number(args, "line")?;
    if line > 1 {
        error!("Interrupt line must be 0 or 1");
        return None;
    }

    let duration = if args.is_present("duration") {
        Some(Duration::from_millis(parse_number(args, "duration")?))
    } else {
        None
    };

    Some(RunConfig {
        pio,
        sms,
        line,
        period: Duration::from_millis(parse_number(args, "period")?),
        duration,
    })
}

fn single_state_machine() {
    let probe = &SM_PROBES[2];
    ProbeIrq::bind(PioId::PIO0, SmId::SM2, probe);
    ProbeIrq::wire(0, PioId::PIO0, SmId::SM2, true);

    let entries = VirtualPio::raise(PioId::PIO0, 2);
    info!(
        "PIO0 SM2 fired: {} vector entries, {} handler call(s), flags now 0x{:x}",
        entries,
        probe.hits(),
        VirtualPio::raised_flags(PioId::PIO0)
    );
}

fn rebind() {
    if !ProbeIrq::bind(PioId::PIO0, SmId::SM1, &PROBE_A) {
        warn!("PIO0 SM1 already had a handler");
    }
    if !ProbeIrq::bind(PioId::PIO0, SmId::SM1, &PROBE_B) {
        info!("PIO0 SM1: handler A replaced by B");
    }
    ProbeIrq::wire(0, PioId::PIO0, SmId::SM1, true);

    VirtualPio::raise(PioId::PIO0, 1);
    info!("A: {} call(s), B: {} call(s)", PROBE_A.hits(), PROBE_B.hits());
}

fn unhandled() {
    ProbeIrq::wire(1, PioId::PIO0, SmId::SM3, true);

    let entries = VirtualPio::raise(PioId::PIO0, 3);
    if entries >= STORM_LIMIT {
        error!("Unhandled source kept firing");
    } else {
        info!(
            "Unhandled PIO0 SM3: {} vector entries, flags now 0x{:x}",
            entries,
            VirtualPio::raised_flags(PioId::PIO0)
        );
    }
}

fn run(config: RunConfig, stop: &Receiver<()>) {
    let mut pattern = Vec::new();
    for sm in config.sms.iter() {
        ProbeIrq::bind(config.pio, *sm, &SM_PROBES[sm.index()]);
        ProbeIrq::wire(config.line, config.pio, *sm, true);
        pattern.push(FlagEvent {
            pio: config.pio,
            flag: sm.index() as u32,
        });
    }

    let stimulus = Stimulus::spawn(pattern, config.period);
    let started = Instant::now();
    loop {
        if !stop.is_empty() {
            break;
        }
        if let Some(limit) = config.duration {
            if started.elapsed() >= limit {
                break;
            }
        }
        stimulus.step(Duration::from_millis(10));
    }
    drop(stimulus);

    for sm in config.sms.iter() {
        let probe = &SM_PROBES[sm.index()];
        info!("{}: {} interrupt(s)", probe.name, probe.hits());
    }
}

fn main() {
    env_logger::init();

    // Set up Ctrl-C handler with channel communication
    let (stop_sender, stop_receiver) = bounded(1);
    let handler_result = ctrlc::set_handler(move || {
        let _ = stop_sender.try_send(());
    });
    if let Err(e) = handler_result {
        error!("Signal handler failed: {:?}", e);
        return;
    }

    let cli_matches = get_cli_config();
    match cli_matches.subcommand() {
        ("single", _) => single_state_machine(),
        ("rebind", _) => rebind(),
        ("unhandled", _) => unhandled(),
        ("run", Some(args)) => match parse_run_config(args) {
            Some(config) => run(config, &stop_receiver),
            None => error!("Invalid run configuration"),
        },
        _ => error!("No scenario specified, see --help"),
    }
}
