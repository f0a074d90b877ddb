use std::io::{self, IsTerminal};
use std::time::Duration;

use clap::{value_parser, Arg, ArgAction, ArgMatches, Command};
use colored::Colorize;
use tracing::debug;

use indi_client::sansio::protocol::elements;
use indi_client::sansio::{get_properties, SlewState};
use indi_client::{
    read_equatorial, switch_is_on, ClientConfig, Connection, Coordinate, SlewController,
    SlewOutcome,
};

use crate::report::{CheckStatus, Report};

mod logging;
mod report;

pub type Result<T> = std::result::Result<T, Box<dyn std::error::Error + 'static + Send + Sync>>;

/// Right ascension offset of the slew check, in hours.
const CHECK_SLEW_OFFSET: f64 = 0.001;

fn connect(config: &ClientConfig) -> Result<Connection> {
    Connection::with_config(config).map_err(|e| format!("Cannot connect to indiserver: {e}").into())
}

fn read_position(connection: &mut Connection, config: &ClientConfig) -> Result<Coordinate> {
    let query = get_properties(&config.protocol_version, Some(&config.device));
    let response = connection
        .send_and_drain(&query, config.drain_wait)
        .map_err(|e| format!("Failed to query '{}': {e}", config.device))?;
    read_equatorial(&response, &config.device)
        .ok_or_else(|| format!("Could not read coordinates of '{}'", config.device).into())
}

fn indi_check(config: &ClientConfig, json: bool) -> Result<()> {
    let mut report = Report::new();
    run_checks(config, &mut report);

    if json {
        println!(
            "{}",
            report
                .to_json()
                .map_err(|e| format!("Cannot serialize report: {e}"))?
        );
    } else {
        report
            .print_to(&mut io::stdout().lock())
            .map_err(|e| format!("Cannot print report: {e}"))?;
    }

    if report.success() {
        Ok(())
    } else {
        Err(format!("{} check(s) failed", report.count(CheckStatus::Fail)).into())
    }
}

fn run_checks(config: &ClientConfig, report: &mut Report) {
    let mut connection = match Connection::with_config(config) {
        Ok(connection) => {
            report.push("INDI server connection", CheckStatus::Pass, Some(config.address()));
            connection
        }
        Err(e) => {
            report.push("INDI server connection", CheckStatus::Fail, Some(e.to_string()));
            return;
        }
    };

    let snapshot = connection.query(
        &get_properties(&config.protocol_version, None),
        config.drain_wait,
    );
    if indi_client::is_error_reply(&snapshot) {
        report.push("INDI properties", CheckStatus::Fail, Some(snapshot.as_str()));
    } else if snapshot.contains(&indi_client::scan::device_marker(&config.device)) {
        report.push(
            "INDI properties",
            CheckStatus::Pass,
            Some(format!("{} found", config.device)),
        );
    } else {
        report.push(
            "INDI properties",
            CheckStatus::Fail,
            Some("Mount device not found"),
        );
    }

    match switch_is_on(&snapshot, &config.device, elements::CONNECT) {
        Some(true) => report.push("Mount connection status", CheckStatus::Pass, Some("Mount connected")),
        Some(false) => report.push(
            "Mount connection status",
            CheckStatus::Warn,
            Some("Mount not connected"),
        ),
        None => report.push(
            "Mount connection status",
            CheckStatus::Fail,
            Some("Cannot determine status"),
        ),
    }

    let position = read_equatorial(&snapshot, &config.device);
    match position {
        Some(p) => report.push(
            "Read current position",
            CheckStatus::Pass,
            Some(format!("RA: {}, Dec: {}", p.ra_hms(), p.dec_dm())),
        ),
        None => report.push(
            "Read current position",
            CheckStatus::Warn,
            Some("Could not read coordinates"),
        ),
    }

    let Some(position) = position else {
        report.push("Slew command", CheckStatus::Skip, Some("No coordinates available"));
        return;
    };

    let target = match Coordinate::new(
        (position.ra_hours + CHECK_SLEW_OFFSET) % 24.0,
        position.dec_degrees,
    ) {
        Ok(target) => target,
        Err(e) => {
            report.push("Slew command", CheckStatus::Fail, Some(e.to_string()));
            return;
        }
    };

    let mut slew = SlewController::new(&mut connection, config);
    match slew.request_slew(target) {
        Ok(SlewState::Busy) | Ok(SlewState::Accepted) => {
            report.push("Slew command", CheckStatus::Pass, Some("Slew command accepted"));
        }
        Ok(state) => {
            debug!(?state, "inconclusive slew response");
            report.push("Slew command", CheckStatus::Warn, Some("Slew response unclear"));
        }
        Err(e) => {
            report.push("Slew command", CheckStatus::Fail, Some(e.to_string()));
            return;
        }
    }
    if let Err(e) = slew.abort() {
        report.push("Abort slew", CheckStatus::Fail, Some(e.to_string()));
    }
}

fn indi_props(config: &ClientConfig) -> Result<()> {
    let mut connection = connect(config)?;
    let response = connection
        .send_and_drain(&get_properties(&config.protocol_version, None), config.drain_wait)
        .map_err(|e| format!("Failed to query properties: {e}"))?;
    print!("{}", response);
    if !response.ends_with('\n') {
        println!();
    }
    Ok(())
}

fn indi_position(config: &ClientConfig) -> Result<()> {
    let mut connection = connect(config)?;
    let p = read_position(&mut connection, config)?;

    println!("{} {:.4}h ({})", "RA: ".bold(), p.ra_hours, p.ra_hms());
    println!("{} {:.4}° ({})", "Dec:".bold(), p.dec_degrees, p.dec_dm());
    Ok(())
}

fn indi_slew(config: &ClientConfig, ra: f64, dec: f64, timeout: Duration) -> Result<()> {
    let target = Coordinate::new(ra, dec).map_err(|e| format!("Invalid target: {e}"))?;
    let mut connection = connect(config)?;
    let mut slew = SlewController::new(&mut connection, config);

    println!("Slewing to RA={}, Dec={}...", ra, dec);
    let state = slew
        .request_slew(target)
        .map_err(|e| format!("Failed to send slew command: {e}"))?;
    debug!(?state, "slew command sent");
    println!("Slew command sent. Monitoring position...");

    let outcome = slew
        .poll_until_arrival_with(timeout, config.poll_interval, |obs| {
            if let Some(p) = obs.position {
                println!("  Position: RA={:.4}, Dec={:.4}", p.ra_hours, p.dec_degrees);
            }
        })
        .map_err(|e| format!("Failed to monitor slew: {e}"))?;

    match outcome {
        SlewOutcome::Arrived => println!("{}", "Target reached".green().bold()),
        SlewOutcome::TimedOut => println!(
            "{} after {:?}",
            "Slew did not complete".yellow().bold(),
            timeout
        ),
    }
    Ok(())
}

fn indi_abort(config: &ClientConfig) -> Result<()> {
    let mut connection = connect(config)?;
    SlewController::new(&mut connection, config)
        .abort()
        .map_err(|e| format!("Failed to send abort: {e}"))?;
    println!("Abort sent to '{}'", config.device);
    Ok(())
}

fn seconds(secs: f64) -> Result<Duration> {
    Duration::try_from_secs_f64(secs).map_err(|e| format!("Invalid duration '{secs}': {e}").into())
}

fn load_config(matches: &ArgMatches) -> Result<ClientConfig> {
    let mut config = match matches.get_one::<String>("config") {
        Some(path) => ClientConfig::from_file(path)
            .map_err(|e| format!("Failed to load config '{path}': {e}"))?,
        None => ClientConfig::default(),
    };

    if let Some(host) = matches.get_one::<String>("host") {
        config.host = host.clone();
    }
    if let Some(port) = matches.get_one::<u16>("port") {
        config.port = *port;
    }
    if let Some(device) = matches.get_one::<String>("device") {
        config.device = device.clone();
    }
    if let Some(wait) = matches.get_one::<f64>("drain-wait") {
        config.drain_wait = seconds(*wait)?;
    }
    Ok(config)
}

fn should_colorize(matches: &ArgMatches) -> bool {
    match matches.get_one::<String>("color").map(String::as_str) {
        Some("on") => true,
        Some("off") => false,
        _ => io::stdout().is_terminal(),
    }
}

const VERSION: &str = env!("CARGO_PKG_VERSION");

fn app() -> Command {
    Command::new("indi-probe")
        .version(VERSION)
        .about("Check and drive a telescope mount through an indiserver")
        .arg(
            Arg::new("debug")
                .long("debug")
                .action(ArgAction::SetTrue)
                .help("print debug"),
        )
        .arg(
            Arg::new("color")
                .long("color")
                .value_parser(["on", "off", "auto"])
                .default_value("auto")
                .help("colorize output"),
        )
        .arg(
            Arg::new("config")
                .short('c')
                .long("config")
                .value_name("FILE")
                .help("TOML configuration file"),
        )
        .arg(
            Arg::new("host")
                .short('H')
                .long("host")
                .value_name("HOST")
                .help("indiserver host"),
        )
        .arg(
            Arg::new("port")
                .short('p')
                .long("port")
                .value_name("PORT")
                .value_parser(value_parser!(u16))
                .help("indiserver port"),
        )
        .arg(
            Arg::new("device")
                .short('d')
                .long("device")
                .value_name("NAME")
                .help("INDI device name of the mount"),
        )
        .arg(
            Arg::new("drain-wait")
                .long("drain-wait")
                .value_name("SECONDS")
                .value_parser(value_parser!(f64))
                .help("time to wait for the server's response to each message"),
        )
        .subcommand(
            Command::new("check")
                .about("Run the mount health checks")
                .long_about(
                    "Connect, query the properties, check the mount's connection state and \
                     position and send a tiny slew followed by an abort.",
                )
                .arg(
                    Arg::new("json")
                        .long("json")
                        .action(ArgAction::SetTrue)
                        .help("print the report as JSON"),
                ),
        )
        .subcommand(Command::new("props").about("Print the raw properties snapshot"))
        .subcommand(Command::new("position").about("Print the mount's equatorial coordinates"))
        .subcommand(
            Command::new("slew")
                .about("Slew to coordinates and monitor the position")
                .arg(
                    Arg::new("RA")
                        .required(true)
                        .value_parser(value_parser!(f64))
                        .help("right ascension in hours [0, 24)"),
                )
                .arg(
                    Arg::new("DEC")
                        .required(true)
                        .allow_negative_numbers(true)
                        .value_parser(value_parser!(f64))
                        .help("declination in degrees [-90, 90]"),
                )
                .arg(
                    Arg::new("timeout")
                        .short('t')
                        .long("timeout")
                        .value_name("SECONDS")
                        .value_parser(value_parser!(f64))
                        .help("time to wait for the arrival"),
                ),
        )
        .subcommand(Command::new("abort").about("Abort any mount motion"))
}

fn main() {
    let matches = app().get_matches();

    let colorize = should_colorize(&matches);
    colored::control::set_override(colorize);

    let debug = matches.get_flag("debug");
    if let Err(e) = logging::init_logging(debug) {
        eprintln!("{} {}", "Warning:".yellow().bold(), e);
    }

    if let Err(e) = do_main(&matches) {
        if debug {
            eprintln!("{:?}", e);
        } else {
            eprintln!("{} {}", "Error:".red().bold(), e);
        }
        std::process::exit(1);
    }
}

fn do_main(matches: &ArgMatches) -> Result<()> {
    let config = load_config(matches)?;
    debug!(?config, "configuration");

    match matches.subcommand() {
        Some(("check", sub_matches)) => indi_check(&config, sub_matches.get_flag("json"))?,
        Some(("props", _)) => indi_props(&config)?,
        Some(("position", _)) => indi_position(&config)?,
        Some(("slew", sub_matches)) => {
            // both are required
            let ra = *sub_matches.get_one::<f64>("RA").ok_or("missing RA")?;
            let dec = *sub_matches.get_one::<f64>("DEC").ok_or("missing DEC")?;
            let timeout = match sub_matches.get_one::<f64>("timeout") {
                Some(secs) => seconds(*secs)?,
                None => config.slew_timeout,
            };
            indi_slew(&config, ra, dec, timeout)?
        }
        Some(("abort", _)) => indi_abort(&config)?,
        _ => {
            app()
                .print_help()
                .map_err(|e| format!("Couldn't print help: {e}"))?;
            println!();
        }
    }
    Ok(())
}
