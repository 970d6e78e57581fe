extern crate pretty_env_logger;
#[macro_use]
extern crate log;

use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};

use color_eyre::eyre::WrapErr;
use hearth::buttons::InputDispatcher;
use hearth::config::Config;
use hearth::indicator::LedPair;
use hearth::lcd::Lcd;
use hearth::led::Led;
use hearth::reporter::Reporter;
use hearth::sensor::{Aht20, SmoothedSensor};
use hearth::serial::SerialLink;
use hearth::storage::{ReadingFilter, ReadingLog};
use hearth::thermostat::{Mode, Thermostat};
use structopt::StructOpt;

#[derive(StructOpt, Debug)]
enum Opt {
    /// Run the thermostat control loop
    Run {
        /// Path to the JSON configuration file
        #[structopt(short, long, default_value = "config.json")]
        config: PathBuf,
    },
    /// Print recorded temperature readings
    History {
        /// Path to the JSON configuration file
        #[structopt(short, long, default_value = "config.json")]
        config: PathBuf,

        /// Only readings at or after this timestamp (YYYY-MM-DD HH:MM:SS)
        #[structopt(long)]
        since: Option<String>,

        /// Only readings at or before this timestamp
        #[structopt(long)]
        until: Option<String>,

        /// Only readings taken in this mode
        #[structopt(long)]
        state: Option<Mode>,

        /// Print the average temperature per mode instead of rows
        #[structopt(long)]
        summary: bool,
    },
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    pretty_env_logger::init();
    color_eyre::install()?;

    let opts = Opt::from_args();

    debug!("opts: {:?}", opts);

    match opts {
        Opt::Run { config } => run(&config).await?,
        Opt::History {
            config,
            since,
            until,
            state,
            summary,
        } => history(&config, since, until, state, summary)?,
    }

    Ok(())
}

async fn run(config_path: &Path) -> color_eyre::Result<()> {
    let config = Config::load(config_path).wrap_err("Could not load configuration")?;

    let storage =
        ReadingLog::open(&config.database_path).wrap_err("Could not open reading database")?;
    let sensor = Arc::new(Mutex::new(SmoothedSensor::new(
        Aht20::default_addr().wrap_err("Could not initialize temperature sensor")?,
    )));
    let serial = SerialLink::new(&config.serial_port, config.baudrate)
        .wrap_err("Could not initialize serial port")?;
    let lcd = Lcd::new().wrap_err("Could not initialize lcd")?;
    let heat_led = Led::new(config.heat_led_pin).wrap_err("Could not initialize heat indicator")?;
    let cool_led = Led::new(config.cool_led_pin).wrap_err("Could not initialize cool indicator")?;

    let machine = Arc::new(Mutex::new(Thermostat::new(
        LedPair::new(heat_led, cool_led),
        config.default_set_point,
    )));

    let _buttons = InputDispatcher::start(&config, machine.clone(), sensor.clone())
        .wrap_err("Could not bind buttons")?;
    let reporter = Reporter::start(machine, sensor, lcd, serial, storage);

    tokio::signal::ctrl_c()
        .await
        .wrap_err("Could not listen for shutdown signal")?;
    info!("shutting down system...");
    reporter.stop().await.wrap_err("Could not stop reporter loop")?;

    Ok(())
}

fn history(
    config_path: &Path,
    since: Option<String>,
    until: Option<String>,
    state: Option<Mode>,
    summary: bool,
) -> color_eyre::Result<()> {
    let config = Config::load(config_path).wrap_err("Could not load configuration")?;
    let storage =
        ReadingLog::open(&config.database_path).wrap_err("Could not open reading database")?;

    if summary {
        for (state, average) in storage
            .average_by_state()
            .wrap_err("Could not summarize readings")?
        {
            println!("{}: {:.1}", state, average);
        }
    } else {
        let filter = ReadingFilter {
            since,
            until,
            state: state.map(|mode| mode.label().to_string()),
        };
        for reading in storage.query(&filter).wrap_err("Could not query readings")? {
            println!(
                "{}  {:<4}  {:>4}  {:>4}",
                reading.timestamp, reading.state, reading.temperature, reading.set_point
            );
        }
    }

    Ok(())
}
