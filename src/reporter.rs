use std::sync::{Arc, Mutex};
use std::thread::sleep;

use chrono::Local;
use thiserror::Error;
use tokio::sync::watch;
use tokio::task::{spawn_blocking, JoinHandle};
use tokio::time::{Duration, Instant};

use crate::indicator::IndicatorOutputs;
use crate::lcd::Lcd;
use crate::sensor::{self, SensorError, SmoothedSensor};
use crate::serial::SerialLink;
use crate::status::{self, TIMESTAMP_FORMAT};
use crate::storage::ReadingLog;
use crate::thermostat::Thermostat;

const TICK_RATE: Duration = Duration::from_secs(1);

/// Every 30th tick emits the serial record and appends a storage row.
const RECORD_INTERVAL: u32 = 30;

/// The second display line alternates over a cycle of this many ticks.
const ALTERNATION_CYCLE: u8 = 10;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ReporterState {
    Running,
    Stopping,
    Stopped,
}

#[derive(Error, Debug)]
pub enum ReporterError {
    #[error("Could not send stop to reporter loop")]
    Send,
    #[error("Could not wait for reporter loop to stop")]
    ThreadWait,
}

pub type Result<T> = std::result::Result<T, ReporterError>;

/// Bookkeeping values for one tick of the loop.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Tick {
    pub alternation: u8,
    pub emit_record: bool,
}

#[derive(Clone, Debug)]
pub struct TickCounters {
    counter: u32,
    alternation: u8,
}

impl TickCounters {
    pub fn new() -> TickCounters {
        TickCounters {
            counter: 1,
            alternation: 1,
        }
    }

    /// Values for the current tick; the counters move on to the next one.
    /// The tick counter resets to 1 whenever a record goes out, keeping the
    /// emission period at exactly `RECORD_INTERVAL`.
    pub fn advance(&mut self) -> Tick {
        let tick = Tick {
            alternation: self.alternation,
            emit_record: self.counter % RECORD_INTERVAL == 0,
        };
        self.alternation = if self.alternation >= ALTERNATION_CYCLE {
            1
        } else {
            self.alternation + 1
        };
        self.counter = if tick.emit_record { 1 } else { self.counter + 1 };
        tick
    }
}

impl Default for TickCounters {
    fn default() -> Self {
        Self::new()
    }
}

/// The once-per-second control loop. Owns the display, serial link, and
/// storage connection; the storage connection closes only after the loop has
/// fully stopped.
pub struct Reporter {
    handle: JoinHandle<()>,
    stop_sender: watch::Sender<bool>,
    state_receiver: watch::Receiver<ReporterState>,
}

impl Reporter {
    pub fn start<O>(
        machine: Arc<Mutex<Thermostat<O>>>,
        sensor: Arc<Mutex<SmoothedSensor>>,
        lcd: Lcd,
        serial: SerialLink,
        storage: ReadingLog,
    ) -> Reporter
    where
        O: IndicatorOutputs + Send + 'static,
    {
        let (stop_sender, stop_receiver) = watch::channel(false);
        let (state_sender, state_receiver) = watch::channel(ReporterState::Running);
        let handle = spawn_blocking(move || {
            Self::run(machine, sensor, lcd, serial, storage, stop_receiver, state_sender)
        });
        Reporter {
            handle,
            stop_sender,
            state_receiver,
        }
    }

    fn run<O>(
        machine: Arc<Mutex<Thermostat<O>>>,
        sensor: Arc<Mutex<SmoothedSensor>>,
        mut lcd: Lcd,
        mut serial: SerialLink,
        storage: ReadingLog,
        stop_receiver: watch::Receiver<bool>,
        state_sender: watch::Sender<ReporterState>,
    ) where
        O: IndicatorOutputs,
    {
        info!("starting reporter loop");
        let mut counters = TickCounters::new();
        let mut next_tick = Instant::now() + TICK_RATE;
        loop {
            if *stop_receiver.borrow() {
                info!("reporter loop received stop signal");
                if state_sender.send(ReporterState::Stopping).is_err() {
                    trace!("no reporter state receivers");
                }
                break;
            }

            Self::tick(&machine, &sensor, &lcd, &mut serial, &storage, &mut counters);

            let now = Instant::now();
            if now < next_tick {
                sleep(next_tick - now);
            } else {
                info!("tick already surpassed its second, might need a slower tick rate");
            }
            next_tick += TICK_RATE;
        }

        if let Err(e) = lcd.shutdown() {
            error!("could not release lcd: {}", e);
        }
        drop(storage);
        if state_sender.send(ReporterState::Stopped).is_err() {
            trace!("no reporter state receivers");
        }
        info!("reporter loop stopped");
    }

    fn tick<O>(
        machine: &Arc<Mutex<Thermostat<O>>>,
        sensor: &Arc<Mutex<SmoothedSensor>>,
        lcd: &Lcd,
        serial: &mut SerialLink,
        storage: &ReadingLog,
        counters: &mut TickCounters,
    ) where
        O: IndicatorOutputs,
    {
        let timestamp = Local::now().format(TIMESTAMP_FORMAT).to_string();

        let temperature: sensor::Result<i32> = match sensor.lock() {
            Ok(mut sensor) => sensor.read_smoothed(),
            Err(_) => Err(SensorError::Mutex),
        };
        if let Err(e) = &temperature {
            error!("temperature read failed: {}", e);
        }
        let shown = *temperature.as_ref().unwrap_or(&0);

        let (mode, set_point) = match machine.lock() {
            Ok(machine) => (machine.mode(), machine.set_point()),
            Err(_) => {
                error!("thermostat mutex poisoned, skipping tick");
                return;
            }
        };

        let tick = counters.advance();
        let payload = status::render_display(&timestamp, mode, shown, set_point, tick.alternation);
        if let Err(e) = lcd.update(payload.to_text()) {
            error!("lcd update failed: {}", e);
        }

        if tick.emit_record {
            let record = status::render_serial(mode, temperature.ok(), set_point);
            debug!("emitting record: {}", record);
            if let Err(e) = serial.write(record.as_bytes()) {
                error!("serial write failed: {}", e);
            }
            if let Err(e) = storage.append(&timestamp, mode.label(), shown, set_point) {
                error!("storage append failed: {}", e);
            }
        }
    }

    pub fn state(&self) -> ReporterState {
        *self.state_receiver.borrow()
    }

    /// Flags the loop to stop and waits for it to release the display and
    /// close storage. The in-flight tick completes first.
    pub async fn stop(self) -> Result<()> {
        self.stop_sender.send(true).map_err(|_| ReporterError::Send)?;
        self.handle.await.map_err(|_| ReporterError::ThreadWait)?;
        Ok(())
    }
}
