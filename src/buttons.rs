use std::sync::{Arc, Mutex, MutexGuard};
use std::time::{Duration, Instant};

use rppal::gpio::{Gpio, InputPin, Trigger};
use thiserror::Error;
use tokio::sync::mpsc::{self, UnboundedSender};
use tokio::task::JoinHandle;
use tokio_stream::wrappers::UnboundedReceiverStream;
use tokio_stream::StreamExt;

use crate::config::Config;
use crate::indicator::IndicatorOutputs;
use crate::sensor::{self, SensorError, SmoothedSensor};
use crate::thermostat::Thermostat;
use crate::{GpioError, RppalError};

const DEBOUNCE: Duration = Duration::from_millis(200);

#[derive(Clone, Copy, Debug)]
pub enum Command {
    CycleMode,
    IncreaseSetPoint,
    DecreaseSetPoint,
}

#[derive(Error, Debug)]
pub enum ButtonError {
    #[error(transparent)]
    Gpio(#[from] GpioError),
    #[error("Could not set up interrupt for pin {0}")]
    Interrupt(u8, #[source] RppalError),
}

pub type Result<T> = std::result::Result<T, ButtonError>;

/// Binds the three panel buttons to thermostat commands. Presses arrive on
/// the gpio interrupt thread, get debounced there, and are forwarded over a
/// channel to a dispatch task.
pub struct InputDispatcher {
    _pins: Vec<InputPin>,
    _dispatch_handle: JoinHandle<()>,
}

impl InputDispatcher {
    pub fn start<O>(
        config: &Config,
        machine: Arc<Mutex<Thermostat<O>>>,
        sensor: Arc<Mutex<SmoothedSensor>>,
    ) -> Result<InputDispatcher>
    where
        O: IndicatorOutputs + Send + 'static,
    {
        let (command_sender, command_receiver) = mpsc::unbounded_channel();
        let bindings = [
            (config.state_button_pin, Command::CycleMode),
            (config.increase_button_pin, Command::IncreaseSetPoint),
            (config.decrease_button_pin, Command::DecreaseSetPoint),
        ];
        let gpio = Gpio::new().map_err(|_| GpioError::Initialization)?;
        let mut pins = Vec::with_capacity(bindings.len());
        for (pin, command) in bindings {
            pins.push(Self::bind(&gpio, pin, command, command_sender.clone())?);
        }

        let dispatch_handle = tokio::spawn(async move {
            let mut commands = UnboundedReceiverStream::new(command_receiver);
            while let Some(command) = commands.next().await {
                Self::dispatch(command, &machine, &sensor);
            }
            info!("button command channel closed");
        });

        Ok(InputDispatcher {
            _pins: pins,
            _dispatch_handle: dispatch_handle,
        })
    }

    fn bind(
        gpio: &Gpio,
        pin: u8,
        command: Command,
        sender: UnboundedSender<Command>,
    ) -> Result<InputPin> {
        let mut input = gpio
            .get(pin)
            .map_err(|_| GpioError::Pin(pin))?
            .into_input_pullup();
        let mut last_press = Instant::now() - DEBOUNCE;
        input
            .set_async_interrupt(Trigger::FallingEdge, move |_| {
                let now = Instant::now();
                if now.duration_since(last_press) < DEBOUNCE {
                    trace!("debounced {:?} press", command);
                    return;
                }
                last_press = now;
                if sender.send(command).is_err() {
                    info!("button dispatch task closed, dropping {:?} press", command);
                }
            })
            .map_err(|e| ButtonError::Interrupt(pin, RppalError::from(e)))?;
        info!("bound pin {} to {:?}", pin, command);
        Ok(input)
    }

    fn dispatch<O: IndicatorOutputs>(
        command: Command,
        machine: &Arc<Mutex<Thermostat<O>>>,
        sensor: &Arc<Mutex<SmoothedSensor>>,
    ) {
        debug!("dispatching {:?}", command);
        match command {
            Command::CycleMode => {
                if let Some(mut machine) = Self::lock_machine(machine, command) {
                    info!("cycling thermostat state");
                    machine.cycle();
                }
            }
            Command::IncreaseSetPoint => {
                let temperature = Self::read_temperature(sensor);
                if let Some(mut machine) = Self::lock_machine(machine, command) {
                    machine.increase_set_point(temperature);
                }
            }
            Command::DecreaseSetPoint => {
                let temperature = Self::read_temperature(sensor);
                if let Some(mut machine) = Self::lock_machine(machine, command) {
                    machine.decrease_set_point(temperature);
                }
            }
        }
    }

    fn lock_machine<'a, O: IndicatorOutputs>(
        machine: &'a Arc<Mutex<Thermostat<O>>>,
        command: Command,
    ) -> Option<MutexGuard<'a, Thermostat<O>>> {
        match machine.lock() {
            Ok(guard) => Some(guard),
            Err(_) => {
                error!("thermostat mutex poisoned, dropping {:?}", command);
                None
            }
        }
    }

    fn read_temperature(sensor: &Arc<Mutex<SmoothedSensor>>) -> sensor::Result<i32> {
        match sensor.lock() {
            Ok(mut sensor) => sensor.read_smoothed(),
            Err(_) => Err(SensorError::Mutex),
        }
    }
}
