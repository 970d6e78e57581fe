use std::sync::mpsc;
use std::thread::{self, sleep, JoinHandle};
use std::time::Duration;

use rppal::gpio::{Gpio, OutputPin};
use thiserror::Error;

use crate::GpioError;

const LCD_RS_PIN: u8 = 17;
const LCD_EN_PIN: u8 = 27;
const LCD_D4_PIN: u8 = 5;
const LCD_D5_PIN: u8 = 6;
const LCD_D6_PIN: u8 = 13;
const LCD_D7_PIN: u8 = 26;

const LCD_COLUMNS: usize = 16;
const LCD_ROWS: usize = 2;

/// hd44780 character rom slot for the degree sign.
const DEGREE_GLYPH: u8 = 0xdf;

const ENABLE_PULSE: Duration = Duration::from_micros(1);
const COMMAND_SETTLE: Duration = Duration::from_micros(50);
const CLEAR_SETTLE: Duration = Duration::from_millis(2);
const POWER_ON_SETTLE: Duration = Duration::from_millis(50);
const INIT_NIBBLE_SETTLE: Duration = Duration::from_millis(5);

#[derive(Debug, Clone)]
enum LcdMessage {
    Update(String),
    Clear,
    Stop,
}

#[derive(Error, Clone, Debug)]
pub enum LcdError {
    #[error(transparent)]
    Gpio(#[from] GpioError),
    #[error("Could not send message to lcd thread")]
    Send,
    #[error("Could not wait for lcd thread to stop")]
    ThreadWait,
}

pub type Result<T> = std::result::Result<T, LcdError>;

fn encode(c: char) -> u8 {
    match c {
        '°' => DEGREE_GLYPH,
        c if c.is_ascii() => c as u8,
        _ => b'?',
    }
}

struct LcdPins {
    rs: OutputPin,
    en: OutputPin,
    data: [OutputPin; 4],
}

impl LcdPins {
    fn acquire() -> Result<LcdPins> {
        let gpio = Gpio::new().map_err(|_| GpioError::Initialization)?;
        let output = |pin: u8| {
            gpio.get(pin)
                .map(|p| p.into_output())
                .map_err(|_| LcdError::from(GpioError::Pin(pin)))
        };
        Ok(LcdPins {
            rs: output(LCD_RS_PIN)?,
            en: output(LCD_EN_PIN)?,
            data: [
                output(LCD_D4_PIN)?,
                output(LCD_D5_PIN)?,
                output(LCD_D6_PIN)?,
                output(LCD_D7_PIN)?,
            ],
        })
    }

    fn write_nibble(&mut self, nibble: u8) {
        for (i, pin) in self.data.iter_mut().enumerate() {
            if nibble >> i & 1 == 1 {
                pin.set_high();
            } else {
                pin.set_low();
            }
        }
        self.en.set_high();
        sleep(ENABLE_PULSE);
        self.en.set_low();
        sleep(COMMAND_SETTLE);
    }

    fn write_byte(&mut self, byte: u8, char_mode: bool) {
        if char_mode {
            self.rs.set_high();
        } else {
            self.rs.set_low();
        }
        self.write_nibble(byte >> 4);
        self.write_nibble(byte & 0x0f);
    }

    fn command(&mut self, cmd: u8) {
        self.write_byte(cmd, false);
    }

    fn putc(&mut self, c: u8) {
        self.write_byte(c, true);
    }

    fn init(&mut self) {
        sleep(POWER_ON_SETTLE);
        self.rs.set_low();
        // three wake-up writes drop the controller into a known state, the
        // fourth switches it to 4 bit transfers
        self.write_nibble(0x3);
        sleep(INIT_NIBBLE_SETTLE);
        self.write_nibble(0x3);
        sleep(INIT_NIBBLE_SETTLE);
        self.write_nibble(0x3);
        self.write_nibble(0x2);
        self.command(0x28); // 4 bit, two lines, 5x8 font
        self.command(0x0c); // display on, cursor off
        self.command(0x06); // entry mode: advance, no shift
        self.clear();
    }

    fn clear(&mut self) {
        self.command(0x01);
        sleep(CLEAR_SETTLE);
    }

    fn show(&mut self, text: &str) {
        self.clear();
        for (row, line) in text.lines().take(LCD_ROWS).enumerate() {
            self.command(if row == 0 { 0x80 } else { 0xc0 });
            for c in line.chars().take(LCD_COLUMNS) {
                self.putc(encode(c));
            }
        }
    }
}

/// 16x2 character display driven from a dedicated worker thread.
#[derive(Debug)]
pub struct Lcd {
    write_sender: mpsc::Sender<LcdMessage>,
    write_handle: Option<JoinHandle<()>>,
}

impl Lcd {
    pub fn new() -> Result<Lcd> {
        let mut pins = LcdPins::acquire()?;
        let (write_sender, write_receiver) = mpsc::channel();
        let write_handle = thread::spawn(move || {
            info!("starting lcd worker thread");
            pins.init();
            loop {
                let next_msg = match write_receiver.recv() {
                    Ok(msg) => msg,
                    Err(_) => {
                        info!("lcd message channel disconnected");
                        break;
                    }
                };
                match next_msg {
                    LcdMessage::Update(text) => {
                        trace!("updating lcd: {:?}", text);
                        pins.show(&text);
                    }
                    LcdMessage::Clear => pins.clear(),
                    LcdMessage::Stop => {
                        trace!("lcd worker thread received stop");
                        break;
                    }
                }
            }
            pins.clear();
            info!("lcd worker thread stopping");
        });
        Ok(Lcd {
            write_sender,
            write_handle: Some(write_handle),
        })
    }

    /// Queues a redraw; at most two lines are shown.
    pub fn update(&self, text: String) -> Result<()> {
        self.write_sender
            .send(LcdMessage::Update(text))
            .map_err(|_| LcdError::Send)
    }

    pub fn clear(&self) -> Result<()> {
        self.write_sender
            .send(LcdMessage::Clear)
            .map_err(|_| LcdError::Send)
    }

    /// Stops the worker and waits for it to clear the screen on its way out.
    /// The screen is released exactly once even if called repeatedly.
    pub fn shutdown(&mut self) -> Result<()> {
        let handle = match self.write_handle.take() {
            Some(handle) => handle,
            None => return Ok(()),
        };
        self.write_sender
            .send(LcdMessage::Stop)
            .map_err(|_| LcdError::Send)?;
        handle.join().map_err(|_| LcdError::ThreadWait)
    }
}
