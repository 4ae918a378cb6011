//! DS18B20 water temperature probe on a bit-banged 1-Wire bus.
//!
//! A single probe sits on the bus, so every transaction addresses it with
//! SKIP ROM.  The data pin must be open-drain with a pull-up: driving it
//! high releases the line.
//!
//! Slot timings follow the Maxim application note for standard speed.

use embedded_hal::delay::DelayNs;
use embedded_hal::digital::{InputPin, OutputPin};
use log::debug;

use crate::error::SensorError;

const SKIP_ROM: u8 = 0xCC;
const CONVERT_T: u8 = 0x44;
const READ_SCRATCHPAD: u8 = 0xBE;

/// 12-bit conversion takes at most 750 ms.
const CONVERSION_POLLS: u32 = 80;
const CONVERSION_POLL_MS: u32 = 10;

/// Dallas/Maxim CRC-8 (x^8 + x^5 + x^4 + 1, reflected).
pub fn crc8(data: &[u8]) -> u8 {
    let mut crc = 0u8;
    for &byte in data {
        let mut b = byte;
        for _ in 0..8 {
            let mix = (crc ^ b) & 0x01;
            crc >>= 1;
            if mix != 0 {
                crc ^= 0x8C;
            }
            b >>= 1;
        }
    }
    crc
}

/// Temperature in °C from a 9-byte scratchpad, after the CRC check.
pub fn decode_scratchpad(scratchpad: &[u8; 9]) -> Result<f32, SensorError> {
    if crc8(&scratchpad[..8]) != scratchpad[8] {
        return Err(SensorError::Crc);
    }
    let raw = i16::from_le_bytes([scratchpad[0], scratchpad[1]]);
    Ok(f32::from(raw) / 16.0)
}

pub struct Ds18b20<P, D> {
    pin: P,
    delay: D,
}

impl<P, D> Ds18b20<P, D>
where
    P: InputPin + OutputPin,
    D: DelayNs,
{
    pub fn new(mut pin: P, delay: D) -> Self {
        let _ = pin.set_high();
        Self { pin, delay }
    }

    /// Start a conversion, wait for it, and read the result.
    pub fn read_celsius(&mut self) -> Result<f32, SensorError> {
        if !self.reset()? {
            return Err(SensorError::NotPresent);
        }
        self.write_byte(SKIP_ROM)?;
        self.write_byte(CONVERT_T)?;
        self.wait_conversion()?;

        if !self.reset()? {
            return Err(SensorError::NotPresent);
        }
        self.write_byte(SKIP_ROM)?;
        self.write_byte(READ_SCRATCHPAD)?;
        let mut scratchpad = [0u8; 9];
        for byte in &mut scratchpad {
            *byte = self.read_byte()?;
        }
        debug!("DS18B20 scratchpad {:02x?}", scratchpad);
        decode_scratchpad(&scratchpad)
    }

    // ── Bus primitives ────────────────────────────────────────

    /// Reset pulse; `true` if a device answered with a presence pulse.
    fn reset(&mut self) -> Result<bool, SensorError> {
        self.low()?;
        self.delay.delay_us(480);
        self.release()?;
        self.delay.delay_us(70);
        let present = self.pin.is_low().map_err(|_| SensorError::Io)?;
        self.delay.delay_us(410);
        Ok(present)
    }

    fn write_bit(&mut self, bit: bool) -> Result<(), SensorError> {
        self.low()?;
        if bit {
            self.delay.delay_us(6);
            self.release()?;
            self.delay.delay_us(64);
        } else {
            self.delay.delay_us(60);
            self.release()?;
            self.delay.delay_us(10);
        }
        Ok(())
    }

    fn read_bit(&mut self) -> Result<bool, SensorError> {
        self.low()?;
        self.delay.delay_us(6);
        self.release()?;
        self.delay.delay_us(9);
        let bit = self.pin.is_high().map_err(|_| SensorError::Io)?;
        self.delay.delay_us(55);
        Ok(bit)
    }

    fn write_byte(&mut self, byte: u8) -> Result<(), SensorError> {
        for i in 0..8 {
            self.write_bit(byte & (1 << i) != 0)?;
        }
        Ok(())
    }

    fn read_byte(&mut self) -> Result<u8, SensorError> {
        let mut byte = 0u8;
        for i in 0..8 {
            if self.read_bit()? {
                byte |= 1 << i;
            }
        }
        Ok(byte)
    }

    /// The probe holds the line low until the conversion completes.
    fn wait_conversion(&mut self) -> Result<(), SensorError> {
        for _ in 0..CONVERSION_POLLS {
            if self.read_bit()? {
                return Ok(());
            }
            self.delay.delay_ms(CONVERSION_POLL_MS);
        }
        Err(SensorError::Timeout)
    }

    fn low(&mut self) -> Result<(), SensorError> {
        self.pin.set_low().map_err(|_| SensorError::Io)
    }

    fn release(&mut self) -> Result<(), SensorError> {
        self.pin.set_high().map_err(|_| SensorError::Io)
    }
}

impl<P, D> super::Thermometer for Ds18b20<P, D>
where
    P: InputPin + OutputPin,
    D: DelayNs,
{
    fn read_celsius(&mut self) -> Result<f32, SensorError> {
        Ds18b20::read_celsius(self)
    }
}
