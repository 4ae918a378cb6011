//! Text command parser.
//!
//! Messages are colon-delimited, keyword first, case-insensitive:
//!
//! ```text
//! water:<zone>:<minutes>     stop      status
//! on:<id>[:<seconds>]        off:<id>
//! cal:<sensor>:<interval>    done:<sensor>
//! ph:on[:<seconds>]  ph:off  ph:cal:<interval>  ph:done    (same for orp)
//! ```
//!
//! The parser never touches hardware state.  A rejected message produces
//! a [`ParseError`] that the controller logs and reports; nothing is
//! queued.

use core::str::Split;
use core::time::Duration;

use crate::config::{ControllerConfig, Variant};
use crate::error::ParseError;

use super::commands::{ActuatorId, Command, CommandKind, Sensor};

const DELIMITER: char = ':';

/// Stateless parser; holds only the channel-name → pump mapping.
#[derive(Debug, Clone, Copy)]
pub struct CommandParser {
    /// `(ph_pump, orp_pump)`; `None` disables the `ph:`/`orp:` grammar.
    pumps: Option<(ActuatorId, ActuatorId)>,
}

impl CommandParser {
    /// Parser for a dosing controller.
    pub fn new(ph_pump: ActuatorId, orp_pump: ActuatorId) -> Self {
        Self {
            pumps: Some((ph_pump, orp_pump)),
        }
    }

    /// Parser without channel keywords, for irrigation controllers.
    pub fn generic() -> Self {
        Self { pumps: None }
    }

    pub fn from_config(config: &ControllerConfig) -> Self {
        match config.variant {
            Variant::Dosing => Self::new(ActuatorId(config.ph_pump), ActuatorId(config.orp_pump)),
            Variant::Irrigation => Self::generic(),
        }
    }

    pub fn parse(&self, raw: &str) -> Result<Command, ParseError> {
        let text = raw.trim();
        if text.is_empty() {
            return Err(ParseError::Empty);
        }
        let lowered = text.to_ascii_lowercase();
        let mut fields = lowered.split(DELIMITER);
        let keyword = fields.next().unwrap_or_default();

        let kind = match keyword {
            "stop" => CommandKind::Stop,
            "status" => CommandKind::Status,
            "water" => {
                let zone = actuator_field(fields.next())?;
                let minutes = duration_field(fields.next())?.ok_or(ParseError::MissingDuration)?;
                let duration = minutes_to_duration(minutes)?;
                CommandKind::Water { zone, duration }
            }
            "on" => {
                let actuator = actuator_field(fields.next())?;
                CommandKind::On {
                    actuator,
                    duration: seconds_or_zero(fields.next())?,
                }
            }
            "off" => {
                let actuator = actuator_field(fields.next())?;
                seconds_or_zero(fields.next())?;
                CommandKind::Off { actuator }
            }
            "cal" | "done" if self.pumps.is_none() => {
                return Err(ParseError::UnrecognizedCommand);
            }
            "cal" => {
                let sensor = sensor_field(fields.next())?;
                let interval = duration_field(fields.next())?.ok_or(ParseError::MissingDuration)?;
                CommandKind::Calibrate { sensor, interval }
            }
            "done" => CommandKind::Done {
                sensor: sensor_field(fields.next())?,
            },
            "ph" | "orp" => {
                let Some((ph_pump, orp_pump)) = self.pumps else {
                    return Err(ParseError::UnrecognizedCommand);
                };
                if keyword == "ph" {
                    channel_command(Sensor::Ph, ph_pump, &mut fields)?
                } else {
                    channel_command(Sensor::Orp, orp_pump, &mut fields)?
                }
            }
            _ => return Err(ParseError::UnrecognizedCommand),
        };

        if fields.next().is_some() {
            return Err(ParseError::UnexpectedField);
        }
        Ok(Command::new(kind, text))
    }
}

/// `ph:<verb>…` / `orp:<verb>…`, the dosing grammar.
fn channel_command(
    sensor: Sensor,
    pump: ActuatorId,
    fields: &mut Split<'_, char>,
) -> Result<CommandKind, ParseError> {
    match fields.next().unwrap_or_default() {
        "on" => Ok(CommandKind::On {
            actuator: pump,
            duration: seconds_or_zero(fields.next())?,
        }),
        "off" => {
            seconds_or_zero(fields.next())?;
            Ok(CommandKind::Off { actuator: pump })
        }
        "cal" => {
            let interval = duration_field(fields.next())?.ok_or(ParseError::MissingDuration)?;
            Ok(CommandKind::Calibrate { sensor, interval })
        }
        "done" => Ok(CommandKind::Done { sensor }),
        _ => Err(ParseError::UnrecognizedCommand),
    }
}

// ── Field helpers ─────────────────────────────────────────────

fn actuator_field(field: Option<&str>) -> Result<ActuatorId, ParseError> {
    index_field(field).map(ActuatorId)
}

fn sensor_field(field: Option<&str>) -> Result<Sensor, ParseError> {
    Sensor::from_index(index_field(field)?).ok_or(ParseError::InvalidTarget)
}

fn index_field(field: Option<&str>) -> Result<u8, ParseError> {
    match field.map(str::trim) {
        None | Some("") => Err(ParseError::MissingTarget),
        Some(s) => s.parse::<u8>().map_err(|_| ParseError::InvalidTarget),
    }
}

/// `Ok(None)` when the field is absent or blank.
fn duration_field(field: Option<&str>) -> Result<Option<Duration>, ParseError> {
    match field.map(str::trim) {
        None | Some("") => Ok(None),
        Some(s) => {
            let secs: f32 = s.parse().map_err(|_| ParseError::InvalidDuration)?;
            Duration::try_from_secs_f32(secs)
                .map(Some)
                .map_err(|_| ParseError::InvalidDuration)
        }
    }
}

fn seconds_or_zero(field: Option<&str>) -> Result<Duration, ParseError> {
    Ok(duration_field(field)?.unwrap_or(Duration::ZERO))
}

/// Irrigation durations arrive in minutes.
fn minutes_to_duration(minutes: Duration) -> Result<Duration, ParseError> {
    minutes.checked_mul(60).ok_or(ParseError::InvalidDuration)
}
