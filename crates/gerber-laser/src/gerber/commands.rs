use log::warn;

use crate::error::GerberError;

use super::coord::{CoordinateFormat, Notation, RawCoord, Units, ZeroSuppression};
use super::lexer::Block;

/// Aperture shape from an %AD command, in file units.
#[derive(Debug, Clone, PartialEq)]
pub enum ApertureShape {
    Circle {
        diameter: f64,
    },
    Rectangle {
        x_size: f64,
        y_size: f64,
    },
    Obround {
        x_size: f64,
        y_size: f64,
    },
    Polygon {
        outer_diameter: f64,
        num_vertices: u32,
        rotation: f64,
    },
    /// Reference to a user-defined aperture macro.
    Macro {
        name: String,
        params: Vec<f64>,
    },
}

/// Layer polarity from %LP command.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum Polarity {
    #[default]
    Dark,
    Clear,
}

/// Operation code. Modal: once set it applies to later coordinate-only blocks.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum DCode {
    /// D01
    Draw,
    /// D02
    #[default]
    Move,
    /// D03
    Flash,
}

/// The coordinate fields of an operation block, undecoded.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Coordinates {
    pub x: Option<RawCoord>,
    pub y: Option<RawCoord>,
    pub i: Option<RawCoord>,
    pub j: Option<RawCoord>,
}

impl Coordinates {
    pub fn is_empty(&self) -> bool {
        self.x.is_none() && self.y.is_none() && self.i.is_none() && self.j.is_none()
    }
}

/// A fully parsed Gerber command.
#[derive(Debug, Clone, PartialEq)]
pub enum GerberCommand {
    /// %FS - Format specification
    FormatSpec(CoordinateFormat),
    /// %MO - Unit mode (also G70/G71)
    Units(Units),
    /// %AD - Aperture definition
    ApertureDefine { code: u32, shape: ApertureShape },
    /// %AM - Aperture macro definition
    MacroDefine { name: String, body: Vec<String> },
    /// Dnn (n >= 10) - Select aperture
    SelectAperture(u32),
    /// Coordinate block. `op` is `None` when the block relies on the modal D-code.
    Operation {
        coords: Coordinates,
        op: Option<DCode>,
    },
    /// G01 - Linear interpolation mode
    LinearMode,
    /// G02 - Clockwise circular interpolation
    ClockwiseArcMode,
    /// G03 - Counter-clockwise circular interpolation
    CounterClockwiseArcMode,
    /// G36 - Begin region
    RegionBegin,
    /// G37 - End region
    RegionEnd,
    /// G74 - Single quadrant arc mode
    SingleQuadrant,
    /// G75 - Multi quadrant arc mode
    MultiQuadrant,
    /// %LP - Layer polarity
    Polarity(Polarity),
    /// M02 (or M00/M01) - End of file
    EndOfFile,
}

/// Parse lexer blocks into commands.
///
/// Malformed blocks are logged and skipped; parsing never fails as a whole.
pub fn parse_commands(blocks: &[Block]) -> Vec<GerberCommand> {
    let mut commands = Vec::new();

    for block in blocks {
        match block {
            Block::Parameter(cmds) => {
                // A macro definition owns every command in its % pair
                if let Some(name) = cmds.first().and_then(|c| c.strip_prefix("AM")) {
                    if name.is_empty() {
                        warn!("Gerber: skipping %AM without a name");
                        continue;
                    }
                    commands.push(GerberCommand::MacroDefine {
                        name: name.to_string(),
                        body: cmds[1..].to_vec(),
                    });
                    continue;
                }
                for content in cmds {
                    match parse_extended(content) {
                        Ok(Some(cmd)) => commands.push(cmd),
                        Ok(None) => {}
                        Err(e) => warn!("Gerber: skipping %{content}%: {e}"),
                    }
                }
            }
            Block::Operation(word) => match parse_word(word) {
                Ok(cmds) => commands.extend(cmds),
                Err(e) => warn!("Gerber: skipping block {word:?}: {e}"),
            },
        }
    }

    commands
}

/// Parse an extended command (content between % delimiters).
fn parse_extended(content: &str) -> Result<Option<GerberCommand>, GerberError> {
    if content.starts_with("FS") {
        return Ok(Some(parse_format_spec(content)?));
    }
    match content {
        "MOMM" => return Ok(Some(GerberCommand::Units(Units::Millimeters))),
        "MOIN" => return Ok(Some(GerberCommand::Units(Units::Inches))),
        "LPD" => return Ok(Some(GerberCommand::Polarity(Polarity::Dark))),
        "LPC" => return Ok(Some(GerberCommand::Polarity(Polarity::Clear))),
        _ => {}
    }
    if content.starts_with("MO") {
        return Err(GerberError::ParseError(format!("unknown unit: {content}")));
    }
    if content.starts_with("AD") {
        return Ok(Some(parse_aperture_define(content)?));
    }
    // Attributes (TF, TA, TO, TD) and legacy image parameters carry no geometry
    Ok(None)
}

/// Parse %FS command. Example: `FSLAX24Y24`, `FSTIX36Y36`
fn parse_format_spec(content: &str) -> Result<GerberCommand, GerberError> {
    let s = &content[2..];

    let mut format = CoordinateFormat::default();
    let flags_end = s.find('X').ok_or_else(|| GerberError::ParseError("FS: missing X".into()))?;
    for flag in s[..flags_end].chars() {
        match flag {
            'L' => format.zero_suppression = ZeroSuppression::Leading,
            'T' => format.zero_suppression = ZeroSuppression::Trailing,
            'A' => format.notation = Notation::Absolute,
            'I' => format.notation = Notation::Incremental,
            // D (no suppression) and N/G/M sequence fields are legacy noise
            _ => {}
        }
    }

    let s = &s[flags_end..];
    let y_pos = s.find('Y').ok_or_else(|| GerberError::ParseError("FS: missing Y".into()))?;
    let x_part = &s[1..y_pos];
    let y_part: String = s[y_pos + 1..]
        .chars()
        .take_while(|c| c.is_ascii_digit())
        .collect();

    (format.x_integer, format.x_decimal) = parse_digit_pair(x_part, 'X')?;
    (format.y_integer, format.y_decimal) = parse_digit_pair(&y_part, 'Y')?;

    Ok(GerberCommand::FormatSpec(format))
}

fn parse_digit_pair(part: &str, axis: char) -> Result<(u8, u8), GerberError> {
    let bytes = part.as_bytes();
    if bytes.len() != 2 || !bytes.iter().all(|b| b.is_ascii_digit()) {
        return Err(GerberError::ParseError(format!(
            "FS: invalid {axis} format digits: {part:?}"
        )));
    }
    Ok((bytes[0] - b'0', bytes[1] - b'0'))
}

/// Parse %AD command. Example: `ADD10C,0.020` or `ADD11R,0.040X0.020`
fn parse_aperture_define(content: &str) -> Result<GerberCommand, GerberError> {
    let s = content[2..]
        .strip_prefix('D')
        .ok_or_else(|| GerberError::ParseError(format!("AD: expected D in {content}")))?;

    let type_pos = s
        .find(|c: char| !c.is_ascii_digit())
        .ok_or_else(|| GerberError::ParseError(format!("AD: no shape in: {s}")))?;

    let code: u32 = s[..type_pos]
        .parse()
        .map_err(|_| GerberError::ParseError(format!("AD: bad aperture code: {s}")))?;
    if code < 10 {
        return Err(GerberError::ParseError(format!(
            "AD: aperture code D{code} is reserved"
        )));
    }

    let shape = parse_aperture_shape(&s[type_pos..])?;
    Ok(GerberCommand::ApertureDefine { code, shape })
}

/// Parse aperture shape. Example: `C,0.020` or `R,0.040X0.020`
fn parse_aperture_shape(s: &str) -> Result<ApertureShape, GerberError> {
    let (kind, params_str) = s.split_once(',').unwrap_or((s, ""));

    let params: Vec<f64> = if params_str.is_empty() {
        Vec::new()
    } else {
        params_str
            .split('X')
            .map(|p| {
                p.trim()
                    .parse::<f64>()
                    .ok()
                    .filter(|v| v.is_finite())
                    .ok_or_else(|| GerberError::ParseError(format!("AD: bad param: {p}")))
            })
            .collect::<Result<Vec<_>, _>>()?
    };

    let need = |n: usize| {
        if params.len() < n {
            Err(GerberError::ParseError(format!(
                "AD {kind}: need {n} params, got {}",
                params.len()
            )))
        } else {
            Ok(())
        }
    };

    match kind {
        // A trailing hole diameter is accepted and ignored
        "C" => {
            need(1)?;
            Ok(ApertureShape::Circle {
                diameter: params[0],
            })
        }
        "R" => {
            need(2)?;
            Ok(ApertureShape::Rectangle {
                x_size: params[0],
                y_size: params[1],
            })
        }
        "O" => {
            need(2)?;
            Ok(ApertureShape::Obround {
                x_size: params[0],
                y_size: params[1],
            })
        }
        "P" => {
            need(2)?;
            let num_vertices = params[1].round();
            if !(3.0..=12.0).contains(&num_vertices) {
                return Err(GerberError::ParseError(format!(
                    "AD P: vertex count {num_vertices} out of range"
                )));
            }
            Ok(ApertureShape::Polygon {
                outer_diameter: params[0],
                num_vertices: num_vertices as u32,
                rotation: params.get(2).copied().unwrap_or(0.0),
            })
        }
        name if !name.is_empty() => Ok(ApertureShape::Macro {
            name: name.to_string(),
            params,
        }),
        _ => Err(GerberError::ParseError("AD: empty shape name".into())),
    }
}

/// Parse a word command (e.g., "D10", "X100Y200D01", "G01", "M02").
///
/// A single word may carry a G-code prefix (e.g., "G01X100Y200D01", "G54D10").
fn parse_word(word: &str) -> Result<Vec<GerberCommand>, GerberError> {
    let mut commands = Vec::new();
    let mut remaining = word;

    if let Some(rest) = remaining.strip_prefix('G') {
        let digits_end = rest
            .find(|c: char| !c.is_ascii_digit())
            .unwrap_or(rest.len());
        let code: u32 = rest[..digits_end]
            .parse()
            .map_err(|_| GerberError::ParseError(format!("bad G-code in: {word}")))?;
        match parse_g_code(code) {
            Some(cmd) => commands.push(cmd),
            None if is_aperture_prefix(code) => {}
            None => warn!("Gerber: ignoring unsupported G{code:02}"),
        }
        remaining = &rest[digits_end..];
        if remaining.is_empty() {
            return Ok(commands);
        }
    }

    if let Some(rest) = remaining.strip_prefix('M') {
        let code: u32 = rest
            .parse()
            .map_err(|_| GerberError::ParseError(format!("bad M-code in: {word}")))?;
        if code <= 2 {
            commands.push(GerberCommand::EndOfFile);
        }
        return Ok(commands);
    }

    let mut coords = Coordinates::default();
    let mut d_code: Option<u32> = None;

    let bytes = remaining.as_bytes();
    let mut pos = 0;
    while pos < bytes.len() {
        if !bytes[pos].is_ascii_alphabetic() {
            return Err(GerberError::ParseError(format!("unexpected text in: {word}")));
        }
        let key = bytes[pos].to_ascii_uppercase();
        pos += 1;
        let start = pos;
        while pos < bytes.len() && matches!(bytes[pos], b'0'..=b'9' | b'+' | b'-' | b'.') {
            pos += 1;
        }
        let value = &remaining[start..pos];

        match key {
            b'X' | b'Y' | b'I' | b'J' => {
                let raw = RawCoord::parse(value)
                    .ok_or_else(|| GerberError::ParseError(format!("bad coord in: {word}")))?;
                let slot = match key {
                    b'X' => &mut coords.x,
                    b'Y' => &mut coords.y,
                    b'I' => &mut coords.i,
                    _ => &mut coords.j,
                };
                *slot = Some(raw);
            }
            b'D' => {
                d_code = Some(
                    value
                        .parse()
                        .map_err(|_| GerberError::ParseError(format!("bad D-code in: {word}")))?,
                );
            }
            _ => {
                return Err(GerberError::ParseError(format!(
                    "unexpected '{}' in: {word}",
                    key as char
                )));
            }
        }
    }

    let op = match d_code {
        None => None,
        Some(1) => Some(DCode::Draw),
        Some(2) => Some(DCode::Move),
        Some(3) => Some(DCode::Flash),
        Some(code) if code >= 10 => {
            if !coords.is_empty() {
                return Err(GerberError::ParseError(format!(
                    "coordinates with aperture select in: {word}"
                )));
            }
            commands.push(GerberCommand::SelectAperture(code));
            return Ok(commands);
        }
        Some(code) => {
            return Err(GerberError::ParseError(format!("reserved D-code D{code}")));
        }
    };

    if op.is_some() || !coords.is_empty() {
        commands.push(GerberCommand::Operation { coords, op });
    }

    Ok(commands)
}

/// Map a G-code number to a command. Legacy codes without geometry yield `None`.
fn parse_g_code(code: u32) -> Option<GerberCommand> {
    match code {
        1 => Some(GerberCommand::LinearMode),
        2 => Some(GerberCommand::ClockwiseArcMode),
        3 => Some(GerberCommand::CounterClockwiseArcMode),
        36 => Some(GerberCommand::RegionBegin),
        37 => Some(GerberCommand::RegionEnd),
        70 => Some(GerberCommand::Units(Units::Inches)),
        71 => Some(GerberCommand::Units(Units::Millimeters)),
        74 => Some(GerberCommand::SingleQuadrant),
        75 => Some(GerberCommand::MultiQuadrant),
        // G90/G91 handled via %FS
        _ => None,
    }
}

/// Legacy G54/G55 prefixes in front of an aperture select carry no state.
fn is_aperture_prefix(code: u32) -> bool {
    matches!(code, 54 | 55)
}
