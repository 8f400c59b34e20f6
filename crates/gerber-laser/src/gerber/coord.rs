use log::warn;

/// Decimal digits assumed when a file never declares a usable `%FS` format.
pub const DEFAULT_DECIMAL_DIGITS: u8 = 6;

/// Integer digits paired with [`DEFAULT_DECIMAL_DIGITS`].
pub const DEFAULT_INTEGER_DIGITS: u8 = 3;

/// Which zeros the writer dropped from integer coordinate tokens.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum ZeroSuppression {
    #[default]
    Leading,
    Trailing,
}

/// Absolute or incremental coordinate notation.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum Notation {
    #[default]
    Absolute,
    Incremental,
}

/// Coordinate format from the %FS (Format Specification) command.
///
/// Example: `%FSLAX24Y24*%` means leading-zero suppression, absolute mode,
/// 2 integer digits + 4 decimal digits for both X and Y.
#[derive(Debug, Clone, PartialEq)]
pub struct CoordinateFormat {
    pub zero_suppression: ZeroSuppression,
    pub notation: Notation,
    pub x_integer: u8,
    pub x_decimal: u8,
    pub y_integer: u8,
    pub y_decimal: u8,
}

impl Default for CoordinateFormat {
    fn default() -> Self {
        Self {
            zero_suppression: ZeroSuppression::Leading,
            notation: Notation::Absolute,
            x_integer: DEFAULT_INTEGER_DIGITS,
            x_decimal: DEFAULT_DECIMAL_DIGITS,
            y_integer: DEFAULT_INTEGER_DIGITS,
            y_decimal: DEFAULT_DECIMAL_DIGITS,
        }
    }
}

/// Unit system from the %MO command.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum Units {
    #[default]
    Millimeters,
    Inches,
}

impl Units {
    /// Factor converting one file unit to millimetres.
    pub fn scale(self) -> f64 {
        match self {
            Units::Millimeters => 1.0,
            Units::Inches => 25.4,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Axis {
    X,
    Y,
}

/// A coordinate field exactly as written, before format decoding.
#[derive(Debug, Clone, PartialEq)]
pub enum RawCoord {
    /// Digits with an implied decimal point, e.g. `X012500`.
    Integer { value: i64, digits: u8 },
    /// A literal decimal number, e.g. `X1.25`. Used verbatim.
    Decimal(f64),
}

impl RawCoord {
    /// Parse the text following an `X`/`Y`/`I`/`J` letter.
    pub fn parse(text: &str) -> Option<RawCoord> {
        if text.contains('.') {
            return text.parse::<f64>().ok().map(RawCoord::Decimal);
        }
        let unsigned = text.trim_start_matches(['+', '-']);
        if unsigned.is_empty()
            || unsigned.len() > u8::MAX as usize
            || !unsigned.bytes().all(|b| b.is_ascii_digit())
        {
            return None;
        }
        let value = text.parse::<i64>().ok()?;
        Some(RawCoord::Integer {
            value,
            digits: unsigned.len() as u8,
        })
    }
}

/// Converts raw Gerber coordinates to millimetres.
///
/// The first `%FS` and `%MO` seen are locked in; repeats are ignored so a
/// stray header in the middle of a file cannot rescale what came before.
#[derive(Debug, Clone, Default)]
pub struct CoordinateConverter {
    pub format: CoordinateFormat,
    pub units: Units,
    format_locked: bool,
    units_locked: bool,
}

impl CoordinateConverter {
    pub fn set_format(&mut self, format: &CoordinateFormat) {
        if self.format_locked {
            if *format != self.format {
                warn!("Gerber: ignoring repeated %FS with a different format");
            }
            return;
        }
        self.format = format.clone();
        self.format_locked = true;
    }

    pub fn set_units(&mut self, units: Units) {
        if self.units_locked {
            if units != self.units {
                warn!("Gerber: ignoring repeated %MO switching to {units:?}");
            }
            return;
        }
        self.units = units;
        self.units_locked = true;
    }

    pub fn notation(&self) -> Notation {
        self.format.notation
    }

    /// Decode a coordinate field into millimetres.
    ///
    /// Integer tokens are divided by 10^decimal digits; tokens holding a
    /// literal decimal point keep their value. With trailing-zero suppression
    /// the token is first right-padded to the declared digit count.
    pub fn decode(&self, raw: &RawCoord, axis: Axis) -> f64 {
        let (integer_digits, decimal_digits) = match axis {
            Axis::X => (self.format.x_integer, self.format.x_decimal),
            Axis::Y => (self.format.y_integer, self.format.y_decimal),
        };
        let value = match raw {
            RawCoord::Decimal(v) => *v,
            RawCoord::Integer { value, digits } => {
                let mut v = *value as f64;
                let total = integer_digits as i32 + decimal_digits as i32;
                if self.format.zero_suppression == ZeroSuppression::Trailing
                    && (*digits as i32) < total
                {
                    v *= 10f64.powi(total - *digits as i32);
                }
                v / 10f64.powi(decimal_digits as i32)
            }
        };
        self.to_mm(value)
    }

    /// Scale a length in file units (aperture sizes, macro geometry) to mm.
    pub fn to_mm(&self, value: f64) -> f64 {
        value * self.units.scale()
    }
}
