/// A case-insensitive mapping from unit name to the factor that converts it into the table's
/// base unit.
#[derive(Debug, Clone, Copy)]
pub struct UnitTable {
    units: &'static [(&'static str, f64)],
}

/// File sizes, in kilobyte-equivalents. fio sizes use decimal multiples here.
pub const SIZE_KB: UnitTable = UnitTable {
    units: &[
        ("b", 0.001),
        ("k", 1.0),
        ("kb", 1.0),
        ("m", 1e3),
        ("mb", 1e3),
        ("g", 1e6),
        ("gb", 1e6),
        ("t", 1e9),
        ("tb", 1e9),
        ("p", 1e12),
        ("pb", 1e12),
    ],
};

/// Ramp times, in milliseconds.
pub const RAMP_TIME_MS: UnitTable = UnitTable {
    units: &[
        ("us", 1e-3),
        ("ms", 1.0),
        ("s", 1e3),
        ("m", 60.0 * 1e3),
        ("h", 3600.0 * 1e3),
        ("d", 24.0 * 3600.0 * 1e3),
    ],
};

/// fio ramp times without a unit are in seconds.
pub const DEFAULT_RAMP_TIME_UNIT: &str = "s";

/// fio sizes have no implied unit we accept, a bare number is rejected.
pub const DEFAULT_SIZE_UNIT: &str = "";

impl UnitTable {
    pub fn factor(&self, unit: &str) -> Option<f64> {
        let unit = unit.to_ascii_lowercase();
        self.units
            .iter()
            .find(|(name, _)| *name == unit)
            .map(|(_, factor)| *factor)
    }
}

#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum UnitError {
    #[error("Unknown unit '{unit}' in value '{value}'")]
    UnknownUnit { value: String, unit: String },
    #[error("Malformed value '{value}', expected <number>[unit]")]
    MalformedValue { value: String },
}

/// Convert a `<number>[unit]` string into the base unit of `table`.
///
/// `default_unit` is used when the value has no unit, e.g. `"10"` as a ramp time means ten
/// seconds. The numeric part must be a non-negative integer.
pub fn convert_value(value: &str, table: UnitTable, default_unit: &str) -> Result<f64, UnitError> {
    let malformed = || UnitError::MalformedValue {
        value: value.to_string(),
    };

    let trimmed = value.trim();
    let split = trimmed
        .find(|c: char| !c.is_ascii_digit())
        .unwrap_or(trimmed.len());
    let (number, unit) = trimmed.split_at(split);

    if number.is_empty() || !unit.chars().all(|c| c.is_ascii_alphabetic()) {
        return Err(malformed());
    }
    let number: u64 = number.parse().map_err(|_| malformed())?;

    let unit = if unit.is_empty() { default_unit } else { unit };
    let factor = table.factor(unit).ok_or_else(|| UnitError::UnknownUnit {
        value: value.to_string(),
        unit: unit.to_string(),
    })?;

    Ok(number as f64 * factor)
}
