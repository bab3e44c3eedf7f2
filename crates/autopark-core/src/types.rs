use crate::{
    Result,
    constants::{MAX_PLATE_LENGTH, MIN_PLATE_LENGTH},
    error::Error,
};
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;

/// Vehicle registration plate, normalized.
///
/// OCR output is noisy: it carries spaces, dashes, lowercase letters and
/// stray punctuation. A `Plate` keeps only the ASCII alphanumeric
/// characters, upper-cased, and must be 3-10 characters long after that.
///
/// # Examples
///
/// ```
/// use autopark_core::Plate;
///
/// let plate = Plate::new(" ab12-cde\n").unwrap();
/// assert_eq!(plate.as_str(), "AB12CDE");
///
/// assert!(Plate::new("a-b").is_err());
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct Plate(String);

impl Plate {
    /// Normalize and validate raw plate text.
    ///
    /// # Errors
    /// Returns `Error::InvalidPlate` if fewer than 3 or more than 10
    /// alphanumeric characters remain.
    pub fn new(raw: &str) -> Result<Self> {
        let normalized: String = raw
            .chars()
            .filter(char::is_ascii_alphanumeric)
            .map(|c| c.to_ascii_uppercase())
            .collect();

        let len = normalized.len();
        if !(MIN_PLATE_LENGTH..=MAX_PLATE_LENGTH).contains(&len) {
            return Err(Error::InvalidPlate(format!(
                "plate must be {MIN_PLATE_LENGTH}-{MAX_PLATE_LENGTH} alphanumeric chars, got {len} from {raw:?}"
            )));
        }

        Ok(Plate(normalized))
    }

    /// Get the plate as a string slice.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for Plate {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl std::str::FromStr for Plate {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        Plate::new(s)
    }
}

impl TryFrom<String> for Plate {
    type Error = Error;

    fn try_from(value: String) -> Result<Self> {
        Plate::new(&value)
    }
}

impl From<Plate> for String {
    fn from(plate: Plate) -> Self {
        plate.0
    }
}

/// Parking slot identifier (1-based).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "u32", into = "u32")]
pub struct SlotId(u32);

impl SlotId {
    /// Create a slot id.
    ///
    /// # Errors
    /// Returns `Error::InvalidSlotId` for slot 0.
    pub fn new(id: u32) -> Result<Self> {
        if id == 0 {
            return Err(Error::InvalidSlotId("slot ids start at 1".to_string()));
        }
        Ok(SlotId(id))
    }

    /// The first slot; single-slot lots only ever use this one.
    pub const FIRST: SlotId = SlotId(1);

    #[must_use]
    pub fn as_u32(&self) -> u32 {
        self.0
    }
}

impl fmt::Display for SlotId {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl TryFrom<u32> for SlotId {
    type Error = Error;

    fn try_from(value: u32) -> Result<Self> {
        SlotId::new(value)
    }
}

impl From<SlotId> for u32 {
    fn from(slot: SlotId) -> Self {
        slot.0
    }
}

/// Which gate a plate event or gate command belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Direction {
    Entry,
    Exit,
}

impl Direction {
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Direction::Entry => "entry",
            Direction::Exit => "exit",
        }
    }
}

impl fmt::Display for Direction {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for Direction {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "entry" | "in" => Ok(Direction::Entry),
            "exit" | "out" => Ok(Direction::Exit),
            other => Err(Error::InvalidDirection(other.to_string())),
        }
    }
}

/// Currency amount in minor units (cents).
///
/// Fees are computed in integer minor units so that rounding never
/// drifts. The text form always has two decimals: `Money::from_minor(200)`
/// displays as `2.00`.
///
/// Deserializes from a decimal string (`"2.50"`) or a number in major
/// units (`2.5`); serializes as the decimal string.
///
/// # Examples
///
/// ```
/// use autopark_core::Money;
///
/// let rate: Money = "2.50".parse().unwrap();
/// assert_eq!(rate.minor(), 250);
/// assert_eq!(rate.times(3).to_string(), "7.50");
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Default)]
pub struct Money(i64);

impl Money {
    pub const ZERO: Money = Money(0);

    #[must_use]
    pub const fn from_minor(minor: i64) -> Self {
        Money(minor)
    }

    #[must_use]
    pub fn minor(&self) -> i64 {
        self.0
    }

    /// Multiply by a whole number of units, saturating on overflow.
    #[must_use]
    pub fn times(&self, units: i64) -> Money {
        Money(self.0.saturating_mul(units))
    }

    #[must_use]
    pub fn is_negative(&self) -> bool {
        self.0 < 0
    }

    fn from_major_f64(value: f64) -> Result<Self> {
        if !value.is_finite() {
            return Err(Error::InvalidAmount(value.to_string()));
        }
        Ok(Money((value * 100.0).round() as i64))
    }
}

impl fmt::Display for Money {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        let sign = if self.0 < 0 { "-" } else { "" };
        let abs = self.0.unsigned_abs();
        write!(f, "{sign}{}.{:02}", abs / 100, abs % 100)
    }
}

impl std::str::FromStr for Money {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        let invalid = || Error::InvalidAmount(s.to_string());
        let trimmed = s.trim();
        let (negative, digits) = match trimmed.strip_prefix('-') {
            Some(rest) => (true, rest),
            None => (false, trimmed),
        };

        let (whole, fraction) = digits.split_once('.').unwrap_or((digits, ""));
        if whole.is_empty() || fraction.len() > 2 {
            return Err(invalid());
        }
        if !whole.bytes().chain(fraction.bytes()).all(|b| b.is_ascii_digit()) {
            return Err(invalid());
        }

        let whole: i64 = whole.parse().map_err(|_| invalid())?;
        let cents: i64 = match fraction.len() {
            0 => 0,
            1 => fraction.parse::<i64>().map_err(|_| invalid())? * 10,
            _ => fraction.parse().map_err(|_| invalid())?,
        };

        let minor = whole
            .checked_mul(100)
            .and_then(|w| w.checked_add(cents))
            .ok_or_else(invalid)?;

        Ok(Money(if negative { -minor } else { minor }))
    }
}

impl Serialize for Money {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for Money {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> std::result::Result<Self, D::Error> {
        #[derive(Deserialize)]
        #[serde(untagged)]
        enum Repr {
            Whole(i64),
            Decimal(f64),
            Text(String),
        }

        let parsed = match Repr::deserialize(deserializer)? {
            Repr::Whole(major) => major
                .checked_mul(100)
                .map(Money)
                .ok_or_else(|| Error::InvalidAmount(major.to_string())),
            Repr::Decimal(value) => Money::from_major_f64(value),
            Repr::Text(text) => text.parse(),
        };
        parsed.map_err(serde::de::Error::custom)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[rstest]
    #[case("AB12CDE", "AB12CDE")]
    #[case("ab12 cde", "AB12CDE")]
    #[case(" KA-01-HH-1234 \n", "KA01HH1234")]
    #[case("x9z", "X9Z")]
    fn test_plate_normalizes(#[case] input: &str, #[case] expected: &str) {
        let plate = Plate::new(input).unwrap();
        assert_eq!(plate.as_str(), expected);
    }

    #[rstest]
    #[case("")]
    #[case("A-1")] // 2 chars after cleanup
    #[case("---")]
    #[case("ABCDEFGHIJK")] // 11 chars
    fn test_plate_invalid(#[case] input: &str) {
        assert!(matches!(Plate::new(input), Err(Error::InvalidPlate(_))));
    }

    #[test]
    fn test_plate_serde_validates() {
        let plate: Plate = serde_json::from_str("\"ab12cde\"").unwrap();
        assert_eq!(plate.as_str(), "AB12CDE");
        assert!(serde_json::from_str::<Plate>("\"a\"").is_err());
    }

    #[test]
    fn test_slot_id() {
        assert!(SlotId::new(0).is_err());
        assert_eq!(SlotId::new(3).unwrap().as_u32(), 3);
        assert_eq!(SlotId::FIRST.to_string(), "1");
    }

    #[rstest]
    #[case("entry", Direction::Entry)]
    #[case("EXIT", Direction::Exit)]
    #[case("in", Direction::Entry)]
    fn test_direction_parse(#[case] input: &str, #[case] expected: Direction) {
        assert_eq!(input.parse::<Direction>().unwrap(), expected);
    }

    #[rstest]
    #[case("2.00", 200)]
    #[case("2", 200)]
    #[case("2.5", 250)]
    #[case("0.05", 5)]
    #[case("-1.25", -125)]
    fn test_money_parse(#[case] input: &str, #[case] minor: i64) {
        assert_eq!(input.parse::<Money>().unwrap().minor(), minor);
    }

    #[rstest]
    #[case("")]
    #[case("1.234")]
    #[case("abc")]
    #[case(".50")]
    #[case("1.-5")]
    fn test_money_parse_invalid(#[case] input: &str) {
        assert!(input.parse::<Money>().is_err());
    }

    #[test]
    fn test_money_display() {
        assert_eq!(Money::from_minor(200).to_string(), "2.00");
        assert_eq!(Money::from_minor(5).to_string(), "0.05");
        assert_eq!(Money::from_minor(-125).to_string(), "-1.25");
    }

    #[test]
    fn test_money_serde_accepts_numbers_and_text() {
        let from_text: Money = serde_json::from_str("\"2.50\"").unwrap();
        let from_float: Money = serde_json::from_str("2.5").unwrap();
        let from_int: Money = serde_json::from_str("2").unwrap();
        assert_eq!(from_text.minor(), 250);
        assert_eq!(from_float.minor(), 250);
        assert_eq!(from_int.minor(), 200);
        assert_eq!(serde_json::to_string(&from_text).unwrap(), "\"2.50\"");
    }
}
