use crate::error::{RaffleError, Result};
use chrono::{DateTime, Utc};
use rand::RngCore;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;
use std::str::FromStr;

/// Decimals of the native currency (wei per ether) and of LINK (juels per LINK).
pub const ETHER_DECIMALS: u32 = 18;

/// Base-unit quantity. Arithmetic is checked; overflow surfaces as
/// [`RaffleError::AmountOverflow`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Amount(u128);

impl Amount {
    pub const ZERO: Amount = Amount(0);

    pub const fn from_base_units(units: u128) -> Self {
        Self(units)
    }

    pub const fn to_base_units(self) -> u128 {
        self.0
    }

    pub fn is_zero(self) -> bool {
        self.0 == 0
    }

    pub fn checked_add(self, rhs: Amount) -> Result<Amount> {
        self.0
            .checked_add(rhs.0)
            .map(Amount)
            .ok_or(RaffleError::AmountOverflow)
    }

    pub fn checked_sub(self, rhs: Amount) -> Option<Amount> {
        self.0.checked_sub(rhs.0).map(Amount)
    }

    pub fn checked_mul(self, factor: u128) -> Result<Amount> {
        self.0
            .checked_mul(factor)
            .map(Amount)
            .ok_or(RaffleError::AmountOverflow)
    }

    /// Parse a whole-unit decimal string ("0.01", "2", "0.25") into base units.
    pub fn parse_units(value: &str, decimals: u32) -> Result<Amount> {
        let value = value.trim();
        if value.is_empty() {
            return Err(RaffleError::InvalidAmount("empty amount".to_string()));
        }

        let (whole, frac) = match value.split_once('.') {
            Some((w, f)) => (w, f),
            None => (value, ""),
        };

        if frac.len() > decimals as usize {
            return Err(RaffleError::InvalidAmount(format!(
                "{} has more than {} decimal places",
                value, decimals
            )));
        }

        let all_digits = |s: &str| s.chars().all(|c| c.is_ascii_digit());
        if !all_digits(whole) || !all_digits(frac) || (whole.is_empty() && frac.is_empty()) {
            return Err(RaffleError::InvalidAmount(value.to_string()));
        }

        let scale = 10u128
            .checked_pow(decimals)
            .ok_or(RaffleError::AmountOverflow)?;
        let whole: u128 = if whole.is_empty() {
            0
        } else {
            whole
                .parse()
                .map_err(|_| RaffleError::InvalidAmount(value.to_string()))?
        };
        let frac_units: u128 = if frac.is_empty() {
            0
        } else {
            let padded = format!("{:0<width$}", frac, width = decimals as usize);
            padded
                .parse()
                .map_err(|_| RaffleError::InvalidAmount(value.to_string()))?
        };

        whole
            .checked_mul(scale)
            .and_then(|w| w.checked_add(frac_units))
            .map(Amount)
            .ok_or(RaffleError::AmountOverflow)
    }

    pub fn from_ether(value: &str) -> Result<Amount> {
        Self::parse_units(value, ETHER_DECIMALS)
    }

    /// Render in whole units, trimming trailing zeros of the fraction.
    pub fn format_units(self, decimals: u32) -> String {
        // past 38 decimals every u128 is below one whole unit
        let (whole, frac) = match 10u128.checked_pow(decimals) {
            Some(scale) => (self.0 / scale, self.0 % scale),
            None => (0, self.0),
        };
        if frac == 0 {
            return whole.to_string();
        }
        let frac = format!("{:0>width$}", frac, width = decimals as usize);
        format!("{}.{}", whole, frac.trim_end_matches('0'))
    }
}

impl fmt::Display for Amount {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// 20-byte account reference, `0x`-prefixed lowercase hex.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct AccountId(String);

impl AccountId {
    pub fn random() -> Self {
        let mut bytes = [0u8; 20];
        rand::thread_rng().fill_bytes(&mut bytes);
        Self(format!("0x{}", hex::encode(bytes)))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl FromStr for AccountId {
    type Err = RaffleError;

    fn from_str(s: &str) -> Result<Self> {
        let hex_part = s
            .strip_prefix("0x")
            .or_else(|| s.strip_prefix("0X"))
            .ok_or_else(|| RaffleError::InvalidAddress(format!("{} is missing 0x prefix", s)))?;

        let bytes = hex::decode(hex_part)
            .map_err(|e| RaffleError::InvalidAddress(format!("{}: {}", s, e)))?;
        if bytes.len() != 20 {
            return Err(RaffleError::InvalidAddress(format!(
                "{}: expected 20 bytes, got {}",
                s,
                bytes.len()
            )));
        }

        Ok(Self(format!("0x{}", hex::encode(bytes))))
    }
}

impl TryFrom<String> for AccountId {
    type Error = RaffleError;

    fn try_from(value: String) -> Result<Self> {
        value.parse()
    }
}

impl From<AccountId> for String {
    fn from(id: AccountId) -> Self {
        id.0
    }
}

impl fmt::Display for AccountId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Identifier a randomness provider hands out for each request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RequestId(pub u64);

impl fmt::Display for RequestId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// A 256-bit random word, big-endian.
#[derive(Clone, Copy, PartialEq, Eq, Hash)]
pub struct RandomValue([u8; 32]);

impl RandomValue {
    pub const fn from_bytes(bytes: [u8; 32]) -> Self {
        Self(bytes)
    }

    pub fn from_u128(value: u128) -> Self {
        let mut bytes = [0u8; 32];
        bytes[16..].copy_from_slice(&value.to_be_bytes());
        Self(bytes)
    }

    pub fn from_u64(value: u64) -> Self {
        Self::from_u128(value as u128)
    }

    pub fn as_bytes(&self) -> &[u8; 32] {
        &self.0
    }

    /// Remainder of the full 256-bit value divided by `modulus`.
    pub fn modulo(&self, modulus: u64) -> u64 {
        debug_assert!(modulus > 0);
        let m = modulus as u128;
        let rem = self
            .0
            .iter()
            .fold(0u128, |acc, &byte| ((acc << 8) | byte as u128) % m);
        rem as u64
    }

    pub fn to_hex(&self) -> String {
        format!("0x{}", hex::encode(self.0))
    }
}

impl FromStr for RandomValue {
    type Err = RaffleError;

    fn from_str(s: &str) -> Result<Self> {
        if let Some(hex_part) = s.strip_prefix("0x") {
            let bytes = hex::decode(hex_part)
                .map_err(|e| RaffleError::internal(format!("Invalid random value {}: {}", s, e)))?;
            if bytes.len() > 32 {
                return Err(RaffleError::internal(format!(
                    "Random value {} exceeds 256 bits",
                    s
                )));
            }
            let mut out = [0u8; 32];
            out[32 - bytes.len()..].copy_from_slice(&bytes);
            Ok(Self(out))
        } else {
            let value: u128 = s
                .parse()
                .map_err(|_| RaffleError::internal(format!("Invalid random value: {}", s)))?;
            Ok(Self::from_u128(value))
        }
    }
}

impl fmt::Debug for RandomValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "RandomValue({})", self.to_hex())
    }
}

impl fmt::Display for RandomValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_hex())
    }
}

impl Serialize for RandomValue {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.to_hex())
    }
}

impl<'de> Deserialize<'de> for RandomValue {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> std::result::Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        s.parse().map_err(serde::de::Error::custom)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum RaffleState {
    Open,
    Drawing,
    Closed,
}

impl fmt::Display for RaffleState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            RaffleState::Open => "OPEN",
            RaffleState::Drawing => "DRAWING",
            RaffleState::Closed => "CLOSED",
        };
        f.write_str(s)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Entrant {
    pub account: AccountId,
    pub amount: Amount,
}

/// The single outstanding randomness request, with the round snapshot it settles.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PendingRequest {
    pub request_id: RequestId,
    pub requested_at: DateTime<Utc>,
    pub entrant_count: u64,
    pub prize_pool: Amount,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RoundResult {
    pub round: u64,
    pub request_id: RequestId,
    pub winner: AccountId,
    pub winner_index: u64,
    pub prize: Amount,
    pub random_value: RandomValue,
    pub entrant_count: u64,
    pub settled_at: DateTime<Utc>,
}

/// Notifications for external indexers.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind")]
pub enum RaffleEvent {
    Entered { account: AccountId, amount: Amount },
    WinnerRequested { request_id: RequestId },
    WinnerPicked { round: u64, winner: AccountId, prize: Amount },
    Closed,
}

impl RaffleEvent {
    pub fn kind(&self) -> &'static str {
        match self {
            RaffleEvent::Entered { .. } => "Entered",
            RaffleEvent::WinnerRequested { .. } => "WinnerRequested",
            RaffleEvent::WinnerPicked { .. } => "WinnerPicked",
            RaffleEvent::Closed => "Closed",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_ether_amounts() {
        assert_eq!(
            Amount::from_ether("0.01").unwrap(),
            Amount::from_base_units(10_000_000_000_000_000)
        );
        assert_eq!(
            Amount::from_ether("2").unwrap(),
            Amount::from_base_units(2_000_000_000_000_000_000)
        );
        assert_eq!(Amount::parse_units("1.5", 2).unwrap(), Amount::from_base_units(150));
        assert!(Amount::from_ether("abc").is_err());
        assert!(Amount::from_ether("").is_err());
        assert!(Amount::parse_units("0.001", 2).is_err());
    }

    #[test]
    fn test_format_units() {
        let amount = Amount::from_ether("0.25").unwrap();
        assert_eq!(amount.format_units(ETHER_DECIMALS), "0.25");
        assert_eq!(Amount::from_base_units(3).format_units(0), "3");
    }

    #[test]
    fn test_wide_decimals_do_not_panic() {
        let tiny = Amount::from_base_units(5);
        assert_eq!(tiny.format_units(40), format!("0.{}5", "0".repeat(39)));
        assert_eq!(Amount::ZERO.format_units(40), "0");
        assert!(matches!(
            Amount::parse_units("1", 40),
            Err(RaffleError::AmountOverflow)
        ));
    }

    #[test]
    fn test_amount_overflow() {
        let max = Amount::from_base_units(u128::MAX);
        assert!(matches!(
            max.checked_add(Amount::from_base_units(1)),
            Err(RaffleError::AmountOverflow)
        ));
    }

    #[test]
    fn test_account_id_normalises_case() {
        let id: AccountId = "0xABCDEF0000000000000000000000000000000001".parse().unwrap();
        assert_eq!(id.as_str(), "0xabcdef0000000000000000000000000000000001");

        assert!("abcdef0000000000000000000000000000000001".parse::<AccountId>().is_err());
        assert!("0x1234".parse::<AccountId>().is_err());
        assert!("0xzz".parse::<AccountId>().is_err());
    }

    #[test]
    fn test_random_value_modulo_covers_full_width() {
        assert_eq!(RandomValue::from_u64(7).modulo(3), 1);

        // 2^255 mod 7 == 2^(255 mod 3) mod 7 == 2^0 == 1
        let mut bytes = [0u8; 32];
        bytes[0] = 0x80;
        assert_eq!(RandomValue::from_bytes(bytes).modulo(7), 1);
    }

    #[test]
    fn test_random_value_parse() {
        let v: RandomValue = "7".parse().unwrap();
        assert_eq!(v, RandomValue::from_u64(7));

        let h: RandomValue = "0x07".parse().unwrap();
        assert_eq!(h, v);

        let json = serde_json::to_string(&v).unwrap();
        let back: RandomValue = serde_json::from_str(&json).unwrap();
        assert_eq!(back, v);
    }
}
