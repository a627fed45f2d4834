//! Conversions between display amounts, canonical base-unit integers and the
//! raw shapes contracts hand back.
//!
//! Every monetary value that leaves this module is a [`U256`] in base units.
//! `f64` is used only by [`to_display`].

use alloy::primitives::U256;
use serde_json::Value;

use crate::domain::PackInfo;
use crate::ports::WalletError;

const DISPLAY_FRACTION_DIGITS: usize = 6;

type Decoder = fn(&Value) -> Option<U256>;

/// Tried in order; the first recognised shape wins.
const CANONICAL_DECODERS: &[Decoder] = &[
    from_integer,
    from_integral_float,
    from_single_element,
    from_decimal_str,
    from_hex_str,
    from_hex_object,
];

pub fn to_canonical(raw: &Value) -> Result<U256, WalletError> {
    CANONICAL_DECODERS
        .iter()
        .find_map(|decode| decode(raw))
        .ok_or_else(|| WalletError::UnrepresentableValue(format!("cannot read {raw} as uint")))
}

fn from_integer(raw: &Value) -> Option<U256> {
    raw.as_u64().map(U256::from)
}

fn from_integral_float(raw: &Value) -> Option<U256> {
    let f = raw.as_f64()?;
    if !f.is_finite() || f < 0.0 || f.fract() != 0.0 {
        return None;
    }
    U256::from_str_radix(&format!("{f:.0}"), 10).ok()
}

fn from_single_element(raw: &Value) -> Option<U256> {
    match raw.as_array()?.as_slice() {
        [inner] => to_canonical(inner).ok(),
        _ => None,
    }
}

fn from_decimal_str(raw: &Value) -> Option<U256> {
    let s = raw.as_str()?.trim();
    if s.is_empty() || !s.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }
    U256::from_str_radix(s, 10).ok()
}

fn from_hex_str(raw: &Value) -> Option<U256> {
    parse_hex(raw.as_str()?)
}

fn from_hex_object(raw: &Value) -> Option<U256> {
    let obj = raw.as_object()?;
    let hex = obj.get("_hex").or_else(|| obj.get("hex"))?.as_str()?;
    parse_hex(hex)
}

fn parse_hex(s: &str) -> Option<U256> {
    let s = s.trim();
    let digits = s.strip_prefix("0x").or_else(|| s.strip_prefix("0X"))?;
    if digits.is_empty() {
        return None;
    }
    U256::from_str_radix(digits, 16).ok()
}

/// Renders base units as a decimal with at most six fraction digits.
///
/// The division happens in `f64`, so magnitudes past 2^53 base units lose
/// precision in the rendered string. This never fails.
pub fn to_display(base_units: U256, exponent: u8) -> String {
    let whole: f64 = base_units.to_string().parse().unwrap_or(f64::MAX);
    let scaled = whole / 10f64.powi(i32::from(exponent));
    let rendered = format!("{:.*}", DISPLAY_FRACTION_DIGITS, scaled);
    let trimmed = rendered.trim_end_matches('0').trim_end_matches('.');
    if trimmed.is_empty() {
        "0".to_owned()
    } else {
        trimmed.to_owned()
    }
}

/// Parses a human decimal into base units, truncating toward zero past
/// `exponent` fraction digits.
pub fn to_base_units(display: &str, exponent: u8) -> Result<U256, WalletError> {
    let s = display.trim();
    if s.is_empty() {
        return Err(WalletError::InvalidAmount("amount is empty".to_owned()));
    }
    if s.starts_with('-') {
        return Err(WalletError::InvalidAmount(format!(
            "amount must not be negative: {s}"
        )));
    }
    let s = s.strip_prefix('+').unwrap_or(s);
    let (int_part, frac_part) = s.split_once('.').unwrap_or((s, ""));
    let all_digits = |part: &str| part.bytes().all(|b| b.is_ascii_digit());
    if (int_part.is_empty() && frac_part.is_empty()) || !all_digits(int_part) || !all_digits(frac_part)
    {
        return Err(WalletError::InvalidAmount(format!("not a decimal number: {s}")));
    }

    let exponent = usize::from(exponent);
    let mut digits = String::with_capacity(int_part.len() + exponent);
    digits.push_str(if int_part.is_empty() { "0" } else { int_part });
    digits.extend(frac_part.chars().take(exponent));
    for _ in frac_part.len().min(exponent)..exponent {
        digits.push('0');
    }
    U256::from_str_radix(&digits, 10)
        .map_err(|e| WalletError::InvalidAmount(format!("amount out of range: {e}")))
}

pub fn to_bool(raw: &Value) -> Result<bool, WalletError> {
    match raw {
        Value::Bool(b) => Ok(*b),
        Value::Number(n) if n.as_u64() == Some(0) => Ok(false),
        Value::Number(n) if n.as_u64() == Some(1) => Ok(true),
        Value::String(s) => match s.trim() {
            "true" | "1" => Ok(true),
            "false" | "0" => Ok(false),
            other => Err(WalletError::UnrepresentableValue(format!(
                "cannot read '{other}' as bool"
            ))),
        },
        Value::Array(items) if items.len() == 1 => to_bool(&items[0]),
        other => Err(WalletError::UnrepresentableValue(format!(
            "cannot read {other} as bool"
        ))),
    }
}

type FieldStrategy = for<'a> fn(&'a Value, &str, usize) -> Option<&'a Value>;

/// Name first, then position, so struct-shaped and tuple-shaped outputs
/// read the same.
const FIELD_STRATEGIES: &[FieldStrategy] = &[field_by_name, field_by_index, field_by_index_key];

pub fn field<'a>(raw: &'a Value, name: &str, index: usize) -> Option<&'a Value> {
    let raw = unwrap_single_record(raw);
    FIELD_STRATEGIES
        .iter()
        .find_map(|strategy| strategy(raw, name, index).filter(|v| !v.is_null()))
}

fn field_by_name<'a>(raw: &'a Value, name: &str, _index: usize) -> Option<&'a Value> {
    raw.as_object()?.get(name)
}

fn field_by_index<'a>(raw: &'a Value, _name: &str, index: usize) -> Option<&'a Value> {
    raw.as_array()?.get(index)
}

fn field_by_index_key<'a>(raw: &'a Value, _name: &str, index: usize) -> Option<&'a Value> {
    raw.as_object()?.get(&index.to_string())
}

/// A function returning one struct decodes as a one-element list.
fn unwrap_single_record(raw: &Value) -> &Value {
    match raw.as_array().map(Vec::as_slice) {
        Some([inner]) if inner.is_array() || inner.is_object() => inner,
        _ => raw,
    }
}

impl PackInfo {
    pub fn decode(pack_id: u64, raw: &Value) -> Result<Self, WalletError> {
        let required = |name: &str, index: usize| {
            field(raw, name, index).ok_or_else(|| {
                WalletError::UnrepresentableValue(format!(
                    "pack {pack_id} response missing '{name}': {raw}"
                ))
            })
        };
        Ok(Self {
            pack_id,
            price_base_units: to_canonical(required("priceWei", 0)?)?,
            credit_cost: to_canonical(required("creditCost", 1)?)?,
            active: to_bool(required("active", 2)?)?,
        })
    }
}
