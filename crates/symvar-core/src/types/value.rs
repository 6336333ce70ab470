//! Dynamically typed variable values.

use std::fmt;
use std::str::FromStr;

/// A value read from, or written to, a primitive variable
///
/// The variant returned by `read()` follows the variable's base type:
///
/// | DWARF encoding                       | variant        |
/// |--------------------------------------|----------------|
/// | `DW_ATE_boolean`                     | `Bool`         |
/// | `DW_ATE_float`                       | `Float`        |
/// | `DW_ATE_signed*`, `DW_ATE_unsigned*` | `Int`          |
///
/// `i64` holds every supported integer width (up to `uint32`) without loss.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Value
{
    /// C/C++ `bool`
    Bool(bool),
    /// Any integer type, signed or unsigned
    Int(i64),
    /// IEEE-754 single precision (`float`, and `double` on AVR)
    Float(f32),
}

impl Value
{
    /// Short name of the variant, used in diagnostics
    pub const fn kind_name(&self) -> &'static str
    {
        match self {
            Value::Bool(_) => "bool",
            Value::Int(_) => "integer",
            Value::Float(_) => "float",
        }
    }
}

impl fmt::Display for Value
{
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result
    {
        match self {
            Value::Bool(value) => write!(f, "{value}"),
            Value::Int(value) => write!(f, "{value}"),
            Value::Float(value) => write!(f, "{value}"),
        }
    }
}

impl From<bool> for Value
{
    fn from(value: bool) -> Self
    {
        Value::Bool(value)
    }
}

impl From<f32> for Value
{
    fn from(value: f32) -> Self
    {
        Value::Float(value)
    }
}

macro_rules! int_into_value {
    ($($ty:ty),*) => {
        $(
            impl From<$ty> for Value
            {
                fn from(value: $ty) -> Self
                {
                    Value::Int(i64::from(value))
                }
            }
        )*
    };
}

int_into_value!(i8, i16, i32, i64, u8, u16, u32);

/// Parse a value the way a user types it on the command line
///
/// - `true` / `false` → `Bool`
/// - decimal or `0x`-prefixed hex integers (optionally negative) → `Int`
/// - anything else that parses as `f32` → `Float`
impl FromStr for Value
{
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err>
    {
        let trimmed = s.trim();
        match trimmed.to_lowercase().as_str() {
            "true" => return Ok(Value::Bool(true)),
            "false" => return Ok(Value::Bool(false)),
            _ => {}
        }

        if let Ok(int) = trimmed.parse::<i64>() {
            return Ok(Value::Int(int));
        }
        let (negative, digits) = match trimmed.strip_prefix('-') {
            Some(rest) => (true, rest),
            None => (false, trimmed),
        };
        let parsed = match digits.strip_prefix("0x").or_else(|| digits.strip_prefix("0X")) {
            Some(hex) => i64::from_str_radix(hex, 16).ok(),
            None => digits.parse::<i64>().ok(),
        };
        if let Some(magnitude) = parsed {
            return Ok(Value::Int(if negative { -magnitude } else { magnitude }));
        }
        if is_integer_literal(digits) {
            return Err(format!("Integer out of range: {s}"));
        }

        trimmed
            .parse::<f32>()
            .map(Value::Float)
            .map_err(|_| format!("Cannot parse value: {s}. Use true/false, an integer, or a float"))
    }
}

/// Plain decimal digits, or `0x` followed by hex digits
fn is_integer_literal(digits: &str) -> bool
{
    match digits.strip_prefix("0x").or_else(|| digits.strip_prefix("0X")) {
        Some(hex) => !hex.is_empty() && hex.chars().all(|c| c.is_ascii_hexdigit()),
        None => !digits.is_empty() && digits.chars().all(|c| c.is_ascii_digit()),
    }
}
