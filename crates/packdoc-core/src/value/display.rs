use crate::value::{Value, ValueType};
use std::fmt::{self, Write as _};

// JSON-like rendering. `undefined` and binary data have no JSON form and
// are written as `undefined` and `<hex>` respectively.
impl fmt::Display for Value<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.value_type() {
            ValueType::Null => f.write_str("null"),
            ValueType::Undefined => f.write_str("undefined"),
            ValueType::Boolean => write!(f, "{}", self.as_bool().unwrap_or_default()),
            ValueType::Number => write_number(f, *self),
            ValueType::String => write_quoted(f, self.as_str().unwrap_or_default()),
            ValueType::Data => {
                f.write_char('<')?;
                for byte in self.as_data().unwrap_or_default() {
                    write!(f, "{byte:02x}")?;
                }
                f.write_char('>')
            }
            ValueType::Array => {
                f.write_char('[')?;
                for (idx, child) in self.as_array().into_iter().flatten().enumerate() {
                    if idx > 0 {
                        f.write_char(',')?;
                    }
                    write!(f, "{child}")?;
                }
                f.write_char(']')
            }
            ValueType::Dict => {
                f.write_char('{')?;
                for (idx, (key, child)) in self.as_dict().into_iter().flatten().enumerate() {
                    if idx > 0 {
                        f.write_char(',')?;
                    }
                    write_quoted(f, key)?;
                    write!(f, ":{child}")?;
                }
                f.write_char('}')
            }
        }
    }
}

impl fmt::Debug for Value<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Value({}: {self})", self.tag().label())
    }
}

fn write_number(f: &mut fmt::Formatter<'_>, value: Value<'_>) -> fmt::Result {
    if let Some(n) = value.as_int() {
        return write!(f, "{n}");
    }
    if let Some(n) = value.as_unsigned() {
        return write!(f, "{n}");
    }
    if value.is_double() {
        return write!(f, "{}", value.as_double().unwrap_or_default());
    }

    write!(f, "{}", value.as_float().unwrap_or_default())
}

fn write_quoted(f: &mut fmt::Formatter<'_>, s: &str) -> fmt::Result {
    f.write_char('"')?;
    for ch in s.chars() {
        match ch {
            '"' => f.write_str("\\\"")?,
            '\\' => f.write_str("\\\\")?,
            '\n' => f.write_str("\\n")?,
            '\r' => f.write_str("\\r")?,
            '\t' => f.write_str("\\t")?,
            c if c.is_control() => write!(f, "\\u{:04x}", u32::from(c))?,
            c => f.write_char(c)?,
        }
    }
    f.write_char('"')
}
