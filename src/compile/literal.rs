use super::{Error, Result};
use crate::ast::Value;

/// Escapes a value for use inside a single-quoted SQL string: backslashes
///  are doubled and single quotes get a backslash.
pub fn escape_string(s: &str) -> String {
    let mut res = String::with_capacity(s.len());
    for c in s.chars() {
        match c {
            '\\' => res.push_str(r"\\"),
            '\'' => res.push_str(r"\'"),
            c => res.push(c),
        }
    }
    res
}

fn quoted(s: &str, out: &mut String) {
    out.push('\'');
    out.push_str(&escape_string(s));
    out.push('\'');
}

/// Writes a scalar value as an SQL literal. Lists and lambdas have no
///  literal form.
pub(crate) fn write_literal(value: &Value, out: &mut String) -> Result<()> {
    match value {
        Value::Null => out.push_str("NULL"),
        Value::Bool(b) => out.push_str(if *b { "true" } else { "false" }),
        Value::Int(i) => out.push_str(&i.to_string()),
        Value::Float(f) if f.is_finite() => out.push_str(&f.to_string()),
        Value::Float(f) => return Err(Error::UnsupportedValue(f.to_string())),
        Value::Text(s) => quoted(s, out),
        Value::Date(d) => quoted(&d.to_string(), out),
        Value::Time(t) => quoted(&t.to_string(), out),
        Value::DateTime(dt) => quoted(&dt.to_string(), out),
        Value::List(_) | Value::Lambda(_) => {
            return Err(Error::UnsupportedValue(format!("{value:?}")));
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{NaiveDate, NaiveTime};

    fn lit(v: Value) -> String {
        let mut s = String::new();
        write_literal(&v, &mut s).unwrap();
        s
    }

    #[test]
    fn test_escape_string() {
        assert_eq!("foo", escape_string("foo"));
        assert_eq!(r"\'", escape_string("'"));
        assert_eq!(r"\\\'", escape_string(r"\'"));
        assert_eq!(r"O\'Brien", escape_string("O'Brien"));
    }

    #[test]
    fn scalars() {
        assert_eq!("NULL", lit(Value::Null));
        assert_eq!("true", lit(Value::Bool(true)));
        assert_eq!("-17", lit(Value::Int(-17)));
        assert_eq!("1.5", lit(Value::Float(1.5)));
        assert_eq!(r"'it\'s'", lit("it's".into()));
    }

    #[test]
    fn temporals() {
        let date = NaiveDate::from_ymd_opt(1990, 10, 5).unwrap();
        let time = NaiveTime::from_hms_opt(6, 24, 13).unwrap();
        assert_eq!("'1990-10-05'", lit(date.into()));
        assert_eq!("'06:24:13'", lit(time.into()));
        assert_eq!("'1990-10-05 06:24:13'", lit(date.and_time(time).into()));
    }

    #[test]
    fn no_literal_form() {
        let mut s = String::new();
        assert!(matches!(
            write_literal(&Value::List(vec![]), &mut s),
            Err(Error::UnsupportedValue(_))
        ));
        assert!(write_literal(&Value::Float(f64::NAN), &mut s).is_err());
        assert!(s.is_empty());
    }
}
