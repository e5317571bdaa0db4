use chrono::{DateTime, FixedOffset, NaiveDate, Utc};
use uuid::Uuid;

use crate::error::TextDecodeError;

/// Populates a value from its textual representation.
///
/// A type opts into text binding by implementing this trait and returning
/// [`TypeInfo::text`](crate::TypeInfo::text) from its [`Reflect`](crate::Reflect) implementation,
/// which [`reflect_text!`](crate::reflect_text) does in one line:
///
/// ```
/// use micro_bind::{TextDecode, TextDecodeError, reflect_text};
///
/// #[derive(Debug, Default, PartialEq)]
/// struct Level(u8);
///
/// impl TextDecode for Level {
///     fn decode_text(&mut self, text: &[u8]) -> Result<(), TextDecodeError> {
///         self.0 = match text {
///             b"low" => 1,
///             b"high" => 9,
///             _ => return Err(TextDecodeError::new("unknown level")),
///         };
///         Ok(())
///     }
/// }
///
/// reflect_text!(Level);
/// ```
pub trait TextDecode {
    fn decode_text(&mut self, text: &[u8]) -> Result<(), TextDecodeError>;
}

fn utf8(text: &[u8]) -> Result<&str, TextDecodeError> {
    std::str::from_utf8(text).map_err(TextDecodeError::new)
}

impl TextDecode for Uuid {
    fn decode_text(&mut self, text: &[u8]) -> Result<(), TextDecodeError> {
        *self = Uuid::parse_str(utf8(text)?).map_err(TextDecodeError::new)?;
        Ok(())
    }
}

impl TextDecode for DateTime<FixedOffset> {
    fn decode_text(&mut self, text: &[u8]) -> Result<(), TextDecodeError> {
        *self = DateTime::parse_from_rfc3339(utf8(text)?).map_err(TextDecodeError::new)?;
        Ok(())
    }
}

impl TextDecode for DateTime<Utc> {
    fn decode_text(&mut self, text: &[u8]) -> Result<(), TextDecodeError> {
        let parsed = DateTime::parse_from_rfc3339(utf8(text)?).map_err(TextDecodeError::new)?;
        *self = parsed.with_timezone(&Utc);
        Ok(())
    }
}

impl TextDecode for NaiveDate {
    fn decode_text(&mut self, text: &[u8]) -> Result<(), TextDecodeError> {
        *self = utf8(text)?.parse().map_err(TextDecodeError::new)?;
        Ok(())
    }
}

/// Implements [`Reflect`](crate::Reflect) for types that implement [`TextDecode`] and `Default`.
#[macro_export]
macro_rules! reflect_text {
    ($($ty:ty),+ $(,)?) => {
        $(
            impl $crate::Reflect for $ty {
                fn type_info() -> $crate::TypeInfo {
                    $crate::TypeInfo::text::<Self>()
                }
            }
        )+
    };
}

reflect_text!(Uuid, DateTime<Utc>, DateTime<FixedOffset>, NaiveDate);

#[cfg(test)]
mod tests {
    use super::*;
    use crate::Reflect;

    #[test]
    fn uuid_from_text() {
        let mut id = Uuid::nil();
        id.decode_text(b"67e55044-10b1-426f-9247-bb680e5fe0c8").unwrap();
        assert_eq!(id.to_string(), "67e55044-10b1-426f-9247-bb680e5fe0c8");

        assert!(id.decode_text(b"not-a-uuid").is_err());
        assert!(id.decode_text(&[0xff, 0xfe]).is_err());
    }

    #[test]
    fn timestamps_from_rfc3339() {
        let mut at = DateTime::<Utc>::default();
        at.decode_text(b"2024-05-01T10:00:00+02:00").unwrap();
        assert_eq!(at.to_rfc3339(), "2024-05-01T08:00:00+00:00");

        let mut local = DateTime::<FixedOffset>::default();
        local.decode_text(b"2024-05-01T10:00:00+02:00").unwrap();
        assert_eq!(local.offset().local_minus_utc(), 2 * 3600);

        assert!(at.decode_text(b"yesterday").is_err());
    }

    #[test]
    fn date_from_text() {
        let mut day = NaiveDate::default();
        day.decode_text(b"2023-12-31").unwrap();
        assert_eq!(day, NaiveDate::from_ymd_opt(2023, 12, 31).unwrap());
    }

    #[test]
    fn text_types_carry_a_hook() {
        assert!(Uuid::type_info().text_hook().is_some());
        assert!(NaiveDate::type_info().text_hook().is_some());
        assert!(String::type_info().text_hook().is_none());
    }
}
