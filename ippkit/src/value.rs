//!
//! IPP value
//!
use std::{collections::BTreeMap, convert::Infallible, fmt, str::FromStr};

use bytes::{Buf, BufMut, Bytes, BytesMut};
use chrono::{DateTime, FixedOffset, NaiveDate, TimeZone};
use enum_as_inner::EnumAsInner;
#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

use crate::{model::ValueTag, parser::IppParseError, FromPrimitive as _};

fn fixed_size(tag: ValueTag) -> Option<usize> {
    match tag {
        ValueTag::Integer | ValueTag::Enum => Some(4),
        ValueTag::Boolean => Some(1),
        ValueTag::RangeOfInteger => Some(8),
        ValueTag::Resolution => Some(9),
        ValueTag::DateTime => Some(11),
        ValueTag::Unsupported | ValueTag::Unknown | ValueTag::NoValue => Some(0),
        _ => None,
    }
}

fn put_string(buffer: &mut BytesMut, s: &str) {
    buffer.put_u16(s.len() as u16);
    buffer.put_slice(s.as_bytes());
}

fn get_string(tag: u8, data: &mut Bytes) -> Result<String, IppParseError> {
    if data.remaining() < 2 {
        return Err(IppParseError::InvalidValueLength { tag, len: data.len() });
    }
    let len = data.get_u16() as usize;
    if data.remaining() < len {
        return Err(IppParseError::InvalidValueLength { tag, len: data.len() });
    }
    let s = data.split_to(len);
    Ok(String::from_utf8_lossy(&s).into_owned())
}

/// IPP attribute values as defined in [RFC 8010](https://tools.ietf.org/html/rfc8010)
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[derive(Clone, Debug, PartialEq, EnumAsInner)]
pub enum IppValue {
    Integer(i32),
    Enum(i32),
    OctetString(String),
    TextWithoutLanguage(String),
    NameWithoutLanguage(String),
    TextWithLanguage {
        language: String,
        text: String,
    },
    NameWithLanguage {
        language: String,
        name: String,
    },
    Charset(String),
    NaturalLanguage(String),
    Uri(String),
    UriScheme(String),
    RangeOfInteger {
        min: i32,
        max: i32,
    },
    Boolean(bool),
    Keyword(String),
    Array(Vec<IppValue>),
    Collection(BTreeMap<String, IppValue>),
    MimeMediaType(String),
    DateTime {
        year: u16,
        month: u8,
        day: u8,
        hour: u8,
        minutes: u8,
        seconds: u8,
        deci_seconds: u8,
        utc_dir: char,
        utc_hours: u8,
        utc_mins: u8,
    },
    MemberAttrName(String),
    Resolution {
        cross_feed: i32,
        feed: i32,
        units: i8,
    },
    Unsupported,
    Unknown,
    NoValue,
    Other {
        tag: u8,
        data: Bytes,
    },
}

impl IppValue {
    /// Collapse one-element lists into the single value, also inside collections.
    /// Both forms have the same wire encoding, the decoder always yields the collapsed one.
    pub fn normalize(self) -> IppValue {
        match self {
            IppValue::Array(mut list) if list.len() == 1 => list.remove(0).normalize(),
            IppValue::Array(list) => IppValue::Array(list.into_iter().map(IppValue::normalize).collect()),
            IppValue::Collection(members) => {
                IppValue::Collection(members.into_iter().map(|(k, v)| (k, v.normalize())).collect())
            }
            other => other,
        }
    }

    /// Convert to binary tag
    pub fn to_tag(&self) -> u8 {
        match *self {
            IppValue::Integer(_) => ValueTag::Integer as u8,
            IppValue::Enum(_) => ValueTag::Enum as u8,
            IppValue::RangeOfInteger { .. } => ValueTag::RangeOfInteger as u8,
            IppValue::Boolean(_) => ValueTag::Boolean as u8,
            IppValue::Keyword(_) => ValueTag::Keyword as u8,
            IppValue::OctetString(_) => ValueTag::OctetStringUnspecified as u8,
            IppValue::TextWithoutLanguage(_) => ValueTag::TextWithoutLanguage as u8,
            IppValue::NameWithoutLanguage(_) => ValueTag::NameWithoutLanguage as u8,
            IppValue::TextWithLanguage { .. } => ValueTag::TextWithLanguage as u8,
            IppValue::NameWithLanguage { .. } => ValueTag::NameWithLanguage as u8,
            IppValue::Charset(_) => ValueTag::Charset as u8,
            IppValue::NaturalLanguage(_) => ValueTag::NaturalLanguage as u8,
            IppValue::Uri(_) => ValueTag::Uri as u8,
            IppValue::UriScheme(_) => ValueTag::UriScheme as u8,
            IppValue::MimeMediaType(_) => ValueTag::MimeMediaType as u8,
            IppValue::Array(ref array) => array.first().map(|v| v.to_tag()).unwrap_or(ValueTag::Unknown as u8),
            IppValue::Collection(_) => ValueTag::BegCollection as u8,
            IppValue::DateTime { .. } => ValueTag::DateTime as u8,
            IppValue::MemberAttrName(_) => ValueTag::MemberAttrName as u8,
            IppValue::Resolution { .. } => ValueTag::Resolution as u8,
            IppValue::Unsupported => ValueTag::Unsupported as u8,
            IppValue::Unknown => ValueTag::Unknown as u8,
            IppValue::NoValue => ValueTag::NoValue as u8,
            IppValue::Other { tag, .. } => tag,
        }
    }

    /// Parse value from byte array which does not include the value length field.
    ///
    /// Unknown tags and collection delimiters are returned as `IppValue::Other`.
    pub fn parse(value_tag: u8, mut data: Bytes) -> Result<IppValue, IppParseError> {
        let ipp_tag = match ValueTag::from_u8(value_tag) {
            Some(x) => x,
            None => {
                return Ok(IppValue::Other { tag: value_tag, data });
            }
        };

        if let Some(size) = fixed_size(ipp_tag) {
            if data.len() != size {
                return Err(IppParseError::InvalidValueLength {
                    tag: value_tag,
                    len: data.len(),
                });
            }
        }

        let value = match ipp_tag {
            ValueTag::Integer => IppValue::Integer(data.get_i32()),
            ValueTag::Enum => IppValue::Enum(data.get_i32()),
            ValueTag::OctetStringUnspecified => IppValue::OctetString(String::from_utf8_lossy(&data).into_owned()),
            ValueTag::TextWithoutLanguage => IppValue::TextWithoutLanguage(String::from_utf8_lossy(&data).into_owned()),
            ValueTag::NameWithoutLanguage => IppValue::NameWithoutLanguage(String::from_utf8_lossy(&data).into_owned()),
            ValueTag::TextWithLanguage => IppValue::TextWithLanguage {
                language: get_string(value_tag, &mut data)?,
                text: get_string(value_tag, &mut data)?,
            },
            ValueTag::NameWithLanguage => IppValue::NameWithLanguage {
                language: get_string(value_tag, &mut data)?,
                name: get_string(value_tag, &mut data)?,
            },
            ValueTag::Charset => IppValue::Charset(String::from_utf8_lossy(&data).into_owned()),
            ValueTag::NaturalLanguage => IppValue::NaturalLanguage(String::from_utf8_lossy(&data).into_owned()),
            ValueTag::Uri => IppValue::Uri(String::from_utf8_lossy(&data).into_owned()),
            ValueTag::UriScheme => IppValue::UriScheme(String::from_utf8_lossy(&data).into_owned()),
            ValueTag::RangeOfInteger => IppValue::RangeOfInteger {
                min: data.get_i32(),
                max: data.get_i32(),
            },
            ValueTag::Boolean => IppValue::Boolean(data.get_u8() != 0),
            ValueTag::Keyword => IppValue::Keyword(String::from_utf8_lossy(&data).into_owned()),
            ValueTag::MimeMediaType => IppValue::MimeMediaType(String::from_utf8_lossy(&data).into_owned()),
            ValueTag::DateTime => IppValue::DateTime {
                year: data.get_u16(),
                month: data.get_u8(),
                day: data.get_u8(),
                hour: data.get_u8(),
                minutes: data.get_u8(),
                seconds: data.get_u8(),
                deci_seconds: data.get_u8(),
                utc_dir: data.get_u8() as char,
                utc_hours: data.get_u8(),
                utc_mins: data.get_u8(),
            },
            ValueTag::MemberAttrName => IppValue::MemberAttrName(String::from_utf8_lossy(&data).into_owned()),
            ValueTag::Resolution => IppValue::Resolution {
                cross_feed: data.get_i32(),
                feed: data.get_i32(),
                units: data.get_i8(),
            },
            ValueTag::Unsupported => IppValue::Unsupported,
            ValueTag::Unknown => IppValue::Unknown,
            ValueTag::NoValue => IppValue::NoValue,
            ValueTag::BegCollection | ValueTag::EndCollection => IppValue::Other { tag: value_tag, data },
        };
        Ok(value)
    }

    /// Write value to byte array, including leading value length field, excluding value tag
    pub fn to_bytes(&self) -> Bytes {
        let mut buffer = BytesMut::new();

        match *self {
            IppValue::Integer(i) | IppValue::Enum(i) => {
                buffer.put_u16(4);
                buffer.put_i32(i);
            }
            IppValue::RangeOfInteger { min, max } => {
                buffer.put_u16(8);
                buffer.put_i32(min);
                buffer.put_i32(max);
            }
            IppValue::Boolean(b) => {
                buffer.put_u16(1);
                buffer.put_u8(b as u8);
            }
            IppValue::Keyword(ref s)
            | IppValue::OctetString(ref s)
            | IppValue::TextWithoutLanguage(ref s)
            | IppValue::NameWithoutLanguage(ref s)
            | IppValue::Charset(ref s)
            | IppValue::NaturalLanguage(ref s)
            | IppValue::Uri(ref s)
            | IppValue::UriScheme(ref s)
            | IppValue::MimeMediaType(ref s)
            | IppValue::MemberAttrName(ref s) => put_string(&mut buffer, s),
            IppValue::TextWithLanguage {
                ref language,
                text: ref s,
            }
            | IppValue::NameWithLanguage {
                ref language,
                name: ref s,
            } => {
                buffer.put_u16((4 + language.len() + s.len()) as u16);
                put_string(&mut buffer, language);
                put_string(&mut buffer, s);
            }
            IppValue::Array(ref list) => {
                for (i, item) in list.iter().enumerate() {
                    if i > 0 {
                        // additional value: own tag, empty name
                        buffer.put_u8(item.to_tag());
                        buffer.put_u16(0);
                    }
                    buffer.put(item.to_bytes());
                }
            }
            IppValue::Collection(ref members) => {
                // begin collection: value size is 0
                buffer.put_u16(0);

                for (name, value) in members {
                    buffer.put_u8(ValueTag::MemberAttrName as u8);
                    buffer.put_u16(0);
                    put_string(&mut buffer, name);

                    buffer.put_u8(value.to_tag());
                    buffer.put_u16(0);
                    buffer.put(value.to_bytes());
                }
                // end collection: empty name and value
                buffer.put_u8(ValueTag::EndCollection as u8);
                buffer.put_u32(0);
            }
            IppValue::DateTime {
                year,
                month,
                day,
                hour,
                minutes,
                seconds,
                deci_seconds,
                utc_dir,
                utc_hours,
                utc_mins,
            } => {
                buffer.put_u16(11);
                buffer.put_u16(year);
                buffer.put_u8(month);
                buffer.put_u8(day);
                buffer.put_u8(hour);
                buffer.put_u8(minutes);
                buffer.put_u8(seconds);
                buffer.put_u8(deci_seconds);
                buffer.put_u8(utc_dir as u8);
                buffer.put_u8(utc_hours);
                buffer.put_u8(utc_mins);
            }
            IppValue::Resolution {
                cross_feed,
                feed,
                units,
            } => {
                buffer.put_u16(9);
                buffer.put_i32(cross_feed);
                buffer.put_i32(feed);
                buffer.put_i8(units);
            }
            IppValue::Unsupported | IppValue::Unknown | IppValue::NoValue => buffer.put_u16(0),
            IppValue::Other { ref data, .. } => {
                buffer.put_u16(data.len() as u16);
                buffer.put_slice(data);
            }
        }
        buffer.freeze()
    }

    /// Return the longest single value length in bytes, used to reject values which don't fit the u16 length field
    pub(crate) fn max_value_len(&self) -> usize {
        match self {
            IppValue::Array(list) => list.iter().map(IppValue::max_value_len).max().unwrap_or(0),
            IppValue::Collection(members) => members
                .iter()
                .map(|(k, v)| k.len().max(v.max_value_len()))
                .max()
                .unwrap_or(0),
            IppValue::TextWithLanguage { language, text: s } | IppValue::NameWithLanguage { language, name: s } => {
                4 + language.len() + s.len()
            }
            IppValue::Other { data, .. } => data.len(),
            other => other.as_str().map(str::len).unwrap_or(0),
        }
    }

    /// Return string content of any textual value
    pub fn as_str(&self) -> Option<&str> {
        match self {
            IppValue::Keyword(s)
            | IppValue::OctetString(s)
            | IppValue::TextWithoutLanguage(s)
            | IppValue::NameWithoutLanguage(s)
            | IppValue::Charset(s)
            | IppValue::NaturalLanguage(s)
            | IppValue::Uri(s)
            | IppValue::UriScheme(s)
            | IppValue::MimeMediaType(s)
            | IppValue::MemberAttrName(s) => Some(s),
            IppValue::TextWithLanguage { text, .. } => Some(text),
            IppValue::NameWithLanguage { name, .. } => Some(name),
            _ => None,
        }
    }

    /// Whether this is an out-of-band value (unsupported, unknown or no-value)
    pub fn is_out_of_band(&self) -> bool {
        matches!(self, IppValue::Unsupported | IppValue::Unknown | IppValue::NoValue)
    }

    /// Convert a dateTime value into a timestamp with offset
    pub fn to_date_time(&self) -> Option<DateTime<FixedOffset>> {
        match *self {
            IppValue::DateTime {
                year,
                month,
                day,
                hour,
                minutes,
                seconds,
                deci_seconds,
                utc_dir,
                utc_hours,
                utc_mins,
            } => {
                let offset_secs = (utc_hours as i32 * 3600) + (utc_mins as i32 * 60);
                let offset = match utc_dir {
                    '-' => FixedOffset::west_opt(offset_secs)?,
                    _ => FixedOffset::east_opt(offset_secs)?,
                };
                let naive = NaiveDate::from_ymd_opt(year as i32, month as u32, day as u32)?.and_hms_milli_opt(
                    hour as u32,
                    minutes as u32,
                    seconds as u32,
                    deci_seconds as u32 * 100,
                )?;
                offset.from_local_datetime(&naive).single()
            }
            _ => None,
        }
    }
}

/// Implement Display trait to print the value
impl fmt::Display for IppValue {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match *self {
            IppValue::Integer(i) | IppValue::Enum(i) => write!(f, "{i}"),
            IppValue::RangeOfInteger { min, max } => write!(f, "{min}-{max}"),
            IppValue::Boolean(b) => write!(f, "{}", if b { "true" } else { "false" }),
            IppValue::Array(ref array) => {
                let s: Vec<String> = array.iter().map(|v| v.to_string()).collect();
                write!(f, "[{}]", s.join(", "))
            }
            IppValue::Collection(ref coll) => {
                let s: Vec<String> = coll.iter().map(|(k, v)| format!("{k}={v}")).collect();
                write!(f, "<{}>", s.join(", "))
            }
            IppValue::DateTime {
                year,
                month,
                day,
                hour,
                minutes,
                seconds,
                deci_seconds,
                utc_dir,
                utc_hours,
                utc_mins,
            } => write!(
                f,
                "{year:04}-{month:02}-{day:02}T{hour:02}:{minutes:02}:{seconds:02}.{deci_seconds}{utc_dir}{utc_hours:02}:{utc_mins:02}"
            ),
            IppValue::Resolution {
                cross_feed,
                feed,
                units,
            } => {
                write!(f, "{}x{}{}", cross_feed, feed, if units == 3 { "dpi" } else { "dpcm" })
            }
            IppValue::Unsupported => write!(f, "unsupported"),
            IppValue::Unknown => write!(f, "unknown"),
            IppValue::NoValue => Ok(()),
            IppValue::Other { tag, ref data } => write!(f, "{tag:0x}: {data:?}"),
            ref other => f.write_str(other.as_str().unwrap_or_default()),
        }
    }
}

impl FromStr for IppValue {
    type Err = Infallible;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let value = match s {
            "true" => IppValue::Boolean(true),
            "false" => IppValue::Boolean(false),
            other => {
                if let Ok(iv) = other.parse::<i32>() {
                    IppValue::Integer(iv)
                } else if let Some((Ok(min), Ok(max))) = other
                    .split_once('-')
                    .map(|(min, max)| (min.parse::<i32>(), max.parse::<i32>()))
                {
                    IppValue::RangeOfInteger { min, max }
                } else {
                    IppValue::Keyword(other.to_owned())
                }
            }
        };
        Ok(value)
    }
}

impl<'a> IntoIterator for &'a IppValue {
    type Item = &'a IppValue;
    type IntoIter = IppValueIterator<'a>;

    fn into_iter(self) -> Self::IntoIter {
        IppValueIterator { value: self, index: 0 }
    }
}

/// Iterator over a single value or array elements
pub struct IppValueIterator<'a> {
    value: &'a IppValue,
    index: usize,
}

impl<'a> Iterator for IppValueIterator<'a> {
    type Item = &'a IppValue;

    fn next(&mut self) -> Option<Self::Item> {
        match self.value {
            IppValue::Array(ref array) => {
                let item = array.get(self.index);
                self.index += 1;
                item
            }
            _ => {
                if self.index == 0 {
                    self.index += 1;
                    Some(self.value)
                } else {
                    None
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use std::io;

    use crate::attribute::IppAttribute;
    use crate::model::DelimiterTag;
    use crate::parser::IppParser;
    use crate::reader::IppReader;

    use super::*;

    fn value_check(value: IppValue) {
        let mut b = value.to_bytes();
        b.advance(2); // skip value size
        assert_eq!(IppValue::parse(value.to_tag(), b).unwrap(), value);
    }

    #[test]
    fn test_value_single() {
        value_check(IppValue::Integer(-1234));
        value_check(IppValue::Enum(4321));
        value_check(IppValue::OctetString("octet-string".to_owned()));
        value_check(IppValue::TextWithoutLanguage("text-without".to_owned()));
        value_check(IppValue::NameWithoutLanguage("name-without".to_owned()));
        value_check(IppValue::TextWithLanguage {
            language: "de".to_owned(),
            text: "Drucker".to_owned(),
        });
        value_check(IppValue::NameWithLanguage {
            language: "es".to_owned(),
            name: "Mi Trabajo".to_owned(),
        });
        value_check(IppValue::RangeOfInteger { min: -12, max: 45 });
        value_check(IppValue::Boolean(false));
        value_check(IppValue::DateTime {
            year: 2020,
            month: 2,
            day: 13,
            hour: 12,
            minutes: 34,
            seconds: 22,
            deci_seconds: 1,
            utc_dir: '+',
            utc_hours: 1,
            utc_mins: 30,
        });
        value_check(IppValue::Resolution {
            cross_feed: 800,
            feed: 600,
            units: 3,
        });
        value_check(IppValue::NoValue);
        value_check(IppValue::Unknown);
        value_check(IppValue::Other {
            tag: 0x7b,
            data: "foo".into(),
        });
    }

    #[test]
    fn test_short_fixed_value_is_error() {
        let result = IppValue::parse(ValueTag::Integer as u8, Bytes::from_static(&[0, 1]));
        assert!(matches!(
            result,
            Err(IppParseError::InvalidValueLength { tag: 0x21, len: 2 })
        ));

        let result = IppValue::parse(ValueTag::TextWithLanguage as u8, Bytes::from_static(&[0, 5, b'e']));
        assert!(result.is_err());
    }

    #[test]
    fn test_date_time_conversion() {
        let value = IppValue::DateTime {
            year: 2024,
            month: 5,
            day: 17,
            hour: 9,
            minutes: 5,
            seconds: 30,
            deci_seconds: 5,
            utc_dir: '-',
            utc_hours: 3,
            utc_mins: 0,
        };
        let dt = value.to_date_time().unwrap();
        assert_eq!(dt.to_rfc3339(), "2024-05-17T09:05:30.500-03:00");
        assert_eq!(value.to_string(), "2024-05-17T09:05:30.5-03:00");
        assert!(IppValue::Integer(1).to_date_time().is_none());
    }

    #[test]
    fn test_from_str() {
        assert_eq!("2".parse::<IppValue>().unwrap(), IppValue::Integer(2));
        assert_eq!(
            "1-10".parse::<IppValue>().unwrap(),
            IppValue::RangeOfInteger { min: 1, max: 10 }
        );
        assert_eq!(
            "two-sided-long-edge".parse::<IppValue>().unwrap(),
            IppValue::Keyword("two-sided-long-edge".to_owned())
        );
    }

    #[test]
    fn test_value_iterator_multiple() {
        let list = vec![IppValue::Integer(1234), IppValue::Integer(5678)];
        let val = IppValue::Array(list.clone());

        assert_eq!(val.into_iter().cloned().collect::<Vec<_>>(), list);
        assert_eq!(IppValue::Integer(1).into_iter().count(), 1);
    }

    #[test]
    fn test_array() {
        let attr = IppAttribute::new(
            "list",
            IppValue::Array(vec![IppValue::Integer(0x1111_1111), IppValue::Integer(0x2222_2222)]),
        );
        let buf = attr.to_bytes().to_vec();

        assert_eq!(
            buf,
            vec![
                0x21, 0, 4, b'l', b'i', b's', b't', 0, 4, 0x11, 0x11, 0x11, 0x11, 0x21, 0, 0, 0, 4, 0x22, 0x22, 0x22,
                0x22
            ],
        );

        let mut data = vec![1, 1, 0, 0, 0, 0, 0, 0, 4];
        data.extend(buf);
        data.push(3);

        let res = IppParser::new(IppReader::new(io::Cursor::new(data))).parse().unwrap();
        let attr = res
            .attributes()
            .get(DelimiterTag::PrinterAttributes, "list")
            .unwrap();
        assert_eq!(
            attr.value().as_array(),
            Some(&vec![IppValue::Integer(0x1111_1111), IppValue::Integer(0x2222_2222)])
        );
    }

    #[test]
    fn test_nested_collection() {
        let media_size = BTreeMap::from([
            ("x-dimension".to_owned(), IppValue::Integer(21000)),
            ("y-dimension".to_owned(), IppValue::Integer(29700)),
        ]);
        let media_col = IppValue::Collection(BTreeMap::from([
            ("media-size".to_owned(), IppValue::Collection(media_size)),
            (
                "media-source".to_owned(),
                IppValue::Array(vec![
                    IppValue::Keyword("main".to_owned()),
                    IppValue::Keyword("manual".to_owned()),
                ]),
            ),
        ]));
        let attr = IppAttribute::new(IppAttribute::MEDIA_COL, media_col.clone());

        let mut data = vec![1, 1, 0, 0, 0, 0, 0, 0, 2];
        data.extend(attr.to_bytes());
        data.push(3);

        let res = IppParser::new(IppReader::new(io::Cursor::new(data))).parse().unwrap();
        let attr = res
            .attributes()
            .get(DelimiterTag::JobAttributes, IppAttribute::MEDIA_COL)
            .unwrap();
        assert_eq!(attr.value(), &media_col);
    }

    #[test]
    fn test_normalize_single_element_lists() {
        let value = IppValue::Array(vec![IppValue::Collection(BTreeMap::from([(
            "media-source".to_owned(),
            IppValue::Array(vec![IppValue::Keyword("main".to_owned())]),
        )]))]);
        assert_eq!(
            value.normalize(),
            IppValue::Collection(BTreeMap::from([(
                "media-source".to_owned(),
                IppValue::Keyword("main".to_owned())
            )]))
        );

        let list = IppValue::Array(vec![IppValue::Integer(1), IppValue::Integer(2)]);
        assert_eq!(list.clone().normalize(), list);
        assert_eq!(IppValue::Array(Vec::new()).normalize(), IppValue::Array(Vec::new()));
    }
}
