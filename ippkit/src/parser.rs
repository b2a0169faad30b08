//!
//! IPP stream parser
//!
use std::{
    collections::BTreeMap,
    io::{self, Read},
};

use bytes::Bytes;
use log::{debug, error, trace};

#[cfg(feature = "async")]
use {crate::reader::AsyncIppReader, futures_util::io::AsyncRead};

use crate::{
    attribute::{IppAttribute, IppAttributeGroup, IppAttributes},
    model::{DelimiterTag, ValueTag},
    reader::IppReader,
    request::IppRequestResponse,
    value::IppValue,
    FromPrimitive as _, IppHeader,
};

/// Parse error enum
#[derive(Debug, thiserror::Error)]
pub enum IppParseError {
    #[error("Invalid tag: {0:#04x}")]
    InvalidTag(u8),

    #[error("Invalid IPP collection")]
    InvalidCollection,

    #[error("Invalid value length for tag {tag:#04x}: {len}")]
    InvalidValueLength { tag: u8, len: usize },

    #[error("Value with tag {0:#04x} has no attribute name")]
    MissingAttributeName(u8),

    #[error("Attribute found outside of an attribute group")]
    MissingGroup,

    #[error("Truncated IPP stream")]
    Truncated,

    #[error(transparent)]
    IoError(io::Error),
}

impl From<io::Error> for IppParseError {
    fn from(error: io::Error) -> Self {
        if error.kind() == io::ErrorKind::UnexpectedEof {
            IppParseError::Truncated
        } else {
            IppParseError::IoError(error)
        }
    }
}

// create a single value from one-element list, list otherwise
fn list_or_value(mut list: Vec<IppValue>) -> IppValue {
    if list.len() == 1 {
        list.remove(0)
    } else {
        IppValue::Array(list)
    }
}

// collection members are a flat sequence of memberAttrName followed by one or more values
fn collect_members(values: Vec<IppValue>) -> Result<BTreeMap<String, IppValue>, IppParseError> {
    let mut members: Vec<(String, Vec<IppValue>)> = Vec::new();

    for value in values {
        match value {
            IppValue::MemberAttrName(name) => members.push((name, Vec::new())),
            other => match members.last_mut() {
                Some((_, list)) => list.push(other),
                None => return Err(IppParseError::InvalidCollection),
            },
        }
    }

    let mut map = BTreeMap::new();
    for (name, list) in members {
        if list.is_empty() {
            return Err(IppParseError::InvalidCollection);
        }
        map.insert(name, list_or_value(list));
    }
    Ok(map)
}

enum Group {
    None,
    Known(IppAttributeGroup),
    // reserved delimiter, attributes are dropped
    Skipped,
}

struct ParserState {
    current_group: Group,
    last_name: Option<String>,
    context: Vec<Vec<IppValue>>,
    attributes: IppAttributes,
}

impl ParserState {
    fn new() -> Self {
        ParserState {
            current_group: Group::None,
            last_name: None,
            context: vec![vec![]],
            attributes: IppAttributes::new(),
        }
    }

    fn add_last_attribute(&mut self) -> Result<(), IppParseError> {
        if self.context.len() != 1 {
            error!("Unterminated collection");
            return Err(IppParseError::InvalidCollection);
        }
        let values = std::mem::take(&mut self.context[0]);

        if let Some(last_name) = self.last_name.take() {
            if let Group::Known(ref mut group) = self.current_group {
                let attr = IppAttribute::new(&last_name, list_or_value(values));
                group.attributes_mut().insert(last_name, attr);
            }
        }
        Ok(())
    }

    fn finish_group(&mut self) -> Result<(), IppParseError> {
        self.add_last_attribute()?;
        if let Group::Known(group) = std::mem::replace(&mut self.current_group, Group::None) {
            self.attributes.groups_mut().push(group);
        }
        Ok(())
    }

    // returns true when the end of attributes is reached
    fn parse_delimiter(&mut self, tag: u8) -> Result<bool, IppParseError> {
        trace!("Delimiter tag: {tag:#04x}");

        self.finish_group()?;

        match DelimiterTag::from_u8(tag) {
            Some(DelimiterTag::EndOfAttributes) => Ok(true),
            Some(delimiter) => {
                self.current_group = Group::Known(IppAttributeGroup::new(delimiter));
                Ok(false)
            }
            None => {
                debug!("Skipping attribute group with reserved delimiter {tag:#04x}");
                self.current_group = Group::Skipped;
                Ok(false)
            }
        }
    }

    fn parse_value(&mut self, tag: u8, name: String, value: Bytes) -> Result<(), IppParseError> {
        if let Group::None = self.current_group {
            return Err(IppParseError::MissingGroup);
        }

        let ipp_value = IppValue::parse(tag, value)?;

        trace!("Value tag: {tag:#04x}: {name}: {ipp_value}");

        if !name.is_empty() {
            // single attribute or begin of array
            self.add_last_attribute()?;
            // store it as a previous attribute
            self.last_name = Some(name);
        } else if self.last_name.is_none() {
            return Err(IppParseError::MissingAttributeName(tag));
        }

        if tag == ValueTag::BegCollection as u8 {
            // start new collection in the stack
            trace!("Begin collection");
            self.context.push(vec![]);
        } else if tag == ValueTag::EndCollection as u8 {
            // get collection from the stack and add it to the previous element
            trace!("End collection");
            match ipp_value {
                IppValue::Other { ref data, .. } if data.is_empty() => {}
                _ => {
                    error!("Invalid end collection attribute");
                    return Err(IppParseError::InvalidCollection);
                }
            }
            if self.context.len() < 2 {
                error!("End of collection without a beginning");
                return Err(IppParseError::InvalidCollection);
            }
            let members = self.context.pop().unwrap_or_default();
            let collection = IppValue::Collection(collect_members(members)?);
            if let Some(val_list) = self.context.last_mut() {
                val_list.push(collection);
            }
        } else if let Some(val_list) = self.context.last_mut() {
            // add attribute to the current collection
            val_list.push(ipp_value);
        }
        Ok(())
    }

    fn into_attributes(self) -> IppAttributes {
        self.attributes
    }
}

#[cfg(feature = "async")]
/// Asynchronous IPP parser
pub struct AsyncIppParser<R> {
    reader: AsyncIppReader<R>,
    state: ParserState,
}

#[cfg(feature = "async")]
impl<R> AsyncIppParser<R>
where
    R: AsyncRead + Send + Sync + Unpin,
{
    /// Create IPP parser from AsyncIppReader
    pub fn new<T>(reader: T) -> AsyncIppParser<R>
    where
        T: Into<AsyncIppReader<R>>,
    {
        AsyncIppParser {
            reader: reader.into(),
            state: ParserState::new(),
        }
    }

    async fn parse_header_attributes(&mut self) -> Result<IppHeader, IppParseError> {
        let header = self.reader.read_header().await?;
        trace!("IPP header: {header:?}");

        loop {
            match self.reader.read_tag().await? {
                tag @ 0x01..=0x0f => {
                    if self.state.parse_delimiter(tag)? {
                        break;
                    }
                }
                tag @ 0x10..=0xff => {
                    let name = self.reader.read_name().await?;
                    let value = self.reader.read_value().await?;
                    self.state.parse_value(tag, name, value)?;
                }
                tag => {
                    return Err(IppParseError::InvalidTag(tag));
                }
            }
        }

        Ok(header)
    }

    /// Parse IPP stream without reading beyond the end of the attributes. The payload stays untouched.
    pub async fn parse_parts(mut self) -> Result<(IppHeader, IppAttributes, AsyncIppReader<R>), IppParseError> {
        let header = self.parse_header_attributes().await?;
        Ok((header, self.state.into_attributes(), self.reader))
    }

    /// Parse IPP stream
    pub async fn parse(mut self) -> Result<IppRequestResponse, IppParseError>
    where
        R: 'static,
    {
        let header = self.parse_header_attributes().await?;

        Ok(IppRequestResponse {
            header,
            attributes: self.state.into_attributes(),
            payload: self.reader.into_payload(),
        })
    }
}

/// Synchronous IPP parser
pub struct IppParser<R> {
    reader: IppReader<R>,
    state: ParserState,
}

impl<R> IppParser<R>
where
    R: Read + Send + Sync,
{
    /// Create IPP parser from IppReader
    pub fn new<T>(reader: T) -> IppParser<R>
    where
        T: Into<IppReader<R>>,
    {
        IppParser {
            reader: reader.into(),
            state: ParserState::new(),
        }
    }

    fn parse_header_attributes(&mut self) -> Result<IppHeader, IppParseError> {
        let header = self.reader.read_header()?;
        trace!("IPP header: {header:?}");

        loop {
            match self.reader.read_tag()? {
                tag @ 0x01..=0x0f => {
                    if self.state.parse_delimiter(tag)? {
                        break;
                    }
                }
                tag @ 0x10..=0xff => {
                    let name = self.reader.read_name()?;
                    let value = self.reader.read_value()?;
                    self.state.parse_value(tag, name, value)?;
                }
                tag => {
                    return Err(IppParseError::InvalidTag(tag));
                }
            }
        }

        Ok(header)
    }

    /// Parse IPP stream without reading beyond the end of the attributes. The payload stays untouched.
    pub fn parse_parts(mut self) -> Result<(IppHeader, IppAttributes, IppReader<R>), IppParseError> {
        let header = self.parse_header_attributes()?;
        Ok((header, self.state.into_attributes(), self.reader))
    }

    /// Parse IPP stream
    pub fn parse(mut self) -> Result<IppRequestResponse, IppParseError>
    where
        R: 'static,
    {
        let header = self.parse_header_attributes()?;

        Ok(IppRequestResponse {
            header,
            attributes: self.state.into_attributes(),
            payload: self.reader.into_payload(),
        })
    }
}

#[cfg(test)]
mod tests {
    use crate::model::IppVersion;

    use super::*;

    const SINGLE: &[u8] = &[
        1, 1, 0, 0, 0, 0, 0, 0, 4, 0x21, 0x00, 0x04, b't', b'e', b's', b't', 0x00, 0x04, 0x12, 0x34, 0x56, 0x78, 3,
    ];

    fn parse(data: &[u8]) -> Result<IppRequestResponse, IppParseError> {
        IppParser::new(IppReader::new(io::Cursor::new(data.to_vec()))).parse()
    }

    #[cfg(feature = "async")]
    #[tokio::test]
    async fn test_async_parse_single_value() {
        let result = AsyncIppParser::new(AsyncIppReader::new(futures_util::io::Cursor::new(SINGLE)))
            .parse()
            .await;
        let res = result.unwrap();
        let attr = res.attributes().get(DelimiterTag::PrinterAttributes, "test").unwrap();
        assert_eq!(attr.value().as_integer(), Some(&0x1234_5678));
    }

    #[cfg(feature = "async")]
    #[tokio::test]
    async fn test_async_parse_with_payload() {
        let mut data = SINGLE.to_vec();
        data.extend_from_slice(b"foo");

        let res = AsyncIppParser::new(AsyncIppReader::new(futures_util::io::Cursor::new(data)))
            .parse()
            .await
            .unwrap();
        assert_eq!(res.header().version, IppVersion::v1_1());

        let mut cursor = futures_util::io::Cursor::new(Vec::new());
        futures_util::io::copy(res.payload, &mut cursor).await.unwrap();
        assert_eq!(cursor.into_inner(), b"foo");
    }

    #[cfg(feature = "async")]
    #[tokio::test]
    async fn test_async_parse_truncated() {
        let data = &SINGLE[..SINGLE.len() - 3];
        let result = AsyncIppParser::new(AsyncIppReader::new(futures_util::io::Cursor::new(data)))
            .parse()
            .await;
        assert!(matches!(result, Err(IppParseError::Truncated)));
    }

    #[test]
    fn test_parse_no_attributes() {
        let res = parse(&[1, 1, 0, 0, 0, 0, 0, 0, 3]).unwrap();
        assert!(res.attributes().groups().is_empty());
    }

    #[test]
    fn test_parse_array() {
        let data = &[
            1, 1, 0, 0, 0, 0, 0, 0, 4, 0x21, 0x00, 0x04, b't', b'e', b's', b't', 0x00, 0x04, 0x12, 0x34, 0x56, 0x78,
            0x21, 0x00, 0x00, 0x00, 0x04, 0x77, 0x65, 0x43, 0x21, 3,
        ];
        let res = parse(data).unwrap();
        let attr = res.attributes().get(DelimiterTag::PrinterAttributes, "test").unwrap();
        assert_eq!(
            attr.value().as_array(),
            Some(&vec![IppValue::Integer(0x1234_5678), IppValue::Integer(0x7765_4321)])
        );
    }

    #[test]
    fn test_parse_collection() {
        let data = &[
            1, 1, 0, 0, 0, 0, 0, 0, 4, 0x34, 0, 4, b'c', b'o', b'l', b'l', 0, 0, 0x4a, 0, 0, 0, 4, b'a', b'b', b'c',
            b'd', 0x44, 0, 0, 0, 3, b'k', b'e', b'y', 0x37, 0, 0, 0, 0, 3,
        ];
        let res = parse(data).unwrap();
        let attr = res.attributes().get(DelimiterTag::PrinterAttributes, "coll").unwrap();
        assert_eq!(
            attr.value(),
            &IppValue::Collection(BTreeMap::from([(
                "abcd".to_string(),
                IppValue::Keyword("key".to_owned())
            )]))
        );
    }

    #[test]
    fn test_parse_collection_member_array() {
        let data = &[
            1, 1, 0, 0, 0, 0, 0, 0, 4, 0x34, 0, 1, b'c', 0, 0, 0x4a, 0, 0, 0, 1, b'a', 0x44, 0, 0, 0, 2, b'k', b'1',
            0x44, 0, 0, 0, 2, b'k', b'2', 0x4a, 0, 0, 0, 1, b'b', 0x21, 0, 0, 0, 4, 0, 0, 0, 9, 0x37, 0, 0, 0, 0, 3,
        ];
        let res = parse(data).unwrap();
        let attr = res.attributes().get(DelimiterTag::PrinterAttributes, "c").unwrap();
        assert_eq!(
            attr.value(),
            &IppValue::Collection(BTreeMap::from([
                (
                    "a".to_string(),
                    IppValue::Array(vec![
                        IppValue::Keyword("k1".to_owned()),
                        IppValue::Keyword("k2".to_owned())
                    ])
                ),
                ("b".to_string(), IppValue::Integer(9)),
            ]))
        );
    }

    #[test]
    fn test_parse_unbalanced_collection() {
        // no end collection
        let data = &[
            1, 1, 0, 0, 0, 0, 0, 0, 4, 0x34, 0, 1, b'c', 0, 0, 0x4a, 0, 0, 0, 1, b'a', 0x21, 0, 0, 0, 4, 0, 0, 0, 1, 3,
        ];
        assert!(matches!(parse(data), Err(IppParseError::InvalidCollection)));

        // end collection only
        let data = &[1, 1, 0, 0, 0, 0, 0, 0, 4, 0x37, 0, 1, b'c', 0, 0, 3];
        assert!(matches!(parse(data), Err(IppParseError::InvalidCollection)));
    }

    #[test]
    fn test_parse_parts() {
        let mut data = SINGLE.to_vec();
        data.extend_from_slice(b"foo");

        let (header, attributes, reader) = IppParser::new(IppReader::new(io::Cursor::new(data)))
            .parse_parts()
            .unwrap();
        assert_eq!(header.version, IppVersion::v1_1());
        let attr = attributes.get(DelimiterTag::PrinterAttributes, "test").unwrap();
        assert_eq!(attr.value().as_integer(), Some(&0x1234_5678));

        let mut payload = reader.into_payload();
        let mut cursor = io::Cursor::new(Vec::new());
        io::copy(&mut payload, &mut cursor).unwrap();
        assert_eq!(cursor.into_inner(), b"foo");
    }

    #[test]
    fn test_parse_groups() {
        let data = &[
            0x00, 0x01, 0x00, 0x00, 0x00, 0x00, 0x00, 0x01, 0x01, 0x21, 0x00, 0x04, b't', b'e', b's', b't', 0x00, 0x04,
            0x12, 0x34, 0x56, 0x78, 0x21, 0x00, 0x05, b't', b'e', b's', b't', b'2', 0x00, 0x04, 0x12, 0x34, 0x56, 0xFF,
            0x04, 0x21, 0x00, 0x04, b't', b'e', b's', b't', 0x00, 0x04, 0x87, 0x65, 0x43, 0x21, 0x03,
        ];

        let res = parse(data).unwrap();

        assert_eq!(2, res.attributes().groups()[0].attributes().len());
        assert_eq!(1, res.attributes().groups()[1].attributes().len());
    }

    #[test]
    fn test_parse_repeated_job_groups() {
        let data = &[
            1, 1, 0, 0, 0, 0, 0, 1, 2, 0x21, 0, 6, b'j', b'o', b'b', b'-', b'i', b'd', 0, 4, 0, 0, 0, 1, 2, 0x21, 0, 6,
            b'j', b'o', b'b', b'-', b'i', b'd', 0, 4, 0, 0, 0, 2, 3,
        ];
        let res = parse(data).unwrap();
        let ids = res
            .attributes()
            .groups_of(DelimiterTag::JobAttributes)
            .filter_map(|g| g.value("job-id").and_then(IppValue::as_integer).copied())
            .collect::<Vec<_>>();
        assert_eq!(ids, vec![1, 2]);
    }

    #[test]
    fn test_parse_reserved_delimiter_skipped() {
        let data = &[
            1, 1, 0, 0, 0, 0, 0, 0, 0x0b, 0x21, 0, 1, b'x', 0, 4, 0, 0, 0, 1, 4, 0x21, 0, 1, b'y', 0, 4, 0, 0, 0, 2, 3,
        ];
        let res = parse(data).unwrap();
        assert_eq!(res.attributes().groups().len(), 1);
        assert!(res.attributes().get(DelimiterTag::PrinterAttributes, "y").is_some());
    }

    #[test]
    fn test_parse_unknown_value_tag_preserved() {
        let data = &[1, 1, 0, 0, 0, 0, 0, 0, 4, 0x5f, 0, 1, b'x', 0, 2, 0xab, 0xcd, 3];
        let res = parse(data).unwrap();
        let attr = res.attributes().get(DelimiterTag::PrinterAttributes, "x").unwrap();
        assert_eq!(
            attr.value(),
            &IppValue::Other {
                tag: 0x5f,
                data: Bytes::from_static(&[0xab, 0xcd])
            }
        );
    }

    #[test]
    fn test_parse_malformed() {
        // truncated inside value
        assert!(matches!(parse(&SINGLE[..20]), Err(IppParseError::Truncated)));
        // truncated header
        assert!(matches!(parse(&[1, 1, 0]), Err(IppParseError::Truncated)));
        // no end of attributes
        assert!(matches!(parse(&SINGLE[..SINGLE.len() - 1]), Err(IppParseError::Truncated)));
        // invalid tag
        assert!(matches!(
            parse(&[1, 1, 0, 0, 0, 0, 0, 0, 0]),
            Err(IppParseError::InvalidTag(0))
        ));
        // value before any group
        assert!(matches!(
            parse(&[1, 1, 0, 0, 0, 0, 0, 0, 0x21, 0, 1, b'x', 0, 4, 0, 0, 0, 1, 3]),
            Err(IppParseError::MissingGroup)
        ));
        // additional value without attribute
        assert!(matches!(
            parse(&[1, 1, 0, 0, 0, 0, 0, 0, 4, 0x21, 0, 0, 0, 4, 0, 0, 0, 1, 3]),
            Err(IppParseError::MissingAttributeName(0x21))
        ));
        // short integer
        assert!(matches!(
            parse(&[1, 1, 0, 0, 0, 0, 0, 0, 4, 0x21, 0, 1, b'x', 0, 2, 0, 1, 3]),
            Err(IppParseError::InvalidValueLength { tag: 0x21, len: 2 })
        ));
    }
}
