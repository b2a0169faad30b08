//!
//! Attribute-related structs
//!
use std::collections::BTreeMap;

use bytes::{BufMut, Bytes, BytesMut};
use num_traits::FromPrimitive;
#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

use crate::{
    error::IppError,
    model::{DelimiterTag, ValueTag},
    value::IppValue,
};

macro_rules! define_attributes {
    ($($name:ident => $value:literal),* $(,)?) => {
        $(pub const $name: &'static str = $value;)*
    };
}

const NAME: &[ValueTag] = &[ValueTag::NameWithoutLanguage, ValueTag::NameWithLanguage];
const TEXT: &[ValueTag] = &[ValueTag::TextWithoutLanguage, ValueTag::TextWithLanguage];
const INTEGER: &[ValueTag] = &[ValueTag::Integer];
const ENUM: &[ValueTag] = &[ValueTag::Enum];
const BOOLEAN: &[ValueTag] = &[ValueTag::Boolean];
const KEYWORD: &[ValueTag] = &[ValueTag::Keyword];
const KEYWORD_OR_NAME: &[ValueTag] = &[
    ValueTag::Keyword,
    ValueTag::NameWithoutLanguage,
    ValueTag::NameWithLanguage,
];
const URI: &[ValueTag] = &[ValueTag::Uri];
const MIME: &[ValueTag] = &[ValueTag::MimeMediaType];
const RANGE: &[ValueTag] = &[ValueTag::RangeOfInteger];
const RESOLUTION: &[ValueTag] = &[ValueTag::Resolution];
const COLLECTION: &[ValueTag] = &[ValueTag::BegCollection];

/// Registered value syntax of well-known request attributes.
///
/// Returns `None` for attributes which are not registered here, their values are not checked.
pub fn expected_syntax(name: &str) -> Option<&'static [ValueTag]> {
    let syntax = match name {
        IppAttribute::ATTRIBUTES_CHARSET => &[ValueTag::Charset],
        IppAttribute::ATTRIBUTES_NATURAL_LANGUAGE => &[ValueTag::NaturalLanguage],
        IppAttribute::PRINTER_URI | IppAttribute::JOB_URI => URI,
        IppAttribute::JOB_ID | IppAttribute::COPIES | IppAttribute::LIMIT | IppAttribute::JOB_PRIORITY => INTEGER,
        IppAttribute::REQUESTING_USER_NAME | IppAttribute::JOB_NAME | IppAttribute::DOCUMENT_NAME => NAME,
        IppAttribute::MESSAGE => TEXT,
        IppAttribute::DOCUMENT_FORMAT => MIME,
        IppAttribute::REQUESTED_ATTRIBUTES
        | IppAttribute::WHICH_JOBS
        | IppAttribute::SIDES
        | IppAttribute::PRINT_COLOR_MODE
        | IppAttribute::MULTIPLE_DOCUMENT_HANDLING
        | IppAttribute::COMPRESSION => KEYWORD,
        IppAttribute::MEDIA | IppAttribute::JOB_HOLD_UNTIL | IppAttribute::OUTPUT_BIN => KEYWORD_OR_NAME,
        IppAttribute::MY_JOBS | IppAttribute::IPP_ATTRIBUTE_FIDELITY => BOOLEAN,
        IppAttribute::ORIENTATION_REQUESTED | IppAttribute::PRINT_QUALITY | IppAttribute::FINISHINGS => ENUM,
        IppAttribute::PAGE_RANGES => RANGE,
        IppAttribute::PRINTER_RESOLUTION => RESOLUTION,
        IppAttribute::MEDIA_COL => COLLECTION,
        _ => return None,
    };
    Some(syntax)
}

fn is_header_attr(attr: &str) -> bool {
    IppAttribute::HEADER_ATTRS.contains(&attr)
}

/// `IppAttribute` represents an IPP attribute
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[derive(Clone, Debug, PartialEq)]
pub struct IppAttribute {
    /// Attribute name
    name: String,
    /// Attribute value
    value: IppValue,
}

impl IppAttribute {
    define_attributes! {
        ATTRIBUTES_CHARSET => "attributes-charset",
        ATTRIBUTES_NATURAL_LANGUAGE => "attributes-natural-language",
        COMPRESSION => "compression",
        COPIES => "copies",
        DATE_TIME_AT_COMPLETED => "date-time-at-completed",
        DATE_TIME_AT_CREATION => "date-time-at-creation",
        DOCUMENT_FORMAT => "document-format",
        DOCUMENT_FORMAT_SUPPORTED => "document-format-supported",
        DOCUMENT_NAME => "document-name",
        FINISHINGS => "finishings",
        IPP_ATTRIBUTE_FIDELITY => "ipp-attribute-fidelity",
        IPP_VERSIONS_SUPPORTED => "ipp-versions-supported",
        JOB_HOLD_UNTIL => "job-hold-until",
        JOB_ID => "job-id",
        JOB_IMPRESSIONS_COMPLETED => "job-impressions-completed",
        JOB_K_OCTETS_PROCESSED => "job-k-octets-processed",
        JOB_NAME => "job-name",
        JOB_ORIGINATING_USER_NAME => "job-originating-user-name",
        JOB_PRINTER_URI => "job-printer-uri",
        JOB_PRIORITY => "job-priority",
        JOB_STATE => "job-state",
        JOB_STATE_MESSAGE => "job-state-message",
        JOB_STATE_REASONS => "job-state-reasons",
        JOB_URI => "job-uri",
        LIMIT => "limit",
        MEDIA => "media",
        MEDIA_COL => "media-col",
        MESSAGE => "message",
        MULTIPLE_DOCUMENT_HANDLING => "multiple-document-handling",
        MY_JOBS => "my-jobs",
        OPERATIONS_SUPPORTED => "operations-supported",
        ORIENTATION_REQUESTED => "orientation-requested",
        OUTPUT_BIN => "output-bin",
        PAGE_RANGES => "page-ranges",
        PRINTER_INFO => "printer-info",
        PRINTER_IS_ACCEPTING_JOBS => "printer-is-accepting-jobs",
        PRINTER_LOCATION => "printer-location",
        PRINTER_MAKE_AND_MODEL => "printer-make-and-model",
        PRINTER_NAME => "printer-name",
        PRINTER_RESOLUTION => "printer-resolution",
        PRINTER_STATE => "printer-state",
        PRINTER_STATE_MESSAGE => "printer-state-message",
        PRINTER_STATE_REASONS => "printer-state-reasons",
        PRINTER_URI => "printer-uri",
        PRINTER_URI_SUPPORTED => "printer-uri-supported",
        PRINT_COLOR_MODE => "print-color-mode",
        PRINT_QUALITY => "print-quality",
        QUEUED_JOB_COUNT => "queued-job-count",
        REQUESTED_ATTRIBUTES => "requested-attributes",
        REQUESTING_USER_NAME => "requesting-user-name",
        SIDES => "sides",
        SIDES_SUPPORTED => "sides-supported",
        STATUS_MESSAGE => "status-message",
        TIME_AT_COMPLETED => "time-at-completed",
        TIME_AT_CREATION => "time-at-creation",
        WHICH_JOBS => "which-jobs",
    }

    // RFC 8011 4.1.4: "attributes-charset" and "attributes-natural-language" MUST be the first two
    // operation attributes. RFC 8011 4.1.5: the operation target ("printer-uri", then "job-id") follows.
    const HEADER_ATTRS: [&'static str; 5] = [
        IppAttribute::ATTRIBUTES_CHARSET,
        IppAttribute::ATTRIBUTES_NATURAL_LANGUAGE,
        IppAttribute::PRINTER_URI,
        IppAttribute::JOB_ID,
        IppAttribute::REQUESTING_USER_NAME,
    ];

    /// Create new instance of the attribute
    ///
    /// * `name` - Attribute name<br/>
    /// * `value` - Attribute value, one-element lists are stored as the single value<br/>
    pub fn new<S>(name: S, value: IppValue) -> IppAttribute
    where
        S: AsRef<str>,
    {
        IppAttribute {
            name: name.as_ref().to_owned(),
            value: value.normalize(),
        }
    }

    /// Return attribute name
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Return attribute value
    pub fn value(&self) -> &IppValue {
        &self.value
    }

    /// Consume this attribute and return the value
    pub fn into_value(self) -> IppValue {
        self.value
    }

    /// Check that the value syntax matches the registered syntax of this attribute and that it is encodable
    pub fn validate(&self) -> Result<(), IppError> {
        if self.name.is_empty() || self.name.len() > u16::MAX as usize {
            return Err(IppError::InvalidRequest(format!(
                "invalid attribute name length: {}",
                self.name.len()
            )));
        }

        if self.value.max_value_len() > u16::MAX as usize {
            return Err(IppError::InvalidRequest(format!("value of '{}' is too long", self.name)));
        }

        if let IppValue::Array(ref list) = self.value {
            if list.is_empty() {
                return Err(IppError::InvalidRequest(format!("'{}' has an empty value list", self.name)));
            }
        }

        if let Some(expected) = expected_syntax(&self.name) {
            for value in &self.value {
                let matches = ValueTag::from_u8(value.to_tag())
                    .map(|tag| expected.contains(&tag))
                    .unwrap_or(false);
                if !matches {
                    return Err(IppError::InvalidRequest(format!(
                        "'{}' expects {:?}, got tag 0x{:02x}",
                        self.name,
                        expected,
                        value.to_tag()
                    )));
                }
            }
        }
        Ok(())
    }

    /// Write attribute to byte array
    pub fn to_bytes(&self) -> Bytes {
        let mut buffer = BytesMut::new();

        buffer.put_u8(self.value.to_tag());
        buffer.put_u16(self.name.len() as u16);
        buffer.put_slice(self.name.as_bytes());
        buffer.put(self.value.to_bytes());
        buffer.freeze()
    }
}

/// Attribute group
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[derive(Clone, Debug, PartialEq)]
pub struct IppAttributeGroup {
    tag: DelimiterTag,
    attributes: BTreeMap<String, IppAttribute>,
}

impl IppAttributeGroup {
    /// Create new attribute group of a given type
    pub fn new(tag: DelimiterTag) -> IppAttributeGroup {
        IppAttributeGroup {
            tag,
            attributes: BTreeMap::new(),
        }
    }

    /// Return group type tag
    pub fn tag(&self) -> DelimiterTag {
        self.tag
    }

    /// Return read-only attributes
    pub fn attributes(&self) -> &BTreeMap<String, IppAttribute> {
        &self.attributes
    }

    /// Return mutable attributes
    pub fn attributes_mut(&mut self) -> &mut BTreeMap<String, IppAttribute> {
        &mut self.attributes
    }

    /// Consume this group and return mutable attributes
    pub fn into_attributes(self) -> BTreeMap<String, IppAttribute> {
        self.attributes
    }

    /// Get attribute value by name
    pub fn value(&self, name: &str) -> Option<&IppValue> {
        self.attributes.get(name).map(IppAttribute::value)
    }
}

/// Attribute list
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[derive(Clone, Debug, Default, PartialEq)]
pub struct IppAttributes {
    groups: Vec<IppAttributeGroup>,
}

impl IppAttributes {
    /// Create attribute list
    pub fn new() -> IppAttributes {
        IppAttributes { ..Default::default() }
    }

    /// Get all groups
    pub fn groups(&self) -> &[IppAttributeGroup] {
        &self.groups
    }

    /// Get all mutable groups
    pub fn groups_mut(&mut self) -> &mut Vec<IppAttributeGroup> {
        &mut self.groups
    }

    /// Consume this attribute list and return all attribute groups
    pub fn into_groups(self) -> Vec<IppAttributeGroup> {
        self.groups
    }

    /// Get a list of attribute groups matching a given delimiter tag
    pub fn groups_of(&self, tag: DelimiterTag) -> impl Iterator<Item = &IppAttributeGroup> {
        self.groups.iter().filter(move |g| g.tag == tag)
    }

    /// Find attribute by name in the first group of a given type
    pub fn get(&self, tag: DelimiterTag, name: &str) -> Option<&IppAttribute> {
        self.groups_of(tag).next().and_then(|g| g.attributes().get(name))
    }

    /// Add attribute to the first group of a given type, creating the group if needed
    pub fn add(&mut self, tag: DelimiterTag, attribute: IppAttribute) {
        let group = self.groups_mut().iter_mut().find(|g| g.tag() == tag);
        if let Some(group) = group {
            group.attributes_mut().insert(attribute.name().to_owned(), attribute);
        } else {
            let mut new_group = IppAttributeGroup::new(tag);
            new_group
                .attributes_mut()
                .insert(attribute.name().to_owned(), attribute);
            self.groups_mut().push(new_group);
        }
    }

    /// Write attribute list to byte array
    pub fn to_bytes(&self) -> Bytes {
        let mut buffer = BytesMut::new();

        // put the required attributes first as described in section 4.1.4 of RFC8011
        buffer.put_u8(DelimiterTag::OperationAttributes as u8);

        if let Some(group) = self.groups_of(DelimiterTag::OperationAttributes).next() {
            for hdr in &IppAttribute::HEADER_ATTRS {
                if let Some(attr) = group.attributes().get(*hdr) {
                    buffer.put(attr.to_bytes());
                }
            }

            // now the other operation attributes
            for attr in group.attributes().values() {
                if !is_header_attr(attr.name()) {
                    buffer.put(attr.to_bytes());
                }
            }
        }

        // now the rest
        for group in self
            .groups()
            .iter()
            .filter(|group| group.tag() != DelimiterTag::OperationAttributes)
        {
            buffer.put_u8(group.tag() as u8);

            for attr in group.attributes().values() {
                buffer.put(attr.to_bytes());
            }
        }
        buffer.put_u8(DelimiterTag::EndOfAttributes as u8);

        buffer.freeze()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_header_attributes_first() {
        let mut attrs = IppAttributes::new();
        attrs.add(
            DelimiterTag::OperationAttributes,
            IppAttribute::new(IppAttribute::JOB_NAME, IppValue::NameWithoutLanguage("a".to_owned())),
        );
        attrs.add(
            DelimiterTag::OperationAttributes,
            IppAttribute::new(IppAttribute::JOB_ID, IppValue::Integer(7)),
        );
        attrs.add(
            DelimiterTag::OperationAttributes,
            IppAttribute::new(IppAttribute::ATTRIBUTES_CHARSET, IppValue::Charset("utf-8".to_owned())),
        );

        let buf = attrs.to_bytes();
        let charset_pos = buf.windows(18).position(|w| w == b"attributes-charset").unwrap();
        let job_id_pos = buf.windows(6).position(|w| w == b"job-id").unwrap();
        let job_name_pos = buf.windows(8).position(|w| w == b"job-name").unwrap();
        assert_eq!(buf[0], DelimiterTag::OperationAttributes as u8);
        assert!(charset_pos < job_id_pos && job_id_pos < job_name_pos);
        assert_eq!(buf[buf.len() - 1], DelimiterTag::EndOfAttributes as u8);
    }

    #[test]
    fn test_validate_syntax() {
        assert!(IppAttribute::new(IppAttribute::COPIES, IppValue::Integer(2))
            .validate()
            .is_ok());
        assert!(matches!(
            IppAttribute::new(IppAttribute::COPIES, IppValue::NameWithoutLanguage("two".to_owned())).validate(),
            Err(IppError::InvalidRequest(_))
        ));
        assert!(IppAttribute::new(
            IppAttribute::REQUESTED_ATTRIBUTES,
            IppValue::Array(vec![IppValue::Keyword("job-id".to_owned()), IppValue::Integer(1)])
        )
        .validate()
        .is_err());
        assert!(IppAttribute::new(IppAttribute::MEDIA, IppValue::NameWithoutLanguage("custom".to_owned()))
            .validate()
            .is_ok());
        assert!(IppAttribute::new("x-vendor-thing", IppValue::Integer(1)).validate().is_ok());
        assert!(IppAttribute::new("", IppValue::Integer(1)).validate().is_err());
        assert!(IppAttribute::new(
            IppAttribute::DOCUMENT_NAME,
            IppValue::NameWithoutLanguage("x".repeat(70_000))
        )
        .validate()
        .is_err());
    }
}
