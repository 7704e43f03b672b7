//! XML marshalling for inbound and outbound envelopes.
//!
//! Only the elements directly under the root are considered, and only the
//! ones this crate reads; everything else in the document is ignored.

use quick_xml::events::{BytesCData, BytesEnd, BytesStart, BytesText, Event};
use quick_xml::{Reader, Writer};

use crate::types::{
    EnvelopeError, Result, ENCRYPT_ELEMENT, NONCE_ELEMENT, RECIPIENT_ELEMENT, ROOT_ELEMENT,
    SIGNATURE_ELEMENT, TIMESTAMP_ELEMENT,
};

/// Fields read from an inbound callback body.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InboundEnvelope {
    /// Recipient account (`ToUserName`); empty when absent.
    pub recipient: String,
    /// Base64 ciphertext (`Encrypt`) exactly as transmitted.
    pub encrypt: String,
}

impl InboundEnvelope {
    /// Parse an inbound envelope.
    pub fn from_xml(xml: &[u8]) -> Result<Self> {
        let [recipient, encrypt] = collect_fields(xml, [RECIPIENT_ELEMENT, ENCRYPT_ELEMENT])?;
        Ok(Self {
            recipient: recipient.unwrap_or_default(),
            encrypt: encrypt.ok_or_else(|| missing(ENCRYPT_ELEMENT))?,
        })
    }
}

/// Outbound envelope as sent back to the platform.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SealedEnvelope {
    /// Base64 ciphertext.
    pub encrypt: String,
    /// Hex SHA-1 signature.
    pub msg_signature: String,
    /// Timestamp string.
    pub timestamp: String,
    /// Nonce string.
    pub nonce: String,
}

impl SealedEnvelope {
    /// Marshal to the four-element reply document.
    ///
    /// Format:
    /// `<xml><Encrypt><![CDATA[..]]></Encrypt><MsgSignature><![CDATA[..]]></MsgSignature>`
    /// `<TimeStamp>..</TimeStamp><Nonce><![CDATA[..]]></Nonce></xml>`
    pub fn to_xml(&self) -> Result<Vec<u8>> {
        let mut writer = Writer::new(Vec::new());
        writer.write_event(Event::Start(BytesStart::new(ROOT_ELEMENT)))?;
        write_cdata_element(&mut writer, ENCRYPT_ELEMENT, &self.encrypt)?;
        write_cdata_element(&mut writer, SIGNATURE_ELEMENT, &self.msg_signature)?;
        write_text_element(&mut writer, TIMESTAMP_ELEMENT, &self.timestamp)?;
        write_cdata_element(&mut writer, NONCE_ELEMENT, &self.nonce)?;
        writer.write_event(Event::End(BytesEnd::new(ROOT_ELEMENT)))?;
        Ok(writer.into_inner())
    }

    /// Parse a reply document produced by [`SealedEnvelope::to_xml`].
    pub fn from_xml(xml: &[u8]) -> Result<Self> {
        let [encrypt, msg_signature, timestamp, nonce] = collect_fields(
            xml,
            [
                ENCRYPT_ELEMENT,
                SIGNATURE_ELEMENT,
                TIMESTAMP_ELEMENT,
                NONCE_ELEMENT,
            ],
        )?;
        Ok(Self {
            encrypt: encrypt.ok_or_else(|| missing(ENCRYPT_ELEMENT))?,
            msg_signature: msg_signature.ok_or_else(|| missing(SIGNATURE_ELEMENT))?,
            timestamp: timestamp.ok_or_else(|| missing(TIMESTAMP_ELEMENT))?,
            nonce: nonce.ok_or_else(|| missing(NONCE_ELEMENT))?,
        })
    }
}

fn missing(name: &str) -> EnvelopeError {
    EnvelopeError::InvalidXml(format!("Missing <{}> element", name))
}

/// Collect the text of the named children of the root element.
///
/// Text and CDATA content are concatenated without trimming, so the value
/// is exactly what was transmitted. A repeated element keeps its last
/// occurrence; an element that is present but empty yields `Some("")`.
fn collect_fields<const N: usize>(xml: &[u8], names: [&str; N]) -> Result<[Option<String>; N]> {
    let mut values: [Option<String>; N] = std::array::from_fn(|_| None);
    let mut reader = Reader::from_reader(xml);

    let mut buf = Vec::new();
    let mut depth = 0usize;
    let mut current: Option<usize> = None;

    loop {
        match reader.read_event_into(&mut buf)? {
            Event::Start(e) => {
                depth += 1;
                current = if depth == 2 {
                    names.iter().position(|n| n.as_bytes() == e.name().as_ref())
                } else {
                    None
                };
                if let Some(i) = current {
                    values[i] = Some(String::new());
                }
            }
            Event::Empty(e) => {
                if depth == 1 {
                    if let Some(i) = names.iter().position(|n| n.as_bytes() == e.name().as_ref()) {
                        values[i] = Some(String::new());
                    }
                }
            }
            Event::End(_) => {
                depth = depth.saturating_sub(1);
                current = None;
            }
            Event::Text(t) => {
                if let Some(i) = current {
                    let text = t.unescape()?;
                    values[i].get_or_insert_with(String::new).push_str(&text);
                }
            }
            Event::CData(c) => {
                if let Some(i) = current {
                    let text = std::str::from_utf8(&c)
                        .map_err(|e| EnvelopeError::InvalidXml(format!("Invalid UTF-8: {}", e)))?;
                    values[i].get_or_insert_with(String::new).push_str(text);
                }
            }
            Event::Eof => break,
            _ => {}
        }
        buf.clear();
    }

    if depth != 0 {
        return Err(EnvelopeError::InvalidXml("Unexpected end of document".into()));
    }

    Ok(values)
}

fn write_cdata_element(writer: &mut Writer<Vec<u8>>, name: &str, value: &str) -> Result<()> {
    if value.contains("]]>") {
        return Err(EnvelopeError::InvalidXml(format!(
            "<{}> value cannot be wrapped in CDATA",
            name
        )));
    }
    writer.write_event(Event::Start(BytesStart::new(name)))?;
    writer.write_event(Event::CData(BytesCData::new(value)))?;
    writer.write_event(Event::End(BytesEnd::new(name)))?;
    Ok(())
}

fn write_text_element(writer: &mut Writer<Vec<u8>>, name: &str, value: &str) -> Result<()> {
    writer.write_event(Event::Start(BytesStart::new(name)))?;
    writer.write_event(Event::Text(BytesText::new(value)))?;
    writer.write_event(Event::End(BytesEnd::new(name)))?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    const CALLBACK_BODY: &str = "<xml>\n\
        <ToUserName><![CDATA[gh_abcdef123456]]></ToUserName>\n\
        <Encrypt><![CDATA[c2VjcmV0IHBheWxvYWQ=]]></Encrypt>\n\
        <AgentID><![CDATA[1]]></AgentID>\n\
        </xml>";

    fn sample_sealed() -> SealedEnvelope {
        SealedEnvelope {
            encrypt: "c2VjcmV0IHBheWxvYWQ=".into(),
            msg_signature: "386d4602fc9f77bc24d991ab7771a59dd82637e6".into(),
            timestamp: "1409304348".into(),
            nonce: "790711785".into(),
        }
    }

    #[test]
    fn test_parse_inbound() {
        let inbound = InboundEnvelope::from_xml(CALLBACK_BODY.as_bytes()).unwrap();
        assert_eq!(inbound.recipient, "gh_abcdef123456");
        assert_eq!(inbound.encrypt, "c2VjcmV0IHBheWxvYWQ=");
    }

    #[test]
    fn test_parse_inbound_plain_text_fields() {
        let body = b"<xml><ToUserName>gh_1</ToUserName><Encrypt>abc+/=</Encrypt></xml>";
        let inbound = InboundEnvelope::from_xml(body).unwrap();
        assert_eq!(inbound.recipient, "gh_1");
        assert_eq!(inbound.encrypt, "abc+/=");
    }

    #[test]
    fn test_field_whitespace_preserved() {
        let body = b"<xml>\n  <Encrypt>\n  abc\n</Encrypt>\n</xml>";
        let inbound = InboundEnvelope::from_xml(body).unwrap();
        assert_eq!(inbound.encrypt, "\n  abc\n");

        let body = b"<xml><Encrypt><![CDATA[\r\nabc\r\n]]></Encrypt></xml>";
        let inbound = InboundEnvelope::from_xml(body).unwrap();
        assert_eq!(inbound.encrypt, "\r\nabc\r\n");
    }

    #[test]
    fn test_repeated_element_keeps_last() {
        let body = b"<xml><Encrypt>aaaa</Encrypt><Encrypt>bbbb</Encrypt></xml>";
        let inbound = InboundEnvelope::from_xml(body).unwrap();
        assert_eq!(inbound.encrypt, "bbbb");
    }

    #[test]
    fn test_parse_inbound_without_recipient() {
        let inbound = InboundEnvelope::from_xml(b"<xml><Encrypt>abc</Encrypt></xml>").unwrap();
        assert_eq!(inbound.recipient, "");
    }

    #[test]
    fn test_nested_elements_ignored() {
        let body = b"<xml><Extra><Encrypt>wrong</Encrypt></Extra><Encrypt>right</Encrypt></xml>";
        let inbound = InboundEnvelope::from_xml(body).unwrap();
        assert_eq!(inbound.encrypt, "right");
    }

    #[test]
    fn test_missing_encrypt() {
        let result = InboundEnvelope::from_xml(b"<xml><ToUserName>gh_1</ToUserName></xml>");
        assert!(matches!(result, Err(EnvelopeError::InvalidXml(_))));
    }

    #[test]
    fn test_malformed_xml() {
        let result = InboundEnvelope::from_xml(b"<xml><Encrypt>abc</Nonce></xml>");
        assert!(matches!(result, Err(EnvelopeError::InvalidXml(_))));

        let result = InboundEnvelope::from_xml(b"<xml><Encrypt>abc</Encrypt>");
        assert!(matches!(result, Err(EnvelopeError::InvalidXml(_))));
    }

    #[test]
    fn test_sealed_xml_layout() {
        let xml = String::from_utf8(sample_sealed().to_xml().unwrap()).unwrap();
        assert_eq!(
            xml,
            "<xml>\
             <Encrypt><![CDATA[c2VjcmV0IHBheWxvYWQ=]]></Encrypt>\
             <MsgSignature><![CDATA[386d4602fc9f77bc24d991ab7771a59dd82637e6]]></MsgSignature>\
             <TimeStamp>1409304348</TimeStamp>\
             <Nonce><![CDATA[790711785]]></Nonce>\
             </xml>"
        );
    }

    #[test]
    fn test_sealed_parse_back() {
        let sealed = sample_sealed();
        let parsed = SealedEnvelope::from_xml(&sealed.to_xml().unwrap()).unwrap();
        assert_eq!(parsed, sealed);
    }

    #[test]
    fn test_cdata_terminator_rejected() {
        let mut sealed = sample_sealed();
        sealed.nonce = "abc]]>def".into();
        assert!(matches!(sealed.to_xml(), Err(EnvelopeError::InvalidXml(_))));
    }

    #[test]
    fn test_timestamp_is_escaped() {
        let mut sealed = sample_sealed();
        sealed.timestamp = "1<2".into();
        let xml = sealed.to_xml().unwrap();
        let parsed = SealedEnvelope::from_xml(&xml).unwrap();
        assert_eq!(parsed.timestamp, "1<2");
    }
}
