//! Small XML helpers over `quick-xml`.
//!
//! Element matching uses local names only, so namespace prefixes chosen by the
//! remote side (`soap:`, `ns1:`, ...) never matter.

use quick_xml::events::{BytesDecl, BytesEnd, BytesStart, BytesText, Event};
use quick_xml::{Reader, Writer};
use thiserror::Error;

#[derive(Debug, Error)]
#[error("Invalid XML: {0}")]
pub struct XmlError(String);

impl XmlError {
    pub fn new(reason: impl Into<String>) -> Self {
        Self(reason.into())
    }
}

impl From<quick_xml::Error> for XmlError {
    fn from(err: quick_xml::Error) -> Self {
        Self(err.to_string())
    }
}

/// Visit every text node together with the stack of enclosing element names.
///
/// Adjacent text and CDATA nodes of the same element are reported joined.
fn walk<F>(xml: &str, mut visit: F) -> Result<(), XmlError>
where
    F: FnMut(&[String], &str),
{
    let mut reader = Reader::from_str(xml);
    reader.trim_text(true);

    let mut stack: Vec<String> = Vec::new();
    let mut text = String::new();

    loop {
        match reader.read_event()? {
            Event::Start(e) => {
                flush(&stack, &mut text, &mut visit);
                stack.push(String::from_utf8_lossy(e.local_name().as_ref()).into_owned());
            }
            Event::End(_) => {
                flush(&stack, &mut text, &mut visit);
                stack.pop();
            }
            Event::Text(t) => text.push_str(&t.unescape()?),
            Event::CData(c) => text.push_str(&String::from_utf8_lossy(&c.into_inner())),
            Event::Eof => break,
            _ => {}
        }
    }

    if !stack.is_empty() {
        return Err(XmlError(format!("unclosed element <{}>", stack.join("/"))));
    }
    Ok(())
}

fn flush<F>(stack: &[String], text: &mut String, visit: &mut F)
where
    F: FnMut(&[String], &str),
{
    if !text.is_empty() {
        visit(stack, text);
        text.clear();
    }
}

/// Text of the element at `path`, relative to the document root.
///
/// `text_at(doc, &["header", "expirationTime"])` reads
/// `<anyRoot><header><expirationTime>...`.
pub fn text_at(xml: &str, path: &[&str]) -> Result<Option<String>, XmlError> {
    let mut found = None;
    walk(xml, |stack, text| {
        if found.is_none()
            && stack.len() == path.len() + 1
            && stack[1..].iter().zip(path).all(|(a, b)| a == b)
        {
            found = Some(text.to_string());
        }
    })?;
    Ok(found)
}

/// Text of the first element named `name` anywhere in the document.
pub fn first_text(xml: &str, name: &str) -> Result<Option<String>, XmlError> {
    let mut found = None;
    walk(xml, |stack, text| {
        if found.is_none() && stack.last().is_some_and(|last| last == name) {
            found = Some(text.to_string());
        }
    })?;
    Ok(found)
}

/// All `(element name, text)` pairs whose enclosing chain contains `ancestor`.
pub fn texts_under(xml: &str, ancestor: &str) -> Result<Vec<(String, String)>, XmlError> {
    let mut found = Vec::new();
    walk(xml, |stack, text| {
        if let Some((last, parents)) = stack.split_last() {
            if parents.iter().any(|p| p == ancestor) {
                found.push((last.clone(), text.to_string()));
            }
        }
    })?;
    Ok(found)
}

/// Whether an element named `name` occurs anywhere in the document.
pub fn contains_element(xml: &str, name: &str) -> Result<bool, XmlError> {
    let mut reader = Reader::from_str(xml);
    loop {
        match reader.read_event()? {
            Event::Start(e) | Event::Empty(e) if e.local_name().as_ref() == name.as_bytes() => {
                return Ok(true)
            }
            Event::Eof => return Ok(false),
            _ => {}
        }
    }
}

/// Streaming document writer.
pub struct XmlBuilder {
    writer: Writer<Vec<u8>>,
}

impl XmlBuilder {
    pub fn new() -> Self {
        Self {
            writer: Writer::new(Vec::new()),
        }
    }

    /// Emit `<?xml version="1.0" encoding="UTF-8"?>`.
    pub fn declaration(&mut self) -> Result<&mut Self, XmlError> {
        self.writer
            .write_event(Event::Decl(BytesDecl::new("1.0", Some("UTF-8"), None)))?;
        Ok(self)
    }

    pub fn start(&mut self, name: &str, attributes: &[(&str, &str)]) -> Result<&mut Self, XmlError> {
        let mut start = BytesStart::new(name);
        for attribute in attributes {
            start.push_attribute(*attribute);
        }
        self.writer.write_event(Event::Start(start))?;
        Ok(self)
    }

    pub fn end(&mut self, name: &str) -> Result<&mut Self, XmlError> {
        self.writer.write_event(Event::End(BytesEnd::new(name)))?;
        Ok(self)
    }

    /// Emit `<name>text</name>` with `text` escaped.
    pub fn text_element(&mut self, name: &str, text: &str) -> Result<&mut Self, XmlError> {
        self.start(name, &[])?;
        self.writer.write_event(Event::Text(BytesText::new(text)))?;
        self.end(name)
    }

    pub fn finish(self) -> Vec<u8> {
        self.writer.into_inner()
    }
}

impl Default for XmlBuilder {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const TICKET: &str = r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>
<loginTicketResponse version="1.0">
    <header>
        <source>CN=wsaahomo</source>
        <expirationTime>2024-03-01T22:00:00.000-03:00</expirationTime>
    </header>
    <credentials>
        <token>PD94bWw=</token>
        <sign>c2lnbg==</sign>
    </credentials>
</loginTicketResponse>"#;

    #[test]
    fn test_text_at_nested_path() {
        assert_eq!(
            text_at(TICKET, &["header", "expirationTime"]).unwrap().as_deref(),
            Some("2024-03-01T22:00:00.000-03:00")
        );
        assert_eq!(
            text_at(TICKET, &["credentials", "token"]).unwrap().as_deref(),
            Some("PD94bWw=")
        );
    }

    #[test]
    fn test_text_at_missing_path() {
        assert_eq!(text_at(TICKET, &["credentials", "cuit"]).unwrap(), None);
        // Path is anchored at the root, not matched anywhere.
        assert_eq!(text_at(TICKET, &["token"]).unwrap(), None);
    }

    #[test]
    fn test_first_text_ignores_prefixes() {
        let xml = r#"<soap:Envelope xmlns:soap="urn:x"><soap:Body><ns1:loginCmsReturn xmlns:ns1="urn:y">&lt;ticket/&gt;</ns1:loginCmsReturn></soap:Body></soap:Envelope>"#;
        assert_eq!(
            first_text(xml, "loginCmsReturn").unwrap().as_deref(),
            Some("<ticket/>")
        );
    }

    #[test]
    fn test_cdata_is_reported() {
        let xml = "<a><b><![CDATA[x < y]]></b></a>";
        assert_eq!(first_text(xml, "b").unwrap().as_deref(), Some("x < y"));
    }

    #[test]
    fn test_texts_under() {
        let xml = "<r><status><AppServer>OK</AppServer><DbServer>OK</DbServer></status><other>x</other></r>";
        let texts = texts_under(xml, "status").unwrap();
        assert_eq!(
            texts,
            vec![
                ("AppServer".to_string(), "OK".to_string()),
                ("DbServer".to_string(), "OK".to_string()),
            ]
        );
    }

    #[test]
    fn test_contains_element() {
        let xml = r#"<e:Envelope xmlns:e="urn:x"><e:Body><e:Fault/></e:Body></e:Envelope>"#;
        assert!(contains_element(xml, "Fault").unwrap());
        assert!(!contains_element(xml, "Header").unwrap());
    }

    #[test]
    fn test_unclosed_document_is_error() {
        assert!(text_at("<a><b>x</b>", &["b"]).is_err());
    }

    #[test]
    fn test_builder_escapes_text() {
        let mut builder = XmlBuilder::new();
        builder
            .start("root", &[("version", "1.0")])
            .unwrap()
            .text_element("value", "a<b & c")
            .unwrap()
            .end("root")
            .unwrap();
        let xml = String::from_utf8(builder.finish()).unwrap();

        assert_eq!(
            xml,
            r#"<root version="1.0"><value>a&lt;b &amp; c</value></root>"#
        );
        assert_eq!(first_text(&xml, "value").unwrap().as_deref(), Some("a<b & c"));
    }
}
