//! Payload extraction from signing tool output.
//!
//! `openssl smime -sign` writes a MIME entity: a header block, one empty line,
//! then the base64 body. Some tools emit PEM armour instead. Either way the
//! authentication endpoint only wants the base64 body.

use super::SigningError;

const PEM_BEGIN: &str = "-----BEGIN ";
const PEM_END: &str = "-----END ";

/// Return the base64 CMS payload contained in `raw`.
pub fn extract_payload(raw: &[u8]) -> Result<String, SigningError> {
    let text = std::str::from_utf8(raw)
        .map_err(|_| SigningError::malformed_output("output is not text"))?
        .replace("\r\n", "\n");

    let body = if text.trim_start().starts_with(PEM_BEGIN) {
        pem_body(&text)?
    } else {
        mime_body(&text)?
    };

    let lines: Vec<&str> = body
        .lines()
        .map(str::trim)
        .filter(|line| !line.is_empty())
        .collect();
    if lines.is_empty() {
        return Err(SigningError::malformed_output("empty payload"));
    }
    if let Some(bad) = lines.iter().find(|line| !is_base64(line)) {
        return Err(SigningError::malformed_output(format!(
            "payload is not base64: {:?}",
            bad.chars().take(40).collect::<String>()
        )));
    }

    Ok(lines.join("\n"))
}

fn mime_body(text: &str) -> Result<&str, SigningError> {
    let (head, body) = text
        .split_once("\n\n")
        .ok_or_else(|| SigningError::malformed_output("no header/body separator"))?;

    let headers = parse_headers(head)?;
    let header = |name: &str| {
        headers
            .iter()
            .find(|(key, _)| key.eq_ignore_ascii_case(name))
            .map(|(_, value)| value.to_ascii_lowercase())
    };

    match header("Content-Type") {
        Some(content_type) if content_type.contains("pkcs7-mime") => {}
        Some(content_type) => {
            return Err(SigningError::malformed_output(format!(
                "unexpected content type: {content_type}"
            )))
        }
        None => return Err(SigningError::malformed_output("missing Content-Type header")),
    }
    if let Some(encoding) = header("Content-Transfer-Encoding") {
        if encoding.trim() != "base64" {
            return Err(SigningError::malformed_output(format!(
                "unsupported transfer encoding: {encoding}"
            )));
        }
    }

    Ok(body)
}

/// Parse RFC 5322 style headers, folding continuation lines.
fn parse_headers(head: &str) -> Result<Vec<(String, String)>, SigningError> {
    let mut headers: Vec<(String, String)> = Vec::new();
    for line in head.lines() {
        if line.starts_with([' ', '\t']) {
            let (_, value) = headers
                .last_mut()
                .ok_or_else(|| SigningError::malformed_output("continuation before header"))?;
            value.push(' ');
            value.push_str(line.trim());
            continue;
        }
        let (name, value) = line
            .split_once(':')
            .ok_or_else(|| SigningError::malformed_output(format!("invalid header line: {line}")))?;
        headers.push((name.trim().to_string(), value.trim().to_string()));
    }
    Ok(headers)
}

fn pem_body(text: &str) -> Result<&str, SigningError> {
    let begin = text
        .find(PEM_BEGIN)
        .and_then(|start| text[start..].find('\n').map(|nl| start + nl + 1))
        .ok_or_else(|| SigningError::malformed_output("truncated PEM header"))?;
    let end = text[begin..]
        .find(PEM_END)
        .map(|offset| begin + offset)
        .ok_or_else(|| SigningError::malformed_output("missing PEM footer"))?;
    Ok(&text[begin..end])
}

fn is_base64(line: &str) -> bool {
    line.bytes()
        .all(|b| b.is_ascii_alphanumeric() || matches!(b, b'+' | b'/' | b'='))
}
