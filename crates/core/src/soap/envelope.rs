//! SOAP 1.2 envelope construction and response classification.

use super::{SoapBody, SoapFault, SoapOutcome, SoapParam, SoapValue};
use crate::xml::{self, XmlBuilder, XmlError};

pub const SOAP12_NS: &str = "http://www.w3.org/2003/05/soap-envelope";

const ENVELOPE_PREFIX: &str = "soap";
const SERVICE_PREFIX: &str = "ws";

/// Build a request envelope calling `operation` in `namespace`.
///
/// Parameters are written as namespace-qualified children of the operation
/// element, in the order given.
pub fn build_envelope(
    namespace: &str,
    operation: &str,
    params: &[SoapParam],
) -> Result<Vec<u8>, XmlError> {
    let envelope = format!("{ENVELOPE_PREFIX}:Envelope");
    let body = format!("{ENVELOPE_PREFIX}:Body");
    let call = format!("{SERVICE_PREFIX}:{operation}");
    let envelope_ns = format!("xmlns:{ENVELOPE_PREFIX}");
    let service_ns = format!("xmlns:{SERVICE_PREFIX}");

    let mut xml = XmlBuilder::new();
    xml.declaration()?
        .start(
            &envelope,
            &[(envelope_ns.as_str(), SOAP12_NS), (service_ns.as_str(), namespace)],
        )?
        .start(&body, &[])?
        .start(&call, &[])?;
    write_params(&mut xml, params)?;
    xml.end(&call)?.end(&body)?.end(&envelope)?;

    Ok(xml.finish())
}

fn write_params(xml: &mut XmlBuilder, params: &[SoapParam]) -> Result<(), XmlError> {
    for param in params {
        let name = format!("{SERVICE_PREFIX}:{}", param.name);
        match &param.value {
            SoapValue::Text(text) => {
                xml.text_element(&name, text)?;
            }
            SoapValue::Struct(fields) => {
                xml.start(&name, &[])?;
                write_params(xml, fields)?;
                xml.end(&name)?;
            }
        }
    }
    Ok(())
}

/// Classify a response document as a fault or a regular response.
///
/// Understands both SOAP 1.2 (`Code/Value`, `Reason/Text`) and SOAP 1.1
/// (`faultcode`, `faultstring`) fault layouts.
pub fn parse_response(body: &[u8]) -> Result<SoapOutcome, XmlError> {
    let document = String::from_utf8_lossy(body).into_owned();

    if !xml::contains_element(&document, "Envelope")? {
        return Err(XmlError::new("missing SOAP Envelope"));
    }

    if !xml::contains_element(&document, "Fault")? {
        return Ok(SoapOutcome::Response(SoapBody::new(document)));
    }

    let fields = xml::texts_under(&document, "Fault")?;
    let pick = |names: &[&str]| {
        fields
            .iter()
            .find(|(name, _)| names.contains(&name.as_str()))
            .map(|(_, text)| text.trim().to_string())
    };

    Ok(SoapOutcome::Fault(SoapFault {
        code: pick(&["faultcode", "Value"]).unwrap_or_else(|| "unknown".to_string()),
        message: pick(&["faultstring", "Text"]).unwrap_or_default(),
    }))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_build_envelope() {
        let xml = build_envelope(
            "http://wsaa.view.sua.dvadac.desein.afip.gov",
            "loginCms",
            &[SoapParam::text("in0", "MIIG+/=")],
        )
        .unwrap();
        let xml = String::from_utf8(xml).unwrap();

        assert_eq!(
            xml,
            concat!(
                r#"<?xml version="1.0" encoding="UTF-8"?>"#,
                r#"<soap:Envelope xmlns:soap="http://www.w3.org/2003/05/soap-envelope" xmlns:ws="http://wsaa.view.sua.dvadac.desein.afip.gov">"#,
                r#"<soap:Body><ws:loginCms><ws:in0>MIIG+/=</ws:in0></ws:loginCms></soap:Body></soap:Envelope>"#
            )
        );
    }

    #[test]
    fn test_build_envelope_nested_params() {
        let xml = build_envelope(
            "urn:test",
            "consultar",
            &[
                SoapParam::structure(
                    "authRequest",
                    vec![SoapParam::text("token", "T"), SoapParam::text("sign", "S")],
                ),
                SoapParam::text("numero", "1"),
            ],
        )
        .unwrap();
        let xml = String::from_utf8(xml).unwrap();

        assert!(xml.contains(
            "<ws:consultar><ws:authRequest><ws:token>T</ws:token><ws:sign>S</ws:sign></ws:authRequest><ws:numero>1</ws:numero></ws:consultar>"
        ));
    }

    #[test]
    fn test_parse_regular_response() {
        let body = br#"<soapenv:Envelope xmlns:soapenv="http://schemas.xmlsoap.org/soap/envelope/"><soapenv:Body><loginCmsResponse><loginCmsReturn>&lt;ta/&gt;</loginCmsReturn></loginCmsResponse></soapenv:Body></soapenv:Envelope>"#;

        match parse_response(body).unwrap() {
            SoapOutcome::Response(body) => {
                assert_eq!(body.text("loginCmsReturn").unwrap().as_deref(), Some("<ta/>"))
            }
            other => panic!("unexpected outcome: {other:?}"),
        }
    }

    #[test]
    fn test_parse_soap11_fault() {
        let body = br#"<soapenv:Envelope xmlns:soapenv="http://schemas.xmlsoap.org/soap/envelope/"><soapenv:Body><soapenv:Fault><faultcode xmlns:ns1="http://xml.apache.org/axis/">ns1:coe.alreadyAuthenticated</faultcode><faultstring>El CEE ya posee un TA valido para el acceso al WSN solicitado</faultstring></soapenv:Fault></soapenv:Body></soapenv:Envelope>"#;

        assert_eq!(
            parse_response(body).unwrap(),
            SoapOutcome::Fault(SoapFault {
                code: "ns1:coe.alreadyAuthenticated".to_string(),
                message: "El CEE ya posee un TA valido para el acceso al WSN solicitado"
                    .to_string(),
            })
        );
    }

    #[test]
    fn test_parse_soap12_fault() {
        let body = br#"<soap:Envelope xmlns:soap="http://www.w3.org/2003/05/soap-envelope"><soap:Body><soap:Fault><soap:Code><soap:Value>soap:Receiver</soap:Value></soap:Code><soap:Reason><soap:Text xml:lang="es">cms.bad</soap:Text></soap:Reason></soap:Fault></soap:Body></soap:Envelope>"#;

        assert_eq!(
            parse_response(body).unwrap(),
            SoapOutcome::Fault(SoapFault {
                code: "soap:Receiver".to_string(),
                message: "cms.bad".to_string(),
            })
        );
    }

    #[test]
    fn test_parse_non_soap_body() {
        assert!(parse_response(b"<html><body>Bad gateway</body></html>").is_err());
    }
}
