//! XML envelope codec for the management API
//!
//! Requests are wrapped in a `<netapp>` envelope; responses carry a single
//! `<results>` node whose attributes hold the call status.

use crate::domain::{ApiResponse, Element, ResultStatus};
use crate::error::{Error, Result};
use quick_xml::escape::escape;
use quick_xml::events::{BytesStart, Event};
use quick_xml::reader::Reader;

const API_NAMESPACE: &str = "http://www.netapp.com/filer/admin";

/// Envelope attributes for a request
#[derive(Debug, Clone, Copy)]
pub struct Envelope<'a> {
    pub api_major: u32,
    pub api_minor: u32,
    pub vfiler: Option<&'a str>,
}

/// Serialize a request element inside its envelope
pub fn encode_request(request: &Element, envelope: Envelope<'_>) -> String {
    let mut out = String::with_capacity(256);
    out.push_str("<?xml version='1.0' encoding='utf-8' ?>\n");
    out.push_str("<!DOCTYPE netapp SYSTEM 'file:/etc/netapp_filer.dtd'>\n");
    out.push_str(&format!(
        "<netapp version='{}.{}' xmlns='{}'",
        envelope.api_major, envelope.api_minor, API_NAMESPACE
    ));
    if let Some(vfiler) = envelope.vfiler {
        out.push_str(&format!(" vfiler='{}'", escape(vfiler)));
    }
    out.push('>');
    write_element(&mut out, request);
    out.push_str("</netapp>");
    out
}

fn write_element(out: &mut String, element: &Element) {
    out.push('<');
    out.push_str(element.name());
    out.push('>');
    out.push_str(&escape(element.content()));
    for child in element.children() {
        write_element(out, child);
    }
    out.push_str("</");
    out.push_str(element.name());
    out.push('>');
}

/// Parse a response envelope into status and `results` tree
pub fn parse_response(body: &str) -> Result<ApiResponse> {
    let mut reader = Reader::from_str(body);
    reader.trim_text(true);

    let mut stack: Vec<Element> = Vec::new();
    let mut status: Option<ResultStatus> = None;
    let mut results: Option<Element> = None;

    loop {
        match reader.read_event().map_err(xml_error)? {
            Event::Start(start) => {
                let name = element_name(&start)?;
                if is_results(&name, &stack, &status) {
                    status = Some(read_status(&start)?);
                }
                stack.push(Element::new(name));
            }
            Event::Empty(start) => {
                let name = element_name(&start)?;
                if is_results(&name, &stack, &status) {
                    status = Some(read_status(&start)?);
                }
                attach(&mut stack, &mut results, Element::new(name));
            }
            Event::Text(text) => {
                let text = text.unescape().map_err(xml_error)?;
                append_content(&mut stack, &text);
            }
            Event::CData(data) => {
                let raw = data.into_inner();
                append_content(&mut stack, &String::from_utf8_lossy(&raw));
            }
            Event::End(_) => {
                let element = stack
                    .pop()
                    .ok_or_else(|| Error::Xml("unbalanced closing tag".into()))?;
                attach(&mut stack, &mut results, element);
            }
            Event::Eof => break,
            _ => {}
        }
    }

    match (status, results) {
        (Some(status), Some(results)) => Ok(ApiResponse { status, results }),
        _ => Err(Error::Xml("response carries no results element".into())),
    }
}

fn is_results(name: &str, stack: &[Element], status: &Option<ResultStatus>) -> bool {
    name == "results" && stack.len() == 1 && status.is_none()
}

fn attach(stack: &mut [Element], results: &mut Option<Element>, element: Element) {
    if element.name() == "results" && stack.len() == 1 && results.is_none() {
        *results = Some(element);
    } else if let Some(parent) = stack.last_mut() {
        parent.push_child(element);
    }
}

fn append_content(stack: &mut [Element], text: &str) {
    if let Some(top) = stack.last_mut() {
        let mut content = top.content().to_string();
        content.push_str(text);
        top.set_content(content);
    }
}

fn element_name(start: &BytesStart<'_>) -> Result<String> {
    std::str::from_utf8(start.local_name().as_ref())
        .map(str::to_string)
        .map_err(|e| Error::Xml(format!("element name is not UTF-8: {}", e)))
}

fn read_status(start: &BytesStart<'_>) -> Result<ResultStatus> {
    let mut passed = false;
    let mut errno = None;
    let mut reason = String::new();

    for attr in start.attributes() {
        let attr = attr.map_err(|e| Error::Xml(e.to_string()))?;
        let value = attr.unescape_value().map_err(xml_error)?;
        match attr.key.local_name().as_ref() {
            b"status" => passed = value == "passed",
            b"errno" => errno = value.trim().parse::<i64>().ok(),
            b"reason" => reason = value.into_owned(),
            _ => {}
        }
    }

    if passed {
        Ok(ResultStatus::passed())
    } else {
        // a failed call without a usable errno still has to read as failed
        let errno = errno.filter(|e| *e != 0).unwrap_or(-1);
        Ok(ResultStatus::failed(errno, reason))
    }
}

fn xml_error(e: quick_xml::Error) -> Error {
    Error::Xml(e.to_string())
}
