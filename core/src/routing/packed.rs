//! Packed route payloads
//!
//! A descriptor starting with `<` carries its hop list as XML:
//!
//! ```text
//! <route><nd to="nodeA"/><nd to="relay1"/><nd to="nodeB"/></route>
//! ```
//!
//! Hops are the `to` attributes of the `nd` children of `route`, in
//! document order.

use super::RouteError;

/// Decodes a packed route payload into a hop list.
pub trait RouteUnpacker: Send + Sync {
    fn unpack(&self, payload: &str) -> Result<Vec<String>, RouteError>;
}

#[derive(Debug, Clone, Copy, Default)]
pub struct XmlRouteUnpacker;

/// One element start tag: name, attributes, and whether it closed itself
struct StartTag {
    name: String,
    attributes: Vec<(String, String)>,
    self_closing: bool,
}

fn invalid(reason: impl Into<String>) -> RouteError {
    RouteError::InvalidPackedRoute(reason.into())
}

fn unescape(value: &str) -> String {
    value
        .replace("&lt;", "<")
        .replace("&gt;", ">")
        .replace("&quot;", "\"")
        .replace("&apos;", "'")
        .replace("&amp;", "&")
}

/// Parse the inside of `<...>` (without the angle brackets).
fn parse_start_tag(body: &str) -> Result<StartTag, RouteError> {
    let (body, self_closing) = match body.strip_suffix('/') {
        Some(inner) => (inner, true),
        None => (body, false),
    };
    let body = body.trim();
    let name_end = body.find(char::is_whitespace).unwrap_or(body.len());
    let name = body[..name_end].to_string();
    if name.is_empty() {
        return Err(invalid("element without a name"));
    }

    let mut attributes = Vec::new();
    let mut rest = body[name_end..].trim_start();
    while !rest.is_empty() {
        let eq = rest
            .find('=')
            .ok_or_else(|| invalid(format!("attribute without value in <{}>", name)))?;
        let key = rest[..eq].trim().to_string();
        let after = rest[eq + 1..].trim_start();
        let quote = after
            .chars()
            .next()
            .filter(|c| *c == '"' || *c == '\'')
            .ok_or_else(|| invalid(format!("unquoted attribute {} in <{}>", key, name)))?;
        let value_end = after[1..]
            .find(quote)
            .ok_or_else(|| invalid(format!("unterminated attribute {} in <{}>", key, name)))?;
        attributes.push((key, unescape(&after[1..1 + value_end])));
        rest = after[value_end + 2..].trim_start();
    }

    Ok(StartTag {
        name,
        attributes,
        self_closing,
    })
}

impl RouteUnpacker for XmlRouteUnpacker {
    fn unpack(&self, payload: &str) -> Result<Vec<String>, RouteError> {
        let mut hops = Vec::new();
        let mut open: Vec<String> = Vec::new();
        let mut seen_root = false;
        let mut rest = payload.trim();

        while let Some(start) = rest.find('<') {
            let after = &rest[start + 1..];
            let end = after
                .find('>')
                .ok_or_else(|| invalid("unterminated tag"))?;
            let tag = &after[..end];
            rest = &after[end + 1..];

            if tag.starts_with('?') || tag.starts_with('!') {
                continue;
            }
            if let Some(name) = tag.strip_prefix('/') {
                let name = name.trim();
                match open.pop() {
                    Some(expected) if expected == name => continue,
                    _ => return Err(invalid(format!("unexpected </{}>", name))),
                }
            }

            let element = parse_start_tag(tag)?;
            match (open.last().map(String::as_str), element.name.as_str()) {
                (None, "route") if !seen_root => seen_root = true,
                (None, other) => {
                    return Err(invalid(format!("unexpected root element <{}>", other)))
                }
                (Some("route"), "nd") if open.len() == 1 => {
                    let to = element
                        .attributes
                        .iter()
                        .find(|(key, _)| key == "to")
                        .map(|(_, value)| value.trim().to_string())
                        .ok_or_else(|| invalid("<nd> without a 'to' attribute"))?;
                    hops.push(to);
                }
                _ => {}
            }
            if !element.self_closing {
                open.push(element.name);
            }
        }

        if !seen_root {
            return Err(invalid("missing <route> element"));
        }
        if let Some(unclosed) = open.pop() {
            return Err(invalid(format!("unclosed <{}>", unclosed)));
        }
        Ok(hops)
    }
}
