//! Route descriptor mini-language
//!
//! A route row stores its path as a single string:
//! - `nodes=<id>[,<id>...]`: an explicit hop list
//! - `factory=<name>`: computed at resolution time by a named strategy
//! - `<...`: a packed route payload produced by the transport
//!
//! Prefixes are matched case-insensitively. Anything else is kept as
//! `Unrecognised` so the resolver can log it and fall back.

use std::fmt;

/// Destination that always resolves to local delivery
pub const VIRTUAL_NODE: &str = "$virtual";

const NODES_PREFIX: &str = "nodes=";
const FACTORY_PREFIX: &str = "factory=";

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RouteDescriptor {
    /// Explicit path, hop by hop
    Nodes(Vec<String>),
    /// Name of the strategy computing the path
    Factory(String),
    /// Packed payload, including the leading `<`
    Packed(String),
    Unrecognised(String),
}

fn strip_prefix_ignore_case<'a>(input: &'a str, prefix: &str) -> Option<&'a str> {
    let head = input.get(..prefix.len())?;
    if head.eq_ignore_ascii_case(prefix) {
        Some(&input[prefix.len()..])
    } else {
        None
    }
}

impl RouteDescriptor {
    pub fn parse(raw: &str) -> Self {
        let trimmed = raw.trim();
        if let Some(rest) = strip_prefix_ignore_case(trimmed, NODES_PREFIX) {
            let mut nodes: Vec<String> = rest.split(',').map(|n| n.trim().to_string()).collect();
            // Interior blanks are kept; trailing ones are not
            while nodes.last().is_some_and(|n| n.is_empty()) {
                nodes.pop();
            }
            RouteDescriptor::Nodes(nodes)
        } else if let Some(rest) = strip_prefix_ignore_case(trimmed, FACTORY_PREFIX) {
            RouteDescriptor::Factory(rest.trim().to_string())
        } else if trimmed.starts_with('<') {
            RouteDescriptor::Packed(trimmed.to_string())
        } else {
            RouteDescriptor::Unrecognised(raw.to_string())
        }
    }

    /// Explicit path through `nodes`
    pub fn nodes<I, S>(nodes: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        RouteDescriptor::Nodes(nodes.into_iter().map(Into::into).collect())
    }

    pub fn factory(name: impl Into<String>) -> Self {
        RouteDescriptor::Factory(name.into())
    }
}

impl fmt::Display for RouteDescriptor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RouteDescriptor::Nodes(nodes) => write!(f, "{}{}", NODES_PREFIX, nodes.join(",")),
            RouteDescriptor::Factory(name) => write!(f, "{}{}", FACTORY_PREFIX, name),
            RouteDescriptor::Packed(raw) | RouteDescriptor::Unrecognised(raw) => f.write_str(raw),
        }
    }
}

impl From<&str> for RouteDescriptor {
    fn from(raw: &str) -> Self {
        RouteDescriptor::parse(raw)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_node_list() {
        assert_eq!(
            RouteDescriptor::parse("nodes=A, B ,C"),
            RouteDescriptor::nodes(["A", "B", "C"])
        );
        assert_eq!(
            RouteDescriptor::parse("NODES=a,,b,"),
            RouteDescriptor::nodes(["a", "", "b"])
        );
        assert_eq!(RouteDescriptor::parse("nodes="), RouteDescriptor::Nodes(vec![]));
        assert_eq!(RouteDescriptor::parse("nodes= , "), RouteDescriptor::Nodes(vec![]));
    }

    #[test]
    fn test_parse_factory_case_insensitive() {
        assert_eq!(
            RouteDescriptor::parse("Factory=DynamicRouting"),
            RouteDescriptor::factory("DynamicRouting")
        );
    }

    #[test]
    fn test_parse_packed_and_unrecognised() {
        let packed = "<route><nd to=\"A\"/></route>";
        assert_eq!(
            RouteDescriptor::parse(packed),
            RouteDescriptor::Packed(packed.to_string())
        );
        assert_eq!(
            RouteDescriptor::parse("via=A"),
            RouteDescriptor::Unrecognised("via=A".to_string())
        );
        assert_eq!(
            RouteDescriptor::parse("nod"),
            RouteDescriptor::Unrecognised("nod".to_string())
        );
    }

    #[test]
    fn test_display_encodes_mini_language() {
        assert_eq!(RouteDescriptor::nodes(["a", "b"]).to_string(), "nodes=a,b");
        assert_eq!(RouteDescriptor::factory("X").to_string(), "factory=X");
        assert_eq!(
            RouteDescriptor::parse("nodes= a , b").to_string(),
            "nodes=a,b"
        );
    }

    #[test]
    fn test_multibyte_input_does_not_panic() {
        assert_eq!(
            RouteDescriptor::parse("ñø"),
            RouteDescriptor::Unrecognised("ñø".to_string())
        );
    }
}
