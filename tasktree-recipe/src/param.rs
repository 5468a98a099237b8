//! Parameter type tags and `name[:type][=default]` literals.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Closed set of parameter type tags.
///
/// The tag decides coercion and the canonical form used for argument
/// fingerprinting. `Str` is the default when a literal carries no tag.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ParamType {
    /// Raw text
    Str,
    /// Signed decimal integer
    Int,
    /// IEEE-754 double
    Float,
    /// `true|false|1|0|yes|no`, case-insensitive
    Bool,
    /// Filesystem path, resolved to absolute against the task's working dir
    Path,
    /// ISO-8601 datetime with optional timezone
    Datetime,
    /// URL with scheme and host
    Url,
    /// RFC 1123 hostname
    Hostname,
    /// `local@domain`
    Email,
    /// IPv4 or IPv6 address
    Ip,
    /// IPv4 address
    Ipv4,
    /// IPv6 address
    Ipv6,
}

impl ParamType {
    /// Look up a type tag as written in a recipe.
    pub fn from_tag(tag: &str) -> Option<Self> {
        match tag {
            "str" => Some(Self::Str),
            "int" => Some(Self::Int),
            "float" => Some(Self::Float),
            "bool" => Some(Self::Bool),
            "path" => Some(Self::Path),
            "datetime" => Some(Self::Datetime),
            "url" => Some(Self::Url),
            "hostname" => Some(Self::Hostname),
            "email" => Some(Self::Email),
            "ip" => Some(Self::Ip),
            "ipv4" => Some(Self::Ipv4),
            "ipv6" => Some(Self::Ipv6),
            _ => None,
        }
    }

    /// The canonical tag string, as written in recipes and fed to the
    /// fingerprinter.
    pub fn tag(self) -> &'static str {
        match self {
            Self::Str => "str",
            Self::Int => "int",
            Self::Float => "float",
            Self::Bool => "bool",
            Self::Path => "path",
            Self::Datetime => "datetime",
            Self::Url => "url",
            Self::Hostname => "hostname",
            Self::Email => "email",
            Self::Ip => "ip",
            Self::Ipv4 => "ipv4",
            Self::Ipv6 => "ipv6",
        }
    }
}

impl fmt::Display for ParamType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.tag())
    }
}

/// A declared task parameter.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ParamSpec {
    /// Parameter name, unique within the task
    pub name: String,
    /// Type tag
    pub ty: ParamType,
    /// Default value literal, coerced like any supplied value
    pub default: Option<String>,
}

impl ParamSpec {
    /// Parse a `name[:type][=default]` literal.
    ///
    /// The first `=` starts the default; everything after it is taken
    /// verbatim, so defaults may themselves contain `=` or `:`.
    pub fn parse(literal: &str) -> std::result::Result<Self, String> {
        let (head, default) = match literal.split_once('=') {
            Some((head, default)) => (head, Some(default.to_string())),
            None => (literal, None),
        };

        let (name, ty) = match head.split_once(':') {
            Some((name, tag)) => {
                let ty = ParamType::from_tag(tag)
                    .ok_or_else(|| format!("unknown type tag `{tag}`"))?;
                (name, ty)
            }
            None => (head, ParamType::Str),
        };

        if !crate::is_identifier(name) {
            return Err(format!("`{name}` is not a valid parameter name"));
        }

        Ok(Self {
            name: name.to_string(),
            ty,
            default,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn bare_name_defaults_to_str() {
        let spec = ParamSpec::parse("message").unwrap();
        assert_eq!(spec.name, "message");
        assert_eq!(spec.ty, ParamType::Str);
        assert_eq!(spec.default, None);
    }

    #[test]
    fn typed_with_default() {
        let spec = ParamSpec::parse("retries:int=3").unwrap();
        assert_eq!(spec.name, "retries");
        assert_eq!(spec.ty, ParamType::Int);
        assert_eq!(spec.default.as_deref(), Some("3"));
    }

    #[test]
    fn default_may_contain_separators() {
        let spec = ParamSpec::parse("flags=-a=-b:c").unwrap();
        assert_eq!(spec.ty, ParamType::Str);
        assert_eq!(spec.default.as_deref(), Some("-a=-b:c"));
    }

    #[test]
    fn untyped_with_default() {
        let spec = ParamSpec::parse("env=prod").unwrap();
        assert_eq!(spec.ty, ParamType::Str);
        assert_eq!(spec.default.as_deref(), Some("prod"));
    }

    #[test]
    fn rejects_unknown_tag() {
        let err = ParamSpec::parse("port:u16").unwrap_err();
        assert!(err.contains("u16"));
    }

    #[test]
    fn rejects_bad_name() {
        assert!(ParamSpec::parse("2fast:int").is_err());
        assert!(ParamSpec::parse(":int").is_err());
    }

    #[test]
    fn all_tags_round_trip() {
        for tag in [
            "str", "int", "float", "bool", "path", "datetime", "url", "hostname", "email", "ip",
            "ipv4", "ipv6",
        ] {
            let ty = ParamType::from_tag(tag).unwrap();
            assert_eq!(ty.tag(), tag);
        }
    }
}
