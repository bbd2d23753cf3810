use anyhow::{Result, bail};
use clap::ValueEnum;
use std::fmt;
use std::str::FromStr;

/// Decorator attribute names recognised as route registrations.
#[derive(Clone, Copy, Debug, Eq, PartialEq, Hash)]
pub enum HttpVerb {
    Get,
    Post,
    Put,
    Delete,
    Patch,
    Options,
    Head,
}

impl HttpVerb {
    pub fn from_attribute(name: &str) -> Option<Self> {
        match name {
            "get" => Some(Self::Get),
            "post" => Some(Self::Post),
            "put" => Some(Self::Put),
            "delete" => Some(Self::Delete),
            "patch" => Some(Self::Patch),
            "options" => Some(Self::Options),
            "head" => Some(Self::Head),
            _ => None,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Get => "GET",
            Self::Post => "POST",
            Self::Put => "PUT",
            Self::Delete => "DELETE",
            Self::Patch => "PATCH",
            Self::Options => "OPTIONS",
            Self::Head => "HEAD",
        }
    }
}

impl fmt::Display for HttpVerb {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// How wide the set of accepted verbs is.
#[derive(ValueEnum, Clone, Copy, Debug, Default, Eq, PartialEq)]
pub enum Strictness {
    /// get, post, put, delete, patch
    #[default]
    Standard,
    /// standard verbs plus options and head
    Relaxed,
}

impl Strictness {
    pub fn accepts(self, verb: HttpVerb) -> bool {
        match verb {
            HttpVerb::Options | HttpVerb::Head => self == Self::Relaxed,
            _ => true,
        }
    }

    /// Verb for a decorator attribute, if this strictness level recognises it.
    pub fn verb_for(self, attribute: &str) -> Option<HttpVerb> {
        HttpVerb::from_attribute(attribute).filter(|verb| self.accepts(*verb))
    }
}

impl FromStr for Strictness {
    type Err = anyhow::Error;

    fn from_str(raw: &str) -> Result<Self> {
        match raw.trim().to_ascii_lowercase().as_str() {
            "standard" | "strict" => Ok(Self::Standard),
            "relaxed" | "lenient" => Ok(Self::Relaxed),
            other => bail!("unknown strictness: {other}"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn verbs_are_case_sensitive_attribute_names() {
        assert_eq!(HttpVerb::from_attribute("get"), Some(HttpVerb::Get));
        assert_eq!(HttpVerb::from_attribute("GET"), None);
        assert_eq!(HttpVerb::from_attribute("route"), None);
        assert_eq!(HttpVerb::Delete.to_string(), "DELETE");
    }

    #[test]
    fn strictness_controls_options_and_head() {
        assert_eq!(Strictness::Standard.verb_for("head"), None);
        assert_eq!(Strictness::Standard.verb_for("patch"), Some(HttpVerb::Patch));
        assert_eq!(Strictness::Relaxed.verb_for("options"), Some(HttpVerb::Options));
        assert_eq!("Relaxed".parse::<Strictness>().unwrap(), Strictness::Relaxed);
        assert!("loose".parse::<Strictness>().is_err());
    }
}
