//! Element locators and special keys

use std::fmt;

/// Strategy used to look an element up
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum By {
    Id(String),
    ClassName(String),
    TagName(String),
    Css(String),
    XPath(String),
}

impl By {
    pub fn id(value: impl Into<String>) -> Self {
        Self::Id(value.into())
    }

    pub fn class_name(value: impl Into<String>) -> Self {
        Self::ClassName(value.into())
    }

    pub fn tag_name(value: impl Into<String>) -> Self {
        Self::TagName(value.into())
    }

    pub fn css(value: impl Into<String>) -> Self {
        Self::Css(value.into())
    }

    pub fn xpath(value: impl Into<String>) -> Self {
        Self::XPath(value.into())
    }

    /// W3C `using`/`value` pair.
    ///
    /// The protocol has no id or class strategies, so both become CSS.
    pub fn to_w3c(&self) -> (&'static str, String) {
        match self {
            Self::Id(v) => ("css selector", format!("[id=\"{}\"]", v.replace('"', "\\\""))),
            Self::ClassName(v) => ("css selector", format!(".{}", v)),
            Self::TagName(v) => ("tag name", v.clone()),
            Self::Css(v) => ("css selector", v.clone()),
            Self::XPath(v) => ("xpath", v.clone()),
        }
    }
}

impl fmt::Display for By {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Id(v) => write!(f, "id={}", v),
            Self::ClassName(v) => write!(f, "class={}", v),
            Self::TagName(v) => write!(f, "tag={}", v),
            Self::Css(v) => write!(f, "css={}", v),
            Self::XPath(v) => write!(f, "xpath={}", v),
        }
    }
}

/// WebDriver key codepoints
pub mod keys {
    /// The Return/Enter key
    pub const ENTER: char = '\u{E007}';
}
