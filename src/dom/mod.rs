//! Page/DOM query capability.
//!
//! Flows never touch the browser directly; they go through [`Dom`], which the
//! eoka-backed [`Session`](crate::Session) implements.

pub mod actions;
mod cdp;
pub mod wait;

use crate::Result;
use async_trait::async_trait;
use std::borrow::Cow;
use std::fmt;

/// How to find elements on the page.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Locator {
    Css(Cow<'static, str>),
    XPath(Cow<'static, str>),
}

impl Locator {
    pub const fn css(selector: &'static str) -> Self {
        Locator::Css(Cow::Borrowed(selector))
    }

    pub const fn xpath(expr: &'static str) -> Self {
        Locator::XPath(Cow::Borrowed(expr))
    }

    /// An XPath built at runtime (e.g. with an interpolated label).
    pub fn xpath_owned(expr: String) -> Self {
        Locator::XPath(Cow::Owned(expr))
    }

    pub fn expr(&self) -> &str {
        match self {
            Locator::Css(s) | Locator::XPath(s) => s,
        }
    }

    pub fn kind(&self) -> &'static str {
        match self {
            Locator::Css(_) => "css",
            Locator::XPath(_) => "xpath",
        }
    }
}

impl fmt::Display for Locator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}={}", self.kind(), self.expr())
    }
}

/// Snapshot of a matched element, taken when it was queried.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ElementHandle {
    /// Opaque token the backend uses to address the node again.
    pub id: String,
    /// Trimmed visible text.
    pub text: String,
    pub visible: bool,
    pub enabled: bool,
}

impl ElementHandle {
    pub fn is_clickable(&self) -> bool {
        self.visible && self.enabled
    }
}

/// Operations the flows need from a page.
///
/// Every call is awaited in sequence; implementations are not required to be
/// `Send`. Operations on a handle whose node has left the DOM return
/// [`Error::StaleElement`](crate::Error::StaleElement).
#[async_trait(?Send)]
pub trait Dom {
    /// All elements matching `locator`, in document order.
    async fn query(&self, locator: &Locator) -> Result<Vec<ElementHandle>>;

    /// Trimmed text of the first descendant of `element` matching `locator`.
    async fn child_text(&self, element: &ElementHandle, locator: &Locator)
        -> Result<Option<String>>;

    async fn click(&self, element: &ElementHandle) -> Result<()>;

    async fn clear(&self, element: &ElementHandle) -> Result<()>;

    /// Type into `element` at the end of its current value.
    async fn type_text(&self, element: &ElementHandle, text: &str) -> Result<()>;

    /// Current `value` of a form control.
    async fn value(&self, element: &ElementHandle) -> Result<String>;

    async fn scroll_into_view(&self, element: &ElementHandle) -> Result<()>;

    async fn attribute(&self, element: &ElementHandle, name: &str) -> Result<Option<String>>;

    async fn goto(&self, url: &str) -> Result<()>;

    async fn url(&self) -> Result<String>;

    /// PNG screenshot of the viewport.
    async fn screenshot(&self) -> Result<Vec<u8>>;
}
