//! Optional syntax built on the public extension traits
mod admonition;
mod autolink;
mod math;

pub use admonition::{AdmonitionBlockParser, AdmonitionBlockParserFactory};
pub use autolink::ExtendedAutolinkParserFactory;
pub use math::InlineMathParserFactory;
