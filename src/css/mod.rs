//! CSS object model
//!
//! This module provides the live stylesheet attached to connected `<style>`
//! elements, split into top-level rules with `cssparser`.

pub mod stylesheet;

pub use stylesheet::CssStyleSheet;
