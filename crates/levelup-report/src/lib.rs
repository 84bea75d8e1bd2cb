//! levelup-report — Completion report rendering.

pub mod html;

pub use html::{generate_html, write_html_report};
