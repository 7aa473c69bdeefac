//! ritquiz-report: self-contained HTML reports for finished sessions.

pub mod html;

pub use html::{generate_html, write_html_report};
