pub mod document;
pub mod format;
pub mod layout;
pub mod sections;

pub use document::{assemble, render_invoice, RenderError};
