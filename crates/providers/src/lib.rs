//! Model implementations for ctxlink.
//!
//! All models implement the `ctxlink_core::Model` trait. The template model
//! is the only built-in one; real inference plugs in behind the same trait.

pub mod template;

pub use template::TemplateModel;
