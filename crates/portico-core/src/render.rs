//! View rendering contract
//!
//! Template rendering is a collaborator, not part of the dispatch layer.
//! The tenant-core pages hand a view name and a JSON data bag to whatever
//! `Renderer` the host wired in.

use serde_json::Value;

use crate::Result;

pub trait Renderer: Send + Sync {
    fn render(&self, view: &str, data: &Value) -> Result<String>;
}
