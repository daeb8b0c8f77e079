//! The host delegate.
//!
//! Everything the language core cannot do by itself arrives through this
//! trait: logging, turning relative resource names into absolute paths,
//! reading files, decoding foreign geometry, and rasterising text to
//! outline paths. The core calls these as narrow, synchronous operations
//! and treats the results as values.

use std::cell::RefCell;
use std::path::{Path as FsPath, PathBuf};

use shape_geom::{Mesh, Path};

use crate::value::Value;

/// Host services consumed by the evaluator.
pub trait Delegate {
    /// Receive the values of one `print` statement.
    fn debug_log(&self, values: &[Value]);

    /// Turn a relative resource name from `import`/`texture`/`font` into
    /// an absolute location, or `None` when it does not exist.
    fn resolve_path(&self, name: &str) -> Option<PathBuf>;

    /// Read a resolved text resource (`.shape`, `.txt`, `.json`).
    fn read_text(&self, path: &FsPath) -> Option<String>;

    /// Load a resolved mesh resource (`.obj`, `.stl`, `.ply`).
    fn import_geometry(&self, path: &FsPath) -> Option<Mesh>;

    /// Rasterise text into glyph outline paths, one path per contour.
    ///
    /// Returning `None` means no font backend is available (or the named
    /// font is unknown); the `text` command reports `fileNotFound`.
    fn glyph_outlines(&self, text: &str, font: Option<&str>) -> Option<Vec<Path>> {
        let _ = (text, font);
        None
    }
}

/// A delegate that resolves nothing and drops all logs. The default for
/// hosts that only want the geometry tree.
#[derive(Debug, Default)]
pub struct NullDelegate;

impl Delegate for NullDelegate {
    fn debug_log(&self, _values: &[Value]) {}

    fn resolve_path(&self, _name: &str) -> Option<PathBuf> {
        None
    }

    fn read_text(&self, _path: &FsPath) -> Option<String> {
        None
    }

    fn import_geometry(&self, _path: &FsPath) -> Option<Mesh> {
        None
    }
}

/// A delegate that records logged lines in memory. Used throughout the
/// test suites to assert on `print` output.
#[derive(Debug, Default)]
pub struct RecordingDelegate {
    lines: RefCell<Vec<String>>,
}

impl RecordingDelegate {
    pub fn new() -> Self {
        Self::default()
    }

    /// The logged lines so far, one string per `print`.
    pub fn lines(&self) -> Vec<String> {
        self.lines.borrow().clone()
    }
}

impl Delegate for RecordingDelegate {
    fn debug_log(&self, values: &[Value]) {
        let line = values
            .iter()
            .map(|value| value.log_description())
            .collect::<Vec<_>>()
            .join(" ");
        self.lines.borrow_mut().push(line);
    }

    fn resolve_path(&self, _name: &str) -> Option<PathBuf> {
        None
    }

    fn read_text(&self, _path: &FsPath) -> Option<String> {
        None
    }

    fn import_geometry(&self, _path: &FsPath) -> Option<Mesh> {
        None
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn recording_delegate_joins_with_spaces() {
        let delegate = RecordingDelegate::new();
        delegate.debug_log(&[Value::Number(1.0), Value::string("two")]);
        delegate.debug_log(&[Value::Boolean(true)]);
        assert_eq!(delegate.lines(), vec!["1 two", "true"]);
    }

    #[test]
    fn null_delegate_resolves_nothing() {
        let delegate = NullDelegate;
        assert!(delegate.resolve_path("lib.shape").is_none());
        assert!(delegate.glyph_outlines("hi", None).is_none());
    }
}
