//! shape-drv - The ShapeScript driver.
//!
//! Orchestrates the pipeline: read a `.shape` file, lex, parse, evaluate,
//! and hand back a [`Scene`] (children, log, warnings). The driver owns
//! the [`SourceMap`] and the diagnostic [`Handler`], renders diagnostics
//! with source snippets, and provides the `shapescript` CLI:
//!
//! ```text
//! shapescript run file.shape      evaluate and print the scene outline
//! shapescript parse file.shape    syntax-check only
//! shapescript tokens file.shape   dump the token stream
//! ```
//!
//! Exit codes: 0 on success, 1 on any error.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::{bail, Context};
use shape_eval::{Delegate, Evaluator, Value};
use shape_geom::{CancellationToken, DefaultKernel, GeometryCache, MeshKernel};
use shape_par::ast::Program;
use shape_util::diagnostic::{Diagnostic, Handler, SourceSnippet};
use shape_util::span::{SourceMap, Span};

/// What the CLI was asked to do.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Mode {
    /// Evaluate and print the scene outline and log.
    Run,
    /// Stop after parsing.
    Parse,
    /// Dump the token stream.
    Tokens,
}

/// Driver configuration.
#[derive(Clone, Debug)]
pub struct Config {
    pub mode: Mode,
    pub input: PathBuf,
    /// Suppress the scene outline (log lines still print).
    pub quiet: bool,
}

impl Config {
    /// Parse command-line arguments (excluding the program name).
    pub fn from_args(args: impl IntoIterator<Item = String>) -> anyhow::Result<Config> {
        let mut mode = None;
        let mut input = None;
        let mut quiet = false;
        for arg in args {
            match arg.as_str() {
                "run" | "parse" | "tokens" if mode.is_none() && input.is_none() => {
                    mode = Some(match arg.as_str() {
                        "run" => Mode::Run,
                        "parse" => Mode::Parse,
                        _ => Mode::Tokens,
                    });
                }
                "--quiet" | "-q" => quiet = true,
                "--help" | "-h" => bail!("{}", USAGE),
                flag if flag.starts_with('-') => {
                    bail!("unknown option '{}'\n{}", flag, USAGE)
                }
                path => {
                    if input.replace(PathBuf::from(path)).is_some() {
                        bail!("expected a single input file\n{}", USAGE);
                    }
                }
            }
        }
        let input = match input {
            Some(input) => input,
            None => bail!("no input file\n{}", USAGE),
        };
        Ok(Config {
            mode: mode.unwrap_or(Mode::Run),
            input,
            quiet,
        })
    }
}

const USAGE: &str = "usage: shapescript [run|parse|tokens] <file.shape> [--quiet]";

/// The result of evaluating a program.
pub struct Scene {
    /// Top-level emitted values, usually geometry.
    pub children: Vec<Value>,
    /// Values logged by `print`, in order.
    pub log: Vec<Value>,
    /// Non-fatal diagnostics (unused values, unresolved files).
    pub warnings: Vec<Diagnostic>,
}

/// A delegate that resolves resources relative to the program file, reads
/// them from disk, and logs to stderr.
pub struct FileDelegate {
    base_dir: PathBuf,
}

impl FileDelegate {
    pub fn new(base_dir: impl Into<PathBuf>) -> Self {
        Self {
            base_dir: base_dir.into(),
        }
    }
}

impl Delegate for FileDelegate {
    fn debug_log(&self, values: &[Value]) {
        let line = values
            .iter()
            .map(|value| value.log_description())
            .collect::<Vec<_>>()
            .join(" ");
        eprintln!("{}", line);
    }

    fn resolve_path(&self, name: &str) -> Option<PathBuf> {
        let candidate = self.base_dir.join(name);
        candidate.exists().then_some(candidate)
    }

    fn read_text(&self, path: &Path) -> Option<String> {
        std::fs::read_to_string(path).ok()
    }

    fn import_geometry(&self, _path: &Path) -> Option<shape_geom::Mesh> {
        // Mesh decoders are host concerns; the CLI ships without one.
        None
    }
}

/// One driver invocation: sources, diagnostics, kernel, and cache.
pub struct Session {
    pub sources: SourceMap,
    pub handler: Handler,
    kernel: DefaultKernel,
    cache: Arc<GeometryCache>,
    cancel: CancellationToken,
}

impl Session {
    pub fn new() -> Self {
        Self {
            sources: SourceMap::new(),
            handler: Handler::new(),
            kernel: DefaultKernel::new(),
            cache: Arc::new(GeometryCache::new()),
            cancel: CancellationToken::new(),
        }
    }

    /// The geometry cache, shared with any meshes built from the scene.
    pub fn cache(&self) -> Arc<GeometryCache> {
        self.cache.clone()
    }

    /// A token that aborts an in-flight evaluation when cancelled.
    pub fn cancellation_token(&self) -> CancellationToken {
        self.cancel.clone()
    }

    /// Parse a source string, emitting any syntax error to the handler.
    pub fn parse_source(&mut self, name: &str, source: &str) -> Option<Program> {
        let file_id = self.sources.add_file(name, source);
        match shape_par::parse_source(source, file_id) {
            Ok(program) => Some(program),
            Err(err) => {
                self.emit_with_snippet(err.to_diagnostic());
                None
            }
        }
    }

    /// Parse and evaluate a source string against a delegate.
    ///
    /// Returns `None` when a syntax or runtime error was emitted to the
    /// handler; warnings alone do not prevent a scene.
    pub fn evaluate_source(
        &mut self,
        name: &str,
        source: &str,
        delegate: &dyn Delegate,
    ) -> Option<Scene> {
        let program = self.parse_source(name, source)?;
        let mut evaluator = Evaluator::new(
            delegate,
            &self.kernel,
            self.cache.clone(),
            self.cancel.clone(),
        );
        if let Err(err) = evaluator.evaluate(&program) {
            self.emit_with_snippet(err.to_diagnostic());
            return None;
        }
        let scene = Scene {
            children: evaluator.take_children(),
            log: evaluator.log.clone(),
            warnings: evaluator.warnings.clone(),
        };
        for warning in &scene.warnings {
            self.emit_with_snippet(warning.clone());
        }
        Some(scene)
    }

    /// Read and evaluate a `.shape` file, resolving imports relative to
    /// its directory.
    pub fn evaluate_file(&mut self, path: &Path) -> anyhow::Result<Option<Scene>> {
        let source = std::fs::read_to_string(path)
            .with_context(|| format!("cannot read '{}'", path.display()))?;
        let base_dir = path.parent().unwrap_or(Path::new(".")).to_path_buf();
        let delegate = FileDelegate::new(base_dir);
        Ok(self.evaluate_source(&path.display().to_string(), &source, &delegate))
    }

    /// Attach the offending source line to a diagnostic and record it.
    fn emit_with_snippet(&self, mut diagnostic: Diagnostic) {
        if let Some(snippet) = self.snippet_for(diagnostic.span) {
            diagnostic.snippets.push(snippet);
        }
        self.handler.emit(diagnostic);
    }

    fn snippet_for(&self, span: Span) -> Option<SourceSnippet> {
        let file = self.sources.get(span.file_id)?;
        let (line_number, start_column) = file.offset_to_line_col(span.start);
        let line = file.line_at(line_number)?.trim_end().to_string();
        let end_column = if span.is_empty() {
            start_column + 1
        } else {
            let (end_line, end_column) = file.offset_to_line_col(span.end.saturating_sub(1));
            if end_line == line_number {
                end_column + 1
            } else {
                line.len() + 1
            }
        };
        Some(SourceSnippet::new(
            line,
            line_number,
            start_column,
            end_column,
            None::<String>,
        ))
    }

    /// Render every collected diagnostic the way the CLI prints them.
    pub fn render_diagnostics(&self) -> String {
        let mut output = String::new();
        for diagnostic in self.handler.diagnostics() {
            output.push_str(&render_diagnostic(&diagnostic, &self.sources));
        }
        output
    }
}

impl Default for Session {
    fn default() -> Self {
        Self::new()
    }
}

/// Render one diagnostic with its location and source snippet.
pub fn render_diagnostic(diagnostic: &Diagnostic, sources: &SourceMap) -> String {
    use std::fmt::Write;

    let mut out = String::new();
    match diagnostic.code {
        Some(code) => {
            let _ = writeln!(out, "{}[{}]: {}", diagnostic.level, code, diagnostic.message);
        }
        None => {
            let _ = writeln!(out, "{}: {}", diagnostic.level, diagnostic.message);
        }
    }
    if let Some(file) = sources.get(diagnostic.span.file_id) {
        let (line, column) = file.offset_to_line_col(diagnostic.span.start);
        let _ = writeln!(out, " --> {}:{}:{}", file.name(), line, column);
    }
    for snippet in &diagnostic.snippets {
        let gutter = snippet.line_number.to_string();
        let _ = writeln!(out, " {} | {}", gutter, snippet.line);
        let width = snippet.end_column.saturating_sub(snippet.start_column).max(1);
        let _ = writeln!(
            out,
            " {} | {}{}",
            " ".repeat(gutter.len()),
            " ".repeat(snippet.start_column.saturating_sub(1)),
            "^".repeat(width)
        );
    }
    if let Some(hint) = &diagnostic.hint {
        let _ = writeln!(out, "hint: {}", hint);
    }
    out
}

/// A one-line description of a scene child for the outline.
fn describe_child(
    value: &Value,
    kernel: &dyn MeshKernel,
    cache: &GeometryCache,
    cancel: &CancellationToken,
) -> String {
    match value {
        Value::Mesh(geometry) => match geometry.build_mesh(kernel, cache, cancel) {
            Ok(mesh) => format!(
                "mesh ({} polygons{})",
                mesh.polygon_count(),
                if mesh.is_watertight() {
                    ", watertight"
                } else {
                    ""
                }
            ),
            Err(err) => format!("mesh (build failed: {})", err),
        },
        Value::Path(path) => format!(
            "path ({} points{})",
            path.points.len(),
            if path.closed { ", closed" } else { "" }
        ),
        Value::Polygon(polygon) => format!("polygon ({} points)", polygon.points.len()),
        other => other.type_description().to_string(),
    }
}

/// Run the CLI. Parses `std::env::args`, executes the requested mode, and
/// prints diagnostics to stderr.
pub fn main() -> anyhow::Result<()> {
    let config = Config::from_args(std::env::args().skip(1))?;
    run_with_config(&config)
}

/// Execute one configured invocation.
pub fn run_with_config(config: &Config) -> anyhow::Result<()> {
    let mut session = Session::new();
    match config.mode {
        Mode::Tokens => {
            let source = std::fs::read_to_string(&config.input)
                .with_context(|| format!("cannot read '{}'", config.input.display()))?;
            let file_id = session
                .sources
                .add_file(config.input.display().to_string(), source.as_str());
            match shape_lex::tokenize(&source, file_id) {
                Ok(tokens) => {
                    for token in &tokens {
                        println!(
                            "{:>5}..{:<5} {}",
                            token.span.start,
                            token.span.end,
                            token.kind.describe()
                        );
                    }
                }
                Err(err) => {
                    session.emit_with_snippet(err.to_diagnostic());
                }
            }
        }
        Mode::Parse => {
            let source = std::fs::read_to_string(&config.input)
                .with_context(|| format!("cannot read '{}'", config.input.display()))?;
            if let Some(program) =
                session.parse_source(&config.input.display().to_string(), &source)
            {
                if !config.quiet {
                    println!("parsed {} statements", program.statements.len());
                }
            }
        }
        Mode::Run => {
            if let Some(scene) = session.evaluate_file(&config.input)? {
                if !config.quiet {
                    let kernel = DefaultKernel::new();
                    let cache = session.cache();
                    let cancel = session.cancellation_token();
                    println!("scene: {} children", scene.children.len());
                    for (index, child) in scene.children.iter().enumerate() {
                        println!(
                            "  [{}] {}",
                            index,
                            describe_child(child, &kernel, &cache, &cancel)
                        );
                    }
                }
            }
        }
    }

    eprint!("{}", session.render_diagnostics());
    if session.handler.has_errors() {
        bail!("evaluation failed");
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use shape_eval::NullDelegate;

    #[test]
    fn config_parses_modes_and_flags() {
        let config =
            Config::from_args(["run".to_string(), "scene.shape".to_string()]).unwrap();
        assert_eq!(config.mode, Mode::Run);
        assert_eq!(config.input, PathBuf::from("scene.shape"));
        assert!(!config.quiet);

        let config = Config::from_args([
            "tokens".to_string(),
            "scene.shape".to_string(),
            "--quiet".to_string(),
        ])
        .unwrap();
        assert_eq!(config.mode, Mode::Tokens);
        assert!(config.quiet);

        // Bare file defaults to run.
        let config = Config::from_args(["scene.shape".to_string()]).unwrap();
        assert_eq!(config.mode, Mode::Run);
    }

    #[test]
    fn config_rejects_bad_invocations() {
        assert!(Config::from_args(Vec::<String>::new()).is_err());
        assert!(Config::from_args(["--wat".to_string()]).is_err());
        assert!(
            Config::from_args(["a.shape".to_string(), "b.shape".to_string()]).is_err()
        );
    }

    #[test]
    fn evaluate_source_produces_a_scene() {
        let mut session = Session::new();
        let scene = session
            .evaluate_source("test.shape", "cube\nprint 42", &NullDelegate)
            .expect("scene");
        assert_eq!(scene.children.len(), 1);
        assert_eq!(scene.log, vec![Value::Number(42.0)]);
        assert!(!session.handler.has_errors());
    }

    #[test]
    fn syntax_errors_render_with_snippets() {
        let mut session = Session::new();
        let scene = session.evaluate_source(
            "bad.shape",
            "print 1 < 2 < 3",
            &NullDelegate,
        );
        assert!(scene.is_none());
        assert!(session.handler.has_errors());
        let rendered = session.render_diagnostics();
        assert!(rendered.contains("bad.shape:1:13"));
        assert!(rendered.contains("print 1 < 2 < 3"));
        assert!(rendered.contains("^"));
    }

    #[test]
    fn runtime_errors_carry_hints() {
        let mut session = Session::new();
        assert!(session
            .evaluate_source("typo.shape", "qube", &NullDelegate)
            .is_none());
        let rendered = session.render_diagnostics();
        assert!(rendered.contains("unknown symbol 'qube'"));
        assert!(rendered.contains("Did you mean 'cube'?"));
    }

    #[test]
    fn warnings_do_not_block_the_scene() {
        let mut session = Session::new();
        let scene = session
            .evaluate_source("warn.shape", "42\ncube", &NullDelegate)
            .expect("scene");
        assert_eq!(scene.children.len(), 1);
        assert_eq!(scene.warnings.len(), 1);
        assert!(!session.handler.has_errors());
        assert!(session.render_diagnostics().contains("warning"));
    }
}
