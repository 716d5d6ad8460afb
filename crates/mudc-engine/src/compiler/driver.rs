//! Source loading and whole-program compilation.
//!
//! A [`Session`] owns the compiler context plus every source text it has
//! seen, so diagnostics can point back into the right file. `include`
//! statements push onto a depth-limited input stack; paths resolve
//! relative to the including file.

use crate::compiler::{
    CompileError, CompileOutput, Compiler, CompilerOptions, ErrorPolicy, ImageError,
};
use crate::parser::{parse_source, LexError, ParseError, SourceError, Span, Statement};
use std::path::{Path, PathBuf};
use thiserror::Error;

/// One loaded source text. Diagnostics index into the session's file
/// list to find theirs.
#[derive(Debug, Clone)]
pub struct SourceFile {
    /// Display name (path as given, or a synthetic name).
    pub name: String,
    pub text: String,
}

/// A compile-time problem anchored to one loaded file.
#[derive(Debug, Clone)]
pub struct Diagnostic {
    /// Index into [`Session::files`].
    pub file: usize,
    pub kind: DiagnosticKind,
}

#[derive(Debug, Clone)]
pub enum DiagnosticKind {
    Lex(LexError),
    Parse(ParseError),
    Compile(CompileError),
}

impl Diagnostic {
    pub fn message(&self) -> String {
        match &self.kind {
            DiagnosticKind::Lex(e) => e.to_string(),
            DiagnosticKind::Parse(e) => e.to_string(),
            DiagnosticKind::Compile(e) => e.to_string(),
        }
    }

    pub fn span(&self) -> Span {
        match &self.kind {
            DiagnosticKind::Lex(e) => e.span(),
            DiagnosticKind::Parse(e) => e.span(),
            DiagnosticKind::Compile(e) => e.span(),
        }
    }
}

#[derive(Debug, Error)]
pub enum SessionError {
    #[error("cannot read {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// Problems were reported; the details are in
    /// [`Session::diagnostics`].
    #[error("{count} error(s) reported")]
    Reported { count: usize },

    #[error(transparent)]
    Image(#[from] ImageError),
}

/// One compilation from sources to image.
#[derive(Debug)]
pub struct Session {
    compiler: Compiler,
    files: Vec<SourceFile>,
    diagnostics: Vec<Diagnostic>,
}

impl Session {
    pub fn new(options: CompilerOptions) -> Self {
        Self {
            compiler: Compiler::new(options),
            files: Vec::new(),
            diagnostics: Vec::new(),
        }
    }

    pub fn files(&self) -> &[SourceFile] {
        &self.files
    }

    pub fn diagnostics(&self) -> &[Diagnostic] {
        &self.diagnostics
    }

    pub fn compiler(&self) -> &Compiler {
        &self.compiler
    }

    /// Compile a file from disk, following its includes.
    pub fn compile_file(&mut self, path: &Path) -> Result<(), SessionError> {
        let text = std::fs::read_to_string(path).map_err(|source| SessionError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        let base = path.parent().map(Path::to_path_buf).unwrap_or_default();
        let file = self.add_file(path.display().to_string(), text);
        self.run(file, &base, 0)
    }

    /// Compile an in-memory source text. Includes resolve relative to
    /// the working directory.
    pub fn compile_source(&mut self, name: &str, text: &str) -> Result<(), SessionError> {
        let file = self.add_file(name.to_string(), text.to_string());
        self.run(file, Path::new(""), 0)
    }

    /// Run region resolution and image emission over everything
    /// compiled so far.
    pub fn finish(&mut self) -> Result<CompileOutput, SessionError> {
        if !self.diagnostics.is_empty() {
            return Err(SessionError::Reported {
                count: self.diagnostics.len(),
            });
        }
        Ok(self.compiler.finish()?)
    }

    fn add_file(&mut self, name: String, text: String) -> usize {
        self.files.push(SourceFile { name, text });
        self.files.len() - 1
    }

    fn run(&mut self, file: usize, base: &Path, depth: usize) -> Result<(), SessionError> {
        let statements = match parse_source(&self.files[file].text) {
            Ok(statements) => statements,
            Err(SourceError::Lex(errors)) => {
                // Syntax problems invalidate the whole file; later
                // statements are skipped even under the continue policy.
                for error in errors {
                    self.report(file, DiagnosticKind::Lex(error))?;
                }
                return Ok(());
            }
            Err(SourceError::Parse(error)) => {
                return self.report(file, DiagnosticKind::Parse(error));
            }
        };
        for statement in &statements {
            let result = match statement {
                Statement::Include { path, span } => {
                    self.run_include(file, base, depth, path, *span)?;
                    continue;
                }
                other => self.compiler.execute(other),
            };
            if let Err(error) = result {
                self.report(file, DiagnosticKind::Compile(error))?;
            }
        }
        Ok(())
    }

    fn run_include(
        &mut self,
        file: usize,
        base: &Path,
        depth: usize,
        path: &str,
        span: Span,
    ) -> Result<(), SessionError> {
        let limit = self.compiler.options().include_limit;
        if depth + 1 > limit {
            return self.report(
                file,
                DiagnosticKind::Compile(CompileError::IncludeDepthExceeded { limit, span }),
            );
        }
        let resolved = base.join(path);
        let text = match std::fs::read_to_string(&resolved) {
            Ok(text) => text,
            Err(error) => {
                return self.report(
                    file,
                    DiagnosticKind::Compile(CompileError::IncludeFailed {
                        path: resolved.display().to_string(),
                        reason: error.to_string(),
                        span,
                    }),
                );
            }
        };
        let next_base = resolved.parent().map(Path::to_path_buf).unwrap_or_default();
        let included = self.add_file(resolved.display().to_string(), text);
        self.run(included, &next_base, depth + 1)
    }

    /// Record a diagnostic; under the abort policy it stops the session.
    fn report(&mut self, file: usize, kind: DiagnosticKind) -> Result<(), SessionError> {
        self.diagnostics.push(Diagnostic { file, kind });
        match self.compiler.options().error_policy {
            ErrorPolicy::Abort => Err(SessionError::Reported {
                count: self.diagnostics.len(),
            }),
            ErrorPolicy::Continue => Ok(()),
        }
    }
}
