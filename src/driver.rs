//! Source file in, assembly file out.

use std::fs;
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};

use tempfile::NamedTempFile;
use thiserror::Error;
use tracing::{debug, info, warn};

use crate::amd64::{self, CodegenError};
use crate::lang::{self, FrontendError, Program};

/// Mode of the written assembly file on Unix.
pub const OUTPUT_MODE: u32 = 0o644;

#[derive(Debug, Error)]
pub enum CompileError {
    #[error(transparent)]
    Frontend(#[from] FrontendError),
    #[error(transparent)]
    Codegen(#[from] CodegenError),
    #[error("failed to read {}: {source}", path.display())]
    ReadInput {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error("failed to write {}: {source}", path.display())]
    WriteOutput {
        path: PathBuf,
        source: std::io::Error,
    },
}

impl CompileError {
    /// Byte range in the source the error points at, if any.
    pub fn span_range(&self) -> Option<(usize, usize)> {
        match self {
            CompileError::Frontend(err) => Some(err.span_range()),
            CompileError::Codegen(err) => err.span().map(|span| (span.start, span.end)),
            CompileError::ReadInput { .. } | CompileError::WriteOutput { .. } => None,
        }
    }
}

pub fn read_source(path: &Path) -> Result<String, CompileError> {
    fs::read_to_string(path).map_err(|source| CompileError::ReadInput {
        path: path.to_path_buf(),
        source,
    })
}

fn parse(source: &str) -> Result<Program, CompileError> {
    let program = lang::parse_source(source)?;
    info!(
        statements = program.stmts().len(),
        expressions = program.expr_count(),
        "parsing complete"
    );
    if program.is_empty() {
        warn!("empty program");
    }
    Ok(program)
}

/// Compile `source` to assembly text held in memory.
pub fn compile_source(source: &str) -> Result<String, CompileError> {
    let program = parse(source)?;
    let mut buffer = Vec::new();
    amd64::emit_program(&program, &mut buffer)?;
    info!(bytes = buffer.len(), "code generation complete");
    Ok(String::from_utf8_lossy(&buffer).into_owned())
}

/// Compile `source` into the file at `output`.
///
/// Assembly is written to a temporary file next to `output` and only renamed
/// into place once code generation succeeds; on failure `output` is untouched.
pub fn compile_to_file(source: &str, output: &Path) -> Result<(), CompileError> {
    let write_err = |source: std::io::Error| CompileError::WriteOutput {
        path: output.to_path_buf(),
        source,
    };

    let program = parse(source)?;

    let dir = match output.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent,
        _ => Path::new("."),
    };
    let tmp = NamedTempFile::new_in(dir).map_err(write_err)?;
    // The temporary is created private; the finished file should not be.
    #[cfg(unix)]
    {
        use std::os::unix::fs::PermissionsExt;
        tmp.as_file()
            .set_permissions(fs::Permissions::from_mode(OUTPUT_MODE))
            .map_err(write_err)?;
    }
    debug!(tmp = %tmp.path().display(), "writing assembly");

    let mut writer = BufWriter::new(tmp);
    amd64::emit_program(&program, &mut writer)?;
    writer.flush().map_err(write_err)?;
    let tmp = writer
        .into_inner()
        .map_err(|err| write_err(err.into_error()))?;

    tmp.persist(output).map_err(|err| write_err(err.error))?;
    info!(output = %output.display(), "code generation complete");
    Ok(())
}

/// Read `input` and compile it into `output`.
pub fn compile_file(input: &Path, output: &Path) -> Result<(), CompileError> {
    let source = read_source(input)?;
    compile_to_file(&source, output)
}

/// Render `err` for the terminal, quoting the offending source line when the
/// error carries a location.
pub fn format_error(source: &str, err: &CompileError) -> String {
    match err.span_range() {
        Some((start, end)) => lang::render_snippet(source, start, end, &err.to_string()),
        None => format!("error: {err}"),
    }
}
