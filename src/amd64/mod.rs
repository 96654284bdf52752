//! x86-64 code generation.
//!
//! Lowering is a single depth-first walk over the AST. Every instruction is
//! written to the output as soon as it is produced; the only state carried
//! between statements is the [`Session`]: the variable table, the label
//! counter, and the writer itself.

pub mod expr;
pub mod instr;
pub mod stmt;
pub mod symbols;

use std::io::Write;

use thiserror::Error;
use tracing::debug;

use crate::lang::{Program, Span};
use instr::{Instruction, Line, Reg, ACCUMULATOR};
use symbols::{VarTable, SLOT_SIZE};

/// Read-only label of the `"%d\n"` format string passed to `printf`.
pub const FORMAT_LABEL: &str = ".LC0";
pub const ENTRY_SYMBOL: &str = "main";
pub const PRINT_SYMBOL: &str = "printf@PLT";

#[derive(Debug, Error)]
pub enum CodegenError {
    #[error("undefined variable '{name}'")]
    UndefinedVariable { name: String, span: Span },
    #[error("variable '{name}' is already declared")]
    DuplicateVariable { name: String, span: Span },
    #[error("too many variables (at most {capacity} may be declared)")]
    TooManyVariables { capacity: usize, span: Span },
    #[error("I/O while emitting assembly: {source}")]
    Io { source: std::io::Error },
}

impl CodegenError {
    pub fn span(&self) -> Option<&Span> {
        match self {
            CodegenError::UndefinedVariable { span, .. } => Some(span),
            CodegenError::DuplicateVariable { span, .. } => Some(span),
            CodegenError::TooManyVariables { span, .. } => Some(span),
            CodegenError::Io { .. } => None,
        }
    }
}

/// Mutable state of one compilation.
pub struct Session<W> {
    out: W,
    vars: VarTable,
    next_label: usize,
}

impl<W: Write> Session<W> {
    pub fn new(out: W) -> Self {
        Self::with_vars(out, VarTable::new())
    }

    pub fn with_vars(out: W, vars: VarTable) -> Self {
        Session {
            out,
            vars,
            next_label: 0,
        }
    }

    pub fn emit(&mut self, line: impl Into<Line>) -> Result<(), CodegenError> {
        writeln!(self.out, "{}", line.into()).map_err(|source| CodegenError::Io { source })
    }

    /// Next label in the compilation-wide `.L<n>` sequence.
    pub fn fresh_label(&mut self) -> String {
        let label = format!(".L{}", self.next_label);
        self.next_label += 1;
        label
    }

    pub fn labels_issued(&self) -> usize {
        self.next_label
    }

    pub fn vars(&self) -> &VarTable {
        &self.vars
    }

    pub(crate) fn vars_mut(&mut self) -> &mut VarTable {
        &mut self.vars
    }

    pub fn into_inner(self) -> W {
        self.out
    }

    /// Write the complete assembly file for `program`.
    ///
    /// The variable table and label counter are reset first, so a session
    /// may be reused for several independent programs.
    pub fn emit_program(&mut self, program: &Program) -> Result<(), CodegenError> {
        self.vars = VarTable::with_capacity(self.vars.capacity());
        self.next_label = 0;

        let frame = frame_size(program.declaration_count());
        debug!(statements = program.stmts().len(), frame, "emitting program");

        self.emit(Line::directive(".section .rodata"))?;
        self.emit(Line::label(FORMAT_LABEL))?;
        self.emit(Line::directive(r#".string "%d\n""#))?;
        self.emit(Line::directive(".text"))?;
        self.emit(Line::directive(format!(".globl {ENTRY_SYMBOL}")))?;
        self.emit(Line::label(ENTRY_SYMBOL))?;

        self.emit(Instruction::push(Reg::Rbp))?;
        self.emit(Instruction::mov(Reg::Rsp, Reg::Rbp))?;
        if frame > 0 {
            self.emit(Instruction::sub(frame, Reg::Rsp))?;
        }

        stmt::lower_block(self, program, program.stmts())?;

        self.emit(Instruction::mov(0i64, ACCUMULATOR))?;
        self.emit(Instruction::leave())?;
        self.emit(Instruction::ret())?;
        self.emit(Line::directive(r#".section .note.GNU-stack,"",@progbits"#))?;

        self.out
            .flush()
            .map_err(|source| CodegenError::Io { source })?;
        debug!(
            variables = self.vars.len(),
            labels = self.next_label,
            "program emitted"
        );
        Ok(())
    }
}

/// Bytes reserved below `%rbp` for `declarations` slots, rounded up so
/// `%rsp` stays 16-byte aligned at every `call`.
pub fn frame_size(declarations: usize) -> i64 {
    let bytes = declarations as i64 * SLOT_SIZE;
    (bytes + 15) / 16 * 16
}

/// Emit assembly for `program` into `writer` using a fresh session.
pub fn emit_program(program: &Program, writer: impl Write) -> Result<(), CodegenError> {
    Session::new(writer).emit_program(program)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::lang::parse_source;
    use insta::assert_snapshot;

    fn compile(source: &str) -> Result<String, CodegenError> {
        let program = parse_source(source).unwrap();
        let mut buffer = Vec::new();
        emit_program(&program, &mut buffer)?;
        Ok(String::from_utf8(buffer).unwrap())
    }

    #[test]
    fn emits_sum_program() {
        let asm = compile("int x; x = 1 + 2; printf(x);").unwrap();
        assert_snapshot!("emits_sum_program", asm);
    }

    #[test]
    fn empty_program_returns_zero() {
        let asm = compile("").unwrap();
        let expected = concat!(
            "    .section .rodata\n",
            ".LC0:\n",
            "    .string \"%d\\n\"\n",
            "    .text\n",
            "    .globl main\n",
            "main:\n",
            "    pushq %rbp\n",
            "    movq %rsp, %rbp\n",
            "    movq $0, %rax\n",
            "    leave\n",
            "    ret\n",
            "    .section .note.GNU-stack,\"\",@progbits\n",
        );
        assert_eq!(asm, expected);
    }

    #[test]
    fn frame_covers_every_declaration() {
        assert_eq!(frame_size(0), 0);
        assert_eq!(frame_size(1), 16);
        assert_eq!(frame_size(2), 16);
        assert_eq!(frame_size(3), 32);
        assert_eq!(frame_size(100), 800);

        let asm = compile("int a; while (a) { int b; } if (a) { int c; }").unwrap();
        assert!(asm.contains("    subq $32, %rsp\n"));
        assert!(!asm.contains("subq $8"));
    }

    #[test]
    fn undefined_variable_aborts() {
        let err = compile("printf(x);").unwrap_err();
        assert!(matches!(err, CodegenError::UndefinedVariable { ref name, .. } if name == "x"));
        let span = err.span().unwrap();
        assert_eq!((span.start, span.end), (7, 8));
    }

    #[test]
    fn too_many_declarations_abort() {
        let mut source = String::new();
        for idx in 0..symbols::MAX_VARIABLES {
            source.push_str(&format!("int v{idx};\n"));
        }
        assert!(compile(&source).is_ok());

        source.push_str("int straw;\n");
        let err = compile(&source).unwrap_err();
        assert!(matches!(err, CodegenError::TooManyVariables { capacity: 100, .. }));
    }

    #[test]
    fn reused_session_starts_fresh() {
        let first = parse_source("int a; while (a) { a = 0; }").unwrap();
        let second = parse_source("int a; if (a) { printf(a); }").unwrap();

        let mut session = Session::new(Vec::new());
        session.emit_program(&first).unwrap();
        session.emit_program(&second).unwrap();
        assert_eq!(session.vars().len(), 1);
        assert_eq!(session.labels_issued(), 2);

        let text = String::from_utf8(session.into_inner()).unwrap();
        assert_eq!(text.matches(".L0:\n").count(), 2);
    }

    struct FailingWriter;

    impl Write for FailingWriter {
        fn write(&mut self, _buf: &[u8]) -> std::io::Result<usize> {
            Err(std::io::Error::other("disk full"))
        }

        fn flush(&mut self) -> std::io::Result<()> {
            Ok(())
        }
    }

    #[test]
    fn surfaces_writer_failures() {
        let program = parse_source("printf(1);").unwrap();
        let err = emit_program(&program, FailingWriter).unwrap_err();
        assert!(matches!(err, CodegenError::Io { .. }));
        assert!(err.span().is_none());
    }
}
