use std::io::Write;

use crate::amd64::expr::lower_expr;
use crate::amd64::instr::{Instruction, Line, Operand, Reg, ACCUMULATOR};
use crate::amd64::{CodegenError, Session, FORMAT_LABEL, PRINT_SYMBOL};
use crate::lang::{Program, Stmt};

/// Lower a statement sequence in source order.
pub fn lower_block<W: Write>(
    session: &mut Session<W>,
    program: &Program,
    stmts: &[Stmt],
) -> Result<(), CodegenError> {
    for stmt in stmts {
        lower_stmt(session, program, stmt)?;
    }
    Ok(())
}

pub fn lower_stmt<W: Write>(
    session: &mut Session<W>,
    program: &Program,
    stmt: &Stmt,
) -> Result<(), CodegenError> {
    match stmt {
        Stmt::VarDecl { name, init, span } => {
            // The initializer cannot see the name it initializes.
            if let Some(init) = init {
                lower_expr(session, program, init)?;
            }
            let offset = session.vars_mut().declare(name, span)?;
            if init.is_some() {
                session.emit(Instruction::mov(ACCUMULATOR, Operand::frame(offset)))?;
            }
            Ok(())
        }
        Stmt::Assign { target, value, .. } => {
            lower_expr(session, program, value)?;
            let offset = session.vars().lookup(&target.name, &target.span)?;
            session.emit(Instruction::mov(ACCUMULATOR, Operand::frame(offset)))
        }
        Stmt::Print { value, .. } => {
            lower_expr(session, program, value)?;
            session.emit(Instruction::mov(ACCUMULATOR, Reg::Rsi))?;
            session.emit(Instruction::lea(
                Operand::RipRel(FORMAT_LABEL.to_string()),
                Reg::Rdi,
            ))?;
            // Variadic call: no vector registers carry arguments.
            session.emit(Instruction::mov(0i64, Reg::Rax))?;
            session.emit(Instruction::call(PRINT_SYMBOL))
        }
        Stmt::While {
            condition, body, ..
        } => {
            let start = session.fresh_label();
            let end = session.fresh_label();

            session.emit(Line::label(&start))?;
            lower_expr(session, program, condition)?;
            session.emit(Instruction::cmp(0i64, ACCUMULATOR))?;
            session.emit(Instruction::je(&end))?;
            lower_block(session, program, body)?;
            session.emit(Instruction::jmp(start))?;
            session.emit(Line::label(end))
        }
        Stmt::If {
            condition,
            then_body,
            else_body,
            ..
        } => {
            let otherwise = session.fresh_label();
            let end = session.fresh_label();

            lower_expr(session, program, condition)?;
            session.emit(Instruction::cmp(0i64, ACCUMULATOR))?;
            session.emit(Instruction::je(&otherwise))?;
            lower_block(session, program, then_body)?;
            session.emit(Instruction::jmp(&end))?;
            session.emit(Line::label(otherwise))?;
            if let Some(body) = else_body {
                lower_block(session, program, body)?;
            }
            session.emit(Line::label(end))
        }
    }
}
