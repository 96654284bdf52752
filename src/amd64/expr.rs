//! Expression lowering. Every expression leaves its value in [`ACCUMULATOR`].

use std::io::Write;

use crate::amd64::instr::{Cond, Instruction, Operand, Reg, ACCUMULATOR, SECONDARY};
use crate::amd64::{CodegenError, Session};
use crate::lang::{BinOp, Expr, ExprId, Program, UnaryOp};

/// Pending work while walking an expression tree.
enum Step<'p> {
    Lower(&'p ExprId),
    /// Park the finished left operand on the stack.
    SaveLeft,
    /// Pop the left operand and apply the operator.
    Combine(BinOp),
    Not,
}

/// Lowering walks the tree with an explicit work stack, so long operator
/// chains do not consume call-stack depth.
pub fn lower_expr<W: Write>(
    session: &mut Session<W>,
    program: &Program,
    id: &ExprId,
) -> Result<(), CodegenError> {
    let mut steps = vec![Step::Lower(id)];

    while let Some(step) = steps.pop() {
        match step {
            Step::Lower(id) => match program.expr(id) {
                Expr::IntLiteral { value, .. } => {
                    session.emit(Instruction::mov(*value, ACCUMULATOR))?
                }
                Expr::Var(var) => {
                    let offset = session.vars().lookup(&var.name, &var.span)?;
                    session.emit(Instruction::mov(Operand::frame(offset), ACCUMULATOR))?;
                }
                Expr::Unary {
                    op: UnaryOp::Not,
                    operand,
                    ..
                } => {
                    steps.push(Step::Not);
                    steps.push(Step::Lower(operand));
                }
                Expr::Binary {
                    op, left, right, ..
                } => {
                    steps.push(Step::Combine(*op));
                    steps.push(Step::Lower(right));
                    steps.push(Step::SaveLeft);
                    steps.push(Step::Lower(left));
                }
            },
            Step::SaveLeft => session.emit(Instruction::push(ACCUMULATOR))?,
            Step::Combine(op) => {
                session.emit(Instruction::pop(SECONDARY))?;
                combine(session, op)?;
            }
            Step::Not => {
                session.emit(Instruction::cmp(0i64, ACCUMULATOR))?;
                session.emit(Instruction::set(Cond::E, Reg::Al))?;
                session.emit(Instruction::movzb(Reg::Al, ACCUMULATOR))?;
            }
        }
    }

    Ok(())
}

/// Combine the left value in [`SECONDARY`] with the right value in
/// [`ACCUMULATOR`], leaving the result in the accumulator.
fn combine<W: Write>(session: &mut Session<W>, op: BinOp) -> Result<(), CodegenError> {
    match op {
        BinOp::Add => session.emit(Instruction::add(SECONDARY, ACCUMULATOR)),
        BinOp::Sub => {
            session.emit(Instruction::sub(ACCUMULATOR, SECONDARY))?;
            session.emit(Instruction::mov(SECONDARY, ACCUMULATOR))
        }
        BinOp::Mul => session.emit(Instruction::imul(SECONDARY, ACCUMULATOR)),
        BinOp::Div => {
            session.emit(Instruction::mov(ACCUMULATOR, Reg::Rcx))?;
            session.emit(Instruction::mov(SECONDARY, ACCUMULATOR))?;
            session.emit(Instruction::cqto())?;
            session.emit(Instruction::idiv(Reg::Rcx))
        }
        BinOp::And => {
            normalize_operands(session)?;
            session.emit(Instruction::and(SECONDARY, ACCUMULATOR))
        }
        BinOp::Or => {
            normalize_operands(session)?;
            session.emit(Instruction::or(SECONDARY, ACCUMULATOR))
        }
        BinOp::Lt => compare(session, Cond::L),
        BinOp::Gt => compare(session, Cond::G),
        BinOp::Le => compare(session, Cond::Le),
        BinOp::Ge => compare(session, Cond::Ge),
        BinOp::Eq => compare(session, Cond::E),
        BinOp::Ne => compare(session, Cond::Ne),
    }
}

fn compare<W: Write>(session: &mut Session<W>, cond: Cond) -> Result<(), CodegenError> {
    session.emit(Instruction::cmp(ACCUMULATOR, SECONDARY))?;
    session.emit(Instruction::set(cond, Reg::Al))?;
    session.emit(Instruction::movzb(Reg::Al, ACCUMULATOR))
}

/// Collapse both operands to 0 or 1.
fn normalize_operands<W: Write>(session: &mut Session<W>) -> Result<(), CodegenError> {
    session.emit(Instruction::cmp(0i64, SECONDARY))?;
    session.emit(Instruction::set(Cond::Ne, Reg::Dil))?;
    session.emit(Instruction::movzb(Reg::Dil, SECONDARY))?;
    session.emit(Instruction::cmp(0i64, ACCUMULATOR))?;
    session.emit(Instruction::set(Cond::Ne, Reg::Al))?;
    session.emit(Instruction::movzb(Reg::Al, ACCUMULATOR))
}
