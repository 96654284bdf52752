//! Typed x86-64 instructions, rendered in AT&T syntax by their `Display` impls.

use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Reg {
    Rax,
    Rcx,
    Rdx,
    Rsi,
    Rdi,
    Rbp,
    Rsp,
    /// Low byte of `%rax`.
    Al,
    /// Low byte of `%rdi`.
    Dil,
}

/// Register holding the value of the expression lowered most recently.
pub const ACCUMULATOR: Reg = Reg::Rax;
/// Register the saved left operand is popped into before a binary combine.
pub const SECONDARY: Reg = Reg::Rdi;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Operand {
    Reg(Reg),
    Imm(i64),
    /// `disp(%base)`
    Mem { disp: i64, base: Reg },
    /// `label(%rip)`
    RipRel(String),
    /// Bare symbol or label, used as a jump or call target.
    Label(String),
}

impl Operand {
    /// Stack slot at `offset` bytes from the frame base.
    pub fn frame(offset: i64) -> Self {
        Operand::Mem {
            disp: offset,
            base: Reg::Rbp,
        }
    }
}

impl From<Reg> for Operand {
    fn from(reg: Reg) -> Self {
        Operand::Reg(reg)
    }
}

impl From<i64> for Operand {
    fn from(value: i64) -> Self {
        Operand::Imm(value)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Cond {
    E,
    Ne,
    L,
    G,
    Le,
    Ge,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Opcode {
    Mov,
    Push,
    Pop,
    Add,
    Sub,
    Imul,
    Cqto,
    Idiv,
    Cmp,
    Set(Cond),
    Movzb,
    And,
    Or,
    Lea,
    Call,
    Jmp,
    Je,
    Leave,
    Ret,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Instruction {
    pub opcode: Opcode,
    /// Operands in AT&T order: source first, destination last.
    pub operands: Vec<Operand>,
}

impl Instruction {
    fn op0(opcode: Opcode) -> Self {
        Instruction {
            opcode,
            operands: Vec::new(),
        }
    }

    fn op1(opcode: Opcode, operand: impl Into<Operand>) -> Self {
        Instruction {
            opcode,
            operands: vec![operand.into()],
        }
    }

    fn op2(opcode: Opcode, src: impl Into<Operand>, dest: impl Into<Operand>) -> Self {
        Instruction {
            opcode,
            operands: vec![src.into(), dest.into()],
        }
    }

    pub fn mov(src: impl Into<Operand>, dest: impl Into<Operand>) -> Self {
        Self::op2(Opcode::Mov, src, dest)
    }

    pub fn push(reg: Reg) -> Self {
        Self::op1(Opcode::Push, reg)
    }

    pub fn pop(reg: Reg) -> Self {
        Self::op1(Opcode::Pop, reg)
    }

    pub fn add(src: impl Into<Operand>, dest: impl Into<Operand>) -> Self {
        Self::op2(Opcode::Add, src, dest)
    }

    pub fn sub(src: impl Into<Operand>, dest: impl Into<Operand>) -> Self {
        Self::op2(Opcode::Sub, src, dest)
    }

    pub fn imul(src: impl Into<Operand>, dest: impl Into<Operand>) -> Self {
        Self::op2(Opcode::Imul, src, dest)
    }

    /// Sign-extend `%rax` into `%rdx:%rax`.
    pub fn cqto() -> Self {
        Self::op0(Opcode::Cqto)
    }

    /// Signed divide `%rdx:%rax` by `divisor`; quotient lands in `%rax`.
    pub fn idiv(divisor: Reg) -> Self {
        Self::op1(Opcode::Idiv, divisor)
    }

    /// Set flags from `dest - src`.
    pub fn cmp(src: impl Into<Operand>, dest: impl Into<Operand>) -> Self {
        Self::op2(Opcode::Cmp, src, dest)
    }

    pub fn set(cond: Cond, byte_reg: Reg) -> Self {
        Self::op1(Opcode::Set(cond), byte_reg)
    }

    pub fn movzb(src: Reg, dest: Reg) -> Self {
        Self::op2(Opcode::Movzb, src, dest)
    }

    pub fn and(src: impl Into<Operand>, dest: impl Into<Operand>) -> Self {
        Self::op2(Opcode::And, src, dest)
    }

    pub fn or(src: impl Into<Operand>, dest: impl Into<Operand>) -> Self {
        Self::op2(Opcode::Or, src, dest)
    }

    pub fn lea(src: Operand, dest: Reg) -> Self {
        Self::op2(Opcode::Lea, src, dest)
    }

    pub fn call(symbol: impl Into<String>) -> Self {
        Self::op1(Opcode::Call, Operand::Label(symbol.into()))
    }

    pub fn jmp(label: impl Into<String>) -> Self {
        Self::op1(Opcode::Jmp, Operand::Label(label.into()))
    }

    pub fn je(label: impl Into<String>) -> Self {
        Self::op1(Opcode::Je, Operand::Label(label.into()))
    }

    pub fn leave() -> Self {
        Self::op0(Opcode::Leave)
    }

    pub fn ret() -> Self {
        Self::op0(Opcode::Ret)
    }
}

/// One line of assembler output.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Line {
    Directive(String),
    Label(String),
    Instruction(Instruction),
}

impl Line {
    pub fn directive(text: impl Into<String>) -> Self {
        Line::Directive(text.into())
    }

    pub fn label(name: impl Into<String>) -> Self {
        Line::Label(name.into())
    }
}

impl From<Instruction> for Line {
    fn from(inst: Instruction) -> Self {
        Line::Instruction(inst)
    }
}

impl fmt::Display for Reg {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Reg::Rax => "%rax",
            Reg::Rcx => "%rcx",
            Reg::Rdx => "%rdx",
            Reg::Rsi => "%rsi",
            Reg::Rdi => "%rdi",
            Reg::Rbp => "%rbp",
            Reg::Rsp => "%rsp",
            Reg::Al => "%al",
            Reg::Dil => "%dil",
        };
        f.write_str(name)
    }
}

impl fmt::Display for Operand {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Operand::Reg(reg) => write!(f, "{reg}"),
            Operand::Imm(value) => write!(f, "${value}"),
            Operand::Mem { disp, base } => write!(f, "{disp}({base})"),
            Operand::RipRel(label) => write!(f, "{label}(%rip)"),
            Operand::Label(name) => f.write_str(name),
        }
    }
}

impl fmt::Display for Cond {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let suffix = match self {
            Cond::E => "e",
            Cond::Ne => "ne",
            Cond::L => "l",
            Cond::G => "g",
            Cond::Le => "le",
            Cond::Ge => "ge",
        };
        f.write_str(suffix)
    }
}

impl fmt::Display for Opcode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Opcode::Mov => "movq",
            Opcode::Push => "pushq",
            Opcode::Pop => "popq",
            Opcode::Add => "addq",
            Opcode::Sub => "subq",
            Opcode::Imul => "imulq",
            Opcode::Cqto => "cqto",
            Opcode::Idiv => "idivq",
            Opcode::Cmp => "cmpq",
            Opcode::Set(cond) => return write!(f, "set{cond}"),
            Opcode::Movzb => "movzbq",
            Opcode::And => "andq",
            Opcode::Or => "orq",
            Opcode::Lea => "leaq",
            Opcode::Call => "call",
            Opcode::Jmp => "jmp",
            Opcode::Je => "je",
            Opcode::Leave => "leave",
            Opcode::Ret => "ret",
        };
        f.write_str(s)
    }
}

impl fmt::Display for Instruction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.opcode)?;
        for (idx, operand) in self.operands.iter().enumerate() {
            let sep = if idx == 0 { " " } else { ", " };
            write!(f, "{sep}{operand}")?;
        }
        Ok(())
    }
}

impl fmt::Display for Line {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Line::Directive(text) => write!(f, "    {text}"),
            Line::Label(name) => write!(f, "{name}:"),
            Line::Instruction(inst) => write!(f, "    {inst}"),
        }
    }
}
