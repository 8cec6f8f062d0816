//! Textual rendering as a read-only visitor
//!
//! Composite nodes render as `opcode(child, ...)`, leaves as their opcode
//! followed by the operand, e.g. `mul(add(ldc.i4 1, ldc.i4 2), ldc.i4 3)`.

use super::instruction::{IlFunction, InstId, LocalId};
use super::opcode::{BinaryOp, OpCode, UnaryOp};
use super::visitor::IlVisitor;
use crate::error::{Error, Result};
use std::fmt::{self, Write};

/// Writes the textual form of a subtree into any `fmt::Write` sink
pub struct TextWriter<'w, W: Write + ?Sized> {
    out: &'w mut W,
}

impl<'w, W: Write + ?Sized> TextWriter<'w, W> {
    pub fn new(out: &'w mut W) -> Self {
        Self { out }
    }

    fn text(&mut self, text: impl fmt::Display) -> Result<()> {
        write!(self.out, "{}", text).map_err(|_| Error::internal("failed to write instruction text"))
    }

    fn composite(&mut self, func: &IlFunction, head: &str, children: &[InstId]) -> Result<()> {
        self.text(head)?;
        self.text('(')?;
        for (i, &child) in children.iter().enumerate() {
            if i > 0 {
                self.text(", ")?;
            }
            func.accept(child, self)??;
        }
        self.text(')')
    }
}

impl<W: Write + ?Sized> IlVisitor for TextWriter<'_, W> {
    type Output = Result<()>;

    fn visit_ldc_i4(&mut self, _func: &IlFunction, _inst: InstId, value: i32) -> Result<()> {
        self.text(format_args!("{} {}", OpCode::LdcI4, value))
    }

    fn visit_ld_loc(&mut self, _func: &IlFunction, _inst: InstId, local: LocalId) -> Result<()> {
        self.text(format_args!("{} {}", OpCode::LdLoc, local))
    }

    fn visit_pop(&mut self, _func: &IlFunction, _inst: InstId) -> Result<()> {
        self.text(OpCode::Pop)
    }

    fn visit_peek(&mut self, _func: &IlFunction, _inst: InstId) -> Result<()> {
        self.text(OpCode::Peek)
    }

    fn visit_unary(&mut self, func: &IlFunction, _inst: InstId, op: UnaryOp, arg: InstId) -> Result<()> {
        self.composite(func, op.name(), &[arg])
    }

    fn visit_binary(
        &mut self,
        func: &IlFunction,
        _inst: InstId,
        op: BinaryOp,
        left: InstId,
        right: InstId,
    ) -> Result<()> {
        self.composite(func, op.name(), &[left, right])
    }

    fn visit_st_loc(
        &mut self,
        func: &IlFunction,
        _inst: InstId,
        local: LocalId,
        value: InstId,
    ) -> Result<()> {
        let head = format!("{} {}", OpCode::StLoc, local);
        self.composite(func, &head, &[value])
    }

    fn visit_call(
        &mut self,
        func: &IlFunction,
        _inst: InstId,
        method: &str,
        args: &[InstId],
        _returns_value: bool,
    ) -> Result<()> {
        let head = format!("{} {}", OpCode::Call, method);
        self.composite(func, &head, args)
    }

    fn visit_return(&mut self, func: &IlFunction, _inst: InstId, value: Option<InstId>) -> Result<()> {
        match value {
            Some(value) => self.composite(func, OpCode::Return.name(), &[value]),
            None => self.text(OpCode::Return),
        }
    }
}

/// `Display` adapter for one subtree
pub struct InstructionDisplay<'a> {
    func: &'a IlFunction,
    inst: InstId,
}

impl fmt::Display for InstructionDisplay<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut writer = TextWriter::new(f);
        match self.func.accept(self.inst, &mut writer) {
            Ok(Ok(())) => Ok(()),
            _ => Err(fmt::Error),
        }
    }
}

impl IlFunction {
    /// Render `inst` into `sink`
    pub fn render_to<W: Write + ?Sized>(&self, inst: InstId, sink: &mut W) -> Result<()> {
        self.accept(inst, &mut TextWriter::new(sink))?
    }

    pub fn render(&self, inst: InstId) -> Result<String> {
        let mut text = String::new();
        self.render_to(inst, &mut text)?;
        Ok(text)
    }

    pub fn display(&self, inst: InstId) -> InstructionDisplay<'_> {
        InstructionDisplay { func: self, inst }
    }
}

impl fmt::Display for IlFunction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "function {} {{", self.name())?;
        for &inst in self.body.instructions() {
            writeln!(f, "    {}", self.display(inst))?;
        }
        write!(f, "}}")
    }
}
