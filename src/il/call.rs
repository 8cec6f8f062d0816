//! Method calls: any number of arguments, evaluated first to last

use super::flags::InstructionFlags;
use super::instruction::{IlFunction, InstId, InstructionKind};
use super::opcode::OpCode;
use crate::error::Result;

/// Borrowed view of a call node
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CallInstruction<'a> {
    pub method: &'a str,
    pub args: &'a [InstId],
    pub returns_value: bool,
}

impl IlFunction {
    pub fn call(
        &mut self,
        method: impl Into<String>,
        args: Vec<InstId>,
        returns_value: bool,
    ) -> Result<InstId> {
        self.alloc(
            InstructionKind::Call {
                method: method.into(),
                returns_value,
            },
            args,
        )
    }

    /// Call whose `arity` arguments all come from the evaluation stack
    pub fn call_pending(
        &mut self,
        method: impl Into<String>,
        arity: usize,
        returns_value: bool,
    ) -> Result<InstId> {
        let args = (0..arity).map(|_| self.pop()).collect::<Result<Vec<_>>>()?;
        self.call(method, args, returns_value)
    }

    pub fn as_call(&self, inst: InstId) -> Result<Option<CallInstruction<'_>>> {
        let node = self.get(inst)?;
        Ok(match node.kind() {
            InstructionKind::Call {
                method,
                returns_value,
            } => Some(CallInstruction {
                method,
                args: node.children(),
                returns_value: *returns_value,
            }),
            _ => None,
        })
    }
}

pub(crate) fn compute_flags(func: &IlFunction, inst: InstId) -> Result<InstructionFlags> {
    func.children(inst)?
        .iter()
        .try_fold(OpCode::Call.intrinsic(), |acc, &arg| {
            Ok(acc | func.flags(arg)?)
        })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_call_flags_include_arguments() {
        let mut func = IlFunction::new("test");
        let call = func.call_pending("f", 2, true).unwrap();
        let flags = func.flags(call).unwrap();
        assert!(flags.has_side_effect());
        assert!(flags.contains(InstructionFlags::MAY_POP));
    }

    #[test]
    fn test_call_view() {
        let mut func = IlFunction::new("test");
        let arg = func.ldc_i4(4).unwrap();
        let call = func.call("print", vec![arg], false).unwrap();
        let view = func.as_call(call).unwrap().unwrap();
        assert_eq!(view.method, "print");
        assert_eq!(view.args, &[arg]);
        assert!(!view.returns_value);
        assert!(!func.produces_value(call).unwrap());
    }
}
