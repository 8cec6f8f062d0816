//! JSON flat listings
//!
//! A listing is the flat, stack-machine view of one method body as a
//! translator would hand it over:
//!
//! ```json
//! {
//!   "name": "main",
//!   "instructions": [
//!     { "op": "ldc_i4", "value": 1 },
//!     { "op": "ldc_i4", "value": 2 },
//!     { "op": "binary", "operator": "add" }
//!   ]
//! }
//! ```
//!
//! Building a listing creates one top-level node per entry; every operand a
//! consumer takes from the stack becomes a pending `pop` child.

use crate::error::{Error, Result};
use crate::il::{BinaryOp, IlFunction, LocalId, UnaryOp};
use serde::{Deserialize, Serialize};
use std::path::Path;

/// One flat stack-machine instruction
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "op", rename_all = "snake_case")]
pub enum ListingEntry {
    LdcI4 {
        value: i32,
    },
    LdLoc {
        local: u32,
    },
    Peek,
    Unary {
        operator: UnaryOp,
    },
    Binary {
        operator: BinaryOp,
    },
    StLoc {
        local: u32,
    },
    Call {
        method: String,
        #[serde(default)]
        args: usize,
        #[serde(default)]
        returns_value: bool,
    },
    Ret {
        #[serde(default)]
        value: bool,
    },
}

impl ListingEntry {
    /// Values taken from the stack
    pub fn pops(&self) -> usize {
        match self {
            ListingEntry::LdcI4 { .. } | ListingEntry::LdLoc { .. } | ListingEntry::Peek => 0,
            ListingEntry::Unary { .. } | ListingEntry::StLoc { .. } => 1,
            ListingEntry::Binary { .. } => 2,
            ListingEntry::Call { args, .. } => *args,
            ListingEntry::Ret { value } => usize::from(*value),
        }
    }

    /// Values left on the stack
    pub fn pushes(&self) -> usize {
        match self {
            ListingEntry::StLoc { .. } | ListingEntry::Ret { .. } => 0,
            ListingEntry::Call { returns_value, .. } => usize::from(*returns_value),
            _ => 1,
        }
    }
}

/// Flat listing of one method body
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Listing {
    pub name: String,
    pub instructions: Vec<ListingEntry>,
}

impl Listing {
    pub fn from_json(text: &str) -> Result<Self> {
        Ok(serde_json::from_str(text)?)
    }

    pub fn from_path(path: &Path) -> Result<Self> {
        let text = std::fs::read_to_string(path)?;
        Self::from_json(&text)
    }

    /// Check that no entry takes more values than the stack holds
    pub fn validate(&self) -> Result<()> {
        let mut depth = 0usize;
        for (index, entry) in self.instructions.iter().enumerate() {
            let needed = match entry {
                ListingEntry::Peek => 1,
                other => other.pops(),
            };
            if needed > depth {
                return Err(Error::listing(
                    index,
                    format!("stack underflow: needs {} value(s), {} available", needed, depth),
                ));
            }
            depth = depth - entry.pops() + entry.pushes();
        }
        Ok(())
    }

    /// Build a function whose body holds one flat node per entry
    pub fn build(&self) -> Result<IlFunction> {
        self.validate()?;
        let mut func = IlFunction::new(self.name.clone());
        for entry in &self.instructions {
            let inst = match entry {
                ListingEntry::LdcI4 { value } => func.ldc_i4(*value)?,
                ListingEntry::LdLoc { local } => func.ld_loc(LocalId(*local))?,
                ListingEntry::Peek => func.peek()?,
                ListingEntry::Unary { operator } => {
                    let arg = func.pop()?;
                    func.unary(*operator, arg)?
                }
                ListingEntry::Binary { operator } => func.binary_pending(*operator)?,
                ListingEntry::StLoc { local } => {
                    let value = func.pop()?;
                    func.st_loc(LocalId(*local), value)?
                }
                ListingEntry::Call {
                    method,
                    args,
                    returns_value,
                } => func.call_pending(method.clone(), *args, *returns_value)?,
                ListingEntry::Ret { value } => {
                    let value = if *value { Some(func.pop()?) } else { None };
                    func.ret(value)?
                }
            };
            func.body.push(inst);
        }
        Ok(func)
    }
}
