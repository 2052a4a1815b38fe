//! Textual rendering of functions and modules.
//!
//! The format is generic-op shaped: results, quoted op name, operands,
//! nested regions, attributes, and the operand/result type signature. It
//! exists for debugging and test assertions, not for round-tripping.

use std::collections::HashMap;
use std::fmt;

use crate::func::{Function, Visibility};
use crate::module::Module;
use crate::op::{BlockId, OpId, Value};

struct Printer<'f> {
    func: &'f Function,
    names: HashMap<Value, String>,
    next_result: usize,
    next_arg: usize,
}

impl<'f> Printer<'f> {
    fn new(func: &'f Function) -> Self {
        Self { func, names: HashMap::new(), next_result: 0, next_arg: 0 }
    }

    fn name_block_args(&mut self, block: BlockId) {
        for i in 0..self.func.block(block).args().len() {
            let name = format!("%arg{}", self.next_arg);
            self.next_arg += 1;
            self.names.insert(Value::arg(block, i), name);
        }
    }

    fn name_results(&mut self, op: OpId) {
        let count = self.func.op(op).num_results();
        if count == 0 {
            return;
        }
        let base = format!("%{}", self.next_result);
        self.next_result += 1;
        for i in 0..count {
            let name = if i == 0 { base.clone() } else { format!("{base}#{i}") };
            self.names.insert(Value::result(op, i), name);
        }
    }

    fn value_name(&self, value: Value) -> &str {
        self.names.get(&value).map_or("%?", String::as_str)
    }

    fn write_block(&mut self, out: &mut fmt::Formatter<'_>, block: BlockId, indent: usize) -> fmt::Result {
        for i in 0..self.func.block(block).ops().len() {
            let op = self.func.block(block).ops()[i];
            self.write_op(out, op, indent)?;
        }
        Ok(())
    }

    fn write_op(&mut self, out: &mut fmt::Formatter<'_>, op: OpId, indent: usize) -> fmt::Result {
        self.name_results(op);
        let func = self.func;
        let data = func.op(op);
        write!(out, "{:indent$}", "", indent = indent)?;
        if data.num_results() > 0 {
            write!(out, "{} = ", self.value_name(Value::result(op, 0)))?;
        }
        write!(out, "\"{}\"(", data.name())?;
        for (i, &operand) in data.operand_values().iter().enumerate() {
            if i > 0 {
                write!(out, ", ")?;
            }
            write!(out, "{}", self.value_name(operand))?;
        }
        write!(out, ")")?;

        for region in data.region_list() {
            writeln!(out, " ({{")?;
            for &block in region.blocks.iter() {
                self.name_block_args(block);
                if !self.func.block(block).args().is_empty() {
                    write!(out, "{:indent$}^bb(", "", indent = indent + 2)?;
                    for (i, ty) in self.func.block(block).args().iter().enumerate() {
                        if i > 0 {
                            write!(out, ", ")?;
                        }
                        write!(out, "{}: {ty}", self.value_name(Value::arg(block, i)))?;
                    }
                    writeln!(out, "):")?;
                }
                self.write_block(out, block, indent + 2)?;
            }
            write!(out, "{:indent$}}})", "", indent = indent)?;
        }

        if !data.attrs().is_empty() {
            write!(out, " {{")?;
            for (i, (name, attr)) in data.attrs().iter().enumerate() {
                if i > 0 {
                    write!(out, ", ")?;
                }
                if attr.is_unit() {
                    write!(out, "{name}")?;
                } else {
                    write!(out, "{name} = {attr}")?;
                }
            }
            write!(out, "}}")?;
        }

        write!(out, " : (")?;
        for (i, &operand) in data.operand_values().iter().enumerate() {
            if i > 0 {
                write!(out, ", ")?;
            }
            write!(out, "{}", self.func.value_type(operand))?;
        }
        write!(out, ") -> (")?;
        for (i, ty) in data.result_types().iter().enumerate() {
            if i > 0 {
                write!(out, ", ")?;
            }
            write!(out, "{ty}")?;
        }
        writeln!(out, ")")
    }
}

impl fmt::Display for Function {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut printer = Printer::new(self);
        write!(f, "func ")?;
        if self.visibility() == Visibility::Private {
            write!(f, "private ")?;
        }
        write!(f, "@{}(", self.name())?;
        printer.name_block_args(self.entry());
        for (i, ty) in self.block(self.entry()).args().iter().enumerate() {
            if i > 0 {
                write!(f, ", ")?;
            }
            write!(f, "{}: {ty}", printer.value_name(Value::arg(self.entry(), i)))?;
        }
        write!(f, ") -> (")?;
        for (i, ty) in self.ty().results.iter().enumerate() {
            if i > 0 {
                write!(f, ", ")?;
            }
            write!(f, "{ty}")?;
        }
        write!(f, ")")?;
        if !self.attrs().is_empty() {
            write!(f, " attributes {{")?;
            for (i, (name, attr)) in self.attrs().iter().enumerate() {
                if i > 0 {
                    write!(f, ", ")?;
                }
                if attr.is_unit() {
                    write!(f, "{name}")?;
                } else {
                    write!(f, "{name} = {attr}")?;
                }
            }
            write!(f, "}}")?;
        }
        writeln!(f, " {{")?;
        printer.write_block(f, self.entry(), 2)?;
        writeln!(f, "}}")
    }
}

impl fmt::Display for Module {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, func) in self.functions().iter().enumerate() {
            if i > 0 {
                writeln!(f)?;
            }
            write!(f, "{func}")?;
        }
        Ok(())
    }
}
