//! Text dump of a region, used by the filetests.

use std::fmt;

use super::{MemRef, Scop, Statement};
use crate::value::AccessKind;

impl fmt::Display for MemRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.name, self.element)?;
        for extent in &self.shape {
            write!(f, "[{}]", extent)?;
        }
        write!(f, " ({})", self.kind)
    }
}

impl Scop {
    fn fmt_statement(&self, f: &mut fmt::Formatter<'_>, stmt: &Statement) -> fmt::Result {
        write!(f, "stmt {} {}", stmt.name, stmt.domain)?;
        if !stmt.affine {
            write!(f, " nonaffine")?;
        }
        writeln!(f)?;
        for reference in stmt.loops.keys() {
            writeln!(f, "  loop {}", reference)?;
        }
        for (key, access) in &stmt.accesses {
            match self.access_array(access.value) {
                Some((array, AccessKind::Read)) => writeln!(f, "  read {} {}", array, key)?,
                Some((array, AccessKind::Write)) => writeln!(
                    f,
                    "  write {} <- {}",
                    array,
                    self.values
                        .args(access.value)
                        .first()
                        .map(|&arg| self.values.render(arg))
                        .unwrap_or_else(|| "?".to_string())
                )?,
                None => {}
            }
        }
        Ok(())
    }
}

impl fmt::Display for Scop {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "region {}", self.name)?;
        writeln!(f, "context {}", self.context)?;
        writeln!(f, "schedule {}", self.schedule)?;
        for memref in self.memrefs.values() {
            writeln!(f, "array {}", memref)?;
        }
        for param in self.parameters.values() {
            writeln!(f, "param {} = {}: {}", param.name, param.reference, param.ty)?;
        }
        for (reference, &id) in &self.computations {
            let value = &self.values[id];
            writeln!(
                f,
                "{} {}: {} = {}",
                value.kind_name(),
                reference,
                value.ty,
                self.values.render(id)
            )?;
        }
        for stmt in self.statements.values() {
            self.fmt_statement(f, stmt)?;
        }
        for dropped in &self.dropped {
            writeln!(f, "dropped {} (merge {})", dropped.name, dropped.merge)?;
        }
        for (name, relation) in self.dependences.iter() {
            if !relation.is_empty() {
                writeln!(f, "dep {} {}", name, relation)?;
            }
        }
        Ok(())
    }
}
