//! Building a region from an extraction record.

use std::collections::HashSet;

use indexmap::IndexMap;
use tracing::{debug, info, trace};

use super::{
    record::{AccessRecord, ExtractionRecord, StatementRecord},
    Access, AccessRange, Dependences, DroppedStatement, Extent, MemRef, Parameter, Scop, Statement,
};
use crate::{
    entity::ValueId,
    error::{LiftError, Result},
    merge::{resolve_merge, BranchContext, ResolvedMerge},
    parser::{
        defined_reference, parse_instruction, parse_listing, parse_poly, Instruction, Operand,
        ParseError, PolyExpr,
    },
    types::Type,
    value::{AccessKind, ValueData, ValueKind, Values},
};

/// Parse polyhedral text, naming the field in errors. Empty text is the
/// empty set.
fn poly(text: &str, what: &str) -> Result<PolyExpr> {
    let text = if text.trim().is_empty() { "{  }" } else { text };
    parse_poly(text).map_err(|e| {
        LiftError::Parse(ParseError {
            message: format!("{}: {}", what, e.message),
            position: e.position,
        })
    })
}

/// Parse a listing into (line, instruction) pairs
fn parse_lines(listing: &str) -> Result<Vec<(&str, Instruction)>> {
    parse_listing(listing).map_err(LiftError::from)
}

struct Builder<'r> {
    record: &'r ExtractionRecord,
    values: Values,
    memrefs: IndexMap<String, MemRef>,
    parameters: IndexMap<String, Parameter>,
    computations: IndexMap<String, ValueId>,
    statements: IndexMap<String, Statement>,
    /// References of `phi`s that define induction variables
    induction: HashSet<String>,
    /// References of merges without a selection form
    unrepresentable: HashSet<String>,
}

impl<'r> Builder<'r> {
    fn new(record: &'r ExtractionRecord) -> Self {
        Self {
            record,
            values: Values::new(),
            memrefs: IndexMap::new(),
            parameters: IndexMap::new(),
            computations: IndexMap::new(),
            statements: IndexMap::new(),
            induction: HashSet::new(),
            unrepresentable: HashSet::new(),
        }
    }

    fn memrefs(&mut self) -> Result<()> {
        for array in &self.record.arrays {
            if self.memrefs.contains_key(&array.name) {
                return Err(ParseError::new(format!("Duplicate array '{}'", array.name)).into());
            }
            self.memrefs.insert(
                array.name.clone(),
                MemRef {
                    name: array.name.clone(),
                    kind: array.kind,
                    shape: array.sizes.iter().map(|s| Extent::parse(s)).collect(),
                    element: array.ty.trim().to_string(),
                    variable: array.variable.trim().to_string(),
                },
            );
        }
        Ok(())
    }

    fn parameters(&mut self) -> Result<()> {
        for param in &self.record.parameters {
            let reference = defined_reference(&param.variable)
                .map(str::to_string)
                .unwrap_or_else(|| format!("%{}", param.name));
            let ty = if param.ty.trim().is_empty() {
                Type::Int(64)
            } else {
                Type::parse(&param.ty).ok_or_else(|| {
                    ParseError::new(format!(
                        "Unsupported type '{}' of parameter {}",
                        param.ty, param.name
                    ))
                })?
            };
            let value = self.values.push(ValueData::new(
                reference.clone(),
                ty,
                ValueKind::Parameter {
                    name: param.name.clone(),
                },
            ));
            self.parameters.insert(
                reference.clone(),
                Parameter {
                    name: param.name.clone(),
                    reference,
                    ty,
                    value,
                },
            );
        }
        Ok(())
    }

    fn collect_induction_variables(&mut self) {
        for stmt in &self.record.statements {
            for lp in &stmt.loops {
                if let Some(reference) = defined_reference(&lp.induction_variable) {
                    self.induction.insert(reference.to_string());
                }
            }
        }
    }

    fn operand_value(&mut self, operand: &Operand, ty: Type) -> ValueId {
        match operand {
            Operand::Literal(literal) => self.values.constant(literal, ty),
            Operand::Ref(reference) => self.values.placeholder(reference, ty),
        }
    }

    /// Scan a listing in order, registering computations and merges.
    ///
    /// Returns the conditional branches seen.
    fn scan(&mut self, listing: &str) -> Result<Vec<BranchContext>> {
        let mut branches = Vec::new();
        let lines = parse_lines(listing)?;
        for (line, inst) in &lines {
            match inst {
                Instruction::CondBranch {
                    cond,
                    if_true,
                    if_false,
                } => branches.push(BranchContext {
                    cond: cond.clone(),
                    if_true: if_true.clone(),
                    if_false: if_false.clone(),
                }),
                _ => {
                    self.define(inst, line, &branches);
                }
            }
        }
        debug!(
            instructions = lines.len(),
            branches = branches.len(),
            "scanned listing"
        );
        Ok(branches)
    }

    /// Register the value an instruction defines, if it is a computation or
    /// a merge. Returns the defined reference.
    fn define(
        &mut self,
        inst: &Instruction,
        text: &str,
        branches: &[BranchContext],
    ) -> Option<String> {
        let reference = inst.result()?.to_string();
        if self.computations.contains_key(&reference)
            || self.induction.contains(&reference)
            || self.unrepresentable.contains(&reference)
        {
            return Some(reference);
        }

        match inst {
            Instruction::Phi { ty, incoming, .. } => {
                let Some(ty) = Type::parse(ty) else {
                    debug!(%reference, %ty, "skipping merge of unsupported type");
                    return Some(reference);
                };
                let Some(merge) = resolve_merge(incoming, branches) else {
                    debug!(%reference, "merge has no selection form");
                    self.unrepresentable.insert(reference.clone());
                    return Some(reference);
                };
                trace!(%reference, ?merge, "resolved merge");
                let select = matches!(merge, ResolvedMerge::Select { .. });
                let args = merge
                    .operands()
                    .into_iter()
                    .enumerate()
                    .map(|(i, operand)| {
                        let ty = if select && i == 0 { Type::Bool } else { ty };
                        self.operand_value(operand, ty)
                    })
                    .collect();
                let id = self.values.push(ValueData::new(
                    reference.clone(),
                    ty,
                    ValueKind::Merge {
                        select,
                        instruction: text.trim().to_string(),
                    },
                ));
                self.values.set_args(id, args);
                self.computations.insert(reference.clone(), id);
            }
            Instruction::Compute {
                ty,
                opcode,
                operands,
                ..
            } => {
                let Some(ty) = Type::parse(ty) else {
                    debug!(%reference, %ty, "skipping computation of unsupported type");
                    return Some(reference);
                };
                let args = operands
                    .iter()
                    .map(|typed| {
                        let operand_ty = Type::parse(&typed.ty).unwrap_or(ty);
                        self.operand_value(&typed.value, operand_ty)
                    })
                    .collect();
                let id = self.values.push(ValueData::new(
                    reference.clone(),
                    ty,
                    ValueKind::Computation {
                        opcode: opcode.clone(),
                        instruction: text.trim().to_string(),
                    },
                ));
                self.values.set_args(id, args);
                self.computations.insert(reference.clone(), id);
            }
            _ => {}
        }
        Some(reference)
    }

    /// The value a write stores, from its incoming value or, failing that,
    /// its access instruction
    fn stored_value(
        &mut self,
        source: &str,
        fallback: Type,
        branches: &[BranchContext],
    ) -> Result<Option<ValueId>> {
        let source = source.trim();
        if source.is_empty() {
            return Ok(None);
        }
        match parse_instruction(source) {
            Ok(Instruction::Store { ty, value, .. }) => {
                let ty = Type::parse(&ty).unwrap_or(fallback);
                Ok(Some(self.operand_value(&value, ty)))
            }
            Ok(inst) => {
                let ty = match &inst {
                    Instruction::Phi { ty, .. }
                    | Instruction::Load { ty, .. }
                    | Instruction::Compute { ty, .. } => Type::parse(ty).unwrap_or(fallback),
                    _ => fallback,
                };
                Ok(self
                    .define(&inst, source, branches)
                    .map(|reference| self.values.placeholder(&reference, ty)))
            }
            // A printed operand rather than an instruction: `double %x`, `i64 0`
            Err(e) if !source.contains('=') => {
                let mut words = source.split_whitespace();
                let (Some(ty), Some(value)) = (words.next(), words.last()) else {
                    return Err(e.into());
                };
                let ty = Type::parse(ty).unwrap_or(fallback);
                let operand = if value.starts_with('%') || value.starts_with('@') {
                    Operand::Ref(value.to_string())
                } else {
                    Operand::Literal(value.to_string())
                };
                Ok(Some(self.operand_value(&operand, ty)))
            }
            Err(e) => Err(e.into()),
        }
    }

    fn access(
        &mut self,
        stmt: &StatementRecord,
        index: usize,
        access: &AccessRecord,
        branches: &[BranchContext],
    ) -> Result<(String, Access)> {
        let relation = poly(
            &access.relation,
            &format!("access relation of {}", stmt.name),
        )?;
        let array = relation
            .pieces
            .first()
            .and_then(|piece| piece.output.as_ref())
            .and_then(|tuple| tuple.name.clone())
            .ok_or_else(|| {
                ParseError::new(format!(
                    "Access relation '{}' of {} names no array",
                    access.relation, stmt.name
                ))
            })?;
        let memref = self.memrefs.get(&array);
        let element = memref.and_then(MemRef::element_type).unwrap_or(Type::Float(64));
        let instruction = access.access_instruction.trim().to_string();

        match access.kind {
            AccessKind::Read => {
                let key = defined_reference(&instruction)
                    .or_else(|| memref.and_then(|m| defined_reference(&m.variable)))
                    .map(str::to_string)
                    .unwrap_or_else(|| format!("{}.{}", array, index));
                let ty = match parse_instruction(&instruction) {
                    Ok(Instruction::Load { ty, .. }) | Ok(Instruction::Phi { ty, .. }) => {
                        Type::parse(&ty).unwrap_or(element)
                    }
                    _ => element,
                };
                let value = self.values.push(ValueData::new(
                    key.clone(),
                    ty,
                    ValueKind::MemoryAccess {
                        kind: AccessKind::Read,
                        array,
                        instruction,
                        incoming: None,
                    },
                ));
                Ok((key, Access { value, relation }))
            }
            AccessKind::Write => {
                let incoming = access.incoming_value.trim();
                let source = if incoming.is_empty() {
                    instruction.as_str()
                } else {
                    incoming
                };
                let stored = self.stored_value(source, element, branches)?;
                let key = if instruction.is_empty() {
                    format!("{} -> {}", stmt.name, array)
                } else {
                    instruction.clone()
                };
                let value = self.values.push(ValueData::new(
                    key.clone(),
                    element,
                    ValueKind::MemoryAccess {
                        kind: AccessKind::Write,
                        array,
                        instruction,
                        incoming: (!incoming.is_empty()).then(|| incoming.to_string()),
                    },
                ));
                self.values.set_args(value, stored.into_iter().collect());
                Ok((key, Access { value, relation }))
            }
        }
    }

    fn statement(&mut self, stmt: &StatementRecord, region: &[BranchContext]) -> Result<Statement> {
        let affine = stmt.affine.value().ok_or_else(|| {
            ParseError::new(format!(
                "Statement {}: 'affine' must be true or false",
                stmt.name
            ))
        })?;
        let domain = poly(&stmt.domain, &format!("domain of {}", stmt.name))?;

        let own_branches;
        let branches = match &stmt.instructions {
            Some(listing) => {
                own_branches = self.scan(listing)?;
                own_branches.as_slice()
            }
            None => region,
        };

        let mut loops = IndexMap::new();
        for lp in &stmt.loops {
            let Some(reference) = defined_reference(&lp.induction_variable) else {
                continue;
            };
            let ty = match parse_instruction(&lp.induction_variable) {
                Ok(Instruction::Phi { ty, .. }) => Type::parse(&ty).unwrap_or(Type::Int(64)),
                _ => Type::Int(64),
            };
            let id = self.values.push(ValueData::new(
                reference,
                ty,
                ValueKind::InductionVariable {
                    instruction: lp.induction_variable.trim().to_string(),
                },
            ));
            loops.insert(reference.to_string(), id);
        }

        let mut accesses = IndexMap::new();
        for (index, access) in stmt.accesses.iter().enumerate() {
            let (mut key, access) = self.access(stmt, index, access, branches)?;
            if accesses.contains_key(&key) {
                key = format!("{}#{}", key, index);
            }
            accesses.insert(key, access);
        }

        Ok(Statement {
            name: stmt.name.clone(),
            domain,
            affine,
            depth: stmt.loops.len(),
            accesses,
            loops,
        })
    }

    /// The first unrepresentable merge a statement's writes depend on
    fn reached_merge(&self, stmt: &Statement) -> Option<String> {
        let mut stack: Vec<ValueId> = stmt
            .writes(&self.values)
            .flat_map(|(_, access)| self.values.args(access.value).iter().copied())
            .collect();
        let mut seen = HashSet::new();
        while let Some(id) = stack.pop() {
            if !seen.insert(id) {
                continue;
            }
            let value = &self.values[id];
            if value.is_placeholder() {
                if self.unrepresentable.contains(&value.reference) {
                    return Some(value.reference.clone());
                }
                if let Some(&producer) = self.computations.get(&value.reference) {
                    stack.push(producer);
                }
            } else {
                stack.extend(value.args.iter().copied());
            }
        }
        None
    }

    fn build(mut self) -> Result<Scop> {
        let record = self.record;
        self.memrefs()?;
        self.parameters()?;
        self.collect_induction_variables();
        let branches = self.scan(&record.instructions)?;

        for stmt in &record.statements {
            if self.statements.contains_key(&stmt.name) {
                return Err(
                    ParseError::new(format!("Duplicate statement '{}'", stmt.name)).into(),
                );
            }
            let statement = self.statement(stmt, &branches)?;
            self.statements.insert(stmt.name.clone(), statement);
        }

        let mut dropped = Vec::new();
        for stmt in self.statements.values() {
            if let Some(merge) = self.reached_merge(stmt) {
                info!(
                    statement = %stmt.name,
                    %merge,
                    "dropping statement that depends on an unrepresentable merge"
                );
                dropped.push(DroppedStatement {
                    name: stmt.name.clone(),
                    merge,
                });
            }
        }
        for d in &dropped {
            self.statements.shift_remove(&d.name);
        }
        if self.statements.is_empty() && !dropped.is_empty() {
            return Err(LiftError::UnrepresentableMerge {
                region: record.name.clone(),
                statements: dropped.into_iter().map(|d| d.name).collect(),
            });
        }

        let schedule = poly(&record.schedule, "schedule")?;
        let deps = &record.dependencies;
        let dependences = Dependences {
            raw: poly(&deps.raw, "RAW dependences")?,
            war: poly(&deps.war, "WAR dependences")?,
            waw: poly(&deps.waw, "WAW dependences")?,
            red: poly(&deps.red, "RED dependences")?,
            tc_red: poly(&deps.tc_red, "TC_RED dependences")?,
        };
        let names: Vec<String> = dropped.iter().map(|d| d.name.clone()).collect();
        let (schedule, dependences) = if names.is_empty() {
            (schedule, dependences)
        } else {
            (schedule.without(&names), dependences.without(&names))
        };

        let access_ranges = record
            .access_range
            .iter()
            .map(|group| {
                let readwrite = group.readwrite.iter().map(|r| (r, false));
                let readonly = group.readonly.iter().map(|r| (r, true));
                readwrite
                    .chain(readonly)
                    .map(|(range, readonly)| AccessRange {
                        minimal: range.minimal.clone(),
                        maximal: range.maximal.clone(),
                        readonly,
                    })
                    .collect()
            })
            .collect();

        debug!(
            region = %record.name,
            statements = self.statements.len(),
            computations = self.computations.len(),
            dropped = dropped.len(),
            "built region"
        );

        Ok(Scop {
            name: record.name.clone(),
            values: self.values,
            memrefs: self.memrefs,
            parameters: self.parameters,
            computations: self.computations,
            statements: self.statements,
            schedule,
            dependences,
            context: poly(&record.context, "context")?,
            dropped,
            access_ranges,
        })
    }
}

impl Scop {
    /// Build a region from its extraction record.
    ///
    /// Merges are reconstructed while the listing is scanned; argument lists
    /// still hold placeholders until [`crate::propagate`] runs.
    pub fn from_record(record: &ExtractionRecord) -> Result<Scop> {
        Builder::new(record).build()
    }

    /// Build a region from the JSON text of its extraction record
    pub fn from_json(text: &str) -> Result<Scop> {
        let record = ExtractionRecord::from_json(text)?;
        Scop::from_record(&record)
    }
}
