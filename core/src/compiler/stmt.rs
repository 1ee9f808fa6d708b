use crate::ast::{BinOp, Expr, ExprKind, Lit, Span, Stmt, StmtKind, TypeExpr};
use crate::error::CompileError;
use crate::resolve::{Storage, Symbol, VarSlot};
use crate::typ::{self, Assignability, Type};
use crate::vm::Op;

use super::driver::{LoopTargets, PackageCompiler, Want, error_at, operand_count, resolve_type};
use super::expr::{arith_op, index_types};

/// Whether control cannot fall off the end of `stmts`.
pub(super) fn terminates(stmts: &[Stmt]) -> bool {
    stmts.last().is_some_and(terminating)
}

fn terminating(s: &Stmt) -> bool {
    match &s.kind {
        StmtKind::Return(_) => true,
        StmtKind::Block(body) => terminates(body),
        StmtKind::If { then, els: Some(els), .. } => terminates(then) && terminating(els),
        StmtKind::For { cond: None, body, .. } => !breaks_out(body),
        _ => false,
    }
}

/// A `break` that targets the enclosing loop; nested loops own their breaks.
fn breaks_out(body: &[Stmt]) -> bool {
    body.iter().any(|s| match &s.kind {
        StmtKind::Break => true,
        StmtKind::Block(inner) => breaks_out(inner),
        StmtKind::If { then, els, .. } => {
            breaks_out(then) || els.as_deref().is_some_and(|e| breaks_out(std::slice::from_ref(e)))
        }
        _ => false,
    })
}

/// Where one value of an assignment goes.
enum Target<'e> {
    Discard,
    Var(VarSlot),
    /// Declared in the store phase, after every value was evaluated.
    /// `ty` is `None` when taken from a multi-value source.
    New { name: &'e str, ty: Option<Type> },
    /// `pins` is filled before any value is evaluated.
    Elem { place: Place<'e>, pins: Option<Pins> },
}

impl Target<'_> {
    /// Type values are converted to; `None` keeps the value's own type.
    fn ty(&self) -> Option<&Type> {
        match self {
            Target::Discard => None,
            Target::Var(slot) => Some(&slot.ty),
            Target::New { ty, .. } => ty.as_ref(),
            Target::Elem { place, .. } => Some(place.elem()),
        }
    }
}

type Slot = (Storage, u32);

/// Container an element chain starts from.
enum Root<'e> {
    /// Array or variant variable; read at store time and written back.
    Var(VarSlot),
    /// Slice, map or variant value; stores go through its shared storage.
    Value(&'e Expr),
}

/// One `[index]` of an element chain.
struct Step<'e> {
    index: &'e Expr,
    key: Type,
    elem: Type,
    /// The indexed container is a map.
    map: bool,
}

/// An assignable element `root[i][j]...`. Every step after the first
/// selects into an array held by the previous step.
struct Place<'e> {
    root: Root<'e>,
    steps: Vec<Step<'e>>,
}

impl Place<'_> {
    fn elem(&self) -> &Type {
        self.steps.last().map_or(&Type::Any, |step| &step.elem)
    }
}

/// Scratch slots holding the evaluated operands of a place.
struct Pins {
    root: Slot,
    write_back: bool,
    indices: Vec<Slot>,
}

fn is_call(e: &Expr) -> bool {
    matches!(e.kind, ExprKind::Call { .. })
}

impl PackageCompiler<'_> {
    pub(super) fn stmts(&mut self, stmts: &[Stmt]) -> Result<(), CompileError> {
        for s in stmts {
            self.stmt(s)?;
        }
        Ok(())
    }

    pub(super) fn stmt(&mut self, s: &Stmt) -> Result<(), CompileError> {
        match &s.kind {
            StmtKind::Expr(e) => self.expr_stmt(e),
            StmtKind::Define { names, values } => self.define(names, values, s.span),
            StmtKind::Var { names, ty, values } => self.var_decl(names, ty.as_ref(), values, s.span),
            StmtKind::Assign { targets, op: None, values } => self.assign(targets, values, s.span),
            StmtKind::Assign {
                targets,
                op: Some(op),
                values,
            } => match (targets.as_slice(), values.as_slice()) {
                ([target], [value]) => self.update(target, *op, value, s.span),
                _ => Err(error_at(
                    format!("assignment operation {op}= requires single-valued expressions"),
                    s.span,
                )),
            },
            StmtKind::IncDec { target, inc } => {
                let one = Expr::new(ExprKind::Lit(Lit::Int(1)), s.span);
                let op = if *inc { BinOp::Add } else { BinOp::Sub };
                self.update(target, op, &one, s.span)
            }
            StmtKind::Block(body) => self.block(body),
            StmtKind::If { init, cond, then, els } => {
                self.scopes.push_block();
                self.if_stmt(init.as_deref(), cond, then, els.as_deref())?;
                self.scopes.pop_block();
                Ok(())
            }
            StmtKind::For { init, cond, post, body } => {
                self.scopes.push_block();
                self.for_stmt(init.as_deref(), cond.as_ref(), post.as_deref(), body)?;
                self.scopes.pop_block();
                Ok(())
            }
            StmtKind::Break => {
                let target = self
                    .loops
                    .last()
                    .ok_or_else(|| error_at("break is not in a loop", s.span))?;
                let brk = target.brk;
                self.b.emit_jump(Op::Jmp(0), brk);
                Ok(())
            }
            StmtKind::Continue => {
                let target = self
                    .loops
                    .last()
                    .ok_or_else(|| error_at("continue is not in a loop", s.span))?;
                let cont = target.cont;
                self.b.emit_jump(Op::Jmp(0), cont);
                Ok(())
            }
            StmtKind::Return(values) => self.return_stmt(values, s.span),
        }
    }

    /// Main-level expression statements keep their results for `Seal`.
    fn expr_stmt(&mut self, e: &Expr) -> Result<(), CompileError> {
        let top = self.results.is_none();
        if is_call(e) {
            self.call(e, if top { Want::Retain } else { Want::Discard })?;
            return Ok(());
        }
        self.expr(e)?;
        self.b.emit(if top { Op::Keep(1) } else { Op::Pop(1) });
        Ok(())
    }

    fn block(&mut self, body: &[Stmt]) -> Result<(), CompileError> {
        self.scopes.push_block();
        self.stmts(body)?;
        self.scopes.pop_block();
        Ok(())
    }

    fn condition(&mut self, cond: &Expr, what: &str) -> Result<(), CompileError> {
        let ty = self.type_of(cond)?;
        if !matches!(ty, Type::Bool | Type::Any) {
            return Err(error_at(
                format!("non-boolean condition in {what} statement (type {ty})"),
                cond.span,
            ));
        }
        self.value_as(cond, &Type::Bool)
    }

    fn if_stmt(&mut self, init: Option<&Stmt>, cond: &Expr, then: &[Stmt], els: Option<&Stmt>) -> Result<(), CompileError> {
        if let Some(init) = init {
            self.stmt(init)?;
        }
        self.condition(cond, "if")?;
        let otherwise = self.b.new_label();
        self.b.emit_jump(Op::JmpIfNot(0), otherwise);
        self.block(then)?;
        match els {
            Some(els) => {
                let end = self.b.new_label();
                self.b.emit_jump(Op::Jmp(0), end);
                self.b.bind(otherwise);
                self.stmt(els)?;
                self.b.bind(end);
            }
            None => self.b.bind(otherwise),
        }
        Ok(())
    }

    fn for_stmt(
        &mut self,
        init: Option<&Stmt>,
        cond: Option<&Expr>,
        post: Option<&Stmt>,
        body: &[Stmt],
    ) -> Result<(), CompileError> {
        if let Some(init) = init {
            self.stmt(init)?;
        }
        let top = self.b.new_label();
        let targets = LoopTargets {
            brk: self.b.new_label(),
            cont: self.b.new_label(),
        };
        self.b.bind(top);
        if let Some(cond) = cond {
            self.condition(cond, "for")?;
            self.b.emit_jump(Op::JmpIfNot(0), targets.brk);
        }
        self.loops.push(targets);
        let body = self.block(body);
        self.loops.pop();
        body?;
        self.b.bind(targets.cont);
        if let Some(post) = post {
            self.stmt(post)?;
        }
        self.b.emit_jump(Op::Jmp(0), top);
        self.b.bind(targets.brk);
        Ok(())
    }

    fn return_stmt(&mut self, values: &[Expr], span: Span) -> Result<(), CompileError> {
        let Some(results) = self.results.clone() else {
            if !values.is_empty() {
                return Err(error_at("too many return values", span));
            }
            let end = self.main_end.ok_or_else(|| error_at("return outside of a function", span))?;
            self.b.emit_jump(Op::Jmp(0), end);
            return Ok(());
        };

        match values {
            [value] if results.len() > 1 && is_call(value) => {
                let n = operand_count(results.len(), "results", span)?;
                let have = self.call(value, Want::Values(n))?;
                self.fit_values(&have, &results, span)?;
            }
            _ if values.len() != results.len() => {
                let which = if values.len() < results.len() { "not enough" } else { "too many" };
                return Err(error_at(format!("{which} return values"), span));
            }
            _ => {
                for (value, ty) in values.iter().zip(&results) {
                    self.value_as(value, ty)?;
                }
            }
        }
        let n = operand_count(results.len(), "results", span)?;
        self.b.emit(Op::Return(n));
        Ok(())
    }

    /// Convert a run of pushed values of types `have` to `want`.
    fn fit_values(&mut self, have: &[Type], want: &[Type], span: Span) -> Result<(), CompileError> {
        let mut only_top = true;
        for (i, (h, w)) in have.iter().zip(want).enumerate() {
            let fit = typ::assignability(w, h).map_err(|err| CompileError::from_type(err, span))?;
            if fit != Assignability::Same && i + 1 < have.len() {
                only_top = false;
            }
        }
        if only_top {
            if let (Some(h), Some(w)) = (have.last(), want.last()) {
                self.convert(h, w, span)?;
            }
            return Ok(());
        }
        self.scopes.push_block();
        let mut slots = Vec::with_capacity(have.len());
        for (h, w) in have.iter().zip(want).rev() {
            self.convert(h, w, span)?;
            let (storage, index) = self.scopes.scratch_slot();
            self.store_slot(storage, index);
            slots.push((storage, index));
        }
        for (storage, index) in slots.into_iter().rev() {
            self.load_slot(storage, index);
        }
        self.scopes.pop_block();
        Ok(())
    }

    /// `a, b := ...`; names already bound in the current scope are assigned.
    fn define(&mut self, names: &[String], values: &[Expr], span: Span) -> Result<(), CompileError> {
        for (i, name) in names.iter().enumerate() {
            if name != "_" && names[..i].contains(name) {
                return Err(error_at(format!("{name} repeated on left side of :="), span));
            }
        }
        let mut targets = Vec::with_capacity(names.len());
        let single_source = values.len() == 1 && names.len() > 1;
        for (i, name) in names.iter().enumerate() {
            if name == "_" {
                targets.push(Target::Discard);
                continue;
            }
            if let Some(Symbol::Var(slot)) = self.scopes.lookup_current(name) {
                targets.push(Target::Var(slot.clone()));
                continue;
            }
            let ty = match values.get(i) {
                Some(value) if !single_source => Some(self.type_of(value)?),
                _ => None,
            };
            targets.push(Target::New { name, ty });
        }
        self.bind_values(targets, values, span)
    }

    fn var_decl(&mut self, names: &[String], ty: Option<&TypeExpr>, values: &[Expr], span: Span) -> Result<(), CompileError> {
        let declared = ty.map(|t| resolve_type(t, span)).transpose()?;
        for name in names {
            if name != "_" && self.scopes.lookup_current(name).is_some() {
                return Err(error_at(format!("{name} redeclared in this block"), span));
            }
        }

        if values.is_empty() {
            let Some(ty) = declared else {
                return Err(error_at("missing type or init expr", span));
            };
            for name in names.iter().filter(|n| *n != "_") {
                let k = self.b.k(ty.zero_value());
                self.b.emit(Op::LoadK(k));
                let slot = self.declare(name, ty.clone(), span)?;
                self.store_var(&slot);
            }
            return Ok(());
        }

        let single_source = values.len() == 1 && names.len() > 1;
        let mut targets = Vec::with_capacity(names.len());
        for (i, name) in names.iter().enumerate() {
            if name == "_" {
                targets.push(Target::Discard);
                continue;
            }
            let ty = match (&declared, values.get(i)) {
                (Some(ty), _) => Some(ty.clone()),
                (None, Some(value)) if !single_source => Some(self.type_of(value)?),
                _ => None,
            };
            targets.push(Target::New { name, ty });
        }
        self.bind_values(targets, values, span)
    }

    fn declare(&mut self, name: &str, ty: Type, span: Span) -> Result<VarSlot, CompileError> {
        if matches!(ty, Type::Nil) {
            return Err(error_at(format!("use of untyped nil in assignment to {name}"), span));
        }
        self.scopes
            .declare_var(name, ty)
            .ok_or_else(|| error_at(format!("{name} redeclared in this block"), span))
    }

    fn assign(&mut self, lhs: &[Expr], values: &[Expr], span: Span) -> Result<(), CompileError> {
        let mut targets = Vec::with_capacity(lhs.len());
        for target in lhs {
            targets.push(self.assign_target(target)?);
        }

        if let ([Target::Elem { place, .. }], [value]) = (targets.as_slice(), values)
            && let [step] = place.steps.as_slice()
        {
            match &place.root {
                Root::Var(slot) => self.load_var(slot),
                Root::Value(base) => {
                    self.expr(base)?;
                }
            }
            self.value_as(step.index, &step.key)?;
            self.value_as(value, &step.elem)?;
            self.b.emit(Op::SetIndex);
            match &place.root {
                Root::Var(slot) => self.store_var(slot),
                Root::Value(_) => {
                    self.b.emit(Op::Pop(1));
                }
            }
            return Ok(());
        }

        self.scopes.push_block();
        self.bind_values(targets, values, span)?;
        self.scopes.pop_block();
        Ok(())
    }

    fn assign_target<'e>(&self, target: &'e Expr) -> Result<Target<'e>, CompileError> {
        match &target.kind {
            ExprKind::Ident(name) if name == "_" => Ok(Target::Discard),
            ExprKind::Ident(name) => match self.scopes.lookup(name) {
                Some(Symbol::Var(slot)) => Ok(Target::Var(slot.clone())),
                Some(Symbol::Func { .. }) => Err(error_at(
                    format!("cannot assign to {name} (neither addressable nor a map index expression)"),
                    target.span,
                )),
                Some(Symbol::Module(_)) => Err(error_at(format!("use of package {name} without selector"), target.span)),
                None => Err(error_at(format!("undefined: {name}"), target.span)),
            },
            ExprKind::Index(_, _) => Ok(Target::Elem {
                place: self.place(target)?,
                pins: None,
            }),
            _ => Err(error_at("cannot assign to expression", target.span)),
        }
    }

    /// Resolve an index expression used as an assignment target.
    fn place<'e>(&self, target: &'e Expr) -> Result<Place<'e>, CompileError> {
        let ExprKind::Index(base, index) = &target.kind else {
            return Err(error_at("cannot assign to expression", target.span));
        };
        let base_ty = self.type_of(base)?;
        if matches!(base_ty, Type::String) {
            return Err(error_at(
                "cannot assign to string element (neither addressable nor a map index expression)",
                target.span,
            ));
        }
        let (key, elem) = index_types(&base_ty).map_err(|msg| error_at(msg, target.span))?;
        let step = Step {
            index,
            key,
            elem,
            map: matches!(base_ty, Type::Map(_, _)),
        };
        let var = match base.as_ident().and_then(|name| self.scopes.lookup(name)) {
            Some(Symbol::Var(slot)) => Some(slot.clone()),
            _ => None,
        };
        match (&base_ty, var) {
            (Type::Array(_, _) | Type::Any, Some(slot)) => Ok(Place {
                root: Root::Var(slot),
                steps: vec![step],
            }),
            (Type::Array(_, _), None) => {
                // Elements of slices and addressable arrays are addressable; map values are not.
                let addressable = match &base.kind {
                    ExprKind::Index(outer, _) => !matches!(self.type_of(outer)?, Type::Map(_, _)),
                    _ => false,
                };
                if !addressable {
                    return Err(error_at("cannot assign to element of a non-variable array", target.span));
                }
                let mut place = self.place(base)?;
                place.steps.push(step);
                Ok(place)
            }
            _ => Ok(Place {
                root: Root::Value(base),
                steps: vec![step],
            }),
        }
    }

    /// Pop the top of stack into a fresh scratch slot.
    fn stash(&mut self) -> Slot {
        let (storage, index) = self.scopes.scratch_slot();
        self.store_slot(storage, index);
        (storage, index)
    }

    /// Evaluate the root value and every index of `place`, in source order.
    fn pin(&mut self, place: &Place<'_>) -> Result<Pins, CompileError> {
        let (root, write_back) = match &place.root {
            Root::Var(slot) => ((slot.storage, slot.index), true),
            Root::Value(base) => {
                self.expr(base)?;
                (self.stash(), false)
            }
        };
        let mut indices = Vec::with_capacity(place.steps.len());
        for step in &place.steps {
            self.value_as(step.index, &step.key)?;
            indices.push(self.stash());
        }
        Ok(Pins {
            root,
            write_back,
            indices,
        })
    }

    /// Push the value `depth` steps below the root. A missing map key
    /// reads as the zero value.
    fn load_step(&mut self, place: &Place<'_>, pins: &Pins, depth: usize) {
        let (storage, index) = pins.root;
        self.load_slot(storage, index);
        for (step, &(storage, index)) in place.steps.iter().zip(&pins.indices).take(depth) {
            self.load_slot(storage, index);
            let zero = self.b.k(step.elem.zero_value());
            if step.map {
                self.b.emit(Op::MapProbe { zero });
                self.b.emit(Op::Pop(1));
            } else {
                self.b.emit(Op::Index { zero });
            }
        }
    }

    /// Store the value pushed by `value` into a pinned place, writing every
    /// enclosing array back into its container.
    fn store_place(
        &mut self,
        place: &Place<'_>,
        pins: &Pins,
        value: impl FnOnce(&mut Self) -> Result<(), CompileError>,
    ) -> Result<(), CompileError> {
        for (depth, &(storage, index)) in pins.indices.iter().enumerate() {
            self.load_step(place, pins, depth);
            self.load_slot(storage, index);
        }
        value(self)?;
        for _ in &pins.indices {
            self.b.emit(Op::SetIndex);
        }
        if pins.write_back {
            let (storage, index) = pins.root;
            self.store_slot(storage, index);
        } else {
            self.b.emit(Op::Pop(1));
        }
        Ok(())
    }

    /// `x op= v`. Element operands are evaluated once.
    fn update(&mut self, target: &Expr, op: BinOp, value: &Expr, span: Span) -> Result<(), CompileError> {
        if !matches!(target.kind, ExprKind::Index(_, _)) {
            let rhs = Expr::new(
                ExprKind::Binary(Box::new(target.clone()), op, Box::new(value.clone())),
                span,
            );
            return self.assign(std::slice::from_ref(target), std::slice::from_ref(&rhs), span);
        }
        let place = self.place(target)?;
        let elem = place.elem().clone();
        let typing = typ::binary(op, &elem, &self.type_of(value)?).map_err(|err| CompileError::from_type(err, span))?;
        let instr = arith_op(op, &typing.operand)
            .ok_or_else(|| error_at(format!("operator {op} not defined on {elem}"), span))?;
        self.scopes.push_block();
        let pins = self.pin(&place)?;
        self.store_place(&place, &pins, |this| {
            this.load_step(&place, &pins, place.steps.len());
            this.convert(&elem, &typing.operand, span)?;
            if op.is_shift() {
                this.value_as(value, &Type::Int)?;
            } else {
                this.value_as(value, &typing.operand)?;
            }
            this.b.emit(instr);
            this.convert(&typing.result, &elem, span)
        })?;
        self.scopes.pop_block();
        Ok(())
    }

    /// Evaluate element operands, then every value, then store. Stores run
    /// left to right when a target reads state another target writes.
    fn bind_values(&mut self, mut targets: Vec<Target<'_>>, values: &[Expr], span: Span) -> Result<(), CompileError> {
        if values.len() != targets.len() && !(values.len() == 1 && targets.len() > 1) {
            return Err(error_at(
                format!(
                    "assignment mismatch: {} variables but {} values",
                    targets.len(),
                    values.len()
                ),
                span,
            ));
        }
        for target in &mut targets {
            if let Target::Elem { place, pins } = target {
                *pins = Some(self.pin(place)?);
            }
        }
        if values.len() == 1 && targets.len() > 1 {
            let have = self.multi_value(&values[0], targets.len())?;
            return self.store_targets(targets, Some(&have), span);
        }
        for (target, value) in targets.iter().zip(values) {
            match target.ty() {
                Some(ty) => self.value_as(value, ty)?,
                None => {
                    self.expr(value)?;
                }
            }
        }
        self.store_targets(targets, None, span)
    }

    /// Push the `n` values of a call or a comma-ok map index.
    fn multi_value(&mut self, value: &Expr, n: usize) -> Result<Vec<Type>, CompileError> {
        if let ExprKind::Index(base, key) = &value.kind
            && n == 2
            && let Type::Map(key_ty, elem) = self.type_of(base)?
        {
            self.expr(base)?;
            self.value_as(key, &key_ty)?;
            let zero = self.b.k(elem.zero_value());
            self.b.emit(Op::MapProbe { zero });
            return Ok(vec![*elem, Type::Bool]);
        }
        if !is_call(value) {
            return Err(error_at(
                format!("assignment mismatch: {n} variables but 1 value"),
                value.span,
            ));
        }
        let n = operand_count(n, "assignment targets", value.span)?;
        self.call(value, Want::Values(n))
    }

    /// Store pushed values into `targets`. `have` holds the values' types
    /// when they were pushed unconverted.
    fn store_targets(&mut self, targets: Vec<Target<'_>>, have: Option<&[Type]>, span: Span) -> Result<(), CompileError> {
        if !needs_order(&targets) {
            for (i, target) in targets.into_iter().enumerate().rev() {
                let from = have.and_then(|h| h.get(i));
                self.store_top(target, from, span)?;
            }
            return Ok(());
        }
        let mut stashed = Vec::with_capacity(targets.len());
        for (i, target) in targets.iter().enumerate().rev() {
            let from = have.and_then(|h| h.get(i));
            if let (Some(from), Some(ty)) = (from, target.ty()) {
                self.convert(from, ty, span)?;
            }
            stashed.push(self.stash());
        }
        stashed.reverse();
        for (i, (target, (storage, index))) in targets.into_iter().zip(stashed).enumerate() {
            match target {
                Target::Elem {
                    place,
                    pins: Some(pins),
                } => self.store_place(&place, &pins, |this| {
                    this.load_slot(storage, index);
                    Ok(())
                })?,
                target => {
                    let from = match target.ty() {
                        Some(_) => None,
                        None => have.and_then(|h| h.get(i)),
                    };
                    self.load_slot(storage, index);
                    self.store_top(target, from, span)?;
                }
            }
        }
        Ok(())
    }

    /// Store the top of stack into `target`, converting it from `from` first.
    fn store_top(&mut self, target: Target<'_>, from: Option<&Type>, span: Span) -> Result<(), CompileError> {
        match target {
            Target::Discard => {
                self.b.emit(Op::Pop(1));
            }
            Target::Var(slot) => {
                if let Some(from) = from {
                    self.convert(from, &slot.ty, span)?;
                }
                self.store_var(&slot);
            }
            Target::New { name, ty } => {
                let ty = match (ty, from) {
                    (Some(ty), Some(from)) => {
                        self.convert(from, &ty, span)?;
                        ty
                    }
                    (Some(ty), None) => ty,
                    (None, Some(from)) => from.clone(),
                    (None, None) => Type::Any,
                };
                let slot = self.declare(name, ty, span)?;
                self.store_var(&slot);
            }
            Target::Elem { place, pins } => {
                let pins = pins.ok_or_else(|| error_at("element operands were not evaluated", span))?;
                if let Some(from) = from {
                    self.convert(from, place.elem(), span)?;
                }
                let (storage, index) = self.stash();
                self.store_place(&place, &pins, |this| {
                    this.load_slot(storage, index);
                    Ok(())
                })?;
            }
        }
        Ok(())
    }
}

/// Element targets and repeated variables make the store order observable.
fn needs_order(targets: &[Target<'_>]) -> bool {
    let mut vars = Vec::new();
    for target in targets {
        match target {
            Target::Elem { .. } => return true,
            Target::Var(slot) => {
                let at = (slot.storage, slot.index);
                if vars.contains(&at) {
                    return true;
                }
                vars.push(at);
            }
            Target::Discard | Target::New { .. } => {}
        }
    }
    false
}
