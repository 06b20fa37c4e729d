//! Expression evaluation.

use cadence_foundation::{EntityId, Error, Result, SemanticLimit, Value};
use cadence_ir::{BinaryOp, ComponentOverride, EntityRef, Expr, Param, UnaryOp};
use indexmap::IndexMap;
use tracing::trace;

use super::{Interpreter, native};
use crate::bound;
use crate::trace::TraceEvent;

impl Interpreter<'_> {
    /// Evaluates an expression.
    pub(super) fn eval(&mut self, expr: &Expr) -> Result<Value> {
        match expr {
            Expr::Literal { value } => Ok(value.clone()),
            Expr::Var { name } => Ok(self.lookup(name)),
            Expr::Param { name } => Ok(self
                .frames
                .last()
                .and_then(|frame| frame.get(name))
                .cloned()
                .unwrap_or_else(|| self.lookup(name))),
            Expr::Field {
                entity,
                component,
                field,
            } => {
                let Some(id) = self.resolve_entity(entity)? else {
                    return Ok(Value::Null);
                };
                Ok(self.read_field(id, component, field))
            }
            Expr::Binary { op, left, right } => self.eval_binary(*op, left, right),
            Expr::Unary { op, expr } => {
                let value = self.eval(expr)?;
                match op {
                    UnaryOp::Negate => native::negate(&value),
                    UnaryOp::Not => Ok(Value::Bool(!value.is_truthy())),
                }
            }
            Expr::Call { function, args } => self.call(function, args),
            Expr::If {
                condition,
                then,
                otherwise,
            } => {
                if self.eval(condition)?.is_truthy() {
                    self.eval(then)
                } else {
                    self.eval(otherwise)
                }
            }
            Expr::Clone { entity, overrides } => self.clone_entity(entity, overrides),
            Expr::BoundCall {
                entity,
                function,
                args,
            } => self.call_bound(entity, function, args),
        }
    }

    /// Evaluates an expression that must yield a number, or `null`.
    pub(super) fn eval_number(&mut self, expr: &Expr, what: &str) -> Result<Option<f64>> {
        match self.eval(expr)? {
            Value::Null => Ok(None),
            value => value
                .as_number()
                .map(Some)
                .ok_or_else(|| {
                    Error::type_mismatch(format!("number for {what}"), value.type_name())
                }),
        }
    }

    /// Evaluates a named map of field expressions in declaration order.
    pub(super) fn eval_fields(
        &mut self,
        fields: &IndexMap<String, Expr>,
    ) -> Result<IndexMap<String, Value>> {
        let mut values = IndexMap::with_capacity(fields.len());
        for (name, expr) in fields {
            let value = self.eval(expr)?;
            values.insert(name.clone(), value);
        }
        Ok(values)
    }

    /// Resolves an entity reference to a live entity. Unresolvable
    /// references yield `None` rather than an error.
    pub(super) fn resolve_entity(&mut self, entity: &EntityRef) -> Result<Option<EntityId>> {
        let value = match entity {
            EntityRef::Name(name) => self.lookup(name),
            EntityRef::Expr(expr) => self.eval(expr)?,
        };
        Ok(self.live_entity(&value))
    }

    /// Looks a name up in, in order: the innermost parameter scope, locals,
    /// `source`/`target`, event payload, module constants and `@`-named
    /// entities. Unknown names are `null`.
    fn lookup(&self, name: &str) -> Value {
        if let Some(value) = self.frames.last().and_then(|frame| frame.get(name)) {
            return value.clone();
        }
        if let Some(value) = self.locals.get(name) {
            return value.clone();
        }
        match name {
            "source" => return self.event.source.into(),
            "target" => return self.event.target.into(),
            _ => {}
        }
        if let Some(value) = self.event.fields.get(name) {
            return value.clone();
        }
        if let Some(value) = self.rules.constant(name) {
            return value.clone();
        }
        if let Some(entity_name) = name.strip_prefix('@') {
            return self.world.entity_by_name(entity_name).into();
        }
        trace!(rule = %self.rule, name, "unbound variable");
        Value::Null
    }

    /// Reads a field, falling back to the schema default when the entity
    /// has the component but not the field.
    fn read_field(&self, entity: EntityId, component: &str, field: &str) -> Value {
        if let Some(value) = self.world.get_field(entity, component, field) {
            return value.clone();
        }
        if self.world.has_component(entity, component) {
            if let Some(default) = self.world.field_default(component, field) {
                return default.clone();
            }
        }
        Value::Null
    }

    fn eval_binary(&mut self, op: BinaryOp, left: &Expr, right: &Expr) -> Result<Value> {
        match op {
            BinaryOp::And => {
                if !self.eval(left)?.is_truthy() {
                    return Ok(Value::Bool(false));
                }
                Ok(Value::Bool(self.eval(right)?.is_truthy()))
            }
            BinaryOp::Or => {
                if self.eval(left)?.is_truthy() {
                    return Ok(Value::Bool(true));
                }
                Ok(Value::Bool(self.eval(right)?.is_truthy()))
            }
            _ => {
                let l = self.eval(left)?;
                let r = self.eval(right)?;
                native::binary(op, &l, &r)
            }
        }
    }

    // -------------------------------------------------------------------------
    // Calls
    // -------------------------------------------------------------------------

    fn call(&mut self, function: &str, args: &[Expr]) -> Result<Value> {
        // Builtins win over module functions of the same name.
        if native::is_builtin(function) {
            let values = self.eval_args(args)?;
            return native::call(function, &values, self.rng);
        }
        let rules = self.rules;
        if let Some(def) = rules.function(function) {
            let values = self.eval_args(args)?;
            return self.invoke(function, &def.params, &def.body, values);
        }
        Err(Error::unknown_function(function))
    }

    fn call_bound(&mut self, entity: &EntityRef, function: &str, args: &[Expr]) -> Result<Value> {
        let Some(id) = self.resolve_entity(entity)? else {
            return Ok(Value::Null);
        };
        let bound = bound::resolve(self.world, id, function)?.clone();
        let values = self.eval_args(args)?;
        let frame = format!("{function}@{id}");
        self.invoke(&frame, &bound.params, &bound.body, values)
    }

    fn eval_args(&mut self, args: &[Expr]) -> Result<Vec<Value>> {
        args.iter().map(|arg| self.eval(arg)).collect()
    }

    /// Runs a function body in a fresh parameter scope.
    fn invoke(
        &mut self,
        name: &str,
        params: &[Param],
        body: &Expr,
        args: Vec<Value>,
    ) -> Result<Value> {
        if params.len() != args.len() {
            return Err(Error::arity_mismatch(name, params.len().to_string(), args.len()));
        }
        let limit = self.limits.max_call_depth;
        if self.frames.len() >= limit {
            return Err(Error::limit_exceeded(SemanticLimit::MaxCallDepth {
                limit,
                function: Some(name.to_string()),
            }));
        }

        let frame = params
            .iter()
            .map(|p| p.name.clone())
            .zip(args)
            .collect::<IndexMap<_, _>>();
        self.frames.push(frame);
        let result = self.eval(body);
        self.frames.pop();
        result.map_err(|e| e.with_frame(name))
    }

    fn clone_entity(
        &mut self,
        entity: &EntityRef,
        overrides: &[ComponentOverride],
    ) -> Result<Value> {
        let Some(source) = self.resolve_entity(entity)? else {
            return Ok(Value::Null);
        };
        let copy = self.world.clone_entity(source, None)?;
        self.trace.record(|| TraceEvent::EntitySpawned { entity: copy });
        for o in overrides {
            let fields = self.eval_fields(&o.fields)?;
            for (field, value) in fields {
                self.world.set_field(copy, &o.component, &field, value)?;
            }
        }
        Ok(Value::Entity(copy))
    }
}
