//! Action execution.

use cadence_foundation::{EntityId, Error, ErrorKind, Result, SemanticLimit, Value};
use cadence_ir::{Action, BinaryOp, ComponentInit, EntityRef, Expr, ModifyOp};
use indexmap::IndexMap;
use tracing::{debug, warn};

use super::{Interpreter, native};
use crate::scheduler::ScheduleOptions;
use crate::trace::TraceEvent;

/// A source or target slot of a schedule/emit action.
enum Slot {
    /// Not given.
    Absent,
    /// Given and resolved to a live entity.
    Entity(EntityId),
    /// Given but not a live entity.
    Unresolved,
}

impl Interpreter<'_> {
    /// Runs actions in order, stopping at the first error.
    pub(super) fn run_actions(&mut self, actions: &[Action]) -> Result<()> {
        for action in actions {
            self.run_action(action)?;
        }
        Ok(())
    }

    fn run_action(&mut self, action: &Action) -> Result<()> {
        match action {
            Action::Modify {
                entity,
                component,
                field,
                op,
                value,
            } => self.modify(entity, component, field, *op, value),
            Action::Schedule {
                event,
                delay,
                source,
                target,
                fields,
                interval,
            } => self.schedule(
                event,
                delay.as_ref(),
                source.as_ref(),
                target.as_ref(),
                fields,
                interval.as_ref(),
            ),
            Action::Emit {
                event,
                source,
                target,
                fields,
            } => self.schedule(event, None, source.as_ref(), target.as_ref(), fields, None),
            Action::Spawn { components } => self.spawn(components),
            Action::Despawn { entity } => {
                let Some(id) = self.resolve_entity(entity)? else {
                    debug!(rule = %self.rule, "despawn target not found");
                    return Ok(());
                };
                self.world.delete_entity(id)?;
                self.trace.record(|| TraceEvent::EntityDespawned { entity: id });
                Ok(())
            }
            Action::AddComponent { entity, component } => {
                let Some(id) = self.resolve_entity(entity)? else {
                    return Ok(());
                };
                let fields = self.eval_fields(&component.fields)?;
                self.world.add_component(id, &component.name, fields.iter())
            }
            Action::RemoveComponent { entity, component } => {
                if let Some(id) = self.resolve_entity(entity)? {
                    self.world.remove_component(id, component)?;
                }
                Ok(())
            }
            Action::Conditional {
                condition,
                then_actions,
                else_actions,
            } => {
                if self.eval(condition)?.is_truthy() {
                    self.run_actions(then_actions)
                } else if let Some(else_actions) = else_actions {
                    self.run_actions(else_actions)
                } else {
                    Ok(())
                }
            }
            Action::Loop {
                variable,
                iterable,
                body,
            } => self.run_loop(variable, iterable, body),
            Action::Let { name, value } => {
                let value = self.eval(value)?;
                self.locals.insert(name.clone(), value);
                Ok(())
            }
            Action::While { condition, body } => self.run_while(condition, body),
        }
    }

    /// Read-modify-write of one field. The write is coerced to the declared
    /// field type, so integer fields truncate fractional results.
    fn modify(
        &mut self,
        entity: &EntityRef,
        component: &str,
        field: &str,
        op: ModifyOp,
        value: &Expr,
    ) -> Result<()> {
        let Some(id) = self.resolve_entity(entity)? else {
            debug!(rule = %self.rule, component, field, "modify target not found");
            return Ok(());
        };
        let operand = self.eval(value)?;
        if operand.is_null() {
            return Ok(());
        }

        let new_value = match op {
            ModifyOp::Set => operand,
            ModifyOp::Add | ModifyOp::Subtract | ModifyOp::Multiply | ModifyOp::Divide => {
                let current = self
                    .world
                    .get_field(id, component, field)
                    .or_else(|| self.world.field_default(component, field))
                    .cloned()
                    .unwrap_or(Value::Int(0));
                let op = match op {
                    ModifyOp::Add => BinaryOp::Add,
                    ModifyOp::Subtract => BinaryOp::Subtract,
                    ModifyOp::Multiply => BinaryOp::Multiply,
                    _ => BinaryOp::Divide,
                };
                native::binary(op, &current, &operand)?
            }
        };
        self.world.set_field(id, component, field, new_value)
    }

    fn schedule(
        &mut self,
        event: &str,
        delay: Option<&Expr>,
        source: Option<&Expr>,
        target: Option<&Expr>,
        fields: &IndexMap<String, Expr>,
        interval: Option<&Expr>,
    ) -> Result<()> {
        let mut opts = ScheduleOptions::new();
        match self.slot(source)? {
            Slot::Absent => {}
            Slot::Entity(id) => opts.source = Some(id),
            Slot::Unresolved => {
                debug!(rule = %self.rule, event, "event source not found; not scheduled");
                return Ok(());
            }
        }
        match self.slot(target)? {
            Slot::Absent => {}
            Slot::Entity(id) => opts.target = Some(id),
            Slot::Unresolved => {
                debug!(rule = %self.rule, event, "event target not found; not scheduled");
                return Ok(());
            }
        }
        opts.fields = self.eval_fields(fields)?;

        let delay = match delay {
            Some(expr) => self.eval_number(expr, "delay")?.unwrap_or(0.0),
            None => 0.0,
        };
        let interval = match interval {
            Some(expr) => self.eval_number(expr, "interval")?,
            None => None,
        };

        let id = match interval {
            Some(interval) => self
                .scheduler
                .schedule_recurring_after(event, delay, interval, opts)?,
            None => self.scheduler.schedule(event, delay, opts),
        };
        debug!(rule = %self.rule, event, id, delay, "scheduled");
        Ok(())
    }

    fn slot(&mut self, expr: Option<&Expr>) -> Result<Slot> {
        let Some(expr) = expr else {
            return Ok(Slot::Absent);
        };
        let value = self.eval(expr)?;
        Ok(self.live_entity(&value).map_or(Slot::Unresolved, Slot::Entity))
    }

    fn spawn(&mut self, components: &[ComponentInit]) -> Result<()> {
        // Evaluate first so a failing initializer leaves no half-built entity.
        let mut inits = Vec::with_capacity(components.len());
        for init in components {
            inits.push((init.name.as_str(), self.eval_fields(&init.fields)?));
        }
        let id = self.world.create_entity();
        for (name, fields) in &inits {
            self.world.add_component(id, name, fields.iter())?;
        }
        self.trace.record(|| TraceEvent::EntitySpawned { entity: id });
        debug!(rule = %self.rule, entity = %id, "spawned");
        Ok(())
    }

    /// Runs `body` once per element. `null` iterates nothing; visiting stops
    /// at the loop cap.
    fn run_loop(&mut self, variable: &str, iterable: &Expr, body: &[Action]) -> Result<()> {
        let items = match self.eval(iterable)? {
            Value::Null => return Ok(()),
            Value::List(items) => items,
            other => return Err(Error::new(ErrorKind::NotIterable(other.type_name().to_string()))),
        };

        let limit = self.limits.max_loop_iterations;
        if items.len() > limit {
            self.limit_reached(SemanticLimit::MaxLoopIterations { limit });
        }

        let saved = self.locals.get(variable).cloned();
        let mut result = Ok(());
        for item in items.iter().take(limit) {
            self.locals.insert(variable.to_string(), item.clone());
            result = self.run_actions(body);
            if result.is_err() {
                break;
            }
        }
        match saved {
            Some(value) => {
                self.locals.insert(variable.to_string(), value);
            }
            None => {
                self.locals.shift_remove(variable);
            }
        }
        result
    }

    /// Runs `body` while `condition` holds, stopping at the while cap.
    fn run_while(&mut self, condition: &Expr, body: &[Action]) -> Result<()> {
        let limit = self.limits.max_while_iterations;
        let mut iterations = 0;
        while self.eval(condition)?.is_truthy() {
            if iterations >= limit {
                self.limit_reached(SemanticLimit::MaxWhileIterations { limit });
                break;
            }
            self.run_actions(body)?;
            iterations += 1;
        }
        Ok(())
    }

    fn limit_reached(&mut self, limit: SemanticLimit) {
        warn!(rule = %self.rule, %limit, "iteration cap reached; stopping");
        let rule = self.rule.clone();
        self.trace.record(|| TraceEvent::LimitReached { rule, limit });
    }
}
