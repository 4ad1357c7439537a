// Copyright (c) Microsoft Corporation.
// Licensed under the MIT License.

use crate::ast::*;
use crate::builtins::keywords::eval_keyword;
use crate::builtins::locals::SETTERS;
use crate::builtins::regex::RegexCache;
use crate::builtins::{self};
use crate::lexer::Span;
use crate::number::Number;
use crate::utils::limits::ConditionCounter;
use crate::value::Value;
use crate::variables::{keywords, ReadMode, VarLookup, VariableHolder, VariableSource};

use core::cmp::Ordering;
use std::collections::HashMap;

use anyhow::Result;
use log::debug;

/// Tree-walking evaluator for one rule against one action's variables.
///
/// Locals assigned by the rule live only as long as the interpreter. The
/// condition counter and the regex cache are borrowed so that a runner can
/// share them across a batch of filters.
pub struct Interpreter<'a> {
    vars: VarLookup<'a>,
    locals: HashMap<String, Value>,
    counter: &'a mut ConditionCounter,
    regex: &'a mut RegexCache,
}

impl<'a> Interpreter<'a> {
    pub fn new(
        holder: &'a mut VariableHolder,
        source: &'a dyn VariableSource,
        counter: &'a mut ConditionCounter,
        regex: &'a mut RegexCache,
    ) -> Self {
        Self {
            vars: VarLookup::new(holder, source),
            locals: HashMap::new(),
            counter,
            regex,
        }
    }

    /// Value of the last statement of `rule`.
    pub fn evaluate(&mut self, rule: &Rule) -> Result<Value> {
        self.locals.clear();
        self.eval_expr(&rule.root)
    }

    /// Truth value of `rule`; `Undefined` does not match.
    pub fn check(&mut self, rule: &Rule) -> Result<bool> {
        Ok(self.evaluate(rule)?.to_bool())
    }

    fn raise_condition(&mut self) -> Result<()> {
        Ok(self.counter.raise(1)?)
    }

    fn eval_expr(&mut self, expr: &Ref<Expr>) -> Result<Value> {
        match expr.as_ref() {
            Expr::Literal { value, .. } => Ok(value.clone()),
            Expr::Var { span, name } => self.eval_var(span, name),
            Expr::Array { items, .. } => self.eval_array(items),
            Expr::Unary { span, op, expr } => self.eval_unary(span, *op, expr),
            Expr::Arith { span, op, lhs, rhs } => self.eval_arith_expr(span, *op, lhs, rhs),
            Expr::Compare { op, lhs, rhs, .. } => self.eval_bool_expr(*op, lhs, rhs),
            Expr::Logic { op, lhs, rhs, .. } => self.eval_logic_expr(*op, lhs, rhs),
            Expr::Keyword { op, lhs, rhs, .. } => self.eval_keyword_expr(*op, lhs, rhs),
            Expr::Conditional {
                cond,
                then,
                otherwise,
                ..
            } => self.eval_conditional(cond, then, otherwise.as_ref()),
            Expr::Call { span, name, args } => self.eval_call(span, name, args),
            Expr::Index { span, expr, index } => self.eval_index(span, expr, index),
            Expr::Assign { span, name, value } => self.eval_assign(span, name, value),
            Expr::IndexAssign {
                span,
                name,
                index,
                value,
            } => self.eval_index_assign(span, name, index.as_ref(), value),
            Expr::Sequence { stmts, .. } => {
                let mut result = Value::Null;
                for stmt in stmts {
                    result = self.eval_expr(stmt)?;
                }
                Ok(result)
            }
        }
    }

    fn eval_var(&mut self, span: &Span, name: &str) -> Result<Value> {
        if let Some(v) = self.locals.get(name) {
            return Ok(v.clone());
        }
        if keywords::is_disabled(name) {
            return Err(span.user_error("disabledvar", vec![Value::from(name)]));
        }
        if !keywords::is_builtin(name) && !self.vars.holder().has(name) {
            return Err(span.user_error("unrecognisedvar", vec![Value::from(name)]));
        }
        self.vars.get(name, ReadMode::Bc)
    }

    fn eval_array(&mut self, items: &[Ref<Expr>]) -> Result<Value> {
        let mut array = Vec::with_capacity(items.len());
        for item in items {
            array.push(self.eval_expr(item)?);
        }
        Ok(Value::from(array))
    }

    fn eval_unary(&mut self, span: &Span, op: UnaryOp, expr: &Ref<Expr>) -> Result<Value> {
        let v = self.eval_expr(expr)?;
        if v.is_undefined() {
            return Ok(Value::Undefined);
        }
        match op {
            UnaryOp::Not => Ok(Value::Bool(!v.to_bool())),
            UnaryOp::Neg | UnaryOp::Plus => {
                let Some(n) = v.to_arith_number() else {
                    return Err(span.user_error("arrayinarithmetic", vec![]));
                };
                Ok(Value::from(if op == UnaryOp::Neg { n.neg() } else { n }))
            }
        }
    }

    fn eval_arith_expr(
        &mut self,
        span: &Span,
        op: ArithOp,
        lhs: &Ref<Expr>,
        rhs: &Ref<Expr>,
    ) -> Result<Value> {
        let lhs = self.eval_expr(lhs)?;
        let rhs = self.eval_expr(rhs)?;
        if lhs.is_undefined() || rhs.is_undefined() {
            return Ok(Value::Undefined);
        }

        if op == ArithOp::Add {
            match (&lhs, &rhs) {
                (Value::Array(a), Value::Array(b)) => {
                    let mut joined = a.as_ref().clone();
                    joined.extend(b.iter().cloned());
                    return Ok(Value::from(joined));
                }
                (Value::String(_), _) | (_, Value::String(_)) => {
                    return Ok(Value::from(lhs.to_af_string() + &rhs.to_af_string()));
                }
                _ => (),
            }
        }

        let (Some(a), Some(b)) = (lhs.to_arith_number(), rhs.to_arith_number()) else {
            return Err(span.user_error("arrayinarithmetic", vec![]));
        };
        let result = match op {
            ArithOp::Add => Some(a.add(b)),
            ArithOp::Sub => Some(a.sub(b)),
            ArithOp::Mul => Some(a.mul(b)),
            ArithOp::Div => a.div(b),
            ArithOp::Mod => a.rem(b),
            ArithOp::Pow => Some(a.pow(b)),
        };
        match result {
            Some(n) => Ok(Value::from(n)),
            None => Err(span.user_error("dividebyzero", vec![lhs])),
        }
    }

    fn eval_bool_expr(&mut self, op: BoolOp, lhs: &Ref<Expr>, rhs: &Ref<Expr>) -> Result<Value> {
        self.raise_condition()?;
        let lhs = self.eval_expr(lhs)?;
        let rhs = self.eval_expr(rhs)?;
        match op {
            BoolOp::StrictEq => return Ok(Value::Bool(lhs.strict_eq(&rhs))),
            BoolOp::StrictNe => return Ok(Value::Bool(!lhs.strict_eq(&rhs))),
            _ if lhs.is_undefined() || rhs.is_undefined() => return Ok(Value::Undefined),
            _ => (),
        }
        let ord = lhs.loose_cmp(&rhs);
        Ok(Value::Bool(match op {
            BoolOp::Eq => lhs.loose_eq(&rhs),
            BoolOp::Ne => !lhs.loose_eq(&rhs),
            BoolOp::Lt => ord == Some(Ordering::Less),
            BoolOp::Le => matches!(ord, Some(Ordering::Less | Ordering::Equal)),
            BoolOp::Gt => ord == Some(Ordering::Greater),
            BoolOp::Ge => matches!(ord, Some(Ordering::Greater | Ordering::Equal)),
            BoolOp::StrictEq | BoolOp::StrictNe => false,
        }))
    }

    fn eval_logic_expr(&mut self, op: LogicOp, lhs: &Ref<Expr>, rhs: &Ref<Expr>) -> Result<Value> {
        self.raise_condition()?;
        let lhs = self.eval_expr(lhs)?;
        match op {
            LogicOp::And if !lhs.to_bool() && !lhs.is_undefined() => return Ok(Value::Bool(false)),
            LogicOp::Or if lhs.to_bool() => return Ok(Value::Bool(true)),
            _ => (),
        }
        let rhs = self.eval_expr(rhs)?;
        if lhs.is_undefined() || rhs.is_undefined() {
            return Ok(Value::Undefined);
        }
        let (a, b) = (lhs.to_bool(), rhs.to_bool());
        Ok(Value::Bool(match op {
            LogicOp::And => a && b,
            LogicOp::Or => a || b,
            LogicOp::Xor => a ^ b,
        }))
    }

    fn eval_keyword_expr(
        &mut self,
        op: KeywordOp,
        lhs: &Ref<Expr>,
        rhs: &Ref<Expr>,
    ) -> Result<Value> {
        self.raise_condition()?;
        let l = self.eval_expr(lhs)?;
        let r = self.eval_expr(rhs)?;
        if l.is_undefined() || r.is_undefined() {
            return Ok(Value::Undefined);
        }
        Ok(Value::Bool(eval_keyword(self.regex, rhs.span(), op, &l, &r)?))
    }

    fn eval_conditional(
        &mut self,
        cond: &Ref<Expr>,
        then: &Ref<Expr>,
        otherwise: Option<&Ref<Expr>>,
    ) -> Result<Value> {
        self.raise_condition()?;
        let c = self.eval_expr(cond)?;
        if c.is_undefined() {
            return Ok(Value::Undefined);
        }
        match (c.to_bool(), otherwise) {
            (true, _) => self.eval_expr(then),
            (false, Some(e)) => self.eval_expr(e),
            (false, None) => Ok(Value::Null),
        }
    }

    fn eval_call(&mut self, span: &Span, name: &str, params: &[Ref<Expr>]) -> Result<Value> {
        self.raise_condition()?;
        let builtin = builtins::lookup(span, name, params.len())?;

        if SETTERS.contains(&name) {
            let Some(var) = params[0].as_string_literal() else {
                return Err(params[0].span().user_error("variablevariable", vec![]));
            };
            let var = var.to_ascii_lowercase();
            if keywords::is_builtin(&var) {
                return Err(params[0].span().user_error("overridebuiltin", vec![Value::from(var)]));
            }
            let value = self.eval_expr(&params[1])?;
            self.locals.insert(var, value.clone());
            return (builtin.fcn)(self.regex, span, params, &[Value::Null, value]);
        }

        let mut args = Vec::with_capacity(params.len());
        for p in params {
            args.push(self.eval_expr(p)?);
        }
        if args.iter().any(Value::is_undefined) {
            debug!("{name} called with an undefined argument");
            return Ok(Value::Undefined);
        }
        (builtin.fcn)(self.regex, span, params, &args)
    }

    fn eval_index(&mut self, span: &Span, expr: &Ref<Expr>, index: &Ref<Expr>) -> Result<Value> {
        let v = self.eval_expr(expr)?;
        let idx = self.eval_expr(index)?;
        if v.is_undefined() || idx.is_undefined() {
            return Ok(Value::Undefined);
        }
        let Value::Array(items) = &v else {
            return Err(span.user_error("notarray", vec![]));
        };
        let pos = checked_index(index.span(), &idx, items.len())?;
        Ok(items[pos].clone())
    }

    fn eval_assign(&mut self, span: &Span, name: &str, value: &Ref<Expr>) -> Result<Value> {
        if keywords::is_builtin(name) {
            return Err(span.user_error("overridebuiltin", vec![Value::from(name)]));
        }
        let value = self.eval_expr(value)?;
        self.locals.insert(name.to_string(), value.clone());
        Ok(value)
    }

    fn eval_index_assign(
        &mut self,
        span: &Span,
        name: &str,
        index: Option<&Ref<Expr>>,
        value: &Ref<Expr>,
    ) -> Result<Value> {
        if keywords::is_builtin(name) {
            return Err(span.user_error("overridebuiltin", vec![Value::from(name)]));
        }
        let Some(current) = self.locals.get(name).cloned() else {
            return Err(span.user_error("unrecognisedvar", vec![Value::from(name)]));
        };
        let idx = match index {
            Some(e) => Some((e, self.eval_expr(e)?)),
            None => None,
        };
        let value = self.eval_expr(value)?;

        let mut array = match current {
            Value::Array(_) => current,
            Value::Undefined => return Ok(Value::Undefined),
            _ => return Err(span.user_error("notarray", vec![])),
        };
        let items = array.as_array_mut()?;
        match idx {
            None => items.push(value.clone()),
            Some((_, Value::Undefined)) => {
                self.locals.insert(name.to_string(), Value::Undefined);
                return Ok(Value::Undefined);
            }
            Some((e, i)) => {
                let pos = checked_index(e.span(), &i, items.len())?;
                items[pos] = value.clone();
            }
        }
        self.locals.insert(name.to_string(), array);
        Ok(value)
    }
}

fn checked_index(span: &Span, idx: &Value, len: usize) -> Result<usize> {
    let i = match idx.to_number() {
        Number::Int(i) => i,
        Number::Float(f) => f as i64,
    };
    if i < 0 {
        return Err(span.user_error("negativeindex", vec![Value::Int(i)]));
    }
    if i as u64 >= len as u64 {
        return Err(span.user_error("outofbounds", vec![Value::Int(i), Value::from(len)]));
    }
    Ok(i as usize)
}
