// Copyright 2025 The Simlin Authors. All rights reserved.
// Use of this source code is governed by the Apache License,
// Version 2.0, that can be found in the LICENSE file.

use std::collections::{BTreeSet, HashMap};

use crate::ast::Symbol;
use crate::common::Ident;

/// A rewrite table from symbols to replacement expressions.
pub type SymbolTable = HashMap<Symbol, Expr>;

#[derive(PartialEq, Eq, Clone, Copy, Debug)]
pub enum BuiltinFn {
    Abs,
    Exp,
    Ln,
    Log10,
    Sqrt,
    Sin,
    Cos,
    Tan,
    Arcsin,
    Arccos,
    Arctan,
    Floor,
    Ceiling,
    Min,
    Max,
    Delay,
    Pi,
}

impl BuiltinFn {
    pub fn name(&self) -> &'static str {
        use BuiltinFn::*;
        match self {
            Abs => "abs",
            Exp => "exp",
            Ln => "ln",
            Log10 => "log10",
            Sqrt => "sqrt",
            Sin => "sin",
            Cos => "cos",
            Tan => "tan",
            Arcsin => "arcsin",
            Arccos => "arccos",
            Arctan => "arctan",
            Floor => "floor",
            Ceiling => "ceiling",
            Min => "min",
            Max => "max",
            Delay => "delay",
            Pi => "pi",
        }
    }

    pub fn from_name(name: &str) -> Option<BuiltinFn> {
        use BuiltinFn::*;
        let func = match name {
            "abs" => Abs,
            "exp" => Exp,
            "ln" => Ln,
            "log10" => Log10,
            "sqrt" => Sqrt,
            "sin" => Sin,
            "cos" => Cos,
            "tan" => Tan,
            "arcsin" => Arcsin,
            "arccos" => Arccos,
            "arctan" => Arctan,
            "floor" => Floor,
            "ceiling" => Ceiling,
            "min" => Min,
            "max" => Max,
            "delay" => Delay,
            "pi" => Pi,
            _ => return None,
        };
        Some(func)
    }

    /// eval applies the function to constant arguments.  `delay` has
    /// no value outside of a simulation, and arity mismatches don't
    /// evaluate either.
    fn eval(&self, args: &[f64]) -> Option<f64> {
        use BuiltinFn::*;
        let unary = |f: fn(f64) -> f64| match args {
            [x] => Some(f(*x)),
            _ => None,
        };
        match self {
            Abs => unary(f64::abs),
            Exp => unary(f64::exp),
            Ln => unary(f64::ln),
            Log10 => unary(f64::log10),
            Sqrt => unary(f64::sqrt),
            Sin => unary(f64::sin),
            Cos => unary(f64::cos),
            Tan => unary(f64::tan),
            Arcsin => unary(f64::asin),
            Arccos => unary(f64::acos),
            Arctan => unary(f64::atan),
            Floor => unary(f64::floor),
            Ceiling => unary(f64::ceil),
            Min => args.iter().copied().reduce(f64::min),
            Max => args.iter().copied().reduce(f64::max),
            Delay => None,
            Pi => {
                if args.is_empty() {
                    Some(std::f64::consts::PI)
                } else {
                    None
                }
            }
        }
    }
}

#[derive(PartialEq, Eq, Clone, Copy, Debug)]
pub enum BinaryOp {
    Add,
    Sub,
    Exp,
    Mul,
    Div,
    Gt,
    Lt,
    Gte,
    Lte,
    Eq,
    Neq,
    And,
    Or,
}

impl BinaryOp {
    // higher the precedence, the tighter the binding.
    // e.g. Mul.precedence() > Add.precedence()
    pub(crate) fn precedence(&self) -> u8 {
        match self {
            BinaryOp::Add => 4,
            BinaryOp::Sub => 4,
            BinaryOp::Exp => 6,
            BinaryOp::Mul => 5,
            BinaryOp::Div => 5,
            BinaryOp::Gt => 3,
            BinaryOp::Lt => 3,
            BinaryOp::Gte => 3,
            BinaryOp::Lte => 3,
            BinaryOp::Eq => 2,
            BinaryOp::Neq => 2,
            BinaryOp::And => 1,
            BinaryOp::Or => 1,
        }
    }

    pub(crate) fn symbol(&self) -> &'static str {
        match self {
            BinaryOp::Add => "+",
            BinaryOp::Sub => "-",
            BinaryOp::Exp => "^",
            BinaryOp::Mul => "*",
            BinaryOp::Div => "/",
            BinaryOp::Gt => ">",
            BinaryOp::Lt => "<",
            BinaryOp::Gte => ">=",
            BinaryOp::Lte => "<=",
            BinaryOp::Eq => "==",
            BinaryOp::Neq => "!=",
            BinaryOp::And => "&&",
            BinaryOp::Or => "||",
        }
    }

    fn eval(&self, l: f64, r: f64) -> f64 {
        let bool_to_f64 = |b: bool| if b { 1.0 } else { 0.0 };
        match self {
            BinaryOp::Add => l + r,
            BinaryOp::Sub => l - r,
            BinaryOp::Exp => l.powf(r),
            BinaryOp::Mul => l * r,
            BinaryOp::Div => l / r,
            BinaryOp::Gt => bool_to_f64(l > r),
            BinaryOp::Lt => bool_to_f64(l < r),
            BinaryOp::Gte => bool_to_f64(l >= r),
            BinaryOp::Lte => bool_to_f64(l <= r),
            BinaryOp::Eq => bool_to_f64(l == r),
            BinaryOp::Neq => bool_to_f64(l != r),
            BinaryOp::And => bool_to_f64(l != 0.0 && r != 0.0),
            BinaryOp::Or => bool_to_f64(l != 0.0 || r != 0.0),
        }
    }
}

#[derive(PartialEq, Eq, Clone, Copy, Debug)]
pub enum UnaryOp {
    Negative,
    Not,
}

/// Expr is a symbolic expression over variable symbols.  Symbols are
/// resolved by identity, never by name.
#[derive(PartialEq, Clone, Debug)]
pub enum Expr {
    Const(f64),
    Sym(Symbol),
    App(BuiltinFn, Vec<Expr>),
    /// Call of a user-defined function, by the function's identifier.
    Call(Ident, Vec<Expr>),
    Op1(UnaryOp, Box<Expr>),
    Op2(BinaryOp, Box<Expr>, Box<Expr>),
    If(Box<Expr>, Box<Expr>, Box<Expr>),
}

impl Default for Expr {
    fn default() -> Self {
        Expr::Const(0.0)
    }
}

impl From<f64> for Expr {
    fn from(n: f64) -> Self {
        Expr::Const(n)
    }
}

impl From<&Symbol> for Expr {
    fn from(sym: &Symbol) -> Self {
        Expr::Sym(sym.clone())
    }
}

impl Expr {
    pub fn num(n: f64) -> Expr {
        Expr::Const(n)
    }

    pub fn sym(sym: &Symbol) -> Expr {
        Expr::Sym(sym.clone())
    }

    pub fn pow(self, exp: Expr) -> Expr {
        Expr::Op2(BinaryOp::Exp, Box::new(self), Box::new(exp))
    }

    pub fn binary(op: BinaryOp, l: Expr, r: Expr) -> Expr {
        Expr::Op2(op, Box::new(l), Box::new(r))
    }

    pub fn as_const(&self) -> Option<f64> {
        match self {
            Expr::Const(n) => Some(*n),
            _ => None,
        }
    }

    pub fn as_symbol(&self) -> Option<&Symbol> {
        match self {
            Expr::Sym(sym) => Some(sym),
            _ => None,
        }
    }

    fn children(&self) -> Vec<&Expr> {
        match self {
            Expr::Const(_) | Expr::Sym(_) => vec![],
            Expr::App(_, args) | Expr::Call(_, args) => args.iter().collect(),
            Expr::Op1(_, l) => vec![l.as_ref()],
            Expr::Op2(_, l, r) => vec![l.as_ref(), r.as_ref()],
            Expr::If(cond, t, f) => vec![cond.as_ref(), t.as_ref(), f.as_ref()],
        }
    }

    fn children_mut(&mut self) -> Vec<&mut Expr> {
        match self {
            Expr::Const(_) | Expr::Sym(_) => vec![],
            Expr::App(_, args) | Expr::Call(_, args) => args.iter_mut().collect(),
            Expr::Op1(_, l) => vec![l.as_mut()],
            Expr::Op2(_, l, r) => vec![l.as_mut(), r.as_mut()],
            Expr::If(cond, t, f) => vec![cond.as_mut(), t.as_mut(), f.as_mut()],
        }
    }

    /// any returns true if `pred` holds for this node or any descendant.
    pub fn any(&self, pred: &impl Fn(&Expr) -> bool) -> bool {
        pred(self) || self.children().into_iter().any(|child| child.any(pred))
    }

    pub fn has_symbol(&self, sym: &Symbol) -> bool {
        self.any(&|e| matches!(e, Expr::Sym(s) if s == sym))
    }

    pub fn has_builtin(&self, func: BuiltinFn) -> bool {
        self.any(&|e| matches!(e, Expr::App(f, _) if *f == func))
    }

    pub fn has_calls(&self) -> bool {
        self.any(&|e| matches!(e, Expr::Call(_, _)))
    }

    /// free_symbols returns every symbol referenced by the expression,
    /// ordered by creation.
    pub fn free_symbols(&self) -> BTreeSet<Symbol> {
        let mut symbols = BTreeSet::new();
        self.collect_symbols(&mut symbols);
        symbols
    }

    fn collect_symbols(&self, symbols: &mut BTreeSet<Symbol>) {
        if let Expr::Sym(sym) = self {
            symbols.insert(sym.clone());
        }
        for child in self.children() {
            child.collect_symbols(symbols);
        }
    }

    /// for_each_symbol calls `f` once per symbol occurrence.
    pub fn for_each_symbol(&self, f: &mut impl FnMut(&Symbol)) {
        if let Expr::Sym(sym) = self {
            f(sym);
        }
        for child in self.children() {
            child.for_each_symbol(f);
        }
    }

    /// subs replaces every symbol that has an entry in `table`.  The
    /// replacement is not itself substituted again.
    pub fn subs(&self, table: &SymbolTable) -> Expr {
        let mut expr = self.clone();
        expr.subs_in_place(table);
        expr
    }

    /// subs_in_place is `subs` without the copy; it returns whether
    /// anything changed.
    pub fn subs_in_place(&mut self, table: &SymbolTable) -> bool {
        if table.is_empty() {
            return false;
        }
        if let Expr::Sym(sym) = self {
            if let Some(replacement) = table.get(sym) {
                *self = replacement.clone();
                return true;
            }
            return false;
        }
        let mut changed = false;
        for child in self.children_mut() {
            changed |= child.subs_in_place(table);
        }
        changed
    }

    /// rename swaps symbols for symbols, leaving structure untouched.
    pub fn rename(&mut self, translation: &HashMap<Symbol, Symbol>) {
        if let Expr::Sym(sym) = self {
            if let Some(new_sym) = translation.get(sym) {
                *sym = new_sym.clone();
            }
            return;
        }
        for child in self.children_mut() {
            child.rename(translation);
        }
    }

    /// rewrite_calls replaces user function calls bottom-up: arguments
    /// are rewritten before `f` sees the call.
    pub fn rewrite_calls(&mut self, f: &mut impl FnMut(&str, &[Expr]) -> Option<Expr>) {
        for child in self.children_mut() {
            child.rewrite_calls(f);
        }
        if let Expr::Call(name, args) = self {
            if let Some(replacement) = f(name, args) {
                *self = replacement;
            }
        }
    }

    /// eval_const evaluates an expression with no symbols and no
    /// user calls.
    pub fn eval_const(&self) -> Option<f64> {
        match self {
            Expr::Const(n) => Some(*n),
            Expr::Sym(_) | Expr::Call(_, _) => None,
            Expr::App(func, args) => {
                let args = args
                    .iter()
                    .map(|arg| arg.eval_const())
                    .collect::<Option<Vec<f64>>>()?;
                func.eval(&args)
            }
            Expr::Op1(op, l) => {
                let l = l.eval_const()?;
                match op {
                    UnaryOp::Negative => Some(-l),
                    UnaryOp::Not => Some(if l == 0.0 { 1.0 } else { 0.0 }),
                }
            }
            Expr::Op2(op, l, r) => Some(op.eval(l.eval_const()?, r.eval_const()?)),
            Expr::If(cond, t, f) => {
                if cond.eval_const()? != 0.0 {
                    t.eval_const()
                } else {
                    f.eval_const()
                }
            }
        }
    }

    /// fold evaluates constant subexpressions and drops arithmetic
    /// identities (`x + 0`, `1 * x`, `x ^ 1`, ...).
    pub fn fold(self) -> Expr {
        match self {
            Expr::Const(_) | Expr::Sym(_) => self,
            Expr::App(func, args) => {
                let args: Vec<Expr> = args.into_iter().map(|arg| arg.fold()).collect();
                let values: Option<Vec<f64>> = args.iter().map(|arg| arg.as_const()).collect();
                match values.and_then(|values| func.eval(&values)) {
                    Some(n) => Expr::Const(n),
                    None => Expr::App(func, args),
                }
            }
            Expr::Call(name, args) => {
                Expr::Call(name, args.into_iter().map(|arg| arg.fold()).collect())
            }
            Expr::Op1(op, l) => match (op, (*l).fold()) {
                (UnaryOp::Negative, Expr::Const(n)) => Expr::Const(-n),
                (UnaryOp::Negative, Expr::Op1(UnaryOp::Negative, inner)) => *inner,
                (UnaryOp::Not, Expr::Const(n)) => Expr::Const(if n == 0.0 { 1.0 } else { 0.0 }),
                (op, l) => Expr::Op1(op, Box::new(l)),
            },
            Expr::Op2(op, l, r) => fold_op2(op, (*l).fold(), (*r).fold()),
            Expr::If(cond, t, f) => match (*cond).fold() {
                Expr::Const(n) => {
                    if n != 0.0 {
                        (*t).fold()
                    } else {
                        (*f).fold()
                    }
                }
                cond => Expr::If(Box::new(cond), Box::new((*t).fold()), Box::new((*f).fold())),
            },
        }
    }
}

fn fold_op2(op: BinaryOp, l: Expr, r: Expr) -> Expr {
    use BinaryOp::*;
    match (op, l.as_const(), r.as_const()) {
        (_, Some(a), Some(b)) => Expr::Const(op.eval(a, b)),
        (Add, Some(a), None) if a == 0.0 => r,
        (Add | Sub, None, Some(b)) if b == 0.0 => l,
        (Sub, Some(a), None) if a == 0.0 => Expr::Op1(UnaryOp::Negative, Box::new(r)).fold(),
        (Mul, Some(a), None) if a == 1.0 => r,
        (Mul | Div, None, Some(b)) if b == 1.0 => l,
        (Mul, Some(a), None) if a == 0.0 => Expr::Const(0.0),
        (Mul, None, Some(b)) if b == 0.0 => Expr::Const(0.0),
        (Div, Some(a), None) if a == 0.0 => Expr::Const(0.0),
        (Exp, None, Some(b)) if b == 1.0 => l,
        (Exp, None, Some(b)) if b == 0.0 => Expr::Const(1.0),
        _ => Expr::binary(op, l, r),
    }
}

impl std::ops::Add for Expr {
    type Output = Expr;

    fn add(self, rhs: Expr) -> Expr {
        Expr::binary(BinaryOp::Add, self, rhs)
    }
}

impl std::ops::Sub for Expr {
    type Output = Expr;

    fn sub(self, rhs: Expr) -> Expr {
        Expr::binary(BinaryOp::Sub, self, rhs)
    }
}

impl std::ops::Mul for Expr {
    type Output = Expr;

    fn mul(self, rhs: Expr) -> Expr {
        Expr::binary(BinaryOp::Mul, self, rhs)
    }
}

impl std::ops::Div for Expr {
    type Output = Expr;

    fn div(self, rhs: Expr) -> Expr {
        Expr::binary(BinaryOp::Div, self, rhs)
    }
}

impl std::ops::Neg for Expr {
    type Output = Expr;

    fn neg(self) -> Expr {
        Expr::Op1(UnaryOp::Negative, Box::new(self))
    }
}
