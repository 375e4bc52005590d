// Copyright 2025 The Simlin Authors. All rights reserved.
// Use of this source code is governed by the Apache License,
// Version 2.0, that can be found in the LICENSE file.

pub mod expr;
pub mod poly;

use std::cmp::Ordering;
use std::fmt;
use std::hash::{Hash, Hasher};
use std::rc::Rc;
use std::sync::atomic::{AtomicU64, Ordering as AtomicOrdering};

pub use expr::{BinaryOp, BuiltinFn, Expr, SymbolTable, UnaryOp};
pub use poly::Poly;

static NEXT_SYMBOL_ID: AtomicU64 = AtomicU64::new(1);

/// Symbol is the algebraic handle bound to a variable definition.  Two
/// symbols are the same iff they were produced by the same call to
/// `Symbol::new`; the name is only used for printing, so a copied
/// model can reuse names without its expressions aliasing the source.
#[derive(Clone)]
pub struct Symbol {
    id: u64,
    name: Rc<str>,
}

impl Symbol {
    pub fn new(name: &str) -> Symbol {
        Symbol {
            id: NEXT_SYMBOL_ID.fetch_add(1, AtomicOrdering::Relaxed),
            name: Rc::from(name),
        }
    }

    /// fresh returns a new, distinct symbol with the same name.
    pub fn fresh(&self) -> Symbol {
        Symbol {
            id: NEXT_SYMBOL_ID.fetch_add(1, AtomicOrdering::Relaxed),
            name: self.name.clone(),
        }
    }

    pub fn id(&self) -> u64 {
        self.id
    }

    pub fn name(&self) -> &str {
        &self.name
    }
}

impl PartialEq for Symbol {
    fn eq(&self, other: &Self) -> bool {
        self.id == other.id
    }
}

impl Eq for Symbol {}

impl Hash for Symbol {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.id.hash(state);
    }
}

impl PartialOrd for Symbol {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for Symbol {
    fn cmp(&self, other: &Self) -> Ordering {
        self.id.cmp(&other.id)
    }
}

impl fmt::Debug for Symbol {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}#{}", self.name, self.id)
    }
}

impl fmt::Display for Symbol {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.name)
    }
}

/// Visitors walk Expr ASTs.
pub trait Visitor<T> {
    fn walk(&mut self, e: &Expr) -> T;
}

fn child_needs_parens(parent: &Expr, child: &Expr) -> bool {
    match parent {
        // no children so doesn't matter
        Expr::Const(_) | Expr::Sym(_) => false,
        // children are comma separated, so no ambiguity possible
        Expr::App(_, _) | Expr::Call(_, _) => false,
        Expr::Op1(_, _) => matches!(child, Expr::Op2(_, _, _)),
        Expr::Op2(parent_op, _, _) => match child {
            Expr::Const(n) => *n < 0.0,
            Expr::Sym(_) | Expr::App(_, _) | Expr::Call(_, _) | Expr::If(_, _, _) => false,
            Expr::Op1(_, _) => *parent_op == BinaryOp::Exp,
            // 3 * 2 + 1
            Expr::Op2(child_op, _, _) => {
                // if we have `3 * (2 + 3)`, the parent's precedence
                // is higher than the child and we need enclosing parens
                parent_op.precedence() >= child_op.precedence()
            }
        },
        Expr::If(_, _, _) => false,
    }
}

fn paren_if_necessary(parent: &Expr, child: &Expr, eqn: String) -> String {
    if child_needs_parens(parent, child) {
        format!("({})", eqn)
    } else {
        eqn
    }
}

struct PrintVisitor {}

impl Visitor<String> for PrintVisitor {
    fn walk(&mut self, expr: &Expr) -> String {
        match expr {
            Expr::Const(n) => format!("{}", n),
            Expr::Sym(sym) => sym.name().to_owned(),
            Expr::App(func, args) => {
                let args: Vec<String> = args.iter().map(|e| self.walk(e)).collect();
                format!("{}({})", func.name(), args.join(", "))
            }
            Expr::Call(func, args) => {
                let args: Vec<String> = args.iter().map(|e| self.walk(e)).collect();
                format!("{}({})", func, args.join(", "))
            }
            Expr::Op1(op, l) => {
                let l = paren_if_necessary(expr, l, self.walk(l));
                match op {
                    UnaryOp::Negative => format!("-{}", l),
                    UnaryOp::Not => format!("!{}", l),
                }
            }
            Expr::Op2(op, l, r) => {
                let l_str = self.walk(l);
                // left-associative operators only need parens on the left
                // when the child binds strictly looser
                let l_str = match l.as_ref() {
                    Expr::Op2(child_op, _, _) if child_op.precedence() == op.precedence() => {
                        if *op == BinaryOp::Exp {
                            format!("({})", l_str)
                        } else {
                            l_str
                        }
                    }
                    _ => paren_if_necessary(expr, l, l_str),
                };
                let r = paren_if_necessary(expr, r, self.walk(r));
                format!("{} {} {}", l_str, op.symbol(), r)
            }
            Expr::If(cond, t, f) => {
                let cond = self.walk(cond);
                let t = self.walk(t);
                let f = self.walk(f);
                format!("if ({}) then ({}) else ({})", cond, t, f)
            }
        }
    }
}

pub fn print_eqn(expr: &Expr) -> String {
    let mut visitor = PrintVisitor {};
    visitor.walk(expr)
}

impl fmt::Display for Expr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", print_eqn(self))
    }
}
