//! Expression tree with differentiation and local simplification.

use std::collections::{BTreeSet, HashMap};
use std::fmt;
use std::ops::{Add, Div, Mul, Neg, Sub};
use std::sync::Arc;

/// Numeric values for the free symbols of an expression.
pub type Bindings = HashMap<String, f64>;

/// Elementary functions of one argument.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Func {
    Sin,
    Cos,
    Tan,
    Exp,
    Ln,
    Sqrt,
    Sinh,
    Cosh,
}

impl Func {
    pub fn name(self) -> &'static str {
        match self {
            Func::Sin => "sin",
            Func::Cos => "cos",
            Func::Tan => "tan",
            Func::Exp => "exp",
            Func::Ln => "ln",
            Func::Sqrt => "sqrt",
            Func::Sinh => "sinh",
            Func::Cosh => "cosh",
        }
    }

    pub fn from_name(name: &str) -> Option<Func> {
        let f = match name {
            "sin" => Func::Sin,
            "cos" => Func::Cos,
            "tan" => Func::Tan,
            "exp" => Func::Exp,
            "ln" | "log" => Func::Ln,
            "sqrt" => Func::Sqrt,
            "sinh" => Func::Sinh,
            "cosh" => Func::Cosh,
            _ => return None,
        };
        Some(f)
    }

    pub fn apply(self, x: f64) -> f64 {
        match self {
            Func::Sin => x.sin(),
            Func::Cos => x.cos(),
            Func::Tan => x.tan(),
            Func::Exp => x.exp(),
            Func::Ln => x.ln(),
            Func::Sqrt => x.sqrt(),
            Func::Sinh => x.sinh(),
            Func::Cosh => x.cosh(),
        }
    }
}

/// Symbolic expression.
#[derive(Clone, PartialEq)]
pub enum Expr {
    Const(f64),
    Symbol(String),
    Add(Arc<Expr>, Arc<Expr>),
    Sub(Arc<Expr>, Arc<Expr>),
    Mul(Arc<Expr>, Arc<Expr>),
    Div(Arc<Expr>, Arc<Expr>),
    Pow(Arc<Expr>, Arc<Expr>),
    Neg(Arc<Expr>),
    Fn(Func, Arc<Expr>),
}

impl Expr {
    pub fn constant(value: f64) -> Self {
        Expr::Const(value)
    }

    pub fn symbol(name: &str) -> Self {
        Expr::Symbol(name.to_string())
    }

    pub fn zero() -> Self {
        Expr::Const(0.0)
    }

    pub fn one() -> Self {
        Expr::Const(1.0)
    }

    pub fn is_zero(&self) -> bool {
        matches!(self, Expr::Const(x) if *x == 0.0)
    }

    pub fn is_one(&self) -> bool {
        matches!(self, Expr::Const(x) if *x == 1.0)
    }

    pub fn as_const(&self) -> Option<f64> {
        match self {
            Expr::Const(x) => Some(*x),
            _ => None,
        }
    }

    pub fn contains_var(&self, var: &str) -> bool {
        match self {
            Expr::Const(_) => false,
            Expr::Symbol(s) => s == var,
            Expr::Add(a, b)
            | Expr::Sub(a, b)
            | Expr::Mul(a, b)
            | Expr::Div(a, b)
            | Expr::Pow(a, b) => a.contains_var(var) || b.contains_var(var),
            Expr::Neg(a) | Expr::Fn(_, a) => a.contains_var(var),
        }
    }

    /// Names of all symbols in the tree.
    pub fn free_symbols(&self) -> BTreeSet<String> {
        let mut out = BTreeSet::new();
        self.collect_symbols(&mut out);
        out
    }

    fn collect_symbols(&self, out: &mut BTreeSet<String>) {
        match self {
            Expr::Const(_) => {}
            Expr::Symbol(s) => {
                out.insert(s.clone());
            }
            Expr::Add(a, b)
            | Expr::Sub(a, b)
            | Expr::Mul(a, b)
            | Expr::Div(a, b)
            | Expr::Pow(a, b) => {
                a.collect_symbols(out);
                b.collect_symbols(out);
            }
            Expr::Neg(a) | Expr::Fn(_, a) => a.collect_symbols(out),
        }
    }

    pub fn pow(self, exp: Expr) -> Expr {
        Expr::Pow(Arc::new(self), Arc::new(exp))
    }

    pub fn apply(self, func: Func) -> Expr {
        Expr::Fn(func, Arc::new(self))
    }

    pub fn sin(self) -> Expr {
        self.apply(Func::Sin)
    }

    pub fn cos(self) -> Expr {
        self.apply(Func::Cos)
    }

    pub fn tan(self) -> Expr {
        self.apply(Func::Tan)
    }

    pub fn exp(self) -> Expr {
        self.apply(Func::Exp)
    }

    pub fn ln(self) -> Expr {
        self.apply(Func::Ln)
    }

    pub fn sqrt(self) -> Expr {
        self.apply(Func::Sqrt)
    }

    pub fn sinh(self) -> Expr {
        self.apply(Func::Sinh)
    }

    pub fn cosh(self) -> Expr {
        self.apply(Func::Cosh)
    }

    /// Numeric value under `bindings`; `None` if a symbol is unbound.
    pub fn eval(&self, bindings: &Bindings) -> Option<f64> {
        let v = match self {
            Expr::Const(c) => *c,
            Expr::Symbol(s) => *bindings.get(s)?,
            Expr::Add(a, b) => a.eval(bindings)? + b.eval(bindings)?,
            Expr::Sub(a, b) => a.eval(bindings)? - b.eval(bindings)?,
            Expr::Mul(a, b) => a.eval(bindings)? * b.eval(bindings)?,
            Expr::Div(a, b) => a.eval(bindings)? / b.eval(bindings)?,
            Expr::Pow(a, b) => a.eval(bindings)?.powf(b.eval(bindings)?),
            Expr::Neg(a) => -a.eval(bindings)?,
            Expr::Fn(f, a) => f.apply(a.eval(bindings)?),
        };
        Some(v)
    }

    /// Value with `var = value` as the only binding; `None` if another symbol occurs.
    pub fn eval_at(&self, var: &str, value: f64) -> Option<f64> {
        let v = match self {
            Expr::Const(c) => *c,
            Expr::Symbol(s) if s == var => value,
            Expr::Symbol(_) => return None,
            Expr::Add(a, b) => a.eval_at(var, value)? + b.eval_at(var, value)?,
            Expr::Sub(a, b) => a.eval_at(var, value)? - b.eval_at(var, value)?,
            Expr::Mul(a, b) => a.eval_at(var, value)? * b.eval_at(var, value)?,
            Expr::Div(a, b) => a.eval_at(var, value)? / b.eval_at(var, value)?,
            Expr::Pow(a, b) => a.eval_at(var, value)?.powf(b.eval_at(var, value)?),
            Expr::Neg(a) => -a.eval_at(var, value)?,
            Expr::Fn(f, a) => f.apply(a.eval_at(var, value)?),
        };
        Some(v)
    }

    /// Replace every occurrence of `var` with `value`.
    pub fn substitute(&self, var: &str, value: &Expr) -> Expr {
        let sub = |e: &Arc<Expr>| Arc::new(e.substitute(var, value));
        match self {
            Expr::Const(_) => self.clone(),
            Expr::Symbol(s) if s == var => value.clone(),
            Expr::Symbol(_) => self.clone(),
            Expr::Add(a, b) => Expr::Add(sub(a), sub(b)),
            Expr::Sub(a, b) => Expr::Sub(sub(a), sub(b)),
            Expr::Mul(a, b) => Expr::Mul(sub(a), sub(b)),
            Expr::Div(a, b) => Expr::Div(sub(a), sub(b)),
            Expr::Pow(a, b) => Expr::Pow(sub(a), sub(b)),
            Expr::Neg(a) => Expr::Neg(sub(a)),
            Expr::Fn(f, a) => Expr::Fn(*f, sub(a)),
        }
    }
}

impl Add for Expr {
    type Output = Self;
    fn add(self, rhs: Self) -> Self {
        Expr::Add(Arc::new(self), Arc::new(rhs))
    }
}

impl Sub for Expr {
    type Output = Self;
    fn sub(self, rhs: Self) -> Self {
        Expr::Sub(Arc::new(self), Arc::new(rhs))
    }
}

impl Mul for Expr {
    type Output = Self;
    fn mul(self, rhs: Self) -> Self {
        Expr::Mul(Arc::new(self), Arc::new(rhs))
    }
}

impl Div for Expr {
    type Output = Self;
    fn div(self, rhs: Self) -> Self {
        Expr::Div(Arc::new(self), Arc::new(rhs))
    }
}

impl Neg for Expr {
    type Output = Self;
    fn neg(self) -> Self {
        Expr::Neg(Arc::new(self))
    }
}

impl From<f64> for Expr {
    fn from(value: f64) -> Self {
        Expr::Const(value)
    }
}

impl fmt::Debug for Expr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self)
    }
}

impl fmt::Display for Expr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Expr::Const(x) => {
                if x.fract() == 0.0 && x.abs() < 1e15 {
                    write!(f, "{}", *x as i64)
                } else {
                    write!(f, "{}", x)
                }
            }
            Expr::Symbol(s) => write!(f, "{}", s),
            Expr::Add(a, b) => write!(f, "({} + {})", a, b),
            Expr::Sub(a, b) => write!(f, "({} - {})", a, b),
            Expr::Mul(a, b) => write!(f, "({} * {})", a, b),
            Expr::Div(a, b) => write!(f, "({} / {})", a, b),
            Expr::Pow(a, b) => write!(f, "({})^({})", a, b),
            Expr::Neg(a) => write!(f, "(-{})", a),
            Expr::Fn(func, a) => write!(f, "{}({})", func.name(), a),
        }
    }
}

/// Local algebraic cleanup: identities with 0 and 1, constant folding, double
/// negation. Not a normal form; see [`super::canon`] for zero testing.
pub fn simplify(expr: &Expr) -> Expr {
    match expr {
        Expr::Const(_) | Expr::Symbol(_) => expr.clone(),

        Expr::Add(a, b) => {
            let a = simplify(a);
            let b = simplify(b);
            if a.is_zero() {
                return b;
            }
            if b.is_zero() {
                return a;
            }
            if let (Some(ca), Some(cb)) = (a.as_const(), b.as_const()) {
                return Expr::Const(ca + cb);
            }
            // a + (-b) = a - b
            if let Expr::Neg(inner) = &b {
                return Expr::Sub(Arc::new(a), inner.clone());
            }
            if a == b {
                return simplify(&(Expr::Const(2.0) * a));
            }
            Expr::Add(Arc::new(a), Arc::new(b))
        }

        Expr::Sub(a, b) => {
            let a = simplify(a);
            let b = simplify(b);
            if b.is_zero() {
                return a;
            }
            if a.is_zero() {
                return simplify(&(-b));
            }
            if a == b {
                return Expr::zero();
            }
            if let (Some(ca), Some(cb)) = (a.as_const(), b.as_const()) {
                return Expr::Const(ca - cb);
            }
            // a - (-b) = a + b
            if let Expr::Neg(inner) = &b {
                return Expr::Add(Arc::new(a), inner.clone());
            }
            Expr::Sub(Arc::new(a), Arc::new(b))
        }

        Expr::Mul(a, b) => {
            let a = simplify(a);
            let b = simplify(b);
            if a.is_zero() || b.is_zero() {
                return Expr::zero();
            }
            if a.is_one() {
                return b;
            }
            if b.is_one() {
                return a;
            }
            if let (Some(ca), Some(cb)) = (a.as_const(), b.as_const()) {
                return Expr::Const(ca * cb);
            }
            // Pull negations out so they can cancel
            match (&a, &b) {
                (Expr::Neg(x), Expr::Neg(y)) => {
                    return simplify(&((**x).clone() * (**y).clone()));
                }
                (Expr::Neg(x), _) => return -simplify(&((**x).clone() * b.clone())),
                (_, Expr::Neg(y)) => return -simplify(&(a.clone() * (**y).clone())),
                _ => {}
            }
            // Constants to the left
            if b.as_const().is_some() {
                return Expr::Mul(Arc::new(b), Arc::new(a));
            }
            if a == b {
                return Expr::Pow(Arc::new(a), Arc::new(Expr::Const(2.0)));
            }
            Expr::Mul(Arc::new(a), Arc::new(b))
        }

        Expr::Div(a, b) => {
            let a = simplify(a);
            let b = simplify(b);
            if a.is_zero() {
                return Expr::zero();
            }
            if b.is_one() {
                return a;
            }
            if a == b {
                return Expr::one();
            }
            if let (Some(ca), Some(cb)) = (a.as_const(), b.as_const()) {
                if cb != 0.0 {
                    return Expr::Const(ca / cb);
                }
            }
            Expr::Div(Arc::new(a), Arc::new(b))
        }

        Expr::Pow(a, b) => {
            let a = simplify(a);
            let b = simplify(b);
            if b.is_zero() {
                return Expr::one();
            }
            if b.is_one() {
                return a;
            }
            if a.is_one() {
                return Expr::one();
            }
            if let (Some(ca), Some(cb)) = (a.as_const(), b.as_const()) {
                return Expr::Const(ca.powf(cb));
            }
            Expr::Pow(Arc::new(a), Arc::new(b))
        }

        Expr::Neg(a) => {
            let a = simplify(a);
            if let Expr::Neg(inner) = &a {
                return (**inner).clone();
            }
            if let Some(c) = a.as_const() {
                return Expr::Const(-c);
            }
            Expr::Neg(Arc::new(a))
        }

        Expr::Fn(func, a) => {
            let a = simplify(a);
            if let Some(c) = a.as_const() {
                return Expr::Const(func.apply(c));
            }
            Expr::Fn(*func, Arc::new(a))
        }
    }
}

/// `d expr / d var`, simplified.
pub fn differentiate(expr: &Expr, var: &str) -> Expr {
    let result = match expr {
        Expr::Const(_) => Expr::zero(),
        Expr::Symbol(s) => {
            if s == var {
                Expr::one()
            } else {
                Expr::zero()
            }
        }
        Expr::Add(a, b) => differentiate(a, var) + differentiate(b, var),
        Expr::Sub(a, b) => differentiate(a, var) - differentiate(b, var),

        // Product rule
        Expr::Mul(a, b) => {
            let da = differentiate(a, var);
            let db = differentiate(b, var);
            da * (**b).clone() + (**a).clone() * db
        }

        // Quotient rule
        Expr::Div(a, b) => {
            let da = differentiate(a, var);
            let db = differentiate(b, var);
            (da * (**b).clone() - (**a).clone() * db) / ((**b).clone() * (**b).clone())
        }

        Expr::Pow(base, exp) => match (base.contains_var(var), exp.contains_var(var)) {
            (false, false) => Expr::zero(),
            // n b^(n-1) b'
            (true, false) => {
                let n = (**exp).clone();
                n.clone() * (**base).clone().pow(n - Expr::one()) * differentiate(base, var)
            }
            // a^g ln(a) g'
            (false, true) => expr.clone() * (**base).clone().ln() * differentiate(exp, var),
            // f^g (g' ln f + g f' / f)
            (true, true) => {
                let df = differentiate(base, var);
                let dg = differentiate(exp, var);
                expr.clone()
                    * (dg * (**base).clone().ln() + (**exp).clone() * df / (**base).clone())
            }
        },

        Expr::Neg(a) => -differentiate(a, var),

        // Chain rule
        Expr::Fn(func, arg) => {
            let u = (**arg).clone();
            let outer = match func {
                Func::Sin => u.cos(),
                Func::Cos => -u.sin(),
                Func::Tan => {
                    let c = u.cos();
                    Expr::one() / (c.clone() * c)
                }
                Func::Exp => u.exp(),
                Func::Ln => Expr::one() / u,
                Func::Sqrt => Expr::one() / (Expr::Const(2.0) * u.sqrt()),
                Func::Sinh => u.cosh(),
                Func::Cosh => u.sinh(),
            };
            outer * differentiate(arg, var)
        }
    };
    simplify(&result)
}
