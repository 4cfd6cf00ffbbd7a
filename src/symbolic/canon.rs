//! Sum-of-monomials normal form for zero testing.
//!
//! A monomial is `coeff * prod(atom_k ^ p_k) * exp(arg)` where atoms are symbols
//! or non-polynomial subterms keyed by their own normal form, and every
//! exponential factor of the product has been merged into the single `exp(arg)`.
//! Two monomials with equal atoms and equal `arg` are like terms. Sums of like
//! terms that cancel to within a relative `1e-12` are dropped.

use std::collections::BTreeMap;

use super::expr::{Expr, Func};

const CANCEL_RTOL: f64 = 1e-12;
/// Largest integer power of a sum that is expanded by repeated multiplication.
const MAX_EXPANDED_POWER: f64 = 8.0;

#[derive(Debug, Clone, PartialEq)]
struct Monomial {
    coeff: f64,
    atoms: BTreeMap<String, f64>,
    exponent: Poly,
}

/// Canonical polynomial over atoms.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Poly {
    terms: Vec<Monomial>,
}

impl Monomial {
    fn constant(c: f64) -> Self {
        Self {
            coeff: c,
            atoms: BTreeMap::new(),
            exponent: Poly::zero(),
        }
    }

    fn atom(key: String, power: f64) -> Self {
        let mut atoms = BTreeMap::new();
        atoms.insert(key, power);
        Self {
            coeff: 1.0,
            atoms,
            exponent: Poly::zero(),
        }
    }

    fn is_constant(&self) -> bool {
        self.atoms.is_empty() && self.exponent.is_zero()
    }

    /// Everything but the coefficient.
    fn key(&self) -> String {
        let mut key = String::new();
        for (atom, p) in &self.atoms {
            key.push_str(&format!("[{atom}]^{}", fmt_coeff(*p)));
        }
        if !self.exponent.is_zero() {
            key.push_str(&format!("exp[{}]", self.exponent.key()));
        }
        key
    }

    fn mul(&self, other: &Monomial) -> Monomial {
        let mut atoms = self.atoms.clone();
        for (atom, p) in &other.atoms {
            let entry = atoms.entry(atom.clone()).or_insert(0.0);
            *entry += p;
        }
        atoms.retain(|_, p| *p != 0.0);
        Monomial {
            coeff: self.coeff * other.coeff,
            atoms,
            exponent: self.exponent.add(&other.exponent),
        }
    }

    /// `self ^ n`, or `None` when the coefficient has no real power.
    fn powf(&self, n: f64) -> Option<Monomial> {
        if self.coeff < 0.0 && n.fract() != 0.0 {
            return None;
        }
        Some(Monomial {
            coeff: self.coeff.powf(n),
            atoms: self
                .atoms
                .iter()
                .map(|(a, p)| (a.clone(), p * n))
                .filter(|(_, p)| *p != 0.0)
                .collect(),
            exponent: self.exponent.scale(n),
        })
    }
}

impl Poly {
    pub fn zero() -> Self {
        Self { terms: Vec::new() }
    }

    fn constant(c: f64) -> Self {
        Self::from_terms(vec![Monomial::constant(c)])
    }

    fn atom(key: String) -> Self {
        Self::from_terms(vec![Monomial::atom(key, 1.0)])
    }

    /// Collect like terms and drop cancelled ones.
    fn from_terms(terms: Vec<Monomial>) -> Self {
        let mut groups: BTreeMap<String, (Monomial, f64)> = BTreeMap::new();
        for term in terms {
            let key = term.key();
            match groups.get_mut(&key) {
                Some((acc, scale)) => {
                    acc.coeff += term.coeff;
                    *scale += term.coeff.abs();
                }
                None => {
                    let scale = term.coeff.abs();
                    groups.insert(key, (term, scale));
                }
            }
        }
        let terms = groups
            .into_values()
            .filter(|(m, scale)| m.coeff != 0.0 && m.coeff.abs() > CANCEL_RTOL * scale)
            .map(|(m, _)| m)
            .collect();
        Self { terms }
    }

    pub fn is_zero(&self) -> bool {
        self.terms.is_empty()
    }

    /// The value if the polynomial is a bare number.
    pub fn as_constant(&self) -> Option<f64> {
        match self.terms.as_slice() {
            [] => Some(0.0),
            [m] if m.is_constant() => Some(m.coeff),
            _ => None,
        }
    }

    /// Stable textual key; equal keys mean equal normal forms.
    pub fn key(&self) -> String {
        if self.terms.is_empty() {
            return "0".to_string();
        }
        self.terms
            .iter()
            .map(|m| format!("{}*{}", fmt_coeff(m.coeff), m.key()))
            .collect::<Vec<_>>()
            .join(" + ")
    }

    pub fn len(&self) -> usize {
        self.terms.len()
    }

    pub fn is_empty(&self) -> bool {
        self.terms.is_empty()
    }

    fn add(&self, other: &Poly) -> Poly {
        let mut terms = self.terms.clone();
        terms.extend(other.terms.iter().cloned());
        Poly::from_terms(terms)
    }

    fn scale(&self, c: f64) -> Poly {
        Poly::from_terms(
            self.terms
                .iter()
                .map(|m| Monomial {
                    coeff: m.coeff * c,
                    ..m.clone()
                })
                .collect(),
        )
    }

    fn mul(&self, other: &Poly) -> Poly {
        let mut terms = Vec::with_capacity(self.terms.len() * other.terms.len());
        for a in &self.terms {
            for b in &other.terms {
                terms.push(a.mul(b));
            }
        }
        Poly::from_terms(terms)
    }

    /// `exp(self)`: constant terms become a coefficient, the rest the exponent.
    fn exp(&self) -> Poly {
        let mut coeff = 1.0;
        let mut rest = Vec::new();
        for m in &self.terms {
            if m.is_constant() {
                coeff *= m.coeff.exp();
            } else {
                rest.push(m.clone());
            }
        }
        Poly::from_terms(vec![Monomial {
            coeff,
            atoms: BTreeMap::new(),
            exponent: Poly { terms: rest },
        }])
    }

    fn powf(&self, n: f64) -> Poly {
        if let [m] = self.terms.as_slice() {
            if let Some(p) = m.powf(n) {
                return Poly::from_terms(vec![p]);
            }
        }
        if n >= 0.0 && n.fract() == 0.0 && n <= MAX_EXPANDED_POWER {
            let mut acc = Poly::constant(1.0);
            for _ in 0..n as usize {
                acc = acc.mul(self);
            }
            return acc;
        }
        Poly::from_terms(vec![Monomial::atom(format!("({})", self.key()), n)])
    }
}

fn fmt_coeff(c: f64) -> String {
    format!("{c:.12e}")
}

/// Normal form of `expr`.
pub fn canonicalize(expr: &Expr) -> Poly {
    match expr {
        Expr::Const(c) => Poly::constant(*c),
        Expr::Symbol(s) => Poly::atom(s.clone()),
        Expr::Add(a, b) => canonicalize(a).add(&canonicalize(b)),
        Expr::Sub(a, b) => canonicalize(a).add(&canonicalize(b).scale(-1.0)),
        Expr::Neg(a) => canonicalize(a).scale(-1.0),
        Expr::Mul(a, b) => canonicalize(a).mul(&canonicalize(b)),
        Expr::Div(a, b) => canonicalize(a).mul(&canonicalize(b).powf(-1.0)),
        Expr::Pow(base, exp) => {
            let base = canonicalize(base);
            let exp = canonicalize(exp);
            match (base.as_constant(), exp.as_constant()) {
                (Some(b), Some(n)) => Poly::constant(b.powf(n)),
                (_, Some(n)) => base.powf(n),
                // c^g = exp(g ln c)
                (Some(b), None) if b > 0.0 => exp.scale(b.ln()).exp(),
                _ => Poly::atom(format!("({})^({})", base.key(), exp.key())),
            }
        }
        Expr::Fn(func, arg) => {
            let arg = canonicalize(arg);
            if let Some(c) = arg.as_constant() {
                return Poly::constant(func.apply(c));
            }
            match func {
                Func::Exp => arg.exp(),
                Func::Sqrt => arg.powf(0.5),
                _ => Poly::atom(format!("{}({})", func.name(), arg.key())),
            }
        }
    }
}

/// Whether `expr` reduces to zero in normal form.
pub fn is_identically_zero(expr: &Expr) -> bool {
    canonicalize(expr).is_zero()
}
