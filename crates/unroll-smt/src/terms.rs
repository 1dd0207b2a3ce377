use std::collections::{BTreeSet, HashMap};

/// Abstract SMT term representation, solver-agnostic.
///
/// Arithmetic and comparison nodes are sort-polymorphic: backends resolve them
/// to integer or bit-vector operations from the operand sorts. Bit-vector
/// comparisons and `Mod` are unsigned.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum SmtTerm {
    /// Variable reference by name.
    Var(String),
    /// Integer literal.
    IntLit(i64),
    /// Bit-vector literal of the given width.
    BvLit { value: u64, width: u32 },
    /// Boolean literal.
    BoolLit(bool),
    /// Member of a declared enumerated sort.
    EnumLit { sort: String, variant: String },

    // Arithmetic
    Add(Box<SmtTerm>, Box<SmtTerm>),
    Sub(Box<SmtTerm>, Box<SmtTerm>),
    Mul(Box<SmtTerm>, Box<SmtTerm>),
    Mod(Box<SmtTerm>, Box<SmtTerm>),

    // Comparison
    Eq(Box<SmtTerm>, Box<SmtTerm>),
    Lt(Box<SmtTerm>, Box<SmtTerm>),
    Le(Box<SmtTerm>, Box<SmtTerm>),
    Gt(Box<SmtTerm>, Box<SmtTerm>),
    Ge(Box<SmtTerm>, Box<SmtTerm>),
    Distinct(Vec<SmtTerm>),

    // Boolean logic
    And(Vec<SmtTerm>),
    Or(Vec<SmtTerm>),
    Not(Box<SmtTerm>),
    Implies(Box<SmtTerm>, Box<SmtTerm>),

    // If-then-else
    Ite(Box<SmtTerm>, Box<SmtTerm>, Box<SmtTerm>),
}

#[allow(clippy::should_implement_trait)]
impl SmtTerm {
    pub fn var(name: impl Into<String>) -> Self {
        SmtTerm::Var(name.into())
    }

    pub fn int(n: i64) -> Self {
        SmtTerm::IntLit(n)
    }

    /// Bit-vector literal; `value` is truncated to `width` bits.
    pub fn bv(value: u64, width: u32) -> Self {
        let value = if width >= 64 {
            value
        } else {
            value & ((1u64 << width) - 1)
        };
        SmtTerm::BvLit { value, width }
    }

    pub fn bool(b: bool) -> Self {
        SmtTerm::BoolLit(b)
    }

    pub fn enum_lit(sort: impl Into<String>, variant: impl Into<String>) -> Self {
        SmtTerm::EnumLit {
            sort: sort.into(),
            variant: variant.into(),
        }
    }

    pub fn add(self, other: SmtTerm) -> Self {
        SmtTerm::Add(Box::new(self), Box::new(other))
    }

    pub fn sub(self, other: SmtTerm) -> Self {
        SmtTerm::Sub(Box::new(self), Box::new(other))
    }

    pub fn mul(self, other: SmtTerm) -> Self {
        SmtTerm::Mul(Box::new(self), Box::new(other))
    }

    pub fn modulo(self, other: SmtTerm) -> Self {
        SmtTerm::Mod(Box::new(self), Box::new(other))
    }

    pub fn eq(self, other: SmtTerm) -> Self {
        SmtTerm::Eq(Box::new(self), Box::new(other))
    }

    pub fn neq(self, other: SmtTerm) -> Self {
        self.eq(other).not()
    }

    pub fn lt(self, other: SmtTerm) -> Self {
        SmtTerm::Lt(Box::new(self), Box::new(other))
    }

    pub fn le(self, other: SmtTerm) -> Self {
        SmtTerm::Le(Box::new(self), Box::new(other))
    }

    pub fn gt(self, other: SmtTerm) -> Self {
        SmtTerm::Gt(Box::new(self), Box::new(other))
    }

    pub fn ge(self, other: SmtTerm) -> Self {
        SmtTerm::Ge(Box::new(self), Box::new(other))
    }

    pub fn distinct(terms: Vec<SmtTerm>) -> Self {
        SmtTerm::Distinct(terms)
    }

    pub fn and(terms: Vec<SmtTerm>) -> Self {
        SmtTerm::And(terms)
    }

    pub fn or(terms: Vec<SmtTerm>) -> Self {
        SmtTerm::Or(terms)
    }

    pub fn not(self) -> Self {
        SmtTerm::Not(Box::new(self))
    }

    pub fn implies(self, other: SmtTerm) -> Self {
        SmtTerm::Implies(Box::new(self), Box::new(other))
    }

    pub fn ite(cond: SmtTerm, then: SmtTerm, els: SmtTerm) -> Self {
        SmtTerm::Ite(Box::new(cond), Box::new(then), Box::new(els))
    }

    /// Direct subterms, left to right.
    pub fn children(&self) -> Vec<&SmtTerm> {
        match self {
            SmtTerm::Var(_)
            | SmtTerm::IntLit(_)
            | SmtTerm::BvLit { .. }
            | SmtTerm::BoolLit(_)
            | SmtTerm::EnumLit { .. } => Vec::new(),
            SmtTerm::Add(l, r)
            | SmtTerm::Sub(l, r)
            | SmtTerm::Mul(l, r)
            | SmtTerm::Mod(l, r)
            | SmtTerm::Eq(l, r)
            | SmtTerm::Lt(l, r)
            | SmtTerm::Le(l, r)
            | SmtTerm::Gt(l, r)
            | SmtTerm::Ge(l, r)
            | SmtTerm::Implies(l, r) => vec![l.as_ref(), r.as_ref()],
            SmtTerm::Distinct(terms) | SmtTerm::And(terms) | SmtTerm::Or(terms) => {
                terms.iter().collect()
            }
            SmtTerm::Not(inner) => vec![inner.as_ref()],
            SmtTerm::Ite(c, t, e) => vec![c.as_ref(), t.as_ref(), e.as_ref()],
        }
    }

    /// Rebuild this node with `f` applied to every direct subterm.
    fn map_children(&self, f: &mut impl FnMut(&SmtTerm) -> SmtTerm) -> SmtTerm {
        let mut bin = |l: &SmtTerm, r: &SmtTerm| (Box::new(f(l)), Box::new(f(r)));
        match self {
            SmtTerm::Var(_)
            | SmtTerm::IntLit(_)
            | SmtTerm::BvLit { .. }
            | SmtTerm::BoolLit(_)
            | SmtTerm::EnumLit { .. } => self.clone(),
            SmtTerm::Add(l, r) => {
                let (l, r) = bin(l, r);
                SmtTerm::Add(l, r)
            }
            SmtTerm::Sub(l, r) => {
                let (l, r) = bin(l, r);
                SmtTerm::Sub(l, r)
            }
            SmtTerm::Mul(l, r) => {
                let (l, r) = bin(l, r);
                SmtTerm::Mul(l, r)
            }
            SmtTerm::Mod(l, r) => {
                let (l, r) = bin(l, r);
                SmtTerm::Mod(l, r)
            }
            SmtTerm::Eq(l, r) => {
                let (l, r) = bin(l, r);
                SmtTerm::Eq(l, r)
            }
            SmtTerm::Lt(l, r) => {
                let (l, r) = bin(l, r);
                SmtTerm::Lt(l, r)
            }
            SmtTerm::Le(l, r) => {
                let (l, r) = bin(l, r);
                SmtTerm::Le(l, r)
            }
            SmtTerm::Gt(l, r) => {
                let (l, r) = bin(l, r);
                SmtTerm::Gt(l, r)
            }
            SmtTerm::Ge(l, r) => {
                let (l, r) = bin(l, r);
                SmtTerm::Ge(l, r)
            }
            SmtTerm::Implies(l, r) => {
                let (l, r) = bin(l, r);
                SmtTerm::Implies(l, r)
            }
            SmtTerm::Distinct(terms) => SmtTerm::Distinct(terms.iter().map(&mut *f).collect()),
            SmtTerm::And(terms) => SmtTerm::And(terms.iter().map(&mut *f).collect()),
            SmtTerm::Or(terms) => SmtTerm::Or(terms.iter().map(&mut *f).collect()),
            SmtTerm::Not(inner) => SmtTerm::Not(Box::new(f(inner))),
            SmtTerm::Ite(c, t, e) => {
                SmtTerm::Ite(Box::new(f(c)), Box::new(f(t)), Box::new(f(e)))
            }
        }
    }

    /// Substitute variables by name. Names absent from `map` are kept.
    pub fn rename(&self, map: &HashMap<String, String>) -> SmtTerm {
        match self {
            SmtTerm::Var(name) => match map.get(name) {
                Some(mapped) => SmtTerm::Var(mapped.clone()),
                None => SmtTerm::Var(name.clone()),
            },
            _ => self.map_children(&mut |child| child.rename(map)),
        }
    }

    /// Names of all variables occurring in the term.
    pub fn vars(&self) -> BTreeSet<String> {
        let mut out = BTreeSet::new();
        self.collect_vars(&mut out);
        out
    }

    fn collect_vars(&self, out: &mut BTreeSet<String>) {
        if let SmtTerm::Var(name) = self {
            out.insert(name.clone());
            return;
        }
        for child in self.children() {
            child.collect_vars(out);
        }
    }

    /// Number of nodes in the term tree.
    pub fn size(&self) -> usize {
        1 + self.children().iter().map(|c| c.size()).sum::<usize>()
    }

    /// Cheap boolean normalization: flattens nested conjunctions and
    /// disjunctions, folds boolean literals, drops double negation and
    /// collapses unary `And`/`Or`.
    pub fn simplify(&self) -> SmtTerm {
        let node = self.map_children(&mut |child| child.simplify());
        match node {
            SmtTerm::And(terms) => {
                let mut flat = Vec::with_capacity(terms.len());
                for t in terms {
                    match t {
                        SmtTerm::BoolLit(true) => {}
                        SmtTerm::BoolLit(false) => return SmtTerm::BoolLit(false),
                        SmtTerm::And(inner) => flat.extend(inner),
                        other => flat.push(other),
                    }
                }
                match flat.len() {
                    0 => SmtTerm::BoolLit(true),
                    1 => flat.remove(0),
                    _ => SmtTerm::And(flat),
                }
            }
            SmtTerm::Or(terms) => {
                let mut flat = Vec::with_capacity(terms.len());
                for t in terms {
                    match t {
                        SmtTerm::BoolLit(false) => {}
                        SmtTerm::BoolLit(true) => return SmtTerm::BoolLit(true),
                        SmtTerm::Or(inner) => flat.extend(inner),
                        other => flat.push(other),
                    }
                }
                match flat.len() {
                    0 => SmtTerm::BoolLit(false),
                    1 => flat.remove(0),
                    _ => SmtTerm::Or(flat),
                }
            }
            SmtTerm::Not(inner) => match *inner {
                SmtTerm::BoolLit(b) => SmtTerm::BoolLit(!b),
                SmtTerm::Not(x) => *x,
                other => SmtTerm::Not(Box::new(other)),
            },
            SmtTerm::Implies(l, r) => match (*l, *r) {
                (SmtTerm::BoolLit(false), _) | (_, SmtTerm::BoolLit(true)) => {
                    SmtTerm::BoolLit(true)
                }
                (SmtTerm::BoolLit(true), r) => r,
                (l, r) => SmtTerm::Implies(Box::new(l), Box::new(r)),
            },
            SmtTerm::Ite(c, t, e) => match *c {
                SmtTerm::BoolLit(true) => *t,
                SmtTerm::BoolLit(false) => *e,
                c => SmtTerm::Ite(Box::new(c), t, e),
            },
            other => other,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rename_replaces_only_mapped_vars() {
        let term = SmtTerm::var("x_1").add(SmtTerm::var("y_1")).eq(SmtTerm::var("x_2"));
        let map = HashMap::from([("x_1".to_string(), "x_2".to_string())]);
        let renamed = term.rename(&map);
        assert_eq!(
            renamed,
            SmtTerm::var("x_2").add(SmtTerm::var("y_1")).eq(SmtTerm::var("x_2"))
        );
    }

    #[test]
    fn vars_collects_every_name_once() {
        let term = SmtTerm::and(vec![
            SmtTerm::var("a").gt(SmtTerm::int(0)),
            SmtTerm::var("b").lt(SmtTerm::var("a")),
            SmtTerm::ite(
                SmtTerm::var("p"),
                SmtTerm::var("a"),
                SmtTerm::int(3),
            )
            .eq(SmtTerm::int(1)),
        ]);
        let names: Vec<String> = term.vars().into_iter().collect();
        assert_eq!(names, vec!["a", "b", "p"]);
    }

    #[test]
    fn simplify_flattens_and_folds_literals() {
        let term = SmtTerm::and(vec![
            SmtTerm::bool(true),
            SmtTerm::and(vec![SmtTerm::var("a"), SmtTerm::var("b")]),
            SmtTerm::or(vec![SmtTerm::bool(false), SmtTerm::var("c")]),
        ]);
        assert_eq!(
            term.simplify(),
            SmtTerm::and(vec![SmtTerm::var("a"), SmtTerm::var("b"), SmtTerm::var("c")])
        );
    }

    #[test]
    fn simplify_short_circuits_absorbing_literals() {
        let and = SmtTerm::and(vec![SmtTerm::var("a"), SmtTerm::bool(false)]);
        assert_eq!(and.simplify(), SmtTerm::bool(false));
        let or = SmtTerm::or(vec![SmtTerm::var("a"), SmtTerm::bool(true)]);
        assert_eq!(or.simplify(), SmtTerm::bool(true));
        assert_eq!(SmtTerm::var("a").not().not().simplify(), SmtTerm::var("a"));
    }

    #[test]
    fn bv_literal_truncates_to_width() {
        assert_eq!(
            SmtTerm::bv(0x1ff, 8),
            SmtTerm::BvLit {
                value: 0xff,
                width: 8
            }
        );
        assert_eq!(
            SmtTerm::bv(u64::MAX, 64),
            SmtTerm::BvLit {
                value: u64::MAX,
                width: 64
            }
        );
    }

    #[test]
    fn size_counts_nodes() {
        let term = SmtTerm::var("x").add(SmtTerm::int(1)).ge(SmtTerm::int(0));
        assert_eq!(term.size(), 5);
    }
}
