use crate::sorts::{EnumSort, SmtSort};
use crate::terms::SmtTerm;

/// Print an SmtTerm as SMT-LIB2 format.
///
/// `sort_of` resolves the sort of a variable so that the polymorphic
/// arithmetic and comparison nodes print as their integer or bit-vector
/// operators. Unknown variables are treated as integers.
pub fn to_smtlib(term: &SmtTerm, sort_of: &dyn Fn(&str) -> Option<SmtSort>) -> String {
    let p = |t: &SmtTerm| to_smtlib(t, sort_of);
    let bv = |l: &SmtTerm, r: &SmtTerm| is_bitvec(l, sort_of) || is_bitvec(r, sort_of);
    match term {
        SmtTerm::Var(name) => name.clone(),
        SmtTerm::IntLit(n) => {
            if *n < 0 {
                format!("(- {})", n.unsigned_abs())
            } else {
                n.to_string()
            }
        }
        SmtTerm::BvLit { value, width } => format!("(_ bv{value} {width})"),
        SmtTerm::BoolLit(b) => {
            if *b {
                "true".to_string()
            } else {
                "false".to_string()
            }
        }
        SmtTerm::EnumLit { variant, .. } => variant.clone(),
        SmtTerm::Add(lhs, rhs) => {
            let op = if bv(lhs, rhs) { "bvadd" } else { "+" };
            format!("({op} {} {})", p(lhs), p(rhs))
        }
        SmtTerm::Sub(lhs, rhs) => {
            let op = if bv(lhs, rhs) { "bvsub" } else { "-" };
            format!("({op} {} {})", p(lhs), p(rhs))
        }
        SmtTerm::Mul(lhs, rhs) => {
            let op = if bv(lhs, rhs) { "bvmul" } else { "*" };
            format!("({op} {} {})", p(lhs), p(rhs))
        }
        SmtTerm::Mod(lhs, rhs) => {
            let op = if bv(lhs, rhs) { "bvurem" } else { "mod" };
            format!("({op} {} {})", p(lhs), p(rhs))
        }
        SmtTerm::Eq(lhs, rhs) => format!("(= {} {})", p(lhs), p(rhs)),
        SmtTerm::Lt(lhs, rhs) => {
            let op = if bv(lhs, rhs) { "bvult" } else { "<" };
            format!("({op} {} {})", p(lhs), p(rhs))
        }
        SmtTerm::Le(lhs, rhs) => {
            let op = if bv(lhs, rhs) { "bvule" } else { "<=" };
            format!("({op} {} {})", p(lhs), p(rhs))
        }
        SmtTerm::Gt(lhs, rhs) => {
            let op = if bv(lhs, rhs) { "bvugt" } else { ">" };
            format!("({op} {} {})", p(lhs), p(rhs))
        }
        SmtTerm::Ge(lhs, rhs) => {
            let op = if bv(lhs, rhs) { "bvuge" } else { ">=" };
            format!("({op} {} {})", p(lhs), p(rhs))
        }
        SmtTerm::Distinct(terms) => {
            if terms.len() < 2 {
                "true".to_string()
            } else {
                let inner: Vec<String> = terms.iter().map(p).collect();
                format!("(distinct {})", inner.join(" "))
            }
        }
        SmtTerm::And(terms) => {
            if terms.is_empty() {
                "true".to_string()
            } else if terms.len() == 1 {
                p(&terms[0])
            } else {
                let inner: Vec<String> = terms.iter().map(p).collect();
                format!("(and {})", inner.join(" "))
            }
        }
        SmtTerm::Or(terms) => {
            if terms.is_empty() {
                "false".to_string()
            } else if terms.len() == 1 {
                p(&terms[0])
            } else {
                let inner: Vec<String> = terms.iter().map(p).collect();
                format!("(or {})", inner.join(" "))
            }
        }
        SmtTerm::Not(inner) => format!("(not {})", p(inner)),
        SmtTerm::Implies(lhs, rhs) => format!("(=> {} {})", p(lhs), p(rhs)),
        SmtTerm::Ite(cond, then, els) => {
            format!("(ite {} {} {})", p(cond), p(then), p(els))
        }
    }
}

/// Whether a numeric term has bit-vector sort.
fn is_bitvec(term: &SmtTerm, sort_of: &dyn Fn(&str) -> Option<SmtSort>) -> bool {
    match term {
        SmtTerm::BvLit { .. } => true,
        SmtTerm::Var(name) => matches!(sort_of(name), Some(SmtSort::BitVec(_))),
        SmtTerm::Add(l, r) | SmtTerm::Sub(l, r) | SmtTerm::Mul(l, r) | SmtTerm::Mod(l, r) => {
            is_bitvec(l, sort_of) || is_bitvec(r, sort_of)
        }
        SmtTerm::Ite(_, t, e) => is_bitvec(t, sort_of) || is_bitvec(e, sort_of),
        _ => false,
    }
}

/// Print a sort as SMT-LIB2 format.
pub fn sort_to_smtlib(sort: &SmtSort) -> String {
    sort.to_string()
}

/// `declare-datatype` command introducing an enumerated sort.
pub fn declare_enum(sort: &EnumSort) -> String {
    let ctors: Vec<String> = sort.variants.iter().map(|v| format!("({v})")).collect();
    format!("(declare-datatype {} ({}))", sort.name, ctors.join(" "))
}
