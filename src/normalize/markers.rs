//! Environment marker evaluation
//!
//! A marker is turned into a disjunction of terms. Each term is a
//! `Condition` plus an optional gating extra, i.e. something a Spack
//! `when=` can express. Parts with no Spack equivalent are dropped
//! (treated as true) and reported through `notes`.

use crate::domain::{
    all_known_python, any_known_python, normalize_name, Condition, Constraint, Platform,
};
use pep440_rs::VersionSpecifier;
use pep508_rs::{
    ExtraOperator, MarkerExpression, MarkerOperator, MarkerTree, MarkerValueString,
    MarkerValueVersion,
};

/// One disjunct of an evaluated marker
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Term {
    pub condition: Condition,
    pub extra: Option<String>,
}

impl Term {
    pub fn always() -> Self {
        Self::default()
    }

    pub fn is_always(&self) -> bool {
        self.condition.is_always() && self.extra.is_none()
    }

    fn and(&self, other: &Term) -> Option<Term> {
        let extra = match (&self.extra, &other.extra) {
            (Some(a), Some(b)) if a != b => return None,
            (a, b) => a.clone().or_else(|| b.clone()),
        };
        let condition = self.condition.and(&other.condition)?;
        Some(Term { condition, extra })
    }
}

/// Result of evaluating one marker
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MarkerEvaluation {
    /// Disjunction of terms; empty means the marker can never hold
    pub terms: Vec<Term>,
    /// Parts of the marker that were dropped
    pub notes: Vec<String>,
}

/// Evaluates a marker to disjunctive normal form
///
/// `MarkerTree::to_dnf` gives the disjuncts; each expression is mapped to
/// terms and the conjunctions are multiplied out.
pub fn evaluate(marker: &MarkerTree) -> MarkerEvaluation {
    if marker.is_true() {
        return MarkerEvaluation {
            terms: always(),
            notes: Vec::new(),
        };
    }

    let mut notes: Vec<String> = Vec::new();
    let mut terms = Vec::new();
    for conjunction in marker.to_dnf() {
        let mut acc = always();
        for expression in &conjunction {
            let evaluated = eval_expression(expression).unwrap_or_else(|| {
                let note = format!("{} ignored", expression);
                if !notes.contains(&note) {
                    notes.push(note);
                }
                always()
            });
            acc = conjoin(acc, evaluated);
        }
        terms.extend(acc);
    }
    MarkerEvaluation {
        terms: simplify(terms),
        notes,
    }
}

fn always() -> Vec<Term> {
    vec![Term::always()]
}

fn never() -> Vec<Term> {
    Vec::new()
}

fn simplify(terms: Vec<Term>) -> Vec<Term> {
    if terms.iter().any(Term::is_always) {
        return always();
    }
    let mut unique: Vec<Term> = Vec::with_capacity(terms.len());
    for term in terms {
        if !unique.contains(&term) {
            unique.push(term);
        }
    }
    unique
}

fn conjoin(left: Vec<Term>, right: Vec<Term>) -> Vec<Term> {
    let merged = left
        .iter()
        .flat_map(|a| right.iter().filter_map(move |b| a.and(b)))
        .collect();
    simplify(merged)
}

/// Terms for one expression, None when it has no Spack equivalent
fn eval_expression(expression: &MarkerExpression) -> Option<Vec<Term>> {
    match expression {
        MarkerExpression::Version {
            key: MarkerValueVersion::PythonVersion | MarkerValueVersion::PythonFullVersion,
            specifier,
        } => Some(eval_python(specifier)),
        MarkerExpression::String {
            key,
            operator,
            value,
        } => eval_string(key, *operator, value),
        MarkerExpression::Extra {
            operator: ExtraOperator::Equal,
            name,
        } => Some(vec![Term {
            condition: Condition::always(),
            extra: Some(normalize_name(&name.to_string())),
        }]),
        _ => None,
    }
}

fn static_terms(holds: bool) -> Vec<Term> {
    if holds {
        always()
    } else {
        never()
    }
}

/// `python_version` arrives already rewritten to `python_full_version` bounds
fn eval_python(specifier: &VersionSpecifier) -> Vec<Term> {
    let python = Constraint::from_specifiers([specifier.clone()]);
    if all_known_python(&python) {
        always()
    } else if !any_known_python(&python) {
        never()
    } else {
        vec![Term {
            condition: Condition::python(python),
            extra: None,
        }]
    }
}

fn eval_string(key: &MarkerValueString, operator: MarkerOperator, value: &str) -> Option<Vec<Term>> {
    match operator {
        MarkerOperator::In => {
            let mut terms = Vec::new();
            for part in value.split_whitespace() {
                terms.extend(eval_string(key, MarkerOperator::Equal, part)?);
            }
            Some(simplify(terms))
        }
        MarkerOperator::NotIn => {
            let mut acc = always();
            for part in value.split_whitespace() {
                acc = conjoin(acc, eval_string(key, MarkerOperator::NotEqual, part)?);
            }
            Some(acc)
        }
        MarkerOperator::Equal | MarkerOperator::NotEqual => {
            let equal = operator == MarkerOperator::Equal;
            match key {
                MarkerValueString::SysPlatform
                | MarkerValueString::SysPlatformDeprecated
                | MarkerValueString::PlatformSystem => eval_platform(equal, value),
                MarkerValueString::OsName | MarkerValueString::OsNameDeprecated => {
                    eval_os_name(equal, value)
                }
                MarkerValueString::ImplementationName
                | MarkerValueString::PlatformPythonImplementation
                | MarkerValueString::PlatformPythonImplementationDeprecated
                | MarkerValueString::PythonImplementationDeprecated => {
                    let is_cpython = value.eq_ignore_ascii_case("cpython");
                    Some(static_terms(is_cpython == equal))
                }
                _ => None,
            }
        }
        _ => None,
    }
}

fn platform_terms(platforms: impl IntoIterator<Item = Platform>) -> Vec<Term> {
    platforms
        .into_iter()
        .map(|p| Term {
            condition: Condition::platform(p),
            extra: None,
        })
        .collect()
}

fn eval_platform(equal: bool, value: &str) -> Option<Vec<Term>> {
    match (equal, Platform::from_marker_value(value)) {
        (true, Some(p)) => Some(platform_terms([p])),
        (false, Some(p)) => Some(platform_terms(
            Platform::ALL.into_iter().filter(|o| *o != p),
        )),
        (false, None) => Some(always()),
        (true, None) => None,
    }
}

fn eval_os_name(equal: bool, value: &str) -> Option<Vec<Term>> {
    let posix = || Platform::ALL.into_iter().filter(|p| *p != Platform::Windows);
    let windows = match value {
        "nt" => true,
        "posix" => false,
        _ => return None,
    };
    Some(if windows == equal {
        platform_terms([Platform::Windows])
    } else {
        platform_terms(posix())
    })
}
