//! Argument permutation generator.
//!
//! Turns a [`ParameterSpec`] into every argument dictionary worth asking the
//! model about:
//!
//! - [`resolve`] maps one field to its finite candidate list.
//! - [`enumerate_required`] takes the cross product over required fields.
//! - [`enumerate_optional`] extends one required combination with every
//!   subset of the optional fields and every value tuple for that subset.
//! - [`permute`] chains the two into a single lazy iterator.
//!
//! Enumeration order is fully determined by the schema: required combinations
//! first (rightmost field varies fastest), then optional subsets by size,
//! then by declaration index.
//!
//! Integer and string fields resolve to the placeholder sentinels
//! [`PLACEHOLDER_INT`] and [`PLACEHOLDER_STRING`], which the
//! [`PlaceholderFiller`](crate::generate::filler::PlaceholderFiller) later
//! replaces with concrete values.

use crate::schema::{FieldSpec, ParameterSpec};
use itertools::Itertools;
use serde_json::Value;

/// Stands in for a concrete integer the model should choose.
pub const PLACEHOLDER_INT: &str = "fill_in_int";

/// Stands in for a concrete string the model should choose.
pub const PLACEHOLDER_STRING: &str = "fill_in_string";

/// Field name to value, in insertion order.
pub type ArgumentDict = serde_json::Map<String, Value>;

/// Whether a value is one of the placeholder sentinels.
pub fn is_placeholder(value: &Value) -> bool {
    matches!(value.as_str(), Some(PLACEHOLDER_INT | PLACEHOLDER_STRING))
}

/// Candidate values for one field.
///
/// Enum arrays expand to every non-empty subset of their values, smallest
/// subsets first, so `n` values give `2^n - 1` candidates. Unsupported
/// shapes give none, which removes any permutation that needs the field.
pub fn resolve(spec: &FieldSpec) -> Vec<Value> {
    match spec {
        FieldSpec::Enum(values) => values.clone(),
        FieldSpec::Integer => vec![Value::from(PLACEHOLDER_INT)],
        FieldSpec::String => vec![Value::from(PLACEHOLDER_STRING)],
        FieldSpec::Boolean => vec![Value::Bool(true), Value::Bool(false)],
        FieldSpec::EnumArray(values) => (1..=values.len())
            .flat_map(|r| values.iter().cloned().combinations(r))
            .map(Value::Array)
            .collect(),
        FieldSpec::Unsupported => Vec::new(),
    }
}

/// Required fields that resolve to no candidates. Any entry here means the
/// spec yields zero permutations.
pub fn dead_required_fields(spec: &ParameterSpec) -> Vec<&str> {
    spec.required()
        .iter()
        .filter(|name| spec.field(name).is_none_or(|f| resolve(&f.spec).is_empty()))
        .map(String::as_str)
        .collect()
}

/// Exact number of dictionaries [`permute`] will yield, without enumerating:
/// the product of required candidate counts times `(1 + count)` for each
/// optional field. Saturates at `u128::MAX`.
pub fn count_permutations(spec: &ParameterSpec) -> u128 {
    spec.fields().iter().fold(1u128, |acc, field| {
        let candidates = resolve(&field.spec).len() as u128;
        let factor = if spec.is_required(&field.name) {
            candidates
        } else {
            candidates + 1
        };
        acc.saturating_mul(factor)
    })
}

// ── Cross products ─────────────────────────────────────────────────

#[derive(Debug, Clone)]
struct Column {
    name: String,
    candidates: Vec<Value>,
}

impl Column {
    fn for_field(spec: &ParameterSpec, name: &str) -> Self {
        Self {
            name: name.to_string(),
            candidates: spec.field(name).map(|f| resolve(&f.spec)).unwrap_or_default(),
        }
    }
}

/// Mixed-radix counter over candidate indices. Yields every index tuple of
/// a cross product, rightmost digit fastest. No radices yield one empty
/// tuple; any zero radix yields nothing.
#[derive(Debug, Clone)]
struct Odometer {
    radices: Vec<usize>,
    digits: Vec<usize>,
    exhausted: bool,
}

impl Odometer {
    fn new(radices: Vec<usize>) -> Self {
        Self {
            exhausted: radices.contains(&0),
            digits: vec![0; radices.len()],
            radices,
        }
    }
}

impl Iterator for Odometer {
    type Item = Vec<usize>;

    fn next(&mut self) -> Option<Vec<usize>> {
        if self.exhausted {
            return None;
        }
        let current = self.digits.clone();
        let mut i = self.digits.len();
        loop {
            if i == 0 {
                self.exhausted = true;
                break;
            }
            i -= 1;
            self.digits[i] += 1;
            if self.digits[i] < self.radices[i] {
                break;
            }
            self.digits[i] = 0;
        }
        Some(current)
    }
}

fn merge(base: &ArgumentDict, columns: &[&Column], digits: &[usize]) -> ArgumentDict {
    let mut dict = base.clone();
    for (column, &digit) in columns.iter().zip(digits) {
        dict.insert(column.name.clone(), column.candidates[digit].clone());
    }
    dict
}

// ── Enumerators ────────────────────────────────────────────────────

/// One dictionary per combination of required-field candidates, in the
/// declared order of `required`. No required fields give a single empty
/// dictionary.
pub fn enumerate_required(spec: &ParameterSpec) -> Vec<ArgumentDict> {
    let columns: Vec<Column> = spec
        .required()
        .iter()
        .map(|name| Column::for_field(spec, name))
        .collect();
    let refs: Vec<&Column> = columns.iter().collect();
    let empty = ArgumentDict::new();

    Odometer::new(columns.iter().map(|c| c.candidates.len()).collect())
        .map(|digits| merge(&empty, &refs, &digits))
        .collect()
}

/// Every extension of `base` by a subset of the fields it lacks.
///
/// Subsets are visited by size (the empty subset first, yielding `base`
/// unchanged exactly once), then in lexicographic order of declaration
/// index. Each subset contributes the cross product of its fields'
/// candidates.
pub fn enumerate_optional(spec: &ParameterSpec, base: ArgumentDict) -> OptionalPermutations {
    let columns = spec
        .fields()
        .iter()
        .filter(|f| !base.contains_key(&f.name))
        .map(|f| Column::for_field(spec, &f.name))
        .collect();
    OptionalPermutations::new(base, columns)
}

/// Lazy iterator returned by [`enumerate_optional`].
pub struct OptionalPermutations {
    base: ArgumentDict,
    columns: Vec<Column>,
    subsets: Box<dyn Iterator<Item = Vec<usize>> + Send>,
    current: Option<(Vec<usize>, Odometer)>,
}

impl OptionalPermutations {
    fn new(base: ArgumentDict, columns: Vec<Column>) -> Self {
        let n = columns.len();
        let subsets =
            std::iter::once(Vec::new()).chain((1..=n).flat_map(move |k| (0..n).combinations(k)));
        Self {
            base,
            columns,
            subsets: Box::new(subsets),
            current: None,
        }
    }
}

impl Iterator for OptionalPermutations {
    type Item = ArgumentDict;

    fn next(&mut self) -> Option<ArgumentDict> {
        loop {
            if let Some((subset, odometer)) = &mut self.current
                && let Some(digits) = odometer.next()
            {
                let columns: Vec<&Column> = subset.iter().map(|&i| &self.columns[i]).collect();
                return Some(merge(&self.base, &columns, &digits));
            }
            let subset = self.subsets.next()?;
            let radices = subset
                .iter()
                .map(|&i| self.columns[i].candidates.len())
                .collect();
            self.current = Some((subset, Odometer::new(radices)));
        }
    }
}

impl std::fmt::Debug for OptionalPermutations {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("OptionalPermutations")
            .field("base", &self.base)
            .field("optional", &self.columns.len())
            .finish()
    }
}

// ── Driver ─────────────────────────────────────────────────────────

/// Every argument dictionary for a spec, grouped by required combination.
/// Pure: calling it twice yields identical sequences.
pub fn permute(spec: &ParameterSpec) -> Permutations<'_> {
    Permutations {
        spec,
        bases: enumerate_required(spec).into_iter(),
        current: None,
    }
}

/// Lazy iterator returned by [`permute`].
#[derive(Debug)]
pub struct Permutations<'a> {
    spec: &'a ParameterSpec,
    bases: std::vec::IntoIter<ArgumentDict>,
    current: Option<OptionalPermutations>,
}

impl Iterator for Permutations<'_> {
    type Item = ArgumentDict;

    fn next(&mut self) -> Option<ArgumentDict> {
        loop {
            if let Some(inner) = &mut self.current
                && let Some(dict) = inner.next()
            {
                return Some(dict);
            }
            let base = self.bases.next()?;
            self.current = Some(enumerate_optional(self.spec, base));
        }
    }
}
