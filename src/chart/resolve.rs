use crate::data::model::{LabelUniverse, LabeledArray, Rank};
use crate::error::{Axis, DataError, Result};

/// A logical cell address by label.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Coordinate<'a> {
    Tokenizer(&'a str),
    Language(&'a str, &'a str),
    Pair(&'a str, &'a str, &'a str),
}

impl Coordinate<'_> {
    pub fn rank(&self) -> Rank {
        match self {
            Coordinate::Tokenizer(_) => Rank::One,
            Coordinate::Language(..) => Rank::Two,
            Coordinate::Pair(..) => Rank::Three,
        }
    }
}

fn tokenizer_index(universe: &LabelUniverse, name: &str) -> Result<usize> {
    universe
        .tokenizer_position(name)
        .ok_or_else(|| DataError::LabelNotFound {
            axis: Axis::Tokenizer,
            label: name.to_string(),
        })
}

fn language_index(universe: &LabelUniverse, name: &str) -> Result<usize> {
    universe
        .language_position(name)
        .ok_or_else(|| DataError::LabelNotFound {
            axis: Axis::Language,
            label: name.to_string(),
        })
}

/// Row-major flat offset of `coord` in the full universe index space.
///
/// Positions always come from the full label lists, never from a user's
/// selection. The result is only in bounds if the array's extents agree with
/// the universe (see [`LabeledArray::check_universe`]).
pub fn offset(universe: &LabelUniverse, coord: &Coordinate<'_>) -> Result<usize> {
    let n_lang = universe.languages().len();
    match *coord {
        Coordinate::Tokenizer(t) => tokenizer_index(universe, t),
        Coordinate::Language(t, l) => {
            let tok = tokenizer_index(universe, t)?;
            let lang = language_index(universe, l)?;
            Ok(tok * n_lang + lang)
        }
        Coordinate::Pair(t, l1, l2) => {
            let tok = tokenizer_index(universe, t)?;
            let lang1 = language_index(universe, l1)?;
            let lang2 = language_index(universe, l2)?;
            Ok(tok * n_lang * n_lang + lang1 * n_lang + lang2)
        }
    }
}

/// Read the value at `coord`.
///
/// Fails with `LabelNotFound` for unknown labels and `ShapeMismatch` when the
/// coordinate's rank differs from the array's or the offset falls outside
/// the buffer.
pub fn resolve(universe: &LabelUniverse, array: &LabeledArray, coord: &Coordinate<'_>) -> Result<f64> {
    if coord.rank() != array.rank() {
        return Err(DataError::ShapeMismatch(format!(
            "{} coordinate used on a {} array",
            coord.rank(),
            array.rank()
        )));
    }
    let at = offset(universe, coord)?;
    array.get(at).ok_or_else(|| {
        DataError::ShapeMismatch(format!(
            "offset {at} outside buffer of {} values",
            array.len()
        ))
    })
}
