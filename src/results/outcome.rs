use std::any::Any;
use std::fmt;
use std::ops::Index;

/// A type-erased mapped value stored in the ordered result list.
///
/// Builder operations return mapped values with their real type; the erased
/// copy kept here exists so callers can destructure a finished transaction
/// positionally with [`StatementOutcome::single`], [`StatementOutcome::list`]
/// and friends.
pub type Mapped = Box<dyn Any + Send>;

/// Outcome of one mutating statement.
///
/// `transformed` carries the mapper's output for the generated-key row when
/// generated-key support is enabled, the statement produced a key, and a
/// mapper was supplied; otherwise it is `None` and only `rows_mutated` is
/// meaningful.
#[derive(Debug, Clone)]
pub struct ExecResult<T = ()> {
    pub rows_mutated: usize,
    pub transformed: Option<T>,
}

/// Outcome of one prepared statement executed once per parameter row.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BatchResult {
    /// Rows affected by each execution, in parameter-row order.
    pub rows_mutated: Vec<usize>,
}

/// One entry of the ordered transaction result list; `results[i]` is the
/// outcome of the i-th statement invoked in the transaction block.
pub enum StatementOutcome {
    /// A mutating statement: rows affected plus the optional transformed
    /// generated-key value.
    Exec {
        rows_mutated: usize,
        transformed: Option<Mapped>,
    },
    /// A prepared statement run once per parameter row.
    Batch { rows_mutated: Vec<usize> },
    /// A single-row query: the mapped first row, or `None` for an empty
    /// cursor.
    Single(Option<Mapped>),
    /// A multi-row query: a boxed `Vec<T>` of mapped rows in cursor order.
    List(Mapped),
}

impl StatementOutcome {
    /// Rows affected, for `Exec` outcomes.
    #[must_use]
    pub fn rows_mutated(&self) -> Option<usize> {
        match self {
            StatementOutcome::Exec { rows_mutated, .. } => Some(*rows_mutated),
            _ => None,
        }
    }

    /// Per-row affected counts, for `Batch` outcomes.
    #[must_use]
    pub fn batch_rows(&self) -> Option<&[usize]> {
        match self {
            StatementOutcome::Batch { rows_mutated } => Some(rows_mutated),
            _ => None,
        }
    }

    /// The transformed generated-key value of an `Exec` outcome, downcast to
    /// the mapper's output type.
    #[must_use]
    pub fn transformed<T: 'static>(&self) -> Option<&T> {
        match self {
            StatementOutcome::Exec {
                transformed: Some(value),
                ..
            } => value.downcast_ref::<T>(),
            _ => None,
        }
    }

    /// The mapped row of a `Single` outcome, downcast to the mapper's output
    /// type. `None` for an empty cursor or a type mismatch.
    #[must_use]
    pub fn single<T: 'static>(&self) -> Option<&T> {
        match self {
            StatementOutcome::Single(Some(value)) => value.downcast_ref::<T>(),
            _ => None,
        }
    }

    /// The mapped rows of a `List` outcome, downcast to the mapper's output
    /// type.
    #[must_use]
    pub fn list<T: 'static>(&self) -> Option<&Vec<T>> {
        match self {
            StatementOutcome::List(values) => values.downcast_ref::<Vec<T>>(),
            _ => None,
        }
    }
}

impl fmt::Debug for StatementOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            StatementOutcome::Exec {
                rows_mutated,
                transformed,
            } => f
                .debug_struct("Exec")
                .field("rows_mutated", rows_mutated)
                .field("transformed", &transformed.is_some())
                .finish(),
            StatementOutcome::Batch { rows_mutated } => f
                .debug_struct("Batch")
                .field("rows_mutated", rows_mutated)
                .finish(),
            StatementOutcome::Single(value) => {
                f.debug_tuple("Single").field(&value.is_some()).finish()
            }
            StatementOutcome::List(_) => f.debug_tuple("List").finish(),
        }
    }
}

/// The ordered results of a committed transaction.
///
/// Ordering is an invariant callers rely on: entry `i` corresponds to the
/// i-th statement invoked inside the transaction block, with no statement
/// skipped or reordered.
#[derive(Debug, Default)]
pub struct TxResults {
    outcomes: Vec<StatementOutcome>,
}

impl TxResults {
    pub(crate) fn new(outcomes: Vec<StatementOutcome>) -> Self {
        Self { outcomes }
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.outcomes.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.outcomes.is_empty()
    }

    #[must_use]
    pub fn get(&self, index: usize) -> Option<&StatementOutcome> {
        self.outcomes.get(index)
    }

    pub fn iter(&self) -> impl Iterator<Item = &StatementOutcome> {
        self.outcomes.iter()
    }

    /// Shorthand for `get(index)` + [`StatementOutcome::single`].
    #[must_use]
    pub fn single<T: 'static>(&self, index: usize) -> Option<&T> {
        self.get(index).and_then(StatementOutcome::single)
    }

    /// Shorthand for `get(index)` + [`StatementOutcome::list`].
    #[must_use]
    pub fn list<T: 'static>(&self, index: usize) -> Option<&Vec<T>> {
        self.get(index).and_then(StatementOutcome::list)
    }

    /// Shorthand for `get(index)` + [`StatementOutcome::rows_mutated`].
    #[must_use]
    pub fn rows_mutated(&self, index: usize) -> Option<usize> {
        self.get(index).and_then(StatementOutcome::rows_mutated)
    }

    #[must_use]
    pub fn into_outcomes(self) -> Vec<StatementOutcome> {
        self.outcomes
    }
}

impl Index<usize> for TxResults {
    type Output = StatementOutcome;

    fn index(&self, index: usize) -> &Self::Output {
        &self.outcomes[index]
    }
}
