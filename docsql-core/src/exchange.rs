//! Typed value hand-off for walkers whose visit methods cannot return values.
//!
//! [`SqlAstWalker`](crate::sql::SqlAstWalker) methods only report success or failure. A
//! walker that builds a result tree wraps each visit in [`ValueExchange::execute`], and
//! the visited method hands its result back with [`ValueExchange::yield_value`].
//!
//! Every `execute` pushes its own frame, so nested visits (a sub-expression visited
//! while its parent is being visited) never see each other's slot or expected type.
//! Each frame accepts exactly one value of exactly the expected type; anything else is
//! an assertion error.
//!
//! # Example
//!
//! ```ignore
//! use docsql_core::exchange::ValueExchange;
//!
//! let mut exchange = ValueExchange::new();
//! let answer: i32 = ValueExchange::execute(&mut exchange, |exchange| {
//!     exchange.yield_value(42_i32)
//! })?;
//! ```

use std::any::{Any, TypeId, type_name};

use crate::error::{DocSqlError, DocSqlResult};

struct Frame {
    expected: TypeId,
    expected_name: &'static str,
    slot: Option<Box<dyn Any + Send>>,
}

/// Stack of single-value slots, one per active [`execute`](ValueExchange::execute).
///
/// An instance belongs to one translation pass; it is not meant to be shared between
/// concurrent passes.
#[derive(Default)]
pub struct ValueExchange {
    frames: Vec<Frame>,
}

impl ValueExchange {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of `execute` calls currently in progress.
    pub fn depth(&self) -> usize {
        self.frames.len()
    }

    /// Runs `visit` and returns the single `T` it yielded.
    ///
    /// The exchange is reached through `owner`, which lets the visit callback borrow the
    /// whole walker that owns the exchange.
    ///
    /// # Errors
    ///
    /// Returns the error of `visit` if it failed, otherwise an assertion error if no
    /// value was yielded.
    pub fn execute<T, O>(owner: &mut O, visit: impl FnOnce(&mut O) -> DocSqlResult<()>) -> DocSqlResult<T>
    where
        T: Send + 'static,
        O: AsMut<ValueExchange> + ?Sized,
    {
        owner.as_mut().enter::<T>();
        let outcome = visit(owner);
        let produced = owner.as_mut().leave::<T>();

        outcome?;
        produced
    }

    /// Hands `value` to the innermost `execute`.
    ///
    /// # Errors
    ///
    /// Returns an assertion error if no `execute` is in progress, if the innermost one
    /// expects another type, or if it already received a value.
    pub fn yield_value<T: Send + 'static>(&mut self, value: T) -> DocSqlResult<()> {
        let frame = self
            .frames
            .last_mut()
            .ok_or_else(|| DocSqlError::assertion(format!("{} yielded outside of execute", type_name::<T>())))?;

        if frame.expected != TypeId::of::<T>() {
            return Err(DocSqlError::assertion(format!(
                "expected a {} to be yielded but got a {}",
                frame.expected_name,
                type_name::<T>(),
            )));
        }

        if frame.slot.is_some() {
            return Err(DocSqlError::assertion(format!(
                "a {} was already yielded in this scope",
                frame.expected_name,
            )));
        }

        frame.slot = Some(Box::new(value));
        Ok(())
    }

    fn enter<T: 'static>(&mut self) {
        self.frames.push(Frame {
            expected: TypeId::of::<T>(),
            expected_name: type_name::<T>(),
            slot: None,
        });
    }

    fn leave<T: 'static>(&mut self) -> DocSqlResult<T> {
        let frame = self
            .frames
            .pop()
            .ok_or_else(|| DocSqlError::assertion("value exchange stack is empty"))?;

        if frame.expected != TypeId::of::<T>() {
            return Err(DocSqlError::assertion(format!(
                "value exchange frame for {} closed as {}",
                frame.expected_name,
                type_name::<T>(),
            )));
        }

        frame
            .slot
            .ok_or_else(|| DocSqlError::assertion(format!("no {} was yielded", frame.expected_name)))?
            .downcast::<T>()
            .map(|value| *value)
            .map_err(|_| DocSqlError::assertion(format!("slot did not hold a {}", frame.expected_name)))
    }
}

impl AsMut<ValueExchange> for ValueExchange {
    fn as_mut(&mut self) -> &mut ValueExchange {
        self
    }
}
