use super::Operation;
use std::fmt;
use std::sync::{Arc, OnceLock};

/// What composing one node produced.
pub enum Fragment<F: ?Sized> {
    /// The node needs no work for the operation.
    Empty,
    Code(Arc<F>),
}

impl<F: ?Sized> Fragment<F> {
    pub fn code(f: Arc<F>) -> Self {
        Self::Code(f)
    }

    pub fn is_empty(&self) -> bool {
        matches!(self, Self::Empty)
    }

    /// The callable, if the node needs work.
    pub fn into_code(self) -> Option<Arc<F>> {
        match self {
            Self::Empty => None,
            Self::Code(f) => Some(f),
        }
    }

    /// The callable, with an empty fragment replaced by the operation's
    /// neutral callable.
    pub fn reconcile<O: Operation<Func = F>>(self) -> Arc<F> {
        match self {
            Self::Empty => O::neutral(),
            Self::Code(f) => f,
        }
    }
}

impl<F: ?Sized> fmt::Debug for Fragment<F> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Empty => write!(f, "Fragment::Empty"),
            Self::Code(_) => write!(f, "Fragment::Code(..)"),
        }
    }
}

/// Late-binding cell for a function whose body is still being built.
pub struct Slot<F: ?Sized>(Arc<OnceLock<Arc<F>>>);

impl<F: ?Sized> Slot<F> {
    pub(crate) fn new() -> Self {
        Self(Arc::new(OnceLock::new()))
    }

    /// The function, once its body is complete.
    pub fn get(&self) -> Option<&Arc<F>> {
        self.0.get()
    }

    pub(crate) fn fill(&self, f: Arc<F>) {
        // a slot is filled exactly once, right after its body is built
        let _ = self.0.set(f);
    }
}

impl<F: ?Sized> Clone for Slot<F> {
    fn clone(&self) -> Self {
        Self(Arc::clone(&self.0))
    }
}
