use std::collections::VecDeque;

use crate::error::{ParseError, SerializationError};

/// One level of a structured backend's context stack: either a single node
/// or a queue of sibling nodes consumed one at a time (list contexts).
#[derive(Debug, Clone, PartialEq)]
pub enum ContextEntry<T> {
    Node(T),
    Queue(VecDeque<T>),
}

impl<T> ContextEntry<T> {
    pub fn is_queue(&self) -> bool {
        matches!(self, ContextEntry::Queue(_))
    }

    pub fn node_mut(&mut self) -> Option<&mut T> {
        match self {
            ContextEntry::Node(node) => Some(node),
            ContextEntry::Queue(_) => None,
        }
    }

    pub fn queue_mut(&mut self) -> Option<&mut VecDeque<T>> {
        match self {
            ContextEntry::Queue(queue) => Some(queue),
            ContextEntry::Node(_) => None,
        }
    }
}

/// A context entry tagged with the logical name it was opened under.
#[derive(Debug, Clone, PartialEq)]
pub struct ContextFrame<T> {
    pub name: String,
    pub entry: ContextEntry<T>,
}

/// Failure to pop a frame.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StackError {
    Empty { actual: String },
    Mismatch { expected: String, actual: String },
}

impl From<StackError> for ParseError {
    fn from(err: StackError) -> Self {
        match err {
            StackError::Empty { actual } => ParseError::InvalidState(format!(
                "closing context '{actual}' without an open context"
            )),
            StackError::Mismatch { expected, actual } => {
                ParseError::ContextMismatch { expected, actual }
            }
        }
    }
}

impl From<StackError> for SerializationError {
    fn from(err: StackError) -> Self {
        match err {
            StackError::Empty { actual } => SerializationError::NoOpenContext { name: actual },
            StackError::Mismatch { expected, actual } => {
                SerializationError::ContextMismatch { expected, actual }
            }
        }
    }
}

/// LIFO stack of named context frames.
///
/// # Examples
/// ```
/// use bitwire_core::buffer::{ContextEntry, ContextStack};
///
/// let mut stack = ContextStack::new();
/// stack.push("outer", ContextEntry::Node(1));
/// stack.push("inner", ContextEntry::Node(2));
/// assert!(stack.pop_named("outer").is_err());
/// assert_eq!(stack.len(), 2);
/// assert!(stack.pop_named("inner").is_ok());
/// ```
#[derive(Debug, Clone)]
pub struct ContextStack<T> {
    frames: Vec<ContextFrame<T>>,
}

impl<T> Default for ContextStack<T> {
    fn default() -> Self {
        Self { frames: Vec::new() }
    }
}

impl<T> ContextStack<T> {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, name: &str, entry: ContextEntry<T>) {
        tracing::trace!(context = name, depth = self.frames.len() + 1, "context opened");
        self.frames.push(ContextFrame {
            name: name.to_string(),
            entry,
        });
    }

    /// Pop the top frame if it was opened under `name`. A mismatched name
    /// leaves the stack unchanged.
    pub fn pop_named(&mut self, name: &str) -> Result<ContextFrame<T>, StackError> {
        let Some(top) = self.frames.last() else {
            return Err(StackError::Empty {
                actual: name.to_string(),
            });
        };
        if top.name != name {
            return Err(StackError::Mismatch {
                expected: top.name.clone(),
                actual: name.to_string(),
            });
        }
        let frame = self.frames.pop().ok_or(StackError::Empty {
            actual: name.to_string(),
        })?;
        tracing::trace!(context = name, depth = self.frames.len(), "context closed");
        Ok(frame)
    }

    pub fn peek(&self) -> Option<&ContextFrame<T>> {
        self.frames.last()
    }

    pub fn peek_mut(&mut self) -> Option<&mut ContextFrame<T>> {
        self.frames.last_mut()
    }

    pub fn is_empty(&self) -> bool {
        self.frames.is_empty()
    }

    pub fn len(&self) -> usize {
        self.frames.len()
    }

    /// Open context names from outermost to innermost, `/`-separated.
    pub fn path(&self) -> String {
        self.frames
            .iter()
            .map(|frame| frame.name.as_str())
            .collect::<Vec<_>>()
            .join("/")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn pop_on_empty_stack_fails() {
        let mut stack: ContextStack<u8> = ContextStack::new();
        let err = stack.pop_named("x").unwrap_err();
        assert_eq!(
            err,
            StackError::Empty {
                actual: "x".to_string()
            }
        );
        assert!(matches!(
            SerializationError::from(err),
            SerializationError::NoOpenContext { .. }
        ));
    }

    #[test]
    fn mismatch_reports_both_names() {
        let mut stack = ContextStack::new();
        stack.push("header", ContextEntry::Queue(VecDeque::from([1, 2])));
        let err: ParseError = stack.pop_named("payload").unwrap_err().into();
        match err {
            ParseError::ContextMismatch { expected, actual } => {
                assert_eq!(expected, "header");
                assert_eq!(actual, "payload");
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[test]
    fn path_lists_open_frames() {
        let mut stack = ContextStack::new();
        stack.push("a", ContextEntry::Node(()));
        stack.push("b", ContextEntry::Node(()));
        assert_eq!(stack.path(), "a/b");
        let frame = stack.pop_named("b").unwrap();
        assert_eq!(frame.name, "b");
        assert!(!frame.entry.is_queue());
        assert_eq!(stack.len(), 1);
    }

    #[test]
    fn entry_accessors() {
        let mut entry = ContextEntry::Queue(VecDeque::from([7]));
        assert!(entry.node_mut().is_none());
        assert_eq!(entry.queue_mut().and_then(|q| q.pop_front()), Some(7));
    }
}
