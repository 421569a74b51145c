use super::{Error, Result};
use crate::ast::Value;

/// The captured values one lambda invocation supplies. Slots the invocation
///  filled with something other than a captured value (usually the record
///  itself) stay `None` so the remaining indices line up.
#[derive(Debug)]
pub(crate) struct Frame<'a> {
    values: Vec<Option<&'a Value>>,
    uses: Vec<usize>,
}

impl<'a> Frame<'a> {
    /// Indices of captured values nothing referred to.
    pub fn unused(&self) -> impl Iterator<Item = usize> + '_ {
        self.values
            .iter()
            .zip(&self.uses)
            .enumerate()
            .filter(|(_, (value, uses))| value.is_some() && **uses == 0)
            .map(|(index, _)| index)
    }
}

/// Argument frames for nested lambda invocations. Parameters resolve
///  against the top frame only, so values captured by an outer composition
///  never leak into an inner one.
#[derive(Debug, Default)]
pub(crate) struct ArgumentStack<'a> {
    frames: Vec<Frame<'a>>,
}

impl<'a> ArgumentStack<'a> {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn depth(&self) -> usize {
        self.frames.len()
    }

    pub fn push(&mut self, values: Vec<Option<&'a Value>>) {
        tracing::trace!(depth = self.frames.len() + 1, ?values, "pushing argument frame");
        let uses = vec![0; values.len()];
        self.frames.push(Frame { values, uses });
    }

    pub fn pop(&mut self) -> Option<Frame<'a>> {
        let frame = self.frames.pop()?;
        let unused: Vec<usize> = frame.unused().collect();
        if unused.is_empty() {
            tracing::trace!(depth = self.frames.len() + 1, uses = ?frame.uses, "popping argument frame");
        } else {
            tracing::debug!(
                depth = self.frames.len() + 1,
                ?unused,
                "popping argument frame with unconsumed captured values"
            );
        }
        Some(frame)
    }

    /// The value at `index` in the top frame, without recording a use.
    pub fn peek(&self, index: usize) -> Option<&'a Value> {
        self.frames.last()?.values.get(index).copied().flatten()
    }

    /// The value at `index` in the top frame, recording a use.
    pub fn resolve(&mut self, index: usize) -> Result<&'a Value> {
        let frame = self
            .frames
            .last_mut()
            .ok_or(Error::NoArgumentFrame(index))?;
        let len = frame.values.len();
        let value = frame
            .values
            .get(index)
            .copied()
            .ok_or(Error::ParameterOutOfRange { index, len })?
            .ok_or(Error::UnboundParameter(index))?;
        frame.uses[index] += 1;
        Ok(value)
    }

    /// Like `resolve`, but a missing frame or an unbound slot gives `None`.
    ///  An index past the end of the frame is still an error.
    pub fn try_resolve(&mut self, index: usize) -> Result<Option<&'a Value>> {
        match self.resolve(index) {
            Ok(value) => Ok(Some(value)),
            Err(Error::NoArgumentFrame(_) | Error::UnboundParameter(_)) => Ok(None),
            Err(e) => Err(e),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn resolves_against_top_frame() {
        let outer = Value::Int(1);
        let inner = Value::Text("x".into());
        let mut stack = ArgumentStack::new();
        stack.push(vec![Some(&outer)]);
        assert_eq!(stack.resolve(0), Ok(&outer));
        stack.push(vec![None, Some(&inner)]);
        assert_eq!(stack.depth(), 2);
        assert_eq!(stack.resolve(1), Ok(&inner));
        assert_eq!(stack.resolve(0), Err(Error::UnboundParameter(0)));
        assert_eq!(
            stack.resolve(2),
            Err(Error::ParameterOutOfRange { index: 2, len: 2 })
        );
        stack.pop();
        assert_eq!(stack.resolve(0), Ok(&outer));
        let frame = stack.pop().unwrap();
        assert_eq!(frame.uses[0], 2);
        assert_eq!(stack.resolve(0), Err(Error::NoArgumentFrame(0)));
    }

    #[test]
    fn unbound_frame_shadows_outer() {
        let outer = Value::Int(1);
        let mut stack = ArgumentStack::new();
        stack.push(vec![Some(&outer)]);
        stack.push(vec![None]);
        assert_eq!(stack.peek(0), None);
        assert_eq!(stack.resolve(0), Err(Error::UnboundParameter(0)));
        stack.push(vec![]);
        assert_eq!(
            stack.resolve(0),
            Err(Error::ParameterOutOfRange { index: 0, len: 0 })
        );
        stack.pop();
        stack.pop();
        assert_eq!(stack.peek(0), Some(&outer));
        stack.pop();
        assert_eq!(stack.depth(), 0);
        assert!(stack.pop().is_none());
    }

    #[test]
    fn try_resolve_tolerates_missing_values() {
        let v = Value::Int(3);
        let mut stack = ArgumentStack::new();
        assert_eq!(stack.try_resolve(0), Ok(None));
        stack.push(vec![None, Some(&v)]);
        assert_eq!(stack.try_resolve(0), Ok(None));
        assert_eq!(stack.try_resolve(1), Ok(Some(&v)));
        assert!(stack.try_resolve(2).is_err());
    }

    #[test]
    fn peek_does_not_count() {
        let v = Value::Null;
        let unused = Value::Bool(true);
        let mut stack = ArgumentStack::new();
        stack.push(vec![Some(&v), Some(&unused)]);
        assert_eq!(stack.peek(0), Some(&v));
        assert_eq!(stack.peek(5), None);
        assert_eq!(stack.try_resolve(0), Ok(Some(&v)));
        assert_eq!(
            stack.try_resolve(7),
            Err(Error::ParameterOutOfRange { index: 7, len: 2 })
        );
        let frame = stack.pop().unwrap();
        assert_eq!(frame.uses[0], 1);
        assert_eq!(frame.unused().collect::<Vec<_>>(), vec![1]);
    }
}
