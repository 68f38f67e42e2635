//! # EVM Stack
//!
//! Bounded LIFO of 256-bit words. Maximum 1024 elements; references past
//! the current size are underflows and nothing is ever resized implicitly.

use crate::domain::value_objects::U256;
use crate::errors::VmError;

/// Maximum stack size per EVM specification.
pub const MAX_STACK_SIZE: usize = 1024;

/// EVM stack implementation.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct Stack {
    data: Vec<U256>,
}

impl Stack {
    /// Creates a new empty stack.
    #[must_use]
    pub fn new() -> Self {
        Self {
            data: Vec::with_capacity(64),
        }
    }

    /// Returns the number of elements on the stack.
    #[must_use]
    pub fn len(&self) -> usize {
        self.data.len()
    }

    /// Returns true if the stack is empty.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    /// Push a value onto the stack.
    ///
    /// # Errors
    ///
    /// Returns `StackOverflow` if the stack already holds 1024 items.
    pub fn push(&mut self, value: U256) -> Result<(), VmError> {
        if self.data.len() >= MAX_STACK_SIZE {
            return Err(VmError::StackOverflow);
        }
        self.data.push(value);
        Ok(())
    }

    /// Pop a value from the stack.
    ///
    /// # Errors
    ///
    /// Returns `StackUnderflow` if the stack is empty.
    pub fn pop(&mut self) -> Result<U256, VmError> {
        self.data.pop().ok_or(VmError::StackUnderflow)
    }

    /// Peek at the value `offset` items below the top (0 = top).
    ///
    /// # Errors
    ///
    /// Returns `StackUnderflow` if `offset` is beyond the current size.
    pub fn peek(&self, offset: usize) -> Result<U256, VmError> {
        if offset >= self.data.len() {
            return Err(VmError::StackUnderflow);
        }
        Ok(self.data[self.data.len() - 1 - offset])
    }

    /// DUPn: push a copy of the n-th item from the top (DUP1 = top).
    ///
    /// # Errors
    ///
    /// Returns `StackUnderflow` if fewer than `n` items are present,
    /// `StackOverflow` if the stack is full.
    pub fn dup(&mut self, n: usize) -> Result<(), VmError> {
        if n == 0 || n > self.data.len() {
            return Err(VmError::StackUnderflow);
        }
        if self.data.len() >= MAX_STACK_SIZE {
            return Err(VmError::StackOverflow);
        }
        let value = self.data[self.data.len() - n];
        self.data.push(value);
        Ok(())
    }

    /// SWAPn: exchange the top with the (n+1)-th item (SWAP1 = top two).
    ///
    /// # Errors
    ///
    /// Returns `StackUnderflow` if fewer than `n + 1` items are present.
    pub fn swap(&mut self, n: usize) -> Result<(), VmError> {
        if n == 0 || n >= self.data.len() {
            return Err(VmError::StackUnderflow);
        }
        let len = self.data.len();
        self.data.swap(len - 1, len - 1 - n);
        Ok(())
    }

    /// Stack contents, bottom first.
    #[must_use]
    pub fn as_slice(&self) -> &[U256] {
        &self.data
    }
}

// =============================================================================
// TESTS
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn test_push_pop() {
        let mut stack = Stack::new();
        stack.push(U256::from(42)).unwrap();
        stack.push(U256::from(100)).unwrap();

        assert_eq!(stack.len(), 2);
        assert_eq!(stack.pop().unwrap(), U256::from(100));
        assert_eq!(stack.pop().unwrap(), U256::from(42));
        assert!(stack.is_empty());
    }

    #[test]
    fn test_peek() {
        let mut stack = Stack::new();
        stack.push(U256::from(1)).unwrap();
        stack.push(U256::from(2)).unwrap();
        stack.push(U256::from(3)).unwrap();

        assert_eq!(stack.peek(0).unwrap(), U256::from(3));
        assert_eq!(stack.peek(1).unwrap(), U256::from(2));
        assert_eq!(stack.peek(2).unwrap(), U256::from(1));
        assert_eq!(stack.peek(3), Err(VmError::StackUnderflow));
    }

    #[test]
    fn test_swap() {
        let mut stack = Stack::new();
        stack.push(U256::from(1)).unwrap();
        stack.push(U256::from(2)).unwrap();
        stack.push(U256::from(3)).unwrap();

        // SWAP1: swap top with second
        stack.swap(1).unwrap();
        assert_eq!(stack.peek(0).unwrap(), U256::from(2));
        assert_eq!(stack.peek(1).unwrap(), U256::from(3));

        // SWAP2: swap top with third
        stack.swap(2).unwrap();
        assert_eq!(stack.peek(0).unwrap(), U256::from(1));
        assert_eq!(stack.peek(2).unwrap(), U256::from(2));

        assert_eq!(stack.swap(3), Err(VmError::StackUnderflow));
    }

    #[test]
    fn test_dup() {
        let mut stack = Stack::new();
        stack.push(U256::from(1)).unwrap();
        stack.push(U256::from(2)).unwrap();

        // DUP1: duplicate top
        stack.dup(1).unwrap();
        assert_eq!(stack.len(), 3);
        assert_eq!(stack.peek(0).unwrap(), U256::from(2));

        // DUP3: third from top is the original 1
        stack.dup(3).unwrap();
        assert_eq!(stack.peek(0).unwrap(), U256::from(1));

        assert_eq!(stack.dup(5), Err(VmError::StackUnderflow));
    }

    #[test]
    fn test_overflow() {
        let mut stack = Stack::new();
        for i in 0..MAX_STACK_SIZE {
            stack.push(U256::from(i)).unwrap();
        }
        assert_eq!(stack.push(U256::zero()), Err(VmError::StackOverflow));
        assert_eq!(stack.dup(1), Err(VmError::StackOverflow));
        assert_eq!(stack.len(), MAX_STACK_SIZE);
    }

    #[test]
    fn test_underflow() {
        let mut stack = Stack::new();
        assert_eq!(stack.pop(), Err(VmError::StackUnderflow));
        assert_eq!(stack.peek(0), Err(VmError::StackUnderflow));
    }

    proptest! {
        #[test]
        fn prop_size_stays_in_bounds(ops in proptest::collection::vec(0u8..4, 0..2500)) {
            let mut stack = Stack::new();
            for op in ops {
                let before = stack.len();
                let result = match op {
                    0 | 1 => stack.push(U256::from(before)),
                    2 => stack.pop().map(|_| ()),
                    _ => stack.dup(1),
                };
                match &result {
                    Ok(()) => prop_assert!(stack.len() <= MAX_STACK_SIZE),
                    Err(VmError::StackOverflow) => prop_assert_eq!(before, MAX_STACK_SIZE),
                    Err(VmError::StackUnderflow) => prop_assert_eq!(before, 0),
                    Err(other) => prop_assert!(false, "unexpected error {other:?}"),
                }
                if result.is_err() {
                    prop_assert_eq!(stack.len(), before);
                }
            }
        }
    }
}
