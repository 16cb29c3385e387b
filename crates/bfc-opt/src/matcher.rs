//! Tail matchers
//!
//! A matcher looks at the end of an instruction list and reports how many
//! trailing instructions it recognized. Matchers are plain boxed closures so
//! rules can be assembled by composition:
//!
//! ```rust
//! use bfc_ir::{Instruction, Opcode};
//! use bfc_opt::matcher::{opcode, sequence};
//!
//! let add_add = sequence(vec![opcode(Opcode::Add), opcode(Opcode::Add)], false);
//! let list = [Instruction::shift(1), Instruction::add(1), Instruction::add(2)];
//! assert_eq!(add_add(&list), Some(2));
//! ```

use bfc_ir::{Instruction, Op, Opcode};

/// Returns the length of the matched tail, or `None`
pub type Matcher = Box<dyn Fn(&[Instruction]) -> Option<usize>>;

/// Predicate over the scalar argument of `Add`, `Set` or `Shift`
pub type ArgPredicate = Box<dyn Fn(i64) -> bool>;

/// Last instruction has the given opcode
pub fn opcode(kind: Opcode) -> Matcher {
    Box::new(move |list| match list.last() {
        Some(instr) if instr.opcode() == kind => Some(1),
        _ => None,
    })
}

/// Last instruction has the given opcode and its argument satisfies `pred`
pub fn instruction(kind: Opcode, pred: ArgPredicate) -> Matcher {
    Box::new(move |list| {
        let instr = list.last()?;
        if instr.opcode() != kind {
            return None;
        }
        instr.argument().filter(|value| pred(*value)).map(|_| 1)
    })
}

pub fn equals(expected: i64) -> ArgPredicate {
    Box::new(move |value| value == expected)
}

pub fn any_of(values: &[i64]) -> ArgPredicate {
    let values = values.to_vec();
    Box::new(move |value| values.contains(&value))
}

/// Matchers applied right to left, each on what the previous ones left over.
///
/// With `whole` set the sequence must consume the entire list.
pub fn sequence(matchers: Vec<Matcher>, whole: bool) -> Matcher {
    Box::new(move |list| {
        let mut consumed = 0;
        for matcher in matchers.iter().rev() {
            match matcher(&list[..list.len() - consumed]) {
                Some(len) if len > 0 => consumed += len,
                _ => return None,
            }
        }
        (!whole || consumed == list.len()).then_some(consumed)
    })
}

/// Greedy backward repetition of `matcher`, between `min` and `max` times
pub fn repeated(matcher: Matcher, min: usize, max: Option<usize>) -> Matcher {
    Box::new(move |list| {
        let mut count = 0;
        let mut consumed = 0;
        while max.map_or(true, |max| count < max) {
            match matcher(&list[..list.len() - consumed]) {
                Some(len) if len > 0 => {
                    count += 1;
                    consumed += len;
                }
                _ => break,
            }
        }
        (count >= min).then_some(consumed)
    })
}

/// Last instruction is a loop.
///
/// `body`, when given, must match the loop body. With `known_memory_space`
/// the body must also return the pointer to where it started.
pub fn looping(body: Option<Matcher>, known_memory_space: bool) -> Matcher {
    Box::new(move |list| {
        let block = match &list.last()?.op {
            Op::Loop(block) => block,
            _ => return None,
        };
        if let Some(matcher) = &body {
            matcher(block.as_slice())?;
        }
        if known_memory_space && block.memory_space().is_none() {
            return None;
        }
        Some(1)
    })
}

/// Extra condition over the tail recognized by `matcher`
pub fn guarded<F>(matcher: Matcher, pred: F) -> Matcher
where
    F: Fn(&[Instruction]) -> bool + 'static,
{
    Box::new(move |list| {
        let len = matcher(list)?;
        pred(&list[list.len() - len..]).then_some(len)
    })
}
