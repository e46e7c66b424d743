//! Container-nesting state machine shared by the decoders.

use crate::consts::{TypeCode, MAX_NESTING_DEPTH};
use crate::err::{LtvError, LtvResult};

/// The semantic position of an element within its enclosing container.
#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub enum Role {
    /// A plain value: top level, or an element of a list.
    Value,
    /// The end tag of a list.
    ListEnd,
    /// The end tag of a struct.
    StructEnd,
    /// A string serving as a struct key.
    StructKey,
    /// The value paired with the preceding struct key.
    StructValue,
}

/// What the innermost open container expects next.
#[derive(Clone, Copy, PartialEq, Eq, Debug)]
enum Marker {
    /// Open struct, waiting on its next key (or the end tag).
    StructKey,
    /// Open struct, waiting on the value for the last key.
    StructValue,
    /// Open list; any element goes.
    List,
}

#[derive(Clone, Copy, Debug)]
struct Entry {
    marker: Marker,
    first_element: bool,
}

/// Annotations produced for each element that passes the tracker.
#[derive(Clone, Copy, Debug)]
pub struct Annotations {
    pub role: Role,
    /// True for the first child of the enclosing container (and for every
    /// top-level element).
    pub first_element: bool,
    /// Nesting depth of the element. End tags report the depth of the
    /// container they close.
    pub depth: usize,
}

/// A push-down automaton enforcing the structural rules:
/// string keys for struct field names, no missing struct values, matched
/// struct/list end tags, and the maximum nesting depth.
#[derive(Clone, Debug, Default)]
pub struct NestingTracker {
    stack: Vec<Entry>,
}

impl NestingTracker {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of currently open containers.
    pub fn depth(&self) -> usize {
        self.stack.len()
    }

    /// True when every opened container has been closed.
    pub fn is_balanced(&self) -> bool {
        self.stack.is_empty()
    }

    pub fn reset(&mut self) {
        self.stack.clear();
    }

    /// Feed the next element's type code through the automaton, returning
    /// its role annotations or the structural violation it commits.
    pub fn process(&mut self, code: TypeCode) -> LtvResult<Annotations> {
        let mut role = Role::Value;
        let mut first_element = true;
        let mut depth = self.stack.len();

        if let Some(top) = self.stack.last_mut() {
            first_element = top.first_element;
            top.first_element = false;

            match top.marker {
                Marker::StructKey => {
                    // A struct may only be followed by a string key or its
                    // end tag. A string flips the struct into the
                    // expecting-value state.
                    if code == TypeCode::String {
                        top.marker = Marker::StructValue;
                        role = Role::StructKey;
                    } else if code != TypeCode::End {
                        return Err(LtvError::BadKey);
                    }
                }
                Marker::StructValue => {
                    role = Role::StructValue;
                    if code == TypeCode::End {
                        return Err(LtvError::ExpectedValue);
                    }
                    top.marker = Marker::StructKey;
                }
                Marker::List => (),
            }
        }

        if code == TypeCode::Struct || code == TypeCode::List {
            if self.stack.len() + 1 >= MAX_NESTING_DEPTH {
                return Err(LtvError::MaxNestingDepth);
            }

            let marker = match code {
                TypeCode::Struct => Marker::StructKey,
                _ => Marker::List,
            };
            self.stack.push(Entry {
                marker,
                first_element: true,
            });
        }

        if code == TypeCode::End {
            match self.stack.pop() {
                None => return Err(LtvError::NestingMismatch),
                Some(entry) => {
                    role = match entry.marker {
                        Marker::List => Role::ListEnd,
                        _ => Role::StructEnd,
                    };
                    depth = self.stack.len();
                }
            }
        }

        Ok(Annotations {
            role,
            first_element,
            depth,
        })
    }
}
