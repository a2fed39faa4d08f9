use log::*;
use std::fmt;
use std::rc::Rc;

#[derive(Debug)]
pub enum CommandError {
    /// The referenced container or entity changed under the command,
    /// e.g. an undo targeting an element that was removed externally.
    StaleReference(String),
    Invalid(String),
}

impl fmt::Display for CommandError {
    fn fmt(&self, f :&mut fmt::Formatter) -> fmt::Result {
        match self {
            CommandError::StaleReference(msg) => write!(f, "stale reference: {}", msg),
            CommandError::Invalid(msg) => write!(f, "invalid command: {}", msg),
        }
    }
}

impl std::error::Error for CommandError {}

pub type CommandResult = Result<(), CommandError>;

/// One reversible mutation of the model `M`.
///
/// `undo` after `execute` must restore the observable state from before
/// `execute`, and `redo` must be equivalent to re-running `execute`.
pub trait Command<M> {
    fn label(&self) -> &str;
    fn execute(&mut self, model :&mut M) -> CommandResult;
    fn undo(&mut self, model :&mut M) -> CommandResult;
    fn redo(&mut self, model :&mut M) -> CommandResult { self.execute(model) }
}

/// Appends a value to a `Vec` somewhere inside the model. The insertion
/// index is remembered at execute time and undo removes exactly that
/// index, so equal duplicates elsewhere in the container are never
/// confused with the pushed element.
pub struct PushValue<M, T> {
    label :String,
    access :Box<dyn for<'a> Fn(&'a mut M) -> Option<&'a mut Vec<T>>>,
    value :T,
    index :Option<usize>,
}

impl<M, T> PushValue<M, T> {
    pub fn new(label :impl Into<String>,
               access :impl for<'a> Fn(&'a mut M) -> Option<&'a mut Vec<T>> + 'static,
               value :T) -> Self {
        PushValue {
            label: label.into(),
            access: Box::new(access),
            value: value,
            index: None,
        }
    }
}

impl<M, T :Clone + PartialEq> Command<M> for PushValue<M, T> {
    fn label(&self) -> &str { &self.label }

    fn execute(&mut self, model :&mut M) -> CommandResult {
        let container = (self.access)(model)
            .ok_or_else(|| CommandError::StaleReference(format!("{}: container is gone", self.label)))?;
        self.index = Some(container.len());
        container.push(self.value.clone());
        Ok(())
    }

    fn undo(&mut self, model :&mut M) -> CommandResult {
        let idx = self.index.take()
            .ok_or_else(|| CommandError::Invalid(format!("{}: undo before execute", self.label)))?;
        let container = (self.access)(model)
            .ok_or_else(|| CommandError::StaleReference(format!("{}: container is gone", self.label)))?;
        if idx < container.len() && container[idx] == self.value {
            container.remove(idx);
            Ok(())
        } else {
            Err(CommandError::StaleReference(
                format!("{}: container changed since execute", self.label)))
        }
    }
}

struct FieldPatch<M> {
    name :&'static str,
    apply :Box<dyn Fn(&mut M)>,
    revert :Box<dyn Fn(&mut M)>,
}

/// Assigns new values to a set of fields, restoring the captured old
/// values on undo. The old/new pair for each field is fixed at
/// construction time as an explicit patch, applied through a plain
/// setter function.
pub struct SetFields<M> {
    label :String,
    patches :Vec<FieldPatch<M>>,
}

impl<M> SetFields<M> {
    pub fn new(label :impl Into<String>) -> Self {
        SetFields { label: label.into(), patches: Vec::new() }
    }

    pub fn field<T :Clone + 'static>(mut self,
                                     name :&'static str,
                                     setter :impl Fn(&mut M, T) + 'static,
                                     old :T, new :T) -> Self {
        let setter = Rc::new(setter);
        let apply = {
            let setter = setter.clone();
            Box::new(move |m :&mut M| setter(m, new.clone()))
        };
        let revert = Box::new(move |m :&mut M| setter(m, old.clone()));
        self.patches.push(FieldPatch { name, apply, revert });
        self
    }

    pub fn field_names(&self) -> impl Iterator<Item = &'static str> + '_ {
        self.patches.iter().map(|p| p.name)
    }
}

impl<M> Command<M> for SetFields<M> {
    fn label(&self) -> &str { &self.label }

    fn execute(&mut self, model :&mut M) -> CommandResult {
        for p in self.patches.iter() { (p.apply)(model); }
        Ok(())
    }

    fn undo(&mut self, model :&mut M) -> CommandResult {
        for p in self.patches.iter().rev() { (p.revert)(model); }
        Ok(())
    }
}

/// One undo step. Several commands can share a step when they carry the
/// same edit class, so e.g. a slider drag collapses into a single undo.
struct Entry<M> {
    parts :Vec<Box<dyn Command<M>>>,
}

pub struct UndoStack<M, C> {
    stack :Vec<Entry<M>>,
    pointer :usize,
    class :Option<C>,
    limit :usize,
}

const DEFAULT_LIMIT :usize = 100;

impl<M, C :PartialEq> UndoStack<M, C> {
    pub fn new() -> Self { Self::with_limit(DEFAULT_LIMIT) }

    pub fn with_limit(limit :usize) -> Self {
        UndoStack {
            stack: Vec::new(),
            pointer: 0,
            class: None,
            limit: limit.max(1),
        }
    }

    pub fn info(&self) -> String {
        format!("Undo stack {}/{}", self.pointer, self.stack.len())
    }

    /// Execute the command and record it. A failing execute leaves the
    /// stack unchanged. Pushing while undone commands exist drops the
    /// redo branch.
    pub fn push(&mut self, mut cmd :Box<dyn Command<M>>, class :Option<C>,
                model :&mut M) -> CommandResult {
        cmd.execute(model)?;
        self.stack.truncate(self.pointer);
        if class.is_some() && class == self.class && self.pointer > 0 {
            // same edit class: extend the open undo step
            self.stack[self.pointer - 1].parts.push(cmd);
        } else {
            self.stack.push(Entry { parts: vec![cmd] });
            self.pointer += 1;
        }
        self.class = class;
        if self.stack.len() > self.limit {
            let excess = self.stack.len() - self.limit;
            self.stack.drain(0..excess);
            self.pointer -= excess;
        }
        Ok(())
    }

    pub fn can_undo(&self) -> bool { self.pointer > 0 }
    pub fn can_redo(&self) -> bool { self.pointer < self.stack.len() }

    pub fn undo(&mut self, model :&mut M) -> bool {
        if self.pointer > 0 {
            self.pointer -= 1;
            self.class = None;
            for cmd in self.stack[self.pointer].parts.iter_mut().rev() {
                if let Err(e) = cmd.undo(model) {
                    warn!("Undo of {} failed: {}", cmd.label(), e);
                }
            }
            true
        } else {
            false
        }
    }

    pub fn redo(&mut self, model :&mut M) -> bool {
        if self.pointer < self.stack.len() {
            for cmd in self.stack[self.pointer].parts.iter_mut() {
                if let Err(e) = cmd.redo(model) {
                    warn!("Redo of {} failed: {}", cmd.label(), e);
                }
            }
            self.pointer += 1;
            self.class = None;
            true
        } else {
            false
        }
    }

    pub fn clear(&mut self) {
        self.stack.clear();
        self.pointer = 0;
        self.class = None;
    }

    pub fn override_edit_class(&mut self, cl :C) {
        self.class = Some(cl);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Clone, Debug, PartialEq)]
    struct Target {
        items :Vec<i32>,
        x :i32,
        y :i32,
    }

    fn target() -> Target { Target { items: vec![10], x: 1, y: 2 } }

    fn push_cmd(v :i32) -> Box<dyn Command<Target>> {
        Box::new(PushValue::new("push item", |t :&mut Target| Some(&mut t.items), v))
    }

    #[test]
    fn push_value_round_trip() {
        let mut t = target();
        let mut cmd = PushValue::new("push item", |t :&mut Target| Some(&mut t.items), 20);
        cmd.execute(&mut t).unwrap();
        assert_eq!(t.items, vec![10, 20]);
        cmd.undo(&mut t).unwrap();
        assert_eq!(t.items, vec![10]);
        cmd.redo(&mut t).unwrap();
        assert_eq!(t.items, vec![10, 20]);
    }

    #[test]
    fn push_value_undo_targets_insertion_index() {
        // duplicates before the inserted element are left alone
        let mut t = Target { items: vec![7, 7], x: 0, y: 0 };
        let mut cmd = PushValue::new("push item", |t :&mut Target| Some(&mut t.items), 7);
        cmd.execute(&mut t).unwrap();
        assert_eq!(t.items, vec![7, 7, 7]);
        cmd.undo(&mut t).unwrap();
        assert_eq!(t.items, vec![7, 7]);
    }

    #[test]
    fn push_value_stale_container_is_an_error() {
        let mut t = target();
        let mut cmd = PushValue::new("push item", |t :&mut Target| Some(&mut t.items), 20);
        cmd.execute(&mut t).unwrap();
        t.items.clear();
        match cmd.undo(&mut t) {
            Err(CommandError::StaleReference(_)) => {},
            other => panic!("expected stale reference, got {:?}", other.map_err(|e| e.to_string())),
        }
    }

    #[test]
    fn set_fields_patches_only_named_fields() {
        let mut t = target();
        let mut cmd = SetFields::new("set x")
            .field("x", |t :&mut Target, v| t.x = v, 1, 5);
        cmd.execute(&mut t).unwrap();
        assert_eq!((t.x, t.y), (5, 2));
        cmd.undo(&mut t).unwrap();
        assert_eq!((t.x, t.y), (1, 2));
        assert_eq!(cmd.field_names().collect::<Vec<_>>(), vec!["x"]);
    }

    #[test]
    fn set_fields_multiple_round_trip() {
        let mut t = target();
        let mut cmd = SetFields::new("set both")
            .field("x", |t :&mut Target, v| t.x = v, 1, 100)
            .field("y", |t :&mut Target, v| t.y = v, 2, 200);
        cmd.execute(&mut t).unwrap();
        assert_eq!((t.x, t.y), (100, 200));
        cmd.undo(&mut t).unwrap();
        assert_eq!((t.x, t.y), (1, 2));
    }

    #[test]
    fn stack_undo_redo() {
        let mut t = target();
        let mut stack :UndoStack<Target, ()> = UndoStack::new();
        stack.push(push_cmd(20), None, &mut t).unwrap();
        stack.push(push_cmd(30), None, &mut t).unwrap();
        assert_eq!(t.items, vec![10, 20, 30]);
        assert!(stack.can_undo());

        assert!(stack.undo(&mut t));
        assert_eq!(t.items, vec![10, 20]);
        assert!(stack.can_redo());

        assert!(stack.redo(&mut t));
        assert_eq!(t.items, vec![10, 20, 30]);
        assert!(!stack.can_redo());
        assert!(!stack.redo(&mut t));
    }

    #[test]
    fn push_invalidates_redo_branch() {
        let mut t = target();
        let mut stack :UndoStack<Target, ()> = UndoStack::new();
        stack.push(push_cmd(20), None, &mut t).unwrap();
        stack.undo(&mut t);
        stack.push(push_cmd(99), None, &mut t).unwrap();
        assert!(!stack.can_redo());
        assert_eq!(t.items, vec![10, 99]);
    }

    #[test]
    fn same_edit_class_collapses_to_one_step() {
        let mut t = target();
        let mut stack :UndoStack<Target, &'static str> = UndoStack::new();
        let set = |old, new| -> Box<dyn Command<Target>> {
            Box::new(SetFields::new("set x").field("x", |t :&mut Target, v| t.x = v, old, new))
        };
        stack.push(set(1, 2), Some("drag x"), &mut t).unwrap();
        stack.push(set(2, 3), Some("drag x"), &mut t).unwrap();
        stack.push(set(3, 4), Some("drag x"), &mut t).unwrap();
        assert_eq!(t.x, 4);

        // whole drag is one undo step
        assert!(stack.undo(&mut t));
        assert_eq!(t.x, 1);
        assert!(!stack.can_undo());

        assert!(stack.redo(&mut t));
        assert_eq!(t.x, 4);
    }

    #[test]
    fn undo_breaks_class_merging() {
        let mut t = target();
        let mut stack :UndoStack<Target, &'static str> = UndoStack::new();
        stack.push(push_cmd(20), Some("a"), &mut t).unwrap();
        stack.undo(&mut t);
        stack.redo(&mut t);
        stack.push(push_cmd(30), Some("a"), &mut t).unwrap();
        // after undo/redo the class is cleared, so this is a new step
        stack.undo(&mut t);
        assert_eq!(t.items, vec![10, 20]);
    }

    #[test]
    fn depth_limit_evicts_oldest() {
        let mut t = target();
        let mut stack :UndoStack<Target, ()> = UndoStack::with_limit(2);
        stack.push(push_cmd(1), None, &mut t).unwrap();
        stack.push(push_cmd(2), None, &mut t).unwrap();
        stack.push(push_cmd(3), None, &mut t).unwrap();
        assert!(stack.undo(&mut t));
        assert!(stack.undo(&mut t));
        assert!(!stack.can_undo());
        // the first push can no longer be undone
        assert_eq!(t.items, vec![10, 1]);
    }

    #[test]
    fn stale_undo_warns_but_does_not_panic() {
        let mut t = target();
        let mut stack :UndoStack<Target, ()> = UndoStack::new();
        stack.push(push_cmd(20), None, &mut t).unwrap();
        t.items.clear(); // external interference
        assert!(stack.undo(&mut t));
        assert_eq!(t.items, Vec::<i32>::new());
    }

    #[test]
    fn clear_empties_both_directions() {
        let mut t = target();
        let mut stack :UndoStack<Target, ()> = UndoStack::new();
        stack.push(push_cmd(20), None, &mut t).unwrap();
        stack.undo(&mut t);
        stack.clear();
        assert!(!stack.can_undo());
        assert!(!stack.can_redo());
    }
}
