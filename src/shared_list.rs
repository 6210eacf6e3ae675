use std::cell::{Ref, RefCell};
use std::rc::{Rc, Weak};

/// A singly linked list whose nodes are shared between handles.
///
/// Cloning a handle shares every node, so a clone works as a cursor: moving it
/// along with `tail` leaves the original untouched, while `push_back` on any
/// handle is visible to all handles that can reach the last node. Each handle
/// remembers the last node it saw, so appending does not walk the whole list.
#[derive(Debug)]
pub struct SharedList<T> {
    head: Link<T>,
    // Last node this handle has seen. Other handles may have appended past
    // it since, so it is a starting point for finding the end, not the end.
    last: Weak<RefCell<Node<T>>>,
}

type Link<T> = Option<Rc<RefCell<Node<T>>>>;

#[derive(Debug)]
struct Node<T> {
    elem: T,
    next: Link<T>,
}

impl<T> Node<T> {
    fn new(elem: T) -> Rc<RefCell<Self>> {
        Rc::new(RefCell::new(Node { elem, next: None }))
    }
}

impl<T> Clone for SharedList<T> {
    fn clone(&self) -> SharedList<T> {
        SharedList {
            head: self.head.clone(),
            last: self.last.clone(),
        }
    }
}

impl<T> Default for SharedList<T> {
    fn default() -> Self {
        SharedList::new()
    }
}

impl<T> SharedList<T> {
    pub fn new() -> Self {
        SharedList {
            head: None,
            last: Weak::new(),
        }
    }

    pub fn push(&mut self, elem: T) {
        let new_head = Node::new(elem);
        match self.head.take() {
            Some(old_head) => new_head.borrow_mut().next = Some(old_head),
            None => self.last = Rc::downgrade(&new_head),
        }
        self.head = Some(new_head);
    }

    pub fn push_back(&mut self, elem: T) {
        let new_node = Node::new(elem);
        let last = Rc::downgrade(&new_node);
        match self.last_node() {
            None => self.head = Some(new_node),
            Some(node) => node.borrow_mut().next = Some(new_node),
        }
        self.last = last;
    }

    pub fn peek(&self) -> Option<Ref<T>> {
        self.head
            .as_ref()
            .map(|node| Ref::map(node.borrow(), |node| &node.elem))
    }

    pub fn tail(&self) -> SharedList<T> {
        SharedList {
            head: self
                .head
                .as_ref()
                .and_then(|old_head| old_head.borrow().next.clone()),
            last: self.last.clone(),
        }
    }

    pub fn empty(&self) -> bool {
        self.head.is_none()
    }

    pub fn len(&self) -> usize {
        let mut count = 0;
        let mut link = self.head.clone();
        while let Some(node) = link {
            count += 1;
            link = node.borrow().next.clone();
        }
        count
    }

    /// Visits every element from the head on.
    pub fn for_each(&self, mut f: impl FnMut(&T)) {
        let mut link = self.head.clone();
        while let Some(node) = link {
            f(&node.borrow().elem);
            link = node.borrow().next.clone();
        }
    }

    // An empty handle may still remember a node from before it moved past
    // the end, so `last` is only trusted while there is a head.
    fn last_node(&self) -> Link<T> {
        let head = self.head.as_ref()?;
        let mut current = self.last.upgrade().unwrap_or_else(|| head.clone());
        loop {
            let next = current.borrow().next.clone();
            match next {
                Some(node) => current = node,
                None => return Some(current),
            }
        }
    }
}

impl<T> Drop for SharedList<T> {
    // Unlink the nodes only this handle owns one at a time, instead of letting
    // a long chain drop recursively.
    fn drop(&mut self) {
        let mut link = self.head.take();
        while let Some(node) = link {
            match Rc::try_unwrap(node) {
                Ok(cell) => link = cell.into_inner().next,
                Err(_) => break,
            }
        }
    }
}
