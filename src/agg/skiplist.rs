//! Skip list of time-ordered, pairwise disjoint aggregation pieces.

use rand::rngs::SmallRng;
use rand::{Rng, SeedableRng};

use crate::error::Result;
use crate::span::{Span, TstzSpan, span_left, span_overlaps};
use crate::temporal::{TInstant, TSequence, TemporalValue};

const MAX_LEVEL: usize = 32;
const NIL: usize = usize::MAX;
const HEAD: usize = 0;

/// Elements kept by the skip list, located by their time extent.
pub trait TimeKeyed: Clone {
    fn period(&self) -> TstzSpan;
}

impl<V: TemporalValue> TimeKeyed for TInstant<V> {
    fn period(&self) -> TstzSpan {
        Span::from_value(self.t)
    }
}

impl<V: TemporalValue> TimeKeyed for TSequence<V> {
    fn period(&self) -> TstzSpan {
        TSequence::period(self)
    }
}

#[derive(Debug, Clone)]
struct Node<T> {
    item: Option<T>,
    next: Vec<usize>,
}

/// Elements sorted by time with randomized levels; searching for the
/// elements overlapping a period takes expected logarithmic time.
#[derive(Debug, Clone)]
pub struct SkipList<T> {
    nodes: Vec<Node<T>>,
    free: Vec<usize>,
    len: usize,
    rng: SmallRng,
}

impl<T: TimeKeyed> SkipList<T> {
    pub fn new() -> Self {
        SkipList {
            nodes: vec![Node { item: None, next: vec![NIL; MAX_LEVEL] }],
            free: vec![],
            len: 0,
            rng: SmallRng::seed_from_u64(0x5eed),
        }
    }

    pub fn len(&self) -> usize {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    fn random_level(&mut self) -> usize {
        let mut level = 1;
        while level < MAX_LEVEL && self.rng.gen_bool(0.5) {
            level += 1;
        }
        level
    }

    fn item(&self, node: usize) -> Option<&T> {
        self.nodes.get(node).and_then(|n| n.item.as_ref())
    }

    /// Insert a node after the nodes of `update`, which then points to it.
    fn link_after(&mut self, update: &mut [usize; MAX_LEVEL], item: T) {
        let level = self.random_level();
        let node = Node { item: Some(item), next: vec![NIL; level] };
        let id = match self.free.pop() {
            Some(id) => {
                self.nodes[id] = node;
                id
            }
            None => {
                self.nodes.push(node);
                self.nodes.len() - 1
            }
        };
        for (l, pred) in update.iter_mut().enumerate().take(level) {
            self.nodes[id].next[l] = self.nodes[*pred].next[l];
            self.nodes[*pred].next[l] = id;
            *pred = id;
        }
        self.len += 1;
    }

    /// Last node at every level strictly before the period.
    fn predecessors(&self, period: &TstzSpan) -> [usize; MAX_LEVEL] {
        let mut update = [HEAD; MAX_LEVEL];
        let mut x = HEAD;
        for l in (0..MAX_LEVEL).rev() {
            loop {
                let next = self.nodes[x].next.get(l).copied().unwrap_or(NIL);
                match self.item(next) {
                    Some(item) if span_left(&item.period(), period) => x = next,
                    _ => break,
                }
            }
            update[l] = x;
        }
        update
    }

    /// Elements whose time overlaps the period, in time order.
    pub fn search(&self, period: &TstzSpan) -> Vec<&T> {
        let update = self.predecessors(period);
        let mut out = vec![];
        let mut x = self.nodes[update[0]].next[0];
        while let Some(item) = self.item(x) {
            if !span_overlaps(&item.period(), period) {
                break;
            }
            out.push(item);
            x = self.nodes[x].next[0];
        }
        out
    }

    /// Replace the elements overlapping the time of `items` by the result of
    /// merging them with `items`. The merge must return sorted, disjoint
    /// elements within the hull of its inputs.
    pub fn splice<F>(&mut self, items: Vec<T>, merge: F) -> Result<()>
    where
        F: FnOnce(Vec<T>, Vec<T>) -> Result<Vec<T>>,
    {
        let (Some(first), Some(last)) = (items.first(), items.last()) else {
            return Ok(());
        };
        let period = first.period().hull(&last.period());
        let mut update = self.predecessors(&period);
        let mut overlapping = vec![];
        let mut x = self.nodes[update[0]].next[0];
        while let Some(item) = self.item(x) {
            if !span_overlaps(&item.period(), &period) {
                break;
            }
            overlapping.push(x);
            x = self.nodes[x].next[0];
        }
        // the list stays untouched when the merge fails
        let merged = if overlapping.is_empty() {
            items
        } else {
            let old = overlapping.iter().filter_map(|&x| self.item(x).cloned()).collect();
            merge(old, items)?
        };
        for x in overlapping {
            for (l, pred) in update.iter().enumerate().take(self.nodes[x].next.len()) {
                if self.nodes[*pred].next[l] == x {
                    self.nodes[*pred].next[l] = self.nodes[x].next[l];
                }
            }
            self.nodes[x].item = None;
            self.free.push(x);
            self.len -= 1;
        }
        for item in merged {
            self.link_after(&mut update, item);
        }
        Ok(())
    }

    /// All elements in time order.
    pub fn values(&self) -> Vec<T> {
        let mut out = Vec::with_capacity(self.len);
        let mut x = self.nodes[HEAD].next[0];
        while let Some(item) = self.item(x) {
            out.push(item.clone());
            x = self.nodes[x].next[0];
        }
        out
    }
}

impl<T: TimeKeyed> Default for SkipList<T> {
    fn default() -> Self {
        SkipList::new()
    }
}
