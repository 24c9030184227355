//! In-memory R-tree over spans and boxes, with quadratic node splits.

use crate::datatype::SpanBase;
use crate::span::{Span, span_overlaps};
use crate::stbox::STBox;
use crate::tbox::TBox;

const MAX_ENTRIES: usize = 8;
const MIN_ENTRIES: usize = 3;

/// Box types that can be indexed.
pub trait RTreeBox: Clone {
    /// Smallest box containing both.
    fn union(&self, other: &Self) -> Self;
    fn overlaps(&self, other: &Self) -> bool;
    /// Content of the box: length, area or volume over its dimensions.
    fn measure(&self) -> f64;
}

impl<T: SpanBase> RTreeBox for Span<T> {
    fn union(&self, other: &Self) -> Self {
        self.hull(other)
    }
    fn overlaps(&self, other: &Self) -> bool {
        span_overlaps(self, other)
    }
    fn measure(&self) -> f64 {
        self.upper.to_f64() - self.lower.to_f64()
    }
}

fn period_length(period: &Option<crate::span::TstzSpan>) -> f64 {
    period.map(|p| p.upper.to_f64() - p.lower.to_f64()).unwrap_or(1.0)
}

impl RTreeBox for TBox {
    fn union(&self, other: &Self) -> Self {
        self.expand(other)
    }
    fn overlaps(&self, other: &Self) -> bool {
        TBox::overlaps(self, other)
    }
    fn measure(&self) -> f64 {
        let value = self.span.map(|s| s.to_float().measure()).unwrap_or(1.0);
        value * period_length(&self.period)
    }
}

impl RTreeBox for STBox {
    fn union(&self, other: &Self) -> Self {
        self.expand(other)
    }
    fn overlaps(&self, other: &Self) -> bool {
        STBox::overlaps(self, other)
    }
    fn measure(&self) -> f64 {
        let space = self
            .space
            .map(|s| {
                let z = s.z.map(|(lo, hi)| hi - lo).unwrap_or(1.0);
                (s.xmax - s.xmin) * (s.ymax - s.ymin) * z
            })
            .unwrap_or(1.0);
        space * period_length(&self.period)
    }
}

#[derive(Debug, Clone)]
enum Node<B> {
    Leaf(Vec<(B, usize)>),
    Inner(Vec<(B, Node<B>)>),
}

impl<B: RTreeBox> Node<B> {
    fn len(&self) -> usize {
        match self {
            Node::Leaf(entries) => entries.len(),
            Node::Inner(children) => children.len(),
        }
    }

    fn bbox(&self) -> Option<B> {
        let boxes: Vec<&B> = match self {
            Node::Leaf(entries) => entries.iter().map(|(b, _)| b).collect(),
            Node::Inner(children) => children.iter().map(|(b, _)| b).collect(),
        };
        let (first, rest) = boxes.split_first()?;
        Some(rest.iter().fold((*first).clone(), |acc, b| acc.union(b)))
    }

    /// Insert below this node. Returns the new sibling when the node split.
    fn insert(&mut self, bbox: B, id: usize) -> Option<Node<B>> {
        match self {
            Node::Leaf(entries) => {
                entries.push((bbox, id));
                if entries.len() > MAX_ENTRIES {
                    let (left, right) = quadratic_split(std::mem::take(entries));
                    *entries = left;
                    return Some(Node::Leaf(right));
                }
                None
            }
            Node::Inner(children) => {
                let k = choose_subtree(children, &bbox);
                children[k].0 = children[k].0.union(&bbox);
                let sibling = children[k].1.insert(bbox, id)?;
                if let Some(b) = children[k].1.bbox() {
                    children[k].0 = b;
                }
                let sibling_box = sibling.bbox()?;
                children.push((sibling_box, sibling));
                if children.len() > MAX_ENTRIES {
                    let (left, right) = quadratic_split(std::mem::take(children));
                    *children = left;
                    return Some(Node::Inner(right));
                }
                None
            }
        }
    }

    fn search(&self, query: &B, out: &mut Vec<usize>) {
        match self {
            Node::Leaf(entries) => out.extend(entries.iter().filter(|(b, _)| b.overlaps(query)).map(|(_, id)| *id)),
            Node::Inner(children) => {
                for (b, child) in children {
                    if b.overlaps(query) {
                        child.search(query, out);
                    }
                }
            }
        }
    }
}

fn enlargement<B: RTreeBox>(current: &B, added: &B) -> f64 {
    current.union(added).measure() - current.measure()
}

/// Child needing the least enlargement, ties to the smallest.
fn choose_subtree<B: RTreeBox, T>(children: &[(B, T)], bbox: &B) -> usize {
    let mut best = 0;
    let mut best_key = (f64::INFINITY, f64::INFINITY);
    for (k, (b, _)) in children.iter().enumerate() {
        let key = (enlargement(b, bbox), b.measure());
        if key.0 < best_key.0 || (key.0 == best_key.0 && key.1 < best_key.1) {
            best = k;
            best_key = key;
        }
    }
    best
}

/// Guttman's quadratic split.
fn quadratic_split<B: RTreeBox, T>(mut entries: Vec<(B, T)>) -> (Vec<(B, T)>, Vec<(B, T)>) {
    // seeds: the pair wasting the most space when grouped
    let (mut s1, mut s2, mut worst) = (0, 1, f64::NEG_INFINITY);
    for i in 0..entries.len() {
        for j in i + 1..entries.len() {
            let (a, b) = (&entries[i].0, &entries[j].0);
            let waste = a.union(b).measure() - a.measure() - b.measure();
            if waste > worst {
                (s1, s2, worst) = (i, j, waste);
            }
        }
    }
    let second = entries.swap_remove(s2);
    let first = entries.swap_remove(s1);
    let (mut box1, mut box2) = (first.0.clone(), second.0.clone());
    let (mut group1, mut group2) = (vec![first], vec![second]);
    while !entries.is_empty() {
        let remaining = entries.len();
        if group1.len() + remaining == MIN_ENTRIES {
            group1.append(&mut entries);
            break;
        }
        if group2.len() + remaining == MIN_ENTRIES {
            group2.append(&mut entries);
            break;
        }
        // next: the entry with the strongest preference for one group
        let (mut next, mut best_diff) = (0, f64::NEG_INFINITY);
        for (k, (b, _)) in entries.iter().enumerate() {
            let diff = (enlargement(&box1, b) - enlargement(&box2, b)).abs();
            if diff > best_diff {
                (next, best_diff) = (k, diff);
            }
        }
        let entry = entries.swap_remove(next);
        let (d1, d2) = (enlargement(&box1, &entry.0), enlargement(&box2, &entry.0));
        let to_first = d1 < d2
            || (d1 == d2 && (box1.measure() < box2.measure() || (box1.measure() == box2.measure() && group1.len() <= group2.len())));
        if to_first {
            box1 = box1.union(&entry.0);
            group1.push(entry);
        } else {
            box2 = box2.union(&entry.0);
            group2.push(entry);
        }
    }
    (group1, group2)
}

/// R-tree mapping boxes to caller-chosen identifiers.
#[derive(Debug, Clone)]
pub struct RTree<B> {
    root: Node<B>,
    len: usize,
}

impl<B: RTreeBox> Default for RTree<B> {
    fn default() -> Self {
        RTree::new()
    }
}

impl<B: RTreeBox> RTree<B> {
    pub fn new() -> Self {
        RTree { root: Node::Leaf(vec![]), len: 0 }
    }

    pub fn len(&self) -> usize {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    pub fn insert(&mut self, bbox: B, id: usize) {
        self.len += 1;
        if let Some(sibling) = self.root.insert(bbox, id) {
            let old = std::mem::replace(&mut self.root, Node::Leaf(vec![]));
            let mut children = vec![];
            for node in [old, sibling] {
                if let Some(b) = node.bbox() {
                    children.push((b, node));
                }
            }
            self.root = Node::Inner(children);
        }
    }

    /// Identifiers of the boxes overlapping the query, in no particular
    /// order.
    pub fn search(&self, query: &B) -> Vec<usize> {
        let mut out = vec![];
        if self.root.len() > 0 {
            self.root.search(query, &mut out);
        }
        out
    }
}
