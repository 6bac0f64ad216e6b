//! Query execution: drive compiled patterns over a syntax tree.
//!
//! A [`QueryCursor`] walks the tree once in pre-order. At every node it
//! tries each pattern root; successful assignments become matches after
//! predicate filtering. Everything is deterministic: node order follows
//! the tree walk, and patterns apply in declaration order.

use std::collections::{HashSet, VecDeque};
use std::ops::Range;
use std::sync::Arc;

use cambium_core::grammar::FieldId;
use cambium_core::{Node, Point};
use regex_automata::Input;
use regex_automata::dfa::Automaton;

use crate::compile::{ChildStep, KindFilter, Matcher, Operand, Predicate, Quant, Query, Step};

/// Reusable execution state for running queries.
///
/// A cursor holds the optional filters (byte/point range, start depth,
/// match limit) and can be reused across queries and trees.
#[derive(Debug, Default)]
pub struct QueryCursor {
    byte_range: Option<Range<usize>>,
    point_range: Option<Range<Point>>,
    max_start_depth: Option<u32>,
    match_limit: Option<u32>,
    exceeded: bool,
}

impl QueryCursor {
    pub fn new() -> QueryCursor {
        QueryCursor::default()
    }

    /// Only consider matches whose anchor node intersects this byte range.
    pub fn set_byte_range(&mut self, range: Range<usize>) -> &mut Self {
        self.byte_range = Some(range);
        self
    }

    /// Only consider matches whose anchor node intersects this point range.
    pub fn set_point_range(&mut self, range: Range<Point>) -> &mut Self {
        self.point_range = Some(range);
        self
    }

    /// Restrict how deep below the starting node pattern anchors may lie.
    /// `Some(0)` anchors patterns at the starting node only; `None` lifts
    /// the restriction.
    pub fn set_max_start_depth(&mut self, depth: Option<u32>) -> &mut Self {
        self.max_start_depth = depth;
        self
    }

    /// Cap the number of matches produced by one execution. When the cap
    /// is hit, iteration stops and [`did_exceed_match_limit`]
    /// (Self::did_exceed_match_limit) reports it.
    pub fn set_match_limit(&mut self, limit: u32) -> &mut Self {
        self.match_limit = Some(limit);
        self
    }

    pub fn match_limit(&self) -> Option<u32> {
        self.match_limit
    }

    /// Whether the previous execution stopped early at the match limit.
    pub fn did_exceed_match_limit(&self) -> bool {
        self.exceeded
    }

    /// Iterate full matches of every pattern in `query` within the
    /// subtree rooted at `node`.
    ///
    /// Matches appear in pre-order of their anchor node; at one node,
    /// pattern declaration order breaks the tie. If the tree was parsed
    /// with a different grammar than the query was compiled against, the
    /// iterator is empty.
    pub fn matches<'a, 'tree>(
        &'a mut self,
        query: &'a Query,
        node: Node<'tree>,
        source: &'a [u8],
    ) -> QueryMatches<'a, 'tree> {
        self.exceeded = false;
        let compatible = std::ptr::eq(node.grammar(), Arc::as_ptr(query.grammar()));
        QueryMatches {
            query,
            source,
            stack: if compatible { vec![(node, 0)] } else { Vec::new() },
            pending: VecDeque::new(),
            yielded: 0,
            done: !compatible,
            cursor: self,
        }
    }

    /// Iterate individual captures in discovery order.
    ///
    /// Yields `(match, capture_index)` pairs, flattening each match's
    /// captures as the tree walk finds them; matches that bind no
    /// captures are skipped. Resolve names via
    /// [`Query::capture_names`].
    pub fn captures<'a, 'tree>(
        &'a mut self,
        query: &'a Query,
        node: Node<'tree>,
        source: &'a [u8],
    ) -> QueryCaptures<'a, 'tree> {
        QueryCaptures {
            inner: self.matches(query, node, source),
            buffered: None,
            next_capture: 0,
        }
    }
}

/// One satisfied pattern instance.
#[derive(Debug, Clone)]
pub struct QueryMatch<'tree> {
    /// Index of the pattern within its document.
    pub pattern_index: usize,
    /// Captured nodes in discovery order. A capture name appears once
    /// per node it captured, so quantified captures repeat.
    pub captures: Vec<QueryCapture<'tree>>,
}

impl<'tree> QueryMatch<'tree> {
    /// All nodes a capture bound, in capture order.
    pub fn nodes_for_capture_index(&self, index: u32) -> impl Iterator<Item = Node<'tree>> + '_ {
        self.captures
            .iter()
            .filter(move |c| c.index == index)
            .map(|c| c.node)
    }
}

/// A single captured node.
#[derive(Debug, Clone, Copy)]
pub struct QueryCapture<'tree> {
    /// Index into [`Query::capture_names`].
    pub index: u32,
    pub node: Node<'tree>,
}

/// Lazy match iterator returned by [`QueryCursor::matches`].
pub struct QueryMatches<'a, 'tree> {
    cursor: &'a mut QueryCursor,
    query: &'a Query,
    source: &'a [u8],
    /// Pre-order DFS worklist of (node, depth below start).
    stack: Vec<(Node<'tree>, u32)>,
    /// Matches found at the current node, not yet handed out.
    pending: VecDeque<QueryMatch<'tree>>,
    yielded: u32,
    done: bool,
}

impl<'tree> Iterator for QueryMatches<'_, 'tree> {
    type Item = QueryMatch<'tree>;

    fn next(&mut self) -> Option<QueryMatch<'tree>> {
        loop {
            if self.done {
                return None;
            }

            if let Some(m) = self.pending.pop_front() {
                if let Some(limit) = self.cursor.match_limit {
                    if self.yielded >= limit {
                        self.cursor.exceeded = true;
                        self.done = true;
                        return None;
                    }
                }
                self.yielded += 1;
                return Some(m);
            }

            let Some((node, depth)) = self.stack.pop() else {
                self.done = true;
                return None;
            };

            // Children are contained in the parent's span, so a node
            // outside the filter range prunes its whole subtree.
            if !in_byte_range(&self.cursor.byte_range, &node)
                || !in_point_range(&self.cursor.point_range, &node)
            {
                continue;
            }

            collect_matches_at(self.query, self.source, node, &mut self.pending);

            if self.cursor.max_start_depth.map_or(true, |max| depth < max) {
                push_children(&mut self.stack, node, depth);
            }
        }
    }
}

/// Lazy capture iterator returned by [`QueryCursor::captures`].
pub struct QueryCaptures<'a, 'tree> {
    inner: QueryMatches<'a, 'tree>,
    buffered: Option<QueryMatch<'tree>>,
    next_capture: usize,
}

impl<'tree> Iterator for QueryCaptures<'_, 'tree> {
    type Item = (QueryMatch<'tree>, usize);

    fn next(&mut self) -> Option<(QueryMatch<'tree>, usize)> {
        loop {
            if let Some(m) = &self.buffered {
                if self.next_capture < m.captures.len() {
                    let index = self.next_capture;
                    self.next_capture += 1;
                    return Some((m.clone(), index));
                }
                self.buffered = None;
            }

            let m = self.inner.next()?;
            if m.captures.is_empty() {
                continue;
            }
            self.buffered = Some(m);
            self.next_capture = 0;
        }
    }
}

// ==== per-node matching ====

type Caps<'tree> = Vec<(u16, Node<'tree>)>;

fn collect_matches_at<'tree>(
    query: &Query,
    source: &[u8],
    node: Node<'tree>,
    pending: &mut VecDeque<QueryMatch<'tree>>,
) {
    for (pattern_index, pattern) in query.patterns.iter().enumerate() {
        let assignments = step_assignments(&pattern.root, node);
        if assignments.is_empty() {
            continue;
        }

        // Quantifiers can reach the same capture set along different
        // paths; only the first of each distinct assignment survives.
        let mut seen: HashSet<Vec<(u16, usize, usize)>> = HashSet::new();
        for caps in assignments {
            let key: Vec<(u16, usize, usize)> = caps
                .iter()
                .map(|(index, n)| (*index, n.id(), n.start_byte()))
                .collect();
            if !seen.insert(key) {
                continue;
            }
            if !predicates_hold(&pattern.predicates, &caps, source) {
                continue;
            }
            pending.push_back(QueryMatch {
                pattern_index,
                captures: caps
                    .into_iter()
                    .map(|(index, node)| QueryCapture {
                        index: u32::from(index),
                        node,
                    })
                    .collect(),
            });
        }
    }
}

fn push_children<'tree>(stack: &mut Vec<(Node<'tree>, u32)>, node: Node<'tree>, depth: u32) {
    let mut cursor = node.walk();
    if cursor.goto_first_child() {
        let lower = stack.len();
        loop {
            stack.push((cursor.node(), depth + 1));
            if !cursor.goto_next_sibling() {
                break;
            }
        }
        // Popped left to right.
        stack[lower..].reverse();
    }
}

fn in_byte_range(filter: &Option<Range<usize>>, node: &Node) -> bool {
    let Some(range) = filter else { return true };
    let (start, end) = (node.start_byte(), node.end_byte());
    if start == end {
        // Zero-width nodes count when they touch the range.
        return range.start <= start && start <= range.end;
    }
    start < range.end && end > range.start
}

fn in_point_range(filter: &Option<Range<Point>>, node: &Node) -> bool {
    let Some(range) = filter else { return true };
    let (start, end) = (node.start_position(), node.end_position());
    if start == end {
        return range.start <= start && start <= range.end;
    }
    start < range.end && end > range.start
}

// ==== pattern matching ====

/// A visible child plus the facts matching cares about.
struct Kid<'tree> {
    node: Node<'tree>,
    field: Option<FieldId>,
    /// Named and not an extra. Anchors and repetition stops only count
    /// these; extras and anonymous tokens never break adjacency.
    salient: bool,
}

fn collect_children<'tree>(node: &Node<'tree>) -> Vec<Kid<'tree>> {
    let mut kids = Vec::new();
    let mut cursor = node.walk();
    if cursor.goto_first_child() {
        loop {
            let child = cursor.node();
            kids.push(Kid {
                node: child,
                field: cursor.field_id(),
                salient: child.is_named() && !child.is_extra(),
            });
            if !cursor.goto_next_sibling() {
                break;
            }
        }
    }
    kids
}

fn kind_allows(filter: KindFilter, node: &Node) -> bool {
    match filter {
        KindFilter::Kind(symbol) => node.kind_id() == symbol,
        KindFilter::AnyNamed => node.is_named(),
        KindFilter::Any => true,
    }
}

/// Enumerate the ways `step` can match at `node`. Each way is the list of
/// captures it binds, in discovery order (children before the node's own
/// captures).
fn step_assignments<'tree>(step: &Step, node: Node<'tree>) -> Vec<Caps<'tree>> {
    let mut results = match &step.matcher {
        Matcher::Node {
            filter,
            children,
            negated,
            trailing_anchor,
        } => {
            if !kind_allows(*filter, &node) {
                return Vec::new();
            }
            if negated
                .iter()
                .any(|field| node.child_by_field_id(*field).is_some())
            {
                return Vec::new();
            }
            if children.is_empty() && !*trailing_anchor {
                vec![Vec::new()]
            } else {
                let kids = collect_children(&node);
                let ctx = EntryCtx {
                    entries: children,
                    kids: &kids,
                    trailing_anchor: *trailing_anchor,
                };
                let mut out = Vec::new();
                let mut caps = Vec::new();
                match_entries(&ctx, 0, 0, false, &mut caps, &mut out);
                out
            }
        }
        Matcher::Alt(branches) => {
            let mut all = Vec::new();
            for branch in branches {
                all.extend(step_assignments(branch, node));
            }
            all
        }
        Matcher::Siblings {
            entries,
            trailing_anchor,
        } => siblings_assignments(entries, node, *trailing_anchor),
    };

    if !step.captures.is_empty() {
        for caps in &mut results {
            for &index in &step.captures {
                caps.push((index, node));
            }
        }
    }
    results
}

/// A group pattern matches a run of adjacent siblings starting at `node`.
fn siblings_assignments<'tree>(
    entries: &[ChildStep],
    node: Node<'tree>,
    trailing_anchor: bool,
) -> Vec<Caps<'tree>> {
    let mut out = Vec::new();
    let mut caps = Vec::new();
    match node.parent() {
        Some(parent) => {
            let kids = collect_children(&parent);
            let Some(start) = kids.iter().position(|k| k.node == node) else {
                return out;
            };
            let ctx = EntryCtx {
                entries,
                kids: &kids,
                trailing_anchor,
            };
            match_entries(&ctx, 0, start, true, &mut caps, &mut out);
        }
        None => {
            // The root has no siblings; the run is the node alone.
            let kids = [Kid {
                node,
                field: None,
                salient: node.is_named() && !node.is_extra(),
            }];
            let ctx = EntryCtx {
                entries,
                kids: &kids,
                trailing_anchor,
            };
            match_entries(&ctx, 0, 0, true, &mut caps, &mut out);
        }
    }
    out
}

struct EntryCtx<'p, 'tree> {
    entries: &'p [ChildStep],
    kids: &'p [Kid<'tree>],
    trailing_anchor: bool,
}

/// Match `entries[entry_idx..]` against `kids[from..]`, appending every
/// complete assignment to `out`.
///
/// `fixed` pins the next element to `kids[from]` exactly; it starts true
/// for sibling runs (which begin at a given node) and clears after the
/// first element.
fn match_entries<'tree>(
    ctx: &EntryCtx<'_, 'tree>,
    entry_idx: usize,
    from: usize,
    fixed: bool,
    caps: &mut Caps<'tree>,
    out: &mut Vec<Caps<'tree>>,
) {
    if entry_idx == ctx.entries.len() {
        if ctx.trailing_anchor && ctx.kids[from..].iter().any(|k| k.salient) {
            return;
        }
        out.push(caps.clone());
        return;
    }

    match ctx.entries[entry_idx].step.quant {
        Quant::One => {
            try_single(ctx, entry_idx, from, fixed, caps, out);
        }
        Quant::ZeroOrOne => {
            try_single(ctx, entry_idx, from, fixed, caps, out);
            match_entries(ctx, entry_idx + 1, from, fixed, caps, out);
        }
        Quant::ZeroOrMore => {
            try_repeat(ctx, entry_idx, from, fixed, caps, out);
            match_entries(ctx, entry_idx + 1, from, fixed, caps, out);
        }
        Quant::OneOrMore => {
            try_repeat(ctx, entry_idx, from, fixed, caps, out);
        }
    }
}

/// One occurrence: scan for a kid the entry matches, then continue with
/// the rest. Without an anchor the scan skips freely; an anchor stops it
/// at the first salient kid, and `fixed` pins it to `kids[from]`.
fn try_single<'tree>(
    ctx: &EntryCtx<'_, 'tree>,
    entry_idx: usize,
    from: usize,
    fixed: bool,
    caps: &mut Caps<'tree>,
    out: &mut Vec<Caps<'tree>>,
) {
    let entry = &ctx.entries[entry_idx];
    let mut k = from;
    while k < ctx.kids.len() {
        let kid = &ctx.kids[k];
        if field_allows(entry, kid) {
            for sub in step_assignments(&entry.step, kid.node) {
                let len = caps.len();
                caps.extend(sub);
                match_entries(ctx, entry_idx + 1, k + 1, false, caps, out);
                caps.truncate(len);
            }
        }
        if fixed {
            break;
        }
        if entry.anchor_before && kid.salient {
            break;
        }
        k += 1;
    }
}

/// Greedy repetition: absorb matching kids left to right, skipping
/// non-salient ones, and stop at the first salient kid that does not
/// match. Each absorbed kid contributes its first assignment.
fn try_repeat<'tree>(
    ctx: &EntryCtx<'_, 'tree>,
    entry_idx: usize,
    from: usize,
    fixed: bool,
    caps: &mut Caps<'tree>,
    out: &mut Vec<Caps<'tree>>,
) {
    let entry = &ctx.entries[entry_idx];
    let len = caps.len();
    let mut k = from;
    let mut absorbed = false;

    while k < ctx.kids.len() {
        let kid = &ctx.kids[k];
        let sub = if field_allows(entry, kid) {
            step_assignments(&entry.step, kid.node).into_iter().next()
        } else {
            None
        };
        match sub {
            Some(sub) => {
                caps.extend(sub);
                absorbed = true;
                k += 1;
            }
            None => {
                if !absorbed && fixed {
                    break;
                }
                if kid.salient && (absorbed || entry.anchor_before) {
                    break;
                }
                k += 1;
            }
        }
    }

    if absorbed {
        match_entries(ctx, entry_idx + 1, k, false, caps, out);
    }
    caps.truncate(len);
}

fn field_allows(entry: &ChildStep, kid: &Kid) -> bool {
    match entry.field {
        Some(field) => kid.field == Some(field),
        None => true,
    }
}

// ==== predicates ====

fn predicates_hold(predicates: &[Predicate], caps: &[(u16, Node)], source: &[u8]) -> bool {
    predicates
        .iter()
        .all(|pred| predicate_holds(pred, caps, source))
}

/// Raw byte slices of every node a capture bound, in capture order.
fn texts_for<'a>(caps: &[(u16, Node)], capture: u16, source: &'a [u8]) -> Vec<&'a [u8]> {
    caps.iter()
        .filter(|(index, _)| *index == capture)
        .map(|(_, node)| {
            source
                .get(node.start_byte()..node.end_byte())
                .unwrap_or(&[])
        })
        .collect()
}

/// Predicates hold vacuously over zero captured nodes.
fn predicate_holds(pred: &Predicate, caps: &[(u16, Node)], source: &[u8]) -> bool {
    match pred {
        Predicate::TextEq {
            capture,
            negated,
            operand,
        } => {
            let texts = texts_for(caps, *capture, source);
            match operand {
                Operand::Literal(value) => {
                    if *negated {
                        texts.iter().all(|t| *t != value.as_bytes())
                    } else {
                        texts.iter().all(|t| *t == value.as_bytes())
                    }
                }
                Operand::Capture(other) => {
                    let other_texts = texts_for(caps, *other, source);
                    if *negated {
                        texts != other_texts
                    } else {
                        texts == other_texts
                    }
                }
            }
        }
        Predicate::Match {
            capture,
            negated,
            dfa,
        } => {
            let texts = texts_for(caps, *capture, source);
            if *negated {
                !texts
                    .iter()
                    .any(|t| dfa.try_search_fwd(&Input::new(*t)).ok().flatten().is_some())
            } else {
                texts
                    .iter()
                    .all(|t| dfa.try_search_fwd(&Input::new(*t)).ok().flatten().is_some())
            }
        }
        Predicate::AnyOf {
            capture,
            negated,
            values,
        } => {
            let texts = texts_for(caps, *capture, source);
            if *negated {
                !texts
                    .iter()
                    .any(|t| values.iter().any(|v| v.as_bytes() == *t))
            } else {
                texts
                    .iter()
                    .all(|t| values.iter().any(|v| v.as_bytes() == *t))
            }
        }
    }
}
