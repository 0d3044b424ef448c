//! Axis navigation and node tests.

use smallvec::SmallVec;
use std::collections::HashSet;

use crate::model::MetapathNode;
use crate::parser::ast::{Axis, NodeTest};
use crate::xdm::Item;

pub(super) fn matches_test<N: MetapathNode>(node: &N, test: &NodeTest) -> bool {
    match test {
        NodeTest::Wildcard => true,
        NodeTest::Local(local) => node.name().is_some_and(|n| n.local == *local),
        NodeTest::Name(expected) => node.name().as_ref() == Some(expected),
    }
}

/// Nodes reached from `node` along `axis`, in axis order.
pub(super) fn axis_nodes<N: MetapathNode>(node: &N, axis: Axis) -> Vec<N> {
    match axis {
        Axis::SelfAxis => vec![node.clone()],
        Axis::Child => node.model_children(),
        Axis::Flag => node.flags(),
        Axis::Descendant => descendants(node, false),
        Axis::DescendantOrSelf => descendants(node, true),
        Axis::Parent => node.parent().into_iter().collect(),
        Axis::Ancestor => ancestors(node, false),
        Axis::AncestorOrSelf => ancestors(node, true),
    }
}

fn push_children<N: MetapathNode>(stack: &mut SmallVec<[N; 16]>, node: &N) {
    let mut children: SmallVec<[N; 16]> = node.flags().into_iter().chain(node.model_children()).collect();
    children.reverse();
    stack.extend(children);
}

/// Depth-first pre-order walk over flags then model children. Cycle sentinels are reported
/// but never expanded.
fn descendants<N: MetapathNode>(node: &N, include_self: bool) -> Vec<N> {
    let mut out = Vec::new();
    if include_self {
        out.push(node.clone());
    }
    let mut stack: SmallVec<[N; 16]> = SmallVec::new();
    push_children(&mut stack, node);
    while let Some(next) = stack.pop() {
        if !next.is_cycle_sentinel() {
            push_children(&mut stack, &next);
        }
        out.push(next);
    }
    out
}

/// Focus of the step following `//`: the node and its descendants without the cycle
/// sentinels, so the next step never walks into a sentinel.
pub(super) fn descendant_search_focus<N: MetapathNode>(node: &N) -> Vec<N> {
    let mut out = descendants(node, true);
    out.retain(|n| n == node || !n.is_cycle_sentinel());
    out
}

fn ancestors<N: MetapathNode>(node: &N, include_self: bool) -> Vec<N> {
    let mut out = Vec::new();
    if include_self {
        out.push(node.clone());
    }
    let mut cur = node.parent();
    while let Some(p) = cur {
        cur = p.parent();
        out.push(p);
    }
    out
}

/// Drop repeated nodes, keeping the first occurrence. Atomic items pass through untouched.
pub(super) fn distinct_nodes<N: MetapathNode>(items: impl IntoIterator<Item = Item<N>>) -> Vec<Item<N>> {
    let mut seen: HashSet<N> = HashSet::new();
    items
        .into_iter()
        .filter(|item| match item {
            Item::Node(n) => seen.insert(n.clone()),
            Item::Atomic(_) => true,
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::simple::{SimpleNode, assembly, doc, field, flag};
    use crate::xdm::AtomicItem;
    use rstest::rstest;

    fn names(nodes: &[SimpleNode]) -> Vec<String> {
        nodes.iter().map(|n| n.name().map(|q| q.local).unwrap_or_else(|| "#doc".into())).collect()
    }

    fn tree() -> SimpleNode {
        doc()
            .child(
                assembly("catalog")
                    .flag(flag("id", AtomicItem::string("c1")))
                    .child(assembly("group").child(field("title", AtomicItem::string("a"))))
                    .child(assembly("group").cycle_sentinel().child(field("title", AtomicItem::string("b")))),
            )
            .build()
    }

    #[rstest]
    fn descendant_or_self_visits_flags_first_and_stops_at_sentinels() {
        let d = tree();
        let all = axis_nodes(&d, Axis::DescendantOrSelf);
        assert_eq!(names(&all), ["#doc", "catalog", "id", "group", "title", "group"]);
    }

    #[rstest]
    fn search_focus_leaves_out_sentinels_below_the_start() {
        let d = tree();
        assert_eq!(names(&descendant_search_focus(&d)), ["#doc", "catalog", "id", "group", "title"]);
        // a search that starts at a sentinel still looks inside it
        let sentinel = axis_nodes(&d, Axis::Descendant).into_iter().find(|n| n.is_cycle_sentinel()).unwrap();
        assert_eq!(names(&descendant_search_focus(&sentinel)), ["group", "title"]);
    }

    #[rstest]
    fn ancestors_walk_to_the_document() {
        let d = tree();
        let title = axis_nodes(&d, Axis::Descendant).into_iter().find(|n| matches_test(n, &NodeTest::Local("title".into())));
        let title = title.unwrap();
        assert_eq!(names(&axis_nodes(&title, Axis::Ancestor)), ["group", "catalog", "#doc"]);
        assert_eq!(names(&axis_nodes(&title, Axis::AncestorOrSelf))[0], "title");
    }

    #[rstest]
    fn distinct_keeps_first_occurrence() {
        let d = tree();
        let items = vec![Item::Node(d.clone()), Item::Atomic(AtomicItem::Integer(1)), Item::Node(d)];
        assert_eq!(distinct_nodes(items).len(), 2);
    }
}
