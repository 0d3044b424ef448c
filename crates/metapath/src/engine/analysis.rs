//! Static result types of expression trees.
//!
//! The [`Analyzer`] walks a tree bottom-up and asks a rule table, keyed by expression tag, for
//! the type of each node given the types of its children. The types are descriptive only; the
//! evaluator never consults them.

use std::collections::HashMap;

use crate::engine::functions::{ItemType, SequenceType};
use crate::parser::ast::{Expr, ExprKind};
use crate::xdm::AtomicType;

/// Computes a node's static type from the node and its children's static types.
pub type TypeRule<N> = fn(&Expr<N>, &[SequenceType]) -> SequenceType;

const ANY: SequenceType = SequenceType::zero_or_more(ItemType::Item);
const NODES: SequenceType = SequenceType::zero_or_more(ItemType::Node);
const BOOLEAN: SequenceType = SequenceType::one(ItemType::Atomic(AtomicType::Boolean));

fn is_numeric(item: ItemType) -> bool {
    match item {
        ItemType::Numeric => true,
        ItemType::Atomic(t) => t.is_numeric(),
        _ => false,
    }
}

fn literal<N>(expr: &Expr<N>, _: &[SequenceType]) -> SequenceType {
    let t = match expr {
        Expr::IntegerLiteral(_) => AtomicType::Integer,
        Expr::DecimalLiteral(_) => AtomicType::Decimal,
        _ => AtomicType::String,
    };
    SequenceType::one(ItemType::Atomic(t))
}

fn sequence<N>(_: &Expr<N>, children: &[SequenceType]) -> SequenceType {
    match children.split_first() {
        Some((first, rest)) if rest.iter().all(|c| c.item == first.item) => SequenceType::zero_or_more(first.item),
        _ => ANY,
    }
}

fn path<N>(_: &Expr<N>, children: &[SequenceType]) -> SequenceType {
    children.last().map_or(NODES, |last| SequenceType::zero_or_more(last.item))
}

fn filtered<N>(_: &Expr<N>, children: &[SequenceType]) -> SequenceType {
    children.first().map_or(ANY, |base| SequenceType::zero_or_more(base.item))
}

fn arithmetic<N>(_: &Expr<N>, children: &[SequenceType]) -> SequenceType {
    if children.iter().all(|c| is_numeric(c.item)) {
        SequenceType::optional(ItemType::Numeric)
    } else {
        SequenceType::optional(ItemType::AnyAtomic)
    }
}

fn negate<N>(_: &Expr<N>, children: &[SequenceType]) -> SequenceType {
    children.first().map_or(ANY, |c| SequenceType::optional(c.item))
}

fn let_body<N>(_: &Expr<N>, children: &[SequenceType]) -> SequenceType {
    children.get(1).copied().unwrap_or(ANY)
}

fn function_call<N>(expr: &Expr<N>, _: &[SequenceType]) -> SequenceType {
    match expr {
        Expr::FunctionCall { function, .. } => function.result_type(),
        _ => ANY,
    }
}

pub struct Analyzer<N> {
    rules: HashMap<ExprKind, TypeRule<N>>,
}

impl<N> Default for Analyzer<N> {
    fn default() -> Self {
        Self::new()
    }
}

impl<N> Analyzer<N> {
    pub fn new() -> Self {
        let mut rules: HashMap<ExprKind, TypeRule<N>> = HashMap::new();
        for kind in [ExprKind::StringLiteral, ExprKind::IntegerLiteral, ExprKind::DecimalLiteral] {
            rules.insert(kind, literal);
        }
        rules.insert(ExprKind::EmptySequence, |_, _| ANY);
        rules.insert(ExprKind::Sequence, sequence);
        rules.insert(ExprKind::ContextItem, |_, _| ANY);
        rules.insert(ExprKind::Root, |_, _| SequenceType::one(ItemType::Node));
        for kind in [
            ExprKind::RootSlash,
            ExprKind::RootDoubleSlash,
            ExprKind::RelativeSlash,
            ExprKind::RelativeDoubleSlash,
        ] {
            rules.insert(kind, path);
        }
        rules.insert(ExprKind::Step, |_, _| NODES);
        rules.insert(ExprKind::Predicate, filtered);
        for kind in [
            ExprKind::Addition,
            ExprKind::Subtraction,
            ExprKind::Multiplication,
            ExprKind::Division,
            ExprKind::IntegerDivision,
            ExprKind::Modulo,
        ] {
            rules.insert(kind, arithmetic);
        }
        rules.insert(ExprKind::Negate, negate);
        for kind in [ExprKind::And, ExprKind::Or, ExprKind::GeneralComparison] {
            rules.insert(kind, |_, _| BOOLEAN);
        }
        rules.insert(ExprKind::ValueComparison, |_, _| {
            SequenceType::optional(ItemType::Atomic(AtomicType::Boolean))
        });
        rules.insert(ExprKind::StringConcat, |_, _| SequenceType::one(ItemType::Atomic(AtomicType::String)));
        rules.insert(ExprKind::Union, |_, _| NODES);
        rules.insert(ExprKind::Let, let_body);
        rules.insert(ExprKind::VariableReference, |_, _| ANY);
        rules.insert(ExprKind::FunctionCall, function_call);
        Self { rules }
    }

    /// Replace the rule for one expression tag.
    pub fn with_rule(mut self, kind: ExprKind, rule: TypeRule<N>) -> Self {
        self.rules.insert(kind, rule);
        self
    }

    pub fn result_type(&self, expr: &Expr<N>) -> SequenceType {
        let children: Vec<SequenceType> = expr.children().into_iter().map(|c| self.result_type(c)).collect();
        self.rules.get(&expr.kind()).map_or(ANY, |rule| rule(expr, &children))
    }
}

/// Static result type of `expr` under the default rules.
pub fn static_result_type<N>(expr: &Expr<N>) -> SequenceType {
    Analyzer::new().result_type(expr)
}
