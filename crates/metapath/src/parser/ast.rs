use crate::engine::functions::Function;
use crate::xdm::ExpandedName;
use rust_decimal::Decimal;
use std::sync::Arc;

/// Compiled expression tree. Function calls are bound to their implementation at compile time.
#[derive(Debug, Clone)]
pub enum Expr<N> {
    StringLiteral(String),
    IntegerLiteral(i64),
    DecimalLiteral(Decimal),
    EmptySequence,
    /// Comma-separated sequence construction.
    Sequence(Vec<Expr<N>>),
    ContextItem,

    /// `/` on its own.
    Root,
    /// `/step...`
    RootSlash(Box<Expr<N>>),
    /// `//step...`
    RootDoubleSlash(Box<Expr<N>>),
    RelativeSlash(Box<Expr<N>>, Box<Expr<N>>),
    RelativeDoubleSlash(Box<Expr<N>>, Box<Expr<N>>),
    Step { axis: Axis, test: NodeTest },
    Predicate { base: Box<Expr<N>>, predicates: Vec<Expr<N>> },

    Addition(Box<Expr<N>>, Box<Expr<N>>),
    Subtraction(Box<Expr<N>>, Box<Expr<N>>),
    Multiplication(Box<Expr<N>>, Box<Expr<N>>),
    Division(Box<Expr<N>>, Box<Expr<N>>),
    IntegerDivision(Box<Expr<N>>, Box<Expr<N>>),
    Modulo(Box<Expr<N>>, Box<Expr<N>>),
    Negate(Box<Expr<N>>),

    And(Vec<Expr<N>>),
    Or(Vec<Expr<N>>),
    StringConcat(Vec<Expr<N>>),
    Union(Vec<Expr<N>>),

    ValueComparison { left: Box<Expr<N>>, op: ComparisonOperator, right: Box<Expr<N>> },
    GeneralComparison { left: Box<Expr<N>>, op: ComparisonOperator, right: Box<Expr<N>> },

    Let { name: ExpandedName, bound: Box<Expr<N>>, body: Box<Expr<N>> },
    VariableReference(ExpandedName),
    FunctionCall { function: Arc<Function<N>>, args: Vec<Expr<N>> },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Axis {
    SelfAxis,
    Child,
    Flag,
    Descendant,
    DescendantOrSelf,
    Parent,
    Ancestor,
    AncestorOrSelf,
}

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum NodeTest {
    Wildcard,
    /// Unprefixed names match on the local name alone.
    Local(String),
    Name(ExpandedName),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ComparisonOperator {
    Eq,
    Ne,
    Lt,
    Le,
    Gt,
    Ge,
}

impl ComparisonOperator {
    pub fn symbol(&self) -> &'static str {
        match self {
            ComparisonOperator::Eq => "=",
            ComparisonOperator::Ne => "!=",
            ComparisonOperator::Lt => "<",
            ComparisonOperator::Le => "<=",
            ComparisonOperator::Gt => ">",
            ComparisonOperator::Ge => ">=",
        }
    }
}

/// Variant tag of [`Expr`], used to key analysis tables.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ExprKind {
    StringLiteral,
    IntegerLiteral,
    DecimalLiteral,
    EmptySequence,
    Sequence,
    ContextItem,
    Root,
    RootSlash,
    RootDoubleSlash,
    RelativeSlash,
    RelativeDoubleSlash,
    Step,
    Predicate,
    Addition,
    Subtraction,
    Multiplication,
    Division,
    IntegerDivision,
    Modulo,
    Negate,
    And,
    Or,
    StringConcat,
    Union,
    ValueComparison,
    GeneralComparison,
    Let,
    VariableReference,
    FunctionCall,
}

impl<N> Expr<N> {
    pub fn kind(&self) -> ExprKind {
        match self {
            Expr::StringLiteral(_) => ExprKind::StringLiteral,
            Expr::IntegerLiteral(_) => ExprKind::IntegerLiteral,
            Expr::DecimalLiteral(_) => ExprKind::DecimalLiteral,
            Expr::EmptySequence => ExprKind::EmptySequence,
            Expr::Sequence(_) => ExprKind::Sequence,
            Expr::ContextItem => ExprKind::ContextItem,
            Expr::Root => ExprKind::Root,
            Expr::RootSlash(_) => ExprKind::RootSlash,
            Expr::RootDoubleSlash(_) => ExprKind::RootDoubleSlash,
            Expr::RelativeSlash(..) => ExprKind::RelativeSlash,
            Expr::RelativeDoubleSlash(..) => ExprKind::RelativeDoubleSlash,
            Expr::Step { .. } => ExprKind::Step,
            Expr::Predicate { .. } => ExprKind::Predicate,
            Expr::Addition(..) => ExprKind::Addition,
            Expr::Subtraction(..) => ExprKind::Subtraction,
            Expr::Multiplication(..) => ExprKind::Multiplication,
            Expr::Division(..) => ExprKind::Division,
            Expr::IntegerDivision(..) => ExprKind::IntegerDivision,
            Expr::Modulo(..) => ExprKind::Modulo,
            Expr::Negate(_) => ExprKind::Negate,
            Expr::And(_) => ExprKind::And,
            Expr::Or(_) => ExprKind::Or,
            Expr::StringConcat(_) => ExprKind::StringConcat,
            Expr::Union(_) => ExprKind::Union,
            Expr::ValueComparison { .. } => ExprKind::ValueComparison,
            Expr::GeneralComparison { .. } => ExprKind::GeneralComparison,
            Expr::Let { .. } => ExprKind::Let,
            Expr::VariableReference(_) => ExprKind::VariableReference,
            Expr::FunctionCall { .. } => ExprKind::FunctionCall,
        }
    }

    /// Direct child expressions in evaluation order.
    pub fn children(&self) -> Vec<&Expr<N>> {
        match self {
            Expr::StringLiteral(_)
            | Expr::IntegerLiteral(_)
            | Expr::DecimalLiteral(_)
            | Expr::EmptySequence
            | Expr::ContextItem
            | Expr::Root
            | Expr::Step { .. }
            | Expr::VariableReference(_) => Vec::new(),
            Expr::RootSlash(e) | Expr::RootDoubleSlash(e) | Expr::Negate(e) => vec![e.as_ref()],
            Expr::RelativeSlash(l, r)
            | Expr::RelativeDoubleSlash(l, r)
            | Expr::Addition(l, r)
            | Expr::Subtraction(l, r)
            | Expr::Multiplication(l, r)
            | Expr::Division(l, r)
            | Expr::IntegerDivision(l, r)
            | Expr::Modulo(l, r)
            | Expr::ValueComparison { left: l, right: r, .. }
            | Expr::GeneralComparison { left: l, right: r, .. } => vec![l.as_ref(), r.as_ref()],
            Expr::Sequence(v)
            | Expr::And(v)
            | Expr::Or(v)
            | Expr::StringConcat(v)
            | Expr::Union(v)
            | Expr::FunctionCall { args: v, .. } => v.iter().collect(),
            Expr::Predicate { base, predicates } => {
                std::iter::once(base.as_ref()).chain(predicates.iter()).collect()
            }
            Expr::Let { bound, body, .. } => vec![bound.as_ref(), body.as_ref()],
        }
    }

    /// Whether the expression navigates from its focus node by node (steps and paths built
    /// from them).
    pub fn is_step_like(&self) -> bool {
        match self {
            Expr::Step { .. } => true,
            Expr::Predicate { base, .. } => base.is_step_like(),
            Expr::RelativeSlash(l, _) | Expr::RelativeDoubleSlash(l, _) => l.is_step_like(),
            _ => false,
        }
    }
}
