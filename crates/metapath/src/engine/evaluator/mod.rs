//! Tree-walking evaluator.
//!
//! Every expression node evaluates against a dynamic context and a focus sequence and yields a
//! new sequence. Paths feed the result of their left side to the right side as its focus; a
//! predicate or a non-step right side sees one item at a time together with its position.

mod axes;

use rust_decimal::Decimal;

use crate::engine::context::{DynamicContext, Feature};
use crate::engine::error::{Error, ErrorCode};
use crate::engine::functions::arithmetic::{ArithmeticOp, arithmetic, negate};
use crate::engine::functions::common::{atomize_all, boolean, ebv, integer, string};
use crate::engine::functions::comparison::{general_compare, value_compare};
use crate::model::{MetapathNode, NodeKind};
use crate::parser::ast::{Axis, Expr, NodeTest};
use crate::xdm::{AtomicItem, Item, Sequence};

/// Evaluate `expr` with `focus` as the items currently in scope.
pub fn evaluate<N: MetapathNode>(
    expr: &Expr<N>,
    ctx: &DynamicContext<N>,
    focus: &Sequence<N>,
) -> Result<Sequence<N>, Error> {
    match expr {
        Expr::StringLiteral(s) => Ok(string(s.clone())),
        Expr::IntegerLiteral(i) => Ok(integer(*i)),
        Expr::DecimalLiteral(d) => Ok(Sequence::from(AtomicItem::Decimal(*d))),
        Expr::EmptySequence => Ok(Sequence::empty()),
        Expr::Sequence(parts) => {
            let mut out = Vec::new();
            for part in parts {
                out.extend(evaluate(part, ctx, focus)?.stream());
            }
            Ok(Sequence::from_vec(out))
        }
        Expr::ContextItem => Ok(focus.clone()),

        Expr::Root => root_of(focus),
        Expr::RootSlash(relative) => {
            let root = root_of(focus)?;
            path_step(relative, ctx, &root)
        }
        Expr::RootDoubleSlash(relative) => {
            let root = root_of(focus)?;
            path_step(relative, ctx, &descendant_or_self(&root)?)
        }
        Expr::RelativeSlash(left, right) => {
            let left = evaluate(left, ctx, focus)?;
            path_step(right, ctx, &left)
        }
        Expr::RelativeDoubleSlash(left, right) => {
            let left = evaluate(left, ctx, focus)?;
            path_step(right, ctx, &descendant_or_self(&left)?)
        }
        Expr::Step { axis, test } => step(*axis, test, focus),
        Expr::Predicate { base, predicates } => {
            let base = evaluate(base, ctx, focus)?;
            filter(base, predicates, ctx)
        }

        Expr::Addition(l, r) => binary_arithmetic(ArithmeticOp::Add, l, r, ctx, focus),
        Expr::Subtraction(l, r) => binary_arithmetic(ArithmeticOp::Subtract, l, r, ctx, focus),
        Expr::Multiplication(l, r) => binary_arithmetic(ArithmeticOp::Multiply, l, r, ctx, focus),
        Expr::Division(l, r) => binary_arithmetic(ArithmeticOp::Divide, l, r, ctx, focus),
        Expr::IntegerDivision(l, r) => binary_arithmetic(ArithmeticOp::IntegerDivide, l, r, ctx, focus),
        Expr::Modulo(l, r) => binary_arithmetic(ArithmeticOp::Mod, l, r, ctx, focus),
        Expr::Negate(operand) => {
            let value = evaluate(operand, ctx, focus)?;
            match optional_atomic(&value, "-")? {
                Some(v) => Ok(Sequence::from(negate(&v)?)),
                None => Ok(Sequence::empty()),
            }
        }

        Expr::And(operands) => {
            for operand in operands {
                if !ebv(&evaluate(operand, ctx, focus)?)? {
                    return Ok(boolean(false));
                }
            }
            Ok(boolean(true))
        }
        Expr::Or(operands) => {
            for operand in operands {
                if ebv(&evaluate(operand, ctx, focus)?)? {
                    return Ok(boolean(true));
                }
            }
            Ok(boolean(false))
        }
        Expr::StringConcat(operands) => {
            let mut out = String::new();
            for operand in operands {
                let value = evaluate(operand, ctx, focus)?;
                if let Some(v) = optional_atomic(&value, "||")? {
                    out.push_str(&v.string_value());
                }
            }
            Ok(string(out))
        }
        Expr::Union(operands) => {
            let mut out = Vec::new();
            for operand in operands {
                let value = evaluate(operand, ctx, focus)?;
                if let Some(item) = value.iter().find(|i| !i.is_node()) {
                    return Err(Error::dynamic(
                        ErrorCode::MPTY0004,
                        format!("union operands must be nodes, got {}", item.type_label()),
                    ));
                }
                out.extend(value.stream());
            }
            Ok(Sequence::from_vec(axes::distinct_nodes(out)))
        }

        Expr::ValueComparison { left, op, right } => {
            let l = evaluate(left, ctx, focus)?;
            let r = evaluate(right, ctx, focus)?;
            let (Some(l), Some(r)) = (optional_atomic(&l, op.symbol())?, optional_atomic(&r, op.symbol())?) else {
                return Ok(Sequence::empty());
            };
            Ok(boolean(value_compare(&l, *op, &r, ctx.implicit_timezone())?))
        }
        Expr::GeneralComparison { left, op, right } => {
            let l = atomize_all(&evaluate(left, ctx, focus)?)?;
            let r = atomize_all(&evaluate(right, ctx, focus)?)?;
            Ok(boolean(general_compare(&l, *op, &r, ctx.implicit_timezone())?))
        }

        Expr::Let { name, bound, body } => {
            let value = evaluate(bound, ctx, focus)?;
            let mut scope = ctx.sub_context();
            scope.bind_variable(name.clone(), value);
            evaluate(body, &scope, focus)
        }
        Expr::VariableReference(name) => ctx.variable(name),
        Expr::FunctionCall { function, args } => {
            let args = args.iter().map(|a| evaluate(a, ctx, focus)).collect::<Result<Vec<_>, _>>()?;
            function.execute(ctx, focus, args)
        }
    }
}

fn focus_node<N: MetapathNode>(item: &Item<N>) -> Result<&N, Error> {
    item.as_node().ok_or_else(|| {
        Error::dynamic(ErrorCode::MPTY0020, format!("the context item is not a node: {}", item.type_label()))
    })
}

/// The document node owning each focus node.
fn root_of<N: MetapathNode>(focus: &Sequence<N>) -> Result<Sequence<N>, Error> {
    if focus.is_empty() {
        return Err(Error::dynamic(ErrorCode::MPDY0002, "a rooted path requires a context item"));
    }
    let mut roots = Vec::with_capacity(focus.len());
    for item in focus {
        let root = focus_node(item)?.root();
        if root.kind() != NodeKind::Document {
            return Err(Error::dynamic(
                ErrorCode::MPDY0050,
                format!("the root of the context node is a {} node, not a document", root.kind()),
            ));
        }
        roots.push(Item::Node(root));
    }
    Ok(Sequence::from_vec(axes::distinct_nodes(roots)))
}

fn descendant_or_self<N: MetapathNode>(focus: &Sequence<N>) -> Result<Sequence<N>, Error> {
    let mut out = Vec::new();
    for item in focus {
        out.extend(axes::descendant_search_focus(focus_node(item)?).into_iter().map(Item::Node));
    }
    Ok(Sequence::from_vec(axes::distinct_nodes(out)))
}

fn step<N: MetapathNode>(axis: Axis, test: &NodeTest, focus: &Sequence<N>) -> Result<Sequence<N>, Error> {
    let mut out = Vec::new();
    for item in focus {
        let node = focus_node(item)?;
        out.extend(axes::axis_nodes(node, axis).into_iter().filter(|n| axes::matches_test(n, test)).map(Item::Node));
    }
    Ok(Sequence::from_vec(axes::distinct_nodes(out)))
}

/// Right-hand side of `/`. Steps navigate from the whole left result at once; any other
/// expression runs once per left item with that item as its focus.
fn path_step<N: MetapathNode>(
    right: &Expr<N>,
    ctx: &DynamicContext<N>,
    left: &Sequence<N>,
) -> Result<Sequence<N>, Error> {
    if let Some(item) = left.iter().find(|i| !i.is_node()) {
        return Err(Error::dynamic(
            ErrorCode::MPTY0019,
            format!("the left side of a path must contain only nodes, got {}", item.type_label()),
        ));
    }
    if right.is_step_like() {
        return evaluate(right, ctx, left);
    }
    let size = left.len();
    let mut out = Vec::new();
    for (index, item) in left.iter().enumerate() {
        let inner = ctx.with_focus_position(index + 1, size);
        out.extend(evaluate(right, &inner, &Sequence::of(item.clone()))?.stream());
    }
    let nodes = out.iter().filter(|i| i.is_node()).count();
    if nodes == out.len() {
        Ok(Sequence::from_vec(axes::distinct_nodes(out)))
    } else if nodes == 0 {
        Ok(Sequence::from_vec(out))
    } else {
        Err(Error::dynamic(ErrorCode::MPTY0019, "a path step produced both nodes and atomic values"))
    }
}

fn filter<N: MetapathNode>(
    base: Sequence<N>,
    predicates: &[Expr<N>],
    ctx: &DynamicContext<N>,
) -> Result<Sequence<N>, Error> {
    if !ctx.configuration().is_enabled(Feature::PredicateEvaluation) {
        return Ok(base);
    }
    let size = base.len();
    let mut kept = Vec::new();
    'items: for (index, item) in base.iter().enumerate() {
        let position = index + 1;
        for predicate in predicates {
            if !predicate_holds(predicate, ctx, item, position, size)? {
                continue 'items;
            }
        }
        kept.push(item.clone());
    }
    Ok(Sequence::from_vec(kept))
}

fn predicate_holds<N: MetapathNode>(
    predicate: &Expr<N>,
    ctx: &DynamicContext<N>,
    item: &Item<N>,
    position: usize,
    size: usize,
) -> Result<bool, Error> {
    if let Expr::IntegerLiteral(n) = predicate {
        return Ok(usize::try_from(*n).is_ok_and(|n| n == position));
    }
    let inner = ctx.with_focus_position(position, size);
    let result = evaluate(predicate, &inner, &Sequence::of(item.clone()))?;
    // a lone number selects by position
    if let [Item::Atomic(value)] = result.as_slice() {
        if value.is_numeric() {
            return Ok(value.as_decimal() == Some(Decimal::from(position)));
        }
    }
    ebv(&result)
}

/// Atomized value of an operand that admits at most one item.
fn optional_atomic<N: MetapathNode>(value: &Sequence<N>, op: &str) -> Result<Option<AtomicItem>, Error> {
    match value.as_slice() {
        [] => Ok(None),
        [item] => item.atomize().map(Some),
        _ => Err(Error::dynamic(
            ErrorCode::MPTY0004,
            format!("an operand of '{op}' must be a single item, got {} items", value.len()),
        )),
    }
}

fn binary_arithmetic<N: MetapathNode>(
    op: ArithmeticOp,
    left: &Expr<N>,
    right: &Expr<N>,
    ctx: &DynamicContext<N>,
    focus: &Sequence<N>,
) -> Result<Sequence<N>, Error> {
    let l = evaluate(left, ctx, focus)?;
    let r = evaluate(right, ctx, focus)?;
    let (Some(l), Some(r)) = (optional_atomic(&l, op.symbol())?, optional_atomic(&r, op.symbol())?) else {
        return Ok(Sequence::empty());
    };
    Ok(Sequence::from(arithmetic(op, &l, &r, ctx.implicit_timezone())?))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::context::{Configuration, StaticContext};
    use crate::model::simple::{SimpleNode, assembly, doc, field, flag};
    use crate::parser::parse_expression;
    use rstest::{fixture, rstest};

    #[fixture]
    fn document() -> SimpleNode {
        doc()
            .child(
                assembly("catalog")
                    .flag(flag("id", "c1"))
                    .child(assembly("group").flag(flag("id", "g1")).child(field("title", "Alpha")))
                    .child(assembly("group").flag(flag("id", "g2")).child(field("title", "Beta"))),
            )
            .build()
    }

    fn eval_with(src: &str, node: &SimpleNode, ctx: &DynamicContext<SimpleNode>) -> Result<Sequence<SimpleNode>, Error> {
        let expr = parse_expression(src, ctx.static_context())?;
        evaluate(&expr, ctx, &Sequence::from(Item::Node(node.clone())))
    }

    fn eval(src: &str, node: &SimpleNode) -> Result<Sequence<SimpleNode>, Error> {
        eval_with(src, node, &DynamicContext::default())
    }

    fn strings(seq: &Sequence<SimpleNode>) -> Vec<String> {
        seq.iter().map(Item::string_value).collect()
    }

    #[rstest]
    fn child_paths(document: SimpleNode) {
        assert_eq!(strings(&eval("/catalog/group/title", &document).unwrap()), ["Alpha", "Beta"]);
        assert_eq!(strings(&eval("//title", &document).unwrap()), ["Alpha", "Beta"]);
        assert_eq!(strings(&eval("catalog/group/@id", &document).unwrap()), ["g1", "g2"]);
    }

    #[rstest]
    fn predicates_select_by_position_and_value(document: SimpleNode) {
        assert_eq!(strings(&eval("//group[2]/title", &document).unwrap()), ["Beta"]);
        assert_eq!(strings(&eval("//group[@id = 'g1']/title", &document).unwrap()), ["Alpha"]);
        assert_eq!(strings(&eval("//group[last()]/@id", &document).unwrap()), ["g2"]);
        assert!(eval("//group[3]", &document).unwrap().is_empty());
        assert!(eval("//group[0]", &document).unwrap().is_empty());
    }

    #[rstest]
    fn disabled_predicates_pass_through(document: SimpleNode) {
        let ctx = StaticContext::default()
            .dynamic_context()
            .with_configuration(Configuration::default().disable(Feature::PredicateEvaluation))
            .build();
        assert_eq!(eval_with("//group[2]", &document, &ctx).unwrap().len(), 2);
    }

    #[rstest]
    fn non_step_right_side_runs_per_item(document: SimpleNode) {
        assert_eq!(strings(&eval("//group/string(@id)", &document).unwrap()), ["g1", "g2"]);
        assert_eq!(strings(&eval("//group/position()", &document).unwrap()), ["1", "2"]);
    }

    #[rstest]
    fn parent_and_union_deduplicate(document: SimpleNode) {
        assert_eq!(eval("//title/..", &document).unwrap().len(), 2);
        assert_eq!(eval("//group | //group[1]", &document).unwrap().len(), 2);
    }

    #[rstest]
    #[case("1/a", ErrorCode::MPTY0019)]
    #[case("(1, 2) | //group", ErrorCode::MPTY0004)]
    #[case("(1, 2) + 1", ErrorCode::MPTY0004)]
    fn type_errors(document: SimpleNode, #[case] src: &str, #[case] code: ErrorCode) {
        assert_eq!(eval(src, &document).unwrap_err().code, code);
    }

    #[rstest]
    fn rooted_path_needs_a_document() {
        let detached = assembly("lonely").build();
        assert_eq!(eval("/", &detached).unwrap_err().code, ErrorCode::MPDY0050);
        let expr = parse_expression::<SimpleNode>("/a", &StaticContext::default()).unwrap();
        let err = evaluate(&expr, &DynamicContext::default(), &Sequence::empty()).unwrap_err();
        assert_eq!(err.code, ErrorCode::MPDY0002);
    }

    #[rstest]
    fn step_on_atomic_focus() {
        let expr = parse_expression::<SimpleNode>("a", &StaticContext::default()).unwrap();
        let err = evaluate(&expr, &DynamicContext::default(), &Sequence::from(AtomicItem::Integer(1))).unwrap_err();
        assert_eq!(err.code, ErrorCode::MPTY0020);
    }

    #[rstest]
    fn double_slash_does_not_step_out_of_a_sentinel() {
        let d = doc()
            .child(
                assembly("part")
                    .child(field("title", "outer"))
                    .child(
                        assembly("part")
                            .cycle_sentinel()
                            .child(field("title", "inner"))
                            .child(assembly("part").child(field("title", "hidden"))),
                    ),
            )
            .build();
        assert_eq!(strings(&eval("//title", &d).unwrap()), ["outer"]);
        assert_eq!(eval("//part", &d).unwrap().len(), 2);
        assert_eq!(strings(&eval("part/part/title", &d).unwrap()), ["inner"]);
    }

    #[rstest]
    fn untyped_operands_are_not_arithmetic_operands() {
        let d = doc().child(field("n", AtomicItem::untyped("2.5"))).build();
        assert_eq!(eval("n + 1", &d).unwrap_err().code, ErrorCode::MPTY0004);
        assert_eq!(eval("-n", &d).unwrap_err().code, ErrorCode::MPTY0004);
        assert_eq!(strings(&eval("xs:decimal(n) + 1", &d).unwrap()), ["3.5"]);
    }
}
