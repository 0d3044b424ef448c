//! Compilation entry point and the compiled expression handle.

use rust_decimal::Decimal;
use tracing::{debug, trace};

use crate::engine::analysis::static_result_type;
use crate::engine::context::{DynamicContext, StaticContext};
use crate::engine::error::{Error, ErrorCode};
use crate::engine::evaluator;
use crate::engine::functions::SequenceType;
use crate::engine::functions::common::ebv;
use crate::model::MetapathNode;
use crate::parser::ast::Expr;
use crate::parser::parse_expression;
use crate::xdm::{AtomicType, Item, Sequence};

/// Compile `source` against `ctx`. Namespace prefixes and function names are resolved now, so
/// unknown functions and prefixes are reported here rather than during evaluation.
pub fn compile<N: MetapathNode>(source: &str, ctx: &StaticContext<N>) -> Result<MetapathExpression<N>, Error> {
    // the bare context item skips the grammar
    let expr = if source == "." {
        Expr::ContextItem
    } else {
        parse_expression(source, ctx).map_err(|e| e.with_expression(source))?
    };
    debug!(expression = source, "compiled metapath expression");
    Ok(MetapathExpression { source: source.to_string(), expr, static_context: ctx.clone() })
}

/// Shapes a raw result can be converted into by [`MetapathExpression::evaluate_as`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResultType {
    /// Effective boolean value.
    Boolean,
    /// String value of the single item, `""` when empty.
    String,
    /// The single item cast to a decimal.
    Number,
    /// The single item, which must be a node.
    Node,
    /// The raw sequence.
    Sequence,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ResultValue<N> {
    Boolean(bool),
    String(String),
    Number(Option<Decimal>),
    Node(Option<N>),
    Sequence(Sequence<N>),
}

/// A compiled expression together with the static context it was compiled in.
#[derive(Debug, Clone)]
pub struct MetapathExpression<N> {
    source: String,
    expr: Expr<N>,
    static_context: StaticContext<N>,
}

impl<N: MetapathNode> MetapathExpression<N> {
    pub fn source(&self) -> &str {
        &self.source
    }

    pub fn expr(&self) -> &Expr<N> {
        &self.expr
    }

    pub fn static_context(&self) -> &StaticContext<N> {
        &self.static_context
    }

    pub fn static_result_type(&self) -> SequenceType {
        static_result_type(&self.expr)
    }

    /// Evaluate with an optional context item. Without a dynamic context a fresh one is derived
    /// from the static context. Errors carry this expression's source text.
    pub fn evaluate(&self, focus: Option<Item<N>>, ctx: Option<&DynamicContext<N>>) -> Result<Sequence<N>, Error> {
        trace!(expression = %self.source, has_focus = focus.is_some(), "evaluating");
        let owned;
        let ctx = match ctx {
            Some(ctx) => ctx,
            None => {
                owned = self.static_context.dynamic_context().build();
                &owned
            }
        };
        evaluator::evaluate(&self.expr, ctx, &Sequence::of(focus)).map_err(|e| e.with_expression(self.source.as_str()))
    }

    pub fn evaluate_as(
        &self,
        focus: Option<Item<N>>,
        kind: ResultType,
        ctx: Option<&DynamicContext<N>>,
    ) -> Result<ResultValue<N>, Error> {
        let result = self.evaluate(focus, ctx)?;
        let converted = match kind {
            ResultType::Sequence => return Ok(ResultValue::Sequence(result)),
            ResultType::Boolean => ebv(&result).map(ResultValue::Boolean),
            ResultType::String => {
                result.first_item(true).map(|i| ResultValue::String(i.map(Item::string_value).unwrap_or_default()))
            }
            ResultType::Number => match result.first_item(true) {
                Ok(None) => Ok(ResultValue::Number(None)),
                Ok(Some(item)) => item
                    .atomize()
                    .and_then(|v| AtomicType::Decimal.cast(&v))
                    .map(|v| ResultValue::Number(v.as_decimal())),
                Err(e) => Err(e),
            },
            ResultType::Node => match result.first_item(true) {
                Ok(None) => Ok(ResultValue::Node(None)),
                Ok(Some(Item::Node(n))) => Ok(ResultValue::Node(Some(n.clone()))),
                Ok(Some(other)) => Err(Error::dynamic(
                    ErrorCode::MPTY0004,
                    format!("expected a node result, got {}", other.type_label()),
                )),
                Err(e) => Err(e),
            },
        };
        converted.map_err(|e| e.with_expression(self.source.as_str()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::simple::{SimpleNode, assembly, doc, field};
    use rstest::rstest;

    fn compiled(src: &str) -> MetapathExpression<SimpleNode> {
        compile(src, &StaticContext::default()).unwrap()
    }

    #[rstest]
    fn errors_carry_the_source_text() {
        let err = compiled("1 div 0").evaluate(None, None).unwrap_err();
        assert_eq!(err.code, ErrorCode::FOAR0001);
        assert_eq!(err.expression.as_deref(), Some("1 div 0"));

        let err = compile::<SimpleNode>("1 +", &StaticContext::default()).unwrap_err();
        assert_eq!(err.expression.as_deref(), Some("1 +"));
    }

    #[rstest]
    #[case("(1, 2)", ResultType::Boolean, ErrorCode::FORG0006)]
    #[case("(1, 2)", ResultType::String, ErrorCode::FORG0003)]
    #[case("(1, 2)", ResultType::Number, ErrorCode::FORG0003)]
    #[case("1", ResultType::Node, ErrorCode::MPTY0004)]
    fn conversion_errors(#[case] src: &str, #[case] kind: ResultType, #[case] code: ErrorCode) {
        assert_eq!(compiled(src).evaluate_as(None, kind, None).unwrap_err().code, code);
    }

    #[rstest]
    fn conversions() {
        let e = compiled("'3.50'");
        assert_eq!(e.evaluate_as(None, ResultType::Number, None).unwrap(), ResultValue::Number(Some(Decimal::new(35, 1))));
        assert_eq!(e.evaluate_as(None, ResultType::Boolean, None).unwrap(), ResultValue::Boolean(true));
        assert_eq!(compiled("()").evaluate_as(None, ResultType::String, None).unwrap(), ResultValue::String(String::new()));
    }

    #[rstest]
    fn node_results() {
        let d = doc().child(assembly("a").child(field("b", "x"))).build();
        let e = compiled("a/b");
        let ResultValue::Node(Some(b)) = e.evaluate_as(Some(Item::Node(d)), ResultType::Node, None).unwrap() else {
            panic!("expected a node");
        };
        assert_eq!(b.string_value(), "x");
    }

    #[rstest]
    fn dot_is_the_context_item() {
        let e = compiled(".");
        assert!(matches!(e.expr(), Expr::ContextItem));
        let seven = Item::Atomic(crate::xdm::AtomicItem::Integer(7));
        assert_eq!(e.evaluate(Some(seven.clone()), None).unwrap().to_vec(), [seven]);
        assert!(e.evaluate(None, None).unwrap().is_empty());
    }
}
