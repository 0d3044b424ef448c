//! Grammar front end and AST builder.

use pest::Parser;
use pest::iterators::Pair;
use rust_decimal::Decimal;
use std::sync::Arc;

use crate::engine::context::StaticContext;
use crate::engine::error::{Error, ErrorCode};
use crate::xdm::{AtomicType, ExpandedName, decimal64};

pub mod ast;

use ast::{Axis, ComparisonOperator, Expr, NodeTest};

#[derive(pest_derive::Parser)]
#[grammar = "parser/metapath.pest"]
pub struct MetapathParser;

/// Parse `source` and build the expression tree, resolving namespace prefixes and function
/// names against `ctx`.
pub fn parse_expression<N: crate::model::MetapathNode>(
    source: &str,
    ctx: &StaticContext<N>,
) -> Result<Expr<N>, Error> {
    let mut pairs = MetapathParser::parse(Rule::metapath, source).map_err(|e| {
        Error::static_err(ErrorCode::MPST0003, format!("unable to parse expression: {e}"))
            .with_source(Some(Arc::new(e) as Arc<dyn std::error::Error + Send + Sync>))
    })?;
    let root = pairs.next().ok_or_else(|| malformed(Rule::metapath))?;
    let expr = root.into_inner().next().ok_or_else(|| malformed(Rule::expr))?;
    AstBuilder { ctx }.build(expr)
}

fn malformed(rule: Rule) -> Error {
    Error::static_err(ErrorCode::MPST0003, format!("malformed parse tree: expected {rule:?}"))
}

/// Walk down a pair to the first terminal token rule (e.g. `OP_PLUS`, `K_DIV`).
fn first_token_rule(pair: &Pair<Rule>) -> Rule {
    let mut current = pair.clone();
    while let Some(next) = current.clone().into_inner().next() {
        current = next;
    }
    current.as_rule()
}

/// Flat n-ary shape: all operands of one precedence level become a single node; a lone operand
/// is returned without a wrapper.
fn flat_nary<N>(mut operands: Vec<Expr<N>>, wrap: impl FnOnce(Vec<Expr<N>>) -> Expr<N>) -> Expr<N> {
    if operands.len() == 1 {
        if let Some(only) = operands.pop() {
            return only;
        }
    }
    wrap(operands)
}

/// Grouped left-associative shape: `left (op right)*` folded pairwise, the operator token of
/// each step selecting the node type.
fn grouped_left_assoc<N>(
    first: Expr<N>,
    rest: Vec<(Rule, Expr<N>)>,
    combine: impl Fn(Rule, Expr<N>, Expr<N>) -> Result<Expr<N>, Error>,
) -> Result<Expr<N>, Error> {
    rest.into_iter().try_fold(first, |left, (op, right)| combine(op, left, right))
}

struct AstBuilder<'a, N> {
    ctx: &'a StaticContext<N>,
}

impl<N: crate::model::MetapathNode> AstBuilder<'_, N> {
    fn build(&self, pair: Pair<'_, Rule>) -> Result<Expr<N>, Error> {
        let rule = pair.as_rule();
        match rule {
            Rule::expr => {
                let items = pair.into_inner().map(|p| self.build(p)).collect::<Result<Vec<_>, _>>()?;
                Ok(flat_nary(items, Expr::Sequence))
            }
            Rule::expr_single
            | Rule::step_expr
            | Rule::primary_expr
            | Rule::literal
            | Rule::numeric_literal
            | Rule::predicate => {
                let inner = pair.into_inner().next().ok_or_else(|| malformed(rule))?;
                self.build(inner)
            }
            Rule::let_expr => self.build_let(pair),
            Rule::or_expr => Ok(flat_nary(self.operands(pair, Rule::K_OR)?, Expr::Or)),
            Rule::and_expr => Ok(flat_nary(self.operands(pair, Rule::K_AND)?, Expr::And)),
            Rule::string_concat_expr => {
                Ok(flat_nary(self.operands(pair, Rule::OP_CONCAT)?, Expr::StringConcat))
            }
            Rule::union_expr => {
                let operands = pair
                    .into_inner()
                    .filter(|p| !matches!(p.as_rule(), Rule::K_UNION | Rule::OP_PIPE))
                    .map(|p| self.build(p))
                    .collect::<Result<Vec<_>, _>>()?;
                Ok(flat_nary(operands, Expr::Union))
            }
            Rule::comparison_expr => self.build_comparison(pair),
            Rule::additive_expr | Rule::multiplicative_expr | Rule::relative_path_expr => {
                self.build_binary_chain(pair)
            }
            Rule::unary_expr => {
                let mut minus = 0usize;
                let mut operand = None;
                for p in pair.into_inner() {
                    match p.as_rule() {
                        Rule::unary_op => {
                            if first_token_rule(&p) == Rule::OP_MINUS {
                                minus += 1;
                            }
                        }
                        _ => operand = Some(self.build(p)?),
                    }
                }
                let operand = operand.ok_or_else(|| malformed(Rule::path_expr))?;
                Ok(if minus % 2 == 1 { Expr::Negate(Box::new(operand)) } else { operand })
            }
            Rule::path_expr => {
                let inner = pair.into_inner().next().ok_or_else(|| malformed(rule))?;
                match inner.as_rule() {
                    Rule::root_descendant_path => {
                        let rel = inner.into_inner().nth(1).ok_or_else(|| malformed(Rule::relative_path_expr))?;
                        Ok(Expr::RootDoubleSlash(Box::new(self.build(rel)?)))
                    }
                    Rule::root_path => match inner.into_inner().nth(1) {
                        Some(rel) => Ok(Expr::RootSlash(Box::new(self.build(rel)?))),
                        None => Ok(Expr::Root),
                    },
                    _ => self.build(inner),
                }
            }
            Rule::postfix_expr | Rule::axis_step => {
                let mut inner = pair.into_inner();
                let base = self.build(inner.next().ok_or_else(|| malformed(rule))?)?;
                let predicates = inner.map(|p| self.build(p)).collect::<Result<Vec<_>, _>>()?;
                if predicates.is_empty() {
                    Ok(base)
                } else {
                    Ok(Expr::Predicate { base: Box::new(base), predicates })
                }
            }
            Rule::forward_step | Rule::reverse_step => self.build_step(pair),
            Rule::integer_literal => {
                let text = pair.as_str();
                text.parse::<i64>().map(Expr::IntegerLiteral).map_err(|_| {
                    Error::static_err(ErrorCode::FOAR0002, format!("integer literal {text} is out of range"))
                })
            }
            Rule::decimal_literal => {
                let text = pair.as_str();
                match AtomicType::Decimal.parse(text) {
                    Ok(crate::xdm::AtomicItem::Decimal(d)) => Ok(Expr::DecimalLiteral(d)),
                    Ok(_) => Err(malformed(rule)),
                    Err(_) => {
                        Err(Error::static_err(ErrorCode::FOAR0002, format!("decimal literal {text} is out of range")))
                    }
                }
            }
            Rule::double_literal => {
                let text = pair.as_str();
                let normalized = if text.starts_with('.') { format!("0{text}") } else { text.to_string() };
                Decimal::from_scientific(&normalized.replace(".e", ".0e").replace(".E", ".0E"))
                    .map(|d| Expr::DecimalLiteral(decimal64(d)))
                    .map_err(|_| {
                        Error::static_err(ErrorCode::FOAR0002, format!("numeric literal {text} is out of range"))
                    })
            }
            Rule::string_literal => {
                let Some(content) = pair.into_inner().next() else {
                    return Ok(Expr::StringLiteral(String::new()));
                };
                let s = match content.as_rule() {
                    Rule::dbl_string_inner => content.as_str().replace("\"\"", "\""),
                    _ => content.as_str().replace("''", "'"),
                };
                Ok(Expr::StringLiteral(s))
            }
            Rule::var_ref => {
                let name = pair.into_inner().next().ok_or_else(|| malformed(Rule::eqname))?;
                Ok(Expr::VariableReference(self.variable_name(name.as_str())?))
            }
            Rule::parenthesized_expr => match pair.into_inner().next() {
                Some(inner) => self.build(inner),
                None => Ok(Expr::EmptySequence),
            },
            Rule::context_item_expr => Ok(Expr::ContextItem),
            Rule::function_call => self.build_function_call(pair),
            other => Err(malformed(other)),
        }
    }

    /// Operands of a flat n-ary rule, skipping the separator token.
    fn operands(&self, pair: Pair<'_, Rule>, separator: Rule) -> Result<Vec<Expr<N>>, Error> {
        pair.into_inner()
            .filter(|p| p.as_rule() != separator)
            .map(|p| self.build(p))
            .collect()
    }

    fn build_binary_chain(&self, pair: Pair<'_, Rule>) -> Result<Expr<N>, Error> {
        let rule = pair.as_rule();
        let mut inner = pair.into_inner();
        let first = self.build(inner.next().ok_or_else(|| malformed(rule))?)?;
        let mut rest = Vec::new();
        while let Some(op) = inner.next() {
            let right = inner.next().ok_or_else(|| malformed(rule))?;
            rest.push((first_token_rule(&op), self.build(right)?));
        }
        grouped_left_assoc(first, rest, |op, l, r| {
            let (l, r) = (Box::new(l), Box::new(r));
            Ok(match op {
                Rule::OP_PLUS => Expr::Addition(l, r),
                Rule::OP_MINUS => Expr::Subtraction(l, r),
                Rule::OP_STAR => Expr::Multiplication(l, r),
                Rule::K_DIV => Expr::Division(l, r),
                Rule::K_IDIV => Expr::IntegerDivision(l, r),
                Rule::K_MOD => Expr::Modulo(l, r),
                Rule::OP_SLASH => Expr::RelativeSlash(l, r),
                Rule::OP_DSLASH => Expr::RelativeDoubleSlash(l, r),
                other => return Err(malformed(other)),
            })
        })
    }

    fn build_comparison(&self, pair: Pair<'_, Rule>) -> Result<Expr<N>, Error> {
        let mut inner = pair.into_inner();
        let left = self.build(inner.next().ok_or_else(|| malformed(Rule::string_concat_expr))?)?;
        let Some(op) = inner.next() else {
            return Ok(left);
        };
        let right = self.build(inner.next().ok_or_else(|| malformed(Rule::string_concat_expr))?)?;
        let kind = op.clone().into_inner().next().map(|p| p.as_rule()).ok_or_else(|| malformed(Rule::comp_op))?;
        let operator = match first_token_rule(&op) {
            Rule::K_EQ | Rule::OP_EQ => ComparisonOperator::Eq,
            Rule::K_NE | Rule::OP_NE => ComparisonOperator::Ne,
            Rule::K_LT | Rule::OP_LT => ComparisonOperator::Lt,
            Rule::K_LE | Rule::OP_LE => ComparisonOperator::Le,
            Rule::K_GT | Rule::OP_GT => ComparisonOperator::Gt,
            Rule::K_GE | Rule::OP_GE => ComparisonOperator::Ge,
            other => return Err(malformed(other)),
        };
        let (left, right) = (Box::new(left), Box::new(right));
        Ok(if kind == Rule::value_comp {
            Expr::ValueComparison { left, op: operator, right }
        } else {
            Expr::GeneralComparison { left, op: operator, right }
        })
    }

    fn build_let(&self, pair: Pair<'_, Rule>) -> Result<Expr<N>, Error> {
        let mut bindings = Vec::new();
        let mut body = None;
        for p in pair.into_inner() {
            match p.as_rule() {
                Rule::let_binding => {
                    let mut inner = p.into_inner();
                    let name = inner.next().ok_or_else(|| malformed(Rule::eqname))?;
                    let bound = inner.next().ok_or_else(|| malformed(Rule::expr_single))?;
                    bindings.push((self.variable_name(name.as_str())?, self.build(bound)?));
                }
                Rule::expr_single => body = Some(self.build(p)?),
                _ => {}
            }
        }
        let body = body.ok_or_else(|| malformed(Rule::expr_single))?;
        // the first binding ends up outermost, so later bindings and the body see it
        Ok(bindings.into_iter().rev().fold(body, |body, (name, bound)| Expr::Let {
            name,
            bound: Box::new(bound),
            body: Box::new(body),
        }))
    }

    fn build_step(&self, pair: Pair<'_, Rule>) -> Result<Expr<N>, Error> {
        let rule = pair.as_rule();
        let mut inner = pair.into_inner();
        let first = inner.next().ok_or_else(|| malformed(rule))?;
        match first.as_rule() {
            Rule::forward_axis | Rule::reverse_axis => {
                let axis = match first_token_rule(&first) {
                    Rule::AX_CHILD => Axis::Child,
                    Rule::AX_DESCENDANT => Axis::Descendant,
                    Rule::AX_DESCENDANT_OR_SELF => Axis::DescendantOrSelf,
                    Rule::AX_SELF => Axis::SelfAxis,
                    Rule::AX_FLAG => Axis::Flag,
                    Rule::AX_PARENT => Axis::Parent,
                    Rule::AX_ANCESTOR => Axis::Ancestor,
                    Rule::AX_ANCESTOR_OR_SELF => Axis::AncestorOrSelf,
                    other => return Err(malformed(other)),
                };
                let test = self.node_test(inner.next().ok_or_else(|| malformed(Rule::node_test))?)?;
                Ok(Expr::Step { axis, test })
            }
            Rule::abbrev_forward_step => {
                let mut axis = Axis::Child;
                let mut test = None;
                for p in first.into_inner() {
                    match p.as_rule() {
                        Rule::abbrev_flag => axis = Axis::Flag,
                        _ => test = Some(self.node_test(p)?),
                    }
                }
                Ok(Expr::Step { axis, test: test.ok_or_else(|| malformed(Rule::node_test))? })
            }
            Rule::abbrev_reverse_step => Ok(Expr::Step { axis: Axis::Parent, test: NodeTest::Wildcard }),
            other => Err(malformed(other)),
        }
    }

    fn node_test(&self, pair: Pair<'_, Rule>) -> Result<NodeTest, Error> {
        let inner = pair.into_inner().next().ok_or_else(|| malformed(Rule::node_test))?;
        match inner.as_rule() {
            Rule::wildcard => Ok(NodeTest::Wildcard),
            _ => {
                let lexical = inner.as_str();
                if lexical.contains(':') {
                    Ok(NodeTest::Name(self.ctx.expand_prefixed(lexical)?))
                } else {
                    Ok(NodeTest::Local(lexical.to_string()))
                }
            }
        }
    }

    fn variable_name(&self, lexical: &str) -> Result<ExpandedName, Error> {
        if lexical.contains(':') {
            self.ctx.expand_prefixed(lexical)
        } else {
            Ok(ExpandedName::local(lexical))
        }
    }

    fn build_function_call(&self, pair: Pair<'_, Rule>) -> Result<Expr<N>, Error> {
        let mut inner = pair.into_inner();
        let name = inner.next().ok_or_else(|| malformed(Rule::eqname))?.as_str().to_string();
        let args = inner.map(|p| self.build(p)).collect::<Result<Vec<_>, _>>()?;
        let function = if name.contains(':') {
            let qname = self.ctx.expand_prefixed(&name)?;
            self.ctx.functions().resolve(&qname, args.len())?
        } else {
            self.ctx.functions().resolve_local(&name, args.len())?
        };
        Ok(Expr::FunctionCall { function, args })
    }
}
