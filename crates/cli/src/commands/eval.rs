use crate::OutputFormat;
use crate::json::JsonDocumentLoader;
use crate::util::{CliResult, base_uri, file_url, parse_binding};
use anyhow::Context;
use clap::{Args, ValueEnum};
use metapath::model::simple::SimpleNode;
use metapath::{
    AtomicItem, Configuration, DocumentLoader, Feature, Item, MetapathNode, ResultType, ResultValue, StaticContext,
    compile,
};
use owo_colors::{OwoColorize, Stream};
use serde::Serialize;
use std::fmt::Write;
use std::path::PathBuf;
use std::sync::Arc;
use tracing::info;

#[derive(Args, Debug, Clone)]
pub struct EvalArgs {
    #[arg(value_name = "EXPRESSION")]
    pub expression: String,
    /// JSON document used as the context item.
    #[arg(long, short = 'd', value_name = "PATH")]
    pub document: Option<PathBuf>,
    /// Static base URI (a URL or a local directory). Defaults to the document's location.
    #[arg(long = "base-uri", value_name = "URI")]
    pub base_uri: Option<String>,
    #[arg(long = "as", value_enum, default_value_t = ResultKind::Sequence)]
    pub result: ResultKind,
    /// External variable bound to an untyped value.
    #[arg(long = "var", value_name = "NAME=VALUE", value_parser = parse_binding)]
    pub variables: Vec<(String, String)>,
    #[arg(long = "namespace", value_name = "PREFIX=URI", value_parser = parse_binding)]
    pub namespaces: Vec<(String, String)>,
    /// Pass step results through without applying predicates.
    #[arg(long = "no-predicates")]
    pub no_predicates: bool,
    #[arg(long = "format", value_enum, default_value_t = OutputFormat::Text)]
    pub format: OutputFormat,
}

#[derive(Copy, Clone, Debug, PartialEq, Eq, ValueEnum)]
pub enum ResultKind {
    Boolean,
    String,
    Number,
    Node,
    Sequence,
}

impl From<ResultKind> for ResultType {
    fn from(kind: ResultKind) -> Self {
        match kind {
            ResultKind::Boolean => ResultType::Boolean,
            ResultKind::String => ResultType::String,
            ResultKind::Number => ResultType::Number,
            ResultKind::Node => ResultType::Node,
            ResultKind::Sequence => ResultType::Sequence,
        }
    }
}

#[derive(Serialize, Debug, Clone, PartialEq)]
#[serde(tag = "type")]
pub enum ItemSummary {
    Node { kind: String, name: Option<String>, path: String, value: Option<String> },
    Atomic { datatype: String, value: String },
}

#[derive(Serialize, Debug, Clone, PartialEq)]
#[serde(tag = "type")]
pub enum ResultSummary {
    Boolean { value: bool },
    String { value: String },
    Number { value: Option<String> },
    Node { node: Option<ItemSummary> },
    Sequence { items: Vec<ItemSummary> },
}

pub fn run(args: &EvalArgs) -> CliResult<String> {
    let document_url = args.document.as_deref().map(file_url).transpose()?;
    let base = base_uri(args.base_uri.as_deref(), document_url.as_ref())?;

    let static_context: StaticContext<SimpleNode> = args
        .namespaces
        .iter()
        .fold(StaticContext::builder().with_base_uri(base), |builder, (prefix, uri)| {
            builder.with_namespace(prefix.as_str(), uri.as_str())
        })
        .build();
    let expression = compile(&args.expression, &static_context)?;

    let mut configuration = Configuration::default();
    if args.no_predicates {
        configuration = configuration.disable(Feature::PredicateEvaluation);
    }
    let loader: Arc<dyn DocumentLoader<SimpleNode>> = Arc::new(JsonDocumentLoader::new());
    let context = args
        .variables
        .iter()
        .fold(
            static_context.dynamic_context().with_document_loader(loader).with_configuration(configuration),
            |builder, (name, value)| builder.with_variable(name.as_str(), AtomicItem::untyped(value.as_str())),
        )
        .build();

    let focus = match &document_url {
        Some(url) => {
            let documents = context.documents().context("document loading is not configured")?;
            Some(Item::Node(documents.load_as_node_item(url.as_str())?))
        }
        None => None,
    };

    let value = expression.evaluate_as(focus, args.result.into(), Some(&context))?;
    let summary = summarize_result(value);
    info!(expression = %args.expression, "evaluated");

    let output = match args.format {
        OutputFormat::Text => render_result_text(&summary),
        OutputFormat::Json => render_result_json(&summary)?,
    };
    Ok(output)
}

pub(crate) fn summarize_result(value: ResultValue<SimpleNode>) -> ResultSummary {
    match value {
        ResultValue::Boolean(value) => ResultSummary::Boolean { value },
        ResultValue::String(value) => ResultSummary::String { value },
        ResultValue::Number(value) => {
            ResultSummary::Number { value: value.map(|d| AtomicItem::decimal(d).string_value()) }
        }
        ResultValue::Node(node) => ResultSummary::Node { node: node.map(|n| summarize_item(&Item::Node(n))) },
        ResultValue::Sequence(items) => ResultSummary::Sequence { items: items.iter().map(summarize_item).collect() },
    }
}

fn summarize_item(item: &Item<SimpleNode>) -> ItemSummary {
    match item {
        Item::Node(node) => ItemSummary::Node {
            kind: node.kind().to_string(),
            name: node.name().map(|n| n.to_string()),
            path: node.location(),
            value: node.typed_value().map(|v| v.string_value()),
        },
        Item::Atomic(atomic) => {
            ItemSummary::Atomic { datatype: atomic.atomic_type().to_string(), value: atomic.string_value() }
        }
    }
}

fn colorize_path(path: &str) -> String {
    path.if_supports_color(Stream::Stdout, |text| text.bold().fg_rgb::<79, 166, 255>().to_string()).to_string()
}

fn colorize_value(value: &str) -> String {
    value.if_supports_color(Stream::Stdout, |text| text.fg_rgb::<241, 149, 255>().to_string()).to_string()
}

fn colorize_kind(kind: &str) -> String {
    kind.if_supports_color(Stream::Stdout, |text| text.dimmed().to_string()).to_string()
}

fn render_item_text(output: &mut String, item: &ItemSummary) {
    match item {
        ItemSummary::Node { kind, path, value: Some(value), .. } => {
            let _ = writeln!(
                output,
                "{} = {} ({})",
                colorize_path(path),
                colorize_value(&format!("\"{value}\"")),
                colorize_kind(kind)
            );
        }
        ItemSummary::Node { kind, path, value: None, .. } => {
            let _ = writeln!(output, "{} ({})", colorize_path(path), colorize_kind(kind));
        }
        ItemSummary::Atomic { value, .. } => {
            let _ = writeln!(output, "{}", colorize_value(value));
        }
    }
}

pub(crate) fn render_result_text(summary: &ResultSummary) -> String {
    let mut output = String::new();
    match summary {
        ResultSummary::Boolean { value } => output.push_str(&colorize_value(&value.to_string())),
        ResultSummary::String { value } => output.push_str(value),
        ResultSummary::Number { value } => output.push_str(value.as_deref().unwrap_or_default()),
        ResultSummary::Node { node } => {
            if let Some(node) = node {
                render_item_text(&mut output, node);
            }
        }
        ResultSummary::Sequence { items } => {
            for item in items {
                render_item_text(&mut output, item);
            }
        }
    }
    output.trim_end().to_owned()
}

pub(crate) fn render_result_json(summary: &ResultSummary) -> CliResult<String> {
    Ok(serde_json::to_string_pretty(summary)?)
}
