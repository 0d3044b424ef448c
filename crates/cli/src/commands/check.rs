use crate::OutputFormat;
use crate::util::{CliResult, parse_binding};
use clap::Args;
use metapath::model::simple::SimpleNode;
use metapath::{StaticContext, compile};
use owo_colors::{OwoColorize, Stream};
use serde::Serialize;

#[derive(Args, Debug, Clone)]
pub struct CheckArgs {
    #[arg(value_name = "EXPRESSION")]
    pub expression: String,
    #[arg(long = "namespace", value_name = "PREFIX=URI", value_parser = parse_binding)]
    pub namespaces: Vec<(String, String)>,
    #[arg(long = "format", value_enum, default_value_t = OutputFormat::Text)]
    pub format: OutputFormat,
}

#[derive(Serialize, Debug, Clone, PartialEq)]
pub(crate) struct CheckSummary {
    expression: String,
    result_type: String,
}

pub fn run(args: &CheckArgs) -> CliResult<String> {
    let static_context: StaticContext<SimpleNode> = args
        .namespaces
        .iter()
        .fold(StaticContext::builder(), |builder, (prefix, uri)| builder.with_namespace(prefix.as_str(), uri.as_str()))
        .build();
    let expression = compile(&args.expression, &static_context)?;
    let summary = CheckSummary {
        expression: expression.source().to_owned(),
        result_type: expression.static_result_type().to_string(),
    };

    let output = match args.format {
        OutputFormat::Text => {
            let result_type = summary
                .result_type
                .if_supports_color(Stream::Stdout, |text| text.fg_rgb::<120, 220, 140>().to_string())
                .to_string();
            format!("{} : {result_type}", summary.expression)
        }
        OutputFormat::Json => serde_json::to_string_pretty(&summary)?,
    };
    Ok(output)
}
