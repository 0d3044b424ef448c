use crate::consts::ERR_NS;
use crate::xdm::ExpandedName;
use core::fmt;
use std::sync::Arc;

/// The two error classes of the language: raised while compiling or while evaluating.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    Static,
    Dynamic,
}

/// Canonicalized set of error codes emitted by the compiler, evaluator and function library.
///
/// `MP*` codes belong to the expression language itself (syntax, static names, dynamic
/// context and typing); `FO*` codes are raised by operator and library functions.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorCode {
    // Static
    MPST0003, // grammar / parse failure
    MPST0017, // no function matches name and arity
    MPST0034, // duplicate function registration
    MPST0081, // namespace prefix cannot be expanded
    // Dynamic context
    MPDY0002, // required context component absent
    MPDY0050, // root of the tree is not a document node
    // Typing
    MPTY0004, // invalid type for operation
    MPTY0019, // path step produced a non-node item
    MPTY0020, // axis step applied to a non-node context item
    // Arithmetic
    FOAR0001, // division by zero
    FOAR0002, // numeric overflow / underflow
    FODT0001, // date/time overflow
    FODT0002, // duration overflow
    // Casting and arguments
    FOCA0002, // invalid lexical value
    FORG0001, // invalid value for cast
    FORG0002, // invalid argument to resolve-uri
    FORG0003, // zero-or-one called with more than one item
    FORG0004, // one-or-more called with an empty sequence
    FORG0005, // exactly-one called with a sequence that is not a singleton
    FORG0006, // invalid argument type (e.g. effective boolean value)
    FOTY0012, // node has no typed value
    // Documents
    FODC0002, // error retrieving resource
    FODC0005, // invalid document URI
    FOER0000, // unidentified error
    // Fallback / unknown (kept last)
    Unknown,
}

impl ErrorCode {
    pub fn as_str(&self) -> &'static str {
        use ErrorCode::*;
        match self {
            MPST0003 => "err:MPST0003",
            MPST0017 => "err:MPST0017",
            MPST0034 => "err:MPST0034",
            MPST0081 => "err:MPST0081",
            MPDY0002 => "err:MPDY0002",
            MPDY0050 => "err:MPDY0050",
            MPTY0004 => "err:MPTY0004",
            MPTY0019 => "err:MPTY0019",
            MPTY0020 => "err:MPTY0020",
            FOAR0001 => "err:FOAR0001",
            FOAR0002 => "err:FOAR0002",
            FODT0001 => "err:FODT0001",
            FODT0002 => "err:FODT0002",
            FOCA0002 => "err:FOCA0002",
            FORG0001 => "err:FORG0001",
            FORG0002 => "err:FORG0002",
            FORG0003 => "err:FORG0003",
            FORG0004 => "err:FORG0004",
            FORG0005 => "err:FORG0005",
            FORG0006 => "err:FORG0006",
            FOTY0012 => "err:FOTY0012",
            FODC0002 => "err:FODC0002",
            FODC0005 => "err:FODC0005",
            FOER0000 => "err:FOER0000",
            Unknown => "err:UNKNOWN",
        }
    }

    pub fn from_code(s: &str) -> Self {
        use ErrorCode::*;
        const ALL: [ErrorCode; 24] = [
            MPST0003, MPST0017, MPST0034, MPST0081, MPDY0002, MPDY0050, MPTY0004, MPTY0019,
            MPTY0020, FOAR0001, FOAR0002, FODT0001, FODT0002, FOCA0002, FORG0001, FORG0002,
            FORG0003, FORG0004, FORG0005, FORG0006, FOTY0012, FODC0002, FODC0005, FOER0000,
        ];
        ALL.into_iter().find(|c| c.as_str() == s).unwrap_or(Unknown)
    }

    /// Four-letter family prefix, e.g. `MPST` or `FOAR`.
    pub fn prefix(&self) -> &'static str {
        let s = self.as_str().trim_start_matches("err:");
        if *self == ErrorCode::Unknown { s } else { &s[..4] }
    }

    /// Numeric part of the code; `0` for [`ErrorCode::Unknown`].
    pub fn number(&self) -> u16 {
        let s = self.as_str().trim_start_matches("err:");
        s.get(4..).and_then(|n| n.parse().ok()).unwrap_or(0)
    }

    /// Returns the QName for this code in the error namespace.
    pub fn qname(&self) -> ExpandedName {
        ExpandedName::new(Some(ERR_NS.to_string()), self.as_str().trim_start_matches("err:"))
    }
}

impl fmt::Display for ErrorCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, thiserror::Error)]
pub struct Error {
    pub kind: ErrorKind,
    pub code: ErrorCode,
    pub message: String,
    /// Source text of the expression being evaluated when the error surfaced.
    pub expression: Option<String>,
    #[source]
    pub source: Option<Arc<dyn std::error::Error + Send + Sync>>,
}

impl Error {
    pub fn new(kind: ErrorKind, code: ErrorCode, msg: impl Into<String>) -> Self {
        Self { kind, code, message: msg.into(), expression: None, source: None }
    }

    pub fn static_err(code: ErrorCode, msg: impl Into<String>) -> Self {
        Self::new(ErrorKind::Static, code, msg)
    }

    pub fn dynamic(code: ErrorCode, msg: impl Into<String>) -> Self {
        Self::new(ErrorKind::Dynamic, code, msg)
    }

    pub fn code_enum(&self) -> ErrorCode {
        self.code
    }

    pub fn is_static(&self) -> bool {
        self.kind == ErrorKind::Static
    }

    /// Compose an error with a source cause.
    pub fn with_source(
        mut self,
        source: impl Into<Option<Arc<dyn std::error::Error + Send + Sync>>>,
    ) -> Self {
        self.source = source.into();
        self
    }

    /// Attach the source text of the offending expression. An already attached expression is
    /// kept, so the innermost compiled expression wins.
    pub fn with_expression(mut self, expression: impl Into<String>) -> Self {
        if self.expression.is_none() {
            self.expression = Some(expression.into());
        }
        self
    }

    /// Type error naming the runtime types of both operands.
    pub(crate) fn invalid_types(op: &str, left: &str, right: &str) -> Self {
        Self::dynamic(
            ErrorCode::MPTY0004,
            format!("{op} is not supported for the operand types '{left}' and '{right}'"),
        )
    }
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let class = match self.kind {
            ErrorKind::Static => "static error",
            ErrorKind::Dynamic => "dynamic error",
        };
        write!(f, "{class}: {} ({})", self.message, self.code)?;
        if let Some(expr) = &self.expression {
            write!(f, " in expression '{expr}'")?;
        }
        Ok(())
    }
}

impl From<std::io::Error> for Error {
    fn from(e: std::io::Error) -> Self {
        Error::dynamic(ErrorCode::FODC0002, e.to_string())
            .with_source(Some(Arc::new(e) as Arc<dyn std::error::Error + Send + Sync>))
    }
}

impl From<url::ParseError> for Error {
    fn from(e: url::ParseError) -> Self {
        Error::dynamic(ErrorCode::FODC0005, format!("invalid URI: {e}"))
            .with_source(Some(Arc::new(e) as Arc<dyn std::error::Error + Send + Sync>))
    }
}

impl From<fancy_regex::Error> for Error {
    fn from(e: fancy_regex::Error) -> Self {
        Error::dynamic(ErrorCode::FORG0001, "invalid regular expression")
            .with_source(Some(Arc::new(e) as Arc<dyn std::error::Error + Send + Sync>))
    }
}
