use std::env;
use std::path::Path;

use anyhow::{Context, anyhow};
use url::Url;

pub type CliResult<T> = anyhow::Result<T>;

/// Splits a `name=value` pair from the command line.
pub fn parse_binding(raw: &str) -> Result<(String, String), String> {
    match raw.split_once('=') {
        Some((name, value)) if !name.trim().is_empty() => Ok((name.trim().to_owned(), value.to_owned())),
        _ => Err(format!("expected NAME=VALUE, got '{raw}'")),
    }
}

/// Absolute `file:` URL of a local path.
pub fn file_url(path: &Path) -> CliResult<Url> {
    let absolute = path.canonicalize().with_context(|| format!("cannot open {}", path.display()))?;
    Url::from_file_path(&absolute).map_err(|()| anyhow!("cannot express {} as a URL", absolute.display()))
}

/// An explicit base URI wins; otherwise the document URL, otherwise the working directory.
pub fn base_uri(explicit: Option<&str>, document: Option<&Url>) -> CliResult<Url> {
    if let Some(raw) = explicit {
        return Url::parse(raw).or_else(|_| directory_url(Path::new(raw)));
    }
    match document {
        Some(url) => Ok(url.clone()),
        None => directory_url(&env::current_dir()?),
    }
}

fn directory_url(path: &Path) -> CliResult<Url> {
    let absolute = path.canonicalize().with_context(|| format!("cannot resolve {}", path.display()))?;
    Url::from_directory_path(&absolute).map_err(|()| anyhow!("cannot express {} as a URL", absolute.display()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[rstest]
    #[case("limit=3", ("limit", "3"))]
    #[case("title=a=b", ("title", "a=b"))]
    #[case(" name =", ("name", ""))]
    fn bindings_split_at_the_first_equals(#[case] raw: &str, #[case] expected: (&str, &str)) {
        let (name, value) = parse_binding(raw).unwrap();
        assert_eq!((name.as_str(), value.as_str()), expected);
    }

    #[rstest]
    #[case("novalue")]
    #[case("=3")]
    fn malformed_bindings(#[case] raw: &str) {
        assert!(parse_binding(raw).is_err());
    }

    #[rstest]
    fn base_uri_precedence() {
        let document = Url::parse("file:///data/catalog.json").unwrap();
        let explicit = base_uri(Some("http://example.com/models/"), Some(&document)).unwrap();
        assert_eq!(explicit.as_str(), "http://example.com/models/");
        assert_eq!(base_uri(None, Some(&document)).unwrap(), document);
        assert!(base_uri(None, None).unwrap().as_str().ends_with('/'));
    }
}
