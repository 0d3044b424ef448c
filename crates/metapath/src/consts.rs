//! Well-known namespace URIs.

/// XML Schema datatypes; hosts the atomic constructor functions (`xs:integer(...)`).
pub const XS: &str = "http://www.w3.org/2001/XMLSchema";
/// Standard function namespace.
pub const FNS: &str = "http://www.w3.org/2005/xpath-functions";
pub const MATH: &str = "http://www.w3.org/2005/xpath-functions/math";
/// Metapath extension functions.
pub const MP: &str = "http://csrc.nist.gov/ns/metaschema/metapath-functions";
pub const XML_URI: &str = "http://www.w3.org/XML/1998/namespace";
/// Namespace of the error catalogue codes.
pub const ERR_NS: &str = "http://csrc.nist.gov/ns/metaschema/metapath-errors";
