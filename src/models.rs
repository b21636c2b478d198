use crate::error::{Error, Result};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::fmt;
use std::str::FromStr;

/// Scope used when the caller names no country or region.
pub const DEFAULT_SCOPE: &str = "SSA";

/// Body keys owned by the client; passthrough options may not reuse them.
pub const RESERVED_KEYS: [&str; 4] = [
    "indicators",
    "countryOrRegionCodes",
    "groupBy",
    "outputFormat",
];

/// File formats the service can package a result into.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OutputFormat {
    Csv,
    Tif,
    Dta,
    Asc,
    Grd,
    Rds,
}

impl OutputFormat {
    pub const ALL: [OutputFormat; 6] = [
        OutputFormat::Csv,
        OutputFormat::Tif,
        OutputFormat::Dta,
        OutputFormat::Asc,
        OutputFormat::Grd,
        OutputFormat::Rds,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            OutputFormat::Csv => "csv",
            OutputFormat::Tif => "tif",
            OutputFormat::Dta => "dta",
            OutputFormat::Asc => "asc",
            OutputFormat::Grd => "grd",
            OutputFormat::Rds => "rds",
        }
    }
}

impl fmt::Display for OutputFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for OutputFormat {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        let wanted = s.trim().to_ascii_lowercase();
        OutputFormat::ALL
            .into_iter()
            .find(|f| f.as_str() == wanted)
            .ok_or_else(|| {
                let allowed: Vec<&str> = OutputFormat::ALL.iter().map(|f| f.as_str()).collect();
                Error::invalid(format!(
                    "unsupported output format {s:?}, expected one of: {}",
                    allowed.join(", ")
                ))
            })
    }
}

/// Shape of the follow-up retrieval. One decoder per variant.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OutputKind {
    /// Tabular result as JSON records.
    Json,
    /// Rendered PNG image.
    Plot,
    /// Zip bundle of the session's output files.
    Zip,
}

impl OutputKind {
    /// A plot request wins over a file format; no format means a JSON table.
    pub fn for_request(format: Option<OutputFormat>, plot: bool) -> Self {
        match (plot, format) {
            (true, _) => OutputKind::Plot,
            (false, Some(_)) => OutputKind::Zip,
            (false, None) => OutputKind::Json,
        }
    }

    /// Path below `/ocpu/tmp/{session}/`.
    pub fn path_suffix(&self) -> &'static str {
        match self {
            OutputKind::Json => "R/.val/json",
            OutputKind::Plot => "graphics/1/png",
            OutputKind::Zip => "zip",
        }
    }

    /// Decode a follow-up body. `status` is only used for error reporting.
    pub fn decode(&self, status: u16, body: Vec<u8>) -> Result<Content> {
        match self {
            OutputKind::Json => serde_json::from_slice::<Value>(&body)
                .map(Content::Table)
                .map_err(|e| Error::Upstream {
                    status,
                    message: format!("malformed JSON response: {e}"),
                }),
            OutputKind::Plot => Ok(Content::Image(body)),
            OutputKind::Zip => Ok(Content::Archive(body)),
        }
    }
}

impl fmt::Display for OutputKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            OutputKind::Json => "json",
            OutputKind::Plot => "plot",
            OutputKind::Zip => "zip",
        };
        f.write_str(s)
    }
}

/// A CELL5M query, built up before handing it to [`crate::Client::query`].
///
/// ```
/// use hcapi_rs::{OutputFormat, Query};
///
/// let q = Query::new(["cass_y", "maiz_y"])
///     .countries(["CIV", "GHA"])
///     .group_by(["ADM1_NAME_ALT"])
///     .format(OutputFormat::Csv);
/// assert_eq!(q.countries, vec!["CIV", "GHA"]);
/// ```
#[derive(Debug, Clone, PartialEq)]
pub struct Query {
    pub indicators: Vec<String>,
    pub countries: Vec<String>,
    pub group_by: Option<Vec<String>>,
    pub format: Option<OutputFormat>,
    pub plot: bool,
    pub options: Map<String, Value>,
}

impl Query {
    pub fn new<I, S>(indicators: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            indicators: indicators.into_iter().map(Into::into).collect(),
            countries: vec![DEFAULT_SCOPE.to_string()],
            group_by: None,
            format: None,
            plot: false,
            options: Map::new(),
        }
    }

    pub fn countries<I, S>(mut self, codes: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.countries = codes.into_iter().map(Into::into).collect();
        self
    }

    pub fn group_by<I, S>(mut self, fields: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.group_by = Some(fields.into_iter().map(Into::into).collect());
        self
    }

    pub fn format(mut self, format: OutputFormat) -> Self {
        self.format = Some(format);
        self
    }

    /// Parse and set the output format; unknown names are `InvalidArgument`.
    pub fn format_str(self, format: &str) -> Result<Self> {
        Ok(self.format(format.parse()?))
    }

    /// Ask for the rendered map instead of data.
    pub fn plot(mut self, plot: bool) -> Self {
        self.plot = plot;
        self
    }

    /// Passthrough option forwarded verbatim in the request body.
    pub fn option(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.options.insert(key.into(), value.into());
        self
    }

    pub fn output_kind(&self) -> OutputKind {
        OutputKind::for_request(self.format, self.plot)
    }
}

/// JSON body of the computation request.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RequestBody {
    pub indicators: Vec<String>,
    pub country_or_region_codes: Vec<String>,
    pub group_by: Option<Vec<String>>,
    pub output_format: Option<OutputFormat>,
    #[serde(flatten)]
    pub extra_options: Map<String, Value>,
}

/// Parsed payload of the follow-up request.
#[derive(Debug, Clone, PartialEq)]
pub enum Content {
    Table(Value),
    Image(Vec<u8>),
    Archive(Vec<u8>),
}

impl Content {
    pub fn as_table(&self) -> Option<&Value> {
        match self {
            Content::Table(v) => Some(v),
            _ => None,
        }
    }

    /// Raw bytes of an image or archive.
    pub fn as_bytes(&self) -> Option<&[u8]> {
        match self {
            Content::Image(b) | Content::Archive(b) => Some(b),
            Content::Table(_) => None,
        }
    }

    /// Rows of a table result that is a JSON array.
    pub fn records(&self) -> Option<&Vec<Value>> {
        self.as_table().and_then(Value::as_array)
    }
}

/// Metadata of the response that produced a [`CellResult`].
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ResponseMeta {
    pub url: String,
    pub status: u16,
    pub content_type: Option<String>,
    pub session: String,
    pub kind: OutputKind,
    pub content_length: usize,
    pub headers: Vec<(String, String)>,
    pub fetched_at: DateTime<Utc>,
}

/// Result of one query: parsed content plus response metadata.
#[derive(Debug, Clone, PartialEq)]
pub struct CellResult {
    content: Content,
    meta: ResponseMeta,
}

impl CellResult {
    pub fn new(content: Content, meta: ResponseMeta) -> Self {
        Self { content, meta }
    }

    pub fn content(&self) -> &Content {
        &self.content
    }

    pub fn meta(&self) -> &ResponseMeta {
        &self.meta
    }

    pub fn into_content(self) -> Content {
        self.content
    }

    pub fn into_parts(self) -> (Content, ResponseMeta) {
        (self.content, self.meta)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn output_format_parses_case_insensitively() {
        assert_eq!("CSV".parse::<OutputFormat>().unwrap(), OutputFormat::Csv);
        assert_eq!(" tif ".parse::<OutputFormat>().unwrap(), OutputFormat::Tif);
        let err = "xlsx".parse::<OutputFormat>().unwrap_err();
        assert!(err.is_invalid_argument());
        assert!(err.to_string().contains("csv, tif, dta, asc, grd, rds"));
    }

    #[test]
    fn output_kind_follows_plot_then_format() {
        assert_eq!(OutputKind::for_request(None, false), OutputKind::Json);
        assert_eq!(
            OutputKind::for_request(Some(OutputFormat::Dta), false),
            OutputKind::Zip
        );
        assert_eq!(
            OutputKind::for_request(Some(OutputFormat::Dta), true),
            OutputKind::Plot
        );
        assert_eq!(OutputKind::Json.path_suffix(), "R/.val/json");
    }

    #[test]
    fn json_decode_failure_is_upstream_error() {
        let err = OutputKind::Json.decode(200, b"not json".to_vec()).unwrap_err();
        assert_eq!(err.status(), Some(200));
        let ok = OutputKind::Json.decode(200, b"[1,2]".to_vec()).unwrap();
        assert_eq!(ok, Content::Table(json!([1, 2])));
        let img = OutputKind::Plot.decode(200, vec![1, 2, 3]).unwrap();
        assert_eq!(img.as_bytes(), Some(&[1u8, 2, 3][..]));
    }

    #[test]
    fn request_body_uses_wire_names_and_flattens_options() {
        let mut extra = Map::new();
        extra.insert("collapse".into(), json!(true));
        let body = RequestBody {
            indicators: vec!["cass_y".into()],
            country_or_region_codes: vec!["CIV".into()],
            group_by: None,
            output_format: Some(OutputFormat::Grd),
            extra_options: extra,
        };
        let v = serde_json::to_value(&body).unwrap();
        assert_eq!(
            v,
            json!({
                "indicators": ["cass_y"],
                "countryOrRegionCodes": ["CIV"],
                "groupBy": null,
                "outputFormat": "grd",
                "collapse": true
            })
        );
    }

    #[test]
    fn query_defaults_to_ssa() {
        let q = Query::new(["cass_y"]);
        assert_eq!(q.countries, vec![DEFAULT_SCOPE]);
        assert_eq!(q.output_kind(), OutputKind::Json);
        assert!(Query::new(["cass_y"]).format_str("bogus").is_err());
    }
}
