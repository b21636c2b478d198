//! Synchronous client for the **HarvestChoice CELL5M API**.
//!
//! The service is an OpenCPU deployment. A query is two round-trips:
//! a POST to `/ocpu/library/hcapi3/R/hcapi` that runs the computation and
//! answers with a session id in the `X-ocpu-session` header, then a GET below
//! `/ocpu/tmp/{session}/` whose path depends on the requested [`OutputKind`].
//!
//! ### Notes
//! - Every code is checked against the bundled [`Catalog`] before anything is
//!   sent; bad input never reaches the network.
//! - Failures are not retried. One failed round-trip ends the call.
//!
//! Typical usage:
//! ```no_run
//! # use hcapi_rs::{Client, ClientConfig, Query};
//! let client = Client::with_config(ClientConfig::from_env()?)?;
//! let result = client.query(&Query::new(["cass_y"]).countries(["CIV"]))?;
//! println!("{result}");
//! # Ok::<(), hcapi_rs::Error>(())
//! ```

use crate::catalog::Catalog;
use crate::config::ClientConfig;
use crate::error::{Error, Result};
use crate::models::{CellResult, OutputKind, Query, RESERVED_KEYS, RequestBody, ResponseMeta};
use chrono::Utc;
use percent_encoding::{AsciiSet, NON_ALPHANUMERIC};
use reqwest::blocking::{Client as HttpClient, Response};
use reqwest::header::CONTENT_TYPE;
use reqwest::redirect::Policy;
use std::sync::Arc;

/// Computation endpoint, relative to the base URL.
pub const COMPUTE_PATH: &str = "/ocpu/library/hcapi3/R/hcapi";
/// Response header carrying the session id.
pub const SESSION_HEADER: &str = "x-ocpu-session";

// Session ids are plain tokens; escape anything else before it lands in a path.
const SAFE: &AsciiSet = &NON_ALPHANUMERIC.remove(b'-').remove(b'_').remove(b'.');

#[derive(Debug, Clone)]
pub struct Client {
    config: ClientConfig,
    catalog: Arc<Catalog>,
    http: HttpClient,
}

impl Client {
    /// Client over an explicit configuration and catalog.
    pub fn new(config: ClientConfig, catalog: Arc<Catalog>) -> Result<Self> {
        let http = HttpClient::builder()
            .timeout(config.timeout)
            .connect_timeout(config.connect_timeout)
            .redirect(Policy::limited(5))
            .user_agent(concat!("hcapi_rs/", env!("CARGO_PKG_VERSION")))
            .build()?;
        Ok(Self {
            config,
            catalog,
            http,
        })
    }

    /// Client over the bundled catalog.
    pub fn with_config(config: ClientConfig) -> Result<Self> {
        Self::new(config, Arc::new(Catalog::bundled()?))
    }

    /// Configuration from `HCAPI_URL` / `.hcapirc`, bundled catalog.
    pub fn from_env() -> Result<Self> {
        Self::with_config(ClientConfig::from_env()?)
    }

    pub fn base_url(&self) -> &str {
        &self.config.base_url
    }

    pub fn config(&self) -> &ClientConfig {
        &self.config
    }

    pub fn catalog(&self) -> &Catalog {
        &self.catalog
    }

    /// Check a query against the catalog and build the request body.
    ///
    /// Indicators and group-by fields must be catalog codes, country codes must
    /// be in the ISO3 list, and passthrough options may not shadow the named keys.
    pub fn validate(&self, query: &Query) -> Result<RequestBody> {
        if query.indicators.is_empty() {
            return Err(Error::invalid("at least one indicator code required"));
        }
        self.catalog.check_indicators(&query.indicators, "indicators")?;

        if query.countries.is_empty() {
            return Err(Error::invalid("at least one country/region code required"));
        }
        let codes = self.catalog.check_countries(&query.countries)?;

        let group_by = match &query.group_by {
            Some(by) if !by.is_empty() => {
                self.catalog.check_indicators(by, "groupBy")?;
                Some(by.clone())
            }
            _ => None,
        };

        if let Some(key) = RESERVED_KEYS.iter().find(|k| query.options.contains_key(**k)) {
            return Err(Error::invalid(format!(
                "option {key:?} clashes with a named query argument"
            )));
        }

        Ok(RequestBody {
            indicators: query.indicators.clone(),
            country_or_region_codes: codes,
            group_by,
            output_format: query.format,
            extra_options: query.options.clone(),
        })
    }

    /// Run a query: validate, compute, then retrieve the result for its output kind.
    pub fn query(&self, query: &Query) -> Result<CellResult> {
        let body = self.validate(query)?;
        let session = self.compute(&body)?;
        self.retrieve(&session, query.output_kind())
    }

    /// String-based shorthand for [`Client::query`].
    ///
    /// - `indicators`: catalog codes, e.g. `"cass_y"`.
    /// - `countries`: ISO3 codes; an empty slice means the default `SSA` scope.
    /// - `format`: one of `csv`, `tif`, `dta`, `asc`, `grd`, `rds`.
    pub fn fetch(
        &self,
        indicators: &[&str],
        countries: &[&str],
        group_by: Option<&[&str]>,
        format: Option<&str>,
    ) -> Result<CellResult> {
        let mut q = Query::new(indicators.iter().copied());
        if !countries.is_empty() {
            q = q.countries(countries.iter().copied());
        }
        if let Some(by) = group_by {
            q = q.group_by(by.iter().copied());
        }
        if let Some(f) = format {
            q = q.format_str(f)?;
        }
        self.query(&q)
    }

    /// POST the computation request and return the session id.
    fn compute(&self, body: &RequestBody) -> Result<String> {
        let url = format!("{}{}", self.config.base_url, COMPUTE_PATH);
        log::debug!("POST {url}");
        let resp = self.http.post(&url).json(body).send()?;
        let resp = check_status(&url, resp)?;
        let status = resp.status().as_u16();

        let session = resp
            .headers()
            .get(SESSION_HEADER)
            .and_then(|v| v.to_str().ok())
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .map(str::to_string);
        match session {
            Some(s) => {
                log::debug!("session {s}");
                Ok(s)
            }
            None => Err(Error::Upstream {
                status,
                message: format!("response from {url} carries no {SESSION_HEADER} header"),
            }),
        }
    }

    /// GET the session output and decode it for `kind`.
    fn retrieve(&self, session: &str, kind: OutputKind) -> Result<CellResult> {
        let url = format!(
            "{}/ocpu/tmp/{}/{}",
            self.config.base_url,
            percent_encoding::utf8_percent_encode(session, SAFE),
            kind.path_suffix()
        );
        log::debug!("GET {url}");
        let resp = check_status(&url, self.http.get(&url).send()?)?;

        let status = resp.status().as_u16();
        let content_type = resp
            .headers()
            .get(CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .map(str::to_string);
        let headers = resp
            .headers()
            .iter()
            .map(|(k, v)| {
                (
                    k.as_str().to_string(),
                    String::from_utf8_lossy(v.as_bytes()).into_owned(),
                )
            })
            .collect();
        let body = resp.bytes()?.to_vec();

        let meta = ResponseMeta {
            url,
            status,
            content_type,
            session: session.to_string(),
            kind,
            content_length: body.len(),
            headers,
            fetched_at: Utc::now(),
        };
        let content = kind.decode(status, body)?;
        Ok(CellResult::new(content, meta))
    }
}

/// Pass 2xx responses through; anything else becomes an upstream error with the body text.
fn check_status(url: &str, resp: Response) -> Result<Response> {
    let status = resp.status();
    log::debug!("{url} -> HTTP {status}");
    if status.is_success() {
        return Ok(resp);
    }
    let text = resp.text().unwrap_or_default();
    log::warn!("request to {url} failed with HTTP {status}");
    Err(Error::upstream(status.as_u16(), &text))
}
