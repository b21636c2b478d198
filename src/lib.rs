//! hcapi_rs
//!
//! A thin Rust client for the HarvestChoice **CELL5M** data API. Pairs with the
//! `hcapi` CLI.
//!
//! ### Features
//! - Validate indicator, country and group-by codes against the bundled catalog
//! - Run a query and retrieve it as a JSON table, a rendered map or a zip bundle
//! - Save tables as CSV or JSON, unpack bundles
//! - Quick per-column summary statistics (min, max, mean, median)
//!
//! ### Example
//! ```no_run
//! use hcapi_rs::{Client, ClientConfig, OutputFormat, Query};
//!
//! let client = Client::with_config(ClientConfig::new("http://hcapi.harvestchoice.org"))?;
//! let table = client.query(&Query::new(["cass_y", "maiz_y"]).countries(["CIV", "GHA"]))?;
//! hcapi_rs::storage::save_result(&table, "yields.csv")?;
//! println!("{}", table.summary());
//!
//! let bundle = client.query(&Query::new(["cass_y"]).format(OutputFormat::Tif))?;
//! hcapi_rs::storage::save_result(&bundle, "cass_y.zip")?;
//! # Ok::<(), hcapi_rs::Error>(())
//! ```

pub mod api;
pub mod catalog;
pub mod config;
pub mod error;
pub mod models;
pub mod plot;
pub mod storage;
pub mod summary;

pub use api::Client;
pub use catalog::{Catalog, IndicatorMeta, Palette};
pub use config::ClientConfig;
pub use error::{Error, Result};
pub use models::{CellResult, Content, OutputFormat, OutputKind, Query, ResponseMeta};
pub use plot::RasterPlotter;
pub use summary::Summary;
