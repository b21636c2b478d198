//! Static reference tables shipped with the crate.
//!
//! The indicator catalog, the country/region code list and the colour palettes
//! are parsed once into a [`Catalog`] and then only read. A client holds it
//! behind an `Arc`, so validation never touches shared mutable state.

use crate::error::{Error, Result};
use ahash::AHashMap;
use regex::RegexBuilder;
use serde::{Deserialize, Serialize};
use std::io::Read;

const INDICATORS_CSV: &str = include_str!("../data/indicators.csv");
const COUNTRIES_CSV: &str = include_str!("../data/countries.csv");
const PALETTES_CSV: &str = include_str!("../data/palettes.csv");

/// Kind of values an indicator layer holds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum IndicatorType {
    /// Categorical layer (zones, names, ids).
    Class,
    Continuous,
}

/// One row of the indicator catalog.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IndicatorMeta {
    pub code: String,
    pub label: String,
    pub unit: Option<String>,
    pub cat1: String,
    pub cat2: Option<String>,
    pub cat3: Option<String>,
    #[serde(rename = "type")]
    pub kind: IndicatorType,
    pub source: Option<String>,
}

impl IndicatorMeta {
    /// Category path joined with ` > `, e.g. `Farming > Production > Roots and Tubers`.
    pub fn category_path(&self) -> String {
        std::iter::once(self.cat1.as_str())
            .chain(self.cat2.as_deref())
            .chain(self.cat3.as_deref())
            .collect::<Vec<_>>()
            .join(" > ")
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Country {
    pub code: String,
    pub label: String,
}

/// RGB colour.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Rgb {
    pub r: u8,
    pub g: u8,
    pub b: u8,
}

impl Rgb {
    pub fn new(r: u8, g: u8, b: u8) -> Self {
        Self { r, g, b }
    }

    /// Parse `#RRGGBB` (the leading `#` is optional).
    pub fn from_hex(s: &str) -> Option<Self> {
        let hex = s.trim().trim_start_matches('#');
        if hex.len() != 6 || !hex.is_ascii() {
            return None;
        }
        let channel = |i: usize| u8::from_str_radix(&hex[i..i + 2], 16).ok();
        Some(Self::new(channel(0)?, channel(2)?, channel(4)?))
    }

    pub fn to_hex(&self) -> String {
        format!("#{:02X}{:02X}{:02X}", self.r, self.g, self.b)
    }
}

/// Named colour ramp.
#[derive(Debug, Clone, PartialEq)]
pub struct Palette {
    pub name: String,
    pub colors: Vec<Rgb>,
}

impl Palette {
    /// Colour for a position in `[0, 1]`, snapped to the nearest ramp step.
    pub fn color_at(&self, t: f64) -> Option<Rgb> {
        if self.colors.is_empty() {
            return None;
        }
        let t = if t.is_finite() { t.clamp(0.0, 1.0) } else { 0.0 };
        let idx = (t * (self.colors.len() - 1) as f64).round() as usize;
        self.colors.get(idx).copied()
    }
}

#[derive(Debug, Deserialize)]
struct PaletteRow {
    name: String,
    colors: String,
}

/// Indicator catalog, country code list and palettes.
#[derive(Debug, Clone)]
pub struct Catalog {
    indicators: Vec<IndicatorMeta>,
    indicator_index: AHashMap<String, usize>,
    countries: Vec<Country>,
    country_index: AHashMap<String, usize>,
    palettes: Vec<Palette>,
    palette_index: AHashMap<String, usize>,
}

fn read_rows<T, R>(rdr: R, table: &str) -> Result<Vec<T>>
where
    T: serde::de::DeserializeOwned,
    R: Read,
{
    let mut reader = csv::ReaderBuilder::new().trim(csv::Trim::All).from_reader(rdr);
    reader
        .deserialize()
        .collect::<std::result::Result<Vec<T>, _>>()
        .map_err(|e| Error::Catalog(format!("{table}: {e}")))
}

fn index_by<T>(rows: &[T], key: impl Fn(&T) -> &str, table: &str) -> Result<AHashMap<String, usize>> {
    let mut index = AHashMap::with_capacity(rows.len());
    for (i, row) in rows.iter().enumerate() {
        let k = key(row);
        if index.insert(k.to_string(), i).is_some() {
            return Err(Error::Catalog(format!("{table}: duplicate key {k:?}")));
        }
    }
    Ok(index)
}

impl Catalog {
    /// Tables embedded in the crate.
    pub fn bundled() -> Result<Self> {
        Self::from_csv(
            INDICATORS_CSV.as_bytes(),
            COUNTRIES_CSV.as_bytes(),
            PALETTES_CSV.as_bytes(),
        )
    }

    /// Build a catalog from CSV sources with the same columns as the bundled files.
    pub fn from_csv(indicators: impl Read, countries: impl Read, palettes: impl Read) -> Result<Self> {
        let indicators: Vec<IndicatorMeta> = read_rows(indicators, "indicators")?;
        let mut countries: Vec<Country> = read_rows(countries, "countries")?;
        for c in &mut countries {
            c.code = c.code.to_ascii_uppercase();
        }

        let mut palette_list = Vec::new();
        for row in read_rows::<PaletteRow, _>(palettes, "palettes")? {
            let colors = row
                .colors
                .split(';')
                .filter(|s| !s.trim().is_empty())
                .map(|s| {
                    Rgb::from_hex(s).ok_or_else(|| {
                        Error::Catalog(format!("palettes: bad colour {s:?} in {:?}", row.name))
                    })
                })
                .collect::<Result<Vec<_>>>()?;
            palette_list.push(Palette {
                name: row.name,
                colors,
            });
        }

        Ok(Self {
            indicator_index: index_by(&indicators, |i| i.code.as_str(), "indicators")?,
            country_index: index_by(&countries, |c| c.code.as_str(), "countries")?,
            palette_index: index_by(&palette_list, |p| p.name.as_str(), "palettes")?,
            indicators,
            countries,
            palettes: palette_list,
        })
    }

    pub fn indicators(&self) -> &[IndicatorMeta] {
        &self.indicators
    }

    pub fn countries(&self) -> &[Country] {
        &self.countries
    }

    pub fn palettes(&self) -> &[Palette] {
        &self.palettes
    }

    /// Indicator codes are matched exactly.
    pub fn indicator(&self, code: &str) -> Option<&IndicatorMeta> {
        self.indicator_index.get(code).map(|&i| &self.indicators[i])
    }

    /// ISO3 codes are matched after trimming and upper-casing.
    pub fn country(&self, code: &str) -> Option<&Country> {
        self.country_index
            .get(&code.trim().to_ascii_uppercase())
            .map(|&i| &self.countries[i])
    }

    pub fn palette(&self, name: &str) -> Option<&Palette> {
        self.palette_index.get(name).map(|&i| &self.palettes[i])
    }

    /// Case-insensitive regex search over indicator codes and labels.
    pub fn search_indicators(&self, pattern: &str) -> Result<Vec<&IndicatorMeta>> {
        let re = RegexBuilder::new(pattern)
            .case_insensitive(true)
            .build()
            .map_err(|e| Error::invalid(format!("bad search pattern: {e}")))?;
        Ok(self
            .indicators
            .iter()
            .filter(|m| re.is_match(&m.code) || re.is_match(&m.label))
            .collect())
    }

    pub fn indicators_in_category(&self, cat1: &str) -> Vec<&IndicatorMeta> {
        self.indicators
            .iter()
            .filter(|m| m.cat1.eq_ignore_ascii_case(cat1))
            .collect()
    }

    /// Every code must be in the indicator catalog. `role` names the argument in errors.
    pub fn check_indicators(&self, codes: &[String], role: &str) -> Result<()> {
        let unknown: Vec<&str> = codes
            .iter()
            .map(String::as_str)
            .filter(|c| self.indicator(c).is_none())
            .collect();
        if unknown.is_empty() {
            Ok(())
        } else {
            Err(Error::invalid(format!(
                "{role}: unknown indicator code(s): {}",
                unknown.join(", ")
            )))
        }
    }

    /// Every code must be in the country/region list. Returns the normalized codes.
    pub fn check_countries(&self, codes: &[String]) -> Result<Vec<String>> {
        let mut out = Vec::with_capacity(codes.len());
        let mut unknown = Vec::new();
        for code in codes {
            match self.country(code) {
                Some(c) => out.push(c.code.clone()),
                None => unknown.push(code.as_str()),
            }
        }
        if unknown.is_empty() {
            Ok(out)
        } else {
            Err(Error::invalid(format!(
                "unknown country or region code(s): {}",
                unknown.join(", ")
            )))
        }
    }
}
