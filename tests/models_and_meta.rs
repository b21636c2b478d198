use hcapi_rs::catalog::IndicatorType;
use hcapi_rs::{Catalog, OutputFormat, OutputKind};
use regex::Regex;
use std::collections::BTreeMap;

#[test]
fn every_output_format_round_trips_through_its_name() {
    for f in OutputFormat::ALL {
        assert_eq!(f.as_str().parse::<OutputFormat>().unwrap(), f);
        assert_eq!(serde_json::to_value(f).unwrap(), f.as_str());
    }
}

#[test]
fn follow_up_paths_per_kind() {
    assert_eq!(OutputKind::Json.path_suffix(), "R/.val/json");
    assert_eq!(OutputKind::Plot.path_suffix(), "graphics/1/png");
    assert_eq!(OutputKind::Zip.path_suffix(), "zip");
}

#[test]
fn bundled_catalog_covers_common_layers() {
    let cat = Catalog::bundled().unwrap();
    for code in ["cass_y", "maiz_y", "PN05_TOT", "AEZ16_CLAS", "ADM1_NAME_ALT"] {
        assert!(cat.indicator(code).is_some(), "missing {code}");
    }
    assert_eq!(
        cat.indicator("AEZ16_CLAS").unwrap().kind,
        IndicatorType::Class
    );
    // codes are case-sensitive for indicators
    assert!(cat.indicator("CASS_Y").is_none());
}

#[test]
fn country_list_is_iso3_and_includes_ssa() {
    let cat = Catalog::bundled().unwrap();
    assert!(cat.countries().iter().all(|c| c.code.len() == 3));
    assert_eq!(cat.country("SSA").unwrap().label, "Sub-Saharan Africa");
    assert_eq!(cat.country("civ").unwrap().label, "Cote d'Ivoire");
    assert!(cat.country("FRA").is_none());
}

#[test]
fn palette_names_are_unique_and_non_empty() {
    let cat = Catalog::bundled().unwrap();
    let mut names: Vec<&str> = cat.palettes().iter().map(|p| p.name.as_str()).collect();
    let n = names.len();
    names.sort();
    names.dedup();
    assert_eq!(names.len(), n);
    assert!(cat.palettes().iter().all(|p| !p.colors.is_empty()));
}

#[test]
fn every_spam_crop_has_all_four_layers() {
    let cat = Catalog::bundled().unwrap();
    let layer = Regex::new(r"^([a-z]{4})_([hpvy])$").unwrap();
    let mut crops: BTreeMap<&str, Vec<&str>> = BTreeMap::new();
    for m in cat.indicators() {
        if let Some(c) = layer.captures(&m.code) {
            let (crop, kind) = (c.get(1).unwrap().as_str(), c.get(2).unwrap().as_str());
            crops.entry(crop).or_default().push(kind);
        }
    }
    assert!(crops.len() >= 40, "only {} crops bundled", crops.len());
    for (crop, mut kinds) in crops {
        kinds.sort();
        assert_eq!(kinds, vec!["h", "p", "v", "y"], "incomplete layers for {crop}");
    }
    for code in ["sorg_h", "whea_h", "bean_h", "cass_p"] {
        assert!(cat.indicator(code).is_some(), "missing {code}");
    }
}

#[test]
fn class_layers_carry_no_unit() {
    let cat = Catalog::bundled().unwrap();
    for m in cat.indicators() {
        assert_ne!(m.unit.as_deref(), Some("class"), "{} has its type as unit", m.code);
    }
}

#[test]
fn region_aggregates_are_listed() {
    let cat = Catalog::bundled().unwrap();
    for code in ["SSA", "ESA", "WCA"] {
        assert!(cat.country(code).is_some(), "missing region {code}");
    }
}
