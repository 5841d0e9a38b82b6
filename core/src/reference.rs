//! Read-only reference tables: countries, names, email domains,
//! smartphones and the country crime index.
//!
//! Loaded once per run from `<data_dir>/ref/*.json`. In tests, use
//! `ReferenceData::default_test()`.

use crate::{
    error::{GenError, GenResult},
    sampling::counts_to_proportions,
    types::{CountryAlpha, CountryNumeric},
};
use serde::{de::DeserializeOwned, Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap};

const PROPORTION_TOLERANCE: f64 = 1e-9;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CountryRecord {
    pub iso_numeric: CountryNumeric,
    pub iso_alpha2: CountryAlpha,
    pub population: u64,
    pub name: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NameRecord {
    pub iso_numeric: CountryNumeric,
    pub name: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EmailDomainRecord {
    pub domain: String,
    pub proportion: f64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SmartphoneRecord {
    pub model: String,
    #[serde(default)]
    pub rating: Option<f64>,
    pub os: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CrimeIndexRecord {
    pub country_code: CountryAlpha,
    pub crime_index: f64,
}

#[derive(Debug, Clone)]
pub struct ReferenceData {
    pub countries: Vec<CountryRecord>,
    pub first_names: Vec<NameRecord>,
    pub last_names: Vec<NameRecord>,
    pub email_domains: Vec<EmailDomainRecord>,
    pub smartphones: Vec<SmartphoneRecord>,
    pub crime_index: Vec<CrimeIndexRecord>,
}

fn load_table<T: DeserializeOwned>(data_dir: &str, file: &str) -> GenResult<Vec<T>> {
    let path = format!("{data_dir}/ref/{file}");
    let content = std::fs::read_to_string(&path)
        .map_err(|e| GenError::reference(&path, format!("cannot read: {e}")))?;
    serde_json::from_str(&content)
        .map_err(|e| GenError::reference(&path, format!("malformed table: {e}")))
}

impl ReferenceData {
    /// Load every reference table from `<data_dir>/ref/`.
    pub fn load(data_dir: &str) -> GenResult<Self> {
        let data = Self {
            countries: load_table(data_dir, "countries_europe.json")?,
            first_names: load_table(data_dir, "first_names.json")?,
            last_names: load_table(data_dir, "last_names.json")?,
            email_domains: load_table(data_dir, "email_domains.json")?,
            smartphones: load_table(data_dir, "smartphones.json")?,
            crime_index: load_table(data_dir, "country_crime_index.json")?,
        };
        data.validate()?;
        log::info!(
            "reference: {} countries, {} first names, {} last names, {} domains, {} smartphones",
            data.countries.len(),
            data.first_names.len(),
            data.last_names.len(),
            data.email_domains.len(),
            data.smartphones.len()
        );
        Ok(data)
    }

    /// Structural checks: non-empty tables, non-negative weights with a
    /// positive total.
    pub fn validate(&self) -> GenResult<()> {
        if self.countries.is_empty() {
            return Err(GenError::reference("countries", "table is empty"));
        }
        if self.countries.iter().map(|c| c.population).sum::<u64>() == 0 {
            return Err(GenError::reference("countries", "population total must be positive"));
        }
        if self.first_names.is_empty() {
            return Err(GenError::reference("first_names", "table is empty"));
        }
        if self.last_names.is_empty() {
            return Err(GenError::reference("last_names", "table is empty"));
        }
        let mut domain_total = 0.0;
        for d in &self.email_domains {
            if !d.proportion.is_finite() || d.proportion < 0.0 {
                return Err(GenError::reference(
                    "email_domains",
                    format!("domain '{}' has invalid proportion {}", d.domain, d.proportion),
                ));
            }
            domain_total += d.proportion;
        }
        if domain_total <= 0.0 {
            return Err(GenError::reference("email_domains", "proportion total must be positive"));
        }
        if self.android_smartphones().is_empty() {
            return Err(GenError::reference("smartphones", "no android models"));
        }
        if self.crime_index.iter().any(|c| !c.crime_index.is_finite() || c.crime_index < 0.0) {
            return Err(GenError::reference("country_crime_index", "crime index must be >= 0"));
        }
        Ok(())
    }

    /// (iso numeric, population proportion) in table order.
    pub fn population_proportions(&self) -> GenResult<Vec<(CountryNumeric, f64)>> {
        let counts: HashMap<CountryNumeric, u64> = self
            .countries
            .iter()
            .map(|c| (c.iso_numeric, c.population))
            .collect();
        let props = counts_to_proportions(&counts);
        let total: f64 = props.values().sum();
        if (total - 1.0).abs() > PROPORTION_TOLERANCE {
            return Err(GenError::InvariantViolation(format!(
                "population proportions sum to {total}, expected 1.0"
            )));
        }
        Ok(self
            .countries
            .iter()
            .map(|c| (c.iso_numeric, props.get(&c.iso_numeric).copied().unwrap_or(0.0)))
            .collect())
    }

    /// ISO numeric -> ISO alpha-2.
    pub fn country_code_map(&self) -> HashMap<CountryNumeric, CountryAlpha> {
        self.countries
            .iter()
            .map(|c| (c.iso_numeric, c.iso_alpha2.clone()))
            .collect()
    }

    /// Names grouped by country, in table order within each country.
    pub fn names_by_country(records: &[NameRecord]) -> BTreeMap<CountryNumeric, Vec<&str>> {
        let mut grouped: BTreeMap<CountryNumeric, Vec<&str>> = BTreeMap::new();
        for r in records {
            grouped.entry(r.iso_numeric).or_default().push(r.name.as_str());
        }
        grouped
    }

    /// (domain, normalised popularity) in table order.
    pub fn email_domain_proportions(&self) -> Vec<(&str, f64)> {
        let total: f64 = self.email_domains.iter().map(|d| d.proportion).sum();
        self.email_domains
            .iter()
            .map(|d| (d.domain.as_str(), d.proportion / total))
            .collect()
    }

    pub fn android_smartphones(&self) -> Vec<&SmartphoneRecord> {
        self.smartphones
            .iter()
            .filter(|s| s.os.eq_ignore_ascii_case("android"))
            .collect()
    }

    /// (model, popularity) for android models; popularity is the rating
    /// share, with missing ratings imputed by the mean rating.
    pub fn device_popularity(&self) -> Vec<(&str, f64)> {
        let phones = self.android_smartphones();
        let rated: Vec<f64> = phones.iter().filter_map(|p| p.rating).collect();
        let mean = if rated.is_empty() {
            1.0
        } else {
            rated.iter().sum::<f64>() / rated.len() as f64
        };
        let ratings: Vec<f64> = phones.iter().map(|p| p.rating.unwrap_or(mean)).collect();
        let total: f64 = ratings.iter().sum();
        phones
            .iter()
            .zip(ratings)
            .map(|(p, r)| {
                let share = if total > 0.0 { r / total } else { 1.0 / phones.len() as f64 };
                (p.model.as_str(), share)
            })
            .collect()
    }

    /// Small, fixed reference set for unit and integration tests.
    pub fn default_test() -> Self {
        let countries = vec![
            ("DE", 276, 83_000_000u64, "Germany"),
            ("FR", 250, 67_000_000, "France"),
            ("IE", 372, 5_000_000, "Ireland"),
            ("IT", 380, 59_000_000, "Italy"),
        ];
        let first = [
            (276, &["Lukas", "Anna", "Jonas", "Mia"][..]),
            (250, &["Louis", "Chloe", "Hugo", "Lea"][..]),
            (372, &["Sean", "Aoife", "Conor", "Niamh"][..]),
            (380, &["Marco", "Giulia", "Luca", "Sofia"][..]),
        ];
        let last = [
            (276, &["Muller", "Schmidt", "Schneider"][..]),
            (250, &["Martin", "Bernard", "Dubois"][..]),
            (372, &["Murphy", "Kelly", "Byrne"][..]),
            (380, &["Rossi", "Russo", "Ferrari"][..]),
        ];
        let expand = |table: &[(CountryNumeric, &[&str])]| -> Vec<NameRecord> {
            table
                .iter()
                .flat_map(|(code, names)| {
                    names.iter().map(move |n| NameRecord {
                        iso_numeric: *code,
                        name: n.to_string(),
                    })
                })
                .collect()
        };
        Self {
            countries: countries
                .into_iter()
                .map(|(alpha, numeric, population, name)| CountryRecord {
                    iso_numeric: numeric,
                    iso_alpha2: alpha.into(),
                    population,
                    name: name.into(),
                })
                .collect(),
            first_names: expand(&first),
            last_names: expand(&last),
            email_domains: [("gmail.com", 0.6), ("yahoo.com", 0.25), ("web.de", 0.1), ("eircom.net", 0.05)]
                .into_iter()
                .map(|(domain, proportion)| EmailDomainRecord {
                    domain: domain.into(),
                    proportion,
                })
                .collect(),
            smartphones: vec![
                SmartphoneRecord { model: "Galaxy S21".into(), rating: Some(4.5), os: "android".into() },
                SmartphoneRecord { model: "Pixel 6".into(), rating: Some(4.0), os: "android".into() },
                SmartphoneRecord { model: "Redmi Note 10".into(), rating: None, os: "android".into() },
                SmartphoneRecord { model: "iPhone 13".into(), rating: Some(4.8), os: "ios".into() },
            ],
            crime_index: [("DE", 35.8), ("FR", 53.7), ("IE", 46.9), ("IT", 44.9)]
                .into_iter()
                .map(|(code, index)| CrimeIndexRecord {
                    country_code: code.into(),
                    crime_index: index,
                })
                .collect(),
        }
    }
}
