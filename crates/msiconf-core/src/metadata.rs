//! Experiment metadata as submitted by users, and the validation pass that
//! turns it into something the config generator can trust.
//!
//! The raw document is deserialized leniently (every field optional, unknown
//! fields ignored) so that validation can name exactly which field is wrong
//! instead of surfacing a generic serde message.

use serde::{Deserialize, Serialize};
use serde_json::Value;
use thiserror::Error;

#[derive(Debug, Clone, Error, PartialEq)]
pub enum MetadataError {
    #[error("missing required field {0}")]
    Missing(&'static str),
    #[error("unrecognized polarity {0:?}, expected \"Positive\" or \"Negative\"")]
    InvalidPolarity(String),
    #[error("{field} is not numeric: {value}")]
    NotNumeric { field: &'static str, value: String },
    #[error("{field} must be a finite number greater than zero, got {value}")]
    OutOfRange { field: &'static str, value: f64 },
    #[error("invalid molecule database selection: {0}")]
    InvalidDatabase(String),
    #[error("invalid adduct list: {0}")]
    InvalidAdducts(String),
    #[error("malformed metadata document: {0}")]
    Malformed(String),
}

const POLARITY_FIELD: &str = "MS_Analysis.Polarity";
const ANALYZER_FIELD: &str = "MS_Analysis.Analyzer";
const RESOLVING_POWER_FIELD: &str = "MS_Analysis.Detector_Resolving_Power";
const RP_MZ_FIELD: &str = "MS_Analysis.Detector_Resolving_Power.mz";
const RP_VALUE_FIELD: &str = "MS_Analysis.Detector_Resolving_Power.Resolving_Power";
const DATABASE_FIELD: &str = "metaspace_options.Metabolite_Database";
const PPM_FIELD: &str = "metaspace_options.ppm";

/// Ion polarity. Serializes as the charge symbol used downstream.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Polarity {
    #[serde(rename = "+")]
    Positive,
    #[serde(rename = "-")]
    Negative,
}

impl Polarity {
    /// Parses the polarity as written in `MS_Analysis.Polarity`. Exact match only.
    pub fn from_metadata(value: &str) -> Option<Self> {
        match value {
            "Positive" => Some(Polarity::Positive),
            "Negative" => Some(Polarity::Negative),
            _ => None,
        }
    }

    pub fn symbol(self) -> &'static str {
        match self {
            Polarity::Positive => "+",
            Polarity::Negative => "-",
        }
    }
}

/// Mass analyzer family. Only FTICR and Orbitrap get resolving-power normalization.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Analyzer {
    Fticr,
    Orbitrap,
    Other(String),
}

impl Analyzer {
    pub fn from_name(name: &str) -> Self {
        match name {
            "FTICR" => Analyzer::Fticr,
            "Orbitrap" => Analyzer::Orbitrap,
            other => Analyzer::Other(other.to_string()),
        }
    }
}

/// `Metabolite_Database` is either a single name or a list of names.
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(untagged)]
pub enum DatabaseField {
    One(String),
    Many(Vec<String>),
}

impl DatabaseField {
    pub fn into_names(self) -> Vec<String> {
        match self {
            DatabaseField::One(name) => vec![name],
            DatabaseField::Many(names) => names,
        }
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct ExperimentMetadata {
    #[serde(rename = "MS_Analysis", default)]
    pub ms_analysis: Option<MsAnalysis>,
    #[serde(rename = "metaspace_options", default)]
    pub options: Option<MetaspaceOptions>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct MsAnalysis {
    #[serde(rename = "Polarity", default)]
    pub polarity: Option<String>,
    #[serde(rename = "Analyzer", default)]
    pub analyzer: Option<String>,
    #[serde(rename = "Detector_Resolving_Power", default)]
    pub resolving_power: Option<ResolvingPowerSpec>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct ResolvingPowerSpec {
    #[serde(default)]
    pub mz: Option<Value>,
    #[serde(rename = "Resolving_Power", default)]
    pub resolving_power: Option<Value>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct MetaspaceOptions {
    #[serde(default)]
    pub ppm: Option<Value>,
    #[serde(rename = "Metabolite_Database", default)]
    pub databases: Option<DatabaseField>,
    #[serde(rename = "Adducts", default)]
    pub adducts: Option<Value>,
}

/// Metadata that passed validation. Every field the generator reads is typed.
#[derive(Debug, Clone, PartialEq)]
pub struct ValidatedMetadata {
    pub polarity: Polarity,
    pub analyzer: Analyzer,
    pub mz: f64,
    pub resolving_power: f64,
    pub ppm: Option<f64>,
    pub databases: Vec<String>,
    pub adducts: Option<Vec<String>>,
}

impl ExperimentMetadata {
    pub fn from_value(value: &Value) -> Result<Self, MetadataError> {
        if !value.is_object() {
            return Err(MetadataError::Malformed(format!(
                "expected a JSON object, found {}",
                json_kind(value)
            )));
        }
        Self::deserialize(value).map_err(|err| MetadataError::Malformed(err.to_string()))
    }

    pub fn validate(&self) -> Result<ValidatedMetadata, MetadataError> {
        let analysis = self
            .ms_analysis
            .as_ref()
            .ok_or(MetadataError::Missing("MS_Analysis"))?;

        let polarity_raw = analysis
            .polarity
            .as_deref()
            .ok_or(MetadataError::Missing(POLARITY_FIELD))?;
        let polarity = Polarity::from_metadata(polarity_raw)
            .ok_or_else(|| MetadataError::InvalidPolarity(polarity_raw.to_string()))?;

        let analyzer = analysis
            .analyzer
            .as_deref()
            .map(Analyzer::from_name)
            .ok_or(MetadataError::Missing(ANALYZER_FIELD))?;

        let rp = analysis
            .resolving_power
            .as_ref()
            .ok_or(MetadataError::Missing(RESOLVING_POWER_FIELD))?;
        let mz = parse_positive(RP_MZ_FIELD, rp.mz.as_ref())?;
        let resolving_power = parse_positive(RP_VALUE_FIELD, rp.resolving_power.as_ref())?;

        let options = self
            .options
            .as_ref()
            .ok_or(MetadataError::Missing("metaspace_options"))?;

        let databases = options
            .databases
            .clone()
            .ok_or(MetadataError::Missing(DATABASE_FIELD))?
            .into_names();
        if let Some(position) = databases.iter().position(|name| name.trim().is_empty()) {
            return Err(MetadataError::InvalidDatabase(format!(
                "entry {position} has an empty name"
            )));
        }

        let ppm = match options.ppm.as_ref() {
            Some(value) => Some(parse_positive(PPM_FIELD, Some(value))?),
            None => None,
        };

        let adducts = options.adducts.as_ref().map(parse_adducts).transpose()?;

        Ok(ValidatedMetadata {
            polarity,
            analyzer,
            mz,
            resolving_power,
            ppm,
            databases,
            adducts,
        })
    }
}

impl ValidatedMetadata {
    pub fn from_value(value: &Value) -> Result<Self, MetadataError> {
        ExperimentMetadata::from_value(value)?.validate()
    }
}

fn parse_positive(field: &'static str, value: Option<&Value>) -> Result<f64, MetadataError> {
    let value = value.ok_or(MetadataError::Missing(field))?;
    let number = match value {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => s.trim().parse::<f64>().ok(),
        _ => None,
    }
    .ok_or_else(|| MetadataError::NotNumeric {
        field,
        value: value.to_string(),
    })?;

    if !number.is_finite() || number <= 0.0 {
        return Err(MetadataError::OutOfRange {
            field,
            value: number,
        });
    }
    Ok(number)
}

fn parse_adducts(value: &Value) -> Result<Vec<String>, MetadataError> {
    let items = value.as_array().ok_or_else(|| {
        MetadataError::InvalidAdducts(format!(
            "expected a list of strings, found {}",
            json_kind(value)
        ))
    })?;

    items
        .iter()
        .enumerate()
        .map(|(position, item)| match item.as_str() {
            Some(adduct) if !adduct.trim().is_empty() => Ok(adduct.to_string()),
            Some(_) => Err(MetadataError::InvalidAdducts(format!("entry {position} is empty"))),
            None => Err(MetadataError::InvalidAdducts(format!(
                "entry {position} is {}, expected a string",
                json_kind(item)
            ))),
        })
        .collect()
}

fn json_kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "an array",
        Value::Object(_) => "an object",
    }
}
