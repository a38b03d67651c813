use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::metadata::{MetadataError, Polarity, ValidatedMetadata};
use crate::resolution::{rp_at_reference, select_resolution_params};
use crate::settings::DefaultAdducts;

pub const DEFAULT_PPM: f64 = 3.0;
pub const IMAGE_NLEVELS: u32 = 30;
pub const IMAGE_QUANTILE: u32 = 99;
pub const HMDB_NAME: &str = "HMDB";
pub const HMDB_DEFAULT_VERSION: &str = "2016";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProcessingConfig {
    pub databases: Vec<DatabaseSelection>,
    pub isotope_generation: IsotopeGeneration,
    pub image_generation: ImageGeneration,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DatabaseSelection {
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub version: Option<String>,
}

impl DatabaseSelection {
    pub fn named(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            version: None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IsotopeGeneration {
    pub adducts: Vec<String>,
    pub charge: Charge,
    pub isocalc_sigma: f64,
    pub isocalc_pts_per_mz: u32,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Charge {
    pub polarity: Polarity,
    pub n_charges: u32,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ImageGeneration {
    pub ppm: f64,
    pub nlevels: u32,
    pub q: u32,
    pub do_preprocessing: bool,
}

/// Validates a raw metadata document and derives its processing config.
pub fn generate_processing_config(
    metadata: &Value,
    default_adducts: &DefaultAdducts,
) -> Result<ProcessingConfig, MetadataError> {
    let validated = ValidatedMetadata::from_value(metadata)?;
    Ok(ProcessingConfig::generate(&validated, default_adducts))
}

impl ProcessingConfig {
    pub fn generate(metadata: &ValidatedMetadata, default_adducts: &DefaultAdducts) -> Self {
        let rp200 = rp_at_reference(&metadata.analyzer, metadata.mz, metadata.resolving_power);
        let params = select_resolution_params(rp200);

        let adducts = match &metadata.adducts {
            Some(adducts) => adducts.clone(),
            None => default_adducts.for_polarity(metadata.polarity).to_vec(),
        };

        ProcessingConfig {
            databases: database_selections(&metadata.databases),
            isotope_generation: IsotopeGeneration {
                adducts,
                charge: Charge {
                    polarity: metadata.polarity,
                    n_charges: 1,
                },
                isocalc_sigma: params.rounded_sigma(),
                isocalc_pts_per_mz: params.pts_per_mz,
            },
            image_generation: ImageGeneration {
                ppm: metadata.ppm.unwrap_or(DEFAULT_PPM),
                nlevels: IMAGE_NLEVELS,
                q: IMAGE_QUANTILE,
                do_preprocessing: false,
            },
        }
    }
}

/// One selection per requested name, plus HMDB 2016 when HMDB was not asked for.
pub fn database_selections(names: &[String]) -> Vec<DatabaseSelection> {
    let mut selections: Vec<DatabaseSelection> =
        names.iter().map(DatabaseSelection::named).collect();

    if !selections.iter().any(|db| db.name == HMDB_NAME) {
        selections.push(DatabaseSelection {
            name: HMDB_NAME.to_string(),
            version: Some(HMDB_DEFAULT_VERSION.to_string()),
        });
    }
    selections
}
