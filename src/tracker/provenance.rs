//! Descriptive tags attached to a tractogram.
use crate::proposer::{ModelFamily, TrackingMode};
use serde::Serialize;
use std::collections::BTreeMap;

/// Coded value plus its human-readable meaning.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
pub struct Code {
    pub value: &'static str,
    pub meaning: &'static str,
}

impl Code {
    const fn new(value: &'static str, meaning: &'static str) -> Self {
        Self { value, meaning }
    }
}

const ANATOMY: Code = Code::new("T-A0095", "White matter of brain and spinal cord");

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Provenance {
    pub anatomy: Code,
    pub algorithm: Code,
    pub model: Code,
}

impl Provenance {
    /// Tags for a run driven by a proposer of the given identity.
    pub fn describe(mode: TrackingMode, model: ModelFamily, interpolates: bool) -> Self {
        let algorithm = match (mode, model, interpolates) {
            (TrackingMode::Deterministic, ModelFamily::Tensor { .. }, false) => {
                Code::new("sup181_ee04", "FACT")
            }
            (TrackingMode::Deterministic, _, _) => Code::new("sup181_ee01", "Deterministic"),
            (TrackingMode::Probabilistic, _, _) => Code::new("sup181_ee02", "Probabilistic"),
        };
        let model = match model {
            ModelFamily::Tensor { tensor_count } if tensor_count > 1 => {
                Code::new("sup181_bb02", "Multi Tensor")
            }
            ModelFamily::Tensor { .. } | ModelFamily::Odf { from_tensor: true } => {
                Code::new("sup181_bb01", "Single Tensor")
            }
            ModelFamily::RandomForest => Code::new("sup181_bb03", "Model Free"),
            ModelFamily::Odf { from_tensor: false } => Code::new("-", "ODF"),
            ModelFamily::Peaks => Code::new("-", "Peaks"),
        };
        Self {
            anatomy: ANATOMY,
            algorithm,
            model,
        }
    }

    /// Flat `DICOM.*` key/value tags.
    pub fn tags(&self) -> BTreeMap<&'static str, &'static str> {
        BTreeMap::from([
            ("DICOM.anatomy.value", self.anatomy.value),
            ("DICOM.anatomy.meaning", self.anatomy.meaning),
            ("DICOM.algo_code.value", self.algorithm.value),
            ("DICOM.algo_code.meaning", self.algorithm.meaning),
            ("DICOM.model_code.value", self.model.value),
            ("DICOM.model_code.meaning", self.model.meaning),
        ])
    }
}
