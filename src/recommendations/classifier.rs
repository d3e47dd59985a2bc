// Vehicle classification for rule applicability
//
// Rules can restrict themselves to broad vehicle classes (sedan, SUV, truck,
// hatchback). Classification from make/model is a heuristic, not a structured
// taxonomy, so it lives behind a trait and is allowed to answer "unknown".

use serde::{Deserialize, Serialize};
use std::fmt;

/// Broad vehicle class used by rule applicability filters
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum VehicleClass {
    Sedan,
    Suv,
    Truck,
    Hatchback,
}

impl fmt::Display for VehicleClass {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            VehicleClass::Sedan => write!(f, "sedan"),
            VehicleClass::Suv => write!(f, "suv"),
            VehicleClass::Truck => write!(f, "truck"),
            VehicleClass::Hatchback => write!(f, "hatchback"),
        }
    }
}

/// Maps a vehicle's make/model to a [`VehicleClass`]
///
/// Returning `None` means "unknown"; unknown vehicles match every rule, so a
/// misclassification can only over-recommend, never hide a rule.
pub trait VehicleClassifier {
    fn classify(&self, make: &str, model: &str) -> Option<VehicleClass>;
}

/// Substring-based classifier over a small fixed vocabulary
///
/// The vocabulary is deliberately not exhaustive. Model names are checked
/// before makes since model names carry more signal ("F-150" beats "Ford").
pub struct MakeModelClassifier;

/// (needle, class) pairs checked against the lowercased model, then make
const MODEL_VOCABULARY: &[(&str, VehicleClass)] = &[
    ("f-150", VehicleClass::Truck),
    ("f150", VehicleClass::Truck),
    ("silverado", VehicleClass::Truck),
    ("tundra", VehicleClass::Truck),
    ("tacoma", VehicleClass::Truck),
    ("ram", VehicleClass::Truck),
    ("ranger", VehicleClass::Truck),
    ("rav4", VehicleClass::Suv),
    ("cr-v", VehicleClass::Suv),
    ("crv", VehicleClass::Suv),
    ("highlander", VehicleClass::Suv),
    ("explorer", VehicleClass::Suv),
    ("outback", VehicleClass::Suv),
    ("4runner", VehicleClass::Suv),
    ("wrangler", VehicleClass::Suv),
    ("suburban", VehicleClass::Suv),
    ("camry", VehicleClass::Sedan),
    ("corolla", VehicleClass::Sedan),
    ("civic", VehicleClass::Sedan),
    ("accord", VehicleClass::Sedan),
    ("altima", VehicleClass::Sedan),
    ("sonata", VehicleClass::Sedan),
    ("jetta", VehicleClass::Sedan),
    ("golf", VehicleClass::Hatchback),
    ("fit", VehicleClass::Hatchback),
    ("yaris", VehicleClass::Hatchback),
    ("impreza", VehicleClass::Hatchback),
];

impl VehicleClassifier for MakeModelClassifier {
    fn classify(&self, make: &str, model: &str) -> Option<VehicleClass> {
        let model = model.to_lowercase();
        let make = make.to_lowercase();

        for (needle, class) in MODEL_VOCABULARY {
            if model.contains(needle) {
                return Some(*class);
            }
        }

        // Generic hints sometimes baked into the model string itself
        for (hint, class) in [
            ("truck", VehicleClass::Truck),
            ("pickup", VehicleClass::Truck),
            ("suv", VehicleClass::Suv),
            ("crossover", VehicleClass::Suv),
            ("sedan", VehicleClass::Sedan),
            ("hatchback", VehicleClass::Hatchback),
        ] {
            if model.contains(hint) || make.contains(hint) {
                return Some(class);
            }
        }

        None
    }
}

/// Classifier that always answers the same class; used in tests to pin
/// applicability behavior without depending on the vocabulary
pub struct FixedClassifier(pub Option<VehicleClass>);

impl VehicleClassifier for FixedClassifier {
    fn classify(&self, _make: &str, _model: &str) -> Option<VehicleClass> {
        self.0
    }
}
