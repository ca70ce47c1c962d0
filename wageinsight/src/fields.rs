//! Field vocabulary shared by the option loader, the orchestrator and the front ends
//!
//! Everything here is immutable: field keys, their display labels, the field
//! sets for each form mode, the yes/no flip table for binary attributes and the
//! canonical education ordering.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

/// Key of a single form field, as understood by the prediction service
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum FieldKey {
    Occ,
    Ind,
    Educ,
    DegField1,
    DegField2,
    Race,
    WorkState,
    Sex,
    Marst,
    VetStat,
    Hispan,
    Citizen,
    SpeakEng,
    Age,
}

/// Binary attributes evaluated by the comparison panel, in display order
pub const BINARY_FIELDS: [FieldKey; 6] = [
    FieldKey::Sex,
    FieldKey::Marst,
    FieldKey::VetStat,
    FieldKey::Hispan,
    FieldKey::Citizen,
    FieldKey::SpeakEng,
];

const BASIC_FIELDS: [FieldKey; 5] = [
    FieldKey::Occ,
    FieldKey::Ind,
    FieldKey::DegField1,
    FieldKey::Educ,
    FieldKey::WorkState,
];

const ADVANCED_FIELDS: [FieldKey; 13] = [
    FieldKey::Sex,
    FieldKey::Marst,
    FieldKey::VetStat,
    FieldKey::Hispan,
    FieldKey::Citizen,
    FieldKey::SpeakEng,
    FieldKey::Occ,
    FieldKey::Ind,
    FieldKey::Educ,
    FieldKey::DegField1,
    FieldKey::DegField2,
    FieldKey::Race,
    FieldKey::WorkState,
];

/// Canonical ordering of education levels, lowest first
pub const EDUC_ORDER: [&str; 15] = [
    "N/A or no schooling",
    "Nursery school to grade 4",
    "Grade 5",
    "Grade 6",
    "Grade 7",
    "Grade 8",
    "Grade 9",
    "Grade 10",
    "Grade 11",
    "Grade 12",
    "1 year of college",
    "2 years of college",
    "3 years of college",
    "4 years of college",
    "5+ years of college",
];

impl FieldKey {
    pub const ALL: [FieldKey; 14] = [
        FieldKey::Occ,
        FieldKey::Ind,
        FieldKey::Educ,
        FieldKey::DegField1,
        FieldKey::DegField2,
        FieldKey::Race,
        FieldKey::WorkState,
        FieldKey::Sex,
        FieldKey::Marst,
        FieldKey::VetStat,
        FieldKey::Hispan,
        FieldKey::Citizen,
        FieldKey::SpeakEng,
        FieldKey::Age,
    ];

    /// Wire name of the field
    pub fn as_str(&self) -> &'static str {
        match self {
            FieldKey::Occ => "OCC",
            FieldKey::Ind => "IND",
            FieldKey::Educ => "EDUC",
            FieldKey::DegField1 => "DEGFIELD1",
            FieldKey::DegField2 => "DEGFIELD2",
            FieldKey::Race => "RACE",
            FieldKey::WorkState => "WORKSTATE",
            FieldKey::Sex => "SEX",
            FieldKey::Marst => "MARST",
            FieldKey::VetStat => "VETSTAT",
            FieldKey::Hispan => "HISPAN",
            FieldKey::Citizen => "CITIZEN",
            FieldKey::SpeakEng => "SPEAKENG",
            FieldKey::Age => "AGE",
        }
    }

    /// Human-readable label shown next to the field
    pub fn label(&self) -> &'static str {
        match self {
            FieldKey::Occ => "Occupation",
            FieldKey::Ind => "Industry",
            FieldKey::Educ => "Education Level",
            FieldKey::DegField1 => "1st Degree Field",
            FieldKey::DegField2 => "2nd Degree Field",
            FieldKey::Race => "Race",
            FieldKey::WorkState => "Work State",
            FieldKey::Sex => "Gender",
            FieldKey::Marst => "Marital Status",
            FieldKey::VetStat => "Veteran Status",
            FieldKey::Hispan => "Hispanic Origin",
            FieldKey::Citizen => "Citizenship",
            FieldKey::SpeakEng => "English Fluency",
            FieldKey::Age => "Age",
        }
    }

    /// The two values of a binary attribute, or `None` for categorical fields
    pub fn binary_values(&self) -> Option<[&'static str; 2]> {
        match self {
            FieldKey::Sex => Some(["Man", "Woman"]),
            FieldKey::Marst => Some(["Married", "Not married"]),
            FieldKey::VetStat => Some(["Veteran", "Not a veteran"]),
            FieldKey::Hispan => Some(["Hispanic", "Not Hispanic"]),
            FieldKey::Citizen => Some(["Citizen", "Not citizen"]),
            FieldKey::SpeakEng => Some(["Speaks English", "Does not speak English"]),
            _ => None,
        }
    }

    pub fn is_binary(&self) -> bool {
        self.binary_values().is_some()
    }

    /// Opposite value of a binary attribute
    ///
    /// Returns `None` when the field is not binary or `value` is not one of
    /// its two known values.
    pub fn flip(&self, value: &str) -> Option<&'static str> {
        let [yes, no] = self.binary_values()?;
        match value {
            v if v == yes => Some(no),
            v if v == no => Some(yes),
            _ => None,
        }
    }

    /// Static option file backing this field's dropdown
    pub fn option_file(&self) -> Option<&'static str> {
        match self {
            FieldKey::Occ => Some("occupation.csv"),
            FieldKey::Ind => Some("industry.csv"),
            FieldKey::Educ => Some("educ.csv"),
            FieldKey::DegField1 | FieldKey::DegField2 => Some("degree.csv"),
            FieldKey::Race => Some("race.csv"),
            FieldKey::WorkState => Some("state.csv"),
            _ => None,
        }
    }

    /// Canonical ordering that overrides lexical sorting, if any
    pub fn canonical_order(&self) -> Option<&'static [&'static str]> {
        match self {
            FieldKey::Educ => Some(&EDUC_ORDER),
            _ => None,
        }
    }
}

impl fmt::Display for FieldKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for FieldKey {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let wanted = s.trim().to_ascii_uppercase();
        FieldKey::ALL
            .into_iter()
            .find(|key| key.as_str() == wanted)
            .ok_or_else(|| format!("unknown field key: {s}"))
    }
}

/// Form mode controlling which fields are required
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Mode {
    #[default]
    Basic,
    Advanced,
}

impl Mode {
    /// Required fields for this mode, in the order they are validated
    pub fn fields(&self) -> &'static [FieldKey] {
        match self {
            Mode::Basic => &BASIC_FIELDS,
            Mode::Advanced => &ADVANCED_FIELDS,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Mode::Basic => "basic",
            Mode::Advanced => "advanced",
        }
    }
}

impl fmt::Display for Mode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Mode {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "basic" => Ok(Mode::Basic),
            "advanced" => Ok(Mode::Advanced),
            other => Err(format!("unknown mode: {other} (expected basic or advanced)")),
        }
    }
}

/// User-selected field values
///
/// Serializes as a flat JSON object keyed by wire names, e.g.
/// `{"OCC": "Engineer", "EDUC": "4 years of college"}`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(
    try_from = "BTreeMap<String, String>",
    into = "BTreeMap<String, String>"
)]
pub struct FormInputs {
    values: BTreeMap<FieldKey, String>,
}

impl FormInputs {
    pub fn new() -> Self {
        Self::default()
    }

    /// Set a field; an empty value clears it
    pub fn set(&mut self, field: FieldKey, value: impl Into<String>) {
        let value = value.into();
        if value.trim().is_empty() {
            self.values.remove(&field);
        } else {
            self.values.insert(field, value);
        }
    }

    pub fn with(mut self, field: FieldKey, value: impl Into<String>) -> Self {
        self.set(field, value);
        self
    }

    pub fn get(&self, field: FieldKey) -> Option<&str> {
        self.values.get(&field).map(String::as_str)
    }

    pub fn is_filled(&self, field: FieldKey) -> bool {
        self.get(field).is_some_and(|v| !v.trim().is_empty())
    }

    /// First field of `fields` without a usable value
    pub fn first_missing(&self, fields: &[FieldKey]) -> Option<FieldKey> {
        fields.iter().copied().find(|f| !self.is_filled(*f))
    }

    pub fn clear(&mut self) {
        self.values.clear();
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (FieldKey, &str)> {
        self.values.iter().map(|(k, v)| (*k, v.as_str()))
    }
}

impl TryFrom<BTreeMap<String, String>> for FormInputs {
    type Error = String;

    fn try_from(raw: BTreeMap<String, String>) -> Result<Self, Self::Error> {
        let mut inputs = FormInputs::new();
        for (key, value) in raw {
            inputs.set(key.parse()?, value);
        }
        Ok(inputs)
    }
}

impl From<FormInputs> for BTreeMap<String, String> {
    fn from(inputs: FormInputs) -> Self {
        inputs
            .values
            .into_iter()
            .map(|(k, v)| (k.as_str().to_string(), v))
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_field_key_parsing() {
        assert_eq!("OCC".parse::<FieldKey>(), Ok(FieldKey::Occ));
        assert_eq!("degfield2".parse::<FieldKey>(), Ok(FieldKey::DegField2));
        assert!("SALARY".parse::<FieldKey>().is_err());

        for key in FieldKey::ALL {
            assert_eq!(key.as_str().parse::<FieldKey>(), Ok(key));
        }
    }

    #[test]
    fn test_flip_is_symmetric() {
        for field in BINARY_FIELDS {
            let [yes, no] = field.binary_values().unwrap();
            assert_eq!(field.flip(yes), Some(no));
            assert_eq!(field.flip(no), Some(yes));
        }
        assert_eq!(FieldKey::Sex.flip("Other"), None);
        assert_eq!(FieldKey::Occ.flip("Engineer"), None);
    }

    #[test]
    fn test_mode_fields() {
        assert_eq!(Mode::Basic.fields().len(), 5);
        assert_eq!(Mode::Advanced.fields().len(), 13);
        for field in Mode::Basic.fields() {
            assert!(Mode::Advanced.fields().contains(field));
        }
        assert!(!Mode::Advanced.fields().contains(&FieldKey::Age));
    }

    #[test]
    fn test_degree_fields_share_option_file() {
        assert_eq!(
            FieldKey::DegField1.option_file(),
            FieldKey::DegField2.option_file()
        );
        assert!(FieldKey::Sex.option_file().is_none());
    }

    #[test]
    fn test_inputs_empty_value_clears() {
        let mut inputs = FormInputs::new().with(FieldKey::Occ, "Engineer");
        assert!(inputs.is_filled(FieldKey::Occ));

        inputs.set(FieldKey::Occ, "   ");
        assert!(!inputs.is_filled(FieldKey::Occ));
        assert!(inputs.is_empty());
    }

    #[test]
    fn test_first_missing_follows_field_order() {
        let inputs = FormInputs::new()
            .with(FieldKey::Occ, "Engineer")
            .with(FieldKey::Educ, "Grade 12");
        assert_eq!(
            inputs.first_missing(Mode::Basic.fields()),
            Some(FieldKey::Ind)
        );
    }

    #[test]
    fn test_inputs_json_shape() {
        let inputs = FormInputs::new()
            .with(FieldKey::Occ, "Engineer")
            .with(FieldKey::WorkState, "CA");
        let json = serde_json::to_value(&inputs).unwrap();
        assert_eq!(json, serde_json::json!({"OCC": "Engineer", "WORKSTATE": "CA"}));

        let back: FormInputs = serde_json::from_value(json).unwrap();
        assert_eq!(back, inputs);

        let bad = serde_json::from_value::<FormInputs>(serde_json::json!({"NOPE": "x"}));
        assert!(bad.is_err());
    }
}
