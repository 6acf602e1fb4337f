use std::fmt;

use serde::{Deserialize, Serialize};

macro_rules! id_newtype {
    ($name:ident) => {
        #[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
        pub struct $name(pub i64);

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, "{}", self.0)
            }
        }
    };
}

id_newtype!(SymptomId);
id_newtype!(FacilityId);
id_newtype!(DoctorId);
id_newtype!(MedicineId);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FlowKind {
    SymptomCheck,
    Login,
    Register,
}

impl FlowKind {
    pub fn as_str(self) -> &'static str {
        match self {
            FlowKind::SymptomCheck => "symptom_check",
            FlowKind::Login => "login",
            FlowKind::Register => "register",
        }
    }
}

impl fmt::Display for FlowKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Gender {
    #[serde(rename = "Laki-laki")]
    Male,
    #[serde(rename = "Perempuan")]
    Female,
}

impl Gender {
    pub const ALL: [Gender; 2] = [Gender::Male, Gender::Female];

    pub fn label(self) -> &'static str {
        match self {
            Gender::Male => "Laki-laki",
            Gender::Female => "Perempuan",
        }
    }

    pub fn from_label(raw: &str) -> Option<Self> {
        let raw = raw.trim();
        Self::ALL
            .into_iter()
            .find(|gender| gender.label().eq_ignore_ascii_case(raw))
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum BloodType {
    A,
    B,
    AB,
    O,
}

impl BloodType {
    pub const ALL: [BloodType; 4] = [BloodType::A, BloodType::B, BloodType::AB, BloodType::O];

    pub fn label(self) -> &'static str {
        match self {
            BloodType::A => "A",
            BloodType::B => "B",
            BloodType::AB => "AB",
            BloodType::O => "O",
        }
    }

    pub fn from_label(raw: &str) -> Option<Self> {
        let raw = raw.trim();
        Self::ALL
            .into_iter()
            .find(|blood_type| blood_type.label().eq_ignore_ascii_case(raw))
    }
}

/// How long the user has had the reported symptoms.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SymptomDuration {
    LessThanOneDay,
    OneDayToOneWeek,
    OneWeekToOneMonth,
    OneMonthToOneYear,
    MoreThanOneYear,
}

impl SymptomDuration {
    pub const ALL: [SymptomDuration; 5] = [
        SymptomDuration::LessThanOneDay,
        SymptomDuration::OneDayToOneWeek,
        SymptomDuration::OneWeekToOneMonth,
        SymptomDuration::OneMonthToOneYear,
        SymptomDuration::MoreThanOneYear,
    ];

    pub fn label(self) -> &'static str {
        match self {
            SymptomDuration::LessThanOneDay => "Kurang dari 1 Hari",
            SymptomDuration::OneDayToOneWeek => "1 Hari - 1 Minggu",
            SymptomDuration::OneWeekToOneMonth => "1 Minggu - 1 Bulan",
            SymptomDuration::OneMonthToOneYear => "1 Bulan - 1 Tahun",
            SymptomDuration::MoreThanOneYear => "Lebih dari 1 Tahun",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Severity {
    Mild,
    Moderate,
    Severe,
}

impl Severity {
    pub const ALL: [Severity; 3] = [Severity::Mild, Severity::Moderate, Severity::Severe];

    pub fn label(self) -> &'static str {
        match self {
            Severity::Mild => "Ringan",
            Severity::Moderate => "Sedang",
            Severity::Severe => "Parah",
        }
    }
}

/// Masks all but the first two and last two digits, e.g. `08*******90`.
pub fn mask_phone(phone: &str) -> String {
    let chars: Vec<char> = phone.chars().collect();
    if chars.len() <= 4 {
        return "*".repeat(chars.len());
    }
    let mut masked = String::with_capacity(chars.len());
    masked.extend(&chars[..2]);
    masked.extend(std::iter::repeat('*').take(chars.len() - 4));
    masked.extend(&chars[chars.len() - 2..]);
    masked
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn choice_labels_parse_case_insensitively() {
        assert_eq!(Gender::from_label(" perempuan "), Some(Gender::Female));
        assert_eq!(BloodType::from_label("ab"), Some(BloodType::AB));
        assert_eq!(BloodType::from_label("C"), None);
    }

    #[test]
    fn masks_phone_numbers_for_logs() {
        assert_eq!(mask_phone("081234567890"), "08********90");
        assert_eq!(mask_phone("123"), "***");
    }
}
