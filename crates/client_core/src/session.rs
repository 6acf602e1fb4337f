//! Accumulated input of one in-progress flow.

use std::{
    collections::{BTreeSet, HashMap},
    fmt,
};

use serde::{Deserialize, Serialize};
use shared::{
    domain::{BloodType, FlowKind, Gender, Severity, SymptomDuration, SymptomId},
    protocol::UserData,
};
use uuid::Uuid;

use crate::{
    error::{FlowError, ValidationError},
    steps::{self, Step},
    validation,
};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Field {
    PhoneNumber,
    OtpCode,
    Password,
    ConfirmPassword,
    FirstName,
    LastName,
    Email,
    Nik,
    Address,
    City,
    Province,
    BirthDate,
    Gender,
    BloodType,
    SymptomText,
    Symptoms,
    Duration,
    Severity,
}

impl Field {
    pub const ALL: [Field; 18] = [
        Field::PhoneNumber,
        Field::OtpCode,
        Field::Password,
        Field::ConfirmPassword,
        Field::FirstName,
        Field::LastName,
        Field::Email,
        Field::Nik,
        Field::Address,
        Field::City,
        Field::Province,
        Field::BirthDate,
        Field::Gender,
        Field::BloodType,
        Field::SymptomText,
        Field::Symptoms,
        Field::Duration,
        Field::Severity,
    ];

    pub fn name(self) -> &'static str {
        match self {
            Field::PhoneNumber => "phone_number",
            Field::OtpCode => "otp_code",
            Field::Password => "password",
            Field::ConfirmPassword => "confirm_password",
            Field::FirstName => "first_name",
            Field::LastName => "last_name",
            Field::Email => "email",
            Field::Nik => "nik",
            Field::Address => "address",
            Field::City => "city",
            Field::Province => "province",
            Field::BirthDate => "birth_date",
            Field::Gender => "gender",
            Field::BloodType => "blood_type",
            Field::SymptomText => "symptom_text",
            Field::Symptoms => "symptoms",
            Field::Duration => "duration",
            Field::Severity => "severity",
        }
    }

    pub fn from_name(name: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|field| field.name() == name)
    }

    fn accepts(self, value: &FieldValue) -> bool {
        matches!(
            (self, value),
            (Field::Symptoms, FieldValue::Symptoms(_))
                | (Field::Gender, FieldValue::Gender(_))
                | (Field::BloodType, FieldValue::BloodType(_))
                | (Field::Duration, FieldValue::Duration(_))
                | (Field::Severity, FieldValue::Severity(_))
        ) || (value.is_text() && self.is_text())
    }

    fn is_text(self) -> bool {
        !matches!(
            self,
            Field::Symptoms | Field::Gender | Field::BloodType | Field::Duration | Field::Severity
        )
    }
}

impl fmt::Display for Field {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum FieldValue {
    Text(String),
    Symptoms(BTreeSet<SymptomId>),
    Gender(Gender),
    BloodType(BloodType),
    Duration(SymptomDuration),
    Severity(Severity),
}

impl FieldValue {
    pub fn text(value: impl Into<String>) -> Self {
        FieldValue::Text(value.into())
    }

    fn is_text(&self) -> bool {
        matches!(self, FieldValue::Text(_))
    }

    /// A value counts as filled when it is not blank text or an empty selection.
    pub fn is_filled(&self) -> bool {
        match self {
            FieldValue::Text(text) => !text.trim().is_empty(),
            FieldValue::Symptoms(selected) => !selected.is_empty(),
            _ => true,
        }
    }
}

/// OTP progress for the phone number currently held by the session.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Verification {
    pub otp_sent: bool,
    pub verification_id: Option<String>,
    pub verified: bool,
}

#[derive(Debug, Clone)]
pub struct Session {
    id: Uuid,
    flow: FlowKind,
    step: Step,
    fields: HashMap<Field, FieldValue>,
    verification: Verification,
}

impl Session {
    pub fn new(flow: FlowKind) -> Self {
        Self {
            id: Uuid::new_v4(),
            flow,
            step: steps::initial_step(flow),
            fields: HashMap::new(),
            verification: Verification::default(),
        }
    }

    pub fn id(&self) -> Uuid {
        self.id
    }

    pub fn flow(&self) -> FlowKind {
        self.flow
    }

    pub fn step(&self) -> Step {
        self.step
    }

    pub fn verification(&self) -> &Verification {
        &self.verification
    }

    pub fn get(&self, field: Field) -> Option<&FieldValue> {
        self.fields.get(&field)
    }

    pub fn has(&self, field: Field) -> bool {
        self.fields.contains_key(&field)
    }

    pub fn fields(&self) -> &HashMap<Field, FieldValue> {
        &self.fields
    }

    /// Stores a value. Only fields entered on the current step are accepted;
    /// earlier values are edited by going back to their step.
    pub fn set(&mut self, field: Field, value: FieldValue) -> Result<(), FlowError> {
        if !field.accepts(&value) {
            return Err(FlowError::WrongValueKind { field });
        }
        self.ensure_available(field)?;

        if field == Field::PhoneNumber && self.fields.get(&field) != Some(&value) {
            self.verification = Verification::default();
        }
        self.fields.insert(field, value);
        Ok(())
    }

    /// Wipes every field and returns to the first step of the flow.
    pub fn clear(&mut self) {
        self.id = Uuid::new_v4();
        self.step = steps::initial_step(self.flow);
        self.fields.clear();
        self.verification = Verification::default();
    }

    /// Returns `true` when the symptom was not selected before.
    pub fn add_symptom(&mut self, id: SymptomId) -> Result<bool, FlowError> {
        self.ensure_available(Field::Symptoms)?;
        let entry = self
            .fields
            .entry(Field::Symptoms)
            .or_insert_with(|| FieldValue::Symptoms(BTreeSet::new()));
        match entry {
            FieldValue::Symptoms(selected) => Ok(selected.insert(id)),
            _ => Err(FlowError::WrongValueKind {
                field: Field::Symptoms,
            }),
        }
    }

    pub fn remove_symptom(&mut self, id: SymptomId) -> Result<bool, FlowError> {
        self.ensure_available(Field::Symptoms)?;
        Ok(match self.fields.get_mut(&Field::Symptoms) {
            Some(FieldValue::Symptoms(selected)) => selected.remove(&id),
            _ => false,
        })
    }

    pub fn selected_symptoms(&self) -> BTreeSet<SymptomId> {
        match self.fields.get(&Field::Symptoms) {
            Some(FieldValue::Symptoms(selected)) => selected.clone(),
            _ => BTreeSet::new(),
        }
    }

    pub fn text(&self, field: Field) -> Option<&str> {
        match self.fields.get(&field) {
            Some(FieldValue::Text(text)) => Some(text.as_str()),
            _ => None,
        }
    }

    pub fn is_filled(&self, field: Field) -> bool {
        self.fields.get(&field).is_some_and(FieldValue::is_filled)
    }

    pub fn gender(&self) -> Option<Gender> {
        match self.fields.get(&Field::Gender) {
            Some(FieldValue::Gender(gender)) => Some(*gender),
            _ => None,
        }
    }

    pub fn blood_type(&self) -> Option<BloodType> {
        match self.fields.get(&Field::BloodType) {
            Some(FieldValue::BloodType(blood_type)) => Some(*blood_type),
            _ => None,
        }
    }

    pub fn duration(&self) -> Option<SymptomDuration> {
        match self.fields.get(&Field::Duration) {
            Some(FieldValue::Duration(duration)) => Some(*duration),
            _ => None,
        }
    }

    pub fn severity(&self) -> Option<Severity> {
        match self.fields.get(&Field::Severity) {
            Some(FieldValue::Severity(severity)) => Some(*severity),
            _ => None,
        }
    }

    /// Normalised phone number, if one has been entered.
    pub fn phone(&self) -> Option<String> {
        self.text(Field::PhoneNumber)
            .map(validation::normalize_phone)
            .filter(|phone| !phone.is_empty())
    }

    /// Assembles the registration payload from the collected fields.
    pub fn user_data(&self) -> Result<UserData, ValidationError> {
        let text = |field: Field| -> Result<String, ValidationError> {
            self.text(field)
                .map(|value| value.trim().to_string())
                .filter(|value| !value.is_empty())
                .ok_or_else(|| ValidationError::IncompleteData {
                    missing: vec![field],
                })
        };
        let phone_number = self.phone().ok_or(ValidationError::EmptyPhone)?;
        let birth_date = validation::parse_birth_date(&text(Field::BirthDate)?)?;
        let gender = self.gender().ok_or_else(|| ValidationError::IncompleteData {
            missing: vec![Field::Gender],
        })?;
        let blood_type = self.blood_type().ok_or_else(|| ValidationError::IncompleteData {
            missing: vec![Field::BloodType],
        })?;

        Ok(UserData {
            first_name: text(Field::FirstName)?,
            last_name: text(Field::LastName)?,
            email: text(Field::Email)?,
            phone_number,
            nik: text(Field::Nik)?,
            address: text(Field::Address)?,
            city: text(Field::City)?,
            province: text(Field::Province)?,
            birth_date,
            gender,
            blood_type,
            // not trimmed: spaces are legal in passwords
            password: self.text(Field::Password).unwrap_or_default().to_string(),
        })
    }

    pub(crate) fn move_to(&mut self, step: Step) {
        self.step = step;
    }

    pub(crate) fn verification_mut(&mut self) -> &mut Verification {
        &mut self.verification
    }

    fn ensure_available(&self, field: Field) -> Result<(), FlowError> {
        let current = steps::position(self.flow, self.step);
        match (steps::owner_position(self.flow, field), current) {
            (Some(owner), Some(current)) if owner == current => Ok(()),
            _ => Err(FlowError::FieldNotAvailable {
                field,
                step: self.step,
            }),
        }
    }
}
