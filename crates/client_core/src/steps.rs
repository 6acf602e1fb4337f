//! Static step tables for the three flows.
//!
//! Each flow is an ordered list of [`StepDefinition`]s. The controller only
//! ever moves one entry forward (after the step's precondition holds and its
//! action, if any, succeeds) or one entry back.

use serde::{Deserialize, Serialize};
use shared::domain::FlowKind;

use crate::{error::ValidationError, session::Field, session::Session, validation};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Step {
    PhoneEntry,
    Verification,
    PasswordEntry,
    DataGeneral,
    DataResident,
    DataPersonal,
    TextEntry,
    PredictedSymptoms,
    DurationSelection,
    SeveritySelection,
    Result,
}

/// Side-effecting operation a step hands to the external action adapter.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ActionKind {
    CheckPhone,
    SendOtp,
    VerifyOtp,
    Login,
    Register,
    GoogleAuth,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OnConfirm {
    Advance(Step),
    Invoke(ActionKind),
    Reset,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OnBack {
    Previous(Step),
    Exit,
}

pub type Precondition = fn(&Session) -> Result<(), ValidationError>;

pub struct StepDefinition {
    pub id: Step,
    /// Fields entered on this step.
    pub fields: &'static [Field],
    pub precondition: Precondition,
    pub on_confirm: OnConfirm,
    pub on_back: OnBack,
}

impl StepDefinition {
    pub fn is_enabled(&self, session: &Session) -> bool {
        (self.precondition)(session).is_ok()
    }
}

const PHONE_ENTRY: StepDefinition = StepDefinition {
    id: Step::PhoneEntry,
    fields: &[Field::PhoneNumber],
    precondition: phone_entered,
    on_confirm: OnConfirm::Invoke(ActionKind::CheckPhone),
    on_back: OnBack::Exit,
};

const VERIFICATION: StepDefinition = StepDefinition {
    id: Step::Verification,
    fields: &[Field::OtpCode],
    precondition: otp_entered,
    on_confirm: OnConfirm::Invoke(ActionKind::VerifyOtp),
    on_back: OnBack::Previous(Step::PhoneEntry),
};

static LOGIN_STEPS: [StepDefinition; 3] = [
    PHONE_ENTRY,
    VERIFICATION,
    StepDefinition {
        id: Step::PasswordEntry,
        fields: &[Field::Password],
        precondition: password_entered,
        on_confirm: OnConfirm::Invoke(ActionKind::Login),
        on_back: OnBack::Previous(Step::Verification),
    },
];

static REGISTER_STEPS: [StepDefinition; 5] = [
    PHONE_ENTRY,
    VERIFICATION,
    StepDefinition {
        id: Step::DataGeneral,
        fields: &[
            Field::FirstName,
            Field::LastName,
            Field::Email,
            Field::Password,
            Field::ConfirmPassword,
        ],
        precondition: general_data_complete,
        on_confirm: OnConfirm::Advance(Step::DataResident),
        on_back: OnBack::Previous(Step::Verification),
    },
    StepDefinition {
        id: Step::DataResident,
        fields: &[Field::Nik, Field::Address, Field::City, Field::Province],
        precondition: resident_data_complete,
        on_confirm: OnConfirm::Advance(Step::DataPersonal),
        on_back: OnBack::Previous(Step::DataGeneral),
    },
    StepDefinition {
        id: Step::DataPersonal,
        fields: &[Field::BirthDate, Field::Gender, Field::BloodType],
        precondition: personal_data_complete,
        on_confirm: OnConfirm::Invoke(ActionKind::Register),
        on_back: OnBack::Previous(Step::DataResident),
    },
];

static SYMPTOM_STEPS: [StepDefinition; 5] = [
    StepDefinition {
        id: Step::TextEntry,
        fields: &[Field::SymptomText],
        precondition: complaint_entered,
        on_confirm: OnConfirm::Advance(Step::PredictedSymptoms),
        on_back: OnBack::Exit,
    },
    StepDefinition {
        id: Step::PredictedSymptoms,
        fields: &[Field::Symptoms],
        precondition: symptoms_selected,
        on_confirm: OnConfirm::Advance(Step::DurationSelection),
        on_back: OnBack::Previous(Step::TextEntry),
    },
    StepDefinition {
        id: Step::DurationSelection,
        fields: &[Field::Duration],
        precondition: duration_selected,
        on_confirm: OnConfirm::Advance(Step::SeveritySelection),
        on_back: OnBack::Previous(Step::PredictedSymptoms),
    },
    StepDefinition {
        id: Step::SeveritySelection,
        fields: &[Field::Severity],
        precondition: severity_selected,
        on_confirm: OnConfirm::Advance(Step::Result),
        on_back: OnBack::Previous(Step::DurationSelection),
    },
    StepDefinition {
        id: Step::Result,
        fields: &[],
        precondition: always,
        on_confirm: OnConfirm::Reset,
        on_back: OnBack::Previous(Step::SeveritySelection),
    },
];

pub fn definitions(flow: FlowKind) -> &'static [StepDefinition] {
    match flow {
        FlowKind::SymptomCheck => &SYMPTOM_STEPS,
        FlowKind::Login => &LOGIN_STEPS,
        FlowKind::Register => &REGISTER_STEPS,
    }
}

pub fn definition(flow: FlowKind, step: Step) -> Option<&'static StepDefinition> {
    definitions(flow).iter().find(|def| def.id == step)
}

pub fn initial_step(flow: FlowKind) -> Step {
    definitions(flow)[0].id
}

pub fn position(flow: FlowKind, step: Step) -> Option<usize> {
    definitions(flow).iter().position(|def| def.id == step)
}

/// Step that follows `step` in flow order, `None` for the last one.
pub fn next(flow: FlowKind, step: Step) -> Option<Step> {
    let index = position(flow, step)?;
    definitions(flow).get(index + 1).map(|def| def.id)
}

/// Index of the step on which `field` is entered.
pub fn owner_position(flow: FlowKind, field: Field) -> Option<usize> {
    definitions(flow)
        .iter()
        .position(|def| def.fields.contains(&field))
}

fn require_filled(session: &Session, fields: &[Field]) -> Result<(), ValidationError> {
    let missing: Vec<Field> = fields
        .iter()
        .copied()
        .filter(|field| !session.is_filled(*field))
        .collect();
    if missing.is_empty() {
        Ok(())
    } else {
        Err(ValidationError::IncompleteData { missing })
    }
}

fn always(_: &Session) -> Result<(), ValidationError> {
    Ok(())
}

fn phone_entered(session: &Session) -> Result<(), ValidationError> {
    validation::validate_phone(session.text(Field::PhoneNumber).unwrap_or_default()).map(|_| ())
}

fn otp_entered(session: &Session) -> Result<(), ValidationError> {
    if !session.verification().otp_sent {
        return Err(ValidationError::OtpNotSent);
    }
    validation::validate_otp_code(session.text(Field::OtpCode).unwrap_or_default())
}

fn password_entered(session: &Session) -> Result<(), ValidationError> {
    if session.is_filled(Field::Password) {
        Ok(())
    } else {
        Err(ValidationError::EmptyPassword)
    }
}

fn general_data_complete(session: &Session) -> Result<(), ValidationError> {
    require_filled(
        session,
        &[
            Field::FirstName,
            Field::LastName,
            Field::Email,
            Field::Password,
            Field::ConfirmPassword,
        ],
    )?;
    validation::validate_email(session.text(Field::Email).unwrap_or_default())?;
    validation::validate_password(
        session.text(Field::Password).unwrap_or_default(),
        session.text(Field::ConfirmPassword).unwrap_or_default(),
    )
}

fn resident_data_complete(session: &Session) -> Result<(), ValidationError> {
    require_filled(
        session,
        &[Field::Nik, Field::Address, Field::City, Field::Province],
    )
}

fn personal_data_complete(session: &Session) -> Result<(), ValidationError> {
    require_filled(
        session,
        &[Field::BirthDate, Field::Gender, Field::BloodType],
    )?;
    validation::parse_birth_date(session.text(Field::BirthDate).unwrap_or_default()).map(|_| ())
}

fn complaint_entered(session: &Session) -> Result<(), ValidationError> {
    if session.is_filled(Field::SymptomText) {
        Ok(())
    } else {
        Err(ValidationError::EmptySymptomText)
    }
}

fn symptoms_selected(session: &Session) -> Result<(), ValidationError> {
    if session.selected_symptoms().is_empty() {
        Err(ValidationError::NoSymptomSelected)
    } else {
        Ok(())
    }
}

fn duration_selected(session: &Session) -> Result<(), ValidationError> {
    session
        .duration()
        .map(|_| ())
        .ok_or(ValidationError::NoDurationSelected)
}

fn severity_selected(session: &Session) -> Result<(), ValidationError> {
    session
        .severity()
        .map(|_| ())
        .ok_or(ValidationError::NoSeveritySelected)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::session::FieldValue;

    #[test]
    fn back_targets_match_table_order() {
        for flow in [FlowKind::SymptomCheck, FlowKind::Login, FlowKind::Register] {
            let defs = definitions(flow);
            assert_eq!(defs[0].on_back, OnBack::Exit, "{flow}");
            for pair in defs.windows(2) {
                assert_eq!(pair[1].on_back, OnBack::Previous(pair[0].id), "{flow}");
            }
        }
    }

    #[test]
    fn each_field_is_owned_by_one_step_per_flow() {
        for flow in [FlowKind::SymptomCheck, FlowKind::Login, FlowKind::Register] {
            let mut seen = std::collections::HashSet::new();
            for def in definitions(flow) {
                for field in def.fields {
                    assert!(seen.insert(*field), "{field} owned twice in {flow}");
                }
            }
        }
    }

    #[test]
    fn verification_leads_to_flow_specific_step() {
        assert_eq!(
            next(FlowKind::Register, Step::Verification),
            Some(Step::DataGeneral)
        );
        assert_eq!(
            next(FlowKind::Login, Step::Verification),
            Some(Step::PasswordEntry)
        );
        assert_eq!(next(FlowKind::Login, Step::PasswordEntry), None);
    }

    #[test]
    fn incomplete_resident_data_lists_missing_fields() {
        let mut session = Session::new(FlowKind::Register);
        session.move_to(Step::DataResident);
        session
            .set(Field::Nik, FieldValue::text("3273000000000001"))
            .expect("nik");
        session
            .set(Field::City, FieldValue::text("   "))
            .expect("city");

        let def = definition(FlowKind::Register, Step::DataResident).expect("def");
        assert_eq!(
            (def.precondition)(&session),
            Err(ValidationError::IncompleteData {
                missing: vec![Field::Address, Field::City, Field::Province]
            })
        );
    }

    #[test]
    fn otp_step_requires_a_sent_code() {
        let mut session = Session::new(FlowKind::Login);
        session.move_to(Step::Verification);
        session
            .set(Field::OtpCode, FieldValue::text("123456"))
            .expect("otp");

        let def = definition(FlowKind::Login, Step::Verification).expect("def");
        assert_eq!(
            (def.precondition)(&session),
            Err(ValidationError::OtpNotSent)
        );

        session.verification_mut().otp_sent = true;
        assert!(def.is_enabled(&session));
    }
}
