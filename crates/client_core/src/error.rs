use shared::domain::SymptomId;
use thiserror::Error;

use crate::{session::Field, steps::Step};

/// Local precondition failure; blocks a transition and never reaches the backend.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    #[error("Silakan masukkan nomor telepon Anda")]
    EmptyPhone,
    #[error("Nomor telepon tidak valid")]
    InvalidPhone,
    #[error("Silakan lengkapi semua data")]
    IncompleteData { missing: Vec<Field> },
    #[error("Format email tidak valid")]
    InvalidEmail,
    #[error("Password minimal {min} karakter")]
    PasswordTooShort { min: usize },
    #[error("password dan konfirmasi tidak cocok")]
    PasswordMismatch,
    #[error("Kode verifikasi belum dikirim")]
    OtpNotSent,
    #[error("Silakan masukkan kode verifikasi lengkap")]
    IncompleteOtp,
    #[error("Silakan masukkan password Anda")]
    EmptyPassword,
    #[error("Silakan ceritakan keluhan Anda")]
    EmptySymptomText,
    #[error("Silakan pilih minimal satu gejala")]
    NoSymptomSelected,
    #[error("Silakan pilih lama gejala")]
    NoDurationSelected,
    #[error("Silakan pilih tingkat keparahan gejala")]
    NoSeveritySelected,
    #[error("Format tanggal lahir harus YYYY-MM-DD")]
    InvalidBirthDate,
}

/// Misuse of the controller API, as opposed to a blocked or failed step.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum FlowError {
    #[error("flow controller has been disposed")]
    Disposed,
    #[error("field `{field}` is not available at step {step:?}")]
    FieldNotAvailable { field: Field, step: Step },
    #[error("field `{field}` does not accept this kind of value")]
    WrongValueKind { field: Field },
    #[error("operation requires step {expected:?}, current step is {actual:?}")]
    NotAtStep { expected: Step, actual: Step },
    #[error("operation is not supported by the {0} flow")]
    UnsupportedInFlow(shared::domain::FlowKind),
    #[error("unknown symptom id {0}")]
    UnknownSymptom(SymptomId),
    #[error(transparent)]
    Validation(#[from] ValidationError),
}
