//! Symptom catalog and facility directory for the symptom-check flow.

use std::collections::BTreeSet;

use shared::domain::{DoctorId, FacilityId, Severity, SymptomDuration, SymptomId};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Symptom {
    pub id: SymptomId,
    pub name: &'static str,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ScheduleSlot {
    pub day: &'static str,
    pub hours: &'static str,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Doctor {
    pub id: DoctorId,
    pub name: &'static str,
    pub specialty: &'static str,
    pub schedule: &'static [ScheduleSlot],
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Facility {
    pub id: FacilityId,
    pub name: &'static str,
    pub address: &'static str,
    pub distance_km: f32,
    pub phone: &'static str,
    pub doctors: &'static [Doctor],
}

/// What the user sees on the Result step.
#[derive(Debug, Clone, PartialEq)]
pub struct SymptomReport {
    pub complaint: String,
    pub symptoms: Vec<Symptom>,
    pub duration: SymptomDuration,
    pub severity: Severity,
    pub facilities: Vec<Facility>,
}

const fn symptom(id: i64, name: &'static str) -> Symptom {
    Symptom {
        id: SymptomId(id),
        name,
    }
}

pub static SYMPTOMS: [Symptom; 17] = [
    symptom(1, "Mual"),
    symptom(2, "Sakit kepala"),
    symptom(3, "Gatal-gatal"),
    symptom(4, "Bersin-bersin"),
    symptom(5, "Pilek"),
    symptom(6, "Sakit tenggorokan"),
    symptom(7, "Batuk-batuk"),
    symptom(8, "Nyeri ulu hati"),
    symptom(9, "Memar"),
    symptom(10, "Pusing"),
    symptom(11, "Demam"),
    symptom(12, "Sesak napas"),
    symptom(13, "Nyeri otot"),
    symptom(14, "Demam tinggi"),
    symptom(15, "Ruam kulit"),
    symptom(16, "Nyeri sendi"),
    symptom(17, "Muntah"),
];

/// Shown when nothing in the complaint matches the catalog.
const DEFAULT_PREDICTION: [SymptomId; 6] = [
    SymptomId(1),
    SymptomId(13),
    SymptomId(14),
    SymptomId(15),
    SymptomId(5),
    SymptomId(17),
];

const WEEKDAY_MORNING: &[ScheduleSlot] = &[
    ScheduleSlot {
        day: "Senin",
        hours: "09.00-14.00",
    },
    ScheduleSlot {
        day: "Selasa",
        hours: "09.00-14.00",
    },
    ScheduleSlot {
        day: "Rabu",
        hours: "09.00-14.00",
    },
];

const WEEKDAY_LONG: &[ScheduleSlot] = &[
    ScheduleSlot {
        day: "Senin",
        hours: "08.00-15.00",
    },
    ScheduleSlot {
        day: "Selasa",
        hours: "08.00-15.00",
    },
    ScheduleSlot {
        day: "Rabu",
        hours: "08.00-15.00",
    },
];

pub static FACILITIES: [Facility; 2] = [
    Facility {
        id: FacilityId(1),
        name: "Klinik Utama Jasmine MQ Medika",
        address: "Jl. Dayang Sumbi No.10, Lb. Siliwangi, Kecamatan Coblong, Kota Bandung, Jawa Barat 40132",
        distance_km: 2.4,
        phone: "+62-22-1234567",
        doctors: &[
            Doctor {
                id: DoctorId(1),
                name: "Dr. Erdianti Silalahi",
                specialty: "Poli Penyakit Dalam",
                schedule: WEEKDAY_MORNING,
            },
            Doctor {
                id: DoctorId(2),
                name: "Dr. Wiga Ryan",
                specialty: "Poli Penyakit Dalam",
                schedule: WEEKDAY_MORNING,
            },
        ],
    },
    Facility {
        id: FacilityId(2),
        name: "Klinik YRAP Tubagus Ismail",
        address: "Jl. Tubagus Ismail No.51A, Sekeloa, Kecamatan Coblong, Kota Bandung, Jawa Barat 40134",
        distance_km: 3.1,
        phone: "+62-22-7654321",
        doctors: &[Doctor {
            id: DoctorId(3),
            name: "Dr. Ahmad Fauzi",
            specialty: "Poli Penyakit Dalam",
            schedule: WEEKDAY_LONG,
        }],
    },
];

pub fn symptom_by_id(id: SymptomId) -> Option<&'static Symptom> {
    SYMPTOMS.iter().find(|symptom| symptom.id == id)
}

/// Case-insensitive name search that hides symptoms already selected.
pub fn search(query: &str, exclude: &BTreeSet<SymptomId>) -> Vec<&'static Symptom> {
    let query = query.trim().to_lowercase();
    SYMPTOMS
        .iter()
        .filter(|symptom| !exclude.contains(&symptom.id))
        .filter(|symptom| symptom.name.to_lowercase().contains(&query))
        .collect()
}

/// Symptoms named in the free-text complaint, longest names first so that
/// "demam tinggi" is listed ahead of "demam".
pub fn predict(complaint: &str) -> Vec<&'static Symptom> {
    let complaint = complaint.to_lowercase();
    let mut matched: Vec<&'static Symptom> = SYMPTOMS
        .iter()
        .filter(|symptom| complaint.contains(&symptom.name.to_lowercase()))
        .collect();

    if matched.is_empty() {
        return DEFAULT_PREDICTION
            .iter()
            .filter_map(|id| symptom_by_id(*id))
            .collect();
    }

    matched.sort_by_key(|symptom| std::cmp::Reverse(symptom.name.len()));
    matched
}

/// Nearest facilities first.
pub fn recommend_facilities() -> Vec<Facility> {
    let mut facilities = FACILITIES.to_vec();
    facilities.sort_by(|a, b| a.distance_km.total_cmp(&b.distance_km));
    facilities
}
