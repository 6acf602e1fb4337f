//! Medicine lookup with cheaper alternatives sharing the active ingredient.

use shared::domain::MedicineId;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Medicine {
    pub id: MedicineId,
    pub name: &'static str,
    pub description: &'static str,
    pub manufacturer: &'static str,
    pub active_ingredient: &'static str,
    /// Prices in whole rupiah.
    pub highest_price: u32,
    pub regular_price: u32,
    pub details: &'static str,
    pub warnings: &'static str,
    pub side_effects: &'static str,
}

const PARACETAMOL_DESCRIPTION: &str =
    "Meringankan rasa sakit kepala, sakit gigi, dan menurunkan demam";
const PARACETAMOL_DETAILS: &str = "Analgesik-Antipiretik. Sebagai Analgesik, bekerja dengan meningkatkan ambang rangsang rasa sakit.";
const PARACETAMOL_WARNINGS: &str = "Hati - hati penggunaan obat ini pada penderita penyakit ginjal dan hati. Bila setelah 2 hari demam tidak menurun atau setelah 5 hari nyeri tidak menghilang, segera hubungi Unit Pelayanan Kesehatan. Penggunaan obat ini pada penderita yang mengkonsumsi alkohol, dapat meningkatkan resiko kerusakan fungsi hati";
const PARACETAMOL_SIDE_EFFECTS: &str = "Penggunaan jangka lama dan dosis besar dapat menyebakan kerusakan hati dan reaksi hipersensitivitas.";

const fn paracetamol_syrup(
    id: i64,
    name: &'static str,
    manufacturer: &'static str,
    highest_price: u32,
    regular_price: u32,
) -> Medicine {
    Medicine {
        id: MedicineId(id),
        name,
        description: PARACETAMOL_DESCRIPTION,
        manufacturer,
        active_ingredient: "Paracetamol",
        highest_price,
        regular_price,
        details: PARACETAMOL_DETAILS,
        warnings: PARACETAMOL_WARNINGS,
        side_effects: PARACETAMOL_SIDE_EFFECTS,
    }
}

pub static MEDICINES: [Medicine; 4] = [
    paracetamol_syrup(
        1,
        "Paracetamol 120 mg/5 mL Sirup (MERSIFARMA TIRMAKU MERCUSANA)",
        "MERSIFARMA TIRMAKU MERCUSANA",
        9_625,
        8_000,
    ),
    paracetamol_syrup(
        2,
        "Paracetamol 120 mg/5 mL Sirup (NOVAPHARIN)",
        "NOVAPHARIN",
        6_400,
        5_000,
    ),
    paracetamol_syrup(
        3,
        "Paracetamol 120 mg/5 mL Sirup (AFI FARMA, STRAWBERRY)",
        "AFI FARMA",
        8_400,
        7_000,
    ),
    paracetamol_syrup(
        4,
        "Paracetamol 120 mg/5 mL Sirup (LUCAS DJAJA)",
        "LUCAS DJAJA",
        8_950,
        7_500,
    ),
];

pub fn medicine_by_id(id: MedicineId) -> Option<&'static Medicine> {
    MEDICINES.iter().find(|medicine| medicine.id == id)
}

/// Matches name or active ingredient; a blank query matches nothing.
pub fn search(query: &str) -> Vec<&'static Medicine> {
    let query = query.trim().to_lowercase();
    if query.is_empty() {
        return Vec::new();
    }
    MEDICINES
        .iter()
        .filter(|medicine| {
            medicine.name.to_lowercase().contains(&query)
                || medicine.active_ingredient.to_lowercase().contains(&query)
        })
        .collect()
}

/// Other products with the same active ingredient, cheapest first.
pub fn alternatives(id: MedicineId) -> Vec<&'static Medicine> {
    let Some(base) = medicine_by_id(id) else {
        return Vec::new();
    };
    let mut found: Vec<&'static Medicine> = MEDICINES
        .iter()
        .filter(|medicine| medicine.id != base.id)
        .filter(|medicine| {
            medicine
                .active_ingredient
                .eq_ignore_ascii_case(base.active_ingredient)
        })
        .collect();
    found.sort_by_key(|medicine| medicine.regular_price);
    found
}

/// `8000` -> `Rp8.000`.
pub fn format_rupiah(amount: u32) -> String {
    let digits = amount.to_string();
    let mut grouped = String::with_capacity(digits.len() + digits.len() / 3);
    for (index, digit) in digits.chars().enumerate() {
        if index > 0 && (digits.len() - index) % 3 == 0 {
            grouped.push('.');
        }
        grouped.push(digit);
    }
    format!("Rp{grouped}")
}
