//! Line-based driver for a [`FlowController`].

use std::io::{self, BufRead, Write};

use anyhow::{Context, Result};
use client_core::{
    catalog::SymptomReport, Field, FieldValue, FlowController, FlowSnapshot, Outcome, Step,
    Terminal,
};
use shared::domain::{BloodType, Gender, Severity, SymptomDuration, SymptomId};

const BACK: &str = "<";
const QUIT: &str = ":q";
const RESEND: &str = "r";

enum Input {
    Confirm,
    Stay,
    Back,
    Quit,
    Resend,
}

enum Answer {
    Value(String),
    Control(Input),
}

/// Runs the flow until it reaches a terminal outcome or the user quits.
pub async fn run(flow: &FlowController) -> Result<Terminal> {
    println!("Ketik '{BACK}' untuk kembali, '{QUIT}' untuk keluar.");
    let mut otp_requested = false;

    loop {
        let snapshot = flow.snapshot().await?;
        if snapshot.step != Step::Verification {
            otp_requested = false;
        } else if !snapshot.verification.otp_sent && !otp_requested {
            otp_requested = true;
            show(flow.request_otp().await?);
            continue;
        }

        match fill_step(flow, &snapshot).await? {
            Input::Confirm => {}
            Input::Stay => continue,
            Input::Quit => return Ok(Terminal::Exited),
            Input::Resend => {
                show(flow.request_otp().await?);
                continue;
            }
            Input::Back => {
                if let Outcome::Finished(terminal) = flow.back().await? {
                    return Ok(terminal);
                }
                continue;
            }
        }

        if let Some(terminal) = show(flow.confirm().await?) {
            return Ok(terminal);
        }
    }
}

pub async fn google(flow: &FlowController, token: &str) -> Result<Terminal> {
    match flow.sign_in_with_google(token).await? {
        Outcome::Finished(terminal) => Ok(terminal),
        other => {
            show(other);
            Ok(Terminal::Exited)
        }
    }
}

fn show(outcome: Outcome) -> Option<Terminal> {
    match outcome {
        Outcome::Finished(terminal) => return Some(terminal),
        Outcome::Blocked(reason) => println!("! {reason}"),
        Outcome::Failed(failure) => println!("! {failure}"),
        Outcome::Updated => println!("Kode verifikasi telah dikirim."),
        Outcome::Busy => println!("Mohon tunggu, permintaan sebelumnya masih diproses."),
        Outcome::Moved { .. } | Outcome::Stale => {}
    }
    None
}

async fn fill_step(flow: &FlowController, snapshot: &FlowSnapshot) -> Result<Input> {
    match snapshot.step {
        Step::PhoneEntry => {
            println!("\n== Masuk / Daftar ==");
            text_fields(flow, snapshot, &[(Field::PhoneNumber, "Nomor telepon")]).await
        }
        Step::Verification => {
            println!("\n== Verifikasi ==");
            println!("Ketik '{RESEND}' untuk mengirim ulang kode.");
            match ask("Kode verifikasi (6 digit)", None)? {
                Answer::Control(input) => Ok(input),
                Answer::Value(code) if code.eq_ignore_ascii_case(RESEND) => Ok(Input::Resend),
                Answer::Value(code) => {
                    flow.set_text(Field::OtpCode, code).await?;
                    Ok(Input::Confirm)
                }
            }
        }
        Step::PasswordEntry => {
            text_fields(flow, snapshot, &[(Field::Password, "Password")]).await
        }
        Step::DataGeneral => {
            println!("\n== Data Umum ==");
            text_fields(
                flow,
                snapshot,
                &[
                    (Field::FirstName, "Nama depan"),
                    (Field::LastName, "Nama belakang"),
                    (Field::Email, "Email"),
                    (Field::Password, "Password"),
                    (Field::ConfirmPassword, "Konfirmasi password"),
                ],
            )
            .await
        }
        Step::DataResident => {
            println!("\n== Data Kependudukan ==");
            text_fields(
                flow,
                snapshot,
                &[
                    (Field::Nik, "NIK"),
                    (Field::Address, "Alamat"),
                    (Field::City, "Kota"),
                    (Field::Province, "Provinsi"),
                ],
            )
            .await
        }
        Step::DataPersonal => {
            println!("\n== Data Pribadi ==");
            match text_fields(
                flow,
                snapshot,
                &[(Field::BirthDate, "Tanggal lahir (YYYY-MM-DD)")],
            )
            .await?
            {
                Input::Confirm => {}
                other => return Ok(other),
            }
            let labels: Vec<&str> = Gender::ALL.iter().map(|g| g.label()).collect();
            let gender = match choose("Jenis kelamin", &labels)? {
                Ok(index) => Gender::ALL[index],
                Err(input) => return Ok(input),
            };
            flow.set_field(Field::Gender, FieldValue::Gender(gender)).await?;
            let labels: Vec<&str> = BloodType::ALL.iter().map(|b| b.label()).collect();
            let blood_type = match choose("Golongan darah", &labels)? {
                Ok(index) => BloodType::ALL[index],
                Err(input) => return Ok(input),
            };
            flow.set_field(Field::BloodType, FieldValue::BloodType(blood_type))
                .await?;
            Ok(Input::Confirm)
        }
        Step::TextEntry => {
            println!("\n== Cek Gejala ==");
            text_fields(
                flow,
                snapshot,
                &[(Field::SymptomText, "Ceritakan keluhan Anda")],
            )
            .await
        }
        Step::PredictedSymptoms => pick_symptoms(flow, snapshot).await,
        Step::DurationSelection => {
            let labels: Vec<&str> = SymptomDuration::ALL.iter().map(|d| d.label()).collect();
            match choose("Sudah berapa lama gejala dirasakan?", &labels)? {
                Ok(index) => {
                    flow.set_field(
                        Field::Duration,
                        FieldValue::Duration(SymptomDuration::ALL[index]),
                    )
                    .await?;
                    Ok(Input::Confirm)
                }
                Err(input) => Ok(input),
            }
        }
        Step::SeveritySelection => {
            let labels: Vec<&str> = Severity::ALL.iter().map(|s| s.label()).collect();
            match choose("Seberapa parah gejalanya?", &labels)? {
                Ok(index) => {
                    flow.set_field(Field::Severity, FieldValue::Severity(Severity::ALL[index]))
                        .await?;
                    Ok(Input::Confirm)
                }
                Err(input) => Ok(input),
            }
        }
        Step::Result => {
            print_report(&flow.report().await?);
            match ask("Tekan Enter untuk kembali ke beranda", None)? {
                Answer::Control(input) => Ok(input),
                Answer::Value(_) => Ok(Input::Confirm),
            }
        }
    }
}

async fn text_fields(
    flow: &FlowController,
    snapshot: &FlowSnapshot,
    fields: &[(Field, &str)],
) -> Result<Input> {
    for (field, label) in fields {
        let current = match snapshot.fields.get(field) {
            Some(FieldValue::Text(text)) if !text.is_empty() => Some(text.as_str()),
            _ => None,
        };
        match ask(label, current)? {
            Answer::Control(input) => return Ok(input),
            Answer::Value(value) => flow.set_text(*field, value).await?,
        }
    }
    Ok(Input::Confirm)
}

async fn pick_symptoms(flow: &FlowController, snapshot: &FlowSnapshot) -> Result<Input> {
    println!("\n== Gejala yang mungkin Anda alami ==");
    for symptom in flow.predicted_symptoms().await? {
        println!("  [{}] {}", symptom.id, symptom.name);
    }
    if let Some(FieldValue::Symptoms(selected)) = snapshot.fields.get(&Field::Symptoms) {
        let ids: Vec<String> = selected.iter().map(ToString::to_string).collect();
        println!("Dipilih: {}", ids.join(", "));
    }
    println!("Masukkan id gejala dipisah koma, '-id' untuk menghapus, '?kata' untuk mencari.");

    let line = match ask("Gejala", None)? {
        Answer::Control(input) => return Ok(input),
        Answer::Value(line) => line,
    };
    if line.is_empty() {
        return Ok(Input::Confirm);
    }
    if let Some(query) = line.strip_prefix('?') {
        for symptom in flow.search_symptoms(query).await? {
            println!("  [{}] {}", symptom.id, symptom.name);
        }
        return Ok(Input::Stay);
    }

    for token in line.split(',').map(str::trim).filter(|t| !t.is_empty()) {
        let (remove, raw) = match token.strip_prefix('-') {
            Some(raw) => (true, raw),
            None => (false, token),
        };
        let Ok(id) = raw.parse::<i64>() else {
            println!("! '{token}' bukan id gejala");
            continue;
        };
        let id = SymptomId(id);
        if remove {
            flow.remove_symptom(id).await?;
        } else if let Err(err) = flow.add_symptom(id).await {
            println!("! {err}");
        }
    }
    Ok(Input::Stay)
}

fn print_report(report: &SymptomReport) {
    println!("\n== Hasil ==");
    println!("Keluhan   : {}", report.complaint);
    let names: Vec<&str> = report.symptoms.iter().map(|s| s.name).collect();
    println!("Gejala    : {}", names.join(", "));
    println!("Durasi    : {}", report.duration.label());
    println!("Keparahan : {}", report.severity.label());
    println!("\nFasilitas kesehatan terdekat:");
    for facility in &report.facilities {
        println!("- {} ({:.1} km)", facility.name, facility.distance_km);
        println!("  {}", facility.address);
        for doctor in facility.doctors {
            let days: Vec<String> = doctor
                .schedule
                .iter()
                .map(|slot| format!("{} {}", slot.day, slot.hours))
                .collect();
            println!("  {} - {} ({})", doctor.name, doctor.specialty, days.join(", "));
        }
    }
}

/// Empty input keeps `current` when there is one.
fn ask(label: &str, current: Option<&str>) -> Result<Answer> {
    match current {
        Some(current) => print!("{label} [{current}]: "),
        None => print!("{label}: "),
    }
    io::stdout().flush().context("failed to flush stdout")?;

    let mut line = String::new();
    let read = io::stdin()
        .lock()
        .read_line(&mut line)
        .context("failed to read from stdin")?;
    if read == 0 {
        return Ok(Answer::Control(Input::Quit));
    }

    let line = line.trim();
    Ok(match line {
        BACK => Answer::Control(Input::Back),
        QUIT => Answer::Control(Input::Quit),
        "" => Answer::Value(current.unwrap_or_default().to_string()),
        value => Answer::Value(value.to_string()),
    })
}

/// Returns the chosen index, or the control input that interrupted the choice.
fn choose(label: &str, options: &[&str]) -> Result<std::result::Result<usize, Input>> {
    println!("{label}");
    for (index, option) in options.iter().enumerate() {
        println!("  {}. {option}", index + 1);
    }
    loop {
        match ask("Pilihan", None)? {
            Answer::Control(input) => return Ok(Err(input)),
            Answer::Value(raw) => match raw.parse::<usize>() {
                Ok(n) if (1..=options.len()).contains(&n) => return Ok(Ok(n - 1)),
                _ => println!("! pilih angka 1-{}", options.len()),
            },
        }
    }
}
