use std::{path::PathBuf, sync::Arc};

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use client_core::{
    config::{load_settings_from, normalize_api_url, SETTINGS_FILE},
    medicine, ApiClient, Field, FileTokenStore, FlowController, HttpActions, Terminal, TokenStore,
};
use shared::domain::{mask_phone, FlowKind, MedicineId};
use tracing::info;
use tracing_subscriber::EnvFilter;

mod flows;

#[derive(Parser, Debug)]
#[command(name = "dokumed", about = "DokuMed health assistant")]
struct Cli {
    #[arg(long, default_value = SETTINGS_FILE)]
    config: PathBuf,
    /// Overrides the API base URL from settings and environment.
    #[arg(long)]
    api_url: Option<String>,
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Describe a complaint and get nearby facility recommendations.
    Symptom,
    Login {
        #[arg(long)]
        google_token: Option<String>,
    },
    Register {
        #[arg(long)]
        google_token: Option<String>,
    },
    Profile,
    Logout,
    Medicine {
        #[command(subcommand)]
        command: MedicineCommand,
    },
}

#[derive(Subcommand, Debug)]
enum MedicineCommand {
    Search { query: String },
    Alternatives { id: i64 },
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .init();
    let cli = Cli::parse();

    let mut settings = load_settings_from(&cli.config, |key| std::env::var(key).ok())?;
    if let Some(url) = &cli.api_url {
        settings.api_base_url = normalize_api_url(url)?;
    }
    info!("dokumed: api at {}", settings.api_base_url);

    let tokens: Arc<dyn TokenStore> = Arc::new(FileTokenStore::new(settings.token_path.clone()));
    let api = ApiClient::new(&settings, tokens)?;

    match cli.command {
        Command::Symptom => {
            let flow = FlowController::new(FlowKind::SymptomCheck);
            flows::run(&flow).await?;
            flow.dispose().await;
        }
        Command::Login { google_token } => authenticate(&api, FlowKind::Login, google_token).await?,
        Command::Register { google_token } => {
            authenticate(&api, FlowKind::Register, google_token).await?
        }
        Command::Profile => {
            let profile = api.profile().await.context("failed to load profile")?;
            println!("{}", profile.display_name());
            if let Some(phone) = &profile.phone_number {
                println!("Telepon   : {phone}");
            }
            if let Some(email) = &profile.email {
                println!("Email     : {email}");
            }
            if let (Some(city), Some(province)) = (&profile.city, &profile.province) {
                println!("Domisili  : {city}, {province}");
            }
            if let Some(gender) = profile.gender {
                println!("Gender    : {}", gender.label());
            }
            if let Some(blood_type) = profile.blood_type {
                println!("Gol. darah: {}", blood_type.label());
            }
        }
        Command::Logout => {
            api.logout().await?;
            println!("Anda telah keluar.");
        }
        Command::Medicine { command } => run_medicine(command),
    }

    Ok(())
}

/// Runs login or registration, following redirects between the two.
async fn authenticate(
    api: &ApiClient,
    mut kind: FlowKind,
    mut google_token: Option<String>,
) -> Result<()> {
    let actions = Arc::new(HttpActions::new(api.clone()));
    let mut carried_phone: Option<String> = None;

    loop {
        let flow = FlowController::new_with_actions(kind, actions.clone());
        if let Some(phone) = carried_phone.take() {
            flow.set_text(Field::PhoneNumber, phone).await?;
        }
        let terminal = match google_token.take() {
            Some(token) => flows::google(&flow, &token).await?,
            None => flows::run(&flow).await?,
        };
        flow.dispose().await;

        match terminal {
            Terminal::Redirected { to, phone } => {
                let hint = match to {
                    FlowKind::Login => "sudah terdaftar, silakan masuk",
                    _ => "belum terdaftar, silakan daftar",
                };
                println!("Nomor {} {hint}.", mask_phone(&phone));
                kind = to;
                carried_phone = Some(phone);
            }
            Terminal::Registered(session) => {
                println!("{}", non_empty(&session.message, "Registrasi berhasil."));
                println!("Silakan masuk dengan akun baru Anda.");
                kind = FlowKind::Login;
            }
            Terminal::Authenticated(session) => {
                let name = session
                    .user
                    .as_ref()
                    .and_then(|user| user.name.clone().or_else(|| user.email.clone()));
                match name {
                    Some(name) => println!("Selamat datang, {name}!"),
                    None => println!("Berhasil masuk."),
                }
                return Ok(());
            }
            Terminal::Exited | Terminal::Reset => return Ok(()),
        }
    }
}

fn run_medicine(command: MedicineCommand) {
    match command {
        MedicineCommand::Search { query } => {
            let found = medicine::search(&query);
            if found.is_empty() {
                println!("Obat \"{query}\" tidak ditemukan.");
            }
            for item in found {
                println!(
                    "[{}] {} ({})",
                    item.id,
                    item.name,
                    medicine::format_rupiah(item.regular_price)
                );
            }
        }
        MedicineCommand::Alternatives { id } => {
            let Some(base) = medicine::medicine_by_id(MedicineId(id)) else {
                println!("Obat dengan id {id} tidak ditemukan.");
                return;
            };
            println!("{}", base.name);
            println!("  {}", base.description);
            println!("  Peringatan: {}", base.warnings);
            println!("Alternatif dengan kandungan {}:", base.active_ingredient);
            for item in medicine::alternatives(base.id) {
                println!(
                    "  [{}] {} - {} (HET {})",
                    item.id,
                    item.name,
                    medicine::format_rupiah(item.regular_price),
                    medicine::format_rupiah(item.highest_price)
                );
            }
        }
    }
}

fn non_empty<'a>(message: &'a str, fallback: &'a str) -> &'a str {
    if message.trim().is_empty() {
        fallback
    } else {
        message
    }
}
