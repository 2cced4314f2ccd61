// Copyright © 2022 Nikita Dudko. All rights reserved.
// Contacts: <nikita.dudko.95@gmail.com>
// Licensed under the MIT License.

use vksaver::{
    auth::{self, Credential, Secrets},
    config::Store,
    files,
    photos::Saver,
    prompt,
};

use std::{env, path::PathBuf, process};
use clap::Parser;

#[derive(Parser)]
#[clap(about, author, version)]
#[clap(name = env!("CARGO_CRATE_NAME"))]
struct Cli {
    /// Perform authorization and save the obtained credentials
    #[clap(short, long)]
    log_in: bool,

    /// Path to the credentials file
    #[clap(short, long, value_name = "FILE", default_value = "config.env")]
    config: PathBuf,

    /// How many times to ask for the redirect URL before giving up
    #[clap(long, value_name = "N", default_value_t = 5)]
    attempts: usize,

    /// Authorize using another VK application ID
    #[clap(long, value_name = "ID")]
    app_id: Option<u64>,

    /// Photos to upload; when omitted, recent images
    /// from the current directory are offered
    #[clap(value_name = "FILES")]
    files: Vec<PathBuf>,
}

fn main() {
    let cli = Cli::parse();

    if cli.log_in {
        run_or_exit(|| log_in(&cli));
    } else {
        run_or_exit(|| upload(&cli));
    }
}

/// Performs the browser authorization and saves the extracted credentials.
fn log_in(cli: &Cli) -> Result<(), String> {
    let mut secrets = Secrets::default();
    if let Some(app_id) = cli.app_id {
        secrets.app_id = app_id;
    }

    let store = Store::new(cli.config.clone());
    if store.path().exists() {
        println!("Warning: existing credentials will be overwritten");
    }

    let credential = auth::request_credential(&secrets, cli.attempts);
    if let Err(e) = credential {
        return Err(format!("Couldn't obtain a token: {}", e));
    }

    if let Err(e) = store.save(&credential.unwrap()) {
        return Err(format!("Couldn't save the credentials: {}", e));
    }
    println!("Credentials saved to {}", store.path().display());
    Ok(())
}

/// Loads the credentials, gathers photos to upload and runs the uploader.
fn upload(cli: &Cli) -> Result<(), String> {
    let credential = load_credential(&Store::new(cli.config.clone()))?;

    let files = if cli.files.is_empty() {
        gather_files()?
    } else {
        cli.files.clone()
    };

    println!("\n--- Processing, please wait... ---\n");
    let reports = Saver::new(&credential).upload_and_save(&files);
    if let Err(e) = reports {
        return Err(format!("Couldn't upload the photos: {}", e));
    }

    let saved = reports
        .unwrap()
        .iter()
        .filter(|report| report.outcome.is_saved())
        .count();
    if saved == 0 {
        return Err("No photos were saved".into());
    }

    let border = format!("+{}+", "-".repeat(60));
    println!(
        "{}\n| {:^58} |\n{}",
        border, "Photo(s) are successfully saved in your VK profile!", border
    );
    Ok(())
}

/// Loads the credentials from the config file, falling back
/// to interactive prompts when the file can't provide them.
fn load_credential(store: &Store) -> Result<Credential, String> {
    match store.load() {
        Ok(Some(credential)) => return Ok(credential),
        Ok(None) => eprintln!(
            "TOKEN or OWNER_ID not found in {} (use --log-in to perform authorization)",
            store.path().display(),
        ),
        Err(e) => eprintln!("Couldn't read {}: {}", store.path().display(), e),
    }

    let access_token = read_value("\nPaste your VK token: ")?;
    let owner_id = read_value("Paste your VK account ID: ")?;
    Ok(Credential {
        access_token,
        owner_id,
    })
}

/// Offers photos discovered in the current directory, falling back
/// to a comma-separated paths prompt.
fn gather_files() -> Result<Vec<PathBuf>, String> {
    let current_dir = env::current_dir();
    if let Err(e) = current_dir {
        return Err(format!("Couldn't resolve the current directory: {}", e));
    }

    let discovered = files::find_photos(&current_dir.unwrap()).unwrap_or_else(|e| {
        eprintln!("Couldn't look for photos in the current directory: {}", e);
        Vec::new()
    });

    if discovered.is_empty() {
        println!("\nNo photo files found in the current directory");
    } else {
        println!("\nFound the following photos in the current directory (max 5):");
        for (index, path) in discovered.iter().enumerate() {
            println!("{}. {}", index + 1, path.display());
        }
        if confirm("Would you like to use these files? (Y/N): ")? {
            return Ok(discovered);
        }
    }

    let input = read_value("Enter path(s) to your photo(s) (comma-separated): ")?;
    let files: Vec<_> = input
        .split(',')
        .map(str::trim)
        .filter(|path| !path.is_empty())
        .map(PathBuf::from)
        .collect();

    if files.is_empty() {
        return Err("No files provided".into());
    }
    Ok(files)
}

/// Prompts until the user answers with "y" or "n" (case-insensitive).
fn confirm(message: &str) -> Result<bool, String> {
    loop {
        let answer = prompt(message);
        if let Err(e) = answer {
            return Err(format!("Couldn't read the input: {}", e));
        }
        match answer.unwrap().to_lowercase().as_str() {
            "y" => return Ok(true),
            "n" => return Ok(false),
            _ => {}
        }
    }
}

fn read_value(message: &str) -> Result<String, String> {
    match prompt(message) {
        Ok(value) if !value.is_empty() => Ok(value),
        Ok(_) => Err("Empty input".into()),
        Err(e) => Err(format!("Couldn't read the input: {}", e)),
    }
}

/// If `func` returns `Err`, prints an error message
/// and terminates the current process.
fn run_or_exit<F: Fn() -> Result<(), String>>(func: F) {
    if let Err(message) = func() {
        eprintln!("{}", message);
        process::exit(1);
    }
}
