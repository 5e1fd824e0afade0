use std::fmt;

use storage::repository::Storage;
use stress_core::model::{Member, MemberId};

#[derive(Debug, Clone)]
struct Args {
    db_url: String,
    members: u32,
    first_id: u64,
}

#[derive(Debug)]
enum ArgsError {
    MissingValue { flag: &'static str },
    UnknownArg(String),
    InvalidDbUrl { raw: String },
    InvalidMembers { raw: String },
    InvalidFirstId { raw: String },
}

impl fmt::Display for ArgsError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ArgsError::MissingValue { flag } => write!(f, "{flag} requires a value"),
            ArgsError::UnknownArg(arg) => write!(f, "unknown argument: {arg}"),
            ArgsError::InvalidDbUrl { raw } => write!(f, "invalid --db value: {raw}"),
            ArgsError::InvalidMembers { raw } => write!(f, "invalid --members value: {raw}"),
            ArgsError::InvalidFirstId { raw } => write!(f, "invalid --first-id value: {raw}"),
        }
    }
}

impl std::error::Error for ArgsError {}

fn require_value(
    args: &mut impl Iterator<Item = String>,
    flag: &'static str,
) -> Result<String, ArgsError> {
    args.next().ok_or(ArgsError::MissingValue { flag })
}

impl Args {
    fn parse() -> Result<Self, ArgsError> {
        let mut db_url =
            std::env::var("STRESS_DB_URL").unwrap_or_else(|_| "sqlite:stress.sqlite3".into());
        let mut members = std::env::var("STRESS_SEED_MEMBERS")
            .ok()
            .and_then(|value| value.parse::<u32>().ok())
            .unwrap_or(4);
        let mut first_id = 1_u64;

        let mut args = std::env::args().skip(1);
        while let Some(arg) = args.next() {
            match arg.as_str() {
                "--db" => {
                    let value = require_value(&mut args, "--db")?;
                    if value.trim().is_empty() {
                        return Err(ArgsError::InvalidDbUrl { raw: value });
                    }
                    db_url = value;
                }
                "--members" => {
                    let value = require_value(&mut args, "--members")?;
                    members = value
                        .parse::<u32>()
                        .map_err(|_| ArgsError::InvalidMembers { raw: value.clone() })?;
                }
                "--first-id" => {
                    let value = require_value(&mut args, "--first-id")?;
                    first_id = value
                        .parse::<u64>()
                        .map_err(|_| ArgsError::InvalidFirstId { raw: value.clone() })?;
                }
                "--help" | "-h" => {
                    print_usage();
                    std::process::exit(0);
                }
                _ => return Err(ArgsError::UnknownArg(arg)),
            }
        }

        Ok(Self {
            db_url,
            members,
            first_id,
        })
    }
}

fn print_usage() {
    eprintln!("Usage:");
    eprintln!("  cargo run -p storage --bin seed -- [options]");
    eprintln!();
    eprintln!("Options:");
    eprintln!("  --db <sqlite_url>         SQLite URL (default: sqlite:stress.sqlite3)");
    eprintln!("  --members <n>             Number of sample members to upsert (default: 4)");
    eprintln!("  --first-id <id>           Id of the first sample member (default: 1)");
    eprintln!("  -h, --help                Show this help");
    eprintln!();
    eprintln!("Environment (same as flags):");
    eprintln!("  STRESS_DB_URL, STRESS_SEED_MEMBERS");
}

async fn run() -> Result<(), Box<dyn std::error::Error>> {
    let args = Args::parse().map_err(|e| {
        eprintln!("{e}");
        print_usage();
        e
    })?;

    let storage = Storage::sqlite(&args.db_url).await?;

    let samples = [
        ("王小明", Some("技師")),
        ("李大華", Some("護理師")),
        ("陳美玲", None),
        ("林志強", Some("工程師")),
    ];
    for i in 0..args.members {
        let (name, occupation) = samples[(i as usize) % samples.len()];
        let member = Member::new(
            MemberId::new(args.first_id + u64::from(i)),
            name,
            occupation.map(str::to_owned),
        );
        storage.members.upsert_member(&member).await?;
    }

    println!(
        "Seeded {} members starting at id {} into {}",
        args.members, args.first_id, args.db_url
    );

    Ok(())
}

#[tokio::main]
async fn main() {
    if let Err(err) = run().await {
        eprintln!("{err}");
        std::process::exit(2);
    }
}
