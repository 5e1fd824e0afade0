use std::fmt;
use std::path::PathBuf;
use std::time::Duration;

use services::{AppConfig, AppServices, Clock, HttpSubmissionConfig};
use storage::repository::StressTestFilter;
use stress_core::model::{Choice, MemberId, Page, QUESTIONS, QuestionId, StressTestId};
use tracing::debug;
use tracing_subscriber::{EnvFilter, layer::SubscriberExt, util::SubscriberInitExt};

#[derive(Debug)]
enum ArgsError {
    MissingValue { flag: &'static str },
    UnknownArg(String),
    UnknownCommand(String),
    InvalidDbUrl { raw: String },
    InvalidTimeout { raw: String },
    InvalidMemberId { raw: String },
    InvalidStressTestId { raw: String },
    InvalidAnswer { raw: String },
    NothingToDo { command: &'static str },
}

impl fmt::Display for ArgsError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ArgsError::MissingValue { flag } => write!(f, "{flag} requires a value"),
            ArgsError::UnknownArg(arg) => write!(f, "unknown argument: {arg}"),
            ArgsError::UnknownCommand(cmd) => write!(f, "unknown subcommand: {cmd}"),
            ArgsError::InvalidDbUrl { raw } => write!(f, "invalid --db value: {raw}"),
            ArgsError::InvalidTimeout { raw } => write!(f, "invalid --timeout value: {raw}"),
            ArgsError::InvalidMemberId { raw } => write!(f, "invalid member id: {raw}"),
            ArgsError::InvalidStressTestId { raw } => write!(f, "invalid stress test id: {raw}"),
            ArgsError::InvalidAnswer { raw } => {
                write!(f, "invalid answer (expected <id>=<A|B>, e.g. a1=A): {raw}")
            }
            ArgsError::NothingToDo { command } => write!(f, "{command}: nothing given"),
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

#[derive(Debug, Clone, PartialEq, Eq)]
enum Command {
    Questions,
    Respondent {
        name: Option<String>,
        position: Option<String>,
        test_date: Option<String>,
    },
    Member(MemberId),
    Answer(Vec<(QuestionId, Choice)>),
    Status,
    Submit,
    History {
        name: Option<String>,
        member: Option<MemberId>,
    },
    Delete(Vec<StressTestId>),
    Reset,
}

struct Args {
    db_url: String,
    session_file: PathBuf,
    api_base_url: Option<String>,
    submit_timeout: Option<Duration>,
    command: Command,
}

fn print_usage() {
    eprintln!("Usage:");
    eprintln!("  cargo run -p app -- <command> [options]");
    eprintln!();
    eprintln!("Commands:");
    eprintln!("  questions                              List the 20 questions");
    eprintln!("  respondent [--name N] [--position P] [--date YYYY-MM-DD]");
    eprintln!("  member <id>                            Take the test for a member");
    eprintln!("  answer <id>=<A|B>...                   Record answers, e.g. a1=A c2=B");
    eprintln!("  status                                 Show what is still missing");
    eprintln!("  submit                                 Score and store the result");
    eprintln!("  history [--name N] [--member ID]       List stored results");
    eprintln!("  delete <id>...                         Delete stored results");
    eprintln!("  reset                                  Discard the in-progress test");
    eprintln!();
    eprintln!("Options:");
    eprintln!("  --db <sqlite_url>         SQLite URL (default: sqlite://stress.sqlite3)");
    eprintln!("  --session <path>          Session file (default: stress-session.json)");
    eprintln!("  --api <base_url>          Post results to a console backend instead");
    eprintln!("  --timeout <secs>          Give up on a submission after this long");
    eprintln!();
    eprintln!("Environment:");
    eprintln!("  STRESS_DB_URL, STRESS_SESSION_FILE, STRESS_API_BASE_URL,");
    eprintln!("  STRESS_SUBMIT_TIMEOUT_SECS, STRESS_LOG_JSON, RUST_LOG");
}

fn parse_timeout(raw: String) -> Result<Duration, ArgsError> {
    match raw.trim().parse::<u64>() {
        Ok(secs) if secs > 0 => Ok(Duration::from_secs(secs)),
        _ => Err(ArgsError::InvalidTimeout { raw }),
    }
}

fn parse_member_id(raw: String) -> Result<MemberId, ArgsError> {
    raw.parse()
        .map_err(|_| ArgsError::InvalidMemberId { raw: raw.clone() })
}

fn parse_answer(raw: String) -> Result<(QuestionId, Choice), ArgsError> {
    let parsed = raw.split_once('=').and_then(|(id, choice)| {
        let id = id.trim().parse::<QuestionId>().ok()?;
        let choice = choice.trim().to_ascii_uppercase().parse::<Choice>().ok()?;
        Some((id, choice))
    });
    parsed.ok_or(ArgsError::InvalidAnswer { raw })
}

impl Args {
    fn parse(mut args: impl Iterator<Item = String>) -> Result<Self, ArgsError> {
        let mut db_url = std::env::var("STRESS_DB_URL")
            .ok()
            .map_or_else(|| "sqlite://stress.sqlite3".into(), normalize_sqlite_url);
        let mut session_file = std::env::var("STRESS_SESSION_FILE")
            .map_or_else(|_| PathBuf::from("stress-session.json"), PathBuf::from);
        let mut api_base_url = std::env::var("STRESS_API_BASE_URL")
            .ok()
            .filter(|v| !v.trim().is_empty());
        let mut submit_timeout = std::env::var("STRESS_SUBMIT_TIMEOUT_SECS")
            .ok()
            .map(parse_timeout)
            .transpose()?;

        let Some(command) = args.next() else {
            print_usage();
            std::process::exit(0);
        };

        let mut positional = Vec::new();
        let mut name = None;
        let mut position = None;
        let mut test_date = None;
        let mut member = None;

        while let Some(arg) = args.next() {
            match arg.as_str() {
                "--db" => {
                    let value = require_value(&mut args, "--db")?;
                    if value.trim().is_empty() {
                        return Err(ArgsError::InvalidDbUrl { raw: value });
                    }
                    db_url = normalize_sqlite_url(value);
                }
                "--session" => {
                    session_file = PathBuf::from(require_value(&mut args, "--session")?);
                }
                "--api" => api_base_url = Some(require_value(&mut args, "--api")?),
                "--timeout" => {
                    submit_timeout = Some(parse_timeout(require_value(&mut args, "--timeout")?)?);
                }
                "--name" => name = Some(require_value(&mut args, "--name")?),
                "--position" => position = Some(require_value(&mut args, "--position")?),
                "--date" => test_date = Some(require_value(&mut args, "--date")?),
                "--member" => member = Some(parse_member_id(require_value(&mut args, "--member")?)?),
                "--help" | "-h" => {
                    print_usage();
                    std::process::exit(0);
                }
                flag if flag.starts_with("--") => return Err(ArgsError::UnknownArg(arg)),
                _ => positional.push(arg),
            }
        }

        let command = match command.as_str() {
            "questions" => Command::Questions,
            "respondent" => {
                if name.is_none() && position.is_none() && test_date.is_none() {
                    return Err(ArgsError::NothingToDo {
                        command: "respondent",
                    });
                }
                Command::Respondent {
                    name,
                    position,
                    test_date,
                }
            }
            "member" => {
                let raw = positional
                    .pop()
                    .ok_or(ArgsError::MissingValue { flag: "member" })?;
                Command::Member(parse_member_id(raw)?)
            }
            "answer" => {
                if positional.is_empty() {
                    return Err(ArgsError::NothingToDo { command: "answer" });
                }
                let answers = positional
                    .drain(..)
                    .map(parse_answer)
                    .collect::<Result<Vec<_>, _>>()?;
                Command::Answer(answers)
            }
            "status" => Command::Status,
            "submit" => Command::Submit,
            "history" => Command::History { name, member },
            "delete" => {
                let ids = positional
                    .drain(..)
                    .map(|raw| {
                        raw.parse::<i64>()
                            .map(StressTestId::new)
                            .map_err(|_| ArgsError::InvalidStressTestId { raw })
                    })
                    .collect::<Result<Vec<_>, _>>()?;
                Command::Delete(ids)
            }
            "reset" => Command::Reset,
            "--help" | "-h" => {
                print_usage();
                std::process::exit(0);
            }
            _ => return Err(ArgsError::UnknownCommand(command)),
        };

        if let Some(extra) = positional.into_iter().next() {
            return Err(ArgsError::UnknownArg(extra));
        }

        Ok(Self {
            db_url,
            session_file,
            api_base_url,
            submit_timeout,
            command,
        })
    }

    fn app_config(&self) -> AppConfig {
        AppConfig {
            db_url: self.db_url.clone(),
            session_file: Some(self.session_file.clone()),
            api: self.api_base_url.clone().map(|base_url| HttpSubmissionConfig { base_url }),
            submit_timeout: self.submit_timeout,
        }
    }
}

fn normalize_sqlite_url(raw: String) -> String {
    if raw == "sqlite::memory:" || raw.starts_with("sqlite://") {
        return raw;
    }

    let trimmed = raw.trim().to_string();
    let path_str = trimmed
        .strip_prefix("sqlite:")
        .unwrap_or(trimmed.as_str())
        .to_string();
    let path = std::path::Path::new(&path_str);
    let absolute = if path.is_absolute() {
        path.to_path_buf()
    } else {
        std::env::current_dir()
            .unwrap_or_else(|_| PathBuf::from("."))
            .join(path)
    };
    format!("sqlite://{}", absolute.display())
}

fn prepare_sqlite_file(db_url: &str) -> Result<(), Box<dyn std::error::Error>> {
    if db_url == "sqlite::memory:" {
        return Ok(());
    }

    let path = db_url
        .strip_prefix("sqlite://")
        .ok_or_else(|| ArgsError::InvalidDbUrl {
            raw: db_url.to_string(),
        })?;
    let path = path.split('?').next().unwrap_or(path);
    if path.is_empty() {
        return Err(ArgsError::InvalidDbUrl {
            raw: db_url.to_string(),
        }
        .into());
    }

    let path = std::path::Path::new(path);
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)?;
    }

    if !path.exists() {
        std::fs::OpenOptions::new()
            .create(true)
            .write(true)
            .truncate(false)
            .open(path)?;
    }

    Ok(())
}

fn env_bool(name: &str) -> bool {
    std::env::var(name)
        .ok()
        .is_some_and(|v| matches!(v.as_str(), "1" | "true" | "TRUE" | "yes" | "YES"))
}

fn init_tracing() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    // stdout is reserved for command output.
    if env_bool("STRESS_LOG_JSON") {
        tracing_subscriber::registry()
            .with(filter)
            .with(tracing_subscriber::fmt::layer().json().with_writer(std::io::stderr))
            .init();
    } else {
        tracing_subscriber::registry()
            .with(filter)
            .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
            .init();
    }
}

fn print_report(services: &AppServices) -> Result<(), Box<dyn std::error::Error>> {
    let workflow = services.workflow();
    let respondent = workflow.respondent()?;
    println!(
        "respondent: {} / {} / {}",
        respondent.name, respondent.position, respondent.test_date
    );
    if let Some(member) = services.session().load_selected_member()? {
        println!("member: {member}");
    }
    for page in [Page::One, Page::Two] {
        let report = workflow.validation_report(page)?;
        if report.is_complete() {
            println!("page {}: complete", page.number());
        } else {
            println!("{report}");
        }
    }
    Ok(())
}

async fn run() -> Result<(), Box<dyn std::error::Error>> {
    let args = Args::parse(std::env::args().skip(1)).inspect_err(|_| print_usage())?;

    if args.command == Command::Questions {
        for q in &QUESTIONS {
            println!("{:>2} {:<3} 甲 {}", q.ordinal, q.id, q.text_a);
            println!("          乙 {}", q.text_b);
        }
        return Ok(());
    }

    init_tracing();
    prepare_sqlite_file(&args.db_url)?;
    let services = AppServices::new_sqlite(&args.app_config(), Clock::system()).await?;
    debug!(db = %args.db_url, session = %args.session_file.display(), "services ready");

    match args.command {
        Command::Questions => {}
        Command::Respondent {
            name,
            position,
            test_date,
        } => {
            let mut workflow = services.workflow();
            let mut info = workflow.respondent()?;
            if let Some(name) = name {
                info.name = name;
            }
            if let Some(position) = position {
                info.position = position;
            }
            if let Some(test_date) = test_date {
                info.test_date = test_date;
            }
            workflow.update_respondent(info)?;
            print_report(&services)?;
        }
        Command::Member(id) => {
            let mut workflow = services.workflow();
            match workflow.select_member(id).await? {
                Some(member) => println!("member {id}: {}", member.name),
                None => println!("member {id} not found locally; stored as reference only"),
            }
        }
        Command::Answer(answers) => {
            let mut workflow = services.workflow();
            let (page1, page2): (Vec<_>, Vec<_>) = answers
                .into_iter()
                .partition(|(id, _)| id.page() == Page::One);
            for (id, choice) in page1 {
                workflow.select_answer(id, choice)?;
            }
            if !page2.is_empty() {
                workflow.enter_page2()?;
                for (id, choice) in page2 {
                    workflow.select_answer(id, choice)?;
                }
            }
            print_report(&services)?;
        }
        Command::Status => print_report(&services)?,
        Command::Submit => {
            let mut workflow = services.workflow();
            workflow.enter_page2()?;
            let receipt = workflow.submit().await?;
            println!("stored as #{}", receipt.id);
            println!(
                "{} ({})",
                receipt.scores,
                receipt.scores.level().label()
            );
        }
        Command::History { name, member } => {
            let filter = StressTestFilter {
                name,
                member_id: member,
                ..StressTestFilter::default()
            };
            for record in services.history().search(&filter).await? {
                println!(
                    "#{} {} {} {} {}",
                    record.id,
                    record.respondent.test_date,
                    record.respondent.name,
                    record.respondent.position,
                    record.scores
                );
            }
        }
        Command::Delete(ids) => {
            let deleted = services.history().delete_selected(&ids).await?;
            println!("deleted {deleted} of {}", ids.len());
        }
        Command::Reset => {
            services.workflow().discard()?;
            println!("in-progress test discarded");
        }
    }

    Ok(())
}

#[tokio::main]
async fn main() {
    if let Err(err) = run().await {
        eprintln!("{err}");
        std::process::exit(2);
    }
}
