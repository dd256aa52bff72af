//! Administrative entry point for a terms store file.
//!
//! Usage: `tos_cli <db-path> <status|list|publish <text>|agree <user-id>|check <user-id>>`
//!
//! Logging is enabled only when `TOS_LOG_DIR` is set; `TOS_LOG_LEVEL`
//! overrides the build default.

use log::error;
use std::error::Error;
use std::process::ExitCode;
use tos_core::db::open_db;
use tos_core::{
    default_log_level, init_logging, SqliteTermsOfServiceRepository,
    SqliteUserAgreementRepository, TermsListQuery, TermsService, User,
};

const USAGE: &str =
    "usage: tos_cli <db-path> <status|list|publish <text>|agree <user-id>|check <user-id>>";

fn main() -> ExitCode {
    if let Ok(log_dir) = std::env::var("TOS_LOG_DIR") {
        let level =
            std::env::var("TOS_LOG_LEVEL").unwrap_or_else(|_| default_log_level().to_string());
        if let Err(err) = init_logging(&level, &log_dir) {
            eprintln!("warning: logging disabled: {err}");
        }
    }

    let args: Vec<String> = std::env::args().skip(1).collect();
    match run(&args) {
        Ok(lines) => {
            for line in lines {
                println!("{line}");
            }
            ExitCode::SUCCESS
        }
        Err(err) => {
            error!("event=cli_command module=cli status=error error={err}");
            eprintln!("error: {err}");
            ExitCode::FAILURE
        }
    }
}

fn run(args: &[String]) -> Result<Vec<String>, Box<dyn Error>> {
    let (db_path, command, rest) = match args {
        [db_path, command, rest @ ..] => (db_path, command.as_str(), rest),
        _ => return Err(USAGE.into()),
    };

    let conn = open_db(db_path)?;
    let service = TermsService::new(
        SqliteTermsOfServiceRepository::try_new(&conn)?,
        SqliteUserAgreementRepository::try_new(&conn)?,
    );

    match (command, rest) {
        ("status", []) => {
            let current = service.get_current_tos()?;
            Ok(vec![format!("{} {current}", current.id)])
        }
        ("list", []) => Ok(service
            .list_terms(&TermsListQuery::default())?
            .into_iter()
            .map(|terms| format!("{} {terms}", terms.id))
            .collect()),
        ("publish", [content]) => {
            let published = service.publish_terms(content.as_str())?;
            Ok(vec![format!("published {} {published}", published.id)])
        }
        ("agree", [user_id]) => {
            let user = User::new(user_id.as_str(), user_id.as_str());
            let agreement = service.accept_current_terms(&user)?;
            Ok(vec![service.describe_agreement(&agreement, &user)?])
        }
        ("check", [user_id]) => {
            let user = User::new(user_id.as_str(), user_id.as_str());
            let agreed = service.has_user_agreed_latest_tos(&user)?;
            Ok(vec![format!("{user_id} agreed_latest={agreed}")])
        }
        _ => Err(USAGE.into()),
    }
}
