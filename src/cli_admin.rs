use anyhow::{bail, Context, Result};
use clap::builder::styling::{AnsiColor, Color, Style};
use clap::builder::Styles;
use clap::{Parser, Subcommand};
use std::{path::PathBuf, sync::Arc};

use skillwise_server::notifications::Notifier;
use skillwise_server::user::{FullUserStore, SqliteUserStore, UserManager, UserRole};

fn get_styles() -> Styles {
    Styles::styled()
        .usage(
            Style::new()
                .bold()
                .underline()
                .fg_color(Some(Color::Ansi(AnsiColor::Cyan))),
        )
        .header(
            Style::new()
                .bold()
                .underline()
                .fg_color(Some(Color::Ansi(AnsiColor::Cyan))),
        )
        .literal(
            Style::new()
                .bold()
                .fg_color(Some(Color::Ansi(AnsiColor::Green))),
        )
        .error(
            Style::new()
                .bold()
                .fg_color(Some(Color::Ansi(AnsiColor::Red))),
        )
        .placeholder(Style::new().fg_color(Some(Color::Ansi(AnsiColor::BrightBlack))))
}

fn parse_path(s: &str) -> Result<PathBuf> {
    let original_path = PathBuf::from(s);
    if original_path.is_absolute() {
        return Ok(original_path);
    }
    let cwd = std::env::current_dir()?;
    Ok(cwd.join(original_path))
}

fn parse_role(s: &str) -> Result<UserRole> {
    UserRole::from_str(s).with_context(|| format!("Unknown role {:?}", s))
}

/// Operator tool working directly on `user.db`, for bootstrapping the first
/// admin and fixing accounts while the server is down.
#[derive(Parser)]
#[command(styles = get_styles())]
struct CliArgs {
    /// Path of the user database.
    #[clap(long, value_parser = parse_path)]
    pub db: PathBuf,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Creates a user with the given handle and role, without a password.
    AddUser {
        user_handle: String,
        #[clap(value_parser = parse_role)]
        role: UserRole,
    },

    /// Sets or replaces the password of a user.
    SetPassword {
        user_handle: String,
        password: String,
    },

    /// Verifies the password of a user without issuing a token.
    CheckPassword {
        user_handle: String,
        password: String,
    },

    /// Changes the role of a user, any role allowed.
    SetRole {
        user_handle: String,
        #[clap(value_parser = parse_role)]
        role: UserRole,
    },

    /// Shows all users.
    ListUsers,

    /// Shows all roles and their permissions.
    ListRoles,
}

fn user_id(user_manager: &UserManager, user_handle: &str) -> Result<usize> {
    user_manager
        .get_user_id(user_handle)?
        .with_context(|| format!("User {} not found.", user_handle))
}

fn execute(command: Command, user_manager: &UserManager) -> Result<()> {
    match command {
        Command::AddUser { user_handle, role } => {
            let id = user_manager.add_user(&user_handle, role)?;
            println!("Created {} {} with id {}", role, user_handle, id);
        }
        Command::SetPassword {
            user_handle,
            password,
        } => {
            user_manager.set_password(&user_handle, &password)?;
            println!("Password of {} updated", user_handle);
        }
        Command::CheckPassword {
            user_handle,
            password,
        } => {
            let credentials = user_manager
                .get_user_credentials(&user_handle)?
                .with_context(|| format!("User {} not found.", user_handle))?;
            let Some(password_credentials) = credentials.username_password else {
                bail!("User {} has no password set.", user_handle);
            };
            let matches = password_credentials
                .hasher
                .verify(password.as_str(), password_credentials.hash.as_str())?;
            println!("Password matches: {}", matches);
        }
        Command::SetRole { user_handle, role } => {
            let id = user_id(user_manager, &user_handle)?;
            user_manager.force_role(id, role)?;
            println!("{} is now {}", user_handle, role);
        }
        Command::ListUsers => {
            for user in user_manager.list_users()? {
                println!(
                    "{:>5}  {:<32} {:<8} {}",
                    user.id,
                    user.handle,
                    user.role,
                    if user.blocked { "blocked" } else { "" }
                );
            }
        }
        Command::ListRoles => {
            for role in UserRole::ALL {
                println!("Role: {}", role);
                println!("Permissions:");
                for permission in role.permissions() {
                    println!("  - {:?}", permission);
                }
                println!();
            }
        }
    }
    Ok(())
}

fn main() -> Result<()> {
    let cli_args = CliArgs::parse();
    let user_store: Arc<dyn FullUserStore> = Arc::new(
        SqliteUserStore::new(&cli_args.db)
            .with_context(|| format!("Could not open user db at {:?}", cli_args.db))?,
    );
    // Only the unsupervised age of self registration depends on this value.
    let user_manager = UserManager::new(
        user_store.clone(),
        Notifier::new(user_store),
        skillwise_server::config::DEFAULT_MIN_UNSUPERVISED_AGE,
    );

    execute(cli_args.command, &user_manager)
}
