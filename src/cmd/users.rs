//! User commands for `floortrack users`.

use anyhow::Result;
use dialoguer::Password;

use floortrack::app::App;
use floortrack::common::filter::user_matches;
use floortrack::common::{User, UserDraft, timestamp};
use floortrack::services::users::{list_users, register_user};
use floortrack::ui::{Table, icons};

use super::super::UsersCommands;
use super::listed;

pub async fn cmd_users(app: &App, command: UsersCommands) -> Result<()> {
    match command {
        UsersCommands::List { search } => {
            let search = search.unwrap_or_default();
            let users = listed("users", list_users(&app.api).await);
            let matching: Vec<&User> = users.iter().filter(|u| user_matches(u, &search)).collect();

            println!();
            if matching.is_empty() {
                println!("No users found.");
                println!();
                return Ok(());
            }
            let mut table = Table::new(["ID", "Username", "Email", "Active", "Created"]);
            for user in matching {
                table.row([
                    user.id.to_string(),
                    user.username.clone(),
                    user.email.clone(),
                    if user.is_active { "yes" } else { "no" }.to_string(),
                    user.date_created
                        .as_ref()
                        .map(timestamp::display)
                        .unwrap_or_else(|| "-".to_string()),
                ]);
            }
            println!("{}", table.render());
            println!();
        }
        UsersCommands::Register { username, email } => {
            let password = Password::new()
                .with_prompt("Password")
                .with_confirmation("Repeat password", "Passwords do not match")
                .interact()?;
            let user = register_user(
                &app.api,
                &UserDraft {
                    email,
                    username,
                    password,
                },
            )
            .await?;
            println!("{}Registered user {} ({})", icons::CHECK, user.id, user.username);
        }
    }
    Ok(())
}
