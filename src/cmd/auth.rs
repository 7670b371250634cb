//! Session commands for `floortrack login`, `logout`, `whoami`.

use anyhow::Result;
use dialoguer::{Input, Password};

use floortrack::app::App;
use floortrack::common::Credentials;
use floortrack::services::users::current_user;
use floortrack::session::SignOut;
use floortrack::ui::icons;

pub async fn cmd_login(app: &App, username: Option<&str>) -> Result<()> {
    let username = match username {
        Some(name) => name.to_string(),
        None => Input::new().with_prompt("Username").interact_text()?,
    };
    let password = Password::new().with_prompt("Password").interact()?;

    let credentials = Credentials { username, password };
    app.api.sign_in(&credentials).await?;

    println!(
        "{}Signed in to {} as {}",
        icons::CHECK,
        app.api.base_url(),
        console::style(&credentials.username).bold()
    );
    Ok(())
}

pub fn cmd_logout(app: &App) -> Result<()> {
    match app.session().sign_out()? {
        SignOut::SignedOut => println!("Signed out."),
        SignOut::AlreadySignedOut => println!("Not signed in."),
    }
    Ok(())
}

pub async fn cmd_whoami(app: &App) -> Result<()> {
    if !app.session().validate_current()? {
        println!("Not signed in.");
        println!();
        println!("Run 'floortrack login' to sign in.");
        return Ok(());
    }

    let user = current_user(&app.api).await?;
    println!();
    println!("User:     {}", console::style(&user.username).bold());
    println!("Email:    {}", user.email);
    println!("Active:   {}", if user.is_active { "yes" } else { "no" });
    println!("Backend:  {}", app.api.base_url());
    println!();
    Ok(())
}
