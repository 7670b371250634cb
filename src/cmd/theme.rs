//! Theme preference for `floortrack theme`.

use anyhow::Result;

use floortrack::app::App;

use super::super::ThemeCommands;

pub fn cmd_theme(app: &App, command: Option<ThemeCommands>) -> Result<()> {
    let theme = match command {
        None | Some(ThemeCommands::Show) => app.view.theme()?,
        Some(ThemeCommands::Toggle) => app.view.toggle_theme()?,
        Some(ThemeCommands::Set { theme }) => {
            app.view.set_theme(theme)?;
            theme
        }
    };
    println!("Theme: {}", theme);
    Ok(())
}
