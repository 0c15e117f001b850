use crate::app::App;
use crate::args::ThemeChoice;
use crate::commands::Out;
use crate::model::Theme;
use crate::{Config, Mode, Result};

/// Handles the `tracpro theme` command: shows, sets or toggles the theme.
pub async fn theme(config: Config, mode: Mode, choice: Option<ThemeChoice>) -> Result<Out<Theme>> {
    let mut app = App::new(config, mode).await?;
    let theme = match choice {
        None => return Ok(Out::new(format!("Theme: {}", app.theme()), app.theme())),
        Some(choice) => match choice.theme() {
            Some(theme) => app.set_theme(theme).await?,
            None => app.toggle_theme().await?,
        },
    };
    Ok(Out::new(format!("Theme set to {theme}"), theme))
}
