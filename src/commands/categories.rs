use crate::app::App;
use crate::args::CategoriesAction;
use crate::commands::{with_warning, Out};
use crate::model::Categories;
use crate::{Config, Mode, Result};

/// Handles the `tracpro categories` subcommands. Every change replaces all three lists in the
/// spreadsheet.
pub async fn categories(
    config: Config,
    mode: Mode,
    action: &CategoriesAction,
) -> Result<Out<Categories>> {
    let mut app = App::new(config, mode).await?;
    let outcome = match action {
        CategoriesAction::Show { refresh } => {
            if *refresh {
                app.load_config().await?;
            }
            None
        }
        CategoriesAction::Set {
            expense_types,
            payment_types,
            users,
        } => {
            let categories = Categories::new(
                expense_types.iter().map(|s| s.trim()),
                payment_types.iter().map(|s| s.trim()),
                users.iter().map(|s| s.trim()),
            );
            Some(app.save_categories(categories).await?)
        }
        CategoriesAction::Add { kind, name } => {
            app.load_config().await?;
            Some(app.add_category(*kind, name).await?)
        }
        CategoriesAction::Remove { kind, name } => {
            app.load_config().await?;
            Some(app.remove_category(*kind, name).await?)
        }
    };

    let categories = app.view().categories.clone();
    let mut message = format!(
        "Expense types: {}\nPayment types: {}\nUsers: {}",
        categories.expense_types.join(", "),
        categories.payment_types.join(", "),
        categories.users.join(", ")
    );
    if let Some(outcome) = outcome {
        message = with_warning(format!("Saved\n\n{message}"), &outcome);
    }
    Ok(Out::new(message, categories))
}
