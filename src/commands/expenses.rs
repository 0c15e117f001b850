use crate::app::App;
use crate::args::{AddArgs, RecentArgs};
use crate::commands::{expense_table, with_warning, Out};
use crate::model::{dates, Expense, NewExpense};
use crate::{Config, Mode, Result};

/// Handles the `tracpro add` command. The date defaults to today and the payer to the last payer
/// used on this machine.
pub async fn add(config: Config, mode: Mode, args: AddArgs) -> Result<Out<Vec<Expense>>> {
    let mut app = App::new(config, mode).await?;
    let paid_by = args
        .paid_by()
        .map(str::to_string)
        .or_else(|| app.view().last_paid_by.clone())
        .unwrap_or_default();
    let expense = NewExpense {
        date: args
            .date()
            .map(str::to_string)
            .unwrap_or_else(dates::current_date),
        amount: args.amount(),
        expense_type: args.expense_type().to_string(),
        payment_type: args.payment_type().to_string(),
        paid_by,
        remarks: args.remarks().map(str::to_string),
    };
    let summary = format!(
        "Added {} for {} on {}, paid by {}",
        expense.amount, expense.expense_type, expense.date, expense.paid_by
    );
    let recent = app.add_expense(expense).await?;
    let message = with_warning(
        format!("{summary}\n\n{}", expense_table(recent.value())),
        &recent,
    );
    Ok(Out::new(message, recent.into_value()))
}

/// Handles the `tracpro recent` command.
pub async fn recent(config: Config, mode: Mode, args: RecentArgs) -> Result<Out<Vec<Expense>>> {
    let limit = args.limit().unwrap_or(config.recent_limit());
    let mut app = App::new(config, mode).await?;
    if args.cached() {
        let mut expenses = app.view().recent.clone();
        expenses.truncate(limit);
        return Ok(Out::new(expense_table(&expenses), expenses));
    }
    let recent = app.fetch_recent(limit).await?;
    let message = with_warning(expense_table(recent.value()), &recent);
    Ok(Out::new(message, recent.into_value()))
}
