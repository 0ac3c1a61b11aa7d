//! Single-account commands.

use crate::app::{read_password, AppContext, PasswordPrompt};
use crate::cli::{AddArgs, ChangeEmailArgs, DeleteArgs, FindArgs, ModifyArgs, PasswordArgs};
use crate::output::{print_user, user_json};
use crate::ui::{emit, status, Status, Terminal};

use super::{close_after, parse_data};

fn report(ctx: &AppContext, message: &str) {
    if !ctx.quiet() {
        let term = Terminal::detect(false);
        emit(&term, &status(&term, Status::Done, message));
    }
}

pub async fn handle_add(ctx: &AppContext<'_>, args: &AddArgs) -> anyhow::Result<()> {
    let data = parse_data(args.data.as_deref())?;
    let password = read_password(args.password.as_deref(), PasswordPrompt::Confirm)?;
    let store = ctx.open_store()?;
    let result = store.add_user(&args.email, &password, data).await;
    close_after(store, result).await?;
    report(ctx, &format!("Added {}", args.email));
    Ok(())
}

pub async fn handle_find(ctx: &AppContext<'_>, args: &FindArgs) -> anyhow::Result<()> {
    let store = ctx.open_store()?;
    let result = store.find_user(&args.email).await;
    let user = close_after(store, result).await?;

    let term = Terminal::detect(args.json);
    if term.json() {
        println!("{}", serde_json::to_string_pretty(&user_json(&user))?);
    } else {
        print_user(&term, &user, ctx.quiet());
    }
    Ok(())
}

pub async fn handle_check_password(
    ctx: &AppContext<'_>,
    args: &PasswordArgs,
) -> anyhow::Result<()> {
    let password = read_password(args.password.as_deref(), PasswordPrompt::Once)?;
    let store = ctx.open_store()?;
    let result = store.check_password(&args.email, &password).await;
    close_after(store, result).await?;
    report(ctx, &format!("Password OK for {}", args.email));
    Ok(())
}

pub async fn handle_change_email(
    ctx: &AppContext<'_>,
    args: &ChangeEmailArgs,
) -> anyhow::Result<()> {
    let store = ctx.open_store()?;
    let result = store.change_email(&args.old, &args.new).await;
    close_after(store, result).await?;
    report(ctx, &format!("Moved {} to {}", args.old, args.new));
    Ok(())
}

pub async fn handle_change_password(
    ctx: &AppContext<'_>,
    args: &PasswordArgs,
) -> anyhow::Result<()> {
    let password = read_password(args.password.as_deref(), PasswordPrompt::Confirm)?;
    let store = ctx.open_store()?;
    let result = store.change_password(&args.email, &password).await;
    close_after(store, result).await?;
    report(ctx, &format!("Changed password for {}", args.email));
    Ok(())
}

pub async fn handle_modify(ctx: &AppContext<'_>, args: &ModifyArgs) -> anyhow::Result<()> {
    let data = parse_data(Some(&args.data))?;
    let store = ctx.open_store()?;
    let result = store.modify_user(&args.email, data).await;
    close_after(store, result).await?;
    report(ctx, &format!("Updated {}", args.email));
    Ok(())
}

pub async fn handle_delete(ctx: &AppContext<'_>, args: &DeleteArgs) -> anyhow::Result<()> {
    let store = ctx.open_store()?;
    let result = store.delete_user(&args.email).await;
    close_after(store, result).await?;
    report(ctx, &format!("Deleted {}", args.email));
    Ok(())
}
