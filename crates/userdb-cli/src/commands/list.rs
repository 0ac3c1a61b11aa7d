use userdb_core::UserRange;

use crate::app::AppContext;
use crate::cli::ListArgs;
use crate::output::{print_user_list, users_json};
use crate::ui::Terminal;

use super::close_after;

fn range_from_args(args: &ListArgs) -> UserRange {
    UserRange {
        gt: args.gt.clone(),
        gte: args.gte.clone(),
        lt: args.lt.clone(),
        lte: args.lte.clone(),
        limit: args.limit,
        reverse: args.reverse,
    }
}

pub async fn handle_list(ctx: &AppContext<'_>, args: &ListArgs) -> anyhow::Result<()> {
    let store = ctx.open_store()?;
    let result = store.list_users(range_from_args(args)).await;
    let users = close_after(store, result).await?;

    let term = Terminal::detect(args.json);
    if term.json() {
        println!("{}", serde_json::to_string_pretty(&users_json(&users))?);
    } else {
        print_user_list(&term, &users, ctx.quiet());
    }
    Ok(())
}
