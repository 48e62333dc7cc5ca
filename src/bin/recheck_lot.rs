// Small ops utility: re-run inventory validation for one production lot.
//
// Usage:
//   cargo run --bin recheck_lot -- <lot_id> [db_path] [actor]
//
// Prints the new alert set as JSON on stdout. On failure prints the error
// response JSON on stderr and exits with status 1 (2 when retriable).

use anyhow::{anyhow, Context};
use bom_alert_engine::app::{get_default_db_path, AppState};
use bom_alert_engine::logging;

fn main() -> anyhow::Result<()> {
    logging::init();

    let mut args = std::env::args().skip(1);
    let lot_id = args
        .next()
        .map(|s| s.trim().to_string())
        .filter(|s| !s.is_empty())
        .context("usage: recheck_lot <lot_id> [db_path] [actor]")?;
    let db_path = args.next().unwrap_or_else(get_default_db_path);
    let actor = args.next();

    let state = AppState::new(db_path.clone())
        .map_err(|e| anyhow!(e))
        .with_context(|| format!("无法打开数据库: {}", db_path))?;

    match state.lot_api.check_inventory(&lot_id, actor.as_deref()) {
        Ok(response) => {
            println!("{}", serde_json::to_string_pretty(&response)?);
            Ok(())
        }
        Err(err) => {
            let response = err.to_response();
            eprintln!("{}", serde_json::to_string_pretty(&response)?);
            std::process::exit(if response.retriable { 2 } else { 1 });
        }
    }
}
