use super::Session;
use crate::core::context::ReleaseContext;
use crate::core::error::{RailError, RailResult};
use crate::release::actions::available_actions;
use crate::versioning::{fetch_active_release_trains, print_active_release_trains};
use std::path::Path;

/// Interactive release: pick one of the available actions and perform it
pub fn run_publish(root: &Path) -> RailResult<()> {
  let session = Session::open(root)?;
  publish_release(&session.context())
}

/// Run the release flow, returning to the previously checked out branch afterwards
pub fn publish_release(ctx: &ReleaseContext<'_>) -> RailResult<()> {
  verify_no_uncommitted_changes(ctx)?;
  let previous = ctx.git.current_branch_or_revision()?;
  verify_running_from_next_branch(ctx, &previous)?;
  verify_npm_login_state(ctx)?;

  let result = select_and_perform_action(ctx);

  match ctx.git.checkout(&previous, true) {
    Ok(true) => {}
    Ok(false) => println!("⚠️  Could not switch back to \"{}\". Check out the branch manually.", previous),
    Err(e) => tracing::warn!(error = %e, branch = %previous, "failed to restore previous branch"),
  }
  result
}

fn select_and_perform_action(ctx: &ReleaseContext<'_>) -> RailResult<()> {
  let trains = fetch_active_release_trains(ctx.github, ctx.config)?;
  print_active_release_trains(&trains, None);

  let actions = available_actions(&trains, ctx)?;
  if actions.is_empty() {
    return Err(RailError::message("No release action is available for the current release trains."));
  }

  let choices: Vec<String> = actions.iter().map(|a| a.description()).collect();
  let index = ctx.prompt.select("Please select the type of release you want to perform.", &choices)?;
  let action = actions
    .get(index)
    .ok_or_else(|| RailError::message(format!("No release action at index {}", index)))?;

  tracing::info!(action = %action.description(), "performing release action");
  action.perform(ctx)?;
  println!("🎉 Release action completed");
  Ok(())
}

fn verify_no_uncommitted_changes(ctx: &ReleaseContext<'_>) -> RailResult<()> {
  if ctx.git.has_uncommitted_changes()? {
    return Err(RailError::with_help(
      "There are changes which are not committed and should be discarded.",
      "Commit or stash your changes before publishing.",
    ));
  }
  Ok(())
}

fn verify_running_from_next_branch(ctx: &ReleaseContext<'_>, current: &str) -> RailResult<()> {
  let next = &ctx.config.github.main_branch;
  if current != next {
    return Err(RailError::with_help(
      format!("The release tool is not running from the \"{}\" branch (currently \"{}\").", next, current),
      format!("Run `git checkout {}` and try again.", next),
    ));
  }
  Ok(())
}

fn verify_npm_login_state(ctx: &ReleaseContext<'_>) -> RailResult<()> {
  match ctx.npm.whoami(ctx.registry())? {
    Some(user) => {
      tracing::debug!(%user, "logged into the registry");
      Ok(())
    }
    None => Err(RailError::with_help(
      "Not logged into the npm registry.",
      "Run `npm login` (with --registry when publishing elsewhere) and try again.",
    )),
  }
}
