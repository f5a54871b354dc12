//! Module for searching the active catalog.

use super::*;

#[derive(Args, Clone)]
pub struct SearchOptions {
  /// Title to look for
  pub query: String,
}

/// Function for the [`Commands::Search`] in the CLI.
pub async fn search<I: UserInteraction>(
  interaction: &I,
  yomu: Yomu,
  search_options: SearchOptions,
) -> Result<()> {
  let SearchOptions { query } = search_options;
  if query.trim().is_empty() {
    return Err(YomudError::Command("Search query must not be empty".into()));
  }

  let source = yomu.active_source().await?;
  interaction.reply(ResponseContent::Working(&format!("Searching {source} for: {query}")))?;
  let results = yomu.search_manga(&query).await?;
  interaction.reply(ResponseContent::SearchResults(&results))
}
