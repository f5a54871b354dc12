//! Content source selection.

use super::*;

#[derive(Subcommand, Clone)]
pub enum SourceCommands {
  /// Print the active source
  Get,
  /// Switch to another source
  Set {
    /// Source name, see `yomu source list`
    name: String,
  },
  /// List available sources
  List,
}

/// Function for the [`Commands::Source`] in the CLI.
pub async fn source<I: UserInteraction>(
  interaction: &I,
  yomu: Yomu,
  cmd: SourceCommands,
) -> Result<()> {
  match cmd {
    SourceCommands::Get => {
      let active = yomu.active_source().await?;
      interaction.reply(ResponseContent::Sources { active, available: &[active.as_str()] })
    },
    SourceCommands::Set { name } => {
      let active = yomu.set_active_source(&name).await?;
      interaction.reply(ResponseContent::Success(&format!("Now reading from {active}")))
    },
    SourceCommands::List => {
      let active = yomu.active_source().await?;
      interaction.reply(ResponseContent::Sources { active, available: &yomu.sources() })
    },
  }
}
