//! Module for setting up a [`yomu`] environment

use super::*;

#[derive(Args, Clone)]
pub struct InitOptions {
  /// Database file
  #[arg(long)]
  pub db_path:         Option<PathBuf>,
  /// Directory for downloaded chapters
  #[arg(long, conflicts_with = "no_downloads")]
  pub download_path:   Option<PathBuf>,
  /// Disable offline downloads
  #[arg(long, action = ArgAction::SetTrue)]
  pub no_downloads:    bool,
  /// Catalog API base URL
  #[arg(long)]
  pub api_base_url:    Option<String>,
  /// Write the bundled source definitions so they can be edited
  #[arg(long, action = ArgAction::SetTrue)]
  pub default_sources: bool,
}

/// Function for the [`Commands::Init`] in the CLI.
pub async fn init<I: UserInteraction>(
  interaction: &I,
  config_dir: PathBuf,
  init_options: InitOptions,
) -> Result<()> {
  let InitOptions { db_path, download_path, no_downloads, api_base_url, default_sources } =
    init_options;

  if config_dir.join(CONFIG_FILE).exists()
    && !interaction.confirm(&format!(
      "A configuration already exists in {}, do you want to overwrite it?",
      config_dir.display()
    ))?
  {
    interaction.reply(ResponseContent::Info("Keeping the existing configuration"))?;
    return Ok(());
  }

  let mut config = Config::default().with_sources_path(config_dir.join("sources"));
  if let Some(url) = api_base_url {
    config = config.with_api_base_url(url);
  }

  // Set database location
  config = if let Some(db_path) = db_path {
    config.with_database_path(db_path)
  } else if !interaction.confirm(&format!(
    "Would you like to use the default path {:?} for the yomu database?",
    config.database_path,
  ))? {
    interaction.reply(ResponseContent::Info(
      "Please pass in your intended database path using --db-path",
    ))?;
    return Ok(());
  } else {
    config
  };

  // Set download location
  config = if no_downloads {
    config.with_download_path(None)
  } else if let Some(download_path) = download_path {
    config.with_download_path(Some(download_path))
  } else if let Some(default) = config.download_path.clone() {
    if interaction.confirm(&format!(
      "Would you like to store downloaded chapters in {default:?}?"
    ))? {
      config
    } else {
      interaction.reply(ResponseContent::Info(
        "Downloads are disabled. Pass --download-path to enable them later",
      ))?;
      config.with_download_path(None)
    }
  } else {
    interaction.reply(ResponseContent::Info(
      "No document directory found, downloads are disabled. Pass --download-path to enable them",
    ))?;
    config
  };

  config.save(&config_dir)?;

  if default_sources {
    interaction.reply(ResponseContent::Info("Writing the default source definitions"))?;
    std::fs::create_dir_all(&config.sources_path)?;
    for kind in SourceKind::ALL {
      let path = config.sources_path.join(format!("{kind}.toml"));
      std::fs::write(path, kind.default_config_str())?;
    }
  }

  // Opening once creates the database
  Yomu::from_config(config.clone()).await?;

  let downloads = config
    .download_path
    .as_ref()
    .map_or_else(|| "disabled".to_string(), |path| format!("{path:?}"));
  interaction.reply(ResponseContent::Success(&format!(
    "Created yomu configuration with\nConfig path: {:?}\nDatabase path: {:?}\nDownloads: \
     {downloads}",
    config_dir, config.database_path,
  )))?;
  Ok(())
}
