use clap::{Args, Subcommand};
use colored::Colorize;
use qualis_alm::{
    AlmIntegrationApi, AlmIntegrationClient, AlmKind, AlmSettingsInstance,
    BitbucketImportController, ImportView,
};
use qualis_core::{ServerConnectionConfig, DEFAULT_HTTP_TIMEOUT_SECS};
use std::sync::Arc;
use tokio::sync::mpsc;
use tracing::{debug, info};

#[derive(Args)]
pub struct BitbucketCommand {
    /// Base URL of the Qualis server
    #[arg(long, env = "QUALIS_SERVER_URL", default_value = "http://localhost:9000")]
    pub server_url: String,

    /// User token used to authenticate against the Qualis server
    #[arg(long, env = "QUALIS_TOKEN", hide_env_values = true)]
    pub token: Option<String>,

    /// HTTP timeout in seconds
    #[arg(long, env = "QUALIS_HTTP_TIMEOUT_SECS", default_value_t = DEFAULT_HTTP_TIMEOUT_SECS)]
    pub timeout_secs: u64,

    /// The current user can administer ALM settings
    #[arg(long)]
    pub admin: bool,

    #[command(subcommand)]
    pub command: BitbucketCommands,
}

#[derive(Subcommand)]
pub enum BitbucketCommands {
    /// Show projects and repositories visible through the configured instance
    Status,
    /// Store a Bitbucket personal access token
    SetToken {
        /// The personal access token
        #[arg(long, env = "QUALIS_BITBUCKET_PAT", hide_env_values = true)]
        pat: String,
    },
    /// Import a repository as a new project
    Import {
        /// Bitbucket project key
        #[arg(long)]
        project_key: String,
        /// Repository slug
        #[arg(long)]
        slug: String,
    },
}

impl BitbucketCommand {
    pub fn execute(self) -> anyhow::Result<()> {
        let rt = tokio::runtime::Runtime::new()?;
        rt.block_on(self.run())
    }

    async fn run(self) -> anyhow::Result<()> {
        let config = ServerConnectionConfig::new(&self.server_url, self.token)?
            .with_timeout_secs(self.timeout_secs);
        let api: Arc<dyn AlmIntegrationApi> = Arc::new(AlmIntegrationClient::new(config)?);

        let (created_tx, mut created_rx) = mpsc::unbounded_channel::<Vec<String>>();
        let controller = BitbucketImportController::new(
            Arc::clone(&api),
            Vec::new(),
            self.admin,
            Arc::new(move |keys| {
                // Nothing listens once the command returns
                let _ = created_tx.send(keys);
            }),
        );

        // The instance list arrives separately, like a parent screen loading bindings
        controller.set_loading_bindings(true);
        let (_, settings) = tokio::join!(controller.mount(), load_bitbucket_settings(api.as_ref()));
        controller.set_loading_bindings(false);
        let settings = settings?;

        if settings.is_empty() {
            render_missing_setting(self.admin);
            controller.unmount();
            return Ok(());
        }
        controller.update_settings(settings).await;

        let result = match self.command {
            BitbucketCommands::Status => {
                render(&controller.view());
                Ok(())
            }
            BitbucketCommands::SetToken { pat } => {
                controller.submit_personal_access_token(&pat).await;
                let view = controller.view();
                render(&view);
                if view.show_personal_access_token_form {
                    Err(anyhow::anyhow!("The personal access token was not accepted"))
                } else {
                    Ok(())
                }
            }
            BitbucketCommands::Import { project_key, slug } => {
                import(&controller, &mut created_rx, &project_key, &slug).await
            }
        };

        controller.unmount();
        result
    }
}

async fn load_bitbucket_settings(
    api: &dyn AlmIntegrationApi,
) -> anyhow::Result<Vec<AlmSettingsInstance>> {
    let settings: Vec<_> = api
        .list_alm_settings()
        .await?
        .alm_settings
        .into_iter()
        .filter(|s| s.alm == AlmKind::Bitbucket)
        .collect();

    debug!("Found {} Bitbucket instance(s)", settings.len());
    Ok(settings)
}

async fn import(
    controller: &BitbucketImportController,
    created_rx: &mut mpsc::UnboundedReceiver<Vec<String>>,
    project_key: &str,
    slug: &str,
) -> anyhow::Result<()> {
    let view = controller.view();
    if view.show_personal_access_token_form {
        render(&view);
        anyhow::bail!("A valid personal access token is required before importing");
    }

    let repository = view
        .state
        .project_repositories
        .as_ref()
        .and_then(|repos| repos.get(project_key))
        .and_then(|repos| repos.iter().find(|r| r.slug == slug))
        .cloned()
        .ok_or_else(|| anyhow::anyhow!("Repository {}/{} not found", project_key, slug))?;

    if let Some(existing) = &repository.sq_project_key {
        anyhow::bail!(
            "Repository {}/{} is already imported as {}",
            project_key,
            slug,
            existing
        );
    }

    info!("Importing {}/{}", project_key, slug);
    controller.select_repository(repository);
    controller.import_repository().await;

    match created_rx.try_recv() {
        Ok(keys) => {
            for key in keys {
                println!(
                    "{} {}",
                    "✅ Project created:".bright_green().bold(),
                    key.bright_cyan()
                );
            }
            Ok(())
        }
        Err(_) => Err(anyhow::anyhow!("Import of {}/{} failed", project_key, slug)),
    }
}

fn render_missing_setting(can_admin: bool) {
    println!("{}", "No Bitbucket Server instance is configured.".bright_yellow());
    if can_admin {
        println!(
            "{}",
            "Configure one under Administration > ALM Integrations.".bright_white()
        );
    } else {
        println!(
            "{}",
            "Ask an administrator to configure one.".bright_white()
        );
    }
}

fn render(view: &ImportView) {
    let state = &view.state;

    if let Some(setting) = &state.bitbucket_setting {
        println!(
            "{} {}",
            "Bitbucket instance:".bright_white().bold(),
            setting.key.bright_cyan()
        );
    }

    if view.loading {
        println!("{}", "Loading...".bright_white());
        return;
    }

    if view.show_personal_access_token_form {
        println!(
            "{}",
            "A personal access token is required. Run `qualis bitbucket set-token --pat <token>`."
                .bright_yellow()
        );
        return;
    }

    let Some(projects) = &state.projects else {
        println!("{}", "Could not load Bitbucket projects.".bright_red());
        return;
    };
    if projects.is_empty() {
        println!("{}", "No Bitbucket projects found.".bright_white());
        return;
    }

    for project in projects {
        println!(
            "{} {}",
            project.name.bright_white().bold(),
            format!("({})", project.key).dimmed()
        );

        let repositories = state
            .project_repositories
            .as_ref()
            .and_then(|repos| repos.get(&project.key));
        match repositories {
            Some(repositories) if !repositories.is_empty() => {
                for repository in repositories {
                    match &repository.sq_project_key {
                        Some(key) => println!(
                            "  {} {}",
                            repository.slug,
                            format!("imported as {}", key).bright_green()
                        ),
                        None => println!("  {}", repository.slug),
                    }
                }
            }
            Some(_) => println!("  {}", "no repositories".dimmed()),
            None => println!("  {}", "repositories unavailable".bright_red()),
        }
    }
}
