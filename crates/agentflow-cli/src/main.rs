//! Agentflow CLI: run and manage agent workflows from the command line.

use agentflow_cli::commands;
use clap::{Parser, Subcommand};

/// Agentflow CLI: sequential LLM agent workflows
#[derive(Parser)]
#[command(name = "agentflow", version, about = "Agentflow CLI: sequential LLM agent workflows")]
pub struct Cli {
    /// Path to the SQLite database file (overrides the config file)
    #[arg(long, env = "AGENTFLOW_DB_PATH", global = true)]
    db: Option<String>,

    /// YAML configuration file (LLM provider, scheduler credentials, db path)
    #[arg(long, env = "AGENTFLOW_CONFIG", global = true)]
    config: Option<String>,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// Run, validate and manage workflows
    Workflow {
        #[command(subcommand)]
        action: WorkflowAction,
    },

    /// Execute a stored workflow by id
    Execute {
        /// Workflow id
        workflow_id: i64,
        #[command(flatten)]
        input: InputArgs,
    },

    /// Inspect and preview agents
    Agent {
        #[command(subcommand)]
        action: AgentAction,
    },
}

/// Inputs shared by every command that runs agents.
#[derive(clap::Args)]
struct InputArgs {
    /// Text content for the first step
    #[arg(long)]
    content: Option<String>,
    /// File whose text replaces --content (text files only)
    #[arg(long)]
    file: Option<String>,
    /// Envelope variable, repeatable: --var subject="Weekly sync"
    #[arg(long = "var", value_name = "KEY=VALUE")]
    vars: Vec<String>,
}

#[derive(Subcommand)]
enum WorkflowAction {
    /// Run a workflow YAML file without storing it
    Run {
        /// Path to the workflow YAML file
        file: String,
        #[command(flatten)]
        input: InputArgs,
        /// Free-text instructions passed to every agent
        #[arg(long)]
        prompt: Option<String>,
    },
    /// Validate a workflow YAML file against the agent catalog
    Validate {
        /// Path to the workflow YAML file
        file: String,
    },
    /// List stored workflows
    List {
        /// Only show templates
        #[arg(long)]
        templates: bool,
    },
    /// Show a stored workflow
    Show {
        /// Workflow id
        id: i64,
    },
    /// Store a workflow YAML file
    Create {
        /// Path to the workflow YAML file
        file: String,
    },
    /// Delete a stored workflow
    Delete {
        /// Workflow id
        id: i64,
    },
}

#[derive(Subcommand)]
enum AgentAction {
    /// List catalog agents
    List,
    /// Run a single agent on adapted input
    Preview {
        /// Agent id
        agent_id: i64,
        #[command(flatten)]
        input: InputArgs,
        /// Step configuration as a JSON object
        #[arg(long = "config-json")]
        config_json: Option<String>,
    },
}

#[tokio::main]
async fn main() {
    // .env.local takes priority over .env; neither overrides the real environment
    dotenvy::from_filename(".env.local").ok();
    dotenvy::dotenv().ok();

    let cli = Cli::parse();

    // Initialize tracing
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "agentflow_core=warn,agentflow_cli=info".into()),
        )
        .with_writer(std::io::stderr)
        .init();

    let Some(command) = cli.command else {
        // No subcommand, show help
        use clap::CommandFactory;
        Cli::command().print_help().ok();
        println!();
        return;
    };

    let state = commands::init_state(cli.db.as_deref(), cli.config.as_deref()).await;

    let result = match command {
        Commands::Workflow { action } => match action {
            WorkflowAction::Run {
                file,
                input,
                prompt,
            } => {
                commands::workflow::run(
                    &state,
                    &file,
                    input.content.as_deref(),
                    input.file.as_deref(),
                    &input.vars,
                    prompt.as_deref(),
                )
                .await
            }
            WorkflowAction::Validate { file } => commands::workflow::validate(&state, &file).await,
            WorkflowAction::List { templates } => commands::workflow::list(&state, templates).await,
            WorkflowAction::Show { id } => commands::workflow::show(&state, id).await,
            WorkflowAction::Create { file } => {
                commands::workflow::create(&state, &file).await.map(|_| ())
            }
            WorkflowAction::Delete { id } => commands::workflow::delete(&state, id).await,
        },

        Commands::Execute { workflow_id, input } => {
            commands::execute::execute(
                &state,
                workflow_id,
                input.content.as_deref(),
                input.file.as_deref(),
                &input.vars,
            )
            .await
        }

        Commands::Agent { action } => match action {
            AgentAction::List => commands::agent::list(&state).await,
            AgentAction::Preview {
                agent_id,
                input,
                config_json,
            } => {
                commands::agent::preview(
                    &state,
                    agent_id,
                    input.content.as_deref(),
                    input.file.as_deref(),
                    &input.vars,
                    config_json.as_deref(),
                )
                .await
            }
        },
    };

    if let Err(e) = result {
        eprintln!("Error: {}", e);
        std::process::exit(1);
    }
}
