//! CLI commands

use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use clap::Subcommand;
use serde::Serialize;
use std::sync::Arc;
use std::time::Duration;
use studyboard_core::{
    ChangeRoleRequest, CreateProblemRequest, CreateProjectRequest, CreateResultRequest,
    CreateSubjectRequest, CreateTaskRequest, JoinProjectRequest, JoinSubjectRequest, LoginRequest,
    Pagination, RegisterRequest, RoleType, UpdateProblemRequest, UpdateSubjectRequest,
    UpdateTaskRequest,
};
use studyboard_http::{ApiClient, FileCredentialStore};
use tracing::{debug, info};
use uuid::Uuid;

use crate::config::CliConfig;

const SESSION_EXPIRED_NOTICE: &str = "Session expired. Run `studyboard login` to sign in again.";

#[derive(Subcommand)]
pub enum Commands {
    /// Log in and store the session
    Login {
        #[arg(long)]
        email: String,

        #[arg(long, env = "STUDYBOARD_PASSWORD", hide_env_values = true)]
        password: String,
    },

    /// Create an account and store the session
    Register {
        #[arg(long)]
        email: String,

        #[arg(long, env = "STUDYBOARD_PASSWORD", hide_env_values = true)]
        password: String,

        #[arg(long)]
        nickname: String,
    },

    /// End the session and forget stored credentials
    Logout,

    /// Inspect the effective configuration
    Config {
        #[command(subcommand)]
        command: ConfigCommands,
    },

    /// Subject operations
    Subjects {
        #[command(subcommand)]
        command: SubjectCommands,
    },

    /// Subject membership roles
    Roles {
        #[command(subcommand)]
        command: RoleCommands,
    },

    /// Task operations
    Tasks {
        #[command(subcommand)]
        command: TaskCommands,
    },

    /// Project operations
    Projects {
        #[command(subcommand)]
        command: ProjectCommands,
    },

    /// Problem and result operations
    Problems {
        #[command(subcommand)]
        command: ProblemCommands,
    },
}

#[derive(Subcommand)]
pub enum ConfigCommands {
    /// Print the configuration after defaults, file and environment
    Show,
}

#[derive(Subcommand)]
pub enum SubjectCommands {
    /// List subjects page by page
    List {
        #[arg(long)]
        limit: Option<u32>,

        #[arg(long)]
        offset: Option<u32>,
    },

    /// Subjects you are a member of
    My,

    Show {
        id: Uuid,
    },

    Create {
        #[arg(long)]
        name: String,

        #[arg(long)]
        description: String,

        /// Join code, uppercase letters and digits
        #[arg(long)]
        code: String,
    },

    Update {
        id: Uuid,

        #[arg(long)]
        name: Option<String>,

        #[arg(long)]
        description: Option<String>,
    },

    Delete {
        id: Uuid,
    },

    /// Join a subject by its code
    Join {
        code: String,
    },

    Members {
        id: Uuid,
    },
}

#[derive(Subcommand)]
pub enum RoleCommands {
    /// Change a member's role (student, teacher or admin)
    Change {
        subject_id: Uuid,
        role_id: Uuid,

        #[arg(long)]
        role: RoleType,
    },

    /// Remove a member from a subject
    Remove {
        subject_id: Uuid,
        role_id: Uuid,
    },
}

#[derive(Subcommand)]
pub enum TaskCommands {
    /// Tasks of a subject
    List {
        subject_id: Uuid,

        #[arg(long)]
        limit: Option<u32>,

        #[arg(long)]
        offset: Option<u32>,
    },

    Show {
        id: Uuid,
    },

    Create {
        subject_id: Uuid,

        #[arg(long)]
        title: String,

        #[arg(long)]
        description: String,

        /// RFC 3339 timestamp, e.g. 2025-06-01T12:00:00Z
        #[arg(long)]
        due: DateTime<Utc>,
    },

    Update {
        id: Uuid,

        #[arg(long)]
        title: Option<String>,

        #[arg(long)]
        description: Option<String>,

        #[arg(long)]
        due: Option<DateTime<Utc>>,
    },
}

#[derive(Subcommand)]
pub enum ProjectCommands {
    /// Projects of a task
    List {
        task_id: Uuid,
    },

    /// Projects you participate in
    My,

    Create {
        task_id: Uuid,

        #[arg(long)]
        title: String,

        #[arg(long)]
        description: String,
    },

    Join {
        code: String,
    },

    Users {
        project_id: Uuid,
    },

    /// Problem completion statistics
    Stats {
        project_id: Uuid,
    },
}

#[derive(Subcommand)]
pub enum ProblemCommands {
    /// Problems of a project
    List {
        project_id: Uuid,

        /// Only problems assigned to you
        #[arg(long)]
        assigned: bool,
    },

    /// A problem with its result and child statistics
    Show {
        id: Uuid,
    },

    Subproblems {
        parent_id: Uuid,
    },

    CreateSubproblem {
        parent_id: Uuid,

        #[arg(long)]
        title: String,

        #[arg(long)]
        description: String,

        #[arg(long)]
        start: DateTime<Utc>,

        #[arg(long)]
        end: DateTime<Utc>,

        /// Repeat to assign several users
        #[arg(long = "assignee")]
        assignees: Vec<Uuid>,
    },

    Update {
        id: Uuid,

        #[arg(long)]
        title: Option<String>,

        #[arg(long)]
        description: Option<String>,

        #[arg(long)]
        start: Option<DateTime<Utc>>,

        #[arg(long)]
        end: Option<DateTime<Utc>>,

        /// Replaces the assignee list when given
        #[arg(long = "assignee")]
        assignees: Option<Vec<Uuid>>,
    },

    /// Show the recorded result of a problem
    Result {
        id: Uuid,
    },

    /// Record a result for a problem
    Resolve {
        id: Uuid,

        /// Mark the problem as done
        #[arg(long)]
        done: bool,

        #[arg(long)]
        comment: String,
    },
}

impl Commands {
    pub async fn execute(self, config: CliConfig) -> Result<()> {
        if let Commands::Config { command } = self {
            return command.execute(&config);
        }

        let client = build_client(&config)?;
        debug!("Using API at {}", client.base_url());

        match self {
            Commands::Login { email, password } => {
                let response = client.login(LoginRequest { email, password }).await?;
                info!("Logged in as {}", response.user.email);
                print_json(&response.user)
            }
            Commands::Register {
                email,
                password,
                nickname,
            } => {
                let response = client
                    .register(RegisterRequest {
                        email,
                        password,
                        nickname,
                    })
                    .await?;
                info!("Registered {}", response.user.email);
                print_json(&response.user)
            }
            Commands::Logout => {
                client.logout().await?;
                println!("Logged out");
                Ok(())
            }
            Commands::Config { command } => command.execute(&config),
            Commands::Subjects { command } => command.execute(&client).await,
            Commands::Roles { command } => command.execute(&client).await,
            Commands::Tasks { command } => command.execute(&client).await,
            Commands::Projects { command } => command.execute(&client).await,
            Commands::Problems { command } => command.execute(&client).await,
        }
    }
}

impl ConfigCommands {
    pub fn execute(self, config: &CliConfig) -> Result<()> {
        match self {
            ConfigCommands::Show => print_json(config),
        }
    }
}

impl SubjectCommands {
    pub async fn execute(self, client: &ApiClient) -> Result<()> {
        match self {
            SubjectCommands::List { limit, offset } => {
                print_json(&client.list_subjects(Pagination::new(limit, offset)).await?)
            }
            SubjectCommands::My => print_json(&client.my_subjects().await?),
            SubjectCommands::Show { id } => print_json(&client.get_subject(id).await?),
            SubjectCommands::Create {
                name,
                description,
                code,
            } => {
                let subject = client
                    .create_subject(CreateSubjectRequest {
                        name,
                        description,
                        code,
                    })
                    .await?;
                print_json(&subject)
            }
            SubjectCommands::Update {
                id,
                name,
                description,
            } => {
                let subject = client
                    .update_subject(id, UpdateSubjectRequest { name, description })
                    .await?;
                print_json(&subject)
            }
            SubjectCommands::Delete { id } => {
                client.delete_subject(id).await?;
                println!("Deleted subject {id}");
                Ok(())
            }
            SubjectCommands::Join { code } => {
                print_json(&client.join_subject(JoinSubjectRequest { code }).await?)
            }
            SubjectCommands::Members { id } => print_json(&client.subject_members(id).await?),
        }
    }
}

impl RoleCommands {
    pub async fn execute(self, client: &ApiClient) -> Result<()> {
        match self {
            RoleCommands::Change {
                subject_id,
                role_id,
                role,
            } => {
                let role = client
                    .change_role(subject_id, role_id, ChangeRoleRequest { role_type: role })
                    .await?;
                print_json(&role)
            }
            RoleCommands::Remove {
                subject_id,
                role_id,
            } => {
                client.remove_member(subject_id, role_id).await?;
                println!("Removed member {role_id}");
                Ok(())
            }
        }
    }
}

impl TaskCommands {
    pub async fn execute(self, client: &ApiClient) -> Result<()> {
        match self {
            TaskCommands::List {
                subject_id,
                limit,
                offset,
            } => {
                let page = client
                    .subject_tasks(subject_id, Pagination::new(limit, offset))
                    .await?;
                print_json(&page)
            }
            TaskCommands::Show { id } => print_json(&client.get_task(id).await?),
            TaskCommands::Create {
                subject_id,
                title,
                description,
                due,
            } => {
                let task = client
                    .create_task(
                        subject_id,
                        CreateTaskRequest {
                            title,
                            description,
                            due_date: due,
                        },
                    )
                    .await?;
                print_json(&task)
            }
            TaskCommands::Update {
                id,
                title,
                description,
                due,
            } => {
                let task = client
                    .update_task(
                        id,
                        UpdateTaskRequest {
                            title,
                            description,
                            due_date: due,
                        },
                    )
                    .await?;
                print_json(&task)
            }
        }
    }
}

impl ProjectCommands {
    pub async fn execute(self, client: &ApiClient) -> Result<()> {
        match self {
            ProjectCommands::List { task_id } => print_json(&client.task_projects(task_id).await?),
            ProjectCommands::My => print_json(&client.my_projects().await?),
            ProjectCommands::Create {
                task_id,
                title,
                description,
            } => {
                let project = client
                    .create_project(task_id, CreateProjectRequest { title, description })
                    .await?;
                print_json(&project)
            }
            ProjectCommands::Join { code } => {
                print_json(&client.join_project(JoinProjectRequest { code }).await?)
            }
            ProjectCommands::Users { project_id } => {
                print_json(&client.project_users(project_id).await?)
            }
            ProjectCommands::Stats { project_id } => {
                print_json(&client.project_statistics(project_id).await?)
            }
        }
    }
}

impl ProblemCommands {
    pub async fn execute(self, client: &ApiClient) -> Result<()> {
        match self {
            ProblemCommands::List {
                project_id,
                assigned,
            } => print_json(&client.project_problems(project_id, assigned).await?),
            ProblemCommands::Show { id } => print_json(&client.get_problem(id).await?),
            ProblemCommands::Subproblems { parent_id } => {
                print_json(&client.subproblems(parent_id).await?)
            }
            ProblemCommands::CreateSubproblem {
                parent_id,
                title,
                description,
                start,
                end,
                assignees,
            } => {
                let problem = client
                    .create_subproblem(
                        parent_id,
                        CreateProblemRequest {
                            title,
                            description,
                            start_time: start,
                            end_time: end,
                            assignee_ids: assignees,
                        },
                    )
                    .await?;
                print_json(&problem)
            }
            ProblemCommands::Update {
                id,
                title,
                description,
                start,
                end,
                assignees,
            } => {
                let problem = client
                    .update_problem(
                        id,
                        UpdateProblemRequest {
                            title,
                            description,
                            start_time: start,
                            end_time: end,
                            assignee_ids: assignees,
                        },
                    )
                    .await?;
                print_json(&problem)
            }
            ProblemCommands::Result { id } => print_json(&client.problem_result(id).await?),
            ProblemCommands::Resolve { id, done, comment } => {
                let result = client
                    .create_result(id, CreateResultRequest { done, comment })
                    .await?;
                print_json(&result)
            }
        }
    }
}

/// Build an API client whose session lives in the data directory
fn build_client(config: &CliConfig) -> Result<ApiClient> {
    let credentials_path = config.credentials_path();
    let store = FileCredentialStore::open(&credentials_path).with_context(|| {
        format!(
            "Failed to open credentials at {}",
            credentials_path.display()
        )
    })?;
    debug!(path = %store.path().display(), "Using credential store");

    let mut builder = ApiClient::builder()
        .base_url(&config.api.base_url)
        .credential_store(Arc::new(store))
        .on_unauthenticated(Arc::new(|| eprintln!("{SESSION_EXPIRED_NOTICE}")));

    if config.api.timeout_secs > 0 {
        builder = builder.timeout(Duration::from_secs(config.api.timeout_secs));
    }
    if let Some(agent) = &config.api.user_agent {
        builder = builder.user_agent(agent);
    }

    Ok(builder.build()?)
}

fn print_json<T: Serialize>(value: &T) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::Parser;

    #[derive(Parser)]
    struct TestCli {
        #[command(subcommand)]
        command: Commands,
    }

    fn parse(args: &[&str]) -> Commands {
        TestCli::try_parse_from(std::iter::once("studyboard").chain(args.iter().copied()))
            .unwrap()
            .command
    }

    #[test]
    fn test_parse_role_change() {
        let subject = Uuid::new_v4().to_string();
        let role = Uuid::new_v4().to_string();
        match parse(&["roles", "change", &subject, &role, "--role", "teacher"]) {
            Commands::Roles {
                command: RoleCommands::Change { role, .. },
            } => assert_eq!(role, RoleType::Teacher),
            _ => panic!("expected roles change"),
        }
    }

    #[test]
    fn test_parse_subproblem_with_assignees() {
        let parent = Uuid::new_v4().to_string();
        let first = Uuid::new_v4();
        let second = Uuid::new_v4();
        let command = parse(&[
            "problems",
            "create-subproblem",
            &parent,
            "--title",
            "Proof",
            "--description",
            "Prove lemma 2",
            "--start",
            "2025-03-01T09:00:00Z",
            "--end",
            "2025-03-02T09:00:00Z",
            "--assignee",
            &first.to_string(),
            "--assignee",
            &second.to_string(),
        ]);
        match command {
            Commands::Problems {
                command: ProblemCommands::CreateSubproblem { assignees, end, start, .. },
            } => {
                assert_eq!(assignees, vec![first, second]);
                assert!(end > start);
            }
            _ => panic!("expected create-subproblem"),
        }
    }

    #[test]
    fn test_rejects_bad_identifiers() {
        let result = TestCli::try_parse_from(["studyboard", "subjects", "show", "not-a-uuid"]);
        assert!(result.is_err());

        let subject = Uuid::new_v4().to_string();
        let role = Uuid::new_v4().to_string();
        let result = TestCli::try_parse_from([
            "studyboard",
            "roles",
            "change",
            subject.as_str(),
            role.as_str(),
            "--role",
            "owner",
        ]);
        assert!(result.is_err());
    }

    #[test]
    fn test_build_client_uses_data_dir_credentials() {
        let dir = tempfile::tempdir().unwrap();
        let config = CliConfig {
            data_dir: dir.path().to_path_buf(),
            ..CliConfig::default()
        };

        let client = build_client(&config).unwrap();
        assert_eq!(client.base_url(), crate::config::DEFAULT_BASE_URL);
        assert!(!client.is_logged_in());
    }
}
