use crate::domain::model::{
    RawConfig, DEFAULT_ADMIN_EMAIL, DEFAULT_ADMIN_PASSWORD, DEFAULT_ADMIN_PORT, DEFAULT_DB_PASSWORD,
    DEFAULT_DB_PORT, DEFAULT_DB_USER,
};
use clap::Parser;
use std::path::PathBuf;

#[derive(Debug, Clone, Parser)]
#[command(name = "pg-stack")]
#[command(about = "Provision a local PostgreSQL database and pgAdmin console as containers")]
pub struct CliConfig {
    #[arg(short = 'u', long, default_value = DEFAULT_DB_USER, help = "PostgreSQL user")]
    pub db_user: String,

    #[arg(short = 'p', long, default_value = DEFAULT_DB_PASSWORD, help = "PostgreSQL password (min 8 characters)")]
    pub db_password: String,

    // 埠號以字串接收，讓非數字輸入走驗證流程 (exit 1)
    #[arg(long, default_value_t = DEFAULT_DB_PORT.to_string(), help = "Published PostgreSQL port")]
    pub db_port: String,

    #[arg(long, default_value = DEFAULT_ADMIN_EMAIL, help = "pgAdmin login email")]
    pub admin_email: String,

    #[arg(long, default_value = DEFAULT_ADMIN_PASSWORD, help = "pgAdmin password (min 8 characters)")]
    pub admin_password: String,

    #[arg(long, default_value_t = DEFAULT_ADMIN_PORT.to_string(), help = "Published pgAdmin port")]
    pub admin_port: String,

    #[arg(long, help = "Skip removing existing containers, volumes and network before provisioning")]
    pub no_cleanup: bool,

    #[arg(long, help = "TOML file overriding images, names and readiness settings")]
    pub config: Option<PathBuf>,

    #[arg(long, default_value = ".", help = "Directory for the generated manifest and servers file")]
    pub work_dir: PathBuf,

    #[arg(long, help = "Validate, resolve ports and print the generated files without starting anything")]
    pub dry_run: bool,

    #[arg(short, long, help = "Enable verbose output")]
    pub verbose: bool,

    #[arg(long, help = "Emit logs as JSON")]
    pub log_json: bool,
}

impl CliConfig {
    pub fn raw_config(&self) -> RawConfig {
        RawConfig {
            db_user: self.db_user.clone(),
            db_password: self.db_password.clone(),
            db_port: self.db_port.clone(),
            admin_email: self.admin_email.clone(),
            admin_password: self.admin_password.clone(),
            admin_port: self.admin_port.clone(),
            skip_cleanup: self.no_cleanup,
        }
    }
}
