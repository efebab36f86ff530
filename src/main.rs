use anyhow::Context;
use clap::error::ErrorKind;
use clap::Parser;
use pg_stack::utils::{logger, validation::Validate};
use pg_stack::{
    CliConfig, DockerCli, HttpConsoleProbe, LocalPortProbe, LocalStorage, Provisioner, StackLayout,
};
use std::future::Future;
use std::process::ExitCode;

#[tokio::main]
async fn main() -> ExitCode {
    let config = match CliConfig::try_parse() {
        Ok(config) => config,
        Err(e) => {
            let _ = e.print();
            return ExitCode::from(usage_exit_code(&e));
        }
    };

    // 初始化日誌
    if config.log_json {
        logger::init_json_logger(config.verbose);
    } else {
        logger::init_cli_logger(config.verbose);
    }

    tracing::info!("Starting pg-stack");
    if config.verbose {
        tracing::debug!("CLI config: {:?}", config);
    }

    match run(config).await {
        Ok(code) => code,
        Err(e) => {
            eprintln!("❌ {:#}", e);
            ExitCode::from(1)
        }
    }
}

async fn run(config: CliConfig) -> anyhow::Result<ExitCode> {
    let layout = match &config.config {
        Some(path) => StackLayout::from_file(path)
            .with_context(|| format!("failed to load config file '{}'", path.display()))?,
        None => StackLayout::default(),
    };
    layout.validate().context("invalid stack layout")?;

    let storage = LocalStorage::new(config.work_dir.clone());
    let runtime = DockerCli::new(layout.runtime.program.clone());
    let console = HttpConsoleProbe::new(layout.readiness.request_timeout())
        .context("failed to build HTTP client")?;
    let provisioner = Provisioner::new(runtime, storage, LocalPortProbe, console, layout);

    let raw = config.raw_config();

    if config.dry_run {
        tracing::info!("🔍 DRY RUN MODE - nothing will be started");
        return Ok(match provisioner.prepare(&raw).and_then(|c| provisioner.render(&c)) {
            Ok(artifacts) => {
                let files = &provisioner.layout().files;
                println!("# {}", files.manifest);
                println!("{}", artifacts.manifest);
                println!("# {}", files.registration);
                println!("{}", artifacts.registration);
                ExitCode::SUCCESS
            }
            Err(e) => report_failure(&e),
        });
    }

    let shutdown = async {
        if tokio::signal::ctrl_c().await.is_err() {
            // 無法註冊訊號時不中斷流程
            std::future::pending::<()>().await;
        }
        tracing::warn!("Interrupt received, rolling back (press Ctrl-C again to abort)");
        // 回滾期間 docker 指令可能卡住，第二次 Ctrl-C 直接結束
        let _ = spawn_abort_watch(tokio::signal::ctrl_c(), || {
            eprintln!("❌ Rollback aborted; containers, volumes or the network may remain");
            std::process::exit(1);
        });
    };

    match provisioner.run_until(&raw, shutdown).await {
        Ok(summary) => {
            tracing::info!("✅ Provisioning completed successfully!");
            println!("✅ PostgreSQL and pgAdmin are up");
            println!("{}", summary);
            Ok(ExitCode::SUCCESS)
        }
        Err(e) => Ok(report_failure(&e)),
    }
}

/// --help/--version 正常結束；其他參數錯誤一律 exit 1
fn usage_exit_code(e: &clap::Error) -> u8 {
    match e.kind() {
        ErrorKind::DisplayHelp | ErrorKind::DisplayVersion => 0,
        _ => 1,
    }
}

fn failure_line(e: &pg_stack::ProvisionError) -> String {
    format!("❌ {} (💡 {})", e.user_friendly_message(), e.recovery_suggestion())
}

fn report_failure(e: &pg_stack::ProvisionError) -> ExitCode {
    tracing::debug!("Category: {:?}, Severity: {:?}", e.category(), e.severity());
    eprintln!("{}", failure_line(e));
    ExitCode::from(1)
}

fn spawn_abort_watch<F, A>(signal: F, abort: A) -> tokio::task::JoinHandle<()>
where
    F: Future<Output = std::io::Result<()>> + Send + 'static,
    A: FnOnce() + Send + 'static,
{
    tokio::spawn(async move {
        if signal.await.is_ok() {
            abort();
        }
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use pg_stack::ProvisionError;
    use std::sync::atomic::{AtomicBool, Ordering};
    use std::sync::Arc;

    #[test]
    fn test_help_exits_zero() {
        let err = CliConfig::try_parse_from(["pg-stack", "--help"]).unwrap_err();
        assert_eq!(usage_exit_code(&err), 0);
    }

    #[test]
    fn test_unknown_flag_exits_one() {
        let err = CliConfig::try_parse_from(["pg-stack", "--bogus"]).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::UnknownArgument);
        assert_eq!(usage_exit_code(&err), 1);
    }

    #[test]
    fn test_validation_failure_exits_one_with_single_line() {
        let err = ProvisionError::validation("db_password", "must be at least 8 characters");
        assert_eq!(report_failure(&err), ExitCode::from(1));

        let line = failure_line(&err);
        assert!(!line.contains('\n'));
        assert!(line.contains("db_password"));
        assert!(line.contains(err.recovery_suggestion()));
    }

    #[tokio::test]
    async fn test_second_signal_aborts() {
        let aborted = Arc::new(AtomicBool::new(false));
        let flag = aborted.clone();

        spawn_abort_watch(std::future::ready(Ok(())), move || {
            flag.store(true, Ordering::SeqCst);
        })
        .await
        .unwrap();

        assert!(aborted.load(Ordering::SeqCst));
    }

    #[tokio::test]
    async fn test_failed_signal_registration_does_not_abort() {
        let aborted = Arc::new(AtomicBool::new(false));
        let flag = aborted.clone();

        let failed = std::future::ready(Err(std::io::Error::other("no signal handler")));
        spawn_abort_watch(failed, move || {
            flag.store(true, Ordering::SeqCst);
        })
        .await
        .unwrap();

        assert!(!aborted.load(Ordering::SeqCst));
    }
}
