use clap::Parser;
use pronote_averages::core::report;
use pronote_averages::domain::model::Condition;
use pronote_averages::domain::ports::Storage;
use pronote_averages::utils::error::ErrorSeverity;
use pronote_averages::utils::{logger, validation::Validate};
use pronote_averages::{AveragingPipeline, CliConfig, LocalStorage, OutputFormat};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let config = CliConfig::parse();

    // 初始化日誌
    if config.json_logs {
        logger::init_json_logger();
    } else {
        logger::init_cli_logger(config.verbose);
    }

    tracing::info!("Starting pronote-averages CLI");
    if config.verbose {
        tracing::debug!("CLI config: {:?}", config);
    }

    // 驗證配置
    let portal_config = match config.validate().and_then(|_| config.portal_config()) {
        Ok(portal_config) => portal_config,
        Err(e) => {
            tracing::error!("❌ Configuration validation failed: {}", e);
            tracing::error!("💡 Suggestion: {}", e.recovery_suggestion());
            eprintln!("❌ {}", e.user_friendly_message());
            std::process::exit(1);
        }
    };

    let pipeline = match AveragingPipeline::with_webdriver(portal_config) {
        Ok(pipeline) => pipeline,
        Err(e) => {
            eprintln!("❌ {}", e.user_friendly_message());
            eprintln!("💡 {}", e.recovery_suggestion());
            let code = if e.severity() >= ErrorSeverity::Critical { 3 } else { 1 };
            std::process::exit(code);
        }
    };

    let report = pipeline.compute_for(&config.credentials()).await;

    let rendered = match config.format {
        OutputFormat::Text => report::render_text(&report, &pipeline.config().coefficients),
        OutputFormat::Json => report::render_json(&report)?,
        OutputFormat::Csv => report::render_csv(&report)?,
    };
    println!("{}", rendered);

    if let Some(output) = &config.output {
        let storage = LocalStorage::new(output.clone());
        let filename = format!("averages.{}", config.format.extension());
        storage.write_file(&filename, rendered.as_bytes()).await?;
        tracing::info!("📁 Report saved to: {}", storage.full_path(&filename));
    }

    // 依結束狀態決定退出碼
    let exit_code = match &report.condition {
        Condition::GradesFound { .. } => 0,
        Condition::NoGradesYet | Condition::GradesNotRendered => 2,
        Condition::InvalidCredentials | Condition::PageTimeout { .. } | Condition::Failed { .. } => 1,
        Condition::BrowserUnavailable { .. } => 3,
    };
    if exit_code > 0 {
        std::process::exit(exit_code);
    }

    Ok(())
}
