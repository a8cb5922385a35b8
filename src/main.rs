use anyhow::Result;
use clap::Parser;
use qna_engine::config::Settings;
use qna_engine::pipeline::QaPipeline;
use qna_engine::sanitizer::ParameterSanitizer;
use qna_engine::security::SafetyValidator;
use qna_engine::Parameters;
use tracing::info;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "qna-engine")]
#[command(about = "Answer natural-language questions with bounded, read-only SQL")]
struct Args {
    /// The question in natural language (or a SQL statement with --sql-only)
    input: String,

    /// Run only the safety gate and sanitizer on INPUT as SQL; no LLM or database
    #[arg(long)]
    sql_only: bool,
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with_writer(std::io::stderr)
        .init();

    let args = Args::parse();
    let settings = Settings::from_env()?;

    if args.sql_only {
        let validator = SafetyValidator::new(settings.guard_policy());
        let verdict = match validator.validate(&args.input) {
            Ok(validated) => {
                let sanitized = ParameterSanitizer::new(settings.max_rows).sanitize(&validated.sql, &Parameters::new());
                serde_json::json!({
                    "accepted": true,
                    "tables": validated.tables,
                    "sql": sanitized.sql,
                    "advisories": sanitized.advisories,
                })
            }
            Err(e) => serde_json::json!({
                "accepted": false,
                "reason": e.reason.to_string(),
                "detail": e.detail,
            }),
        };
        println!("{}", serde_json::to_string_pretty(&verdict)?);
        return Ok(());
    }

    info!("Question: {}", args.input);
    let pipeline = QaPipeline::from_settings(&settings).await?;
    let answer = pipeline.run(&args.input).await?;
    println!("{}", serde_json::to_string_pretty(&answer)?);

    Ok(())
}
