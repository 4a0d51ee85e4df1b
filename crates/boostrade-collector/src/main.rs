//! Boostrade 데이터 수집기 CLI.

use boostrade_collector::config::{load_credentials, RunMode};
use boostrade_collector::modules::{
    build_pipeline, PipelineSettings, DEFAULT_INITIAL_LIMIT, DEFAULT_STEADY_LIMIT,
    DEFAULT_TREND_TIMEFRAME,
};
use boostrade_collector::{CollectorConfig, CollectorError, Result};
use boostrade_core::{init_logging, Instrument, LogConfig, Timeframe};
use clap::{Args, Parser, Subcommand};
use std::path::PathBuf;
use std::process::ExitCode;
use tokio_util::sync::CancellationToken;
use tracing::{error, info, warn};

#[derive(Parser)]
#[command(name = "boostrade-collector")]
#[command(about = "Boostrade candle + search interest collector", long_about = None)]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// 로그 레벨 (trace, debug, info, warn, error)
    #[arg(long, default_value = "info", global = true)]
    log_level: String,
}

#[derive(Subcommand)]
enum Commands {
    /// 데몬 모드: 종료 신호를 받을 때까지 주기적으로 수집
    Run(RunArgs),

    /// 한 사이클만 수집하고 종료
    Once(RunArgs),

    /// 자격증명 파일만 검증 (연결하지 않음)
    CheckCredentials {
        #[arg(long, default_value = "credentials.json")]
        credentials: PathBuf,
    },
}

#[derive(Args)]
struct RunArgs {
    /// 거래쌍 (예: BTCUSDT)
    #[arg(long)]
    instrument: Instrument,

    /// 트렌드 검색어에 쓸 상품명 (예: bitcoin)
    #[arg(long)]
    commodity: String,

    /// 캔들 간격 (Binance 표기)
    #[arg(long, default_value = "1h")]
    interval: Timeframe,

    /// Google Trends 조회 기간
    #[arg(long, default_value = DEFAULT_TREND_TIMEFRAME)]
    trend_timeframe: String,

    /// 첫 사이클 캔들 수
    #[arg(long, default_value_t = DEFAULT_INITIAL_LIMIT)]
    initial_limit: usize,

    /// 이후 사이클 캔들 수
    #[arg(long, default_value_t = DEFAULT_STEADY_LIMIT)]
    steady_limit: usize,

    /// 자격증명 파일 경로
    #[arg(long, default_value = "credentials.json")]
    credentials: PathBuf,
}

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();

    // 로깅 초기화
    if let Err(e) = init_logging(LogConfig::new(cli.log_level.clone()).with_env_format()) {
        eprintln!("로깅 초기화 실패: {}", e);
        return ExitCode::FAILURE;
    }

    info!("Boostrade Collector 시작");

    let result = match cli.command {
        Commands::Run(args) => collect(args, false).await,
        Commands::Once(args) => collect(args, true).await,
        Commands::CheckCredentials { credentials } => check_credentials(credentials),
    };

    match result {
        Ok(()) => {
            info!("Boostrade Collector 종료");
            ExitCode::SUCCESS
        }
        Err(CollectorError::Cancelled) => {
            info!("초기화 중 종료 신호 수신, 종료");
            ExitCode::SUCCESS
        }
        Err(e) => {
            error!(error = %e, "수집기 실패");
            ExitCode::from(e.exit_code())
        }
    }
}

fn check_credentials(path: PathBuf) -> Result<()> {
    let credentials = load_credentials(&path)?;
    info!(path = %path.display(), credentials = ?credentials, "자격증명 파일 정상");
    Ok(())
}

async fn collect(args: RunArgs, once: bool) -> Result<()> {
    let mode = if once { RunMode::SingleCycle } else { RunMode::Daemon };
    let config = CollectorConfig::from_env(mode)?;
    // 자격증명은 어떤 연결보다 먼저 검증
    let credentials = load_credentials(&args.credentials)?;

    let label = args.instrument.to_string();
    let settings = PipelineSettings::new(args.instrument, args.commodity)
        .with_config(&config)
        .with_interval(args.interval)
        .with_trend_timeframe(args.trend_timeframe)
        .with_limits(args.initial_limit, args.steady_limit);
    let mut pipeline = build_pipeline(&config, &credentials, settings)?;
    drop(credentials);

    info!(
        interval_minutes = config.schedule.interval_minutes,
        keyword = pipeline.keyword(),
        "설정 로드 완료"
    );

    let token = CancellationToken::new();
    tokio::spawn(shutdown_signal(token.clone()));

    let started = tokio::select! {
        result = pipeline.start() => result,
        _ = token.cancelled() => Err(CollectorError::Cancelled),
    };

    let result = match started {
        Ok(()) if once => pipeline
            .run_cycle()
            .await
            .map(|stats| stats.log_summary(&label)),
        Ok(()) => pipeline.run(token).await,
        Err(e) => Err(e),
    };

    pipeline.shutdown().await;
    result
}

/// 종료 시그널 대기.
///
/// Ctrl+C 또는 SIGTERM 시그널을 수신하면 종료 토큰을 취소합니다.
async fn shutdown_signal(shutdown_token: CancellationToken) {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            error!(error = %e, "Ctrl+C 핸들러 설치 실패");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(e) => {
                error!(error = %e, "SIGTERM 핸들러 설치 실패");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {
            warn!("Received Ctrl+C, initiating graceful shutdown...");
        }
        _ = terminate => {
            warn!("Received SIGTERM, initiating graceful shutdown...");
        }
    }

    shutdown_token.cancel();
}
