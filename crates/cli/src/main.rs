//! # genproof CLI
//!
//! 一回限りの運用コマンド群。いずれも失敗時はエラーをログに出して非ゼロで終了する。
//!
//! - `provenance`: オフライン来歴アーティファクトの生成
//! - `check-artifact`: アーティファクトの署名・コミットメント検証
//! - `submit`: 画像のコミットメントを台帳に登録
//! - `lookup`: コミットメントの台帳照会
//! - `register-provider`: ProviderRegistryへのプロバイダ・モデル登録

mod commands;

use std::path::PathBuf;
use std::time::Duration;

use clap::{Args, Parser, Subcommand, ValueEnum};
use genproof_core::CommitMode;

#[derive(Parser, Debug)]
#[command(name = "genproof-cli", version, about = "genproof 運用コマンド")]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// 画像から署名付き来歴アーティファクトを生成する
    Provenance {
        /// 入力画像（PNG）
        #[arg(long, default_value = "./image/demo_art.png")]
        image: PathBuf,
        /// 出力先
        #[arg(long, default_value = "./image/provenance.json")]
        out: PathBuf,
        /// 宣言するモデル識別子
        #[arg(long, default_value = "mockvision-v1")]
        model_id: String,
        /// プロバイダ秘密鍵（hex）
        #[arg(long, env = "PROVIDER_PRIVATE_KEY", hide_env_values = true)]
        private_key: String,
    },
    /// アーティファクトの署名を検証し、画像があればコミットメントも照合する
    CheckArtifact {
        /// アーティファクト（JSON）
        #[arg(long, default_value = "./image/provenance.json")]
        artifact: PathBuf,
        /// 照合する画像（PNG）
        #[arg(long)]
        image: Option<PathBuf>,
    },
    /// 画像のコミットメントを台帳に登録する
    Submit {
        /// 登録する画像
        #[arg(long)]
        image: PathBuf,
        /// 宣言するモデル識別子
        #[arg(long, env = "MODEL_ID")]
        model_id: String,
        /// コミットメントモード
        #[arg(long, value_enum, default_value_t = ModeArg::Raw)]
        mode: ModeArg,
        /// レジストリコントラクト
        #[arg(long, env = "CONTRACT_ADDRESS")]
        contract: String,
        #[command(flatten)]
        chain: ChainArgs,
    },
    /// コミットメントの登録状態を照会する
    Lookup {
        /// 照会するコミットメント（`0x` + 64 hex）
        #[arg(long, conflicts_with = "image", required_unless_present = "image")]
        commitment: Option<String>,
        /// コミットメントを計算する画像
        #[arg(long)]
        image: Option<PathBuf>,
        /// 画像からコミットメントを計算する際のモード
        #[arg(long, value_enum, default_value_t = ModeArg::Raw)]
        mode: ModeArg,
        /// レジストリコントラクト
        #[arg(long, env = "CONTRACT_ADDRESS")]
        contract: String,
        #[command(flatten)]
        rpc: RpcArgs,
    },
    /// 署名者をプロバイダとして登録し、モデルを紐付ける
    RegisterProvider {
        /// ProviderRegistryコントラクト
        #[arg(long, env = "PROVIDER_REGISTRY_ADDRESS")]
        registry: String,
        /// 紐付けるモデル識別子
        #[arg(long, env = "MODEL_ID")]
        model_id: String,
        #[command(flatten)]
        chain: ChainArgs,
    },
}

/// 台帳接続の共通引数（照会のみ）
#[derive(Args, Debug, Clone)]
struct RpcArgs {
    /// JSON-RPCエンドポイント
    #[arg(long, env = "RPC_URL")]
    rpc_url: String,
    /// 台帳呼び出しの上限（秒）
    #[arg(long, env = "LEDGER_TIMEOUT_SECS", default_value_t = 120)]
    timeout_secs: u64,
}

impl RpcArgs {
    fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }
}

/// 書き込みを伴う台帳操作の引数
#[derive(Args, Debug, Clone)]
struct ChainArgs {
    #[command(flatten)]
    rpc: RpcArgs,
    /// 署名鍵（hex）
    #[arg(long, env = "PRIVATE_KEY", hide_env_values = true)]
    private_key: String,
}

/// コミットメントモード
#[derive(ValueEnum, Debug, Clone, Copy, PartialEq, Eq)]
enum ModeArg {
    Raw,
    Pixel,
}

impl From<ModeArg> for CommitMode {
    fn from(mode: ModeArg) -> Self {
        match mode {
            ModeArg::Raw => CommitMode::Raw,
            ModeArg::Pixel => CommitMode::Pixel,
        }
    }
}

async fn run(cli: Cli) -> anyhow::Result<()> {
    match cli.command {
        Command::Provenance {
            image,
            out,
            model_id,
            private_key,
        } => {
            let artifact = commands::provenance::run(&image, &out, &model_id, &private_key)?;
            println!("{}", serde_json::to_string_pretty(&artifact)?);
        }
        Command::CheckArtifact { artifact, image } => {
            let report = commands::provenance::check(&artifact, image.as_deref())?;
            println!("{}", serde_json::to_string_pretty(&report)?);
        }
        Command::Submit {
            image,
            model_id,
            mode,
            contract,
            chain,
        } => {
            let report =
                commands::ledger::submit(&image, &model_id, mode.into(), &contract, &chain).await?;
            println!("{}", serde_json::to_string_pretty(&report)?);
        }
        Command::Lookup {
            commitment,
            image,
            mode,
            contract,
            rpc,
        } => {
            let commitment = commands::ledger::resolve_commitment(
                commitment.as_deref(),
                image.as_deref(),
                mode.into(),
            )?;
            let report = commands::ledger::lookup(&commitment, &contract, &rpc).await?;
            println!("{}", serde_json::to_string_pretty(&report)?);
        }
        Command::RegisterProvider {
            registry,
            model_id,
            chain,
        } => {
            let report = commands::ledger::register_provider(&registry, &model_id, &chain).await?;
            println!("{}", serde_json::to_string_pretty(&report)?);
        }
    }
    Ok(())
}

#[tokio::main]
async fn main() {
    tracing_subscriber::fmt::init();

    let cli = Cli::parse();
    if let Err(e) = run(cli).await {
        tracing::error!("{e:#}");
        std::process::exit(1);
    }
}
