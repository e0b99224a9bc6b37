//! 可靠传输仿真
//!
//! 在两条模拟链路上跑一次 Go-Back-N 传输，打印汇总，可选输出 JSON 报告

use std::path::PathBuf;
use std::process::ExitCode;

use clap::Parser;
use rdt_rs::app::BlockSource;
use rdt_rs::config::Config;
use rdt_rs::receiver::{DeliverySink, DiscardSink, FileSink};
use rdt_rs::sender::Variant;
use rdt_rs::transfer::{Transfer, TransferReport};

#[derive(Debug, Parser)]
#[command(name = "rdt_sim", about = "Go-Back-N 可靠传输仿真（Tahoe / Reno 拥塞控制）")]
struct Args {
    /// JSON 配置文件；命令行参数覆盖其中的字段
    #[arg(long)]
    config: Option<PathBuf>,
    #[arg(long, value_enum)]
    variant: Option<Variant>,
    /// 合成数据块个数（未指定 --data-file 时使用）
    #[arg(long, default_value_t = 1000)]
    blocks: u64,
    /// 从文件读取待发送的整数（空白分隔）
    #[arg(long)]
    data_file: Option<PathBuf>,
    /// 交付的数据写到这里，每行一个整数
    #[arg(long)]
    out: Option<PathBuf>,
    /// 写出 JSON 格式的传输报告
    #[arg(long)]
    report_json: Option<PathBuf>,
    /// 重传定时器周期（毫秒）
    #[arg(long)]
    rto_ms: Option<u64>,
    #[arg(long)]
    batch_size: Option<usize>,
    /// 初始 ssthresh（报文个数）
    #[arg(long)]
    ssthresh: Option<u32>,
    /// 每个数据块的整数个数
    #[arg(long)]
    block_len: Option<usize>,
    /// 丢包概率
    #[arg(long)]
    loss: Option<f64>,
    /// 出错概率
    #[arg(long)]
    corrupt: Option<f64>,
    /// 延迟概率
    #[arg(long)]
    delay: Option<f64>,
    /// 单向链路时延（毫秒）
    #[arg(long)]
    latency_ms: Option<u64>,
    #[arg(long)]
    seed: Option<u64>,
}

impl Args {
    fn build_config(&self) -> rdt_rs::Result<Config> {
        let mut cfg = match &self.config {
            Some(path) => Config::from_json_file(path)?,
            None => Config::default(),
        };
        if let Some(v) = self.variant {
            cfg.variant = v;
        }
        if let Some(v) = self.rto_ms {
            cfg.rto_ms = v;
        }
        if let Some(v) = self.batch_size {
            cfg.batch_size = v;
        }
        if let Some(v) = self.ssthresh {
            cfg.init_ssthresh = v;
        }
        if let Some(v) = self.block_len {
            cfg.block_len = v;
        }
        if let Some(v) = self.loss {
            cfg.link.loss_rate = v;
        }
        if let Some(v) = self.corrupt {
            cfg.link.corrupt_rate = v;
        }
        if let Some(v) = self.delay {
            cfg.link.delay_rate = v;
        }
        if let Some(v) = self.latency_ms {
            cfg.link.latency_ms = v;
        }
        if let Some(v) = self.seed {
            cfg.link.seed = Some(v);
        }
        cfg.validate()?;
        Ok(cfg)
    }
}

async fn run(args: Args) -> rdt_rs::Result<TransferReport> {
    let cfg = args.build_config()?;
    let source = match &args.data_file {
        Some(path) => BlockSource::from_file(path, cfg.block_len)?,
        None => BlockSource::synthetic(args.blocks, cfg.block_len),
    };
    let sink: Box<dyn DeliverySink> = match &args.out {
        Some(path) => Box::new(FileSink::create(path)?),
        None => Box::new(DiscardSink::default()),
    };

    let report = Transfer::new(cfg)?.run(&source, sink).await?;
    if let Some(path) = &args.report_json {
        std::fs::write(path, serde_json::to_string_pretty(&report)?)?;
    }
    Ok(report)
}

#[tokio::main]
async fn main() -> ExitCode {
    // 初始化 tracing
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .with_file(true)
        .with_line_number(true)
        .with_target(true)
        .init();

    let args = Args::parse();
    match run(args).await {
        Ok(report) => {
            let s = &report.sender;
            println!(
                "done variant={:?} blocks_sent={} blocks_delivered={} batches={} cwnd={:.2} ssthresh={} elapsed_ms={}",
                report.variant,
                report.blocks_sent,
                report.blocks_delivered,
                report.batches_flushed,
                s.cwnd,
                s.ssthresh,
                report.elapsed_ms,
            );
            println!(
                "sender transmissions={} retransmissions={} fast_retransmits={} timeouts={} dup_acks={} corrupted_acks={}",
                s.stats.transmissions,
                s.stats.retransmissions,
                s.stats.fast_retransmits,
                s.stats.timeouts,
                s.stats.dup_acks,
                s.stats.corrupted_acks,
            );
            println!(
                "links data_dropped={} data_corrupted={} ack_dropped={} ack_corrupted={}",
                report.data_link.dropped,
                report.data_link.corrupted,
                report.ack_link.dropped,
                report.ack_link.corrupted,
            );
            ExitCode::SUCCESS
        }
        Err(e) => {
            eprintln!("error: {e}");
            ExitCode::FAILURE
        }
    }
}
