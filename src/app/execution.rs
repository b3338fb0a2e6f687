//! Application execution for the `demo`, `serve` and `client` commands

use anyhow::{Context, Result};
use std::fmt::Write as _;
use std::sync::Arc;
use log::{debug, info, warn};
use parking_lot::Mutex;
use tokio::io::BufReader;
use crate::{cli, config};
use crate::flow::{split_sources, FlowControlConfig, Pipeline, PipelineSummary};
use crate::queue::ShutdownSignal;
use crate::server::{InteractiveSession, QueueClient, QueueServer};

/// Result of one demo run
#[derive(Debug, Clone)]
pub struct DemoOutcome {
    pub source_len: usize,
    pub destination: Vec<i64>,
    pub summary: PipelineSummary,
}

impl DemoOutcome {
    pub fn is_success(&self) -> bool {
        self.source_len == self.destination.len()
    }

    /// Human readable summary, as printed at the end of a demo
    pub fn render(&self) -> String {
        let mut out = String::new();
        let _ = writeln!(out, "=== Summary ===");
        let _ = writeln!(out, "Source list size: {}", self.source_len);
        let _ = writeln!(out, "Destination list size: {}", self.destination.len());
        let _ = writeln!(out, "Queue final size: {}", self.summary.remaining);
        let _ = writeln!(out, "Queue capacity: {}", self.summary.capacity);
        let _ = writeln!(out);
        if self.is_success() {
            let _ = writeln!(out, "SUCCESS: All items were consumed!");
        } else {
            let _ = writeln!(out, "WARNING: Item count mismatch!");
        }
        let _ = writeln!(out);
        let _ = writeln!(out, "Sample items from destination (first 10):");
        let sample: Vec<String> = self.destination.iter().take(10).map(i64::to_string).collect();
        let _ = writeln!(out, "{}", sample.join(" "));
        out
    }
}

/// Number of items a demo moves; items are numbered 1..=total as `i64`
fn demo_item_count(producers: usize, items_per_producer: usize) -> Result<usize> {
    producers
        .checked_mul(items_per_producer)
        .filter(|&total| i64::try_from(total).is_ok())
        .ok_or_else(|| anyhow::anyhow!(
            "Demo too large: {} producers x {} items per producer does not fit in an i64 item range",
            producers, items_per_producer
        ))
}

/// Flow timings from the config file, adjusted by demo flags
fn resolve_flow_config(demo: &cli::args::DemoArgs, config: &config::ConfigManager) -> Result<FlowControlConfig> {
    let mut flow = if demo.responsive {
        FlowControlConfig::responsive()
    } else {
        config.get_flow_config()?
    };
    if demo.no_drain {
        flow = flow.without_drain();
    }
    Ok(flow)
}

/// Run the in-process producer/consumer demo on the blocking pool.
///
/// Ctrl+C triggers the queue's shutdown signal; the run then winds down and
/// its summary reflects what was moved before the interrupt.
pub async fn run_demo(demo: &cli::args::DemoArgs, config: &config::ConfigManager) -> Result<DemoOutcome> {
    let queue_settings = super::initialization::resolve_queue_settings(&demo.queue, config)?;
    let flow = resolve_flow_config(demo, config)?;

    let mut settings = config.get_demo_config()?;
    if let Some(producers) = demo.producers {
        settings.producers = producers;
    }
    if let Some(consumers) = demo.consumers {
        settings.consumers = consumers;
    }
    if let Some(items) = demo.items_per_producer {
        settings.items_per_producer = items;
    }
    if settings.consumers == 0 {
        return Err(anyhow::anyhow!("At least one consumer is required"));
    }

    let signal = ShutdownSignal::new();
    let queue = queue_settings.build::<i64>(signal.clone())
        .context("Failed to create queue")?;

    let total = demo_item_count(settings.producers, settings.items_per_producer)?;
    let last_item = i64::try_from(total).context("Demo item count exceeds the i64 range")?;
    let source: Vec<i64> = (1..=last_item).collect();
    println!("Initialized source list with {} items", source.len());
    info!(
        "Demo: {} queue (capacity {}), {} producer(s), {} consumer(s)",
        queue_settings.kind, queue_settings.capacity, settings.producers, settings.consumers
    );

    let sources = split_sources(source, settings.producers);
    let consumers = settings.consumers;
    let sink: Arc<Mutex<Vec<i64>>> = Arc::new(Mutex::new(Vec::with_capacity(total)));
    let pipeline_sink = Arc::clone(&sink);

    let mut run = tokio::task::spawn_blocking(move || {
        Pipeline::new(queue, flow).run(sources, consumers, pipeline_sink)
    });

    let summary = tokio::select! {
        joined = &mut run => joined??,
        interrupted = tokio::signal::ctrl_c() => {
            if let Err(e) = interrupted {
                warn!("Failed to listen for Ctrl+C: {}", e);
            }
            println!("\nShutdown signal received. Initiating graceful shutdown...");
            signal.trigger();
            run.await??
        }
    };

    let destination = std::mem::take(&mut *sink.lock());
    debug!("Demo finished: {:?}", (summary.produced, summary.consumed, summary.remaining));
    Ok(DemoOutcome {
        source_len: total,
        destination,
        summary,
    })
}

/// Serve a queue over TCP until Ctrl+C
pub async fn run_server(serve: &cli::args::ServeArgs, config: &config::ConfigManager) -> Result<()> {
    let queue_settings = super::initialization::resolve_queue_settings(&serve.queue, config)?;
    let address = super::initialization::resolve_address(serve.address.as_deref(), config)?;

    let queue = queue_settings.build::<i64>(ShutdownSignal::new())
        .context("Failed to create queue")?;
    let server = Arc::new(QueueServer::bind(&address, queue).await?);
    println!(
        "{} queue server started on {} (capacity: {})",
        queue_settings.kind,
        server.local_addr()?,
        queue_settings.capacity
    );

    let interrupt_server = Arc::clone(&server);
    let interrupt = tokio::spawn(async move {
        match tokio::signal::ctrl_c().await {
            Ok(()) => info!("Ctrl+C received, closing queue server"),
            Err(e) => warn!("Failed to listen for Ctrl+C: {}", e),
        }
        interrupt_server.close();
    });

    let served = server.serve().await;
    interrupt.abort();
    served?;
    Ok(())
}

/// Interactive client over stdin/stdout
pub async fn run_client(client: &cli::args::ClientArgs, config: &config::ConfigManager) -> Result<()> {
    let address = super::initialization::resolve_address(client.address.as_deref(), config)?;
    let connection = QueueClient::connect(&address)
        .await
        .with_context(|| format!("Failed to connect to queue server at {}", address))?;
    println!("Connected to queue server at {}", address);

    let session = InteractiveSession::new(
        connection,
        BufReader::new(tokio::io::stdin()),
        tokio::io::stdout(),
    )
    .with_prompt(client.prompt.clone());

    let report = session.run().await?;
    debug!("Client session finished: {:?}", report);
    Ok(())
}
