//! vispipe - headless pipeline runner
//!
//! Binds the configured in-memory source to a fresh tree, restores the last
//! saved layout (or builds a small default one), pushes a data-source change
//! through the tree and prints what every node produces.

use anyhow::Context;
use std::path::PathBuf;
use std::sync::Arc;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};
use vispipe::config::{AppConfig, SourceConfig, CONFIG_FILE};
use vispipe::pipeline::{
    AnyNode, Capability, DataSource, DataValue, EventKind, FilterNode, MemorySource, NodeId,
    NodeRegistry, NodeType, PipelineTree, RequestParams, ScaleNode, StatusBridge, TreeLayout,
};

fn main() -> anyhow::Result<()> {
    let config_path = std::env::args()
        .nth(1)
        .map(PathBuf::from)
        .unwrap_or_else(|| PathBuf::from(CONFIG_FILE));
    let config = AppConfig::load_or_default(&config_path);

    let _log_guard = init_logging(&config)?;
    tracing::info!("Starting vispipe with config {:?}", config_path);

    let source: Arc<dyn DataSource> = Arc::new(build_source(&config.source));
    let mut tree = PipelineTree::with_source(&source);
    let registry = NodeRegistry::with_builtins();

    let layout_path = config.layout_path();
    match layout_path.as_ref().filter(|p| p.exists()) {
        Some(path) => {
            tracing::info!("Restoring layout from {:?}", path);
            let layout = TreeLayout::load(path)
                .with_context(|| format!("Failed to load layout {:?}", path))?;
            layout
                .rebuild(&mut tree, &registry)
                .context("Failed to rebuild saved layout")?;
        }
        None => build_default_tree(&mut tree).context("Failed to build default tree")?,
    }

    // Observers are held weakly by the tree; the bridge keeps this one alive.
    let bridge = StatusBridge::new();
    let observer = bridge.observer();
    let ids: Vec<NodeId> = tree.node_ids().collect();
    for id in ids {
        tree.add_observer(id, &observer)?;
    }

    let event = tree.propagate(EventKind::DatasourceChanged)?;
    let updates = bridge.drain();
    tracing::info!(
        "Data source change reached {} node(s), {} status update(s)",
        event.visited_count(),
        updates.len()
    );

    print_tree(&mut tree)?;

    if let Some(path) = layout_path {
        TreeLayout::capture(&tree)
            .save(&path)
            .with_context(|| format!("Failed to save layout {:?}", path))?;
        tracing::info!("Saved layout to {:?}", path);
    }

    tracing::info!("Shutting down...");
    Ok(())
}

/// Install the tracing subscriber. The returned guard flushes the log file
/// when dropped, so it must live until the end of `main`.
fn init_logging(
    config: &AppConfig,
) -> anyhow::Result<Option<tracing_appender::non_blocking::WorkerGuard>> {
    let filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(&config.log_filter))
        .context("Invalid log filter")?;

    let (file_layer, guard) = match &config.log_dir {
        Some(dir) => {
            std::fs::create_dir_all(dir)
                .with_context(|| format!("Failed to create log directory {:?}", dir))?;
            let appender = tracing_appender::rolling::daily(dir, "vispipe.log");
            let (writer, guard) = tracing_appender::non_blocking(appender);
            let layer = tracing_subscriber::fmt::layer()
                .with_ansi(false)
                .with_writer(writer);
            (Some(layer), Some(guard))
        }
        None => (None, None),
    };

    tracing_subscriber::registry()
        .with(filter)
        .with(tracing_subscriber::fmt::layer())
        .with(file_layer)
        .init();

    Ok(guard)
}

fn build_source(config: &SourceConfig) -> MemorySource {
    config
        .channels
        .iter()
        .cloned()
        .fold(MemorySource::new(config.uri.clone()), MemorySource::with_channel)
}

/// Root ─► Filter ─► Scale ─► Statistics, plus Statistics straight off the root.
fn build_default_tree(tree: &mut PipelineTree) -> anyhow::Result<()> {
    let root = tree.root();
    let filter = tree.add_child(root, AnyNode::filter(FilterNode::new()))?;
    let scale = tree.add_child(filter, AnyNode::scale(ScaleNode::new(2.0, 0.0)?))?;
    tree.add_child(scale, NodeType::Statistics.create())?;
    let raw = tree.add_child(root, NodeType::Statistics.create())?;
    tree.set_name(raw, "Raw statistics")?;
    Ok(())
}

fn print_tree(tree: &mut PipelineTree) -> anyhow::Result<()> {
    let params = RequestParams::new();
    for (id, depth) in tree.walk() {
        let label = format!(
            "{}{} [{}]",
            "  ".repeat(depth),
            tree.name(id).unwrap_or_default(),
            tree.type_name(id).unwrap_or_default()
        );
        let capability = if id == tree.root() {
            Capability::Uri
        } else if tree.output_spec(id)?.contains(Capability::Statistics) {
            Capability::Statistics
        } else {
            Capability::Series
        };
        let summary = match tree.try_request_data(id, capability, &params) {
            Ok(Some(value)) => describe(&value),
            Ok(None) => "-".to_string(),
            Err(e) => format!("error: {}", e),
        };
        println!("{:<40} {}", label, summary);
    }
    Ok(())
}

fn describe(value: &DataValue) -> String {
    match value {
        DataValue::Uri(uri) => uri.clone(),
        DataValue::Series(samples) => format!("{} sample(s)", samples.len()),
        DataValue::Table(rows) => format!("{} row(s)", rows.len()),
        DataValue::Selection(indices) => format!("{} selected", indices.len()),
        DataValue::Statistics(st) => format!(
            "n={} min={:.3} max={:.3} mean={:.3}",
            st.count, st.min, st.max, st.mean
        ),
        DataValue::Text(text) => text.clone(),
    }
}
