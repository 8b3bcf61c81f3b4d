//! The root system: owns the graph and the component registry.
//!
//! `load` turns the config file into a wired, reduced, evaluated component
//! graph; `run` keeps one task per component alive, reconciling the task
//! set after every reload. The graph is shared with the introspection
//! endpoint through a read/write lock: a load holds the write half for the
//! whole parse, build, reduce, and evaluate sequence.

use std::collections::{HashMap, HashSet};
use std::fs;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use parking_lot::{Mutex, RwLock};
use prometheus::{IntCounterVec, Opts, Registry};
use tokio::sync::{mpsc, watch};
use tokio::task::JoinHandle;
use tracing::{debug, error, info};

use trellis_config::{
    build_variables, decode_attributes, parse_file, parse_reference, Body, Diagnostic,
    Diagnostics, EvalContext, FromValue, Reference, ReferenceValue, RootConfig, Value,
};
use trellis_dag::{marshal_dot, Graph, Node};

use crate::components::{
    ChainDiscovery, Component, RemoteWriteComponent, ScrapeComponent, StateChangeFn,
    StaticDiscovery,
};
use crate::engine::ScrapeDefaults;
use crate::errors::LoadError;
use crate::node::AgentNode;
use crate::shutdown::{cancel_pair, cancelled};

pub struct SystemOptions {
    pub config_file: PathBuf,
    /// Working directory handed to the remote_write collaborators.
    pub wal_dir: PathBuf,
}

/// Components added and removed by one load, for task reconciliation.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct LoadDiff {
    pub added: Vec<Reference>,
    pub removed: Vec<Reference>,
}

#[derive(Default)]
struct LoadedState {
    components: HashMap<Reference, Arc<Component>>,
}

pub struct System {
    config_file: PathBuf,
    wal_dir: PathBuf,
    registry: Registry,
    graph: RwLock<Graph<AgentNode>>,
    state: Mutex<LoadedState>,
    state_changes: IntCounterVec,
}

impl System {
    pub fn new(options: SystemOptions, registry: Registry) -> Result<Self, prometheus::Error> {
        let state_changes = IntCounterVec::new(
            Opts::new(
                "trellis_component_state_changes_total",
                "State change signals received from component run tasks.",
            ),
            &["component"],
        )?;
        registry.register(Box::new(state_changes.clone()))?;

        let mut graph = Graph::new();
        graph.add(AgentNode::Root);

        Ok(Self {
            config_file: options.config_file,
            wal_dir: options.wal_dir,
            registry,
            graph: RwLock::new(graph),
            state: Mutex::new(LoadedState::default()),
            state_changes,
        })
    }

    pub fn registry(&self) -> &Registry {
        &self.registry
    }

    /// DOT rendering of the current graph, under the shared read lock.
    pub fn marshal_dot(&self) -> String {
        marshal_dot(&self.graph.read())
    }

    /// Sorted snapshot of the graph's display names and edges.
    pub fn graph_snapshot(&self) -> (Vec<String>, Vec<(String, String)>) {
        let graph = self.graph.read();
        let mut nodes: Vec<String> = graph.nodes().map(Node::display_name).collect();
        nodes.sort();
        let mut edges: Vec<(String, String)> = graph
            .edges()
            .into_iter()
            .map(|(from, to)| (from.display_name(), to.display_name()))
            .collect();
        edges.sort();
        (nodes, edges)
    }

    /// Read the config file and update the system to reflect it.
    ///
    /// Components are reused by reference; the returned diff names what
    /// was constructed and what disappeared so the caller can reconcile
    /// run tasks. On error the previously loaded state stays in place.
    pub fn load(&self) -> Result<LoadDiff, LoadError> {
        let mut graph_guard = self.graph.write();
        let mut state = self.state.lock();

        let source = fs::read_to_string(&self.config_file).map_err(|err| LoadError::Io {
            path: self.config_file.clone(),
            source: err,
        })?;
        let file_name = self.config_file.display().to_string();

        let file = parse_file(&source)
            .map_err(|diags| LoadError::invalid(diags, &file_name, &source))?;

        let mut diags = Diagnostics::new();

        // Root scalars evaluate first, against an empty context.
        let scrape_defaults = self.decode_scrape_defaults(&file.body, &mut diags);

        // Declared components, in declaration order.
        let mut declared: Vec<(Reference, Body)> = Vec::new();
        let mut declared_set: HashSet<Reference> = HashSet::new();
        for block in &file.body.blocks {
            let Some(reference) = block_reference(block, &mut diags) else {
                continue;
            };
            if !declared_set.insert(reference.clone()) {
                diags.push(Diagnostic::error(
                    "Duplicate component",
                    format!("{} is declared more than once", reference),
                    block.span,
                ));
                continue;
            }
            declared.push((reference, block.body.clone()));
        }

        if diags.has_errors() {
            return Err(LoadError::invalid(diags, &file_name, &source));
        }

        // Diff against the previous load: reuse surviving components by
        // reference, construct the new ones.
        let mut components: HashMap<Reference, Arc<Component>> = HashMap::new();
        let mut added: Vec<Reference> = Vec::new();
        for (reference, _) in &declared {
            match state.components.get(reference) {
                Some(existing) => {
                    components.insert(reference.clone(), existing.clone());
                }
                None => {
                    components.insert(reference.clone(), Arc::new(self.build_component(reference)));
                    added.push(reference.clone());
                }
            }
        }
        let mut removed: Vec<Reference> = state
            .components
            .keys()
            .filter(|reference| !declared_set.contains(*reference))
            .cloned()
            .collect();
        removed.sort();

        for component in components.values() {
            if let Component::Scrape(scrape) = component.as_ref() {
                scrape.set_defaults(scrape_defaults);
            }
        }

        // Build the new graph: the root dominates every component.
        let mut graph: Graph<AgentNode> = Graph::new();
        graph.add(AgentNode::Root);
        for (reference, _) in &declared {
            let node = AgentNode::Component(reference.clone());
            graph.add(node.clone());
            graph.add_edge(AgentNode::Root, node)?;
        }

        // Wire reference-induced edges. References to undeclared components
        // are tolerated here; they surface as evaluation diagnostics.
        for (origin, body) in &declared {
            for traversal in body.traversals() {
                match parse_reference(traversal) {
                    Ok(target) => {
                        if target != *origin && declared_set.contains(&target) {
                            graph.add_edge(
                                AgentNode::Component(origin.clone()),
                                AgentNode::Component(target.clone()),
                            )?;
                        }
                    }
                    Err(errs) => diags.extend(errs),
                }
            }
        }
        if diags.has_errors() {
            return Err(LoadError::invalid(diags, &file_name, &source));
        }

        // Wiring dependencies left redundant edges behind; reduce to the
        // minimum equivalent set.
        graph.reduce();

        // Evaluate every component in dependency order, folding published
        // values back into the context for the components that follow.
        let bodies: HashMap<Reference, Body> = declared.iter().cloned().collect();
        let mut ectx = EvalContext::new();
        let mut records: Vec<ReferenceValue> = Vec::new();
        let mut visited: HashSet<AgentNode> = HashSet::new();

        graph.walk_topological(|node| {
            visited.insert(node.clone());
            let AgentNode::Component(reference) = node else {
                return Ok::<(), LoadError>(());
            };

            let body = bodies.get(reference).ok_or_else(|| LoadError::MissingBody {
                reference: reference.clone(),
            })?;
            let component = components.get(reference).ok_or_else(|| LoadError::MissingBody {
                reference: reference.clone(),
            })?;

            debug!(node = %reference, "evaluating node");

            let input = component
                .evaluate(&ectx, body)
                .map_err(|errs| LoadError::invalid(errs, &file_name, &source))?;

            let published = match component.current_state() {
                Some(state_value) => merge_state(reference, input, state_value)?,
                None => input,
            };

            records.push(ReferenceValue {
                reference: reference.clone(),
                value: published,
            });
            ectx.variables = build_variables(&records)?;
            Ok(())
        })?;

        if visited.len() != graph.node_count() {
            let mut unvisited: Vec<String> = graph
                .nodes()
                .filter(|node| !visited.contains(*node))
                .map(Node::display_name)
                .collect();
            unvisited.sort();
            return Err(LoadError::Cycle {
                nodes: unvisited.join(", "),
            });
        }

        *graph_guard = graph;
        state.components = components;

        info!(
            components = declared.len(),
            added = added.len(),
            removed = removed.len(),
            "configuration loaded"
        );
        Ok(LoadDiff { added, removed })
    }

    fn decode_scrape_defaults(&self, body: &Body, diags: &mut Diagnostics) -> ScrapeDefaults {
        let mut defaults = ScrapeDefaults::default();

        let root = decode_attributes(body, &EvalContext::new()).and_then(|fields| {
            RootConfig::from_value(&Value::Object(fields)).map_err(|err| {
                Diagnostics::from(Diagnostic::error(
                    "Invalid configuration",
                    err.to_string(),
                    body.span,
                ))
            })
        });
        let root = match root {
            Ok(root) => root,
            Err(errs) => {
                diags.extend(errs);
                return defaults;
            }
        };

        if let Some(interval) =
            parse_root_duration(root.scrape_interval.as_deref(), "scrape_interval", body, diags)
        {
            defaults.interval = interval;
        }
        if let Some(timeout) =
            parse_root_duration(root.scrape_timeout.as_deref(), "scrape_timeout", body, diags)
        {
            defaults.timeout = timeout;
        }
        defaults
    }

    fn build_component(&self, reference: &Reference) -> Component {
        match reference.segments() {
            [root, kind, name] if root == "discovery" && kind == "static" => {
                Component::DiscoveryStatic(StaticDiscovery::new(name))
            }
            [root, kind, name] if root == "discovery" && kind == "chain" => {
                Component::DiscoveryChain(ChainDiscovery::new(name))
            }
            [root, name] if root == "scrape" => Component::Scrape(ScrapeComponent::new(
                name,
                self.registry.clone(),
                ScrapeDefaults::default(),
            )),
            [root, name] if root == "remote_write" => Component::RemoteWrite(
                RemoteWriteComponent::new(name, self.wal_dir.join(name), self.registry.clone()),
            ),
            _ => unreachable!("references are schema-checked before construction"),
        }
    }

    /// Run the system until the shutdown signal fires: one task per
    /// component, reconciled after every reload signal.
    pub async fn run(
        self: Arc<Self>,
        mut shutdown: watch::Receiver<bool>,
        mut reload: mpsc::Receiver<()>,
    ) {
        let mut tasks: HashMap<Reference, RunningComponent> = HashMap::new();
        for (reference, component) in self.current_components() {
            tasks.insert(reference.clone(), self.spawn_component(reference, component));
        }

        let mut reload_open = true;
        loop {
            tokio::select! {
                _ = cancelled(&mut shutdown) => break,
                signal = reload.recv(), if reload_open => match signal {
                    Some(()) => {
                        info!("reload signal received");
                        match self.load() {
                            Ok(diff) => {
                                for reference in &diff.removed {
                                    if let Some(task) = tasks.remove(reference) {
                                        task.stop().await;
                                    }
                                }
                                for reference in &diff.added {
                                    if let Some(component) = self.component(reference) {
                                        tasks.insert(
                                            reference.clone(),
                                            self.spawn_component(reference.clone(), component),
                                        );
                                    }
                                }
                                info!(
                                    added = diff.added.len(),
                                    removed = diff.removed.len(),
                                    "configuration reloaded"
                                );
                            }
                            Err(err) => {
                                error!(error = %err, "reload failed; keeping the previous configuration");
                            }
                        }
                    }
                    None => reload_open = false,
                },
            }
        }

        info!("shutting down component tasks");
        for (_, task) in tasks.drain() {
            task.stop().await;
        }
    }

    fn current_components(&self) -> Vec<(Reference, Arc<Component>)> {
        self.state
            .lock()
            .components
            .iter()
            .map(|(reference, component)| (reference.clone(), component.clone()))
            .collect()
    }

    fn component(&self, reference: &Reference) -> Option<Arc<Component>> {
        self.state.lock().components.get(reference).cloned()
    }

    fn spawn_component(&self, reference: Reference, component: Arc<Component>) -> RunningComponent {
        let (cancel, cancel_rx) = cancel_pair();
        let on_change = self.state_change_callback();
        let handle = tokio::spawn(async move {
            debug!(component = %reference, "component task started");
            component.run(cancel_rx, on_change).await;
        });
        RunningComponent { cancel, handle }
    }

    /// Records the signal; re-evaluating dependants on state change is an
    /// extension point, not wired up yet.
    fn state_change_callback(&self) -> StateChangeFn {
        let counter = self.state_changes.clone();
        Arc::new(move |reference: &Reference| {
            counter.with_label_values(&[&reference.to_string()]).inc();
            debug!(component = %reference, "component state changed");
        })
    }
}

struct RunningComponent {
    cancel: watch::Sender<bool>,
    handle: JoinHandle<()>,
}

impl RunningComponent {
    async fn stop(self) {
        let _ = self.cancel.send(true);
        if let Err(err) = self.handle.await {
            error!(error = %err, "component task panicked");
        }
    }
}

/// Resolve a block header into a component reference, or report why not.
fn block_reference(block: &trellis_config::Block, diags: &mut Diagnostics) -> Option<Reference> {
    match block.name.as_str() {
        "discovery" => match block.labels.as_slice() {
            [kind, name] => {
                if kind != "static" && kind != "chain" {
                    diags.push(Diagnostic::error(
                        "Unknown discovery kind",
                        format!("there is no discovery kind named {:?}", kind),
                        block.span,
                    ));
                    return None;
                }
                Some(Reference::discovery(kind, name))
            }
            _ => {
                diags.push(Diagnostic::error(
                    "Invalid block",
                    "discovery blocks take a kind label and a name label",
                    block.span,
                ));
                None
            }
        },
        "scrape" => match block.labels.as_slice() {
            [name] => Some(Reference::scrape(name)),
            _ => {
                diags.push(Diagnostic::error(
                    "Invalid block",
                    "scrape blocks take a single name label",
                    block.span,
                ));
                None
            }
        },
        "remote_write" => match block.labels.as_slice() {
            [name] => Some(Reference::remote_write(name)),
            _ => {
                diags.push(Diagnostic::error(
                    "Invalid block",
                    "remote_write blocks take a single name label",
                    block.span,
                ));
                None
            }
        },
        other => {
            diags.push(Diagnostic::error(
                "Invalid block",
                format!("{:?} is not a valid block name", other),
                block.span,
            ));
            None
        }
    }
}

/// Merge a component's encoded input with its exported state.
///
/// Both must be objects, and a shared field name is a bug in the component
/// rather than a configuration problem; the union is order-independent.
fn merge_state(reference: &Reference, input: Value, state: Value) -> Result<Value, LoadError> {
    let mut fields = match input {
        Value::Object(fields) => fields,
        other => {
            return Err(LoadError::NonObjectValue {
                reference: reference.clone(),
                what: "input",
                kind: other.type_name(),
            })
        }
    };
    let state_fields = match state {
        Value::Object(fields) => fields,
        other => {
            return Err(LoadError::NonObjectValue {
                reference: reference.clone(),
                what: "state",
                kind: other.type_name(),
            })
        }
    };

    for (name, value) in state_fields {
        if fields.contains_key(&name) {
            return Err(LoadError::MergeConflict {
                reference: reference.clone(),
                field: name,
            });
        }
        fields.insert(name, value);
    }
    Ok(Value::Object(fields))
}

fn parse_root_duration(
    value: Option<&str>,
    attr: &str,
    body: &Body,
    diags: &mut Diagnostics,
) -> Option<Duration> {
    let text = value?;
    match parse_duration(text) {
        Some(duration) => Some(duration),
        None => {
            let span = body
                .attribute(attr)
                .map_or(body.span, |attribute| attribute.value.span);
            diags.push(Diagnostic::error(
                "Invalid duration",
                format!("{:?} is not a valid duration for {:?}", text, attr),
                span,
            ));
            None
        }
    }
}

/// Parse durations of the form `300ms`, `15s`, `2m`, `1h`.
fn parse_duration(text: &str) -> Option<Duration> {
    let (digits, millis_per_unit) = if let Some(rest) = text.strip_suffix("ms") {
        (rest, 1u64)
    } else if let Some(rest) = text.strip_suffix('s') {
        (rest, 1_000)
    } else if let Some(rest) = text.strip_suffix('m') {
        (rest, 60_000)
    } else if let Some(rest) = text.strip_suffix('h') {
        (rest, 3_600_000)
    } else {
        return None;
    };

    let count: u64 = digits.parse().ok()?;
    Some(Duration::from_millis(count.checked_mul(millis_per_unit)?))
}

#[cfg(test)]
mod tests {
    use super::*;
    use trellis_common::ADDRESS_LABEL;

    fn system_with_config(content: &str) -> (tempfile::TempDir, System) {
        let dir = tempfile::tempdir().unwrap();
        let config_file = dir.path().join("trellis.cfg");
        fs::write(&config_file, content).unwrap();

        let system = System::new(
            SystemOptions {
                config_file,
                wal_dir: dir.path().join("wal"),
            },
            Registry::new(),
        )
        .unwrap();
        (dir, system)
    }

    fn rewrite_config(dir: &tempfile::TempDir, content: &str) {
        fs::write(dir.path().join("trellis.cfg"), content).unwrap();
    }

    fn state_targets(component: &Component) -> Vec<Value> {
        component
            .current_state()
            .unwrap()
            .as_object()
            .and_then(|fields| fields.get("targets"))
            .and_then(Value::as_list)
            .unwrap()
            .to_vec()
    }

    #[test]
    fn load_single_static_discovery() {
        let (_dir, system) = system_with_config(
            r#"
discovery "static" "a" {
  hosts = ["h1:1"]
}
"#,
        );

        let diff = system.load().unwrap();
        assert_eq!(diff.added, [Reference::discovery("static", "a")]);
        assert!(diff.removed.is_empty());

        let (nodes, edges) = system.graph_snapshot();
        assert_eq!(nodes, ["<root>", "discovery.static.a"]);
        assert_eq!(
            edges,
            [("<root>".to_string(), "discovery.static.a".to_string())]
        );

        let component = system
            .component(&Reference::discovery("static", "a"))
            .unwrap();
        let targets = state_targets(&component);
        assert_eq!(targets.len(), 1);
        assert_eq!(
            targets[0]
                .as_object()
                .and_then(|t| t.get(ADDRESS_LABEL))
                .and_then(Value::as_str),
            Some("h1:1")
        );
    }

    #[test]
    fn load_chain_referencing_static() {
        let (_dir, system) = system_with_config(
            r#"
discovery "static" "a" {
  hosts = ["h1:1"]
}

discovery "chain" "b" {
  input = [{ targets = discovery.static.a.targets }]
}
"#,
        );

        system.load().unwrap();

        // The chain depends on the static component, and the redundant
        // root edge to the static component was reduced away.
        let (_, edges) = system.graph_snapshot();
        assert_eq!(
            edges,
            [
                ("<root>".to_string(), "discovery.chain.b".to_string()),
                (
                    "discovery.chain.b".to_string(),
                    "discovery.static.a".to_string()
                ),
            ]
        );

        // The chain saw the static component's published targets, so the
        // static component evaluated first.
        let chain = system
            .component(&Reference::discovery("chain", "b"))
            .unwrap();
        let targets = state_targets(&chain);
        assert_eq!(targets.len(), 1);
        assert_eq!(
            targets[0]
                .as_object()
                .and_then(|t| t.get(ADDRESS_LABEL))
                .and_then(Value::as_str),
            Some("h1:1")
        );
    }

    #[test]
    fn load_full_pipeline() {
        let (_dir, system) = system_with_config(
            r#"
scrape_interval = "15s"

discovery "static" "a" {
  hosts  = ["h1:1", "h2:2"]
  labels = { env = "dev" }
}

discovery "chain" "all" {
  input = [{ targets = discovery.static.a.targets, labels = { src = "local" } }]
}

scrape "metrics" {
  targets = discovery.chain.all.targets
}

remote_write "primary" {
  url = "https://example/push"
}
"#,
        );

        let diff = system.load().unwrap();
        assert_eq!(diff.added.len(), 4);

        let (nodes, _) = system.graph_snapshot();
        assert_eq!(
            nodes,
            [
                "<root>",
                "discovery.chain.all",
                "discovery.static.a",
                "remote_write.primary",
                "scrape.metrics"
            ]
        );
    }

    #[test]
    fn invalid_reference_root_fails_the_load() {
        let (_dir, system) = system_with_config(
            r#"
scrape "s" {
  targets = foo.bar.baz
}
"#,
        );

        let err = system.load().unwrap_err();
        let LoadError::Invalid { diagnostics, .. } = err else {
            panic!("expected Invalid, got {:?}", err);
        };
        assert!(diagnostics
            .iter()
            .any(|d| d.detail.contains("\"foo\" is not a valid key name")));
    }

    #[test]
    fn dangling_reference_fails_at_evaluation() {
        let (_dir, system) = system_with_config(
            r#"
scrape "s" {
  targets = discovery.static.missing.targets
}
"#,
        );

        // Wiring tolerates the dangling reference; evaluation reports it.
        let err = system.load().unwrap_err();
        let LoadError::Invalid { diagnostics, .. } = err else {
            panic!("expected Invalid, got {:?}", err);
        };
        assert_eq!(diagnostics.iter().next().unwrap().summary, "Unknown variable");
    }

    #[test]
    fn reference_cycle_is_detected() {
        let (_dir, system) = system_with_config(
            r#"
discovery "chain" "x" {
  input = [{ targets = discovery.chain.y.targets }]
}

discovery "chain" "y" {
  input = [{ targets = discovery.chain.x.targets }]
}
"#,
        );

        let err = system.load().unwrap_err();
        let LoadError::Cycle { nodes } = err else {
            panic!("expected Cycle, got {:?}", err);
        };
        assert!(nodes.contains("discovery.chain.x"));
        assert!(nodes.contains("discovery.chain.y"));
    }

    #[test]
    fn reload_diffs_and_reuses_components() {
        let (dir, system) = system_with_config(
            r#"
discovery "static" "a" {
  hosts = ["h1:1"]
}

scrape "s" {
  targets = discovery.static.a.targets
}
"#,
        );
        system.load().unwrap();
        let static_before = system
            .component(&Reference::discovery("static", "a"))
            .unwrap();

        rewrite_config(
            &dir,
            r#"
discovery "static" "a" {
  hosts = ["h1:1", "h2:2"]
}

remote_write "w" {
  url = "https://example/push"
}
"#,
        );

        let diff = system.load().unwrap();
        assert_eq!(diff.added, [Reference::remote_write("w")]);
        assert_eq!(diff.removed, [Reference::scrape("s")]);

        // The surviving component was reused, with its state re-evaluated.
        let static_after = system
            .component(&Reference::discovery("static", "a"))
            .unwrap();
        assert!(Arc::ptr_eq(&static_before, &static_after));
        assert_eq!(state_targets(&static_after).len(), 2);
    }

    #[test]
    fn failed_reload_keeps_the_previous_state() {
        let (dir, system) = system_with_config(
            r#"
discovery "static" "a" {
  hosts = ["h1:1"]
}
"#,
        );
        system.load().unwrap();

        rewrite_config(&dir, "discovery \"static\" \"a\" {\n  hosts = [\n");
        system.load().unwrap_err();

        let (nodes, _) = system.graph_snapshot();
        assert_eq!(nodes, ["<root>", "discovery.static.a"]);
        assert!(system
            .component(&Reference::discovery("static", "a"))
            .is_some());
    }

    #[test]
    fn unknown_block_and_duplicate_component_are_diagnostics() {
        let (_dir, system) = system_with_config(
            r#"
mystery "x" {
}

scrape "s" {
  targets = []
}

scrape "s" {
  targets = []
}
"#,
        );

        let err = system.load().unwrap_err();
        let LoadError::Invalid { diagnostics, .. } = err else {
            panic!("expected Invalid, got {:?}", err);
        };
        assert!(diagnostics.iter().any(|d| d.summary == "Invalid block"));
        assert!(diagnostics.iter().any(|d| d.summary == "Duplicate component"));
    }

    #[test]
    fn merge_state_unions_disjoint_fields() {
        let reference = Reference::discovery("static", "a");
        let input = Value::object([("hosts".to_string(), Value::List(vec![]))]);
        let state = Value::object([("targets".to_string(), Value::List(vec![]))]);

        let merged = merge_state(&reference, input.clone(), state.clone()).unwrap();
        let fields = merged.as_object().unwrap();
        assert!(fields.contains_key("hosts"));
        assert!(fields.contains_key("targets"));

        // The union is order-independent in its field set.
        let swapped = merge_state(&reference, state, input).unwrap();
        assert_eq!(merged, swapped);
    }

    #[test]
    fn merge_state_rejects_shared_fields() {
        let reference = Reference::discovery("static", "a");
        let input = Value::object([("targets".to_string(), Value::List(vec![]))]);
        let state = Value::object([("targets".to_string(), Value::List(vec![]))]);

        let err = merge_state(&reference, input, state).unwrap_err();
        let LoadError::MergeConflict { field, .. } = err else {
            panic!("expected MergeConflict, got {:?}", err);
        };
        assert_eq!(field, "targets");
    }

    #[test]
    fn merge_state_requires_objects() {
        let reference = Reference::scrape("s");
        let state = Value::Object(Default::default());
        let err = merge_state(&reference, Value::Null, state).unwrap_err();
        assert!(matches!(err, LoadError::NonObjectValue { what: "input", .. }));
    }

    #[test]
    fn parses_duration_suffixes() {
        assert_eq!(parse_duration("300ms"), Some(Duration::from_millis(300)));
        assert_eq!(parse_duration("15s"), Some(Duration::from_secs(15)));
        assert_eq!(parse_duration("2m"), Some(Duration::from_secs(120)));
        assert_eq!(parse_duration("1h"), Some(Duration::from_secs(3600)));
        assert_eq!(parse_duration("nope"), None);
        assert_eq!(parse_duration("15"), None);
    }

    #[test]
    fn invalid_root_duration_is_a_diagnostic() {
        let (_dir, system) = system_with_config("scrape_interval = \"often\"\n");

        let err = system.load().unwrap_err();
        let LoadError::Invalid { diagnostics, .. } = err else {
            panic!("expected Invalid, got {:?}", err);
        };
        assert_eq!(diagnostics.iter().next().unwrap().summary, "Invalid duration");
    }

    #[tokio::test]
    async fn run_reconciles_tasks_on_reload_and_stops_on_shutdown() {
        let (dir, system) = system_with_config(
            r#"
discovery "static" "a" {
  hosts = ["h1:1"]
}
"#,
        );
        system.load().unwrap();
        let system = Arc::new(system);

        let (shutdown_tx, shutdown_rx) = cancel_pair();
        let (reload_tx, reload_rx) = mpsc::channel(1);
        let runner = tokio::spawn(system.clone().run(shutdown_rx, reload_rx));

        rewrite_config(
            &dir,
            r#"
discovery "static" "a" {
  hosts = ["h1:1"]
}

remote_write "w" {
  url = "https://example/push"
}
"#,
        );
        reload_tx.send(()).await.unwrap();

        let deadline = tokio::time::Instant::now() + tokio::time::Duration::from_secs(2);
        loop {
            let (nodes, _) = system.graph_snapshot();
            if nodes.iter().any(|n| n == "remote_write.w") {
                break;
            }
            assert!(tokio::time::Instant::now() < deadline, "reload never applied");
            tokio::time::sleep(tokio::time::Duration::from_millis(10)).await;
        }

        shutdown_tx.send(true).unwrap();
        tokio::time::timeout(tokio::time::Duration::from_secs(5), runner)
            .await
            .expect("run did not stop")
            .unwrap();
    }
}
