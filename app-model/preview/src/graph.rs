use crate::resolve;
use indexmap::{IndexMap, IndexSet};
use porter_app_model_core::{names, Error, Result};
use porter_app_model_yaml::{
    decode,
    preview::{AddonEntry, AppEntry, BuildEntry, HelmChart, PreviewSpec, VERSION},
    Mapping, Value,
};
use serde::Serialize;
use std::fmt;
use tracing::debug;

/// A validated preview resource graph. Node names are unique, every dependency names a node in
/// the graph, and there are no cycles.
#[derive(Clone, Debug, PartialEq)]
pub struct ResourceGraph {
    nodes: IndexMap<String, ResourceNode>,
    order: Vec<String>,
}

#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct ResourceNode {
    pub name: String,
    pub driver: Driver,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub source: Option<ChartSource>,

    /// The build or release the driver acts on.
    pub target: String,
    pub config: Value,
    pub depends_on: IndexSet<String>,
}

#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum Driver {
    BuildImage,
    PushImage,
    Deploy,
    Helm,
}

/// The chart a deploy or addon node installs.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct ChartSource {
    pub name: String,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub repo_url: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub version: Option<String>,
}

/// Expands a preview document into its resource graph.
pub fn build_preview_graph(bytes: &[u8]) -> Result<ResourceGraph> {
    let doc = serde_yaml::from_slice::<Value>(bytes).map_err(|error| Error::MalformedDocument {
        reason: error.to_string(),
    })?;
    if !doc.is_mapping() {
        return Err(Error::MalformedDocument {
            reason: "the top level must be a mapping".to_string(),
        });
    }

    let spec = decode::from_value::<PreviewSpec>(doc)?;
    match spec.version.as_deref() {
        None | Some(VERSION) => {}
        Some(version) => {
            return Err(Error::UnsupportedVersion {
                version: version.to_string(),
                supported: VERSION,
            })
        }
    }

    let mut builds = IndexMap::with_capacity(spec.builds.len());
    for (i, build) in spec.builds.iter().enumerate() {
        names::validate_dns_label(&format!("builds[{i}].name"), &build.name)?;
        if builds.insert(build.name.as_str(), build).is_some() {
            return Err(Error::DuplicateResource {
                name: build.name.clone(),
            });
        }
    }

    let mut graph = Builder::default();
    for (i, app) in spec.apps.iter().enumerate() {
        names::validate_dns_label(&format!("apps[{i}].name"), &app.name)?;
        graph.app(app, &builds)?;
    }
    for (i, addon) in spec.addons.iter().enumerate() {
        names::validate_dns_label(&format!("addons[{i}].name"), &addon.name)?;
        graph.addon(addon)?;
    }

    let order = resolve::resolve(&graph.nodes)?;
    debug!(nodes = graph.nodes.len(), "Built preview graph");
    Ok(ResourceGraph {
        nodes: graph.nodes,
        order,
    })
}

#[derive(Default)]
struct Builder {
    nodes: IndexMap<String, ResourceNode>,
}

// === impl Builder ===

impl Builder {
    fn insert(&mut self, node: ResourceNode) -> Result<()> {
        if self.nodes.contains_key(&node.name) {
            return Err(Error::DuplicateResource { name: node.name });
        }
        debug!(name = %node.name, driver = %node.driver, "Adding resource");
        self.nodes.insert(node.name.clone(), node);
        Ok(())
    }

    /// Adds the deploy node for `app`, preceded by build and push nodes when it names a build.
    fn app(&mut self, app: &AppEntry, builds: &IndexMap<&str, &BuildEntry>) -> Result<()> {
        let mut depends_on = app.depends_on.iter().cloned().collect::<IndexSet<_>>();

        if let Some(build_name) = app.build.as_deref() {
            let build = builds
                .get(build_name)
                .ok_or_else(|| Error::DanglingDependency {
                    from: app.name.clone(),
                    to: build_name.to_string(),
                })?;

            let build_node = format!("build-{}", app.name);
            let push_node = format!("push-{}", app.name);
            self.insert(ResourceNode {
                name: build_node.clone(),
                driver: Driver::BuildImage,
                source: None,
                target: build.name.clone(),
                config: to_value(build)?,
                depends_on: IndexSet::new(),
            })?;
            self.insert(ResourceNode {
                name: push_node.clone(),
                driver: Driver::PushImage,
                source: None,
                target: build.name.clone(),
                config: Value::Mapping(Mapping::new()),
                depends_on: [build_node].into_iter().collect(),
            })?;
            depends_on.insert(push_node);
        }

        self.insert(ResourceNode {
            name: app.name.clone(),
            driver: Driver::Deploy,
            source: app.helm_chart.as_ref().map(ChartSource::from),
            target: app.name.clone(),
            config: Value::Mapping(app.values.clone()),
            depends_on,
        })
    }

    fn addon(&mut self, addon: &AddonEntry) -> Result<()> {
        self.insert(ResourceNode {
            name: addon.name.clone(),
            driver: Driver::Helm,
            source: Some(ChartSource::from(&addon.helm_chart)),
            target: addon.name.clone(),
            config: Value::Mapping(addon.values.clone()),
            depends_on: addon.depends_on.iter().cloned().collect(),
        })
    }
}

fn to_value(build: &BuildEntry) -> Result<Value> {
    serde_yaml::to_value(build)
        .map_err(|error| Error::Internal(format!("failed to serialize build: {error}")))
}

// === impl ResourceGraph ===

impl ResourceGraph {
    /// Nodes in declaration order.
    pub fn nodes(&self) -> impl Iterator<Item = &ResourceNode> + '_ {
        self.nodes.values()
    }

    /// Nodes ordered so that each follows everything it depends on.
    pub fn resolution_order(&self) -> impl Iterator<Item = &ResourceNode> + '_ {
        self.order.iter().filter_map(|name| self.nodes.get(name))
    }

    pub fn get(&self, name: &str) -> Option<&ResourceNode> {
        self.nodes.get(name)
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }
}

// === impl Driver ===

impl Driver {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::BuildImage => "build-image",
            Self::PushImage => "push-image",
            Self::Deploy => "deploy",
            Self::Helm => "helm",
        }
    }
}

impl fmt::Display for Driver {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.as_str().fmt(f)
    }
}

impl From<&HelmChart> for ChartSource {
    fn from(chart: &HelmChart) -> Self {
        Self {
            name: chart.name.clone(),
            repo_url: chart.url.clone(),
            version: chart.version.clone(),
        }
    }
}
