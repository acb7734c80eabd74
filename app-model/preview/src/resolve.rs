use crate::ResourceNode;
use indexmap::IndexMap;
use porter_app_model_core::{Error, Result};
use std::collections::HashSet;

/// Orders `nodes` so that every node follows its dependencies.
///
/// Nodes are visited depth-first in declaration order. The first dependency on an undeclared node,
/// or on a node still being visited, is reported.
pub(crate) fn resolve(nodes: &IndexMap<String, ResourceNode>) -> Result<Vec<String>> {
    let mut resolver = Resolver {
        nodes,
        resolved: HashSet::with_capacity(nodes.len()),
        unresolved: HashSet::new(),
        order: Vec::with_capacity(nodes.len()),
    };
    for name in nodes.keys() {
        if !resolver.resolved.contains(name.as_str()) {
            resolver.visit(name)?;
        }
    }
    Ok(resolver.order.into_iter().map(str::to_string).collect())
}

struct Resolver<'g> {
    nodes: &'g IndexMap<String, ResourceNode>,
    resolved: HashSet<&'g str>,
    unresolved: HashSet<&'g str>,
    order: Vec<&'g str>,
}

// === impl Resolver ===

impl<'g> Resolver<'g> {
    fn visit(&mut self, name: &'g str) -> Result<()> {
        let nodes = self.nodes;
        let node = match nodes.get(name) {
            Some(node) => node,
            None => return Err(Error::Internal(format!("visited undeclared node `{name}`"))),
        };

        self.unresolved.insert(name);
        for dep in &node.depends_on {
            let dep = dep.as_str();
            if !nodes.contains_key(dep) {
                return Err(Error::DanglingDependency {
                    from: name.to_string(),
                    to: dep.to_string(),
                });
            }
            if self.unresolved.contains(dep) {
                return Err(Error::Cycle {
                    from: name.to_string(),
                    to: dep.to_string(),
                });
            }
            if !self.resolved.contains(dep) {
                self.visit(dep)?;
            }
        }
        self.unresolved.remove(name);
        self.resolved.insert(name);
        self.order.push(name);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::Driver;
    use pretty_assertions::assert_eq;

    fn nodes(edges: &[(&str, &[&str])]) -> IndexMap<String, ResourceNode> {
        edges
            .iter()
            .map(|(name, deps)| {
                let node = ResourceNode {
                    name: name.to_string(),
                    driver: Driver::Helm,
                    source: None,
                    target: name.to_string(),
                    config: Default::default(),
                    depends_on: deps.iter().map(|d| d.to_string()).collect(),
                };
                (name.to_string(), node)
            })
            .collect()
    }

    #[test]
    fn dependencies_come_first() {
        let order = resolve(&nodes(&[
            ("web", &["api", "cache"]),
            ("api", &["db"]),
            ("db", &[]),
            ("cache", &[]),
        ]))
        .unwrap();
        assert_eq!(order, ["db", "api", "cache", "web"]);
    }

    #[test]
    fn shared_dependencies_resolve_once() {
        let order = resolve(&nodes(&[("a", &["c"]), ("b", &["c"]), ("c", &[])])).unwrap();
        assert_eq!(order, ["c", "a", "b"]);
    }

    #[test]
    fn reports_the_first_back_edge() {
        let err = resolve(&nodes(&[("a", &["b"]), ("b", &["c"]), ("c", &["a"])])).unwrap_err();
        assert!(
            matches!(err, Error::Cycle { ref from, ref to } if from == "c" && to == "a"),
            "{err}"
        );

        let err = resolve(&nodes(&[("a", &["a"])])).unwrap_err();
        assert!(
            matches!(err, Error::Cycle { ref from, ref to } if from == "a" && to == "a"),
            "{err}"
        );
    }

    #[test]
    fn reports_undeclared_dependencies() {
        let err = resolve(&nodes(&[("a", &["b"]), ("b", &["ghost"])])).unwrap_err();
        assert!(
            matches!(
                err,
                Error::DanglingDependency { ref from, ref to } if from == "b" && to == "ghost"
            ),
            "{err}"
        );
    }
}
