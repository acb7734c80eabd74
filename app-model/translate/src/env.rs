//! Materializes an application's runtime environment from its env groups and inline env.

use porter_app_model_core::{
    App, DeploymentTarget, EnvGroupFetcher, EnvMap, Error, FetchError, Result,
};
use tracing::{debug, info_span, Instrument};

#[derive(Copy, Clone, Debug, Default, PartialEq, Eq)]
pub struct ResolveOptions {
    /// Also merge each group's secret variables.
    pub include_secrets: bool,
}

/// Flattens the app's env groups, in declaration order, and then its inline env into one map.
///
/// Later groups override earlier ones, a group's secrets override its own plain variables, and
/// inline env overrides every group. Fetch failures abort resolution; no partial map is returned.
pub async fn resolve_env<F>(
    app: &App,
    target: &DeploymentTarget,
    fetcher: &F,
    opts: ResolveOptions,
) -> Result<EnvMap>
where
    F: EnvGroupFetcher + ?Sized,
{
    if target.selector_kind != DeploymentTarget::NAMESPACE {
        return Err(Error::UnsupportedSelector {
            kind: target.selector_kind.clone(),
        });
    }
    if target.selector_value.is_empty() {
        return Err(Error::missing("target.namespace"));
    }

    let span = info_span!(
        "resolve_env",
        app = %app.name,
        namespace = %target.selector_value,
        groups = app.env_group_refs.len(),
    );
    async move {
        let mut env = EnvMap::new();
        for group_ref in &app.env_group_refs {
            let group = fetcher
                .get(&group_ref.name, group_ref.version)
                .await
                .map_err(|error| match error {
                    FetchError::NotFound { name, version } => {
                        Error::EnvGroupNotFound { name, version }
                    }
                    FetchError::Transport(error) => Error::Transport(error),
                })?;
            debug!(
                group = %group.name,
                version = group.version,
                variables = group.variables.len(),
                secrets = group.secret_variables.len(),
                "Merging env group"
            );

            env.extend(group.variables);
            if opts.include_secrets {
                env.extend(group.secret_variables);
            }
        }
        env.extend(app.env.iter().map(|(k, v)| (k.clone(), v.clone())));
        Ok(env)
    }
    .instrument(span)
    .await
}
